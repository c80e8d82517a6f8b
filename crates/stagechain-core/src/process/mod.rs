//! Process observation and launching.
//!
//! Both concerns sit behind traits so the sequencer can be driven by the real
//! OS ([`SystemProbe`], [`ShellLauncher`]) or by in-memory fakes in tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use stagechain_core::process::{ProcessProbe, SystemProbe};
//!
//! let probe = SystemProbe::new();
//! if probe.is_running("notepad.exe").unwrap_or(false) {
//!     println!("notepad is open");
//! }
//! ```

mod launcher;
mod probe;

pub use launcher::{resolve_working_dir, Launcher, ShellLauncher};
pub use probe::{ProcessProbe, SystemProbe};
