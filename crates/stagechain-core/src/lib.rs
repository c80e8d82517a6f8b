//! Stagechain Core - headless engine for launching a chain of applications in order.
//!
//! The sequencer watches the OS process table for each stage's process,
//! launches the next stage after a configurable interval once the current one
//! exits, terminates auxiliary "kill target" processes between stages, and
//! returns to standby once per day at a fixed hour.
//!
//! # Example
//!
//! ```rust,no_run
//! use stagechain_core::config::{load_chain_config_or_default, ConfigHandle};
//! use stagechain_core::SequencerService;
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let chain = load_chain_config_or_default(Path::new("config.json"));
//!     let service = SequencerService::with_system_defaults(ConfigHandle::new(chain));
//!     service.set_completion_handler(|| println!("chain complete"));
//!     service.start();
//!
//!     // ... later
//!     println!("{}", service.status_text());
//!     service.stop().await;
//! }
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod platform;
pub mod process;
pub mod sequencer;

// Re-export commonly used types
pub use cancel::CancellationToken;
pub use config::{ChainConfig, ConfigHandle, KillTargets, Stage};
pub use error::{LaunchError, ProbeError, Result, StagechainError};
pub use process::{Launcher, ProcessProbe, ShellLauncher, SystemProbe};
pub use sequencer::{Phase, SequencerService, SequencerSnapshot, StageSequencer};
