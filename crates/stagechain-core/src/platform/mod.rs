//! Platform abstraction layer.
//!
//! All `#[cfg]` blocks for OS-specific behavior live here:
//! - `process` - process-table matching and termination requests
//! - `shell` - opening an executable with the native "open" action

pub mod process;
pub mod shell;

pub use process::{is_live, name_matches, request_termination};
pub use shell::{shell_open, status_code_to_result};

/// Whether launches on this platform can request elevation.
pub fn supports_elevation() -> bool {
    cfg!(windows)
}
