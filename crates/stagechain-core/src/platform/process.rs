//! Platform-specific process-table helpers.

use std::ffi::OsStr;
use sysinfo::{Process, ProcessStatus};
use tracing::debug;

/// Whether a process-table entry is a real running process.
///
/// Zombies and dead entries linger in the table after exit; they never
/// count as running.
pub fn is_live(process: &Process) -> bool {
    !matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead)
}

/// Case-insensitive exact comparison of an OS process name.
pub fn name_matches(actual: &OsStr, expected: &str) -> bool {
    actual.to_string_lossy().to_lowercase() == expected.to_lowercase()
}

/// Ask a process to exit.
///
/// # Platform Behavior
/// - **Linux/macOS**: Sends SIGTERM, falling back to SIGKILL if the signal is unsupported
/// - **Windows**: Uses `TerminateProcess` (sysinfo's `kill`)
///
/// Returns `true` if the request was delivered.
pub fn request_termination(process: &Process) -> bool {
    #[cfg(unix)]
    {
        let delivered = process
            .kill_with(sysinfo::Signal::Term)
            .unwrap_or_else(|| process.kill());
        debug!("SIGTERM to {} delivered: {}", process.pid(), delivered);
        delivered
    }

    #[cfg(not(unix))]
    {
        let delivered = process.kill();
        debug!("Terminate {} delivered: {}", process.pid(), delivered);
        delivered
    }
}
