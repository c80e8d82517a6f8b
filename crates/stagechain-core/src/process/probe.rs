//! Process-table probing for stage detection and kill targets.

use crate::config::KillTargets;
use crate::error::ProbeError;
use crate::platform;
use std::sync::{Mutex, MutexGuard};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::{debug, info, warn};

/// Read access to the OS process table.
pub trait ProcessProbe: Send + Sync {
    /// Whether a live process with this name exists (case-insensitive).
    fn is_running(&self, process_name: &str) -> Result<bool, ProbeError>;

    /// Request termination of every process matching a kill target.
    ///
    /// Returns how many termination requests were delivered. A failure for
    /// one process never stops attempts on the others.
    fn terminate_matching(&self, targets: &KillTargets) -> Result<usize, ProbeError>;
}

/// [`ProcessProbe`] backed by `sysinfo`.
pub struct SystemProbe {
    system: Mutex<System>,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    /// Lock the process table and refresh it, dropping exited processes.
    fn refreshed(&self) -> Result<MutexGuard<'_, System>, ProbeError> {
        let mut system = self.system.lock().map_err(|_| ProbeError::Unavailable {
            message: "process table lock poisoned".to_string(),
        })?;
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::new(),
        );
        Ok(system)
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProbe for SystemProbe {
    fn is_running(&self, process_name: &str) -> Result<bool, ProbeError> {
        let system = self.refreshed()?;
        let running = system
            .processes()
            .values()
            .any(|process| {
                platform::is_live(process) && platform::name_matches(process.name(), process_name)
            });
        debug!("is_running({}): {}", process_name, running);
        Ok(running)
    }

    fn terminate_matching(&self, targets: &KillTargets) -> Result<usize, ProbeError> {
        if targets.is_empty() {
            return Ok(0);
        }

        let system = self.refreshed()?;
        let mut delivered = 0;
        for (pid, process) in system.processes() {
            if !platform::is_live(process) {
                continue;
            }
            let name = process.name().to_string_lossy();
            if !targets.matches(&name) {
                continue;
            }

            info!("Auto-killing process: {} (pid {})", name, pid);
            if platform::request_termination(process) {
                delivered += 1;
            } else {
                warn!("Failed to terminate {} (pid {})", name, pid);
            }
        }
        Ok(delivered)
    }
}
