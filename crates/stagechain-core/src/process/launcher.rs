//! Stage launching.

use crate::config::Stage;
use crate::error::LaunchError;
use crate::platform;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Starts a stage's executable without waiting for it.
pub trait Launcher: Send + Sync {
    /// Launch the stage. Success only means the OS accepted the request;
    /// the sequencer confirms the start by probing later.
    fn launch(&self, stage: &Stage) -> Result<(), LaunchError>;
}

/// Validate an executable path and return the directory to launch it from.
///
/// The path must be non-empty and name an existing file. A bare file name
/// launches from the current directory.
pub fn resolve_working_dir(path: &Path) -> Result<PathBuf, LaunchError> {
    if path.as_os_str().is_empty() || !path.is_file() {
        return Err(LaunchError::InvalidPath {
            path: path.to_path_buf(),
        });
    }

    let working_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok(working_dir)
}

/// [`Launcher`] that uses the platform "open" action.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellLauncher;

impl ShellLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl Launcher for ShellLauncher {
    fn launch(&self, stage: &Stage) -> Result<(), LaunchError> {
        let path = &stage.executable_path;
        let working_dir = resolve_working_dir(path)?;

        debug!(
            "Opening {} for stage {} (elevation passthrough: {})",
            path.display(),
            stage.name,
            platform::supports_elevation()
        );
        platform::shell_open(path, &working_dir)?;

        info!("Launched: {} (cwd: {})", stage.name, working_dir.display());
        Ok(())
    }
}
