//! Error types for stagechain.
//!
//! Launch and probe failures get their own enums because the sequencer logs
//! them and keeps going. `StagechainError` is what the command surface and
//! the config store hand back to the host.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to start a stage's executable.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Invalid path or file not found: {path:?}")]
    InvalidPath { path: PathBuf },

    #[error("ShellExecute failed with error code: {code}")]
    ShellExecuteFailure { code: isize },

    #[error("Unexpected launch failure: {message}")]
    Unexpected { message: String },
}

/// Failure to read the OS process table as a whole.
///
/// Errors for a single process (vanished, access denied) never surface here;
/// the probe skips those entries.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Process table unavailable: {message}")]
    Unavailable { message: String },
}

/// Main error type for stagechain.
#[derive(Debug, Error)]
pub enum StagechainError {
    #[error("Configuration unavailable at {path:?}: {message}")]
    ConfigUnavailable { path: PathBuf, message: String },

    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Invalid stage index {index} (chain has {len} stages)")]
    InvalidStageIndex { index: usize, len: usize },

    #[error("Failed to launch {stage}: {source}")]
    Launch {
        stage: String,
        #[source]
        source: LaunchError,
    },

    #[error("Sequencer worker is not running")]
    WorkerNotRunning,
}

/// Result type alias for stagechain operations.
pub type Result<T> = std::result::Result<T, StagechainError>;

impl From<std::io::Error> for StagechainError {
    fn from(err: std::io::Error) -> Self {
        StagechainError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for StagechainError {
    fn from(err: serde_json::Error) -> Self {
        StagechainError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl StagechainError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        StagechainError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Whether the host should show this error to the user.
    ///
    /// Only launch failures are user-facing; everything else is logged.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, StagechainError::Launch { .. })
    }
}
