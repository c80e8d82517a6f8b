//! JSON persistence for the chain configuration.
//!
//! The document keeps the key names used by existing `config.json` files:
//!
//! ```json
//! {
//!   "games": [{ "name": "Game1", "path": "C:/Games/g1.exe", "process_name": "g1.exe" }],
//!   "launch_interval": 5,
//!   "kill_targets": ["HoYoPlay (hoyoplay.exe)"],
//!   "auto_exit_after_completion": false
//! }
//! ```
//!
//! Writes are atomic: temp file, fsync, rename.

use super::{AppConfig, ChainConfig, KillTargets, Stage};
use crate::error::{Result, StagechainError};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::process;
use tracing::{debug, info, warn};

#[derive(Debug, Serialize, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    games: Vec<GameEntry>,
    #[serde(default = "default_launch_interval")]
    launch_interval: i64,
    #[serde(default)]
    kill_targets: Vec<String>,
    #[serde(default)]
    auto_exit_after_completion: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct GameEntry {
    name: String,
    #[serde(default)]
    path: String,
    process_name: String,
}

fn default_launch_interval() -> i64 {
    AppConfig::DEFAULT_LAUNCH_INTERVAL_SECS as i64
}

impl From<ConfigDocument> for ChainConfig {
    fn from(doc: ConfigDocument) -> Self {
        let stages = doc
            .games
            .into_iter()
            .map(|game| Stage::new(game.name, game.path, game.process_name))
            .collect();

        ChainConfig::new(stages)
            .with_launch_interval(doc.launch_interval.max(0) as u64)
            .with_kill_targets(KillTargets::new(doc.kill_targets))
            .with_auto_exit(doc.auto_exit_after_completion)
    }
}

impl From<&ChainConfig> for ConfigDocument {
    fn from(config: &ChainConfig) -> Self {
        Self {
            games: config
                .stages()
                .iter()
                .map(|stage| GameEntry {
                    name: stage.name.clone(),
                    path: stage.executable_path.to_string_lossy().into_owned(),
                    process_name: stage.process_name.clone(),
                })
                .collect(),
            launch_interval: i64::try_from(config.launch_interval_secs()).unwrap_or(i64::MAX),
            kill_targets: config.kill_targets().raw().to_vec(),
            auto_exit_after_completion: config.auto_exit_on_completion(),
        }
    }
}

/// Read the chain configuration.
///
/// A missing or unparsable file is `ConfigUnavailable`.
pub fn load_chain_config(path: &Path) -> Result<ChainConfig> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            return Err(StagechainError::ConfigUnavailable {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
    };

    let doc: ConfigDocument =
        serde_json::from_str(&contents).map_err(|e| StagechainError::ConfigUnavailable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let config = ChainConfig::from(doc);
    info!(
        "Loaded {} stages from {} (interval {}s)",
        config.len(),
        path.display(),
        config.launch_interval_secs()
    );
    Ok(config)
}

/// Read the chain configuration, falling back to an empty chain.
pub fn load_chain_config_or_default(path: &Path) -> ChainConfig {
    match load_chain_config(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("{}; continuing with an empty chain", e);
            ChainConfig::default()
        }
    }
}

/// Write the chain configuration atomically as pretty-printed JSON.
pub fn save_chain_config(path: &Path, config: &ChainConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| StagechainError::io_with_path(e, parent))?;
        }
    }

    let serialized = serde_json::to_string_pretty(&ConfigDocument::from(config))?;
    let temp_path = path.with_extension(format!("json.{}.tmp", process::id()));

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| StagechainError::io_with_path(e, &temp_path))?;

        file.write_all(serialized.as_bytes())
            .map_err(|e| StagechainError::io_with_path(e, &temp_path))?;
        file.sync_all()
            .map_err(|e| StagechainError::io_with_path(e, &temp_path))?;
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(StagechainError::io_with_path(e, path));
    }

    debug!("Atomically wrote {}", path.display());
    Ok(())
}
