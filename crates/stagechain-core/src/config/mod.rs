//! Centralized configuration for stagechain.
//!
//! Timing constants live on associated-constant structs; the chain itself
//! (stages, interval, kill targets) is a [`ChainConfig`] supplied by the host,
//! usually loaded from the JSON document handled in [`store`].

mod model;
pub mod store;

pub use model::{normalize_kill_target, ChainConfig, ConfigHandle, KillTargets, Stage};
pub use store::{load_chain_config, load_chain_config_or_default, save_chain_config};

use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "stagechain";
    pub const CONFIG_FILE_NAME: &'static str = "config.json";
    /// Kill-target value meaning "nothing selected".
    pub const KILL_TARGET_NONE: &'static str = "none";
    /// Sentinel written by older configuration editors.
    pub const KILL_TARGET_NONE_LEGACY: &'static str = "なし";
    pub const DEFAULT_LAUNCH_INTERVAL_SECS: u64 = 5;
}

/// Timing for the sequencer worker.
pub struct SequencerConfig;

impl SequencerConfig {
    /// Delay between process checks when no countdown is running.
    pub const POLL_INTERVAL: Duration = Duration::from_secs(3);
    /// One countdown decrement.
    pub const COUNTDOWN_STEP: Duration = Duration::from_secs(1);
    /// Local hour at which the chain is forced back to standby once per day.
    pub const DAILY_RESET_HOUR: u32 = 5;
    /// How long `stop()` waits for the worker before abandoning it.
    pub const STOP_TIMEOUT: Duration = Duration::from_secs(2);
}
