//! In-memory chain configuration.

use super::AppConfig;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// One entry in the launch chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Position in the chain (0-based).
    pub index: usize,
    /// Display name.
    pub name: String,
    /// Executable to open when the stage is launched.
    pub executable_path: PathBuf,
    /// OS process name that indicates the stage is running.
    pub process_name: String,
}

impl Stage {
    /// Create a stage. The index is assigned when the stage is added to a
    /// [`ChainConfig`].
    pub fn new(
        name: impl Into<String>,
        executable_path: impl AsRef<Path>,
        process_name: impl Into<String>,
    ) -> Self {
        Self {
            index: 0,
            name: name.into(),
            executable_path: executable_path.as_ref().to_path_buf(),
            process_name: process_name.into(),
        }
    }
}

/// Auxiliary processes to terminate at stage boundaries.
///
/// Keeps the raw configured strings (for writing the document back) next to
/// the normalized lowercase patterns used for matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KillTargets {
    raw: Vec<String>,
    patterns: Vec<String>,
}

impl KillTargets {
    pub fn new<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let raw: Vec<String> = raw.into_iter().map(Into::into).collect();
        let mut patterns: Vec<String> = Vec::new();
        for pattern in raw.iter().filter_map(|entry| normalize_kill_target(entry)) {
            if !patterns.contains(&pattern) {
                patterns.push(pattern);
            }
        }
        Self { raw, patterns }
    }

    /// Strings exactly as configured.
    pub fn raw(&self) -> &[String] {
        &self.raw
    }

    /// Normalized match patterns, sentinel and empty entries removed.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// True when nothing would ever be terminated.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Case-insensitive exact match of a process name against the patterns.
    pub fn matches(&self, process_name: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let name = process_name.to_lowercase();
        self.patterns.iter().any(|pattern| *pattern == name)
    }
}

/// Turn a configured kill target into a match pattern.
///
/// `"HoYoPlay (hoyoplay.exe)"` yields `"hoyoplay.exe"`; plain strings are
/// lowercased as-is. Empty strings and the "none" sentinel yield `None`.
pub fn normalize_kill_target(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case(AppConfig::KILL_TARGET_NONE)
        || trimmed == AppConfig::KILL_TARGET_NONE_LEGACY
    {
        return None;
    }

    let pattern = match trimmed.rfind('(') {
        Some(open) if trimmed.contains(')') => {
            let inner = &trimmed[open + 1..];
            inner.split(')').next().unwrap_or(inner)
        }
        _ => trimmed,
    };

    let pattern = pattern.trim().to_lowercase();
    if pattern.is_empty() {
        None
    } else {
        Some(pattern)
    }
}

/// The stage chain and its tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    stages: Vec<Stage>,
    launch_interval_secs: u64,
    kill_targets: KillTargets,
    auto_exit_on_completion: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ChainConfig {
    /// Create a chain from ordered stages; indexes are reassigned by position.
    pub fn new(stages: Vec<Stage>) -> Self {
        let stages = stages
            .into_iter()
            .enumerate()
            .map(|(index, stage)| Stage { index, ..stage })
            .collect();

        Self {
            stages,
            launch_interval_secs: AppConfig::DEFAULT_LAUNCH_INTERVAL_SECS,
            kill_targets: KillTargets::default(),
            auto_exit_on_completion: false,
        }
    }

    pub fn with_launch_interval(mut self, secs: u64) -> Self {
        self.launch_interval_secs = secs;
        self
    }

    pub fn with_kill_targets(mut self, kill_targets: KillTargets) -> Self {
        self.kill_targets = kill_targets;
        self
    }

    pub fn with_auto_exit(mut self, auto_exit: bool) -> Self {
        self.auto_exit_on_completion = auto_exit;
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self, index: usize) -> Option<&Stage> {
        self.stages.get(index)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn launch_interval_secs(&self) -> u64 {
        self.launch_interval_secs
    }

    pub fn kill_targets(&self) -> &KillTargets {
        &self.kill_targets
    }

    pub fn auto_exit_on_completion(&self) -> bool {
        self.auto_exit_on_completion
    }
}

/// Shared, swappable chain configuration.
///
/// Readers get a whole `Arc<ChainConfig>`; `replace` swaps it in one step, so
/// a reader never sees a half-updated stage list.
#[derive(Debug, Clone, Default)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Arc<ChainConfig>>>,
}

impl ConfigHandle {
    pub fn new(config: ChainConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// Current configuration snapshot.
    pub fn load(&self) -> Arc<ChainConfig> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replace the configuration wholesale.
    pub fn replace(&self, config: ChainConfig) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(config);
    }
}
