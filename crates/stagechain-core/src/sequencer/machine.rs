//! The stage-sequencing state machine.
//!
//! [`StageSequencer`] is synchronous and owns no clock: the worker passes the
//! local time into every [`tick`](StageSequencer::tick), and tests drive it
//! directly with fake probes and launchers.

use super::Phase;
use crate::config::{ChainConfig, ConfigHandle, SequencerConfig, Stage};
use crate::error::{LaunchError, Result, StagechainError};
use crate::process::{Launcher, ProcessProbe};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Callback fired when a chain completes with auto-exit enabled.
pub type CompletionHandler = Arc<dyn Fn() + Send + Sync>;

/// What a tick did, which decides how long the worker sleeps before the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    /// An interval countdown step ran.
    Countdown,
    /// A regular process check ran (or nothing was due).
    Poll,
}

impl TickKind {
    pub fn delay(self) -> Duration {
        match self {
            TickKind::Countdown => SequencerConfig::COUNTDOWN_STEP,
            TickKind::Poll => SequencerConfig::POLL_INTERVAL,
        }
    }
}

/// Sequences the stage chain from observed process state.
///
/// The chain is read from the [`ConfigHandle`] while in standby and pinned
/// once a cycle begins, so a reload never shifts the stage a phase index
/// points at. The pinned chain is released when the phase returns to standby.
pub struct StageSequencer {
    config: ConfigHandle,
    chain: Arc<ChainConfig>,
    probe: Arc<dyn ProcessProbe>,
    launcher: Arc<dyn Launcher>,
    phase: Phase,
    chain_launch_active: bool,
    last_reset_date: NaiveDate,
    on_completion: Option<CompletionHandler>,
}

impl StageSequencer {
    pub fn new(
        config: ConfigHandle,
        probe: Arc<dyn ProcessProbe>,
        launcher: Arc<dyn Launcher>,
        today: NaiveDate,
    ) -> Self {
        let chain = config.load();
        Self {
            config,
            chain,
            probe,
            launcher,
            phase: Phase::Standby,
            chain_launch_active: true,
            last_reset_date: today,
            on_completion: None,
        }
    }

    /// Install the completion handler, replacing any previous one.
    pub fn set_completion_handler(&mut self, handler: CompletionHandler) {
        self.on_completion = Some(handler);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn chain_launch_active(&self) -> bool {
        self.chain_launch_active
    }

    pub fn last_reset_date(&self) -> NaiveDate {
        self.last_reset_date
    }

    /// The chain the current phase refers to.
    pub fn chain(&self) -> &Arc<ChainConfig> {
        &self.chain
    }

    /// Run one polling cycle.
    pub fn tick(&mut self, now: NaiveDateTime) -> TickKind {
        self.check_daily_reset(now);

        if let Phase::AwaitingInterval {
            index,
            remaining_secs,
        } = self.phase
        {
            self.count_down(index, remaining_secs);
            return TickKind::Countdown;
        }

        if self.phase.is_standby() {
            self.chain = self.config.load();
        }
        if self.chain.is_empty() {
            return TickKind::Poll;
        }

        match self.phase {
            Phase::Standby => self.detect_first_stage(),
            Phase::AwaitingLaunchConfirmation { index } => self.confirm_launch(index),
            Phase::Monitoring { index } => self.check_exit(index),
            Phase::AwaitingInterval { .. } => {}
        }
        TickKind::Poll
    }

    /// Launch a stage immediately and wait for its process.
    ///
    /// The phase becomes `AwaitingLaunchConfirmation` even when the launch
    /// fails, so a manual start of the program is still picked up.
    pub fn start(&mut self, index: usize, chain_launch: bool) -> Result<()> {
        let chain = self.config.load();
        if index >= chain.len() {
            return Err(StagechainError::InvalidStageIndex {
                index,
                len: chain.len(),
            });
        }

        self.chain = chain;
        self.chain_launch_active = chain_launch;
        info!(
            "Starting stage {} ({})",
            index,
            if chain_launch { "chain" } else { "single" }
        );

        let result = self.launch_stage(index);
        self.phase = Phase::AwaitingLaunchConfirmation { index };

        result.map_err(|source| StagechainError::Launch {
            stage: self.chain.stages()[index].name.clone(),
            source,
        })
    }

    /// Force-advance past the current stage without waiting for it to exit.
    ///
    /// Returns `false` (and does nothing) in standby or with an empty chain.
    pub fn skip(&mut self) -> bool {
        let Some(index) = self.phase.index() else {
            debug!("Skip ignored in standby");
            return false;
        };
        if self.chain.is_empty() {
            return false;
        }

        info!("Skipping stage {}", index);
        self.terminate_kill_targets();
        self.advance_from(index);
        true
    }

    /// Return to standby. Nothing is launched or terminated.
    pub fn reset(&mut self) {
        info!("Resetting to standby");
        self.enter_standby();
    }

    /// Go to standby and release the pinned chain.
    fn enter_standby(&mut self) {
        self.phase = Phase::Standby;
        self.chain = self.config.load();
    }

    fn check_daily_reset(&mut self, now: NaiveDateTime) {
        let today = now.date();
        if now.hour() != SequencerConfig::DAILY_RESET_HOUR || today <= self.last_reset_date {
            return;
        }

        info!(
            "{}:00 reached, resetting daily state (was {})",
            SequencerConfig::DAILY_RESET_HOUR,
            self.phase
        );
        self.enter_standby();
        self.last_reset_date = today;
    }

    fn count_down(&mut self, index: usize, remaining_secs: u64) {
        let remaining_secs = remaining_secs.saturating_sub(1);
        if remaining_secs > 0 {
            self.phase = Phase::AwaitingInterval {
                index,
                remaining_secs,
            };
            return;
        }

        self.launch_pending(index);
    }

    /// Launch a scheduled stage and wait for its process.
    fn launch_pending(&mut self, index: usize) {
        // Launch errors are already logged; the user may still start it by hand.
        let _ = self.launch_stage(index);
        self.phase = Phase::AwaitingLaunchConfirmation { index };
    }

    fn detect_first_stage(&mut self) {
        let chain = Arc::clone(&self.chain);
        let Some(first) = chain.stages().first() else {
            return;
        };

        if self.probe_running(first) == Some(true) {
            info!("{} detected, monitoring stage 0", first.process_name);
            self.chain_launch_active = true;
            self.phase = Phase::Monitoring { index: 0 };
            self.terminate_kill_targets();
        }
    }

    fn confirm_launch(&mut self, index: usize) {
        let chain = Arc::clone(&self.chain);
        let Some(stage) = chain.stage(index) else {
            warn!("Stage {} missing from pinned chain, resetting", index);
            self.enter_standby();
            return;
        };

        if self.probe_running(stage) == Some(true) {
            info!("{} is running", stage.process_name);
            self.phase = Phase::Monitoring { index };
        }
    }

    fn check_exit(&mut self, index: usize) {
        let chain = Arc::clone(&self.chain);
        let Some(stage) = chain.stage(index) else {
            warn!("Stage {} missing from pinned chain, resetting", index);
            self.enter_standby();
            return;
        };

        // A failed probe is not an exit.
        if self.probe_running(stage) != Some(false) {
            return;
        }

        info!("{} has exited", stage.process_name);
        self.terminate_kill_targets();
        self.advance_from(index);
    }

    fn advance_from(&mut self, index: usize) {
        let next = index + 1;
        match self.chain.stage(next) {
            Some(stage) if self.chain_launch_active => {
                let interval = self.chain.launch_interval_secs();
                if interval == 0 {
                    info!("Launching {} without delay", stage.name);
                    self.launch_pending(next);
                    return;
                }
                info!("Preparing to launch {} in {}s", stage.name, interval);
                self.phase = Phase::AwaitingInterval {
                    index: next,
                    remaining_secs: interval,
                };
            }
            _ => self.complete(),
        }
    }

    fn complete(&mut self) {
        info!("Chain completed, returning to standby");
        let auto_exit = self.chain.auto_exit_on_completion();
        self.enter_standby();

        if !auto_exit {
            return;
        }
        if let Some(handler) = &self.on_completion {
            info!("Auto-exit is enabled, firing completion handler");
            handler();
        }
    }

    fn launch_stage(&self, index: usize) -> std::result::Result<(), LaunchError> {
        let Some(stage) = self.chain.stage(index) else {
            return Err(LaunchError::Unexpected {
                message: format!("stage {} is not in the chain", index),
            });
        };

        let result = self.launcher.launch(stage);
        if let Err(e) = &result {
            error!("Failed to launch {}: {}", stage.name, e);
        }
        result
    }

    fn probe_running(&self, stage: &Stage) -> Option<bool> {
        match self.probe.is_running(&stage.process_name) {
            Ok(running) => Some(running),
            Err(e) => {
                warn!("Probe for {} failed: {}", stage.process_name, e);
                None
            }
        }
    }

    fn terminate_kill_targets(&self) {
        let targets = self.chain.kill_targets();
        if targets.is_empty() {
            return;
        }
        match self.probe.terminate_matching(targets) {
            Ok(0) => debug!("No kill targets running"),
            Ok(count) => info!("Requested termination of {} kill-target processes", count),
            Err(e) => warn!("Kill-target sweep failed: {}", e),
        }
    }
}
