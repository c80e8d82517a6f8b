//! Shared fakes for sequencer integration tests.

#![allow(dead_code)]

use stagechain_core::config::{ChainConfig, ConfigHandle, KillTargets, Stage};
use stagechain_core::{LaunchError, Launcher, ProbeError, ProcessProbe, StageSequencer};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory process table.
#[derive(Default)]
pub struct FakeProbe {
    running: Mutex<HashSet<String>>,
    sweeps: Mutex<Vec<Vec<String>>>,
    panics_left: AtomicUsize,
}

impl FakeProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn start_process(&self, name: &str) {
        self.running.lock().unwrap().insert(name.to_lowercase());
    }

    pub fn exit_process(&self, name: &str) {
        self.running.lock().unwrap().remove(&name.to_lowercase());
    }

    /// Kill-target sweeps seen so far, as normalized pattern lists.
    pub fn sweeps(&self) -> Vec<Vec<String>> {
        self.sweeps.lock().unwrap().clone()
    }

    /// Make the next `count` probe calls panic.
    pub fn panic_next(&self, count: usize) {
        self.panics_left.store(count, Ordering::SeqCst);
    }

    fn maybe_panic(&self) {
        let left = self.panics_left.load(Ordering::SeqCst);
        if left > 0 {
            self.panics_left.store(left - 1, Ordering::SeqCst);
            panic!("simulated probe fault");
        }
    }
}

impl ProcessProbe for FakeProbe {
    fn is_running(&self, process_name: &str) -> Result<bool, ProbeError> {
        self.maybe_panic();
        Ok(self
            .running
            .lock()
            .unwrap()
            .contains(&process_name.to_lowercase()))
    }

    fn terminate_matching(&self, targets: &KillTargets) -> Result<usize, ProbeError> {
        self.sweeps.lock().unwrap().push(targets.patterns().to_vec());
        let mut running = self.running.lock().unwrap();
        let before = running.len();
        running.retain(|name| !targets.matches(name));
        Ok(before - running.len())
    }
}

/// Records launches; optionally "starts" the stage's process in a probe.
pub struct FakeLauncher {
    launched: Mutex<Vec<String>>,
    starts_in: Option<Arc<FakeProbe>>,
    fail: AtomicBool,
}

impl FakeLauncher {
    /// Launcher that records calls only.
    pub fn recording() -> Arc<Self> {
        Arc::new(Self {
            launched: Mutex::new(Vec::new()),
            starts_in: None,
            fail: AtomicBool::new(false),
        })
    }

    /// Launcher whose launches make the stage's process appear in `probe`.
    pub fn starting(probe: Arc<FakeProbe>) -> Arc<Self> {
        Arc::new(Self {
            launched: Mutex::new(Vec::new()),
            starts_in: Some(probe),
            fail: AtomicBool::new(false),
        })
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Names of the stages launched so far.
    pub fn launched(&self) -> Vec<String> {
        self.launched.lock().unwrap().clone()
    }
}

impl Launcher for FakeLauncher {
    fn launch(&self, stage: &Stage) -> Result<(), LaunchError> {
        self.launched.lock().unwrap().push(stage.name.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(LaunchError::InvalidPath {
                path: stage.executable_path.clone(),
            });
        }
        if let Some(probe) = &self.starts_in {
            probe.start_process(&stage.process_name);
        }
        Ok(())
    }
}

/// Counts completion callbacks.
#[derive(Clone, Default)]
pub struct CompletionCounter(Arc<AtomicUsize>);

impl CompletionCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    pub fn handler(&self) -> impl Fn() + Send + Sync + 'static {
        let counter = self.0.clone();
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Chain of `Game1..GameN` with processes `g1.exe..gN.exe`.
pub fn game_chain(count: usize) -> ChainConfig {
    ChainConfig::new(
        (1..=count)
            .map(|n| {
                Stage::new(
                    format!("Game{}", n),
                    format!("/games/g{}/g{}.exe", n, n),
                    format!("g{}.exe", n),
                )
            })
            .collect(),
    )
}

pub fn sequencer(
    chain: ChainConfig,
    probe: Arc<FakeProbe>,
    launcher: Arc<FakeLauncher>,
) -> (StageSequencer, ConfigHandle) {
    let handle = ConfigHandle::new(chain);
    let today = chrono::NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
    (
        StageSequencer::new(handle.clone(), probe, launcher, today),
        handle,
    )
}

/// Midday on the sequencer's start date, well away from the reset hour.
pub fn midday() -> chrono::NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2026, 10, 15)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}
