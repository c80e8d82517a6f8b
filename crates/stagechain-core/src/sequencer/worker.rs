//! Background worker that drives the [`StageSequencer`].
//!
//! Ticks and commands run on Tokio's blocking pool, since process-table scans
//! and shell launches block; the async task only schedules them. Commands from
//! other contexts arrive over an mpsc queue and run between ticks; observers
//! read a [`SequencerSnapshot`] republished after every tick and command.

use super::machine::{CompletionHandler, StageSequencer, TickKind};
use super::{status_text, Phase};
use crate::cancel::CancellationToken;
use crate::config::{ChainConfig, ConfigHandle, SequencerConfig};
use crate::error::{Result, StagechainError};
use crate::process::{Launcher, ProcessProbe, ShellLauncher, SystemProbe};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{debug, error, info, warn};

/// Read-only view of the sequencer for status displays.
#[derive(Debug, Clone)]
pub struct SequencerSnapshot {
    pub phase: Phase,
    pub chain_launch_active: bool,
    /// The chain `phase` refers to.
    pub chain: Arc<ChainConfig>,
}

impl SequencerSnapshot {
    fn capture(sequencer: &StageSequencer) -> Self {
        Self {
            phase: sequencer.phase(),
            chain_launch_active: sequencer.chain_launch_active(),
            chain: Arc::clone(sequencer.chain()),
        }
    }

    pub fn status_text(&self) -> String {
        status_text(self.phase, self.chain_launch_active, &self.chain)
    }

    pub fn is_waiting_for_launch(&self) -> bool {
        self.phase.is_waiting_for_launch()
    }
}

enum Command {
    Start {
        index: usize,
        chain_launch: bool,
        respond_to: oneshot::Sender<Result<()>>,
    },
    Skip,
    Reset,
}

type SharedSequencer = Arc<Mutex<StageSequencer>>;
type SharedSnapshot = Arc<RwLock<SequencerSnapshot>>;

struct RunningWorker {
    commands: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns the sequencer and its worker task.
///
/// # Example
///
/// ```rust,no_run
/// use stagechain_core::config::{ChainConfig, ConfigHandle, Stage};
/// use stagechain_core::sequencer::SequencerService;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> stagechain_core::Result<()> {
///     let chain = ChainConfig::new(vec![Stage::new("Game1", "C:/Games/g1.exe", "g1.exe")]);
///     let service = SequencerService::with_system_defaults(ConfigHandle::new(chain));
///
///     service.start();
///     service.start_stage(0, true).await?;
///     println!("{}", service.status_text());
///     service.stop().await;
///     Ok(())
/// }
/// ```
pub struct SequencerService {
    config: ConfigHandle,
    /// Outlives worker restarts, so state survives `stop()`/`start()`.
    sequencer: SharedSequencer,
    snapshot: SharedSnapshot,
    completion: Arc<Mutex<Option<CompletionHandler>>>,
    worker: Mutex<Option<RunningWorker>>,
}

impl SequencerService {
    pub fn new(
        config: ConfigHandle,
        probe: Arc<dyn ProcessProbe>,
        launcher: Arc<dyn Launcher>,
    ) -> Self {
        let completion: Arc<Mutex<Option<CompletionHandler>>> = Arc::new(Mutex::new(None));
        let today = chrono::Local::now().date_naive();
        let mut sequencer = StageSequencer::new(config.clone(), probe, launcher, today);

        let slot = completion.clone();
        sequencer.set_completion_handler(Arc::new(move || {
            let handler = slot.lock().unwrap_or_else(PoisonError::into_inner).clone();
            if let Some(handler) = handler {
                handler();
            }
        }));
        let snapshot = SequencerSnapshot::capture(&sequencer);

        Self {
            config,
            sequencer: Arc::new(Mutex::new(sequencer)),
            snapshot: Arc::new(RwLock::new(snapshot)),
            completion,
            worker: Mutex::new(None),
        }
    }

    /// Service backed by the OS process table and the shell launcher.
    pub fn with_system_defaults(config: ConfigHandle) -> Self {
        Self::new(
            config,
            Arc::new(SystemProbe::new()),
            Arc::new(ShellLauncher::new()),
        )
    }

    /// Set the callback fired when a chain completes with auto-exit enabled.
    ///
    /// It runs on the worker, so it must not block on the service.
    pub fn set_completion_handler<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut slot = self.completion.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            debug!("Replacing completion handler");
        }
        *slot = Some(Arc::new(handler));
    }

    /// Spawn the worker. No-op if it is already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.is_some() {
            return;
        }

        let (commands, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_worker(
            self.sequencer.clone(),
            receiver,
            cancel.clone(),
            self.snapshot.clone(),
        ));

        *worker = Some(RunningWorker {
            commands,
            cancel,
            handle,
        });
    }

    /// Stop the worker, waiting up to [`SequencerConfig::STOP_TIMEOUT`].
    ///
    /// A worker that does not stop in time is aborted. A tick or command
    /// already on the blocking pool still runs to completion.
    pub async fn stop(&self) {
        let running = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(running) = running else {
            return;
        };

        running.cancel.cancel();
        let mut handle = running.handle;
        match timeout(SequencerConfig::STOP_TIMEOUT, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Sequencer worker ended abnormally: {}", e),
            Err(_) => {
                warn!(
                    "Sequencer worker did not stop within {:?}, aborting it",
                    SequencerConfig::STOP_TIMEOUT
                );
                handle.abort();
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn send(&self, command: Command) -> Result<()> {
        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        let running = worker.as_ref().ok_or(StagechainError::WorkerNotRunning)?;
        running
            .commands
            .send(command)
            .map_err(|_| StagechainError::WorkerNotRunning)
    }

    /// Launch stage `index` now; with `chain_launch` the following stages
    /// are launched in turn as each one exits.
    pub async fn start_stage(&self, index: usize, chain_launch: bool) -> Result<()> {
        let (respond_to, response) = oneshot::channel();
        self.send(Command::Start {
            index,
            chain_launch,
            respond_to,
        })?;
        response
            .await
            .map_err(|_| StagechainError::WorkerNotRunning)?
    }

    /// Advance past the current stage without waiting for it to exit.
    pub fn skip(&self) -> Result<()> {
        self.send(Command::Skip)
    }

    /// Return to standby.
    pub fn reset(&self) -> Result<()> {
        self.send(Command::Reset)
    }

    /// Swap in a new chain configuration and return to standby.
    pub fn reload_config(&self, config: ChainConfig) {
        info!("Reloading chain configuration ({} stages)", config.len());
        self.config.replace(config);

        if self.send(Command::Reset).is_err() {
            let mut sequencer = self.sequencer.lock().unwrap_or_else(PoisonError::into_inner);
            sequencer.reset();
            publish(&self.snapshot, &sequencer);
        }
    }

    pub fn snapshot(&self) -> SequencerSnapshot {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn phase(&self) -> Phase {
        self.snapshot().phase
    }

    pub fn status_text(&self) -> String {
        self.snapshot().status_text()
    }

    pub fn is_waiting_for_launch(&self) -> bool {
        self.snapshot().is_waiting_for_launch()
    }

    /// Shared configuration handle.
    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }
}

fn publish(snapshot: &RwLock<SequencerSnapshot>, sequencer: &StageSequencer) {
    let next = SequencerSnapshot::capture(sequencer);
    *snapshot.write().unwrap_or_else(PoisonError::into_inner) = next;
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run `f` against the sequencer on the blocking pool, then republish.
///
/// Returns `None` if `f` panicked; the panic is logged and the sequencer
/// stays usable.
async fn on_sequencer<T, F>(
    sequencer: &SharedSequencer,
    snapshot: &SharedSnapshot,
    what: &'static str,
    f: F,
) -> Option<T>
where
    F: FnOnce(&mut StageSequencer) -> T + Send + 'static,
    T: Send + 'static,
{
    let sequencer = Arc::clone(sequencer);
    let snapshot = Arc::clone(snapshot);
    let joined = tokio::task::spawn_blocking(move || {
        let mut guard = sequencer.lock().unwrap_or_else(PoisonError::into_inner);
        let outcome = catch_unwind(AssertUnwindSafe(|| f(&mut *guard)));
        publish(&snapshot, &guard);
        outcome.map_err(|payload| panic_message(payload.as_ref()))
    })
    .await;

    match joined {
        Ok(Ok(value)) => Some(value),
        Ok(Err(message)) => {
            error!("{} failed: {}", what, message);
            None
        }
        Err(e) => {
            error!("{} task failed: {}", what, e);
            None
        }
    }
}

async fn handle_command(
    sequencer: &SharedSequencer,
    snapshot: &SharedSnapshot,
    command: Command,
) {
    match command {
        Command::Start {
            index,
            chain_launch,
            respond_to,
        } => {
            let result = on_sequencer(sequencer, snapshot, "Start command", move |s| {
                s.start(index, chain_launch)
            })
            .await;
            // A panicked start drops `respond_to`; the caller sees the worker as gone.
            if let Some(result) = result {
                let _ = respond_to.send(result);
            }
        }
        Command::Skip => {
            on_sequencer(sequencer, snapshot, "Skip command", |s| {
                s.skip();
            })
            .await;
        }
        Command::Reset => {
            on_sequencer(sequencer, snapshot, "Reset command", |s| s.reset()).await;
        }
    }
}

async fn run_worker(
    sequencer: SharedSequencer,
    mut commands: mpsc::UnboundedReceiver<Command>,
    cancel: CancellationToken,
    snapshot: SharedSnapshot,
) {
    info!("Sequencer worker started");

    loop {
        let now = chrono::Local::now().naive_local();
        let tick = on_sequencer(&sequencer, &snapshot, "Monitor tick", move |s| s.tick(now));
        let tick = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            kind = tick => kind,
        };
        let delay = tick.map_or(SequencerConfig::POLL_INTERVAL, TickKind::delay);

        let deadline = Instant::now() + delay;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Sequencer worker stopped");
                    return;
                }
                command = commands.recv() => {
                    let Some(command) = command else {
                        info!("Command queue closed, sequencer worker exiting");
                        return;
                    };
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = handle_command(&sequencer, &snapshot, command) => {}
                    }
                }
                _ = sleep_until(deadline) => break,
            }
        }
    }

    info!("Sequencer worker stopped");
}
