//! Stagechain - headless host for the stage sequencer.
//!
//! Loads the chain configuration, runs the sequencer worker and logs the
//! status line whenever it changes, until Ctrl+C or (with auto-exit
//! enabled) until the chain completes.

use anyhow::{Context, Result};
use clap::Parser;
use stagechain_core::config::{load_chain_config_or_default, AppConfig, ConfigHandle};
use stagechain_core::{CancellationToken, SequencerService};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const STATUS_REFRESH: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(name = "stagechain")]
#[command(about = "Launch a chain of applications one after another")]
struct Args {
    /// Configuration file (defaults to config.json next to the executable)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Launch a stage immediately (defaults to the first stage)
    #[arg(long, value_name = "INDEX", num_args = 0..=1, default_missing_value = "0")]
    start: Option<usize>,

    /// With --start, launch only that stage instead of the rest of the chain
    #[arg(long, requires = "start")]
    single: bool,
}

fn default_config_path() -> Result<PathBuf> {
    let exe_path = std::env::current_exe().context("Failed to locate executable")?;
    let dir = match exe_path.parent() {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    Ok(dir.join(AppConfig::CONFIG_FILE_NAME))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting {}", AppConfig::APP_NAME);

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    info!("Configuration: {}", config_path.display());

    let chain = load_chain_config_or_default(&config_path);
    let service = SequencerService::with_system_defaults(ConfigHandle::new(chain));

    let shutdown = CancellationToken::new();
    let on_complete = shutdown.clone();
    service.set_completion_handler(move || on_complete.cancel());

    service.start();

    if let Some(index) = args.start {
        // A failed launch still leaves the sequencer waiting for a manual start.
        if let Err(e) = service.start_stage(index, !args.single).await {
            warn!("{}", e);
        }
    }

    let mut last_status = String::new();
    let mut refresh = tokio::time::interval(STATUS_REFRESH);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl+C")?;
                info!("Shutdown signal received, exiting");
                break;
            }
            _ = shutdown.cancelled() => {
                info!("Chain completed, exiting");
                break;
            }
            _ = refresh.tick() => {
                let status = service.status_text();
                if status != last_status {
                    info!("{}", status);
                    last_status = status;
                }
            }
        }
    }

    service.stop().await;
    Ok(())
}
