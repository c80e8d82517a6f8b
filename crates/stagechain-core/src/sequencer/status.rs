//! Human-readable status line.

use super::Phase;
use crate::config::ChainConfig;

/// Describe the sequencer state for a status display.
///
/// Pure: reads the phase and chain, never mutates anything.
pub fn status_text(phase: Phase, chain_launch_active: bool, chain: &ChainConfig) -> String {
    let stages = chain.stages();

    match phase {
        Phase::Standby => match stages.first() {
            None => "Standby (no stages registered)".to_string(),
            Some(first) => format!("Standby (waiting for {} to start)", first.name),
        },
        Phase::AwaitingInterval {
            index,
            remaining_secs,
        } => match stages.get(index) {
            Some(stage) => format!(
                "Waiting for interval... ({}s until {})",
                remaining_secs, stage.name
            ),
            None => "Unknown".to_string(),
        },
        Phase::AwaitingLaunchConfirmation { index } => match stages.get(index) {
            Some(stage) => format!("Launching {}... (waiting for process to start)", stage.name),
            None => "Unknown".to_string(),
        },
        Phase::Monitoring { index } => {
            let Some(current) = stages.get(index) else {
                return "Unknown".to_string();
            };
            match stages.get(index + 1) {
                Some(next) if chain_launch_active => {
                    format!("{} running (launches {} after exit)", current.name, next.name)
                }
                Some(_) => format!("{} running (single launch)", current.name),
                None => format!("{} running (final stage)", current.name),
            }
        }
    }
}
