//! Sequencer phases.

use std::fmt;

/// Where the chain currently stands.
///
/// Every index refers to the chain snapshot the sequencer is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Idle; waiting for a manual start or for stage 0 to appear.
    #[default]
    Standby,
    /// A launch was requested; waiting for the stage's process to appear.
    AwaitingLaunchConfirmation { index: usize },
    /// The stage's process is running; waiting for it to exit.
    Monitoring { index: usize },
    /// Counting down before launching the stage.
    AwaitingInterval { index: usize, remaining_secs: u64 },
}

impl Phase {
    /// Stage index of the phase, `None` in standby.
    pub fn index(&self) -> Option<usize> {
        match *self {
            Phase::Standby => None,
            Phase::AwaitingLaunchConfirmation { index }
            | Phase::Monitoring { index }
            | Phase::AwaitingInterval { index, .. } => Some(index),
        }
    }

    pub fn is_standby(&self) -> bool {
        matches!(self, Phase::Standby)
    }

    /// True while a stage is pending launch or pending its process start.
    pub fn is_waiting_for_launch(&self) -> bool {
        matches!(
            self,
            Phase::AwaitingLaunchConfirmation { .. } | Phase::AwaitingInterval { .. }
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Standby => write!(f, "standby"),
            Phase::AwaitingLaunchConfirmation { index } => {
                write!(f, "awaiting launch of stage {}", index)
            }
            Phase::Monitoring { index } => write!(f, "monitoring stage {}", index),
            Phase::AwaitingInterval {
                index,
                remaining_secs,
            } => write!(f, "stage {} in {}s", index, remaining_secs),
        }
    }
}
