//! Stage sequencing.
//!
//! - `phase` - the tagged phase enum
//! - `machine` - the synchronous state machine ([`StageSequencer`])
//! - `status` - status-line projection
//! - `worker` - the background task and command surface ([`SequencerService`])
//!
//! The worker ticks every [`POLL_INTERVAL`](crate::config::SequencerConfig::POLL_INTERVAL)
//! and every [`COUNTDOWN_STEP`](crate::config::SequencerConfig::COUNTDOWN_STEP)
//! while an interval countdown is running.

mod machine;
mod phase;
mod status;
mod worker;

pub use machine::{CompletionHandler, StageSequencer, TickKind};
pub use phase::Phase;
pub use status::status_text;
pub use worker::{SequencerService, SequencerSnapshot};
