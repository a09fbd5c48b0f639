//! Iterative balancing control loop.
//!
//! A session alternates between measuring the current parameters with a
//! batch of matches and asking a [`TuningAgent`](crate::agent::TuningAgent)
//! what to change, until the win rate lands inside the band, the iteration
//! budget runs out, or the agent stops answering.
mod history;
mod session;

use thiserror::Error;

use crate::batch::BatchError;
use crate::character::CharacterError;
use crate::config::ConfigError;

pub use history::{Adjustment, AdjustmentOutcome, AppliedDelta, AppliedDeltas, IterationRecord};
pub use session::{LoopState, OptimizationSession, SessionReport, TerminationReason};

/// Fatal session errors. Recoverable agent problems never surface here; they
/// are recorded in the history instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid character: {0}")]
    Character(#[from] CharacterError),
}

impl From<BatchError> for SessionError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::Config(inner) => Self::Config(inner),
            BatchError::Character(inner) => Self::Character(inner),
        }
    }
}
