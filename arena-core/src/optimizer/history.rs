use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::batch::BatchResult;
use crate::character::{AppliedChange, CharacterSnapshot};
use crate::combat::Side;
use crate::evaluator::BalanceVerdict;

/// A clamped change applied to one side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AppliedDelta {
    pub side: Side,
    #[serde(flatten)]
    pub change: AppliedChange,
}

pub type AppliedDeltas = SmallVec<[AppliedDelta; 2]>;

/// What happened to the parameters after an unbalanced batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdjustmentOutcome {
    Applied { deltas: AppliedDeltas },
    NoChange,
    /// The proposal was unusable; nothing was applied.
    Rejected { reason: String },
    /// The agent could not be reached or did not answer in time.
    AgentFailed { reason: String },
}

impl AdjustmentOutcome {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Applied { .. } => "applied",
            Self::NoChange => "no_change",
            Self::Rejected { .. } => "rejected",
            Self::AgentFailed { .. } => "agent_failed",
        }
    }

    #[must_use]
    pub const fn changed_parameters(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    #[serde(flatten)]
    pub outcome: AdjustmentOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// One evaluation of the control loop. Snapshots are taken at the start of
/// the iteration; `adjustment` is absent when the loop stopped on this
/// iteration without consulting the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: u32,
    pub snapshot_a: CharacterSnapshot,
    pub snapshot_b: CharacterSnapshot,
    pub batch: BatchResult,
    pub verdict: BalanceVerdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjustment: Option<Adjustment>,
}

impl IterationRecord {
    #[must_use]
    pub const fn snapshot(&self, side: Side) -> &CharacterSnapshot {
        match side {
            Side::A => &self.snapshot_a,
            Side::B => &self.snapshot_b,
        }
    }
}
