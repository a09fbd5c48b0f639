//! Boundary to the decision agent that proposes parameter changes.
//!
//! The control loop never knows how a proposal was produced; anything that
//! implements [`TuningAgent`] can drive a session, from a scripted test double
//! to an external process.
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;

use crate::batch::BatchResult;
use crate::character::CharacterSnapshot;
use crate::combat::Side;
use crate::evaluator::{BalanceBand, BalanceVerdict};
use crate::optimizer::IterationRecord;

/// One requested change. The parameter stays a free-form name until the
/// session resolves it, so unknown names can be rejected and recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDelta {
    pub side: Side,
    pub parameter: String,
    pub delta: f64,
}

impl ParameterDelta {
    #[must_use]
    pub fn new(side: Side, parameter: impl Into<String>, delta: f64) -> Self {
        Self {
            side,
            parameter: parameter.into(),
            delta,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Proposal {
    Change(Vec<ParameterDelta>),
    NoChange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentResponse {
    pub proposal: Proposal,
    pub rationale: Option<String>,
}

impl AgentResponse {
    #[must_use]
    pub const fn no_change() -> Self {
        Self {
            proposal: Proposal::NoChange,
            rationale: None,
        }
    }

    #[must_use]
    pub const fn change(deltas: Vec<ParameterDelta>) -> Self {
        Self {
            proposal: Proposal::Change(deltas),
            rationale: None,
        }
    }

    #[must_use]
    pub fn single(side: Side, parameter: impl Into<String>, delta: f64) -> Self {
        Self::change(vec![ParameterDelta::new(side, parameter, delta)])
    }

    #[must_use]
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("agent did not answer within {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
    #[error("agent transport failed: {message}")]
    Transport { message: String },
    #[error("agent reply was malformed: {message}")]
    Malformed { message: String },
}

impl AgentError {
    /// Timeouts and transport failures count toward the unreachable-agent
    /// budget; malformed replies do not.
    #[must_use]
    pub const fn is_communication_failure(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport { .. })
    }
}

/// Everything the agent may look at when deciding.
#[derive(Debug, Clone, Copy)]
pub struct AgentContext<'a> {
    pub iteration: u32,
    pub snapshot_a: &'a CharacterSnapshot,
    pub snapshot_b: &'a CharacterSnapshot,
    pub batch: &'a BatchResult,
    pub verdict: &'a BalanceVerdict,
    pub band: &'a BalanceBand,
    pub history: &'a [IterationRecord],
    pub timeout: Duration,
}

impl<'a> AgentContext<'a> {
    #[must_use]
    pub const fn snapshot(&self, side: Side) -> &'a CharacterSnapshot {
        match side {
            Side::A => self.snapshot_a,
            Side::B => self.snapshot_b,
        }
    }

    /// Wire form of the context for agents living outside the process.
    #[must_use]
    pub fn to_request(&self) -> AgentRequest<'a> {
        AgentRequest {
            iteration: self.iteration,
            a: self.snapshot_a,
            b: self.snapshot_b,
            batch: self.batch,
            verdict: self.verdict,
            band: *self.band,
            history: self.history,
            timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentRequest<'a> {
    pub iteration: u32,
    pub a: &'a CharacterSnapshot,
    pub b: &'a CharacterSnapshot,
    pub batch: &'a BatchResult,
    pub verdict: &'a BalanceVerdict,
    pub band: BalanceBand,
    pub history: &'a [IterationRecord],
    pub timeout_ms: u64,
}

/// Proposes parameter changes between batches.
pub trait TuningAgent {
    /// Short label for logs and reports.
    fn name(&self) -> &'static str;

    /// Answer within `ctx.timeout` or report [`AgentError::Timeout`].
    ///
    /// # Errors
    ///
    /// Returns an [`AgentError`] when no usable proposal could be produced.
    fn propose_delta(&mut self, ctx: &AgentContext<'_>) -> Result<AgentResponse, AgentError>;
}

/// Always answers "no change".
#[derive(Debug, Clone, Copy, Default)]
pub struct NoChangeAgent;

impl TuningAgent for NoChangeAgent {
    fn name(&self) -> &'static str {
        "no_change"
    }

    fn propose_delta(&mut self, _ctx: &AgentContext<'_>) -> Result<AgentResponse, AgentError> {
        Ok(AgentResponse::no_change().with_rationale("holding parameters"))
    }
}

/// Replays canned replies in order, then repeats a fallback forever.
#[derive(Debug, Clone)]
pub struct ScriptedAgent {
    script: VecDeque<Result<AgentResponse, AgentError>>,
    fallback: Result<AgentResponse, AgentError>,
    calls: u32,
}

impl ScriptedAgent {
    #[must_use]
    pub fn new(script: impl IntoIterator<Item = Result<AgentResponse, AgentError>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback: Ok(AgentResponse::no_change()),
            calls: 0,
        }
    }

    /// Agent that gives the same reply on every call.
    #[must_use]
    pub fn repeating(reply: Result<AgentResponse, AgentError>) -> Self {
        Self::new([]).with_fallback(reply)
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: Result<AgentResponse, AgentError>) -> Self {
        self.fallback = fallback;
        self
    }

    #[must_use]
    pub const fn calls(&self) -> u32 {
        self.calls
    }
}

impl TuningAgent for ScriptedAgent {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn propose_delta(&mut self, _ctx: &AgentContext<'_>) -> Result<AgentResponse, AgentError> {
        self.calls += 1;
        self.script
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{ConfidenceInterval, WinRateBasis};
    use crate::character::Params;
    use crate::evaluator::evaluate;

    fn fixture() -> (CharacterSnapshot, CharacterSnapshot, BatchResult) {
        let a = CharacterSnapshot {
            name: "A".into(),
            params: Params::default(),
        };
        let b = CharacterSnapshot {
            name: "B".into(),
            params: Params::default(),
        };
        let batch = BatchResult {
            matches: 10,
            wins_a: 8,
            wins_b: 2,
            draws: 0,
            subject: Side::A,
            basis: WinRateBasis::Decisive,
            win_rate: 0.8,
            confidence: ConfidenceInterval {
                low: 0.5,
                high: 0.95,
            },
            mean_turns: 12.0,
            health_trace: None,
        };
        (a, b, batch)
    }

    #[test]
    fn scripted_agent_replays_then_falls_back() {
        let (a, b, batch) = fixture();
        let band = BalanceBand::default();
        let verdict = evaluate(&batch, &band);
        let ctx = AgentContext {
            iteration: 0,
            snapshot_a: &a,
            snapshot_b: &b,
            batch: &batch,
            verdict: &verdict,
            band: &band,
            history: &[],
            timeout: Duration::from_millis(10),
        };
        let mut agent = ScriptedAgent::new([
            Ok(AgentResponse::single(Side::A, "attack_power", -2.0)),
            Err(AgentError::Timeout { timeout_ms: 10 }),
        ]);
        assert!(matches!(
            agent.propose_delta(&ctx).unwrap().proposal,
            Proposal::Change(_)
        ));
        assert!(agent.propose_delta(&ctx).is_err());
        assert_eq!(agent.propose_delta(&ctx).unwrap().proposal, Proposal::NoChange);
        assert_eq!(agent.calls(), 3);
    }

    #[test]
    fn request_serializes_context() {
        let (a, b, batch) = fixture();
        let band = BalanceBand::default();
        let verdict = evaluate(&batch, &band);
        let ctx = AgentContext {
            iteration: 2,
            snapshot_a: &a,
            snapshot_b: &b,
            batch: &batch,
            verdict: &verdict,
            band: &band,
            history: &[],
            timeout: Duration::from_secs(1),
        };
        let json = serde_json::to_value(ctx.to_request()).unwrap();
        assert_eq!(json["iteration"], 2);
        assert_eq!(json["verdict"]["verdict"], "favors_a");
        assert_eq!(json["a"]["attack_power"], 10.0);
        assert_eq!(json["timeout_ms"], 1000);
    }

    #[test]
    fn only_timeouts_and_transport_count_as_unreachable() {
        assert!(AgentError::Timeout { timeout_ms: 1 }.is_communication_failure());
        assert!(
            AgentError::Transport {
                message: "closed".into()
            }
            .is_communication_failure()
        );
        assert!(
            !AgentError::Malformed {
                message: "{".into()
            }
            .is_communication_failure()
        );
    }
}
