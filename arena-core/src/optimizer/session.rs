use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use super::SessionError;
use super::history::{Adjustment, AdjustmentOutcome, AppliedDelta, AppliedDeltas, IterationRecord};
use crate::agent::{AgentContext, AgentError, ParameterDelta, Proposal, TuningAgent};
use crate::batch::run_batch;
use crate::character::{Character, CharacterError, CharacterSnapshot};
use crate::combat::Side;
use crate::config::SessionConfig;
use crate::evaluator::{BalanceVerdict, evaluate};
use crate::rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Running,
    Converged,
    Exhausted,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Balanced,
    MaxIterations,
    AgentUnreachable,
}

impl TerminationReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::MaxIterations => "max_iterations",
            Self::AgentUnreachable => "agent_unreachable",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final state of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub final_a: CharacterSnapshot,
    pub final_b: CharacterSnapshot,
    pub reason: TerminationReason,
    pub iterations_run: u32,
    pub seed: u64,
    pub agent: String,
    pub config: SessionConfig,
    pub history: Vec<IterationRecord>,
}

impl SessionReport {
    #[must_use]
    pub const fn is_balanced(&self) -> bool {
        matches!(self.reason, TerminationReason::Balanced)
    }

    #[must_use]
    pub fn final_verdict(&self) -> Option<&BalanceVerdict> {
        self.history.last().map(|record| &record.verdict)
    }
}

/// Owns both characters and the append-only history for one balancing run.
#[derive(Debug, Clone)]
pub struct OptimizationSession {
    a: Character,
    b: Character,
    config: SessionConfig,
    seed: u64,
    iteration: u32,
    state: LoopState,
    reason: Option<TerminationReason>,
    consecutive_agent_failures: u32,
    history: Vec<IterationRecord>,
    agent_name: Option<&'static str>,
}

impl OptimizationSession {
    /// Start a session. Without a configured seed one is drawn from entropy
    /// and kept for the report.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] for invalid knobs and
    /// [`SessionError::Character`] for out-of-range characters.
    pub fn new(a: Character, b: Character, config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        a.validate()?;
        b.validate()?;
        let seed = config.seed.unwrap_or_else(rng::entropy_seed);
        Ok(Self {
            a,
            b,
            config,
            seed,
            iteration: 0,
            state: LoopState::Running,
            reason: None,
            consecutive_agent_failures: 0,
            history: Vec::new(),
            agent_name: None,
        })
    }

    #[must_use]
    pub const fn state(&self) -> LoopState {
        self.state
    }

    #[must_use]
    pub const fn reason(&self) -> Option<TerminationReason> {
        self.reason
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub const fn iteration(&self) -> u32 {
        self.iteration
    }

    #[must_use]
    pub fn history(&self) -> &[IterationRecord] {
        &self.history
    }

    #[must_use]
    pub const fn character(&self, side: Side) -> &Character {
        match side {
            Side::A => &self.a,
            Side::B => &self.b,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run one iteration: batch, verdict and, when still unbalanced with
    /// budget left, one agent consultation. A finished session is left as is.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the batch cannot run.
    pub fn step(&mut self, agent: &mut dyn TuningAgent) -> Result<LoopState, SessionError> {
        if self.state != LoopState::Running {
            return Ok(self.state);
        }
        self.agent_name.get_or_insert(agent.name());

        let stream_index = if self.config.common_random_numbers {
            0
        } else {
            self.iteration
        };
        let mut batch_rng = rng::stream(rng::batch_seed(self.seed, stream_index));
        let batch = run_batch(&self.a, &self.b, &self.config.batch_config(), &mut batch_rng)?;
        let verdict = evaluate(&batch, &self.config.band);
        log::info!(
            "iteration {}: win rate {:.3} for {} -> {}",
            self.iteration,
            verdict.win_rate,
            verdict.subject,
            verdict.verdict
        );

        let mut record = IterationRecord {
            iteration: self.iteration,
            snapshot_a: self.a.snapshot(),
            snapshot_b: self.b.snapshot(),
            batch,
            verdict,
            adjustment: None,
        };

        if verdict.is_balanced() {
            self.history.push(record);
            self.finish(LoopState::Converged, TerminationReason::Balanced);
            return Ok(self.state);
        }
        if self.iteration >= self.config.max_iterations {
            self.history.push(record);
            self.finish(LoopState::Exhausted, TerminationReason::MaxIterations);
            return Ok(self.state);
        }

        let adjustment = self.consult(agent, &record);
        record.adjustment = Some(adjustment);
        self.history.push(record);

        if self.consecutive_agent_failures >= self.config.max_consecutive_agent_failures {
            log::warn!(
                "agent `{}` failed {} times in a row; stopping",
                agent.name(),
                self.consecutive_agent_failures
            );
            self.finish(LoopState::Aborted, TerminationReason::AgentUnreachable);
        } else {
            self.iteration += 1;
        }
        Ok(self.state)
    }

    /// Drive the loop to completion.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if a batch cannot run.
    pub fn run(mut self, agent: &mut dyn TuningAgent) -> Result<SessionReport, SessionError> {
        while self.step(agent)? == LoopState::Running {}
        Ok(self.into_report())
    }

    /// Consume a finished (or abandoned) session into its report.
    #[must_use]
    pub fn into_report(self) -> SessionReport {
        let iterations_run = u32::try_from(self.history.len()).unwrap_or(u32::MAX);
        SessionReport {
            final_a: self.a.snapshot(),
            final_b: self.b.snapshot(),
            reason: self.reason.unwrap_or(TerminationReason::MaxIterations),
            iterations_run,
            seed: self.seed,
            agent: self.agent_name.unwrap_or("none").to_string(),
            config: self.config,
            history: self.history,
        }
    }

    fn finish(&mut self, state: LoopState, reason: TerminationReason) {
        log::info!("session finished after {} batches: {}", self.history.len(), reason);
        self.state = state;
        self.reason = Some(reason);
    }

    fn consult(&mut self, agent: &mut dyn TuningAgent, record: &IterationRecord) -> Adjustment {
        let timeout = self.config.agent_timeout();
        let ctx = AgentContext {
            iteration: self.iteration,
            snapshot_a: &record.snapshot_a,
            snapshot_b: &record.snapshot_b,
            batch: &record.batch,
            verdict: &record.verdict,
            band: &self.config.band,
            history: &self.history,
            timeout,
        };
        let started = Instant::now();
        let reply = agent.propose_delta(&ctx).and_then(|response| {
            if started.elapsed() > timeout {
                Err(AgentError::Timeout {
                    timeout_ms: self.config.agent_timeout_ms,
                })
            } else {
                Ok(response)
            }
        });

        let response = match reply {
            Ok(response) => response,
            Err(err) => {
                log::warn!("agent `{}` failed: {err}", agent.name());
                let outcome = if err.is_communication_failure() {
                    self.consecutive_agent_failures += 1;
                    AdjustmentOutcome::AgentFailed {
                        reason: err.to_string(),
                    }
                } else {
                    self.consecutive_agent_failures = 0;
                    AdjustmentOutcome::Rejected {
                        reason: err.to_string(),
                    }
                };
                return Adjustment {
                    outcome,
                    rationale: None,
                };
            }
        };

        self.consecutive_agent_failures = 0;
        let outcome = match response.proposal {
            Proposal::NoChange => AdjustmentOutcome::NoChange,
            Proposal::Change(deltas) if deltas.is_empty() => AdjustmentOutcome::NoChange,
            Proposal::Change(deltas) => match self.apply_all(&deltas) {
                Ok(applied) => AdjustmentOutcome::Applied { deltas: applied },
                Err(err) => {
                    log::warn!("rejected proposal from `{}`: {err}", agent.name());
                    AdjustmentOutcome::Rejected {
                        reason: err.to_string(),
                    }
                }
            },
        };
        Adjustment {
            outcome,
            rationale: response.rationale,
        }
    }

    /// Apply every delta or none of them.
    fn apply_all(&mut self, deltas: &[ParameterDelta]) -> Result<AppliedDeltas, CharacterError> {
        let mut a = self.a.clone();
        let mut b = self.b.clone();
        let mut applied = AppliedDeltas::new();
        for delta in deltas {
            let target = match delta.side {
                Side::A => &mut a,
                Side::B => &mut b,
            };
            let change = target.apply_delta(&delta.parameter, delta.delta)?;
            log::debug!(
                "{}.{}: {:.3} -> {:.3} (requested {:+.3})",
                delta.side,
                change.parameter,
                change.before,
                change.after,
                change.requested
            );
            applied.push(AppliedDelta {
                side: delta.side,
                change,
            });
        }
        self.a = a;
        self.b = b;
        Ok(applied)
    }
}
