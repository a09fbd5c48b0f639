//! Arena balance engine
//!
//! Platform-agnostic core for tuning a two-character duel: the combat
//! simulator, batch statistics, band evaluation, and the control loop that
//! asks a tuning agent for parameter changes until the matchup is balanced.
//! No process, terminal or network dependencies live here.

pub mod agent;
pub mod batch;
pub mod character;
pub mod combat;
pub mod config;
pub mod constants;
pub mod evaluator;
pub mod numbers;
pub mod optimizer;
pub mod presets;
pub mod rng;

// Re-export commonly used types
pub use agent::{
    AgentContext, AgentError, AgentRequest, AgentResponse, NoChangeAgent, ParameterDelta,
    Proposal, ScriptedAgent, TuningAgent,
};
pub use batch::{
    BatchConfig, BatchError, BatchResult, ConfidenceInterval, HealthPoint, WinRateBasis,
    run_batch, wilson_interval,
};
pub use character::{AppliedChange, Character, CharacterError, CharacterSnapshot, Param, Params};
pub use combat::{
    CombatConfig, MatchOptions, MatchOutcome, Side, TurnEvent, Winner, acting_order,
    simulate_match,
};
pub use config::{ConfigError, SessionConfig};
pub use evaluator::{BalanceBand, BalanceVerdict, Verdict, evaluate};
pub use optimizer::{
    Adjustment, AdjustmentOutcome, AppliedDelta, IterationRecord, LoopState, OptimizationSession,
    SessionError, SessionReport, TerminationReason,
};
pub use presets::{Matchup, preset, presets};
