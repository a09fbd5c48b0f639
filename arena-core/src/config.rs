//! Session configuration with serde defaults and validation.
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::batch::{BatchConfig, WinRateBasis};
use crate::combat::{CombatConfig, Side};
use crate::constants::{
    DEFAULT_AGENT_TIMEOUT_MS, DEFAULT_MATCHES_PER_BATCH, DEFAULT_MAX_CONSECUTIVE_AGENT_FAILURES,
    DEFAULT_MAX_ITERATIONS,
};
use crate::evaluator::BalanceBand;

/// Errors raised when configuration invariants are violated. These are fatal
/// and surface before any simulation runs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive")]
    NotPositive { field: &'static str },
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("balance band inverted (low {low:.2} > high {high:.2})")]
    BandInverted { low: f64, high: f64 },
}

/// Everything a balancing session needs besides the two characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub band: BalanceBand,
    #[serde(default = "SessionConfig::default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "SessionConfig::default_matches_per_batch")]
    pub matches_per_batch: u32,
    #[serde(default)]
    pub combat: CombatConfig,
    /// Fixed seed for reproducible sessions; drawn from entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "SessionConfig::default_subject")]
    pub subject: Side,
    #[serde(default)]
    pub win_rate_basis: WinRateBasis,
    #[serde(default)]
    pub parallel: bool,
    /// Reuse the first iteration's dice for every batch.
    #[serde(default)]
    pub common_random_numbers: bool,
    #[serde(default = "SessionConfig::default_agent_timeout_ms")]
    pub agent_timeout_ms: u64,
    #[serde(default = "SessionConfig::default_max_consecutive_agent_failures")]
    pub max_consecutive_agent_failures: u32,
}

impl SessionConfig {
    const fn default_max_iterations() -> u32 {
        DEFAULT_MAX_ITERATIONS
    }

    const fn default_matches_per_batch() -> u32 {
        DEFAULT_MATCHES_PER_BATCH
    }

    const fn default_subject() -> Side {
        Side::A
    }

    const fn default_agent_timeout_ms() -> u64 {
        DEFAULT_AGENT_TIMEOUT_MS
    }

    const fn default_max_consecutive_agent_failures() -> u32 {
        DEFAULT_MAX_CONSECUTIVE_AGENT_FAILURES
    }

    /// Parse a config document; absent fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or has mistyped fields.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Validate every knob.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a non-positive batch size, iteration cap,
    /// failure budget or agent timeout, an invalid band, or invalid combat
    /// knobs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.band.validate()?;
        if self.max_iterations == 0 {
            return Err(ConfigError::NotPositive {
                field: "max_iterations",
            });
        }
        if self.matches_per_batch == 0 {
            return Err(ConfigError::NotPositive {
                field: "matches_per_batch",
            });
        }
        if self.max_consecutive_agent_failures == 0 {
            return Err(ConfigError::NotPositive {
                field: "max_consecutive_agent_failures",
            });
        }
        if self.agent_timeout_ms == 0 {
            return Err(ConfigError::NotPositive {
                field: "agent_timeout_ms",
            });
        }
        self.combat.validate()
    }

    /// Batch settings derived from this session.
    #[must_use]
    pub const fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            match_count: self.matches_per_batch,
            combat: self.combat,
            subject: self.subject,
            basis: self.win_rate_basis,
            parallel: self.parallel,
            track_health: false,
        }
    }

    #[must_use]
    pub const fn agent_timeout(&self) -> Duration {
        Duration::from_millis(self.agent_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            band: BalanceBand::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            matches_per_batch: DEFAULT_MATCHES_PER_BATCH,
            combat: CombatConfig::default(),
            seed: None,
            subject: Side::A,
            win_rate_basis: WinRateBasis::default(),
            parallel: false,
            common_random_numbers: false,
            agent_timeout_ms: DEFAULT_AGENT_TIMEOUT_MS,
            max_consecutive_agent_failures: DEFAULT_MAX_CONSECUTIVE_AGENT_FAILURES,
        }
    }
}
