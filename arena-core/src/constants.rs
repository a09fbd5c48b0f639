//! Centralized defaults and valid ranges for the arena simulation.
//!
//! Every knob here can be overridden through `SessionConfig`; these are the
//! values used when a config file leaves a field out.

// Tunable ranges -----------------------------------------------------------
pub const ATTACK_POWER_RANGE: (f64, f64) = (1.0, 1_000.0);
pub const DEFENSE_RANGE: (f64, f64) = (0.0, 1_000.0);
pub const SPEED_RANGE: (f64, f64) = (1.0, 1_000.0);
pub const MAX_HEALTH_RANGE: (f64, f64) = (1.0, 100_000.0);
pub const HEALING_RANGE: (f64, f64) = (0.0, 10_000.0);
pub const HEAL_INTERVAL_RANGE: (f64, f64) = (1.0, 100.0);

// Character defaults -------------------------------------------------------
pub const DEFAULT_ATTACK_POWER: f64 = 10.0;
pub const DEFAULT_DEFENSE: f64 = 5.0;
pub const DEFAULT_SPEED: f64 = 5.0;
pub const DEFAULT_MAX_HEALTH: f64 = 100.0;
pub const DEFAULT_HEALING: f64 = 0.0;
pub const DEFAULT_HEAL_INTERVAL: f64 = 3.0;

// Combat defaults ----------------------------------------------------------
pub const DEFAULT_MAX_TURNS: u32 = 500;
pub const DEFAULT_MIN_DAMAGE: i32 = 1;
pub const DEFAULT_DAMAGE_VARIANCE: f64 = 0.2;
pub const DEFAULT_HEAL_VARIANCE: f64 = 0.2;
pub const DEFAULT_MISS_CHANCE: f64 = 0.05;

// Session defaults ---------------------------------------------------------
pub const DEFAULT_BAND_LOW: f64 = 0.40;
pub const DEFAULT_BAND_HIGH: f64 = 0.60;
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;
pub const DEFAULT_MATCHES_PER_BATCH: u32 = 1_000;
pub const DEFAULT_AGENT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_CONSECUTIVE_AGENT_FAILURES: u32 = 3;

/// Win rate reported when a decisive-basis batch had no decisive matches.
pub const NEUTRAL_WIN_RATE: f64 = 0.5;

/// z-score for the 95% Wilson interval reported with each batch.
pub const WILSON_Z_95: f64 = 1.96;
