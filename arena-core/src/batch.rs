//! Runs many independent matches under one parameter snapshot and reduces
//! them to a win-rate statistic.
use rand::RngCore;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::character::{Character, CharacterError};
use crate::combat::{CombatConfig, MatchOptions, MatchOutcome, Side, Winner, simulate_match};
use crate::config::ConfigError;
use crate::constants::{DEFAULT_MATCHES_PER_BATCH, NEUTRAL_WIN_RATE, WILSON_Z_95};
use crate::numbers::{count_to_f64, ratio_or};
use crate::rng;

/// Which matches count toward the win rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinRateBasis {
    /// Subject wins over decisive matches; draws are ignored and a batch of
    /// nothing but draws reports 0.5.
    #[default]
    Decisive,
    /// Subject wins over every match played; draws count against the subject.
    AllMatches,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Character(#[from] CharacterError),
}

/// Settings for one batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchConfig {
    pub match_count: u32,
    pub combat: CombatConfig,
    pub subject: Side,
    pub basis: WinRateBasis,
    pub parallel: bool,
    pub track_health: bool,
}

impl BatchConfig {
    #[must_use]
    pub fn new(match_count: u32) -> Self {
        Self {
            match_count,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_combat(mut self, combat: CombatConfig) -> Self {
        self.combat = combat;
        self
    }

    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[must_use]
    pub const fn with_health_tracking(mut self, track_health: bool) -> Self {
        self.track_health = track_health;
        self
    }

    #[must_use]
    pub const fn with_basis(mut self, basis: WinRateBasis) -> Self {
        self.basis = basis;
        self
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            match_count: DEFAULT_MATCHES_PER_BATCH,
            combat: CombatConfig::default(),
            subject: Side::A,
            basis: WinRateBasis::default(),
            parallel: false,
            track_health: false,
        }
    }
}

/// Inclusive confidence bounds on a win rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub low: f64,
    pub high: f64,
}

/// Mean health of both sides at the start of a turn, over the matches that
/// were still running at that turn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthPoint {
    pub turn: u32,
    pub mean_a: f64,
    pub mean_b: f64,
    pub samples: u32,
}

/// Aggregated statistic for one batch. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub matches: u32,
    pub wins_a: u32,
    pub wins_b: u32,
    pub draws: u32,
    pub subject: Side,
    pub basis: WinRateBasis,
    pub win_rate: f64,
    pub confidence: ConfidenceInterval,
    pub mean_turns: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_trace: Option<Vec<HealthPoint>>,
}

impl BatchResult {
    #[must_use]
    pub const fn wins(&self, side: Side) -> u32 {
        match side {
            Side::A => self.wins_a,
            Side::B => self.wins_b,
        }
    }

    #[must_use]
    pub const fn decisive(&self) -> u32 {
        self.wins_a + self.wins_b
    }

    /// Every match ran into the turn cap. On the decisive basis the win rate
    /// is then the neutral fallback, not a measurement.
    #[must_use]
    pub const fn is_stalemate(&self) -> bool {
        self.matches > 0 && self.decisive() == 0
    }

    /// Win rate from the point of view of `side` under the batch's basis.
    #[must_use]
    pub fn win_rate_for(&self, side: Side) -> f64 {
        let denominator = match self.basis {
            WinRateBasis::Decisive => self.decisive(),
            WinRateBasis::AllMatches => self.matches,
        };
        ratio_or(
            u64::from(self.wins(side)),
            u64::from(denominator),
            NEUTRAL_WIN_RATE,
        )
    }
}

#[derive(Debug, Clone, Default)]
struct HealthSums {
    // (sum a, sum b, samples) per turn index
    turns: Vec<(i64, i64, u32)>,
}

impl HealthSums {
    fn ingest(&mut self, trace: &[(i32, i32)]) {
        if self.turns.len() < trace.len() {
            self.turns.resize(trace.len(), (0, 0, 0));
        }
        for (slot, &(a, b)) in self.turns.iter_mut().zip(trace) {
            slot.0 += i64::from(a);
            slot.1 += i64::from(b);
            slot.2 += 1;
        }
    }

    fn merge(mut self, other: Self) -> Self {
        if self.turns.len() < other.turns.len() {
            self.turns.resize(other.turns.len(), (0, 0, 0));
        }
        for (slot, (a, b, n)) in self.turns.iter_mut().zip(other.turns) {
            slot.0 += a;
            slot.1 += b;
            slot.2 += n;
        }
        self
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(self) -> Vec<HealthPoint> {
        self.turns
            .into_iter()
            .zip(1u32..)
            .filter(|((_, _, samples), _)| *samples > 0)
            .map(|((a, b, samples), turn)| {
                let n = count_to_f64(u64::from(samples));
                HealthPoint {
                    turn,
                    mean_a: a as f64 / n,
                    mean_b: b as f64 / n,
                    samples,
                }
            })
            .collect()
    }
}

/// Commutative outcome counts; merging in any order gives the same totals.
#[derive(Debug, Clone, Default)]
struct Tally {
    wins_a: u32,
    wins_b: u32,
    draws: u32,
    total_turns: u64,
    health: Option<HealthSums>,
}

impl Tally {
    fn record(&mut self, outcome: &MatchOutcome) {
        match outcome.winner {
            Winner::A => self.wins_a += 1,
            Winner::B => self.wins_b += 1,
            Winner::Draw => self.draws += 1,
        }
        self.total_turns += u64::from(outcome.turns);
        if let Some(trace) = outcome.health_trace.as_deref() {
            self.health.get_or_insert_with(HealthSums::default).ingest(trace);
        }
    }

    fn merge(self, other: Self) -> Self {
        let health = match (self.health, other.health) {
            (Some(left), Some(right)) => Some(left.merge(right)),
            (left, right) => left.or(right),
        };
        Self {
            wins_a: self.wins_a + other.wins_a,
            wins_b: self.wins_b + other.wins_b,
            draws: self.draws + other.draws,
            total_turns: self.total_turns + other.total_turns,
            health,
        }
    }

    const fn matches(&self) -> u32 {
        self.wins_a + self.wins_b + self.draws
    }

    fn finish(self, cfg: &BatchConfig) -> BatchResult {
        let matches = self.matches();
        let mut result = BatchResult {
            matches,
            wins_a: self.wins_a,
            wins_b: self.wins_b,
            draws: self.draws,
            subject: cfg.subject,
            basis: cfg.basis,
            win_rate: NEUTRAL_WIN_RATE,
            confidence: ConfidenceInterval {
                low: 0.0,
                high: 1.0,
            },
            mean_turns: ratio_or(self.total_turns, u64::from(matches), 0.0),
            health_trace: self.health.map(HealthSums::finish),
        };
        result.win_rate = result.win_rate_for(cfg.subject);
        let sample = match cfg.basis {
            WinRateBasis::Decisive => result.decisive(),
            WinRateBasis::AllMatches => matches,
        };
        result.confidence = wilson_interval(result.win_rate, sample);
        result
    }
}

/// 95% Wilson score interval for a proportion observed over `sample` trials.
#[must_use]
pub fn wilson_interval(rate: f64, sample: u32) -> ConfidenceInterval {
    if sample == 0 {
        return ConfidenceInterval {
            low: 0.0,
            high: 1.0,
        };
    }
    let n = f64::from(sample);
    let z = WILSON_Z_95;
    let z2 = z * z;
    let denominator = 1.0 + z2 / n;
    let centre = rate + z2 / (2.0 * n);
    let margin = z * (rate * (1.0 - rate) / n + z2 / (4.0 * n * n)).sqrt();
    ConfidenceInterval {
        low: ((centre - margin) / denominator).clamp(0.0, 1.0),
        high: ((centre + margin) / denominator).clamp(0.0, 1.0),
    }
}

fn play(
    a: &Character,
    b: &Character,
    cfg: &BatchConfig,
    match_seed: u64,
) -> Result<MatchOutcome, CharacterError> {
    let mut match_rng = rng::stream(match_seed);
    let options = MatchOptions {
        record_log: false,
        record_health: cfg.track_health,
    };
    simulate_match(a, b, &cfg.combat, &mut match_rng, options)
}

/// Run `cfg.match_count` independent matches and aggregate the outcomes.
///
/// One 64-bit seed per match is drawn from `rng` up front, and every match
/// plays on a fresh stream built from its own seed against freshly reset
/// copies of the characters, so sequential and parallel execution produce the
/// same result. Tunables are read-only here.
///
/// # Errors
///
/// Returns [`BatchError::Config`] for a zero match count or invalid combat
/// knobs, and [`BatchError::Character`] for a malformed character.
pub fn run_batch<R: RngCore + ?Sized>(
    a: &Character,
    b: &Character,
    cfg: &BatchConfig,
    rng: &mut R,
) -> Result<BatchResult, BatchError> {
    if cfg.match_count == 0 {
        return Err(ConfigError::NotPositive {
            field: "matches_per_batch",
        }
        .into());
    }
    cfg.combat.validate()?;
    a.validate()?;
    b.validate()?;

    let seeds: Vec<u64> = (0..cfg.match_count).map(|_| rng.next_u64()).collect();

    let tally = if cfg.parallel {
        seeds
            .par_iter()
            .map(|&seed| {
                let mut tally = Tally::default();
                tally.record(&play(a, b, cfg, seed)?);
                Ok::<_, CharacterError>(tally)
            })
            .try_reduce(Tally::default, |left, right| Ok(left.merge(right)))?
    } else {
        let mut tally = Tally::default();
        for &seed in &seeds {
            tally.record(&play(a, b, cfg, seed)?);
        }
        tally
    };

    let result = tally.finish(cfg);
    log::debug!(
        "batch of {} matches: A {} / B {} / draws {} -> win rate {:.3} for {}",
        result.matches,
        result.wins_a,
        result.wins_b,
        result.draws,
        result.win_rate,
        result.subject
    );
    if result.is_stalemate() && result.basis == WinRateBasis::Decisive {
        log::warn!(
            "all {} matches were draws; reporting the neutral win rate {:.2} without a decisive result",
            result.matches,
            result.win_rate
        );
    }
    Ok(result)
}
