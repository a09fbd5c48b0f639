//! Classifies a batch win rate against a target band.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::batch::BatchResult;
use crate::combat::Side;
use crate::config::ConfigError;
use crate::constants::{DEFAULT_BAND_HIGH, DEFAULT_BAND_LOW};

/// Inclusive target interval for the subject's win rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceBand {
    #[serde(default = "BalanceBand::default_low")]
    pub low: f64,
    #[serde(default = "BalanceBand::default_high")]
    pub high: f64,
}

impl BalanceBand {
    const fn default_low() -> f64 {
        DEFAULT_BAND_LOW
    }

    const fn default_high() -> f64 {
        DEFAULT_BAND_HIGH
    }

    #[must_use]
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::RangeViolation`] when a bound lies outside
    /// `[0, 1]` and [`ConfigError::BandInverted`] when `low > high`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("band.low", self.low), ("band.high", self.high)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::RangeViolation {
                    field,
                    min: 0.0,
                    max: 1.0,
                    value,
                });
            }
        }
        if self.low > self.high {
            return Err(ConfigError::BandInverted {
                low: self.low,
                high: self.high,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, rate: f64) -> bool {
        (self.low..=self.high).contains(&rate)
    }
}

impl Default for BalanceBand {
    fn default() -> Self {
        Self::new(DEFAULT_BAND_LOW, DEFAULT_BAND_HIGH)
    }
}

impl fmt::Display for BalanceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.2}, {:.2}]", self.low, self.high)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Balanced,
    FavorsA,
    FavorsB,
}

impl Verdict {
    #[must_use]
    pub const fn favored_side(self) -> Option<Side> {
        match self {
            Self::Balanced => None,
            Self::FavorsA => Some(Side::A),
            Self::FavorsB => Some(Side::B),
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::FavorsA => "favors_a",
            Self::FavorsB => "favors_b",
        }
    }

    const fn favoring(side: Side) -> Self {
        match side {
            Side::A => Self::FavorsA,
            Side::B => Self::FavorsB,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Verdict together with the numbers it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceVerdict {
    pub verdict: Verdict,
    pub win_rate: f64,
    pub subject: Side,
    pub band: BalanceBand,
}

impl BalanceVerdict {
    #[must_use]
    pub const fn is_balanced(&self) -> bool {
        matches!(self.verdict, Verdict::Balanced)
    }

    #[must_use]
    pub const fn favored_side(&self) -> Option<Side> {
        self.verdict.favored_side()
    }

    /// Signed distance from the nearest band edge; zero inside the band.
    #[must_use]
    pub fn distance_from_band(&self) -> f64 {
        if self.win_rate > self.band.high {
            self.win_rate - self.band.high
        } else if self.win_rate < self.band.low {
            self.win_rate - self.band.low
        } else {
            0.0
        }
    }
}

/// Classify a batch result. Above the band favors the subject, below favors
/// its opponent, and both edges count as balanced.
#[must_use]
pub fn evaluate(batch: &BatchResult, band: &BalanceBand) -> BalanceVerdict {
    let rate = batch.win_rate;
    let verdict = if rate > band.high {
        Verdict::favoring(batch.subject)
    } else if rate < band.low {
        Verdict::favoring(batch.subject.opponent())
    } else {
        Verdict::Balanced
    };
    BalanceVerdict {
        verdict,
        win_rate: rate,
        subject: batch.subject,
        band: *band,
    }
}
