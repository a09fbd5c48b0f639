//! Combatant model: a named set of tunable parameters plus per-match health.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::constants::{
    ATTACK_POWER_RANGE, DEFAULT_ATTACK_POWER, DEFAULT_DEFENSE, DEFAULT_HEAL_INTERVAL,
    DEFAULT_HEALING, DEFAULT_MAX_HEALTH, DEFAULT_SPEED, DEFENSE_RANGE, HEAL_INTERVAL_RANGE,
    HEALING_RANGE, MAX_HEALTH_RANGE, SPEED_RANGE,
};
use crate::numbers::round_f64_to_i32;

/// Tunable combat parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Param {
    AttackPower,
    Defense,
    Speed,
    MaxHealth,
    Healing,
    HealInterval,
}

impl Param {
    pub const ALL: [Self; 6] = [
        Self::AttackPower,
        Self::Defense,
        Self::Speed,
        Self::MaxHealth,
        Self::Healing,
        Self::HealInterval,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AttackPower => "attack_power",
            Self::Defense => "defense",
            Self::Speed => "speed",
            Self::MaxHealth => "max_health",
            Self::Healing => "healing",
            Self::HealInterval => "heal_interval",
        }
    }

    /// Inclusive valid range `(min, max)` for the parameter.
    #[must_use]
    pub const fn range(self) -> (f64, f64) {
        match self {
            Self::AttackPower => ATTACK_POWER_RANGE,
            Self::Defense => DEFENSE_RANGE,
            Self::Speed => SPEED_RANGE,
            Self::MaxHealth => MAX_HEALTH_RANGE,
            Self::Healing => HEALING_RANGE,
            Self::HealInterval => HEAL_INTERVAL_RANGE,
        }
    }

    #[must_use]
    pub fn clamp(self, value: f64) -> f64 {
        let (min, max) = self.range();
        value.clamp(min, max)
    }

    #[must_use]
    pub fn contains(self, value: f64) -> bool {
        let (min, max) = self.range();
        (min..=max).contains(&value)
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Param {
    type Err = CharacterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "attack_power" | "attack" => Ok(Self::AttackPower),
            "defense" => Ok(Self::Defense),
            "speed" => Ok(Self::Speed),
            "max_health" | "health" => Ok(Self::MaxHealth),
            "healing" => Ok(Self::Healing),
            "heal_interval" => Ok(Self::HealInterval),
            _ => Err(CharacterError::InvalidParameter {
                name: s.to_string(),
            }),
        }
    }
}

/// Errors raised by the character model.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CharacterError {
    #[error("unknown tunable parameter `{name}`")]
    InvalidParameter { name: String },
    #[error("delta for {parameter} is not a finite number")]
    NonFiniteDelta { parameter: Param },
    #[error("character `{name}` has {parameter} = {value} outside {min}..={max}")]
    InvalidCharacterState {
        name: String,
        parameter: Param,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Full tunable parameter set for one combatant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Params {
    #[serde(default = "Params::default_attack_power")]
    pub attack_power: f64,
    #[serde(default = "Params::default_defense")]
    pub defense: f64,
    #[serde(default = "Params::default_speed")]
    pub speed: f64,
    #[serde(default = "Params::default_max_health", alias = "health")]
    pub max_health: f64,
    #[serde(default = "Params::default_healing")]
    pub healing: f64,
    #[serde(default = "Params::default_heal_interval")]
    pub heal_interval: f64,
}

impl Params {
    const fn default_attack_power() -> f64 {
        DEFAULT_ATTACK_POWER
    }

    const fn default_defense() -> f64 {
        DEFAULT_DEFENSE
    }

    const fn default_speed() -> f64 {
        DEFAULT_SPEED
    }

    const fn default_max_health() -> f64 {
        DEFAULT_MAX_HEALTH
    }

    const fn default_healing() -> f64 {
        DEFAULT_HEALING
    }

    const fn default_heal_interval() -> f64 {
        DEFAULT_HEAL_INTERVAL
    }

    #[must_use]
    pub const fn get(&self, param: Param) -> f64 {
        match param {
            Param::AttackPower => self.attack_power,
            Param::Defense => self.defense,
            Param::Speed => self.speed,
            Param::MaxHealth => self.max_health,
            Param::Healing => self.healing,
            Param::HealInterval => self.heal_interval,
        }
    }

    const fn slot_mut(&mut self, param: Param) -> &mut f64 {
        match param {
            Param::AttackPower => &mut self.attack_power,
            Param::Defense => &mut self.defense,
            Param::Speed => &mut self.speed,
            Param::MaxHealth => &mut self.max_health,
            Param::Healing => &mut self.healing,
            Param::HealInterval => &mut self.heal_interval,
        }
    }

    /// Builder-style override used by presets and tests. The value is stored
    /// as given; `Character::validate` reports anything out of range.
    #[must_use]
    pub const fn with(mut self, param: Param, value: f64) -> Self {
        *self.slot_mut(param) = value;
        self
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            attack_power: DEFAULT_ATTACK_POWER,
            defense: DEFAULT_DEFENSE,
            speed: DEFAULT_SPEED,
            max_health: DEFAULT_MAX_HEALTH,
            healing: DEFAULT_HEALING,
            heal_interval: DEFAULT_HEAL_INTERVAL,
        }
    }
}

/// Immutable copy of a character's identity and tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSnapshot {
    pub name: String,
    #[serde(flatten)]
    pub params: Params,
}

/// Result of a single clamped parameter change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AppliedChange {
    pub parameter: Param,
    pub requested: f64,
    pub before: f64,
    pub after: f64,
}

impl AppliedChange {
    /// Whether clamping cut the requested change short.
    #[must_use]
    pub fn was_clamped(&self) -> bool {
        ((self.after - self.before) - self.requested).abs() > f64::EPSILON
    }
}

/// One combatant. Tunables change only between matches; health is reset at
/// the start of every match.
#[derive(Debug, Clone, PartialEq)]
pub struct Character {
    name: String,
    params: Params,
    health: i32,
}

impl Character {
    #[must_use]
    pub fn new(name: impl Into<String>, params: Params) -> Self {
        let mut character = Self {
            name: name.into(),
            params,
            health: 0,
        };
        character.reset_health();
        character
    }

    #[must_use]
    pub fn from_snapshot(snapshot: &CharacterSnapshot) -> Self {
        Self::new(snapshot.name.clone(), snapshot.params)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    #[must_use]
    pub const fn parameter(&self, param: Param) -> f64 {
        self.params.get(param)
    }

    #[must_use]
    pub const fn health(&self) -> i32 {
        self.health
    }

    /// Max health rounded to whole hit points.
    #[must_use]
    pub fn max_health_points(&self) -> i32 {
        round_f64_to_i32(self.params.max_health)
    }

    /// Heal cadence rounded to whole turns (never below one).
    #[must_use]
    pub fn heal_interval_turns(&self) -> u32 {
        u32::try_from(round_f64_to_i32(self.params.heal_interval).max(1)).unwrap_or(1)
    }

    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Add `change` to the named tunable and clamp the result into range.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError::InvalidParameter`] for an unknown name and
    /// [`CharacterError::NonFiniteDelta`] for NaN or infinite changes.
    pub fn apply_delta(
        &mut self,
        parameter_name: &str,
        change: f64,
    ) -> Result<AppliedChange, CharacterError> {
        let param = parameter_name.parse::<Param>()?;
        self.apply_param_delta(param, change)
    }

    /// Typed variant of [`Character::apply_delta`].
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError::NonFiniteDelta`] for NaN or infinite changes.
    pub fn apply_param_delta(
        &mut self,
        param: Param,
        change: f64,
    ) -> Result<AppliedChange, CharacterError> {
        if !change.is_finite() {
            return Err(CharacterError::NonFiniteDelta { parameter: param });
        }
        let slot = self.params.slot_mut(param);
        let before = *slot;
        let after = param.clamp(before + change);
        *slot = after;
        Ok(AppliedChange {
            parameter: param,
            requested: change,
            before,
            after,
        })
    }

    pub fn reset_health(&mut self) {
        self.health = self.max_health_points();
    }

    #[must_use]
    pub fn snapshot(&self) -> CharacterSnapshot {
        CharacterSnapshot {
            name: self.name.clone(),
            params: self.params,
        }
    }

    /// Check every tunable against its valid range.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError::InvalidCharacterState`] for the first
    /// parameter outside its domain (NaN included).
    pub fn validate(&self) -> Result<(), CharacterError> {
        for param in Param::ALL {
            let value = self.params.get(param);
            if !param.contains(value) {
                let (min, max) = param.range();
                return Err(CharacterError::InvalidCharacterState {
                    name: self.name.clone(),
                    parameter: param,
                    value,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn take_damage(&mut self, amount: i32) {
        self.health = self.health.saturating_sub(amount.max(0));
    }

    /// Restore up to `amount` health without exceeding max health; returns
    /// the amount actually restored.
    pub(crate) fn restore(&mut self, amount: i32) -> i32 {
        let ceiling = self.max_health_points();
        let before = self.health;
        self.health = self.health.saturating_add(amount.max(0)).min(ceiling).max(before);
        self.health - before
    }
}
