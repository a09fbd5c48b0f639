//! Turn-based resolution of a single 1v1 match.
//!
//! Each turn both combatants act in speed order. When speeds differ the
//! faster side strikes first and a defender knocked to zero does not strike
//! back; when speeds tie the exchange is simultaneous, so both sides can fall
//! in the same turn and the match is a draw. Ties in speed are ordered by
//! name (then side) purely to fix the order of random draws.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::character::{Character, CharacterError};
use crate::config::ConfigError;
use crate::constants::{
    DEFAULT_DAMAGE_VARIANCE, DEFAULT_HEAL_VARIANCE, DEFAULT_MAX_TURNS, DEFAULT_MIN_DAMAGE,
    DEFAULT_MISS_CHANCE,
};
use crate::numbers::round_f64_to_i32;

/// One of the two seats in a matchup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    A,
    B,
}

impl Side {
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Terminal result of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    A,
    B,
    Draw,
}

impl Winner {
    #[must_use]
    pub const fn side(self) -> Option<Side> {
        match self {
            Self::A => Some(Side::A),
            Self::B => Some(Side::B),
            Self::Draw => None,
        }
    }
}

impl From<Side> for Winner {
    fn from(value: Side) -> Self {
        match value {
            Side::A => Self::A,
            Side::B => Self::B,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchState {
    Ongoing,
    Finished(Winner),
}

/// Rules knobs for combat resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombatConfig {
    #[serde(default = "CombatConfig::default_max_turns")]
    pub max_turns: u32,
    #[serde(default = "CombatConfig::default_min_damage")]
    pub min_damage: i32,
    #[serde(default = "CombatConfig::default_damage_variance")]
    pub damage_variance: f64,
    #[serde(default = "CombatConfig::default_heal_variance")]
    pub heal_variance: f64,
    #[serde(default = "CombatConfig::default_miss_chance")]
    pub miss_chance: f64,
}

impl CombatConfig {
    const fn default_max_turns() -> u32 {
        DEFAULT_MAX_TURNS
    }

    const fn default_min_damage() -> i32 {
        DEFAULT_MIN_DAMAGE
    }

    const fn default_damage_variance() -> f64 {
        DEFAULT_DAMAGE_VARIANCE
    }

    const fn default_heal_variance() -> f64 {
        DEFAULT_HEAL_VARIANCE
    }

    const fn default_miss_chance() -> f64 {
        DEFAULT_MISS_CHANCE
    }

    /// Validate combat knobs.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the turn cap is zero, the damage floor
    /// is negative, or a variance/probability falls outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_turns == 0 {
            return Err(ConfigError::NotPositive {
                field: "combat.max_turns",
            });
        }
        if self.min_damage < 0 {
            return Err(ConfigError::MinViolation {
                field: "combat.min_damage",
                min: 0.0,
                value: f64::from(self.min_damage),
            });
        }
        validate_unit("combat.damage_variance", self.damage_variance)?;
        validate_unit("combat.heal_variance", self.heal_variance)?;
        validate_unit("combat.miss_chance", self.miss_chance)?;
        Ok(())
    }
}

fn validate_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::RangeViolation {
            field,
            min: 0.0,
            max: 1.0,
            value,
        });
    }
    Ok(())
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            min_damage: DEFAULT_MIN_DAMAGE,
            damage_variance: DEFAULT_DAMAGE_VARIANCE,
            heal_variance: DEFAULT_HEAL_VARIANCE,
            miss_chance: DEFAULT_MISS_CHANCE,
        }
    }
}

/// What to capture while a match runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Keep one [`TurnEvent`] per action.
    pub record_log: bool,
    /// Keep both sides' health at the start of every turn.
    pub record_health: bool,
}

/// Single action taken during a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnEvent {
    pub turn: u32,
    pub actor: Side,
    pub damage: i32,
    pub healed: i32,
    pub missed: bool,
    pub health_a: i32,
    pub health_b: i32,
}

/// Immutable result of one simulated match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub winner: Winner,
    pub turns: u32,
    pub final_health_a: i32,
    pub final_health_b: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<Vec<TurnEvent>>,
    /// Health of (A, B) at the start of each turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_trace: Option<Vec<(i32, i32)>>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Strike {
    damage: i32,
    missed: bool,
}

struct Arena {
    a: Character,
    b: Character,
    heal_countdown: [u32; 2],
    log: Option<Vec<TurnEvent>>,
}

impl Arena {
    fn fighter(&self, side: Side) -> &Character {
        match side {
            Side::A => &self.a,
            Side::B => &self.b,
        }
    }

    fn fighter_mut(&mut self, side: Side) -> &mut Character {
        match side {
            Side::A => &mut self.a,
            Side::B => &mut self.b,
        }
    }

    const fn countdown_mut(&mut self, side: Side) -> &mut u32 {
        match side {
            Side::A => &mut self.heal_countdown[0],
            Side::B => &mut self.heal_countdown[1],
        }
    }

    fn roll_strike<R: Rng + ?Sized>(
        &self,
        attacker: Side,
        cfg: &CombatConfig,
        rng: &mut R,
    ) -> Strike {
        if cfg.miss_chance > 0.0 && rng.gen_bool(cfg.miss_chance) {
            return Strike {
                damage: 0,
                missed: true,
            };
        }
        let factor = rng.gen_range((1.0 - cfg.damage_variance)..=(1.0 + cfg.damage_variance));
        let attack = self.fighter(attacker).params().attack_power;
        let defense = self.fighter(attacker.opponent()).params().defense;
        let damage = round_f64_to_i32(attack.mul_add(factor, -defense)).max(cfg.min_damage);
        Strike {
            damage,
            missed: false,
        }
    }

    /// Heal if the actor has healing and its cooldown has elapsed.
    fn try_heal<R: Rng + ?Sized>(&mut self, actor: Side, cfg: &CombatConfig, rng: &mut R) -> i32 {
        let healing = self.fighter(actor).params().healing;
        if healing <= 0.0 || *self.countdown_mut(actor) > 0 || !self.fighter(actor).is_alive() {
            return 0;
        }
        *self.countdown_mut(actor) = self.fighter(actor).heal_interval_turns();
        if cfg.miss_chance > 0.0 && rng.gen_bool(cfg.miss_chance) {
            return 0;
        }
        let factor = rng.gen_range((1.0 - cfg.heal_variance)..=(1.0 + cfg.heal_variance));
        let amount = round_f64_to_i32(healing * factor);
        self.fighter_mut(actor).restore(amount)
    }

    fn land(&mut self, attacker: Side, strike: Strike) {
        self.fighter_mut(attacker.opponent()).take_damage(strike.damage);
    }

    fn record(&mut self, turn: u32, actor: Side, strike: Strike, healed: i32) {
        let (health_a, health_b) = (self.a.health(), self.b.health());
        if let Some(log) = self.log.as_mut() {
            log.push(TurnEvent {
                turn,
                actor,
                damage: strike.damage,
                healed,
                missed: strike.missed,
                health_a,
                health_b,
            });
        }
    }

    fn act<R: Rng + ?Sized>(&mut self, turn: u32, actor: Side, cfg: &CombatConfig, rng: &mut R) {
        let strike = self.roll_strike(actor, cfg, rng);
        self.land(actor, strike);
        let healed = self.try_heal(actor, cfg, rng);
        self.record(turn, actor, strike, healed);
    }

    fn exchange<R: Rng + ?Sized>(
        &mut self,
        turn: u32,
        order: [Side; 2],
        cfg: &CombatConfig,
        rng: &mut R,
    ) {
        let strikes = order.map(|side| self.roll_strike(side, cfg, rng));
        for (side, strike) in order.into_iter().zip(strikes) {
            self.land(side, strike);
        }
        for (side, strike) in order.into_iter().zip(strikes) {
            let healed = self.try_heal(side, cfg, rng);
            self.record(turn, side, strike, healed);
        }
    }

    fn tick_cooldowns(&mut self) {
        for countdown in &mut self.heal_countdown {
            *countdown = countdown.saturating_sub(1);
        }
    }

    fn state(&self) -> MatchState {
        match (self.a.is_alive(), self.b.is_alive()) {
            (true, true) => MatchState::Ongoing,
            (true, false) => MatchState::Finished(Winner::A),
            (false, true) => MatchState::Finished(Winner::B),
            (false, false) => MatchState::Finished(Winner::Draw),
        }
    }
}

/// Acting order for a turn and whether the exchange is simultaneous.
#[must_use]
pub fn acting_order(a: &Character, b: &Character) -> ([Side; 2], bool) {
    let speed_a = a.params().speed;
    let speed_b = b.params().speed;
    match speed_a.partial_cmp(&speed_b).unwrap_or(Ordering::Equal) {
        Ordering::Greater => ([Side::A, Side::B], false),
        Ordering::Less => ([Side::B, Side::A], false),
        Ordering::Equal => {
            if b.name() < a.name() {
                ([Side::B, Side::A], true)
            } else {
                ([Side::A, Side::B], true)
            }
        }
    }
}

/// Resolve one match to a terminal outcome.
///
/// The characters are copied and reset to full health; the caller's values
/// are never touched. Identical inputs and an identical random stream always
/// yield an identical outcome.
///
/// # Errors
///
/// Returns [`CharacterError::InvalidCharacterState`] when either character
/// has a parameter outside its valid domain.
pub fn simulate_match<R: Rng + ?Sized>(
    a: &Character,
    b: &Character,
    cfg: &CombatConfig,
    rng: &mut R,
    options: MatchOptions,
) -> Result<MatchOutcome, CharacterError> {
    a.validate()?;
    b.validate()?;

    let mut arena = Arena {
        a: a.clone(),
        b: b.clone(),
        heal_countdown: [0, 0],
        log: options.record_log.then(Vec::new),
    };
    arena.a.reset_health();
    arena.b.reset_health();
    let mut trace = options.record_health.then(Vec::new);
    let (order, simultaneous) = acting_order(a, b);

    let mut turns = 0;
    let mut state = MatchState::Ongoing;
    while state == MatchState::Ongoing && turns < cfg.max_turns {
        turns += 1;
        if let Some(trace) = trace.as_mut() {
            trace.push((arena.a.health(), arena.b.health()));
        }
        if simultaneous {
            arena.exchange(turns, order, cfg, rng);
        } else {
            let [first, second] = order;
            arena.act(turns, first, cfg, rng);
            if arena.fighter(second).is_alive() {
                arena.act(turns, second, cfg, rng);
            }
        }
        arena.tick_cooldowns();
        state = arena.state();
    }

    let winner = match state {
        MatchState::Finished(winner) => winner,
        MatchState::Ongoing => Winner::Draw,
    };

    Ok(MatchOutcome {
        winner,
        turns,
        final_health_a: arena.a.health(),
        final_health_b: arena.b.health(),
        log: arena.log,
        health_trace: trace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{Param, Params};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn pair(attack_a: f64, attack_b: f64) -> (Character, Character) {
        (
            Character::new("A", Params::default().with(Param::AttackPower, attack_a)),
            Character::new("B", Params::default().with(Param::AttackPower, attack_b)),
        )
    }

    fn run(a: &Character, b: &Character, cfg: &CombatConfig, seed: u64) -> MatchOutcome {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let options = MatchOptions {
            record_log: true,
            record_health: true,
        };
        simulate_match(a, b, cfg, &mut rng, options).unwrap()
    }

    #[test]
    fn identical_seed_reproduces_outcome() {
        let (a, b) = pair(12.0, 11.0);
        let cfg = CombatConfig::default();
        assert_eq!(run(&a, &b, &cfg, 7), run(&a, &b, &cfg, 7));
    }

    #[test]
    fn overwhelming_attack_wins() {
        let (a, b) = pair(60.0, 5.0);
        let outcome = run(&a, &b, &CombatConfig::default(), 3);
        assert_eq!(outcome.winner, Winner::A);
        assert!(outcome.final_health_b <= 0);
        assert!(outcome.final_health_a > 0);
    }

    #[test]
    fn damage_floor_guarantees_progress() {
        // Defense far above attack: only the floor damage lands.
        let params = Params::default()
            .with(Param::AttackPower, 1.0)
            .with(Param::Defense, 500.0)
            .with(Param::MaxHealth, 10.0);
        let a = Character::new("A", params);
        let b = Character::new("B", params.with(Param::Speed, 6.0));
        let cfg = CombatConfig {
            miss_chance: 0.0,
            ..CombatConfig::default()
        };
        let outcome = run(&a, &b, &cfg, 11);
        // B is faster and strikes first every turn, so B lands the tenth hit.
        assert_eq!(outcome.winner, Winner::B);
        assert_eq!(outcome.turns, 10);
        let log = outcome.log.unwrap();
        assert!(log.iter().all(|event| event.damage == 1));
    }

    #[test]
    fn turn_cap_yields_draw() {
        let params = Params::default().with(Param::Defense, 1_000.0);
        let a = Character::new("A", params);
        let b = Character::new("B", params);
        let cfg = CombatConfig {
            max_turns: 5,
            min_damage: 0,
            ..CombatConfig::default()
        };
        let outcome = run(&a, &b, &cfg, 1);
        assert_eq!(outcome.winner, Winner::Draw);
        assert_eq!(outcome.turns, 5);
        assert_eq!(outcome.health_trace.unwrap().len(), 5);
    }

    #[test]
    fn simultaneous_knockout_is_a_draw() {
        let params = Params::default()
            .with(Param::AttackPower, 200.0)
            .with(Param::Defense, 0.0);
        let a = Character::new("A", params);
        let b = Character::new("B", params);
        let cfg = CombatConfig {
            miss_chance: 0.0,
            ..CombatConfig::default()
        };
        let outcome = run(&a, &b, &cfg, 99);
        assert_eq!(outcome.winner, Winner::Draw);
        assert_eq!(outcome.turns, 1);
    }

    #[test]
    fn faster_side_kills_before_retaliation() {
        let params = Params::default()
            .with(Param::AttackPower, 200.0)
            .with(Param::Defense, 0.0);
        let a = Character::new("A", params);
        let b = Character::new("B", params.with(Param::Speed, 9.0));
        let cfg = CombatConfig {
            miss_chance: 0.0,
            ..CombatConfig::default()
        };
        let outcome = run(&a, &b, &cfg, 5);
        assert_eq!(outcome.winner, Winner::B);
        assert_eq!(outcome.final_health_b, 100);
        assert_eq!(outcome.log.unwrap().len(), 1);
    }

    #[test]
    fn speed_tie_orders_by_name_then_side() {
        let a = Character::new("Zed", Params::default());
        let b = Character::new("Ada", Params::default());
        assert_eq!(acting_order(&a, &b), ([Side::B, Side::A], true));
        let twin = Character::new("Zed", Params::default());
        assert_eq!(acting_order(&a, &twin), ([Side::A, Side::B], true));
    }

    #[test]
    fn healer_restores_health_on_cadence() {
        let healer = Character::new(
            "Healer",
            Params::default()
                .with(Param::Healing, 10.0)
                .with(Param::HealInterval, 2.0)
                .with(Param::MaxHealth, 1_000.0),
        );
        let dummy = Character::new("Dummy", Params::default().with(Param::MaxHealth, 1_000.0));
        let cfg = CombatConfig {
            max_turns: 6,
            miss_chance: 0.0,
            heal_variance: 0.0,
            ..CombatConfig::default()
        };
        let outcome = run(&healer, &dummy, &cfg, 2);
        let heals: Vec<u32> = outcome
            .log
            .unwrap()
            .iter()
            .filter(|event| event.actor == Side::A && event.healed > 0)
            .map(|event| event.turn)
            .collect();
        // Both strikes land before either heal, so the first heal restores health.
        assert_eq!(heals, vec![1, 3, 5]);
    }

    #[test]
    fn malformed_character_fails_fast() {
        let broken = Character::new("Broken", Params::default().with(Param::MaxHealth, -5.0));
        let healthy = Character::new("Healthy", Params::default());
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let err = simulate_match(
            &broken,
            &healthy,
            &CombatConfig::default(),
            &mut rng,
            MatchOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CharacterError::InvalidCharacterState { .. }));
    }

    #[test]
    fn combat_config_validation_catches_bad_knobs() {
        let cfg = CombatConfig {
            miss_chance: 1.5,
            ..CombatConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::RangeViolation {
                field: "combat.miss_chance",
                ..
            })
        ));
        let cfg = CombatConfig {
            max_turns: 0,
            ..CombatConfig::default()
        };
        assert!(cfg.validate().is_err());
        assert!(CombatConfig::default().validate().is_ok());
    }
}
