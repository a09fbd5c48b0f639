//! Bundled matchups and matchup file parsing.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::character::{Character, CharacterSnapshot};

const BUNDLED_MATCHUPS: &str = include_str!("../data/matchups.json");

/// Two starting characters. Parameters left out of a file take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matchup {
    #[serde(default)]
    pub description: String,
    pub a: CharacterSnapshot,
    pub b: CharacterSnapshot,
}

impl Matchup {
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Build fresh characters. Range checks happen when a session or batch
    /// starts.
    #[must_use]
    pub fn characters(&self) -> (Character, Character) {
        (
            Character::from_snapshot(&self.a),
            Character::from_snapshot(&self.b),
        )
    }
}

fn catalog() -> &'static BTreeMap<String, Matchup> {
    static CATALOG: OnceLock<BTreeMap<String, Matchup>> = OnceLock::new();
    CATALOG.get_or_init(|| serde_json::from_str(BUNDLED_MATCHUPS).unwrap_or_default())
}

/// Look up a bundled matchup by name.
#[must_use]
pub fn preset(name: &str) -> Option<&'static Matchup> {
    catalog().get(name)
}

/// Bundled matchups in name order.
pub fn presets() -> impl Iterator<Item = (&'static str, &'static Matchup)> {
    catalog().iter().map(|(name, matchup)| (name.as_str(), matchup))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Param;

    #[test]
    fn bundled_data_parses() {
        let parsed: BTreeMap<String, Matchup> = serde_json::from_str(BUNDLED_MATCHUPS).unwrap();
        assert_eq!(parsed.len(), 3);
        let names: Vec<_> = presets().map(|(name, _)| name).collect();
        assert_eq!(names, ["bruiser", "healer_vs_attacker", "mirror"]);
    }

    #[test]
    fn presets_build_valid_characters() {
        for (name, matchup) in presets() {
            let (a, b) = matchup.characters();
            assert!(a.validate().is_ok(), "{name} side a");
            assert!(b.validate().is_ok(), "{name} side b");
        }
    }

    #[test]
    fn healer_preset_heals_every_turn() {
        let (healer, attacker) = preset("healer_vs_attacker").unwrap().characters();
        assert!((healer.parameter(Param::Healing) - 30.0).abs() < f64::EPSILON);
        assert_eq!(healer.heal_interval_turns(), 1);
        assert!(attacker.parameter(Param::Speed) > healer.parameter(Param::Speed));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let matchup = Matchup::from_json(
            r#"{"a": {"name": "Solo", "health": 250}, "b": {"name": "Other"}}"#,
        )
        .unwrap();
        let (a, b) = matchup.characters();
        assert_eq!(a.max_health_points(), 250);
        assert!((b.parameter(Param::AttackPower) - 10.0).abs() < f64::EPSILON);
        assert!(matchup.description.is_empty());
    }

    #[test]
    fn unknown_preset_is_none() {
        assert!(preset("dragon").is_none());
    }
}
