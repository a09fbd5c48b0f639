use anyhow::{Context, Result, bail};
use arena_core::{BalanceBand, Matchup, SessionConfig, preset, presets};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI values that override the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub seed: Option<u64>,
    pub matches: Option<u32>,
    pub max_iterations: Option<u32>,
    pub max_turns: Option<u32>,
    pub band_low: Option<f64>,
    pub band_high: Option<f64>,
    pub parallel: bool,
    pub agent_timeout_ms: Option<u64>,
}

/// Load a bundled preset by name, or a matchup file by path.
pub fn resolve_matchup(name_or_path: &str) -> Result<Matchup> {
    if let Some(matchup) = preset(name_or_path) {
        return Ok(matchup.clone());
    }
    let path = Path::new(name_or_path);
    if !path.exists() {
        let known: Vec<&str> = presets().map(|(name, _)| name).collect();
        bail!(
            "unknown matchup `{name_or_path}` (presets: {})",
            known.join(", ")
        );
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read matchup {}", path.display()))?;
    Matchup::from_json(&raw).with_context(|| format!("failed to parse matchup {}", path.display()))
}

pub fn load_session_config(path: Option<&PathBuf>, overrides: &Overrides) -> Result<SessionConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            SessionConfig::from_json(&raw)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => SessionConfig::default(),
    };
    apply_overrides(&mut config, overrides);
    config.validate().context("invalid session configuration")?;
    Ok(config)
}

fn apply_overrides(config: &mut SessionConfig, overrides: &Overrides) {
    if let Some(seed) = overrides.seed {
        config.seed = Some(seed);
    }
    if let Some(matches) = overrides.matches {
        config.matches_per_batch = matches;
    }
    if let Some(max_iterations) = overrides.max_iterations {
        config.max_iterations = max_iterations;
    }
    if let Some(max_turns) = overrides.max_turns {
        config.combat.max_turns = max_turns;
    }
    config.band = BalanceBand::new(
        overrides.band_low.unwrap_or(config.band.low),
        overrides.band_high.unwrap_or(config.band.high),
    );
    if overrides.parallel {
        config.parallel = true;
    }
    if let Some(timeout) = overrides.agent_timeout_ms {
        config.agent_timeout_ms = timeout;
    }
}
