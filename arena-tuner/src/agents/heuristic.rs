use arena_core::constants::NEUTRAL_WIN_RATE;
use arena_core::{AgentContext, AgentError, AgentResponse, Param, Side, TuningAgent};

const DEFAULT_GAIN: f64 = 1.0;
const MIN_STEP: f64 = 1.0;
/// Win-rate movement below this counts as "the last change did nothing".
const STALL_THRESHOLD: f64 = 0.005;

/// Proportional controller on `attack_power`.
///
/// Nerfs the favored side by `gain * |rate - 0.5| * attack`, at least one
/// point. When the previous change left the win rate where it was, it
/// switches to buffing the other side instead, and back again on the next
/// stall.
#[derive(Debug, Clone)]
pub struct HeuristicAgent {
    gain: f64,
    nerf_favored: bool,
    last_rate: Option<f64>,
}

impl HeuristicAgent {
    pub fn new(gain: f64) -> Self {
        Self {
            gain,
            nerf_favored: true,
            last_rate: None,
        }
    }

    fn step_size(&self, imbalance: f64, attack: f64) -> f64 {
        (self.gain * imbalance * attack).max(MIN_STEP)
    }
}

impl Default for HeuristicAgent {
    fn default() -> Self {
        Self::new(DEFAULT_GAIN)
    }
}

impl TuningAgent for HeuristicAgent {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn propose_delta(&mut self, ctx: &AgentContext<'_>) -> Result<AgentResponse, AgentError> {
        let rate = ctx.verdict.win_rate;
        let Some(favored) = ctx.verdict.favored_side() else {
            return Ok(AgentResponse::no_change().with_rationale("win rate inside band"));
        };

        if let Some(previous) = self.last_rate.replace(rate)
            && (previous - rate).abs() < STALL_THRESHOLD
        {
            self.nerf_favored = !self.nerf_favored;
        }

        let (attack_floor, _) = Param::AttackPower.range();
        let favored_attack = ctx.snapshot(favored).params.attack_power;
        let nerf = self.nerf_favored && favored_attack > attack_floor;
        let target = if nerf { favored } else { favored.opponent() };
        let attack = ctx.snapshot(target).params.attack_power;
        let imbalance = (rate - NEUTRAL_WIN_RATE).abs();
        let step = self.step_size(imbalance, attack);
        let delta = if nerf { -step } else { step };

        let rationale = format!(
            "{} favored at {:.1}% ({}); {} {} attack_power by {:.2}",
            side_name(ctx, favored),
            rate * 100.0,
            ctx.verdict.subject,
            if nerf { "lowering" } else { "raising" },
            side_name(ctx, target),
            step
        );
        Ok(AgentResponse::single(target, Param::AttackPower.as_str(), delta).with_rationale(rationale))
    }
}

fn side_name<'a>(ctx: &AgentContext<'a>, side: Side) -> &'a str {
    &ctx.snapshot(side).name
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::{
        BalanceBand, BatchResult, CharacterSnapshot, ConfidenceInterval, Params, Proposal,
        WinRateBasis, evaluate,
    };
    use std::time::Duration;

    fn snapshot(name: &str, attack: f64) -> CharacterSnapshot {
        CharacterSnapshot {
            name: name.into(),
            params: Params {
                attack_power: attack,
                ..Params::default()
            },
        }
    }

    fn batch(rate: f64) -> BatchResult {
        BatchResult {
            matches: 100,
            wins_a: 0,
            wins_b: 0,
            draws: 0,
            subject: Side::A,
            basis: WinRateBasis::Decisive,
            win_rate: rate,
            confidence: ConfidenceInterval {
                low: 0.0,
                high: 1.0,
            },
            mean_turns: 10.0,
            health_trace: None,
        }
    }

    fn propose(agent: &mut HeuristicAgent, rate: f64, attack_a: f64) -> AgentResponse {
        let a = snapshot("Bruiser", attack_a);
        let b = snapshot("Sparrer", 5.0);
        let band = BalanceBand::default();
        let batch = batch(rate);
        let verdict = evaluate(&batch, &band);
        let ctx = AgentContext {
            iteration: 0,
            snapshot_a: &a,
            snapshot_b: &b,
            batch: &batch,
            verdict: &verdict,
            band: &band,
            history: &[],
            timeout: Duration::from_secs(1),
        };
        agent.propose_delta(&ctx).unwrap()
    }

    fn only_delta(response: &AgentResponse) -> (Side, f64) {
        match &response.proposal {
            Proposal::Change(deltas) => {
                assert_eq!(deltas.len(), 1);
                assert_eq!(deltas[0].parameter, "attack_power");
                (deltas[0].side, deltas[0].delta)
            }
            Proposal::NoChange => panic!("expected a change"),
        }
    }

    #[test]
    fn nerfs_favored_side_proportionally() {
        let mut agent = HeuristicAgent::default();
        let (side, delta) = only_delta(&propose(&mut agent, 1.0, 20.0));
        assert_eq!(side, Side::A);
        assert!((delta + 10.0).abs() < 1e-9);
    }

    #[test]
    fn small_imbalance_still_moves_one_point() {
        let mut agent = HeuristicAgent::default();
        let (side, delta) = only_delta(&propose(&mut agent, 0.35, 5.0));
        assert_eq!(side, Side::B);
        assert!((delta + 1.0).abs() < 1e-9);
    }

    #[test]
    fn stalled_rate_switches_to_buffing_the_opponent() {
        let mut agent = HeuristicAgent::default();
        only_delta(&propose(&mut agent, 0.9, 20.0));
        let (side, delta) = only_delta(&propose(&mut agent, 0.9, 12.0));
        assert_eq!(side, Side::B);
        assert!(delta > 0.0);
    }

    #[test]
    fn balanced_verdict_holds() {
        let mut agent = HeuristicAgent::default();
        assert_eq!(propose(&mut agent, 0.5, 10.0).proposal, Proposal::NoChange);
    }
}
