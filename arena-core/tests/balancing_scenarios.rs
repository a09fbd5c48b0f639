use arena_core::{
    AdjustmentOutcome, AgentError, AgentResponse, LoopState, NoChangeAgent, OptimizationSession,
    Param, ScriptedAgent, SessionConfig, Side, TerminationReason, Verdict, preset,
};

fn config(matches: u32, max_iterations: u32) -> SessionConfig {
    SessionConfig {
        matches_per_batch: matches,
        max_iterations,
        seed: Some(2024),
        ..SessionConfig::default()
    }
}

#[test]
fn mirror_matchup_is_balanced_immediately() {
    let (a, b) = preset("mirror").expect("bundled mirror").characters();
    let report = OptimizationSession::new(a, b, config(1_000, 10))
        .unwrap()
        .run(&mut NoChangeAgent)
        .unwrap();

    assert_eq!(report.reason, TerminationReason::Balanced);
    assert_eq!(report.iterations_run, 1);
    assert_eq!(report.history[0].iteration, 0);
    assert!(report.history[0].adjustment.is_none());
    let batch = &report.history[0].batch;
    assert_eq!(batch.wins_a + batch.wins_b + batch.draws, 1_000);
}

#[test]
fn lopsided_attack_converges_with_scripted_nerfs() {
    let (a, b) = preset("bruiser").expect("bundled bruiser").characters();
    let mut agent = ScriptedAgent::repeating(Ok(AgentResponse::single(
        Side::A,
        "attack_power",
        -5.0,
    )
    .with_rationale("A overwhelms B")));
    let report = OptimizationSession::new(a, b, config(400, 10))
        .unwrap()
        .run(&mut agent)
        .unwrap();

    assert_eq!(report.history[0].verdict.verdict, Verdict::FavorsA);
    assert_eq!(report.reason, TerminationReason::Balanced);
    assert!(report.iterations_run <= 11);
    assert!(report.final_a.params.attack_power < 20.0);
    assert!(report.is_balanced());

    let first = report.history[0].adjustment.as_ref().unwrap();
    assert_eq!(first.rationale.as_deref(), Some("A overwhelms B"));
    match &first.outcome {
        AdjustmentOutcome::Applied { deltas } => {
            assert_eq!(deltas.len(), 1);
            assert_eq!(deltas[0].side, Side::A);
            assert_eq!(deltas[0].change.parameter, Param::AttackPower);
            assert!((deltas[0].change.after - 15.0).abs() < f64::EPSILON);
        }
        other => panic!("expected applied adjustment, got {other:?}"),
    }
}

#[test]
fn no_change_agent_exhausts_the_budget() {
    let (a, b) = preset("bruiser").expect("bundled bruiser").characters();
    let start_a = a.snapshot();
    let start_b = b.snapshot();
    let report = OptimizationSession::new(a, b, config(100, 5))
        .unwrap()
        .run(&mut NoChangeAgent)
        .unwrap();

    assert_eq!(report.reason, TerminationReason::MaxIterations);
    assert_eq!(report.iterations_run, 6);
    assert_eq!(report.history.len(), 6);
    assert_eq!(report.final_a, start_a);
    assert_eq!(report.final_b, start_b);
    assert!(report.history[..5].iter().all(|record| matches!(
        record.adjustment.as_ref().map(|adj| &adj.outcome),
        Some(AdjustmentOutcome::NoChange)
    )));
    assert!(report.history[5].adjustment.is_none());
}

#[test]
fn repeated_timeouts_abort_the_session() {
    let (a, b) = preset("bruiser").expect("bundled bruiser").characters();
    let mut agent = ScriptedAgent::repeating(Err(AgentError::Timeout { timeout_ms: 30_000 }));
    let report = OptimizationSession::new(a, b, config(100, 10))
        .unwrap()
        .run(&mut agent)
        .unwrap();

    assert_eq!(report.reason, TerminationReason::AgentUnreachable);
    assert_eq!(report.iterations_run, 3);
    assert_eq!(agent.calls(), 3);
    assert!(report.history.iter().all(|record| matches!(
        record.adjustment.as_ref().map(|adj| &adj.outcome),
        Some(AdjustmentOutcome::AgentFailed { .. })
    )));
}

#[test]
fn unknown_parameter_is_rejected_and_loop_continues() {
    let (a, b) = preset("bruiser").expect("bundled bruiser").characters();
    let mut agent = ScriptedAgent::new([Ok(AgentResponse::single(Side::B, "mana", 3.0))]);
    let mut session = OptimizationSession::new(a, b, config(100, 3)).unwrap();

    assert_eq!(session.step(&mut agent).unwrap(), LoopState::Running);
    let outcome = &session.history()[0].adjustment.as_ref().unwrap().outcome;
    assert!(matches!(outcome, AdjustmentOutcome::Rejected { reason } if reason.contains("mana")));

    let report = session.run(&mut agent).unwrap();
    assert_eq!(report.reason, TerminationReason::MaxIterations);
    assert_eq!(report.iterations_run, 4);
}

#[test]
fn same_seed_replays_the_same_session() {
    let run = || {
        let (a, b) = preset("healer_vs_attacker").expect("bundled preset").characters();
        OptimizationSession::new(a, b, config(200, 2))
            .unwrap()
            .run(&mut NoChangeAgent)
            .unwrap()
    };
    assert_eq!(run(), run());
}
