use anyhow::Result;
use arena_core::{
    AdjustmentOutcome, BalanceVerdict, BatchResult, CharacterSnapshot, IterationRecord,
    MatchOutcome, SessionReport, Verdict, Winner,
};
use chrono::Utc;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
    Csv,
}

/// One batch with the characters it measured.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub seed: u64,
    pub a: CharacterSnapshot,
    pub b: CharacterSnapshot,
    pub result: BatchResult,
    pub verdict: BalanceVerdict,
}

/// One match with its per-turn log.
#[derive(Debug, Clone, Serialize)]
pub struct DuelSummary {
    pub seed: u64,
    pub a: CharacterSnapshot,
    pub b: CharacterSnapshot,
    pub outcome: MatchOutcome,
}

fn params_line(snapshot: &CharacterSnapshot) -> String {
    let p = &snapshot.params;
    format!(
        "{}: attack {:.2}, defense {:.2}, speed {:.2}, health {:.0}, healing {:.2} every {:.0}",
        snapshot.name,
        p.attack_power,
        p.defense,
        p.speed,
        p.max_health,
        p.healing,
        p.heal_interval
    )
}

fn adjustment_summary(record: &IterationRecord) -> String {
    let Some(adjustment) = record.adjustment.as_ref() else {
        return "-".to_string();
    };
    match &adjustment.outcome {
        AdjustmentOutcome::Applied { deltas } => deltas
            .iter()
            .map(|d| {
                format!(
                    "{}.{} {:.2} -> {:.2}",
                    d.side, d.change.parameter, d.change.before, d.change.after
                )
            })
            .collect::<Vec<_>>()
            .join("; "),
        AdjustmentOutcome::NoChange => "no change".to_string(),
        AdjustmentOutcome::Rejected { reason } => format!("rejected: {reason}"),
        AdjustmentOutcome::AgentFailed { reason } => format!("agent failed: {reason}"),
    }
}

fn colored_verdict(verdict: Verdict) -> colored::ColoredString {
    match verdict {
        Verdict::Balanced => verdict.label().green(),
        Verdict::FavorsA | Verdict::FavorsB => verdict.label().yellow(),
    }
}

pub fn write_session_report(
    writer: &mut dyn Write,
    format: ReportFormat,
    report: &SessionReport,
) -> Result<()> {
    match format {
        ReportFormat::Console => session_console(writer, report),
        ReportFormat::Json => write_json(writer, report),
        ReportFormat::Markdown => session_markdown(writer, report),
        ReportFormat::Csv => session_csv(writer, report),
    }
}

fn session_console(writer: &mut dyn Write, report: &SessionReport) -> Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", "📊 Balancing Session Summary".bright_cyan().bold())?;
    writeln!(writer, "{}", "============================".cyan())?;
    writeln!(writer, "Agent: {}", report.agent)?;
    writeln!(writer, "Seed: {}", report.seed)?;
    writeln!(writer, "Band: {}", report.config.band)?;
    writeln!(writer, "Batches run: {}", report.iterations_run)?;
    let reason = if report.is_balanced() {
        report.reason.as_str().green()
    } else {
        report.reason.as_str().red()
    };
    writeln!(writer, "Result: {reason}")?;
    writeln!(writer)?;

    for record in &report.history {
        let batch = &record.batch;
        writeln!(
            writer,
            "#{:<3} {:>6.2}% [{:.2}-{:.2}] {:<9} A {} / B {} / draws {}",
            record.iteration,
            record.verdict.win_rate * 100.0,
            batch.confidence.low * 100.0,
            batch.confidence.high * 100.0,
            colored_verdict(record.verdict.verdict),
            batch.wins_a,
            batch.wins_b,
            batch.draws
        )?;
        if record.adjustment.is_some() {
            writeln!(writer, "     {}", adjustment_summary(record).dimmed())?;
        }
        if let Some(rationale) = record.adjustment.as_ref().and_then(|a| a.rationale.as_ref()) {
            writeln!(writer, "     “{rationale}”")?;
        }
    }

    writeln!(writer)?;
    writeln!(writer, "{}", "Final parameters".bold())?;
    writeln!(writer, "  A {}", params_line(&report.final_a))?;
    writeln!(writer, "  B {}", params_line(&report.final_b))?;
    Ok(())
}

fn session_markdown(writer: &mut dyn Write, report: &SessionReport) -> Result<()> {
    writeln!(writer, "# Arena Balancing Report\n")?;
    writeln!(writer, "_Generated {}_\n", Utc::now().to_rfc3339())?;
    writeln!(writer, "## Summary\n")?;
    writeln!(writer, "- **Result**: {}", report.reason)?;
    writeln!(writer, "- **Agent**: {}", report.agent)?;
    writeln!(writer, "- **Seed**: {}", report.seed)?;
    writeln!(writer, "- **Band**: {}", report.config.band)?;
    writeln!(writer, "- **Batches run**: {}", report.iterations_run)?;
    writeln!(
        writer,
        "- **Matches per batch**: {}\n",
        report.config.matches_per_batch
    )?;

    writeln!(writer, "## Iterations\n")?;
    writeln!(
        writer,
        "| # | Win rate | 95% CI | Verdict | A wins | B wins | Draws | Adjustment |"
    )?;
    writeln!(writer, "|---|---|---|---|---|---|---|---|")?;
    for record in &report.history {
        let batch = &record.batch;
        writeln!(
            writer,
            "| {} | {:.2}% | {:.2}–{:.2}% | {} | {} | {} | {} | {} |",
            record.iteration,
            record.verdict.win_rate * 100.0,
            batch.confidence.low * 100.0,
            batch.confidence.high * 100.0,
            record.verdict.verdict,
            batch.wins_a,
            batch.wins_b,
            batch.draws,
            adjustment_summary(record).replace('|', "/")
        )?;
    }

    writeln!(writer, "\n## Final Parameters\n")?;
    writeln!(writer, "- **A** {}", params_line(&report.final_a))?;
    writeln!(writer, "- **B** {}", params_line(&report.final_b))?;
    Ok(())
}

fn session_csv(writer: &mut dyn Write, report: &SessionReport) -> Result<()> {
    writeln!(
        writer,
        "iteration,win_rate,ci_low,ci_high,verdict,wins_a,wins_b,draws,mean_turns,a_attack_power,a_defense,a_speed,a_max_health,a_healing,a_heal_interval,b_attack_power,b_defense,b_speed,b_max_health,b_healing,b_heal_interval,adjustment"
    )?;
    for record in &report.history {
        let batch = &record.batch;
        let a = &record.snapshot_a.params;
        let b = &record.snapshot_b.params;
        let adjustment = record
            .adjustment
            .as_ref()
            .map_or("", |adj| adj.outcome.label());
        writeln!(
            writer,
            "{},{:.4},{:.4},{:.4},{},{},{},{},{:.2},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            record.iteration,
            record.verdict.win_rate,
            batch.confidence.low,
            batch.confidence.high,
            record.verdict.verdict,
            batch.wins_a,
            batch.wins_b,
            batch.draws,
            batch.mean_turns,
            a.attack_power,
            a.defense,
            a.speed,
            a.max_health,
            a.healing,
            a.heal_interval,
            b.attack_power,
            b.defense,
            b.speed,
            b.max_health,
            b.healing,
            b.heal_interval,
            adjustment
        )?;
    }
    Ok(())
}

pub fn write_batch_report(
    writer: &mut dyn Write,
    format: ReportFormat,
    summary: &BatchSummary,
) -> Result<()> {
    let result = &summary.result;
    match format {
        ReportFormat::Json => write_json(writer, summary),
        ReportFormat::Csv => {
            writeln!(writer, "turn,mean_health_a,mean_health_b,matches_running")?;
            for point in result.health_trace.iter().flatten() {
                writeln!(
                    writer,
                    "{},{:.3},{:.3},{}",
                    point.turn, point.mean_a, point.mean_b, point.samples
                )?;
            }
            Ok(())
        }
        ReportFormat::Markdown => {
            writeln!(writer, "# Arena Batch Report\n")?;
            writeln!(writer, "_Generated {}_\n", Utc::now().to_rfc3339())?;
            writeln!(writer, "- **A** {}", params_line(&summary.a))?;
            writeln!(writer, "- **B** {}", params_line(&summary.b))?;
            writeln!(writer, "- **Seed**: {}", summary.seed)?;
            writeln!(writer, "- **Matches**: {}", result.matches)?;
            writeln!(
                writer,
                "- **Outcomes**: A {} / B {} / draws {}",
                result.wins_a, result.wins_b, result.draws
            )?;
            writeln!(
                writer,
                "- **Win rate ({})**: {:.2}% (95% CI {:.2}–{:.2}%)",
                result.subject,
                result.win_rate * 100.0,
                result.confidence.low * 100.0,
                result.confidence.high * 100.0
            )?;
            writeln!(writer, "- **Mean turns**: {:.1}", result.mean_turns)?;
            writeln!(writer, "- **Verdict**: {}", summary.verdict.verdict)?;
            Ok(())
        }
        ReportFormat::Console => {
            writeln!(writer)?;
            writeln!(writer, "{}", "📊 Batch Summary".bright_cyan().bold())?;
            writeln!(writer, "{}", "================".cyan())?;
            writeln!(writer, "A {}", params_line(&summary.a))?;
            writeln!(writer, "B {}", params_line(&summary.b))?;
            writeln!(writer, "Seed: {}", summary.seed)?;
            writeln!(
                writer,
                "Matches: {} (A {} / B {} / draws {})",
                result.matches,
                result.wins_a.to_string().green(),
                result.wins_b.to_string().green(),
                result.draws
            )?;
            writeln!(
                writer,
                "Win rate for {}: {:.2}% (95% CI {:.2}-{:.2}%)",
                result.subject,
                result.win_rate * 100.0,
                result.confidence.low * 100.0,
                result.confidence.high * 100.0
            )?;
            writeln!(writer, "Mean turns: {:.1}", result.mean_turns)?;
            writeln!(
                writer,
                "Verdict: {} (band {})",
                colored_verdict(summary.verdict.verdict),
                summary.verdict.band
            )?;
            Ok(())
        }
    }
}

pub fn write_duel_report(
    writer: &mut dyn Write,
    format: ReportFormat,
    summary: &DuelSummary,
) -> Result<()> {
    let outcome = &summary.outcome;
    let events = outcome.log.as_deref().unwrap_or_default();
    match format {
        ReportFormat::Json => write_json(writer, summary),
        ReportFormat::Csv => {
            writeln!(writer, "turn,actor,damage,healed,missed,health_a,health_b")?;
            for event in events {
                writeln!(
                    writer,
                    "{},{},{},{},{},{},{}",
                    event.turn,
                    event.actor,
                    event.damage,
                    event.healed,
                    event.missed,
                    event.health_a,
                    event.health_b
                )?;
            }
            Ok(())
        }
        ReportFormat::Markdown | ReportFormat::Console => {
            let winner = match outcome.winner {
                Winner::A => format!("{} wins", summary.a.name),
                Winner::B => format!("{} wins", summary.b.name),
                Winner::Draw => "draw".to_string(),
            };
            writeln!(writer, "{} vs {} (seed {})", summary.a.name, summary.b.name, summary.seed)?;
            for event in events {
                let attacker = match event.actor {
                    arena_core::Side::A => &summary.a.name,
                    arena_core::Side::B => &summary.b.name,
                };
                let mut line = if event.missed {
                    format!("turn {:>3}: {attacker} misses", event.turn)
                } else {
                    format!("turn {:>3}: {attacker} hits for {}", event.turn, event.damage)
                };
                if event.healed > 0 {
                    line.push_str(&format!(", heals {}", event.healed));
                }
                writeln!(
                    writer,
                    "{line} (A {} / B {})",
                    event.health_a, event.health_b
                )?;
            }
            writeln!(
                writer,
                "Result after {} turns: {}",
                outcome.turns,
                winner.bold()
            )?;
            Ok(())
        }
    }
}

fn write_json<T: Serialize>(writer: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value)?;
    writeln!(writer)?;
    Ok(())
}
