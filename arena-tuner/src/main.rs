mod agents;
mod reports;
mod setup;

use anyhow::{Context, Result};
use arena_core::{
    MatchOptions, OptimizationSession, SessionConfig, evaluate, presets, rng, run_batch,
    simulate_match,
};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use agents::AgentKind;
use reports::{BatchSummary, DuelSummary, ReportFormat};
use setup::{Overrides, load_session_config, resolve_matchup};

/// Exit status of a balance run that ended outside the band.
const EXIT_UNBALANCED: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Run the balancing loop until the matchup is balanced or the budget runs out
    Balance,
    /// Run a single batch and report the verdict
    Batch,
    /// Play one match and print the turn log
    Duel,
    /// List bundled matchups and exit
    Presets,
}

#[derive(Debug, Parser)]
#[command(name = "arena-tuner", version)]
#[command(about = "Simulate two-character duels and tune their parameters toward a balanced win rate")]
struct Args {
    /// What to run
    #[arg(long, value_enum, default_value_t = Mode::Balance)]
    mode: Mode,

    /// Bundled preset name or path to a matchup JSON file
    #[arg(long, default_value = "healer_vs_attacker")]
    matchup: String,

    /// Session configuration JSON (fields left out take their defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Session seed; drawn from entropy when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Matches per batch
    #[arg(long)]
    matches: Option<u32>,

    /// Iteration budget for balance mode
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Turn cap per match
    #[arg(long)]
    max_turns: Option<u32>,

    /// Lower edge of the target win-rate band
    #[arg(long)]
    band_low: Option<f64>,

    /// Upper edge of the target win-rate band
    #[arg(long)]
    band_high: Option<f64>,

    /// Run matches of a batch in parallel
    #[arg(long)]
    parallel: bool,

    /// Decision agent for balance mode
    #[arg(long, value_enum, default_value_t = AgentKind::Heuristic)]
    agent: AgentKind,

    /// Command line of the external agent (with --agent command). Split on
    /// whitespace with no quoting; pass the command after `--` instead when an
    /// argument contains spaces
    #[arg(long)]
    agent_command: Option<String>,

    /// External agent program and arguments, taken verbatim after `--`
    #[arg(last = true, value_name = "AGENT_ARGV")]
    agent_argv: Vec<String>,

    /// Deadline for one agent reply, in milliseconds
    #[arg(long)]
    agent_timeout_ms: Option<u64>,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn agent_command(&self) -> Vec<String> {
        if !self.agent_argv.is_empty() {
            return self.agent_argv.clone();
        }
        self.agent_command
            .as_deref()
            .map(|line| line.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn overrides(&self) -> Overrides {
        Overrides {
            seed: self.seed,
            matches: self.matches,
            max_iterations: self.max_iterations,
            max_turns: self.max_turns,
            band_low: self.band_low,
            band_high: self.band_high,
            parallel: self.parallel,
            agent_timeout_ms: self.agent_timeout_ms,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.mode == Mode::Presets {
        return list_presets(&args);
    }

    if args.report == ReportFormat::Console {
        announce_banner();
    }

    let config = load_session_config(args.config.as_ref(), &args.overrides())?;
    let balanced = match args.mode {
        Mode::Balance => run_balance(&args, config)?,
        Mode::Batch => run_single_batch(&args, &config)?,
        Mode::Duel => run_duel(&args, &config)?,
        Mode::Presets => true,
    };

    if args.mode == Mode::Balance && !balanced {
        std::process::exit(EXIT_UNBALANCED);
    }
    Ok(())
}

fn announce_banner() {
    println!("{}", "⚔️  Arena Tuner".bright_cyan().bold());
    println!("{}", "================".cyan());
}

fn list_presets(args: &Args) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available matchups:")?;
    for (name, matchup) in presets() {
        writeln!(
            output_target.writer(),
            "  {name:20} - {} ({} vs {})",
            matchup.description,
            matchup.a.name,
            matchup.b.name
        )?;
    }
    output_target.flush_inner()?;
    Ok(())
}

fn run_balance(args: &Args, config: SessionConfig) -> Result<bool> {
    let matchup = resolve_matchup(&args.matchup)?;
    let (a, b) = matchup.characters();
    let mut agent = args.agent.create_agent(&args.agent_command())?;
    if args.verbose {
        println!(
            "🔧 Balancing {} vs {} with the {} agent ({} matches per batch, up to {} iterations)",
            a.name(),
            b.name(),
            args.agent,
            config.matches_per_batch,
            config.max_iterations
        );
    }

    let start_time = Instant::now();
    let session = OptimizationSession::new(a, b, config).context("failed to start session")?;
    let report = session.run(agent.as_mut()).context("balancing session failed")?;
    log::info!(
        "session ended with {} after {:?}",
        report.reason,
        start_time.elapsed()
    );

    let mut output_target = OutputTarget::new(args.output.clone())?;
    reports::write_session_report(&mut output_target, args.report, &report)?;
    output_target.flush_inner()?;
    Ok(report.is_balanced())
}

fn run_single_batch(args: &Args, config: &SessionConfig) -> Result<bool> {
    let matchup = resolve_matchup(&args.matchup)?;
    let (a, b) = matchup.characters();
    let seed = config.seed.unwrap_or_else(rng::entropy_seed);
    let batch_config = config.batch_config().with_health_tracking(true);
    let mut batch_rng = rng::stream(rng::batch_seed(seed, 0));
    let result = run_batch(&a, &b, &batch_config, &mut batch_rng).context("batch failed")?;
    let verdict = evaluate(&result, &config.band);

    let summary = BatchSummary {
        seed,
        a: a.snapshot(),
        b: b.snapshot(),
        result,
        verdict,
    };
    let mut output_target = OutputTarget::new(args.output.clone())?;
    reports::write_batch_report(&mut output_target, args.report, &summary)?;
    output_target.flush_inner()?;
    Ok(verdict.is_balanced())
}

fn run_duel(args: &Args, config: &SessionConfig) -> Result<bool> {
    let matchup = resolve_matchup(&args.matchup)?;
    let (a, b) = matchup.characters();
    let seed = config.seed.unwrap_or_else(rng::entropy_seed);
    let options = MatchOptions {
        record_log: true,
        record_health: false,
    };
    let outcome = simulate_match(&a, &b, &config.combat, &mut rng::stream(seed), options)
        .context("match failed")?;

    let summary = DuelSummary {
        seed,
        a: a.snapshot(),
        b: b.snapshot(),
        outcome,
    };
    let mut output_target = OutputTarget::new(args.output.clone())?;
    reports::write_duel_report(&mut output_target, args.report, &summary)?;
    output_target.flush_inner()?;
    Ok(true)
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
