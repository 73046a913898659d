//! flakegate - release gate CLI
//!
//! The `flakegate` command turns test outcomes plus persisted history into a
//! GO / HOLD / NO_GO release decision.
//!
//! ## Commands
//!
//! - `evaluate`: Record a run's outcomes, score them and decide
//! - `history`: Inspect or reset the persisted outcome history
//! - `flaky`: List tests currently classified as flaky
//! - `decide`: Apply the decision rules to precomputed risk scores

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info, Level};

use flakegate_core::{
    detect_all, evaluate, parse_pair, read_results_file, render_summary, AttachmentSink,
    ConsoleSink, GateConfig, HistoryStore, JsonFileHistoryStore, RiskScores,
    RunContext, RunCoordinator, DEFAULT_CONFIG_PATH, MAX_RISK,
};

#[derive(Parser)]
#[command(name = "flakegate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "History-aware release gate for test suites", long_about = None)]
struct Cli {
    /// Path to the gate configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// History file (overrides `[history] path`)
    #[arg(long, global = true, env = "FLAKEGATE_HISTORY")]
    history: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record outcomes for one run and publish the release decision
    Evaluate {
        /// JSON result files (object or event array)
        #[arg(long = "results", value_name = "FILE", num_args = 1..)]
        results: Vec<PathBuf>,

        /// Individual outcomes as name=OUTCOME
        #[arg(long = "result", value_name = "NAME=OUTCOME")]
        result: Vec<String>,

        /// Directory for the summary and JSON report attachments
        /// (overrides `[report] dir`)
        #[arg(long)]
        report_dir: Option<PathBuf>,

        /// Do not write report attachments
        #[arg(long, conflicts_with = "report_dir")]
        no_attachments: bool,

        /// Do not print the summary to stdout
        #[arg(long)]
        no_console: bool,
    },

    /// Inspect or reset the persisted history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// List tests currently classified as flaky
    Flaky,

    /// Decide from a JSON map of test name to risk score
    Decide {
        /// Score file: {"<test>": <0-10>, ...}
        #[arg(long)]
        scores: PathBuf,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Print the persisted history as JSON
    Show {
        /// Only print this test's outcome sequence
        #[arg(long)]
        test: Option<String>,
    },

    /// Delete the history file
    Reset,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    flakegate_core::init_tracing(cli.json, level);

    let mut config = GateConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;
    if let Some(path) = cli.history {
        config.history_path = path;
    }
    debug!(history = %config.history_path.display(), "configuration resolved");

    match cli.command {
        Commands::Evaluate {
            results,
            result,
            report_dir,
            no_attachments,
            no_console,
        } => {
            let attachments = match report_dir {
                _ if no_attachments => None,
                Some(dir) => Some(dir),
                None => config.attachments.then(|| config.report_dir.clone()),
            };
            cmd_evaluate(config, &results, &result, attachments, no_console)
        }
        Commands::History { action } => match action {
            HistoryAction::Show { test } => cmd_history_show(&config, test.as_deref()),
            HistoryAction::Reset => cmd_history_reset(&config),
        },
        Commands::Flaky => cmd_flaky(&config),
        Commands::Decide { scores } => cmd_decide(&scores),
    }
}

fn cmd_evaluate(
    config: GateConfig,
    results: &[PathBuf],
    pairs: &[String],
    attachments: Option<PathBuf>,
    no_console: bool,
) -> Result<()> {
    let ctx = RunContext::new();
    for path in results {
        let events = read_results_file(path)
            .with_context(|| format!("Failed to read results {}", path.display()))?;
        ctx.record_all(events);
    }
    for pair in pairs {
        let (name, outcome) = parse_pair(pair)?;
        ctx.record(name, outcome);
    }
    if ctx.is_empty() {
        bail!("No test outcomes given; pass --results <FILE> or --result <NAME=OUTCOME>");
    }

    let store = JsonFileHistoryStore::new(&config.history_path);
    let mut coordinator = RunCoordinator::new(store, config.risk);
    if !no_console {
        coordinator = coordinator.with_sink(ConsoleSink);
    }
    if let Some(dir) = attachments {
        coordinator = coordinator.with_sink(AttachmentSink::new(dir));
    }

    let report = coordinator.finalize(ctx)?;
    info!(
        run_id = %report.run_id,
        decision = %report.decision,
        flaky = report.flaky_tests().count(),
        "run finalized"
    );
    Ok(())
}

fn cmd_history_show(config: &GateConfig, test: Option<&str>) -> Result<()> {
    let history = JsonFileHistoryStore::new(&config.history_path).load();

    match test {
        Some(name) => {
            let Some(entries) = history.get(name) else {
                bail!("No history recorded for test '{}'", name);
            };
            println!("{}", serde_json::to_string(&entries.to_vec())?);
        }
        None => println!("{}", serde_json::to_string_pretty(&history)?),
    }
    Ok(())
}

fn cmd_history_reset(config: &GateConfig) -> Result<()> {
    let store = JsonFileHistoryStore::new(&config.history_path);
    let removed = store
        .remove()
        .with_context(|| format!("Failed to remove {}", store.path().display()))?;

    if removed {
        println!("Removed history {}", store.path().display());
    } else {
        println!("No history at {}", store.path().display());
    }
    Ok(())
}

fn cmd_flaky(config: &GateConfig) -> Result<()> {
    let history = JsonFileHistoryStore::new(&config.history_path).load();
    let flaky: Vec<_> = detect_all(&history)
        .into_iter()
        .filter_map(|(name, flaky)| flaky.then_some(name))
        .collect();

    if flaky.is_empty() {
        println!("No flaky tests.");
        return Ok(());
    }

    for name in flaky {
        if let Some(entries) = history.get(&name) {
            println!(
                "{}  ({} pass / {} fail of {})",
                name,
                entries.passes(),
                entries.failures(),
                entries.len()
            );
        }
    }
    Ok(())
}

fn cmd_decide(path: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scores {}", path.display()))?;
    let scores: RiskScores = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid score map {}", path.display()))?;
    if let Some((name, score)) = scores.iter().find(|(_, s)| **s > MAX_RISK) {
        bail!("Score {} for '{}' exceeds {}", score, name, MAX_RISK);
    }

    let verdict = evaluate(&scores);
    print!(
        "{}",
        render_summary(
            scores.iter().map(|(name, score)| (name.as_str(), *score, false)),
            verdict.decision,
        )
    );
    println!("Rule: {}", verdict.rule);
    if let Some(trigger) = &verdict.trigger {
        println!("Trigger: {}", trigger);
    }
    println!("Mean risk: {:.2}", verdict.mean_risk);

    if verdict.decision.is_blocking() {
        bail!("release blocked: FINAL DECISION = {}", verdict.decision);
    }
    Ok(())
}
