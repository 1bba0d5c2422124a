//! CLI entrypoint for the handoff conformance corpus.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use handoff_harness::structured_log::LogEmitter;
use handoff_harness::{
    CorpusConfig, CorpusReport, CorpusRunner, CorpusSummary, HarnessError, Scenario, catalog,
};
use handoff_membrane::config::safety_level;

/// Conformance tooling for the handoff boundary.
#[derive(Debug, Parser)]
#[command(name = "handoff-harness")]
#[command(about = "Conformance corpus for the handoff native boundary")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List scenario ids.
    List,
    /// Run the corpus (or the selected scenarios).
    Run {
        /// Scenario id to run; repeat to select several. Default: all.
        #[arg(long = "scenario")]
        scenarios: Vec<String>,
        /// Worker threads for the counter scenarios.
        #[arg(long)]
        threads: Option<usize>,
        /// Increments per worker.
        #[arg(long)]
        per_thread: Option<u64>,
        /// Repetitions of the unguarded race.
        #[arg(long)]
        race_trials: Option<u32>,
        /// JSON file with `threads`, `per_thread`, `race_trials`.
        #[arg(long)]
        config: Option<PathBuf>,
        /// JSONL log output path. Default: stdout.
        #[arg(long)]
        log: Option<PathBuf>,
        /// JSON report output path.
        #[arg(long)]
        report_json: Option<PathBuf>,
        /// Markdown report output path.
        #[arg(long)]
        report_md: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::List => {
            for s in catalog() {
                println!("{:<24} {:<20} {}", s.id, s.component, s.summary);
            }
        }
        Command::Run {
            scenarios,
            threads,
            per_thread,
            race_trials,
            config,
            log,
            report_json,
            report_md,
        } => {
            let base = match &config {
                Some(path) => CorpusConfig::from_file(path)?,
                None => CorpusConfig::default(),
            };
            let config = base.with_overrides(threads, per_thread, race_trials);
            let selected = select(&scenarios)?;

            let run_id = format!("handoff-{}", std::process::id());
            let mut emitter = match &log {
                Some(path) => LogEmitter::to_file(path, &run_id)?,
                None => LogEmitter::to_stdout(&run_id),
            };
            let results = CorpusRunner::new(config)
                .with_log(&mut emitter)
                .run(&selected)?;

            let report = CorpusReport {
                title: String::from("handoff Conformance Report"),
                mode: safety_level().as_str().to_string(),
                timestamp: handoff_harness::structured_log::now_utc(),
                config,
                summary: CorpusSummary::from_results(results),
            };

            eprintln!(
                "Corpus complete: total={}, passed={}, failed={}",
                report.summary.total, report.summary.passed, report.summary.failed
            );
            if let Some(path) = report_json {
                std::fs::write(&path, report.to_json())?;
                eprintln!("Wrote JSON report to {} (sha256 {})", path.display(), report.digest());
            }
            if let Some(path) = report_md {
                std::fs::write(&path, report.to_markdown())?;
                eprintln!("Wrote markdown report to {}", path.display());
            }

            if !report.summary.all_passed() {
                return Err("Conformance corpus failed".into());
            }
        }
    }

    Ok(())
}

fn select(ids: &[String]) -> Result<Vec<&'static Scenario>, HarnessError> {
    if ids.is_empty() {
        return Ok(catalog().iter().collect());
    }
    ids.iter()
        .map(|id| {
            handoff_harness::find(id).ok_or_else(|| HarnessError::UnknownScenario(id.clone()))
        })
        .collect()
}
