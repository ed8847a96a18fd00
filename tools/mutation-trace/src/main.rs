//! Mutation Trace CLI

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use mutation_telemetry::{init_telemetry, TelemetryConfig};
use mutation_trace::{check_options, run, RunOptions, Scenario};

/// Replay DOM edit scenarios and print observed mutations
#[derive(Parser, Debug)]
#[command(name = "mutation-trace")]
#[command(about = "Replay DOM edit scenarios and print observed mutations as JSON lines")]
struct Args {
    /// Log filter, overrides DM_LOG_LEVEL
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a scenario file
    Run {
        /// Path to the scenario JSON
        scenario: PathBuf,

        /// Print one line per record instead of per batch
        #[arg(long)]
        flatten: bool,

        /// Stop after this many items
        #[arg(long)]
        limit: Option<usize>,

        /// Abort the observation after this many items
        #[arg(long)]
        abort_after: Option<usize>,
    },
    /// Validate observe options and print them normalized
    Check {
        /// Path to an options JSON object
        options: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = TelemetryConfig::from_env();
    if let Some(level) = args.log_level {
        config = config.with_log_level(level);
    }
    if args.json_logs {
        config = config.with_json_logs(true);
    }
    let _guard = init_telemetry(config).context("failed to initialize logging")?;

    let mut stdout = io::stdout().lock();
    match args.command {
        Command::Run {
            scenario,
            flatten,
            limit,
            abort_after,
        } => {
            let json = fs::read_to_string(&scenario)
                .with_context(|| format!("failed to read {}", scenario.display()))?;
            let parsed = Scenario::from_json(&json)
                .with_context(|| format!("failed to parse {}", scenario.display()))?;
            info!(path = %scenario.display(), steps = parsed.steps.len(), "Replaying scenario");

            let options = RunOptions {
                flatten,
                limit,
                abort_after,
            };
            let events = run(&parsed, options).await.context("replay failed")?;
            for event in &events {
                serde_json::to_writer(&mut stdout, event)?;
                writeln!(stdout)?;
            }
        }
        Command::Check { options } => {
            let json = fs::read_to_string(&options)
                .with_context(|| format!("failed to read {}", options.display()))?;
            let normalized = check_options(&json).context("options rejected")?;
            serde_json::to_writer_pretty(&mut stdout, &normalized)?;
            writeln!(stdout)?;
        }
    }

    Ok(())
}
