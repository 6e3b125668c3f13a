//! Headless tactics stage runner.
//!
//! Reports go to stdout (text or JSON); logs go to stderr. Log filtering
//! follows `RUST_LOG`, falling back to `info` (or `debug` with `--verbose`).

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tactics_headless::{run_stage, scenario, verify, RunConfig, ScenarioError};

#[derive(Parser)]
#[command(name = "tactics_headless")]
#[command(about = "Headless grid tactics runner for AI playtesting and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one stage to the end
    Run {
        /// Stage file, or the name of a built-in stage
        #[arg(short, long, default_value = "skirmish")]
        stage: String,

        /// Override the stage seed
        #[arg(long)]
        seed: Option<u64>,

        /// Give up after this many ticks
        #[arg(long, default_value = "100000")]
        max_ticks: u64,

        /// Milliseconds per tick
        #[arg(long, default_value = "50")]
        tick_ms: u64,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Play the same stage several times and compare final state hashes
    Verify {
        /// Stage file, or the name of a built-in stage
        #[arg(short, long, default_value = "skirmish")]
        stage: String,

        /// Override the stage seed
        #[arg(long)]
        seed: Option<u64>,

        /// Number of runs
        #[arg(short, long, default_value = "3")]
        runs: u32,

        /// Give up each run after this many ticks
        #[arg(long, default_value = "100000")]
        max_ticks: u64,
    },

    /// List the built-in stages
    List,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let fallback = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match execute(cli.command) {
        Ok(code) => code,
        Err(err) => {
            error!(%err, "Run failed");
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Commands) -> Result<ExitCode, ScenarioError> {
    match command {
        Commands::Run {
            stage,
            seed,
            max_ticks,
            tick_ms,
            json,
        } => {
            let data = scenario::resolve(&stage)?;
            let config = RunConfig {
                seed,
                max_ticks,
                tick_ms,
            };
            let report = run_stage(&data, &config)?;
            if json {
                match serde_json::to_string_pretty(&report) {
                    Ok(text) => println!("{text}"),
                    Err(err) => {
                        error!(%err, "Failed to encode report");
                        return Ok(ExitCode::FAILURE);
                    }
                }
            } else {
                print!("{}", report.summary());
            }
            Ok(if report.outcome.is_some() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
        Commands::Verify {
            stage,
            seed,
            runs,
            max_ticks,
        } => {
            let data = scenario::resolve(&stage)?;
            let config = RunConfig {
                seed,
                max_ticks,
                ..RunConfig::default()
            };
            let result = verify(&data, &config, runs)?;
            if result.deterministic {
                println!("{}: {} runs, hash {:#018x}", data.name, runs, result.hashes.first().copied().unwrap_or(0));
                Ok(ExitCode::SUCCESS)
            } else {
                println!("{}: runs diverged: {:x?}", data.name, result.hashes);
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::List => {
            for name in scenario::builtin_names() {
                println!("{name}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
