//! Headless Bastion runner.
//!
//! Runs the simulation without graphics for CI verification, balance
//! sweeps and replay checks.
//!
//! # Usage
//!
//! ```bash
//! # Run the built-in skirmish for 2000 ticks, JSON report on stdout
//! cargo run -p bastion_headless -- run --ticks 2000
//!
//! # Run a RON scenario file
//! cargo run -p bastion_headless -- run --scenario maps/duel.ron --ticks 500
//!
//! # Verify determinism: N independent runs must agree
//! cargo run -p bastion_headless -- verify --ticks 1000 --runs 4
//!
//! # Sweep seeds in parallel
//! cargo run -p bastion_headless -- sweep --ticks 500 --seeds 32
//! ```
//!
//! Logs go to stderr; reports go to stdout as JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rayon::prelude::*;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use bastion_headless::{load_scenario, run_scenario, verify_scenario};

#[derive(Parser)]
#[command(name = "bastion_headless")]
#[command(about = "Headless Bastion runner for CI and balance testing")]
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
    /// Run a single scenario and print a JSON report
    Run {
        /// Scenario RON file; the built-in skirmish when omitted
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of cycles to simulate
        #[arg(short, long, default_value = "2000")]
        ticks: u64,
    },

    /// Run a scenario repeatedly and fail on any state-hash divergence
    Verify {
        /// Scenario RON file; the built-in skirmish when omitted
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of cycles per run
        #[arg(short, long, default_value = "1000")]
        ticks: u64,

        /// Number of independent runs to compare
        #[arg(short, long, default_value = "3")]
        runs: usize,
    },

    /// Run one scenario across many seeds in parallel
    Sweep {
        /// Scenario RON file; the built-in skirmish when omitted
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of cycles per run
        #[arg(short, long, default_value = "500")]
        ticks: u64,

        /// Number of seeds to sweep
        #[arg(long, default_value = "16")]
        seeds: u64,
    },
}

#[derive(Serialize)]
struct SweepEntry {
    seed: u64,
    final_hash: u64,
    assets: usize,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "run failed");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Run { scenario, ticks } => {
            let setup = load_scenario(scenario.as_deref())?;
            tracing::info!(scenario = %setup.name, ticks, "running");
            let report = run_scenario(&setup, ticks)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Verify {
            scenario,
            ticks,
            runs,
        } => {
            let setup = load_scenario(scenario.as_deref())?;
            tracing::info!(scenario = %setup.name, ticks, runs, "verifying determinism");
            let hash = verify_scenario(&setup, ticks, runs)?;
            println!("{{\"scenario\":\"{}\",\"runs\":{runs},\"hash\":{hash}}}", setup.name);
        }
        Commands::Sweep {
            scenario,
            ticks,
            seeds,
        } => {
            let setup = load_scenario(scenario.as_deref())?;
            tracing::info!(scenario = %setup.name, ticks, seeds, "sweeping seeds");
            let entries: Vec<SweepEntry> = (0..seeds)
                .into_par_iter()
                .map(|seed| {
                    let mut variant = setup.clone();
                    variant.seed = seed;
                    run_scenario(&variant, ticks).map(|report| SweepEntry {
                        seed,
                        final_hash: report.final_hash,
                        assets: report.assets,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }
    Ok(())
}
