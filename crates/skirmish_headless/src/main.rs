//! Headless skirmish runner.
//!
//! Runs a scenario without graphics and prints a JSON summary.
//!
//! # Usage
//!
//! ```bash
//! # Run a scenario for its configured number of ticks
//! cargo run -p skirmish_headless -- run --scenario scenarios/tower_assault.ron
//!
//! # Override the tick count and stop once a side is wiped out
//! cargo run -p skirmish_headless -- \
//!     run --scenario scenarios/tower_assault.ron --ticks 2000 --until-decided
//!
//! # Check a scenario without running it
//! cargo run -p skirmish_headless -- validate --scenario scenarios/tower_assault.ron
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use skirmish_headless::{run_scenario, RunConfig, Scenario};

#[derive(Parser)]
#[command(name = "skirmish_headless")]
#[command(about = "Headless skirmish runner for CI verification")]
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
    /// Run a scenario and print a JSON summary
    Run {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Number of ticks (defaults to the scenario's own)
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Stop once at most one player has units left
        #[arg(long)]
        until_decided: bool,

        /// Write the summary to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Check that a scenario loads and all references resolve
    Validate {
        /// Scenario file to check
        #[arg(short, long)]
        scenario: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr, stdout is for the summary.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            ticks,
            until_decided,
            output,
            pretty,
        } => cmd_run(&scenario, ticks, until_decided, output.as_deref(), pretty),
        Commands::Validate { scenario } => cmd_validate(&scenario),
    }
}

fn load(path: &Path) -> Scenario {
    match Scenario::load(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to load scenario: {e}");
            std::process::exit(1);
        }
    }
}

/// Run a scenario and emit its summary
fn cmd_run(
    path: &Path,
    ticks: Option<u64>,
    until_decided: bool,
    output: Option<&Path>,
    pretty: bool,
) {
    let scenario = load(path);
    let config = RunConfig {
        ticks: ticks.unwrap_or(scenario.ticks),
        stop_on_elimination: until_decided,
    };
    tracing::info!(
        scenario = %scenario.name,
        ticks = config.ticks,
        until_decided,
        "Starting run"
    );

    let summary = match run_scenario(&scenario, config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            eprintln!("Run failed: {e}");
            std::process::exit(1);
        }
    };

    let json = if pretty {
        serde_json::to_string_pretty(&summary)
    } else {
        serde_json::to_string(&summary)
    };
    let json = match json {
        Ok(j) => j,
        Err(e) => {
            eprintln!("Failed to serialize summary: {e}");
            std::process::exit(1);
        }
    };

    match output {
        Some(out) => {
            if let Err(e) = std::fs::write(out, json) {
                eprintln!("Failed to write '{}': {e}", out.display());
                std::process::exit(1);
            }
            tracing::info!(path = %out.display(), "Summary written");
        }
        None => println!("{json}"),
    }

    tracing::info!(
        ticks = summary.ticks,
        survivors = summary.survivors.len(),
        deaths = summary.deaths.len(),
        state_hash = summary.state_hash,
        "Run complete"
    );
}

/// Check a scenario without running it
fn cmd_validate(path: &Path) {
    let scenario = load(path);
    match scenario.validate() {
        Ok(()) => eprintln!(
            "OK: '{}' ({} unit types, {} spawns, {} orders)",
            scenario.name,
            scenario.unit_types.len(),
            scenario.spawns.len(),
            scenario.orders.len()
        ),
        Err(e) => {
            eprintln!("FAIL: {e}");
            std::process::exit(1);
        }
    }
}
