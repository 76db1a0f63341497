//! Scrollwork CLI
//!
//! Replay and check scroll animation scenarios without a renderer.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod scenario;
mod simulate;

use scenario::Scenario;
use simulate::{Simulation, TraceRow};

#[derive(Parser)]
#[command(name = "scrollwork")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Scroll-synchronized animation scenarios", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario and print a progress trace
    Run {
        /// Scenario file
        scenario: PathBuf,

        /// Sample every N frames (frames with boundary events are always shown)
        #[arg(short, long, default_value = "10")]
        every: u64,

        /// Print the trace as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a scenario and print resolved trigger spans
    Check {
        /// Scenario file
        scenario: PathBuf,

        /// Print spans as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            every,
            json,
        } => cmd_run(&scenario, every, json),

        Commands::Check { scenario, json } => cmd_check(&scenario, json),
    }
}

fn cmd_run(path: &Path, every: u64, json: bool) -> Result<()> {
    let scenario = Scenario::load(path)?;
    info!(
        "Replaying {} ({} triggers, {} script steps)",
        path.display(),
        scenario.triggers.len(),
        scenario.script.len()
    );

    let mut sim = Simulation::build(&scenario)?;
    let rows = sim.run(every)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for row in &rows {
            println!("{}", format_row(row));
        }
    }

    info!("{} frames sampled", rows.len());
    Ok(())
}

fn cmd_check(path: &Path, json: bool) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let sim = Simulation::build(&scenario)?;
    let spans = sim.spans();

    if json {
        println!("{}", serde_json::to_string_pretty(&spans)?);
    } else {
        for span in &spans {
            match span.reserved {
                Some(reserved) => println!(
                    "{:<16} {:>9.1} → {:>9.1}  reserves {:.1}px",
                    span.name, span.start, span.end, reserved
                ),
                None => println!("{:<16} {:>9.1} → {:>9.1}", span.name, span.start, span.end),
            }
        }
    }

    info!(
        "{} is valid; scroll limit {:.1}px",
        path.display(),
        sim.engine().scroll_limit()
    );
    Ok(())
}

fn format_row(row: &TraceRow) -> String {
    let mut line = format!(
        "{:>5} {:>8.1}ms  raw {:>8.1}  smooth {:>8.1}",
        row.frame, row.time_ms, row.raw, row.smoothed
    );
    for region in &row.regions {
        line.push_str(&format!("  {}={:.3}", region.name, region.progress));
        if region.value != region.progress {
            line.push_str(&format!("({:.3})", region.value));
        }
        for event in &region.events {
            line.push_str(&format!(" [{event}]"));
        }
    }
    line
}
