//! eewmon - Earthquake early warning aggregation from your terminal.
//!
//! Ingests successive EEW bulletins, maintains the active-event picture
//! (merged regional intensities, warning areas, P/S wavefront radii), and
//! prints the derived views as they change.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

mod cli;
mod display;
mod engine;
mod errors;
mod intensity;
mod merge;
mod method;
mod report;
mod store;
mod travel_time;
mod wavefront;

use cli::{Cli, Command};
use display::{EventDisplay, Format};
use engine::{Engine, EngineConfig};
use travel_time::TravelTimeTable;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Replay(args) => cmd_replay(args),
        Command::Interpolate(args) => cmd_interpolate(&args),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the `replay` command - stream reports through the engine.
fn cmd_replay(args: cli::ReplayArgs) -> Result<()> {
    tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")?
        .block_on(replay(args))
}

async fn replay(args: cli::ReplayArgs) -> Result<()> {
    // Table load failure is surfaced once; aggregation continues without
    // wavefronts.
    let table = match &args.travel_table {
        Some(path) => match TravelTimeTable::load(path) {
            Ok(table) => Some(table),
            Err(e) => {
                tracing::error!("travel-time table unusable, wavefronts disabled: {e}");
                eprintln!("Warning: wavefronts disabled ({e})");
                None
            }
        },
        None => None,
    };

    let config = EngineConfig {
        show_low_accuracy: args.show_low_accuracy,
        ..EngineConfig::default()
    };
    let engine = Engine::start(config, table);
    let mut merged_rx = engine.merged_views();

    let reader: Box<dyn BufRead> = if args.input == "-" {
        Box::new(io::BufReader::new(io::stdin()))
    } else {
        let file = std::fs::File::open(&args.input)
            .with_context(|| format!("failed to open input file {}", args.input))?;
        Box::new(io::BufReader::new(file))
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let mut record_count = 0u64;
    let mut skipped = 0u64;

    for line in reader.lines() {
        let line = line.context("failed to read input line")?;
        if line.trim().is_empty() {
            continue;
        }

        let report = match args.provider.decode(&line) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!("skipping malformed record: {e}");
                skipped += 1;
                continue;
            }
        };
        record_count += 1;

        let event_id = report.event_id.clone();
        engine.ingest(report).await;

        // Print the event's display line, then the merged view when changed.
        let snapshot = engine.snapshot().await;
        if let Some(event) = snapshot.iter().find(|e| e.current.event_id == event_id) {
            let model = EventDisplay::from_event(event, engine.config());
            display::write_events(&mut handle, &[model], args.format)?;
        }
        if merged_rx.has_changed().unwrap_or(false) && args.format == Format::Human {
            let merged = merged_rx.borrow_and_update().clone();
            display::write_merged_human(&mut handle, &merged)?;
        }
        handle.flush()?;

        if args.delay_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(args.delay_ms)).await;
        }
    }

    tracing::info!(records = record_count, skipped, "replay finished");
    engine.shutdown();
    Ok(())
}

/// Execute the `interpolate` command - one-shot table lookup.
fn cmd_interpolate(args: &cli::InterpolateArgs) -> Result<()> {
    let table = TravelTimeTable::load(&args.table)
        .with_context(|| format!("failed to load travel-time table {}", args.table.display()))?;

    let (p, s) = table.interpolate(args.depth, args.elapsed);
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(
        handle,
        "depth {:.0} km, elapsed {:.1} s -> P {} | S {}",
        args.depth,
        args.elapsed,
        format_distance(p),
        format_distance(s),
    )?;
    Ok(())
}

fn format_distance(km: f64) -> String {
    if km.is_nan() {
        "not drawable".to_string()
    } else {
        format!("{km:.1} km")
    }
}
