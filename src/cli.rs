//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::display::Format;
use crate::report::Provider;

/// Earthquake early warning aggregation from your terminal.
#[derive(Parser, Debug)]
#[command(name = "eewmon")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a stream of NDJSON reports through the engine
    Replay(ReplayArgs),

    /// Interpolate P/S wavefront distances from a travel-time table
    Interpolate(InterpolateArgs),
}

/// Arguments for the `replay` command.
#[derive(Parser, Debug)]
pub struct ReplayArgs {
    /// Input file of NDJSON report records, or "-" for stdin
    #[arg(long, short = 'i', default_value = "-")]
    pub input: String,

    /// Provider format of the input records
    #[arg(long, default_value = "dmdata", value_parser = parse_provider)]
    pub provider: Provider,

    /// Travel-time table file (wavefronts disabled when absent)
    #[arg(long)]
    pub travel_table: Option<PathBuf>,

    /// Delay between records in milliseconds
    #[arg(long, default_value = "0")]
    pub delay_ms: u64,

    /// Show low-accuracy estimates (PLUM / level trigger / single station)
    #[arg(long)]
    pub show_low_accuracy: bool,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `interpolate` command.
#[derive(Parser, Debug)]
pub struct InterpolateArgs {
    /// Travel-time table file
    #[arg(long)]
    pub table: PathBuf,

    /// Hypocenter depth in km
    #[arg(long)]
    pub depth: f64,

    /// Seconds elapsed since origin
    #[arg(long)]
    pub elapsed: f64,
}

/// Parse a provider from string.
fn parse_provider(s: &str) -> Result<Provider, String> {
    s.parse()
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}
