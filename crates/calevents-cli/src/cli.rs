//! Command-line interface definition.

use std::path::PathBuf;

use clap::Parser;

/// calendar-events - List calendar events in a time window as JSON
#[derive(Debug, Parser)]
#[command(name = "calendar-events")]
#[command(author, version, about, long_about = None)]
#[command(allow_negative_numbers = true)]
pub struct Cli {
    /// Window start, as a Unix timestamp
    #[arg(value_name = "START_UNIX_TS")]
    pub start: i64,

    /// Window end, as a Unix timestamp
    #[arg(value_name = "END_UNIX_TS")]
    pub end: i64,

    /// Path to configuration file
    #[arg(long, short, env = "CALENDAR_EVENTS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Read source definitions from this directory only
    #[arg(long, env = "CALENDAR_EVENTS_SOURCES_DIR")]
    pub sources_dir: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}
