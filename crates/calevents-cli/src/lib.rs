//! CLI, configuration and the single collection run
//!
//! This crate provides the `calendar-events` command-line interface.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod secret;

pub use cli::Cli;
pub use config::CliConfig;
pub use error::{CliError, CliResult};
