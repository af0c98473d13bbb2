//! One run: configuration, registry, collection, JSON.

use std::path::PathBuf;

use calevents_core::{EventRecord, TimeWindow, TracingConfig, to_json};
use calevents_sources::{BackendConnector, SourceRegistry, collect_events, default_sources_dir};
use tracing::{Level, info, warn};

use crate::cli::Cli;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};

/// Loads the configuration selected by the command line.
///
/// An explicit `--config` file must load. A broken default file is returned
/// as the second element alongside the defaults so it can be logged once
/// tracing is up.
pub fn load_config(cli: &Cli) -> CliResult<(CliConfig, Option<CliError>)> {
    match cli.config.as_deref() {
        Some(path) => Ok((CliConfig::load_from(path)?, None)),
        None => Ok(match CliConfig::load() {
            Ok(config) => (config, None),
            Err(e) => (CliConfig::default(), Some(e)),
        }),
    }
}

/// Tracing settings from the command line and configuration.
pub fn tracing_config(cli: &Cli, config: &CliConfig) -> TracingConfig {
    let base = if cli.debug || config.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default().with_level(Level::INFO)
    };
    base.with_format(config.log_format.into())
}

/// Registry directories, in lookup order.
///
/// `--sources-dir` replaces the list; otherwise the per-user directory comes
/// first, followed by the configured ones.
pub fn registry_dirs(cli: &Cli, config: &CliConfig) -> Vec<PathBuf> {
    if let Some(dir) = &cli.sources_dir {
        return vec![dir.clone()];
    }
    default_sources_dir()
        .into_iter()
        .chain(config.registry.sources_dirs.iter().cloned())
        .collect()
}

/// Builds the backend connector from configuration.
pub fn build_connector(config: &CliConfig) -> BackendConnector {
    let mut connector = BackendConnector::new()
        .with_connect_timeout(config.connect_timeout())
        .with_accounts(config.accounts());
    if let Some(dir) = &config.local.data_dir {
        connector = connector.with_data_dir(dir);
    }
    connector
}

/// Collects the events of every enabled source within the window.
///
/// Failures past argument parsing only reduce the result: an unusable
/// window or registry yields an empty list.
pub async fn collect(cli: &Cli, config: &CliConfig) -> Vec<EventRecord> {
    info!(start = cli.start, end = cli.end, "Starting with time range");

    let window = match TimeWindow::from_unix(cli.start, cli.end) {
        Ok(window) => window,
        Err(e) => {
            warn!(error = %e, "Unusable time range");
            return Vec::new();
        }
    };

    let dirs = registry_dirs(cli, config);
    let registry = match SourceRegistry::load(&dirs) {
        Ok(registry) => registry,
        Err(e) => {
            warn!(error = %e, "Failed to load source registry");
            SourceRegistry::default()
        }
    };
    info!(sources = registry.len(), "Registry loaded");

    let connector = build_connector(config);
    collect_events(&registry, &window, &connector).await
}

/// Runs the collection and renders the JSON document printed on stdout.
pub async fn run(cli: &Cli, config: &CliConfig) -> CliResult<String> {
    let records = collect(cli, config).await;
    info!(count = records.len(), "Done, writing JSON");
    Ok(to_json(&records, cli.pretty)?)
}
