//! CLI error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that end a run with a non-zero exit status.
#[derive(Debug, Error)]
pub enum CliError {
    /// The configuration file could not be read.
    #[error("failed to read config {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`crate::config::CliConfig`].
    #[error("failed to parse config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The configuration file parsed but holds an unusable value.
    #[error("invalid config {}: {message}", .path.display())]
    ConfigInvalid { path: PathBuf, message: String },

    /// Logging could not be set up.
    #[error(transparent)]
    Tracing(#[from] calevents_core::TracingError),

    /// The event list could not be serialized.
    #[error("failed to serialize events: {0}")]
    Json(#[from] serde_json::Error),
}
