//! CLI configuration.
//!
//! All settings live in a single `config.toml`, by default at
//! `~/.config/calendar-events/config.toml`. Every key is optional:
//!
//! ```toml
//! debug = false
//! log_format = "compact"        # compact | pretty | json
//! connect_timeout_secs = 30
//!
//! [registry]
//! sources_dirs = ["/etc/evolution/sources"]
//!
//! [local]
//! data_dir = "/home/alice/.local/share/evolution/calendar"
//!
//! [[accounts]]
//! source = "work-calendar"
//! url = "https://dav.example.com/calendars/alice/work/"
//! username = "alice"
//! password = "pass::dav/work"
//! verify_tls = true
//! ```
//!
//! Account passwords support secret references (see [`crate::secret`]).

use std::path::{Path, PathBuf};
use std::time::Duration;

use calevents_core::TracingOutputFormat;
use calevents_sources::{Account, DEFAULT_CONNECT_TIMEOUT};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CliError, CliResult};

/// Configuration for the calendar-events CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Debug logging.
    pub debug: bool,

    /// Log line format.
    pub log_format: LogFormat,

    /// Per-source connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Registry settings.
    pub registry: RegistrySettings,

    /// Local backend settings.
    pub local: LocalSettings,

    /// Connection overrides for remote sources.
    pub accounts: Vec<AccountSettings>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_format: LogFormat::default(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT.as_secs(),
            registry: RegistrySettings::default(),
            local: LocalSettings::default(),
            accounts: Vec::new(),
        }
    }
}

/// Log line format, as written in the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

impl From<LogFormat> for TracingOutputFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Compact => Self::Compact,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Json => Self::Json,
        }
    }
}

/// Registry settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Extra directories searched after the per-user one.
    pub sources_dirs: Vec<PathBuf>,
}

/// Local backend settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSettings {
    /// Directory holding `<uid>/calendar.ics`.
    pub data_dir: Option<PathBuf>,
}

/// Connection override for one remote source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSettings {
    /// UID of the source.
    pub source: String,

    /// Collection or feed URL.
    pub url: Option<String>,

    pub username: Option<String>,

    /// Password (supports `pass::` and `env::` prefixes).
    pub password: Option<String>,

    /// Whether to verify TLS certificates.
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
}

fn default_verify_tls() -> bool {
    true
}

impl AccountSettings {
    /// Converts to a backend account, resolving the password reference.
    ///
    /// A password that cannot be resolved is logged and left out, so the
    /// source fails authentication on its own instead of aborting the run.
    pub fn to_account(&self) -> Account {
        let mut account = Account::new(&self.source);
        account.url = self.url.clone();
        account.username = self.username.clone();
        account.verify_tls = self.verify_tls;

        if let Some(raw) = self.password.as_deref() {
            match crate::secret::resolve(raw) {
                Ok(password) => account.password = Some(password),
                Err(e) => warn!(source = %self.source, error = %e, "Failed to resolve password"),
            }
        }

        account
    }
}

impl CliConfig {
    /// Loads configuration from the default path.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> CliResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| CliError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

        if config.connect_timeout_secs == 0 {
            return Err(CliError::ConfigInvalid {
                path: path.to_path_buf(),
                message: "connect_timeout_secs must be at least 1".to_string(),
            });
        }
        Ok(config)
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calendar-events")
            .join("config.toml")
    }

    /// The connect timeout as a duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Resolves every account entry.
    pub fn accounts(&self) -> Vec<Account> {
        self.accounts.iter().map(AccountSettings::to_account).collect()
    }
}
