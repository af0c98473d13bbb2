//! Backend clients and the connector that opens them.
//!
//! A [`Connector`] turns a registry [`Source`] into a connected
//! [`CalendarClient`]. [`BackendConnector`] is the real one: it dispatches on
//! the source's `BackendName` and bounds the connect step with a timeout.
//! Opening an HTTP backend does no network I/O, so for those the same limit
//! is handed to the transport as its TCP/TLS connect timeout.
//! Tests substitute their own connectors with in-memory clients.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use tracing::debug;

use crate::component::RawObject;
use crate::error::{SourceError, SourceResult};
use crate::local::LocalBackend;
use crate::query::TimeRangeQuery;
use crate::registry::default_calendar_data_dir;
use crate::source::Source;

/// Name of the on-disk file holding a local calendar.
pub const LOCAL_CALENDAR_FILE: &str = "calendar.ics";

/// UID of the built-in Personal calendar.
pub const SYSTEM_CALENDAR_UID: &str = "system-calendar";

/// Directory the file backend keeps the built-in calendar in.
const SYSTEM_CALENDAR_DIR: &str = "system";

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// A boxed future for async trait methods.
///
/// Boxed futures keep the traits object-safe so the collector can work with
/// `dyn Connector` and `Box<dyn CalendarClient>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A connected calendar.
pub trait CalendarClient: Send + Sync {
    /// The backend name (`local`, `caldav`, ...).
    fn name(&self) -> &str;

    /// Returns the objects matching a time-range query.
    ///
    /// An empty list means no events, not an error.
    fn get_object_list<'a>(
        &'a self,
        query: &'a TimeRangeQuery,
    ) -> BoxFuture<'a, SourceResult<Vec<RawObject>>>;
}

/// Opens clients for registry sources.
pub trait Connector: Send + Sync {
    /// Connects to the calendar behind `source`.
    fn connect<'a>(
        &'a self,
        source: &'a Source,
    ) -> BoxFuture<'a, SourceResult<Box<dyn CalendarClient>>>;
}

/// Connection settings for one remote source, overriding the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    /// UID of the source this account applies to.
    pub source: String,
    /// Collection URL; replaces the one assembled from the registry.
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Whether TLS certificates are verified.
    pub verify_tls: bool,
}

impl Account {
    /// Creates an account entry for a source UID.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            verify_tls: true,
            ..Self::default()
        }
    }

    /// Sets the collection URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Disables TLS verification.
    pub fn with_insecure_tls(mut self) -> Self {
        self.verify_tls = false;
        self
    }
}

/// The production connector.
#[derive(Debug, Clone)]
pub struct BackendConnector {
    data_dir: Option<PathBuf>,
    accounts: Vec<Account>,
    connect_timeout: Duration,
}

impl Default for BackendConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendConnector {
    /// Creates a connector using the per-user data directory and the
    /// default timeout.
    pub fn new() -> Self {
        Self {
            data_dir: default_calendar_data_dir(),
            accounts: Vec::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Sets the directory holding local calendars.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Sets the per-source account overrides.
    pub fn with_accounts(mut self, accounts: Vec<Account>) -> Self {
        self.accounts = accounts;
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// The connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the account configured for a source, if any.
    pub fn account(&self, uid: &str) -> Option<&Account> {
        self.accounts.iter().find(|account| account.source == uid)
    }

    fn local_calendar_path(&self, source: &Source) -> SourceResult<PathBuf> {
        let dir = self
            .data_dir
            .as_ref()
            .ok_or_else(|| SourceError::configuration("no calendar data directory available"))?;
        let subdir = match source.uid() {
            SYSTEM_CALENDAR_UID => SYSTEM_CALENDAR_DIR,
            uid => uid,
        };
        Ok(dir.join(subdir).join(LOCAL_CALENDAR_FILE))
    }

    async fn open(&self, source: &Source) -> SourceResult<Box<dyn CalendarClient>> {
        let backend = source
            .backend_name()
            .ok_or_else(|| SourceError::configuration("source has no calendar backend"))?;
        debug!(uid = %source.uid(), backend, "Opening backend");

        match backend {
            "local" => {
                let path = self.local_calendar_path(source)?;
                Ok(Box::new(LocalBackend::new(path)))
            }
            #[cfg(feature = "dav")]
            "caldav" => {
                let config = self.dav_config(source, false)?;
                Ok(Box::new(crate::dav::CalDavBackend::new(config)?))
            }
            #[cfg(feature = "dav")]
            "webcal" => {
                let config = self.dav_config(source, true)?;
                Ok(Box::new(crate::dav::WebcalBackend::new(config)?))
            }
            other => Err(SourceError::unsupported_backend(other)),
        }
    }

    #[cfg(feature = "dav")]
    fn dav_config(&self, source: &Source, webcal: bool) -> SourceResult<crate::dav::DavConfig> {
        let location = source.remote_location();
        let account = self.account(source.uid());

        let url = account
            .and_then(|a| a.url.clone())
            .or_else(|| location.url())
            .ok_or_else(|| SourceError::configuration("source has no host or URL"))?;
        let url = if webcal {
            crate::dav::webcal_to_https(&url)
        } else {
            url
        };

        let mut config = crate::dav::DavConfig::new(&url)
            .map_err(|e| {
                SourceError::configuration(format!("invalid URL `{}`", url)).with_cause(e)
            })?
            .with_connect_timeout(self.connect_timeout);

        let username = account
            .and_then(|a| a.username.clone())
            .or(location.user);
        if let Some(username) = username {
            config = config.with_username(username);
        }
        if let Some(password) = account.and_then(|a| a.password.clone()) {
            config = config.with_password(password);
        }
        if account.is_some_and(|a| !a.verify_tls) {
            config = config.with_insecure_tls();
        }

        Ok(config)
    }
}

impl Connector for BackendConnector {
    fn connect<'a>(
        &'a self,
        source: &'a Source,
    ) -> BoxFuture<'a, SourceResult<Box<dyn CalendarClient>>> {
        Box::pin(async move {
            let result = tokio::time::timeout(self.connect_timeout, self.open(source))
                .await
                .map_err(|_| {
                    SourceError::timeout(format!(
                        "connect did not finish within {}s",
                        self.connect_timeout.as_secs()
                    ))
                })
                .and_then(|opened| opened);
            result.map_err(|e| e.with_source_uid(source.uid()))
        })
    }
}
