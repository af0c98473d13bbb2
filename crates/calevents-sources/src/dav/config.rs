//! Connection settings for HTTP-based backends.

use std::time::Duration;
use url::Url;

/// Configuration shared by the CalDAV and webcal backends.
#[derive(Debug, Clone)]
pub struct DavConfig {
    /// Collection (CalDAV) or feed (webcal) URL.
    pub url: Url,

    /// Username for authentication.
    pub username: Option<String>,

    /// Password for authentication.
    pub password: Option<String>,

    /// Whether to verify TLS certificates.
    pub verify_tls: bool,

    /// Bound on establishing the TCP/TLS connection. Requests themselves
    /// are not time-limited.
    pub connect_timeout: Duration,

    /// User agent string.
    pub user_agent: String,
}

impl DavConfig {
    /// Default connect timeout in seconds.
    pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

    /// Creates a configuration for the given URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(url: impl AsRef<str>) -> Result<Self, url::ParseError> {
        let parsed = Url::parse(url.as_ref())?;
        Ok(Self {
            url: parsed,
            username: None,
            password: None,
            verify_tls: true,
            connect_timeout: Duration::from_secs(Self::DEFAULT_CONNECT_TIMEOUT_SECS),
            user_agent: format!("calendar-events/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Sets the username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Disables TLS verification.
    pub fn with_insecure_tls(mut self) -> Self {
        self.verify_tls = false;
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Returns the URL as a string.
    pub fn url_str(&self) -> &str {
        self.url.as_str()
    }

    /// Returns true if both username and password are set.
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

/// Rewrites `webcal://` and `webcals://` URLs to `https://`.
pub fn webcal_to_https(url: &str) -> String {
    for scheme in ["webcals://", "webcal://"] {
        if let Some(rest) = url.strip_prefix(scheme) {
            return format!("https://{}", rest);
        }
    }
    url.to_string()
}
