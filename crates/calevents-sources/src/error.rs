//! Error types for calendar source operations.
//!
//! Every failure that can happen while discovering, connecting to, or
//! querying one calendar source is a [`SourceError`]. None of them abort a
//! run: the collector logs the error and moves on to the next source.

use std::fmt;
use thiserror::Error;

/// The category of a source error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceErrorCode {
    /// The registry could not be read.
    Registry,
    /// The source names a backend this tool cannot talk to.
    UnsupportedBackend,
    /// Connection failed - DNS, refused, TLS, unreadable file.
    Connection,
    /// The connect step exceeded its timeout.
    Timeout,
    /// Authentication failed or credentials are missing.
    Authentication,
    /// Authorization failed - user lacks permission.
    Authorization,
    /// Calendar or resource not found.
    NotFound,
    /// Server returned an error (5xx status codes).
    ServerError,
    /// Invalid response from the backend - unexpected status or format.
    InvalidResponse,
    /// Calendar data could not be parsed.
    Parse,
    /// The source definition is incomplete or inconsistent.
    Configuration,
    /// Unexpected internal state.
    Internal,
}

impl SourceErrorCode {
    /// Returns a stable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registry => "registry",
            Self::UnsupportedBackend => "unsupported_backend",
            Self::Connection => "connection",
            Self::Timeout => "timeout",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::NotFound => "not_found",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::Parse => "parse",
            Self::Configuration => "configuration",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for SourceErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while working with one calendar source.
#[derive(Debug, Error)]
pub struct SourceError {
    /// The error code categorizing this error.
    code: SourceErrorCode,
    /// A human-readable message describing the error.
    message: String,
    /// UID of the source that generated this error.
    source_uid: Option<String>,
    /// The underlying cause of this error, if any.
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SourceError {
    /// Creates a new source error with the given code and message.
    pub fn new(code: SourceErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source_uid: None,
            cause: None,
        }
    }

    /// Creates a registry error.
    pub fn registry(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::Registry, message)
    }

    /// Creates an unsupported backend error.
    pub fn unsupported_backend(backend: &str) -> Self {
        Self::new(
            SourceErrorCode::UnsupportedBackend,
            format!("backend `{}` is not supported", backend),
        )
    }

    /// Creates a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::Connection, message)
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::Timeout, message)
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::Authentication, message)
    }

    /// Creates an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::Authorization, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::NotFound, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::ServerError, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::InvalidResponse, message)
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::Parse, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::Configuration, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::Internal, message)
    }

    /// Sets the source UID for this error.
    pub fn with_source_uid(mut self, uid: impl Into<String>) -> Self {
        self.source_uid = Some(uid.into());
        self
    }

    /// Sets the underlying cause of this error.
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> SourceErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the source UID, if set.
    pub fn source_uid(&self) -> Option<&str> {
        self.source_uid.as_deref()
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref uid) = self.source_uid {
            write!(f, "[{}] ", uid)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;
