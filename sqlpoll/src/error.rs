//! Error types and result definitions for polling operations.
//!
//! Provides a kind-classified error type with captured diagnostic metadata.
//! The kind drives the retry policy: only failures classified as transient by
//! [`ErrorKind::retryable`] are retried by the query executor, everything else
//! propagates to the caller unmodified.

use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use sqlpoll_config::shared::ValidationError;

/// Convenient result type for polling operations using [`PollError`] as the error type.
pub type PollResult<T> = Result<T, PollError>;

/// Specific categories of errors that can occur while polling a source.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Required configuration is missing or malformed. Fatal at construction.
    ConfigError,
    /// A query was attempted with no live connection outside simulation mode.
    NotConnected,
    /// Connection-level failure talking to the source. Retried with backoff.
    SourceConnectionFailed,
    /// The source rejected or failed the query itself. Never retried.
    SourceQueryFailed,
    /// A raw value could not be converted into the row model.
    ConversionError,
    /// A row is structurally valid but missing or mistyping an expected column.
    InvalidData,
    /// The emission sink failed to accept a record.
    SinkError,
    /// Uncategorized failure, e.g. a panicked worker task.
    Unknown,
}

impl ErrorKind {
    /// Returns whether a failure of this kind is transient and worth retrying.
    pub fn retryable(&self) -> bool {
        matches!(self, ErrorKind::SourceConnectionFailed)
    }

    fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConfigError => "config error",
            ErrorKind::NotConnected => "not connected",
            ErrorKind::SourceConnectionFailed => "source connection failed",
            ErrorKind::SourceQueryFailed => "source query failed",
            ErrorKind::ConversionError => "conversion error",
            ErrorKind::InvalidData => "invalid data",
            ErrorKind::SinkError => "sink error",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for polling operations.
///
/// Carries a classification kind, a static description, optional dynamic
/// detail, an optional source error, and the callsite that created it.
#[derive(Debug, Clone)]
pub struct PollError {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
}

impl PollError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Attaches an originating [`error::Error`] to this error and returns the
    /// modified instance. The stored source is preserved across clones and
    /// exposed via [`error::Error::source`].
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Creates a [`PollError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            kind,
            description,
            detail,
            source,
            location: Location::caller(),
        }
    }
}

impl fmt::Display for PollError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.description)?;
        if let Some(detail) = &self.detail {
            write!(f, " -> {detail}")?;
        }
        Ok(())
    }
}

impl error::Error for PollError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn error::Error + 'static))
    }
}

impl From<(ErrorKind, &'static str)> for PollError {
    #[track_caller]
    fn from((kind, description): (ErrorKind, &'static str)) -> Self {
        Self::from_components(kind, Cow::Borrowed(description), None, None)
    }
}

impl From<(ErrorKind, &'static str, String)> for PollError {
    #[track_caller]
    fn from((kind, description, detail): (ErrorKind, &'static str, String)) -> Self {
        Self::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            None,
        )
    }
}

impl From<ValidationError> for PollError {
    #[track_caller]
    fn from(err: ValidationError) -> Self {
        Self::from_components(
            ErrorKind::ConfigError,
            Cow::Borrowed("invalid configuration"),
            Some(Cow::Owned(err.to_string())),
            Some(Arc::new(err)),
        )
    }
}

impl From<sqlx::Error> for PollError {
    #[track_caller]
    fn from(err: sqlx::Error) -> Self {
        let kind = match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => ErrorKind::SourceConnectionFailed,
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. } => ErrorKind::ConversionError,
            sqlx::Error::Configuration(_) => ErrorKind::ConfigError,
            _ => ErrorKind::SourceQueryFailed,
        };

        Self::from_components(
            kind,
            Cow::Borrowed("sql source operation failed"),
            Some(Cow::Owned(err.to_string())),
            Some(Arc::new(err)),
        )
    }
}
