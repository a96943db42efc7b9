//! Sync and store error types.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use econcal_providers::SourceError;
use thiserror::Error;

/// Result type for a sync cycle.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that abort a sync cycle.
///
/// Per-record and per-create failures never surface here; they are logged
/// and counted in the cycle summary.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The source could not be fetched.
    #[error("source fetch failed: {0}")]
    Fetch(#[from] SourceError),

    /// Existing store state could not be read; no create was attempted.
    #[error("could not read existing events: {0}")]
    ExistingState(#[source] StoreError),

    /// A cycle was triggered while another one was still running, in this
    /// process or in another one holding the guild's lock file.
    #[error("a sync cycle is already running")]
    AlreadyRunning,

    /// The cycle lock file could not be created or reclaimed.
    #[error("cycle lock {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A network step exceeded its deadline.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl SyncError {
    pub fn timeout(operation: &'static str, after: Duration) -> Self {
        Self::Timeout { operation, after }
    }

    pub fn lock(path: &Path, source: io::Error) -> Self {
        Self::Lock {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// The category of a store error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorCode {
    /// Connection failed, DNS, TLS.
    Network,
    Timeout,
    /// HTTP 401/403: bad token or missing permission.
    Unauthorized,
    /// HTTP 404: unknown guild.
    NotFound,
    /// HTTP 429.
    RateLimited,
    /// HTTP 400: the store rejected the payload.
    Validation,
    /// HTTP 5xx.
    Server,
    /// Unexpected status or unparsable body.
    InvalidResponse,
}

impl StoreErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::Validation => "validation",
            Self::Server => "server",
            Self::InvalidResponse => "invalid_response",
        }
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure talking to the scheduled-events store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct StoreError {
    code: StoreErrorCode,
    message: String,
}

impl StoreError {
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::Timeout, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::NotFound, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::RateLimited, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::Validation, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::Server, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::InvalidResponse, message)
    }

    pub fn code(&self) -> StoreErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display() {
        let err = StoreError::validation("name: must be 100 or fewer in length");
        assert_eq!(
            err.to_string(),
            "validation: name: must be 100 or fewer in length"
        );
        assert_eq!(err.code(), StoreErrorCode::Validation);
    }

    #[test]
    fn sync_error_display() {
        let err = SyncError::timeout("source fetch", Duration::from_secs(15));
        assert_eq!(err.to_string(), "source fetch timed out after 15s");

        let err = SyncError::ExistingState(StoreError::unauthorized("401 Unauthorized"));
        assert_eq!(
            err.to_string(),
            "could not read existing events: unauthorized: 401 Unauthorized"
        );
    }

    #[test]
    fn lock_error_names_the_file() {
        let err = SyncError::lock(
            Path::new("/run/econcal-1.lock"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "cycle lock /run/econcal-1.lock: denied");
    }

    #[test]
    fn fetch_error_converts() {
        let err: SyncError = SourceError::server("502").into();
        assert!(matches!(err, SyncError::Fetch(_)));
    }
}
