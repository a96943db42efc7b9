//! Client error types.

use std::fmt;

use econcal_providers::SourceError;
use econcal_sync::{StoreError, SyncError};

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Source could not be built or fetched.
    Source(SourceError),
    /// Store could not be built or reached.
    Store(StoreError),
    /// A sync cycle failed.
    Sync(SyncError),
    /// IO error.
    Io(std::io::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Source(err) => write!(f, "source error: {}", err),
            Self::Store(err) => write!(f, "store error: {}", err),
            Self::Sync(err) => write!(f, "sync failed: {}", err),
            Self::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Source(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Sync(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<SourceError> for ClientError {
    fn from(err: SourceError) -> Self {
        Self::Source(err)
    }
}

impl From<StoreError> for ClientError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<SyncError> for ClientError {
    fn from(err: SyncError) -> Self {
        Self::Sync(err)
    }
}
