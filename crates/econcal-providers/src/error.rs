//! Error types for source fetches.
//!
//! Any [`SourceError`] aborts the current sync cycle; the scheduler retries
//! on its next tick. Record-level problems are [`NormalizationError`]s
//! instead (see [`crate::normalize`]).

use std::fmt;

use econcal_core::SourceKind;
use thiserror::Error;

/// The category of a source error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceErrorCode {
    /// Connection failed, DNS, TLS.
    NetworkError,
    /// The request exceeded its deadline.
    Timeout,
    /// HTTP 401/403: bad or missing API key.
    Unauthorized,
    /// HTTP 429.
    RateLimited,
    /// HTTP 5xx.
    ServerError,
    /// HTTP 404.
    NotFound,
    /// Non-2xx status not covered above, or a payload that does not parse.
    InvalidResponse,
    /// Missing or invalid source configuration.
    ConfigurationError,
}

impl SourceErrorCode {
    /// Returns true if retrying later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::Timeout | Self::RateLimited | Self::ServerError
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkError => "network_error",
            Self::Timeout => "timeout",
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::NotFound => "not_found",
            Self::InvalidResponse => "invalid_response",
            Self::ConfigurationError => "configuration_error",
        }
    }
}

impl fmt::Display for SourceErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure to fetch raw records from a source.
#[derive(Debug, Error)]
pub struct SourceError {
    code: SourceErrorCode,
    message: String,
    source_kind: Option<SourceKind>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SourceError {
    pub fn new(code: SourceErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source_kind: None,
            source: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::NetworkError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::Timeout, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::Unauthorized, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::RateLimited, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::ServerError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::NotFound, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::InvalidResponse, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::ConfigurationError, message)
    }

    /// Tags the error with the source that produced it.
    pub fn with_source_kind(mut self, kind: SourceKind) -> Self {
        self.source_kind = Some(kind);
        self
    }

    /// Attaches the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> SourceErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_kind(&self) -> Option<SourceKind> {
        self.source_kind
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(kind) = self.source_kind {
            write!(f, "[{}] ", kind)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_codes() {
        assert!(SourceErrorCode::NetworkError.is_retryable());
        assert!(SourceErrorCode::Timeout.is_retryable());
        assert!(SourceErrorCode::RateLimited.is_retryable());
        assert!(SourceErrorCode::ServerError.is_retryable());
        assert!(!SourceErrorCode::Unauthorized.is_retryable());
        assert!(!SourceErrorCode::InvalidResponse.is_retryable());
    }

    #[test]
    fn display_includes_source_kind() {
        let err = SourceError::rate_limited("slow down").with_source_kind(SourceKind::Finnhub);
        assert_eq!(err.to_string(), "[finnhub] rate_limited: slow down");
        assert_eq!(err.source_kind(), Some(SourceKind::Finnhub));
    }

    #[test]
    fn keeps_underlying_cause() {
        use std::error::Error;
        let cause = std::io::Error::other("reset by peer");
        let err = SourceError::network("fetch failed").with_source(cause);
        assert!(err.source().is_some());
        assert_eq!(err.code(), SourceErrorCode::NetworkError);
    }
}
