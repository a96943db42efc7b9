//! Shared HTTP plumbing for the network-backed sources.

use std::time::Duration;

use econcal_core::SourceKind;
use reqwest::{Client, Response, StatusCode};
use tracing::{trace, warn};
use url::Url;

use crate::error::{SourceError, SourceResult};

/// Connection settings for one HTTP source.
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    /// Endpoint; the adapter appends its own query parameters.
    pub url: Url,

    /// API key or token, when the provider needs one.
    pub api_key: Option<String>,

    /// Per-request timeout.
    pub timeout: Duration,

    pub user_agent: String,
}

impl HttpSourceConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

    /// Creates a configuration for the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(url: impl AsRef<str>) -> Result<Self, url::ParseError> {
        Ok(Self {
            url: Url::parse(url.as_ref())?,
            api_key: None,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("econcal/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Thin wrapper around [`reqwest::Client`] that maps statuses to [`SourceError`]s.
#[derive(Debug, Clone)]
pub struct SourceHttpClient {
    client: Client,
    kind: SourceKind,
}

impl SourceHttpClient {
    pub fn new(kind: SourceKind, config: &HttpSourceConfig) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                SourceError::configuration(format!("Failed to create HTTP client: {}", e))
                    .with_source_kind(kind)
            })?;

        Ok(Self { client, kind })
    }

    /// Performs a GET and returns the body on success.
    pub async fn get_text(&self, url: Url) -> SourceResult<String> {
        trace!(source = %self.kind, url = %redacted(&url), "Sending request");

        let response = self.client.get(url).send().await.map_err(|e| {
            let error = if e.is_timeout() {
                SourceError::timeout(format!("Request timed out: {}", e))
            } else {
                SourceError::network(format!("Request failed: {}", e))
            };
            error.with_source_kind(self.kind).with_source(e)
        })?;

        self.handle_response(response)
            .await
            .map_err(|e| e.with_source_kind(self.kind))
    }

    async fn handle_response(&self, response: Response) -> SourceResult<String> {
        let status = response.status();
        trace!(status = %status, "Received response");

        match status {
            s if s.is_success() => response
                .text()
                .await
                .map_err(|e| SourceError::network(format!("Failed to read response: {}", e))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SourceError::unauthorized(
                format!("Access denied ({}): check the API key", status),
            )),
            StatusCode::NOT_FOUND => Err(SourceError::not_found("Calendar endpoint not found")),
            StatusCode::TOO_MANY_REQUESTS => {
                Err(SourceError::rate_limited("Too many requests to provider"))
            }
            s if s.is_server_error() => {
                let body = response.text().await.unwrap_or_default();
                Err(SourceError::server(format!("Server error ({}): {}", s, body)))
            }
            s => {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %s, body = %body, "Unexpected response status");
                Err(SourceError::invalid_response(format!(
                    "Unexpected status {}: {}",
                    s, body
                )))
            }
        }
    }
}

/// Returns the URL with credential-looking query values masked, for logs.
pub(crate) fn redacted(url: &Url) -> String {
    let mut masked = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if matches!(k.as_ref(), "token" | "apikey" | "api_key" | "key") {
                "***".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();
    if pairs.is_empty() {
        return masked.to_string();
    }
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = HttpSourceConfig::new("https://finnhub.io/api/v1/calendar/economic").unwrap();
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert!(config.api_key.is_none());
        assert!(config.user_agent.starts_with("econcal/"));
    }

    #[test]
    fn invalid_url_is_rejected() {
        assert!(HttpSourceConfig::new("not a url").is_err());
    }

    #[test]
    fn client_creation() {
        let config = HttpSourceConfig::new("https://example.com/")
            .unwrap()
            .with_api_key("secret")
            .with_timeout(Duration::from_secs(5));
        assert!(SourceHttpClient::new(SourceKind::Finnhub, &config).is_ok());
    }

    #[test]
    fn redacts_tokens_in_logs() {
        let url = Url::parse("https://finnhub.io/api?from=2024-01-01&token=abc123").unwrap();
        assert_eq!(
            redacted(&url),
            "https://finnhub.io/api?from=2024-01-01&token=***"
        );

        let plain = Url::parse("https://example.com/feed.json").unwrap();
        assert_eq!(redacted(&plain), "https://example.com/feed.json");
    }
}
