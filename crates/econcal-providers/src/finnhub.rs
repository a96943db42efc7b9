//! Finnhub economic calendar API.
//!
//! `GET /api/v1/calendar/economic?from=YYYY-MM-DD&to=YYYY-MM-DD&token=...`
//! returns `{"economicCalendar": [{...}, ...]}`; each entry carries
//! `country`, `event`, `impact`, `time` (UTC, `YYYY-MM-DD HH:MM:SS`),
//! `unit`, `estimate`, `actual` and `prev`.

use econcal_core::SourceKind;
use serde_json::Value;
use tracing::debug;

use crate::error::{SourceError, SourceResult};
use crate::http::{HttpSourceConfig, SourceHttpClient};
use crate::raw_record::RawRecord;
use crate::source::{BoxFuture, FetchWindow, SourceAdapter};

/// Default Finnhub endpoint.
pub const DEFAULT_URL: &str = "https://finnhub.io/api/v1/calendar/economic";

/// Keys combined into a record identifier.
const ID_KEYS: &[&str] = &["event", "time"];

/// Source adapter for the Finnhub economic calendar.
#[derive(Debug)]
pub struct FinnhubSource {
    client: SourceHttpClient,
    config: HttpSourceConfig,
}

impl FinnhubSource {
    /// Creates a Finnhub source. The API key is mandatory.
    pub fn new(config: HttpSourceConfig) -> SourceResult<Self> {
        if config.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(SourceError::configuration("Finnhub requires an API key")
                .with_source_kind(SourceKind::Finnhub));
        }
        let client = SourceHttpClient::new(SourceKind::Finnhub, &config)?;
        Ok(Self { client, config })
    }

    fn request_url(&self, window: FetchWindow) -> url::Url {
        let (from, to) = window.query_dates();
        let mut url = self.config.url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("from", &from).append_pair("to", &to);
            if let Some(ref token) = self.config.api_key {
                query.append_pair("token", token);
            }
        }
        url
    }
}

impl SourceAdapter for FinnhubSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Finnhub
    }

    fn fetch(&self, window: FetchWindow) -> BoxFuture<'_, SourceResult<Vec<RawRecord>>> {
        Box::pin(async move {
            let body = self.client.get_text(self.request_url(window)).await?;
            let records = parse_calendar(&body)?;
            debug!(count = records.len(), "Fetched Finnhub calendar");
            Ok(records)
        })
    }
}

/// Parses a Finnhub `calendar/economic` response body.
///
/// Non-object entries are skipped. A body without an `economicCalendar`
/// array is an [`InvalidResponse`](crate::SourceErrorCode::InvalidResponse).
pub fn parse_calendar(body: &str) -> SourceResult<Vec<RawRecord>> {
    let root: Value = serde_json::from_str(body).map_err(|e| {
        SourceError::invalid_response(format!("Malformed Finnhub JSON: {}", e))
            .with_source_kind(SourceKind::Finnhub)
            .with_source(e)
    })?;

    let entries = match root.get("economicCalendar") {
        Some(Value::Array(entries)) => entries,
        // Finnhub answers an empty range with null.
        Some(Value::Null) => return Ok(Vec::new()),
        _ => {
            return Err(SourceError::invalid_response(
                "Finnhub response has no economicCalendar array",
            )
            .with_source_kind(SourceKind::Finnhub));
        }
    };

    Ok(entries
        .iter()
        .filter_map(|entry| match entry {
            Value::Object(map) => Some(RawRecord::from_object(
                SourceKind::Finnhub,
                map.clone(),
                ID_KEYS,
            )),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceErrorCode;
    use chrono::NaiveDate;

    const SAMPLE: &str = r#"{
        "economicCalendar": [
            {"actual": null, "country": "US", "estimate": 3.2, "event": "CPI YoY",
             "impact": "high", "prev": 3.1, "time": "2024-01-11 13:30:00", "unit": "%"},
            {"actual": 0.1, "country": "JP", "estimate": null, "event": "Machine Orders",
             "impact": "low", "prev": -0.7, "time": "2024-01-11 23:50:00", "unit": "%"},
            "garbage"
        ]
    }"#;

    #[test]
    fn parses_entries() {
        let records = parse_calendar(SAMPLE).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "CPI YoY@2024-01-11 13:30:00");
        assert_eq!(records[0].source, SourceKind::Finnhub);
        assert_eq!(records[0].text("estimate"), Some("3.2".to_string()));
        assert_eq!(records[1].text("impact"), Some("low".to_string()));
    }

    #[test]
    fn null_calendar_is_empty() {
        assert!(parse_calendar(r#"{"economicCalendar": null}"#).unwrap().is_empty());
    }

    #[test]
    fn missing_calendar_is_invalid() {
        let err = parse_calendar(r#"{"error": "You don't have access"}"#).unwrap_err();
        assert_eq!(err.code(), SourceErrorCode::InvalidResponse);

        let err = parse_calendar("<html>").unwrap_err();
        assert_eq!(err.code(), SourceErrorCode::InvalidResponse);
    }

    #[test]
    fn requires_api_key() {
        let config = HttpSourceConfig::new(DEFAULT_URL).unwrap();
        let err = FinnhubSource::new(config).unwrap_err();
        assert_eq!(err.code(), SourceErrorCode::ConfigurationError);
    }

    #[test]
    fn builds_query() {
        let config = HttpSourceConfig::new(DEFAULT_URL)
            .unwrap()
            .with_api_key("abc");
        let source = FinnhubSource::new(config).unwrap();
        let window = FetchWindow::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
        );
        assert_eq!(
            source.request_url(window).as_str(),
            "https://finnhub.io/api/v1/calendar/economic?from=2024-01-01&to=2024-01-16&token=abc"
        );
    }
}
