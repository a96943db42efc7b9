//! Weekly JSON calendar feed.
//!
//! The feed is a top-level array of objects with `title`, `country`,
//! `date` (ISO-8601 with offset), `impact`, `forecast` and `previous`.
//! It always covers a fixed week, so the requested window is not sent;
//! out-of-window entries are dropped downstream by the window filter.

use econcal_core::SourceKind;
use serde_json::Value;
use tracing::debug;

use crate::error::{SourceError, SourceResult};
use crate::http::{HttpSourceConfig, SourceHttpClient};
use crate::raw_record::RawRecord;
use crate::source::{BoxFuture, FetchWindow, SourceAdapter};

/// Default feed location.
pub const DEFAULT_URL: &str = "https://nfs.faireconomy.media/ff_calendar_thisweek.json";

const ID_KEYS: &[&str] = &["title", "date"];

/// Source adapter for a JSON calendar feed.
#[derive(Debug)]
pub struct JsonFeedSource {
    client: SourceHttpClient,
    config: HttpSourceConfig,
}

impl JsonFeedSource {
    pub fn new(config: HttpSourceConfig) -> SourceResult<Self> {
        let client = SourceHttpClient::new(SourceKind::JsonFeed, &config)?;
        Ok(Self { client, config })
    }
}

impl SourceAdapter for JsonFeedSource {
    fn kind(&self) -> SourceKind {
        SourceKind::JsonFeed
    }

    fn fetch(&self, _window: FetchWindow) -> BoxFuture<'_, SourceResult<Vec<RawRecord>>> {
        Box::pin(async move {
            let body = self.client.get_text(self.config.url.clone()).await?;
            let records = parse_feed(&body)?;
            debug!(count = records.len(), "Fetched JSON calendar feed");
            Ok(records)
        })
    }
}

/// Parses the feed body. Accepts a bare array or `{"events": [...]}`.
pub fn parse_feed(body: &str) -> SourceResult<Vec<RawRecord>> {
    let root: Value = serde_json::from_str(body).map_err(|e| {
        SourceError::invalid_response(format!("Malformed calendar feed: {}", e))
            .with_source_kind(SourceKind::JsonFeed)
            .with_source(e)
    })?;

    let entries = match root {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("events") {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(SourceError::invalid_response(
                    "Calendar feed object has no events array",
                )
                .with_source_kind(SourceKind::JsonFeed));
            }
        },
        _ => {
            return Err(
                SourceError::invalid_response("Calendar feed is not a JSON array")
                    .with_source_kind(SourceKind::JsonFeed),
            );
        }
    };

    Ok(entries
        .into_iter()
        .filter_map(|entry| match entry {
            Value::Object(map) => Some(RawRecord::from_object(SourceKind::JsonFeed, map, ID_KEYS)),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceErrorCode;

    #[test]
    fn parses_bare_array() {
        let body = r#"[
            {"title": "Non-Farm Employment Change", "country": "USD",
             "date": "2024-01-05T08:30:00-05:00", "impact": "High",
             "forecast": "170K", "previous": "199K"},
            {"title": "Bank Holiday", "country": "JPY",
             "date": "2024-01-08T00:00:00-05:00", "impact": "Holiday",
             "forecast": "", "previous": ""}
        ]"#;

        let records = parse_feed(body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].id,
            "Non-Farm Employment Change@2024-01-05T08:30:00-05:00"
        );
        assert_eq!(records[1].text("forecast"), None);
    }

    #[test]
    fn parses_wrapped_object() {
        let body = r#"{"events": [{"title": "GDP", "date": "2024-01-25T08:30:00-05:00"}]}"#;
        assert_eq!(parse_feed(body).unwrap().len(), 1);
    }

    #[test]
    fn rejects_unexpected_shapes() {
        assert_eq!(
            parse_feed(r#"{"status": "down"}"#).unwrap_err().code(),
            SourceErrorCode::InvalidResponse
        );
        assert_eq!(
            parse_feed("42").unwrap_err().code(),
            SourceErrorCode::InvalidResponse
        );
    }
}
