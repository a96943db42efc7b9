//! Source kinds.
//!
//! Every upstream calendar is one of a fixed set of shapes. The kind is the
//! key for both the normalizer field table and the impact lookup table, so
//! adding a provider means adding one variant and its two tables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The shape of an upstream economic calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Finnhub structured calendar API, queried by date range.
    Finnhub,
    /// HTML table with one `<tr data-*>` row per event.
    ScrapedHtml,
    /// JSON array feed (one object per event).
    JsonFeed,
    /// RSS feed with custom per-item fields.
    Rss,
}

impl SourceKind {
    /// All known source kinds.
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Finnhub,
        SourceKind::ScrapedHtml,
        SourceKind::JsonFeed,
        SourceKind::Rss,
    ];

    /// Returns the configuration name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Finnhub => "finnhub",
            Self::ScrapedHtml => "scraped-html",
            Self::JsonFeed => "json-feed",
            Self::Rss => "rss",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized source kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown source kind `{0}` (expected one of: finnhub, scraped-html, json-feed, rss)")]
pub struct UnknownSourceKind(pub String);

impl FromStr for SourceKind {
    type Err = UnknownSourceKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| UnknownSourceKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_kinds() {
        assert_eq!("finnhub".parse::<SourceKind>(), Ok(SourceKind::Finnhub));
        assert_eq!(
            "Scraped-HTML".parse::<SourceKind>(),
            Ok(SourceKind::ScrapedHtml)
        );
        assert_eq!(" rss ".parse::<SourceKind>(), Ok(SourceKind::Rss));
    }

    #[test]
    fn rejects_unknown_kind() {
        let err = "ical".parse::<SourceKind>().unwrap_err();
        assert!(err.to_string().contains("ical"));
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for kind in SourceKind::ALL {
            assert_eq!(kind.to_string().parse::<SourceKind>(), Ok(kind));
        }
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&SourceKind::JsonFeed).unwrap();
        assert_eq!(json, "\"json-feed\"");
    }
}
