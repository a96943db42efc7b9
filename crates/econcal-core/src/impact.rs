//! Impact classification.
//!
//! Each source encodes importance differently (words, colours, volatility
//! digits). [`classify`] maps a raw value through a fixed per-source table;
//! [`ImpactTier::is_in_scope`] is the single, source-independent decision
//! about which tiers get synchronized.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::source::SourceKind;

/// Importance tier of an economic release.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactTier {
    High,
    Medium,
    Low,
    /// Unmapped codes and holiday markers.
    #[default]
    Unknown,
}

impl ImpactTier {
    /// Only high and medium impact events are synchronized.
    pub fn is_in_scope(self) -> bool {
        matches!(self, Self::High | Self::Medium)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ImpactTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const FINNHUB_IMPACT: &[(&str, ImpactTier)] = &[
    ("high", ImpactTier::High),
    ("medium", ImpactTier::Medium),
    ("low", ImpactTier::Low),
];

const SCRAPED_HTML_IMPACT: &[(&str, ImpactTier)] = &[
    ("red", ImpactTier::High),
    ("orange", ImpactTier::Medium),
    ("yellow", ImpactTier::Low),
    // holiday rows
    ("gray", ImpactTier::Unknown),
];

const JSON_FEED_IMPACT: &[(&str, ImpactTier)] = &[
    ("high", ImpactTier::High),
    ("medium", ImpactTier::Medium),
    ("low", ImpactTier::Low),
    ("holiday", ImpactTier::Unknown),
];

const RSS_IMPACT: &[(&str, ImpactTier)] = &[
    ("3", ImpactTier::High),
    ("2", ImpactTier::Medium),
    ("1", ImpactTier::Low),
];

fn impact_table(kind: SourceKind) -> &'static [(&'static str, ImpactTier)] {
    match kind {
        SourceKind::Finnhub => FINNHUB_IMPACT,
        SourceKind::ScrapedHtml => SCRAPED_HTML_IMPACT,
        SourceKind::JsonFeed => JSON_FEED_IMPACT,
        SourceKind::Rss => RSS_IMPACT,
    }
}

/// Classifies a raw impact value using the table for `kind`.
///
/// Matching is case-insensitive and ignores surrounding whitespace. Values
/// missing from the table classify as [`ImpactTier::Unknown`].
pub fn classify(raw: &str, kind: SourceKind) -> ImpactTier {
    let needle = raw.trim().to_ascii_lowercase();
    impact_table(kind)
        .iter()
        .find(|(label, _)| *label == needle)
        .map(|(_, tier)| *tier)
        .unwrap_or(ImpactTier::Unknown)
}
