//! Canonical economic calendar event.
//!
//! Every source record is normalized into a [`CalendarEvent`]. The derived
//! [`CalendarEvent::display_name`] is the identity key used when matching
//! against events that already exist in the store, so it must be computed
//! the same way for every source.

use std::borrow::Cow;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::impact::ImpactTier;

/// Maximum length of a scheduled event name in the store.
pub const MAX_DISPLAY_NAME_LEN: usize = 100;

/// Maximum length of a scheduled event description in the store.
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// Country label used when the source does not provide one.
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Default external location label.
pub const DEFAULT_LOCATION: &str = "Global Market";

/// Placeholder for absent optional values.
pub const NOT_AVAILABLE: &str = "N/A";

/// Duration assumed when a store requires an end time and the source gave none.
pub fn default_event_duration() -> Duration {
    Duration::hours(1)
}

/// A normalized economic announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEvent {
    /// Region or currency label ("US", "EUR", ...).
    pub country: String,
    /// Event name as published by the source.
    pub title: String,
    /// `"{country} - {title}"`, truncated to [`MAX_DISPLAY_NAME_LEN`].
    display_name: String,
    /// Start instant in UTC.
    pub start_time: DateTime<Utc>,
    /// End instant in UTC, when the source provides one.
    pub end_time: Option<DateTime<Utc>>,
    /// Classified importance.
    pub impact: ImpactTier,
    /// Raw impact value as the source sent it.
    pub impact_label: String,
    /// Currency or unit of the figures.
    pub unit: Option<String>,
    /// Consensus estimate.
    pub estimate: Option<String>,
    /// Published figure.
    pub actual: Option<String>,
    /// Previous period's figure.
    pub previous: Option<String>,
    /// External location label shown by the store.
    pub location: String,
    /// Identifier of the raw record this event came from.
    pub source_id: Option<String>,
}

impl CalendarEvent {
    /// Creates a new event; the display name is derived immediately.
    pub fn new(
        country: impl Into<String>,
        title: impl Into<String>,
        start_time: DateTime<Utc>,
    ) -> Self {
        let country = country.into();
        let title = title.into();
        let display_name = display_name(&country, &title);
        Self {
            country,
            title,
            display_name,
            start_time,
            end_time: None,
            impact: ImpactTier::Unknown,
            impact_label: String::new(),
            unit: None,
            estimate: None,
            actual: None,
            previous: None,
            location: DEFAULT_LOCATION.to_string(),
            source_id: None,
        }
    }

    /// The identity key used for matching against the store.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn with_impact(mut self, impact: ImpactTier, label: impl Into<String>) -> Self {
        self.impact = impact;
        self.impact_label = label.into();
        self
    }

    pub fn with_end_time(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_estimate(mut self, estimate: impl Into<String>) -> Self {
        self.estimate = Some(estimate.into());
        self
    }

    pub fn with_actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }

    pub fn with_previous(mut self, previous: impl Into<String>) -> Self {
        self.previous = Some(previous.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_source_id(mut self, id: impl Into<String>) -> Self {
        self.source_id = Some(id.into());
        self
    }

    /// End time, falling back to start + [`default_event_duration`].
    pub fn effective_end_time(&self) -> DateTime<Utc> {
        self.end_time
            .unwrap_or(self.start_time + default_event_duration())
    }

    /// Renders the store description, truncated to [`MAX_DESCRIPTION_LEN`].
    pub fn description(&self) -> String {
        let text = format!(
            "Currency: {}\nImpact: {}\nEstimate: {}\nActual: {}\nPrevious: {}",
            or_na(&self.unit),
            if self.impact_label.is_empty() {
                self.impact.as_str()
            } else {
                self.impact_label.as_str()
            },
            or_na(&self.estimate),
            or_na(&self.actual),
            or_na(&self.previous),
        );
        ellipsis(&text, MAX_DESCRIPTION_LEN).into_owned()
    }
}

fn or_na(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(NOT_AVAILABLE)
}

/// Builds the display name for a country/title pair.
///
/// When `"{country} - {title}"` exceeds [`MAX_DISPLAY_NAME_LEN`] characters
/// the first 97 are kept and `...` is appended.
pub fn display_name(country: &str, title: &str) -> String {
    let full = format!("{} - {}", country, title);
    ellipsis(&full, MAX_DISPLAY_NAME_LEN).into_owned()
}

/// Truncates `s` to `max_len` characters, marking the cut with `...`.
pub fn ellipsis(s: &str, max_len: usize) -> Cow<'_, str> {
    if max_len == 0 {
        return Cow::Borrowed("");
    }

    if s.chars().count() <= max_len {
        return Cow::Borrowed(s);
    }

    let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
    Cow::Owned(format!("{}...", truncated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 13, 30, 0).unwrap()
    }

    #[test]
    fn display_name_joins_country_and_title() {
        let event = CalendarEvent::new("US", "CPI", sample_start());
        assert_eq!(event.display_name(), "US - CPI");
    }

    #[test]
    fn long_display_name_is_truncated() {
        let country = "United States of America Extended Region Name";
        let title = "Consumer Price Index Core Release Announcement, Seasonally Adjusted";
        let full = format!("{} - {}", country, title);
        let name = display_name(country, title);

        assert!(full.chars().count() > MAX_DISPLAY_NAME_LEN);
        assert_eq!(name.chars().count(), MAX_DISPLAY_NAME_LEN);
        assert!(name.ends_with("..."));
        let prefix: String = full.chars().take(97).collect();
        assert!(name.starts_with(&prefix));
    }

    #[test]
    fn ninety_four_character_name_is_not_cut() {
        let country = "United States of America Extended Region Name";
        let title = "Consumer Price Index Core Release Announcement";
        let name = display_name(country, title);

        assert_eq!(name.chars().count(), 94);
        assert_eq!(name, format!("{} - {}", country, title));
    }

    #[test]
    fn display_name_at_exact_limit_is_kept() {
        let title = "x".repeat(MAX_DISPLAY_NAME_LEN - "US - ".len());
        let name = display_name("US", &title);
        assert_eq!(name.chars().count(), MAX_DISPLAY_NAME_LEN);
        assert!(!name.ends_with("..."));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let title = "é".repeat(120);
        let name = display_name("EU", &title);
        assert_eq!(name.chars().count(), MAX_DISPLAY_NAME_LEN);
    }

    #[test]
    fn display_name_preserves_casing() {
        let event = CalendarEvent::new("eur", "German ZEW Economic Sentiment", sample_start());
        assert_eq!(event.display_name(), "eur - German ZEW Economic Sentiment");
    }

    #[test]
    fn effective_end_time_defaults_to_one_hour() {
        let event = CalendarEvent::new("US", "CPI", sample_start());
        assert_eq!(
            event.effective_end_time(),
            sample_start() + Duration::hours(1)
        );

        let explicit = sample_start() + Duration::minutes(15);
        let event = event.with_end_time(explicit);
        assert_eq!(event.effective_end_time(), explicit);
    }

    #[test]
    fn description_renders_missing_values_as_na() {
        let event = CalendarEvent::new("US", "CPI y/y", sample_start())
            .with_impact(ImpactTier::High, "high")
            .with_unit("USD")
            .with_estimate("3.2%")
            .with_previous("3.1%");

        insta::assert_snapshot!(event.description(), @r"
        Currency: USD
        Impact: high
        Estimate: 3.2%
        Actual: N/A
        Previous: 3.1%
        ");
    }

    #[test]
    fn description_falls_back_to_tier_name() {
        let event = CalendarEvent::new("US", "CPI", sample_start()).with_impact(ImpactTier::Medium, "");
        assert!(event.description().contains("Impact: medium"));
    }

    #[test]
    fn description_is_truncated() {
        let event = CalendarEvent::new("US", "CPI", sample_start()).with_estimate("9".repeat(2000));
        let description = event.description();
        assert_eq!(description.chars().count(), MAX_DESCRIPTION_LEN);
        assert!(description.ends_with("..."));
    }

    #[test]
    fn serialized_event_carries_derived_name() {
        let event = CalendarEvent::new("US", "CPI", sample_start());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["display_name"], "US - CPI");
        assert_eq!(json["country"], "US");
    }

    #[test]
    fn ellipsis_edge_cases() {
        assert_eq!(ellipsis("hello", 0), "");
        assert_eq!(ellipsis("hello", 5), "hello");
        assert_eq!(ellipsis("hello world", 8), "hello...");
    }
}
