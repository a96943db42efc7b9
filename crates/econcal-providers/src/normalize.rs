//! RawRecord to CalendarEvent conversion.
//!
//! Normalization is table-driven: each [`SourceKind`] has one [`FieldTable`]
//! naming the provider keys that hold the canonical fields, and one impact
//! table in `econcal_core::impact`. Nothing downstream of this module knows
//! which provider a [`CalendarEvent`] came from.
//!
//! Records whose timestamp is missing or does not parse are rejected with a
//! [`NormalizationError`]; they are never defaulted to "now" or the epoch.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use econcal_core::{CalendarEvent, SourceKind, UNKNOWN_COUNTRY, classify};
use thiserror::Error;

use crate::raw_record::RawRecord;

/// Where a source keeps the event start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeField {
    /// One field holding a full timestamp.
    Single(&'static str),
    /// A date field and a time-of-day field, combined and read as UTC.
    DateAndTime {
        date: &'static str,
        time: &'static str,
    },
}

/// Provider keys for the canonical fields of one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldTable {
    pub country: &'static str,
    pub title: &'static str,
    pub impact: &'static str,
    /// Tried in order; the first shape whose fields are all present wins.
    pub time: &'static [TimeField],
    pub estimate: &'static str,
    pub actual: &'static str,
    pub previous: &'static str,
    pub unit: Option<&'static str>,
}

const FINNHUB_FIELDS: FieldTable = FieldTable {
    country: "country",
    title: "event",
    impact: "impact",
    time: &[TimeField::Single("time")],
    estimate: "estimate",
    actual: "actual",
    previous: "prev",
    unit: Some("unit"),
};

const SCRAPED_HTML_FIELDS: FieldTable = FieldTable {
    country: "country",
    title: "title",
    impact: "impact",
    time: &[
        TimeField::DateAndTime {
            date: "date",
            time: "time",
        },
        TimeField::Single("timestamp"),
    ],
    estimate: "forecast",
    actual: "actual",
    previous: "previous",
    unit: Some("currency"),
};

const JSON_FEED_FIELDS: FieldTable = FieldTable {
    country: "country",
    title: "title",
    impact: "impact",
    time: &[TimeField::Single("date")],
    estimate: "forecast",
    actual: "actual",
    previous: "previous",
    unit: None,
};

const RSS_FIELDS: FieldTable = FieldTable {
    country: "country",
    title: "title",
    impact: "volatility",
    time: &[
        TimeField::DateAndTime {
            date: "date",
            time: "time",
        },
        TimeField::Single("pubDate"),
    ],
    estimate: "forecast",
    actual: "actual",
    previous: "previous",
    unit: Some("currency"),
};

/// Returns the field table for a source kind.
pub fn field_table(kind: SourceKind) -> &'static FieldTable {
    match kind {
        SourceKind::Finnhub => &FINNHUB_FIELDS,
        SourceKind::ScrapedHtml => &SCRAPED_HTML_FIELDS,
        SourceKind::JsonFeed => &JSON_FEED_FIELDS,
        SourceKind::Rss => &RSS_FIELDS,
    }
}

/// A record that cannot become a [`CalendarEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    #[error("record `{record_id}` is missing required field `{field}`")]
    MissingField {
        record_id: String,
        field: &'static str,
    },

    #[error("record `{record_id}` has an invalid timestamp `{value}`")]
    InvalidTimestamp { record_id: String, value: String },
}

impl NormalizationError {
    /// The raw identifier of the rejected record.
    pub fn record_id(&self) -> &str {
        match self {
            Self::MissingField { record_id, .. } | Self::InvalidTimestamp { record_id, .. } => {
                record_id
            }
        }
    }
}

/// Converts a raw record into a [`CalendarEvent`] using the table for `kind`.
pub fn normalize(raw: &RawRecord, kind: SourceKind) -> Result<CalendarEvent, NormalizationError> {
    let table = field_table(kind);

    let title = raw
        .text(table.title)
        .ok_or_else(|| NormalizationError::MissingField {
            record_id: raw.id.clone(),
            field: "title",
        })?;
    let country = raw
        .text(table.country)
        .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string());
    let start_time = extract_start_time(raw, table)?;

    let impact_label = raw.text(table.impact).unwrap_or_default();
    let impact = classify(&impact_label, kind);

    let mut event = CalendarEvent::new(country, title, start_time)
        .with_impact(impact, impact_label)
        .with_source_id(&raw.id);

    event.unit = table.unit.and_then(|key| raw.text(key));
    event.estimate = raw.text(table.estimate);
    event.actual = raw.text(table.actual);
    event.previous = raw.text(table.previous);

    Ok(event)
}

/// Normalizes a record with the table of the source it came from.
pub fn normalize_record(raw: &RawRecord) -> Result<CalendarEvent, NormalizationError> {
    normalize(raw, raw.source)
}

fn extract_start_time(
    raw: &RawRecord,
    table: &FieldTable,
) -> Result<DateTime<Utc>, NormalizationError> {
    for shape in table.time {
        let (value, parsed) = match *shape {
            TimeField::Single(key) => {
                let Some(value) = raw.text(key) else {
                    continue;
                };
                let parsed = parse_timestamp(&value);
                (value, parsed)
            }
            TimeField::DateAndTime { date, time } => {
                let (Some(date), Some(time)) = (raw.text(date), raw.text(time)) else {
                    continue;
                };
                let parsed = parse_date_and_time(&date, &time);
                (format!("{} {}", date, time), parsed)
            }
        };

        return parsed.ok_or_else(|| NormalizationError::InvalidTimestamp {
            record_id: raw.id.clone(),
            value,
        });
    }

    Err(NormalizationError::MissingField {
        record_id: raw.id.clone(),
        field: "time",
    })
}

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M%:z", "%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M%:z"];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%I:%M%p", "%I:%M %p"];

/// Parses a full timestamp into UTC.
///
/// Accepts RFC 3339 / ISO-8601 with an offset, RFC 2822, and offset-less
/// ISO-8601 or `YYYY-MM-DD HH:MM[:SS]`, which is read as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

/// Combines separate date and time-of-day strings into a UTC instant.
///
/// Time accepts `13:30`, `13:30:00`, `1:30pm` and `1:30 PM`. Placeholders
/// such as `All Day` or `Tentative` do not parse.
pub fn parse_date_and_time(date: &str, time: &str) -> Option<DateTime<Utc>> {
    let date = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date.trim(), format).ok())?;
    let time = time.trim().to_ascii_uppercase();
    let time = TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(&time, format).ok())?;
    Some(date.and_time(time).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use econcal_core::ImpactTier;
    use serde_json::json;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn finnhub_record() -> RawRecord {
        RawRecord::new(SourceKind::Finnhub, "CPI@2024-01-10 13:30:00")
            .with_field("country", "US")
            .with_field("event", "CPI")
            .with_field("impact", "high")
            .with_field("time", "2024-01-10 13:30:00")
            .with_field("estimate", json!(3.2))
            .with_field("actual", json!(null))
            .with_field("prev", json!(3.1))
            .with_field("unit", "%")
    }

    mod timestamps {
        use super::*;

        #[test]
        fn naive_is_read_as_utc() {
            assert_eq!(
                parse_timestamp("2024-01-10 13:30:00"),
                Some(utc(2024, 1, 10, 13, 30, 0))
            );
            assert_eq!(
                parse_timestamp("2024-01-10T13:30"),
                Some(utc(2024, 1, 10, 13, 30, 0))
            );
        }

        #[test]
        fn offsets_are_converted_to_utc() {
            assert_eq!(
                parse_timestamp("2024-01-10T08:30:00-05:00"),
                Some(utc(2024, 1, 10, 13, 30, 0))
            );
            assert_eq!(
                parse_timestamp("2024-01-10T14:30+01:00"),
                Some(utc(2024, 1, 10, 13, 30, 0))
            );
            assert_eq!(
                parse_timestamp("2024-01-10T13:30:00Z"),
                Some(utc(2024, 1, 10, 13, 30, 0))
            );
        }

        #[test]
        fn rfc2822_is_accepted() {
            assert_eq!(
                parse_timestamp("Wed, 10 Jan 2024 13:30:00 +0000"),
                Some(utc(2024, 1, 10, 13, 30, 0))
            );
        }

        #[test]
        fn garbage_is_rejected() {
            assert_eq!(parse_timestamp("tomorrow"), None);
            assert_eq!(parse_timestamp("2024-13-45 25:00:00"), None);
            assert_eq!(parse_timestamp(""), None);
        }

        #[test]
        fn combined_date_and_time() {
            assert_eq!(
                parse_date_and_time("2024-01-10", "13:30"),
                Some(utc(2024, 1, 10, 13, 30, 0))
            );
            assert_eq!(
                parse_date_and_time("2024-01-10", "1:30pm"),
                Some(utc(2024, 1, 10, 13, 30, 0))
            );
            assert_eq!(
                parse_date_and_time("2024/01/10", "8:30 AM"),
                Some(utc(2024, 1, 10, 8, 30, 0))
            );
            assert_eq!(parse_date_and_time("2024-01-10", "All Day"), None);
            assert_eq!(parse_date_and_time("Jan 10", "13:30"), None);
        }
    }

    mod finnhub {
        use super::*;

        #[test]
        fn normalizes_full_record() {
            let event = normalize(&finnhub_record(), SourceKind::Finnhub).unwrap();

            assert_eq!(event.display_name(), "US - CPI");
            assert_eq!(event.start_time, utc(2024, 1, 10, 13, 30, 0));
            assert_eq!(event.impact, ImpactTier::High);
            assert_eq!(event.impact_label, "high");
            assert_eq!(event.estimate, Some("3.2".to_string()));
            assert_eq!(event.actual, None);
            assert_eq!(event.previous, Some("3.1".to_string()));
            assert_eq!(event.unit, Some("%".to_string()));
            assert_eq!(
                event.source_id,
                Some("CPI@2024-01-10 13:30:00".to_string())
            );
        }

        #[test]
        fn missing_country_becomes_unknown() {
            let mut raw = finnhub_record();
            raw.fields.remove("country");
            let event = normalize(&raw, SourceKind::Finnhub).unwrap();
            assert_eq!(event.display_name(), "Unknown - CPI");
        }

        #[test]
        fn invalid_time_is_rejected_not_defaulted() {
            let raw = finnhub_record().with_field("time", "soon");
            let err = normalize(&raw, SourceKind::Finnhub).unwrap_err();
            assert_eq!(
                err,
                NormalizationError::InvalidTimestamp {
                    record_id: "CPI@2024-01-10 13:30:00".to_string(),
                    value: "soon".to_string(),
                }
            );
            assert_eq!(err.record_id(), "CPI@2024-01-10 13:30:00");
        }

        #[test]
        fn missing_time_is_rejected() {
            let mut raw = finnhub_record();
            raw.fields.remove("time");
            let err = normalize(&raw, SourceKind::Finnhub).unwrap_err();
            assert!(matches!(
                err,
                NormalizationError::MissingField { field: "time", .. }
            ));
        }

        #[test]
        fn missing_title_is_rejected() {
            let raw = finnhub_record().with_field("event", "   ");
            let err = normalize(&raw, SourceKind::Finnhub).unwrap_err();
            assert!(matches!(
                err,
                NormalizationError::MissingField { field: "title", .. }
            ));
        }
    }

    mod other_sources {
        use super::*;

        #[test]
        fn scraped_html_combines_date_and_time() {
            let raw = RawRecord::new(SourceKind::ScrapedHtml, "row-42")
                .with_field("country", "EU")
                .with_field("title", "ECB Rate Decision")
                .with_field("impact", "Red")
                .with_field("date", "2024-01-25")
                .with_field("time", "1:15pm")
                .with_field("forecast", "4.50%")
                .with_field("currency", "EUR");

            let event = normalize(&raw, SourceKind::ScrapedHtml).unwrap();
            assert_eq!(event.start_time, utc(2024, 1, 25, 13, 15, 0));
            assert_eq!(event.impact, ImpactTier::High);
            assert_eq!(event.estimate, Some("4.50%".to_string()));
            assert_eq!(event.unit, Some("EUR".to_string()));
        }

        #[test]
        fn scraped_html_falls_back_to_timestamp_attribute() {
            let raw = RawRecord::new(SourceKind::ScrapedHtml, "row-43")
                .with_field("country", "EU")
                .with_field("title", "Flash PMI")
                .with_field("impact", "orange")
                .with_field("timestamp", "2024-01-24T09:00:00Z");

            let event = normalize(&raw, SourceKind::ScrapedHtml).unwrap();
            assert_eq!(event.start_time, utc(2024, 1, 24, 9, 0, 0));
            assert_eq!(event.impact, ImpactTier::Medium);
        }

        #[test]
        fn json_feed_converts_offset() {
            let raw = RawRecord::new(SourceKind::JsonFeed, "NFP")
                .with_field("title", "Non-Farm Employment Change")
                .with_field("country", "USD")
                .with_field("date", "2024-01-05T08:30:00-05:00")
                .with_field("impact", "High")
                .with_field("forecast", "170K")
                .with_field("previous", "199K");

            let event = normalize(&raw, SourceKind::JsonFeed).unwrap();
            assert_eq!(event.start_time, utc(2024, 1, 5, 13, 30, 0));
            assert_eq!(event.unit, None);
            assert_eq!(event.previous, Some("199K".to_string()));
        }

        #[test]
        fn rss_uses_pub_date_when_split_fields_are_absent() {
            let raw = RawRecord::new(SourceKind::Rss, "guid-1")
                .with_field("country", "UK")
                .with_field("title", "BoE Rate Decision")
                .with_field("volatility", "2")
                .with_field("pubDate", "Thu, 01 Feb 2024 12:00:00 GMT");

            let event = normalize_record(&raw).unwrap();
            assert_eq!(event.start_time, utc(2024, 2, 1, 12, 0, 0));
            assert_eq!(event.impact, ImpactTier::Medium);
        }

        #[test]
        fn unparsable_split_time_does_not_fall_through() {
            let raw = RawRecord::new(SourceKind::Rss, "guid-2")
                .with_field("title", "Holiday")
                .with_field("date", "2024-02-01")
                .with_field("time", "Tentative")
                .with_field("pubDate", "Thu, 01 Feb 2024 12:00:00 GMT");

            let err = normalize_record(&raw).unwrap_err();
            assert!(matches!(err, NormalizationError::InvalidTimestamp { .. }));
        }
    }
}
