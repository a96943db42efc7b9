//! Economic-calendar sources and record normalization.
//!
//! - [`SourceAdapter`] - the trait every provider implements
//! - [`RawRecord`] - provider fields before normalization
//! - [`normalize`] - table-driven conversion to [`econcal_core::CalendarEvent`]
//! - [`SourceError`] - fetch failures, which abort a sync cycle
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐ ┌────────────┐ ┌───────────┐ ┌─────────┐
//! │ Finnhub  │ │ HTML page  │ │ JSON feed │ │ RSS     │
//! └────┬─────┘ └─────┬──────┘ └─────┬─────┘ └────┬────┘
//!      │             │  SourceAdapter │            │
//!      └─────────────┴──────┬─────────┴────────────┘
//!                           ▼
//!                    ┌─────────────┐
//!                    │  RawRecord  │
//!                    └──────┬──────┘
//!                           ▼ normalize()
//!                    ┌───────────────┐
//!                    │ CalendarEvent │
//!                    └───────────────┘
//! ```

pub mod error;
#[cfg(feature = "finnhub")]
pub mod finnhub;
pub mod http;
#[cfg(feature = "json-feed")]
pub mod json_feed;
pub mod normalize;
pub mod raw_record;
#[cfg(feature = "rss")]
pub mod rss;
#[cfg(feature = "scrape")]
pub mod scrape;
pub mod source;

pub use error::{SourceError, SourceErrorCode, SourceResult};
pub use http::{HttpSourceConfig, SourceHttpClient};
pub use normalize::{
    FieldTable, NormalizationError, TimeField, field_table, normalize, normalize_record,
    parse_date_and_time, parse_timestamp,
};
pub use raw_record::RawRecord;
pub use source::{BoxFuture, ErrorSource, FetchWindow, SourceAdapter, StaticSource};

#[cfg(feature = "finnhub")]
pub use finnhub::FinnhubSource;
#[cfg(feature = "json-feed")]
pub use json_feed::JsonFeedSource;
#[cfg(feature = "rss")]
pub use rss::RssSource;
#[cfg(feature = "scrape")]
pub use scrape::ScrapedHtmlSource;
