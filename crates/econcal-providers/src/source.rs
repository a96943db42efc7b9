//! SourceAdapter trait definition.
//!
//! A [`SourceAdapter`] fetches raw records for a date range from one
//! economic-calendar provider. Adapters do no filtering: impact tiers,
//! the sync window and duplicate detection all happen downstream on the
//! normalized [`CalendarEvent`](econcal_core::CalendarEvent).

use std::future::Future;
use std::pin::Pin;

use chrono::NaiveDate;
use econcal_core::{SourceKind, SyncWindow};

use crate::error::{SourceError, SourceResult};
use crate::raw_record::RawRecord;

/// Inclusive date range requested from a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FetchWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The dates covered by a sync window.
    pub fn from_sync_window(window: &SyncWindow) -> Self {
        Self::new(window.first_day(), window.last_day())
    }

    /// Dates formatted as `YYYY-MM-DD`, for query strings.
    pub fn query_dates(&self) -> (String, String) {
        (
            self.start.format("%Y-%m-%d").to_string(),
            self.end.format("%Y-%m-%d").to_string(),
        )
    }
}

/// A boxed future for async trait methods.
///
/// Keeps the trait object-safe so the sync engine can hold an
/// `Arc<dyn SourceAdapter>` picked at startup from configuration.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The abstraction every economic-calendar provider implements.
///
/// # Example Implementation
///
/// ```ignore
/// struct MySource { client: reqwest::Client }
///
/// impl SourceAdapter for MySource {
///     fn kind(&self) -> SourceKind { SourceKind::JsonFeed }
///     fn name(&self) -> &str { "my-feed" }
///
///     fn fetch(&self, window: FetchWindow) -> BoxFuture<'_, SourceResult<Vec<RawRecord>>> {
///         Box::pin(async move {
///             let body = self.client.get(URL).send().await?.text().await?;
///             parse(&body)
///         })
///     }
/// }
/// ```
pub trait SourceAdapter: Send + Sync {
    /// Which normalization and impact tables apply to this source's records.
    fn kind(&self) -> SourceKind;

    /// Human-readable name for logs.
    fn name(&self) -> &str {
        self.kind().as_str()
    }

    /// Fetches every record the provider has for `window`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] on transport failures, non-success statuses or
    /// a payload that cannot be parsed at all. A single malformed record is
    /// not an error here; it is returned and rejected by the normalizer.
    fn fetch(&self, window: FetchWindow) -> BoxFuture<'_, SourceResult<Vec<RawRecord>>>;
}

/// A source that returns a fixed set of records.
///
/// Test double for the sync pipeline tests.
#[derive(Debug, Clone)]
pub struct StaticSource {
    kind: SourceKind,
    records: Vec<RawRecord>,
}

impl StaticSource {
    pub fn new(kind: SourceKind, records: Vec<RawRecord>) -> Self {
        Self { kind, records }
    }
}

impl SourceAdapter for StaticSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn fetch(&self, _window: FetchWindow) -> BoxFuture<'_, SourceResult<Vec<RawRecord>>> {
        let records = self.records.clone();
        Box::pin(async move { Ok(records) })
    }
}

/// A source that always fails.
///
/// Stands in for a source that could not be initialized, and exercises
/// the abort-on-fetch-failure path in tests.
#[derive(Debug)]
pub struct ErrorSource {
    kind: SourceKind,
    error: SourceError,
}

impl ErrorSource {
    pub fn new(kind: SourceKind, error: SourceError) -> Self {
        Self { kind, error }
    }
}

impl SourceAdapter for ErrorSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn fetch(&self, _window: FetchWindow) -> BoxFuture<'_, SourceResult<Vec<RawRecord>>> {
        // SourceError carries a boxed cause and is not Clone.
        let error = SourceError::new(self.error.code(), self.error.message())
            .with_source_kind(self.kind);
        Box::pin(async move { Err(error) })
    }
}
