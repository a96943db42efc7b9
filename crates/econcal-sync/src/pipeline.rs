//! One sync cycle, end to end.
//!
//! fetch → normalize → impact filter → window filter → list existing →
//! plan → sequential creates.
//!
//! A fetch or listing failure aborts the cycle before any create; a failed
//! create is counted and the batch continues. A cycle never overlaps
//! another on the same [`SyncRunner`], nor, when a lock file is configured,
//! a cycle for the same guild in another runner or process.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use econcal_core::{CalendarEvent, SyncWindow};
use econcal_providers::{FetchWindow, RawRecord, SourceAdapter, normalize_record};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::error::{StoreError, SyncError, SyncResult};
use crate::lock::CycleLock;
use crate::reconcile::{CreateAction, Plan, plan};
use crate::store::{ExistingEvents, NewScheduledEvent, StoreClient};

/// Counters reported at the end of a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub created: usize,
    pub failed: usize,
    /// Already present in the store at the same instant.
    pub skipped: usize,
    /// Rejected by normalization, the impact filter or the window filter.
    pub dropped: usize,
}

/// Records that survived normalization and both filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidates {
    pub events: Vec<CalendarEvent>,
    /// Rejected by the normalizer.
    pub invalid: usize,
    /// Impact tier outside High/Medium.
    pub out_of_scope: usize,
    /// Start outside the sync window.
    pub out_of_window: usize,
}

impl Candidates {
    pub fn dropped(&self) -> usize {
        self.invalid + self.out_of_scope + self.out_of_window
    }
}

/// Normalizes raw records and keeps the in-scope, in-window events, in
/// source order.
pub fn select_candidates(records: &[RawRecord], window: &SyncWindow, location: &str) -> Candidates {
    let mut candidates = Candidates::default();

    for raw in records {
        let event = match normalize_record(raw) {
            Ok(event) => event,
            Err(e) => {
                warn!(source = %raw.source, record_id = %e.record_id(), error = %e, "Dropping record");
                candidates.invalid += 1;
                continue;
            }
        };

        if !event.impact.is_in_scope() {
            debug!(name = %event.display_name(), impact = %event.impact, "Impact out of scope");
            candidates.out_of_scope += 1;
            continue;
        }

        if !window.contains(event.start_time) {
            debug!(name = %event.display_name(), start = %event.start_time, "Outside sync window");
            candidates.out_of_window += 1;
            continue;
        }

        candidates.events.push(event.with_location(location));
    }

    candidates
}

/// Everything decided before the first create call.
#[derive(Debug, Clone)]
pub struct CyclePlan {
    pub window: SyncWindow,
    pub candidates: Candidates,
    pub existing: ExistingEvents,
    pub plan: Plan,
}

/// Drives sync cycles for one source and one store.
pub struct SyncRunner {
    source: Arc<dyn SourceAdapter>,
    store: Arc<dyn StoreClient>,
    config: SyncConfig,
    in_flight: Mutex<()>,
    lock_file: Option<PathBuf>,
}

impl SyncRunner {
    pub fn new(
        source: Arc<dyn SourceAdapter>,
        store: Arc<dyn StoreClient>,
        config: SyncConfig,
    ) -> Self {
        Self {
            source,
            store,
            config,
            in_flight: Mutex::new(()),
            lock_file: None,
        }
    }

    /// Holds `path` as a [`CycleLock`] for the whole of every cycle.
    pub fn with_lock_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_file = Some(path.into());
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Runs a cycle anchored at the current time.
    pub async fn run_cycle(&self) -> SyncResult<CycleSummary> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Runs a cycle with `now` as the reference instant for the whole batch.
    ///
    /// # Errors
    ///
    /// [`SyncError::AlreadyRunning`] if another cycle is in flight or holds
    /// the lock file, or the fetch/listing error that aborted the cycle.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> SyncResult<CycleSummary> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| SyncError::AlreadyRunning)?;
        let _lock = self
            .lock_file
            .as_ref()
            .map(|path| CycleLock::acquire(path.clone()))
            .transpose()
            .inspect_err(|e| warn!(error = %e, "Sync cycle skipped"))?;

        let cycle = self.prepare_unguarded(now).await.inspect_err(|e| {
            error!(error = %e, "Sync cycle aborted");
        })?;

        let mut summary = CycleSummary {
            skipped: cycle.plan.skipped,
            dropped: cycle.candidates.dropped(),
            ..CycleSummary::default()
        };

        for action in &cycle.plan.actions {
            match self.create(action).await {
                Ok(id) => {
                    summary.created += 1;
                    info!(
                        id = %id,
                        name = %action.event.display_name(),
                        start = %action.event.start_time,
                        reason = action.reason.as_str(),
                        "Created scheduled event"
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!(
                        name = %action.event.display_name(),
                        start = %action.event.start_time,
                        error = %e,
                        "Failed to create scheduled event"
                    );
                }
            }
        }

        info!(
            created = summary.created,
            failed = summary.failed,
            skipped = summary.skipped,
            dropped = summary.dropped,
            "Sync cycle finished"
        );
        Ok(summary)
    }

    /// Fetches, filters and plans without creating anything.
    pub async fn prepare(&self, now: DateTime<Utc>) -> SyncResult<CyclePlan> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| SyncError::AlreadyRunning)?;
        self.prepare_unguarded(now).await
    }

    async fn prepare_unguarded(&self, now: DateTime<Utc>) -> SyncResult<CyclePlan> {
        let window = SyncWindow::new(now, self.config.horizon_days)
            .with_include_past(self.config.include_past);
        let fetch_window = FetchWindow::from_sync_window(&window);

        debug!(
            source = self.source.name(),
            from = %fetch_window.start,
            to = %fetch_window.end,
            "Fetching calendar"
        );
        let records = with_timeout(
            "source fetch",
            self.config.source_timeout,
            self.source.fetch(fetch_window),
        )
        .await??;

        let candidates = select_candidates(&records, &window, &self.config.location);
        debug!(
            records = records.len(),
            candidates = candidates.events.len(),
            dropped = candidates.dropped(),
            "Filtered records"
        );

        let existing = with_timeout(
            "existing events listing",
            self.config.store_timeout,
            self.store.list_existing_events(&self.config.guild_id),
        )
        .await?
        .map_err(SyncError::ExistingState)?;

        let plan = plan(&candidates.events, &existing);
        Ok(CyclePlan {
            window,
            candidates,
            existing,
            plan,
        })
    }

    async fn create(&self, action: &CreateAction) -> Result<String, StoreError> {
        let request = NewScheduledEvent::from_event(&action.event);
        match tokio::time::timeout(
            self.config.store_timeout,
            self.store.create_event(&self.config.guild_id, &request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(StoreError::timeout(format!(
                "create timed out after {:?}",
                self.config.store_timeout
            ))),
        }
    }
}

async fn with_timeout<F, T>(operation: &'static str, after: Duration, fut: F) -> SyncResult<T>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| SyncError::timeout(operation, after))
}
