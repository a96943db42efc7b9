//! In-memory store.
//!
//! Stands in for Discord in the pipeline tests and the crate example.
//! Failures can be injected per call.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use econcal_providers::BoxFuture;

use super::{EventId, ExistingEvents, NewScheduledEvent, StoreClient};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct MemoryState {
    existing: ExistingEvents,
    created: Vec<NewScheduledEvent>,
    create_calls: usize,
    list_calls: usize,
}

/// A [`StoreClient`] that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_listing: Option<StoreError>,
    /// 1-based create call numbers that fail.
    failing_creates: HashSet<usize>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with the given events already stored.
    pub fn with_existing(existing: ExistingEvents) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                existing,
                ..MemoryState::default()
            }),
            ..Self::default()
        }
    }

    /// Makes every listing fail with `error`.
    pub fn with_listing_failure(mut self, error: StoreError) -> Self {
        self.fail_listing = Some(error);
        self
    }

    /// Makes the `nth` create call (1-based) fail.
    pub fn with_create_failure(mut self, nth: usize) -> Self {
        self.failing_creates.insert(nth);
        self
    }

    /// Delays every call, to exercise timeouts and the in-flight guard.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Events successfully created so far, in call order.
    pub fn created(&self) -> Vec<NewScheduledEvent> {
        self.lock().created.clone()
    }

    /// Number of create calls, including failed ones.
    pub fn create_calls(&self) -> usize {
        self.lock().create_calls
    }

    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl StoreClient for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn list_existing_events<'a>(
        &'a self,
        _guild_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<ExistingEvents>> {
        Box::pin(async move {
            self.pause().await;
            let mut state = self.lock();
            state.list_calls += 1;
            match self.fail_listing {
                Some(ref error) => Err(error.clone()),
                None => Ok(state.existing.clone()),
            }
        })
    }

    fn create_event<'a>(
        &'a self,
        _guild_id: &'a str,
        event: &'a NewScheduledEvent,
    ) -> BoxFuture<'a, StoreResult<EventId>> {
        Box::pin(async move {
            self.pause().await;
            let mut state = self.lock();
            state.create_calls += 1;
            let call = state.create_calls;
            if self.failing_creates.contains(&call) {
                return Err(StoreError::server(format!("injected failure on create #{}", call)));
            }
            state.existing.insert(event.name.clone(), event.start_time);
            state.created.push(event.clone());
            Ok(format!("mem-{}", call))
        })
    }
}
