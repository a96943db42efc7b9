//! Scheduled-events stores.
//!
//! The sync engine only ever lists and creates; it never updates or
//! cancels a stored event.

pub mod discord;
pub mod memory;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use econcal_core::CalendarEvent;
use econcal_providers::BoxFuture;
use serde::Serialize;

use crate::error::StoreResult;

pub use discord::{DiscordConfig, DiscordStore};
pub use memory::MemoryStore;

/// Identifier assigned by the store to a created event.
pub type EventId = String;

/// The store's current events, reduced to what matching needs.
///
/// Maps display name to every start time listed under it. A name can
/// legitimately appear more than once after a reschedule, because the
/// stale entry is never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistingEvents {
    by_name: HashMap<String, Vec<DateTime<Utc>>>,
}

impl ExistingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, start_time: DateTime<Utc>) {
        self.by_name.entry(name.into()).or_default().push(start_time);
    }

    /// Builder variant of [`ExistingEvents::insert`].
    pub fn with(mut self, name: impl Into<String>, start_time: DateTime<Utc>) -> Self {
        self.insert(name, start_time);
        self
    }

    /// Start times listed under `name`; empty if the name is unknown.
    pub fn start_times(&self, name: &str) -> &[DateTime<Utc>] {
        self.by_name.get(name).map_or(&[], Vec::as_slice)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// True if an entry with exactly this name and start instant exists.
    pub fn contains(&self, name: &str, start_time: DateTime<Utc>) -> bool {
        self.start_times(name).contains(&start_time)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.by_name.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, DateTime<Utc>)> for ExistingEvents {
    fn from_iter<I: IntoIterator<Item = (S, DateTime<Utc>)>>(iter: I) -> Self {
        let mut existing = Self::new();
        for (name, start) in iter {
            existing.insert(name, start);
        }
        existing
    }
}

/// Who can see a created event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPrivacy {
    /// Visible to guild members only; the only level Discord accepts.
    #[default]
    GuildOnly,
}

/// A create request, already shaped for the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewScheduledEvent {
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// At most [`econcal_core::MAX_DESCRIPTION_LEN`] characters.
    pub description: String,
    pub privacy: EventPrivacy,
    /// External location label.
    pub location: String,
}

impl NewScheduledEvent {
    /// Builds the request for a calendar event, filling in the default
    /// one-hour duration when the source gave no end time.
    pub fn from_event(event: &CalendarEvent) -> Self {
        Self {
            name: event.display_name().to_string(),
            start_time: event.start_time,
            end_time: event.effective_end_time(),
            description: event.description(),
            privacy: EventPrivacy::GuildOnly,
            location: event.location.clone(),
        }
    }
}

/// The scheduled-events store the engine reconciles into.
pub trait StoreClient: Send + Sync {
    /// Name for logs ("discord", "memory").
    fn name(&self) -> &str;

    /// Lists every scheduled event of the guild.
    ///
    /// # Errors
    ///
    /// Any error here aborts the cycle before a single create is issued.
    fn list_existing_events<'a>(
        &'a self,
        guild_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<ExistingEvents>>;

    /// Creates one external scheduled event.
    fn create_event<'a>(
        &'a self,
        guild_id: &'a str,
        event: &'a NewScheduledEvent,
    ) -> BoxFuture<'a, StoreResult<EventId>>;
}
