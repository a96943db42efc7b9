//! Sync engine configuration.

use std::time::Duration;

use econcal_core::{DEFAULT_HORIZON_DAYS, DEFAULT_LOCATION};

/// Everything a sync cycle needs besides the injected source and store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Discord guild whose scheduled events are managed.
    pub guild_id: String,

    /// Days ahead of today to synchronize.
    pub horizon_days: u32,

    /// Keep events that already started earlier today.
    pub include_past: bool,

    /// Time between scheduled cycles.
    pub interval: Duration,

    /// Deadline for one source fetch.
    pub source_timeout: Duration,

    /// Deadline for one store call.
    pub store_timeout: Duration,

    /// External location label attached to created events.
    pub location: String,
}

impl SyncConfig {
    /// Default cycle interval (24 hours).
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

    /// Default network deadline.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

    pub fn new(guild_id: impl Into<String>) -> Self {
        Self {
            guild_id: guild_id.into(),
            horizon_days: DEFAULT_HORIZON_DAYS,
            include_past: false,
            interval: Self::DEFAULT_INTERVAL,
            source_timeout: Self::DEFAULT_TIMEOUT,
            store_timeout: Self::DEFAULT_TIMEOUT,
            location: DEFAULT_LOCATION.to_string(),
        }
    }

    /// Builder: set horizon days.
    pub fn with_horizon_days(mut self, days: u32) -> Self {
        self.horizon_days = days;
        self
    }

    /// Builder: set past-event policy.
    pub fn with_include_past(mut self, include_past: bool) -> Self {
        self.include_past = include_past;
        self
    }

    /// Builder: set cycle interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Builder: set source fetch timeout.
    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    /// Builder: set store call timeout.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Builder: set location label.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }
}
