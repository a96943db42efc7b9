//! Sync horizon.
//!
//! A [`SyncWindow`] is built once per sync cycle from a single reference
//! instant, so every event of a batch is judged against the same horizon.
//!
//! The window starts at the reference date (date-level: anything on
//! today's UTC date qualifies) and ends at 00:00 UTC of the day
//! `reference date + horizon_days`, inclusive.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of days synchronized ahead of today.
pub const DEFAULT_HORIZON_DAYS: u32 = 15;

/// The active sync horizon for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncWindow {
    reference_now: DateTime<Utc>,
    horizon_days: u32,
    include_past: bool,
}

impl SyncWindow {
    /// Creates a window anchored at `reference_now`, excluding past events.
    pub fn new(reference_now: DateTime<Utc>, horizon_days: u32) -> Self {
        Self {
            reference_now,
            horizon_days,
            include_past: false,
        }
    }

    /// Keeps events that already started earlier today.
    pub fn with_include_past(mut self, include_past: bool) -> Self {
        self.include_past = include_past;
        self
    }

    pub fn reference_now(&self) -> DateTime<Utc> {
        self.reference_now
    }

    pub fn horizon_days(&self) -> u32 {
        self.horizon_days
    }

    pub fn include_past(&self) -> bool {
        self.include_past
    }

    /// First date of the window (the reference date).
    pub fn first_day(&self) -> NaiveDate {
        self.reference_now.date_naive()
    }

    /// Last date of the window.
    pub fn last_day(&self) -> NaiveDate {
        last_day(self.reference_now, self.horizon_days)
    }

    /// Last instant still inside the window.
    pub fn horizon_end(&self) -> DateTime<Utc> {
        horizon_end(self.reference_now, self.horizon_days)
    }

    /// Applies the window and the past-event policy to an event start.
    pub fn contains(&self, start: DateTime<Utc>) -> bool {
        if !self.include_past && start < self.reference_now {
            return false;
        }
        in_window(start, self.reference_now, self.horizon_days)
    }
}

/// Returns true if `start` lies inside the horizon of `reference_now`.
///
/// This is the policy-free check: strictly-past events from earlier today
/// still qualify. Use [`SyncWindow::contains`] to apply `include_past`.
pub fn in_window(start: DateTime<Utc>, reference_now: DateTime<Utc>, horizon_days: u32) -> bool {
    start.date_naive() >= reference_now.date_naive()
        && start <= horizon_end(reference_now, horizon_days)
}

fn last_day(reference_now: DateTime<Utc>, horizon_days: u32) -> NaiveDate {
    reference_now
        .date_naive()
        .checked_add_days(Days::new(u64::from(horizon_days)))
        .unwrap_or(NaiveDate::MAX)
}

fn horizon_end(reference_now: DateTime<Utc>, horizon_days: u32) -> DateTime<Utc> {
    last_day(reference_now, horizon_days)
        .and_time(NaiveTime::MIN)
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn horizon_boundary() {
        let now = utc(2024, 1, 1, 0, 0, 0);
        assert!(in_window(utc(2024, 1, 16, 0, 0, 0), now, 15));
        assert!(!in_window(utc(2024, 1, 16, 0, 0, 1), now, 15));
    }

    #[test]
    fn window_dates() {
        let window = SyncWindow::new(utc(2024, 1, 1, 9, 45, 0), DEFAULT_HORIZON_DAYS);
        assert_eq!(window.first_day(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(window.last_day(), NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());
        assert_eq!(window.horizon_end(), utc(2024, 1, 16, 0, 0, 0));
    }

    #[test]
    fn earlier_today_is_in_window_but_excluded_by_default_policy() {
        let now = utc(2024, 1, 1, 12, 0, 0);
        let earlier = utc(2024, 1, 1, 8, 30, 0);

        assert!(in_window(earlier, now, 15));
        assert!(!SyncWindow::new(now, 15).contains(earlier));
        assert!(SyncWindow::new(now, 15).with_include_past(true).contains(earlier));
    }

    #[test]
    fn yesterday_is_never_in_window() {
        let now = utc(2024, 1, 2, 0, 30, 0);
        let yesterday = utc(2024, 1, 1, 23, 59, 59);
        let window = SyncWindow::new(now, 15).with_include_past(true);
        assert!(!window.contains(yesterday));
    }

    #[test]
    fn exact_reference_instant_is_included() {
        let now = utc(2024, 1, 1, 12, 0, 0);
        assert!(SyncWindow::new(now, 15).contains(now));
    }

    #[test]
    fn zero_horizon_keeps_only_until_midnight() {
        let now = utc(2024, 1, 1, 0, 0, 0);
        let window = SyncWindow::new(now, 0);
        assert!(window.contains(now));
        assert!(!window.contains(utc(2024, 1, 1, 0, 0, 1)));
    }
}
