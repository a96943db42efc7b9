//! Reconciliation: which candidates must be created in the store.
//!
//! Identity is the display name; an existing entry suppresses a candidate
//! only when its start instant is exactly equal. A candidate whose name is
//! known but whose time differs is treated as rescheduled and created
//! again; the stale store entry is left untouched.

use chrono::{DateTime, Utc};
use econcal_core::CalendarEvent;

use crate::store::ExistingEvents;

/// Why a create was planned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanReason {
    /// No store entry carries this name.
    New,
    /// The name exists, but at other start times.
    Rescheduled { previous: Vec<DateTime<Utc>> },
}

impl PlanReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Rescheduled { .. } => "rescheduled",
        }
    }
}

/// One planned create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAction {
    pub event: CalendarEvent,
    pub reason: PlanReason,
}

/// Result of planning one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Creates, in candidate order.
    pub actions: Vec<CreateAction>,
    /// Candidates already present at the same instant.
    pub skipped: usize,
}

/// Computes the creates needed to bring `existing` in line with `candidates`.
///
/// Pure: the same inputs always give the same plan. Two candidates sharing
/// a display name in one batch are both planned.
pub fn plan(candidates: &[CalendarEvent], existing: &ExistingEvents) -> Plan {
    let mut result = Plan::default();

    for candidate in candidates {
        let name = candidate.display_name();
        let known = existing.start_times(name);

        if known.contains(&candidate.start_time) {
            result.skipped += 1;
            continue;
        }

        let reason = if known.is_empty() {
            PlanReason::New
        } else {
            PlanReason::Rescheduled {
                previous: known.to_vec(),
            }
        };
        result.actions.push(CreateAction {
            event: candidate.clone(),
            reason,
        });
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, h, 30, 0).unwrap()
    }

    fn event(country: &str, title: &str, start: DateTime<Utc>) -> CalendarEvent {
        CalendarEvent::new(country, title, start)
    }

    #[test]
    fn everything_new_is_created_in_order() {
        let candidates = vec![
            event("US", "CPI", at(10, 13)),
            event("EU", "GDP", at(11, 10)),
        ];

        let plan = plan(&candidates, &ExistingEvents::new());
        let names: Vec<&str> = plan
            .actions
            .iter()
            .map(|a| a.event.display_name())
            .collect();
        assert_eq!(names, vec!["US - CPI", "EU - GDP"]);
        assert!(plan.actions.iter().all(|a| a.reason == PlanReason::New));
        assert_eq!(plan.skipped, 0);
    }

    #[test]
    fn idempotent_when_everything_exists() {
        let candidates = vec![
            event("US", "CPI", at(10, 13)),
            event("EU", "GDP", at(11, 10)),
        ];
        let existing: ExistingEvents = candidates
            .iter()
            .map(|e| (e.display_name().to_string(), e.start_time))
            .collect();

        let plan = plan(&candidates, &existing);
        assert!(plan.actions.is_empty());
        assert_eq!(plan.skipped, 2);
    }

    #[test]
    fn reschedule_emits_create_with_previous_times() {
        let existing = ExistingEvents::new().with("US - CPI", at(10, 13));
        let candidates = vec![event("US", "CPI", at(11, 13))];

        let plan = plan(&candidates, &existing);
        assert_eq!(plan.actions.len(), 1);
        assert_eq!(
            plan.actions[0].reason,
            PlanReason::Rescheduled {
                previous: vec![at(10, 13)]
            }
        );
    }

    #[test]
    fn matching_requires_exact_instant() {
        let existing = ExistingEvents::new().with("US - CPI", at(10, 13));
        let one_second_later = at(10, 13) + chrono::Duration::seconds(1);

        let plan = plan(&[event("US", "CPI", one_second_later)], &existing);
        assert_eq!(plan.actions.len(), 1);
    }

    #[test]
    fn rescheduled_name_with_both_entries_is_stable() {
        let existing = ExistingEvents::new()
            .with("US - CPI", at(10, 13))
            .with("US - CPI", at(11, 13));

        assert!(plan(&[event("US", "CPI", at(11, 13))], &existing).actions.is_empty());
        assert!(plan(&[event("US", "CPI", at(10, 13))], &existing).actions.is_empty());
    }

    #[test]
    fn same_name_twice_in_batch_is_submitted_twice() {
        let candidates = vec![
            event("US", "Fed Chair Speaks", at(10, 14)),
            event("US", "Fed Chair Speaks", at(10, 18)),
        ];

        let plan = plan(&candidates, &ExistingEvents::new());
        assert_eq!(plan.actions.len(), 2);
    }

    #[test]
    fn identity_ignores_source_fields() {
        let existing = ExistingEvents::new().with("US - CPI", at(10, 13));
        let from_other_source = event("US", "CPI", at(10, 13))
            .with_source_id("rss-guid-7")
            .with_estimate("3.4");

        assert_eq!(plan(&[from_other_source], &existing).skipped, 1);
    }
}
