//! `econcal sync`: a single cycle, or a dry-run plan.

use chrono::{DateTime, NaiveTime, Utc};
use econcal_sync::{CyclePlan, CycleSummary, PlanReason};
use serde::Serialize;

use super::build_runner;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Runs one cycle and prints its summary.
pub async fn once(config: &ClientConfig, json: bool) -> ClientResult<()> {
    let runner = build_runner(config)?;
    let summary = runner.run_cycle().await?;

    if json {
        print_json(&summary)?;
    } else {
        println!("{}", render_summary(&summary));
    }
    Ok(())
}

/// Plans a cycle against the live store and prints it without creating.
pub async fn dry_run(config: &ClientConfig, json: bool) -> ClientResult<()> {
    let runner = build_runner(config)?;
    let cycle = runner.prepare(Utc::now()).await?;
    let report = DryRunReport::from_plan(&cycle);

    if json {
        print_json(&report)?;
    } else {
        print!("{}", report.render());
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> ClientResult<()> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| ClientError::Config(format!("failed to serialize output: {}", e)))?;
    println!("{}", out);
    Ok(())
}

fn render_summary(summary: &CycleSummary) -> String {
    format!(
        "created {}, failed {}, already present {}, dropped {}",
        summary.created, summary.failed, summary.skipped, summary.dropped
    )
}

/// What a cycle would do right now.
#[derive(Debug, Serialize)]
struct DryRunReport {
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    existing: usize,
    skipped: usize,
    dropped: usize,
    creates: Vec<PlannedCreate>,
}

#[derive(Debug, Serialize)]
struct PlannedCreate {
    name: String,
    start: DateTime<Utc>,
    impact: String,
    reason: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    previous: Vec<DateTime<Utc>>,
}

impl DryRunReport {
    fn from_plan(cycle: &CyclePlan) -> Self {
        let creates = cycle
            .plan
            .actions
            .iter()
            .map(|action| PlannedCreate {
                name: action.event.display_name().to_string(),
                start: action.event.start_time,
                impact: action.event.impact.to_string(),
                reason: action.reason.as_str(),
                previous: match &action.reason {
                    PlanReason::Rescheduled { previous } => previous.clone(),
                    PlanReason::New => Vec::new(),
                },
            })
            .collect();

        let window_start = if cycle.window.include_past() {
            cycle.window.first_day().and_time(NaiveTime::MIN).and_utc()
        } else {
            cycle.window.reference_now()
        };

        Self {
            window_start,
            window_end: cycle.window.horizon_end(),
            existing: cycle.existing.len(),
            skipped: cycle.plan.skipped,
            dropped: cycle.candidates.dropped(),
            creates,
        }
    }

    fn render(&self) -> String {
        let mut out = format!(
            "window {} .. {}\n{} to create, {} already present, {} dropped\n",
            self.window_start.format("%Y-%m-%d %H:%M"),
            self.window_end.format("%Y-%m-%d %H:%M"),
            self.creates.len(),
            self.skipped,
            self.dropped
        );
        for create in &self.creates {
            out.push_str(&format!(
                "  + {}  {} [{}]",
                create.start.format("%Y-%m-%d %H:%M"),
                create.name,
                create.impact
            ));
            if !create.previous.is_empty() {
                let previous: Vec<String> = create
                    .previous
                    .iter()
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .collect();
                out.push_str(&format!(" (rescheduled from {})", previous.join(", ")));
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use econcal_core::{CalendarEvent, ImpactTier, SyncWindow};
    use econcal_sync::{Candidates, CreateAction, ExistingEvents, Plan};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 30, 0).unwrap()
    }

    fn cycle() -> CyclePlan {
        let cpi = CalendarEvent::new("US", "CPI", at(12, 12)).with_impact(ImpactTier::High, "3");
        let gdp = CalendarEvent::new("EU", "GDP", at(14, 10)).with_impact(ImpactTier::Medium, "2");

        CyclePlan {
            window: SyncWindow::new(at(10, 8), 15),
            candidates: Candidates {
                events: vec![cpi.clone(), gdp.clone()],
                invalid: 1,
                out_of_scope: 2,
                out_of_window: 0,
            },
            existing: ExistingEvents::new().with("EU - GDP", at(13, 10)),
            plan: Plan {
                actions: vec![
                    CreateAction {
                        event: cpi,
                        reason: PlanReason::New,
                    },
                    CreateAction {
                        event: gdp,
                        reason: PlanReason::Rescheduled {
                            previous: vec![at(13, 10)],
                        },
                    },
                ],
                skipped: 0,
            },
        }
    }

    #[test]
    fn summary_line() {
        let summary = CycleSummary {
            created: 3,
            failed: 1,
            skipped: 4,
            dropped: 2,
        };
        assert_eq!(
            render_summary(&summary),
            "created 3, failed 1, already present 4, dropped 2"
        );
    }

    #[test]
    fn dry_run_report_counts() {
        let report = DryRunReport::from_plan(&cycle());
        assert_eq!(report.creates.len(), 2);
        assert_eq!(report.existing, 1);
        assert_eq!(report.dropped, 3);
        assert_eq!(report.window_end, Utc.with_ymd_and_hms(2024, 3, 25, 0, 0, 0).unwrap());
    }

    #[test]
    fn dry_run_report_text() {
        insta::assert_snapshot!(DryRunReport::from_plan(&cycle()).render(), @r"
        window 2024-03-10 08:30 .. 2024-03-25 00:00
        2 to create, 0 already present, 3 dropped
          + 2024-03-12 12:30  US - CPI [high]
          + 2024-03-14 10:30  EU - GDP [medium] (rescheduled from 2024-03-13 10:30)
        ");
    }
}
