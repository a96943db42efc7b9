//! Periodic sync scheduler.
//!
//! One cycle runs at startup, then one per `interval` (plus optional
//! jitter). After a failed cycle the next attempt follows an exponential
//! backoff capped at the interval, without limit on the number of retries.
//! `SyncNow` runs a cycle immediately.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, error, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::pipeline::CycleSummary;

/// Timing policy for the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Regular time between cycles.
    pub interval: Duration,
    /// Random spread around `interval`, as a fraction in 0.0..=1.0.
    pub jitter_fraction: f64,
    /// Wait before the first retry.
    pub retry_initial: Duration,
    pub retry_multiplier: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(24 * 60 * 60))
    }
}

impl SchedulerConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            jitter_fraction: 0.0,
            retry_initial: Duration::from_secs(5 * 60),
            retry_multiplier: 2.0,
        }
    }

    pub fn with_jitter(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    pub fn with_backoff(mut self, initial: Duration, multiplier: f64) -> Self {
        self.retry_initial = initial;
        self.retry_multiplier = multiplier.max(1.0);
        self
    }

    /// Delay until the next regular cycle.
    pub fn regular_delay(&self) -> Duration {
        let base = self.interval.as_secs_f64();
        let spread = base * self.jitter_fraction;
        Duration::from_secs_f64((base + spread * clock_noise()).max(0.0))
    }

    /// Delay before retrying after `failures` consecutive failed cycles.
    /// Capped at the regular interval.
    pub fn retry_delay(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(failures - 1).unwrap_or(i32::MAX);
        let secs = self.retry_initial.as_secs_f64() * self.retry_multiplier.powi(exponent);
        Duration::from_secs_f64(secs.min(self.interval.as_secs_f64()))
    }

    /// Delay to wait given the current state.
    pub fn delay_after(&self, state: &SchedulerState) -> Duration {
        match state.consecutive_failures {
            0 => self.regular_delay(),
            failures => self.retry_delay(failures),
        }
    }
}

/// Value in [-1, 1] derived from the sub-second clock.
fn clock_noise() -> f64 {
    let nanos = Utc::now().timestamp_subsec_nanos() % 1_000_000_000;
    f64::from(nanos) / 500_000_000.0 - 1.0
}

/// What started a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    Interval,
    Retry,
    Manual,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Interval => "interval",
            Self::Retry => "retry",
            Self::Manual => "manual",
        }
    }
}

/// Commands accepted by a running scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    SyncNow,
    Stop,
}

/// Outcome history of the scheduler.
#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    pub consecutive_failures: u32,
    /// End of the last successful cycle.
    pub last_sync: Option<DateTime<Utc>>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_trigger: Option<Trigger>,
    pub last_error: Option<String>,
    /// Counters of the last successful cycle.
    pub last_summary: Option<CycleSummary>,
    /// Completed cycles, successful or not. Rejected overlaps are not counted.
    pub cycles: u64,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, summary: CycleSummary) {
        let now = Utc::now();
        self.cycles += 1;
        self.consecutive_failures = 0;
        self.last_attempt = Some(now);
        self.last_sync = Some(now);
        self.last_error = None;
        self.last_summary = Some(summary);
    }

    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.cycles += 1;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_attempt = Some(Utc::now());
        self.last_error = Some(error.into());
    }
}

pub type SharedSchedulerState = Arc<RwLock<SchedulerState>>;

pub fn new_scheduler_state() -> SharedSchedulerState {
    Arc::new(RwLock::new(SchedulerState::new()))
}

/// The scheduler loop stopped and no longer accepts commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("scheduler is not running")]
pub struct SchedulerClosed;

/// Drives sync cycles in the background.
pub struct Scheduler {
    config: SchedulerConfig,
    state: SharedSchedulerState,
    command_tx: mpsc::Sender<SchedulerCommand>,
    command_rx: Option<mpsc::Receiver<SchedulerCommand>>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(8);
        Self {
            config,
            state: new_scheduler_state(),
            command_tx,
            command_rx: Some(command_rx),
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            command_tx: self.command_tx.clone(),
            state: self.state.clone(),
        }
    }

    pub fn state(&self) -> SharedSchedulerState {
        self.state.clone()
    }

    /// Runs cycles until a `Stop` command arrives.
    pub async fn run<F, Fut>(mut self, cycle: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SyncResult<CycleSummary>> + Send,
    {
        let Some(mut commands) = self.command_rx.take() else {
            error!("Scheduler command channel already taken");
            return;
        };
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Scheduler started"
        );
        self.attempt(Trigger::Startup, &cycle).await;

        loop {
            let (delay, trigger) = {
                let state = self.state.read().await;
                let trigger = if state.consecutive_failures > 0 {
                    Trigger::Retry
                } else {
                    Trigger::Interval
                };
                (self.config.delay_after(&state), trigger)
            };
            debug!(
                delay_secs = delay.as_secs(),
                trigger = trigger.as_str(),
                "Next cycle scheduled"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => self.attempt(trigger, &cycle).await,
                command = commands.recv() => match command {
                    Some(SchedulerCommand::SyncNow) => self.attempt(Trigger::Manual, &cycle).await,
                    Some(SchedulerCommand::Stop) | None => break,
                },
            }
        }
        info!("Scheduler stopped");
    }

    async fn attempt<F, Fut>(&self, trigger: Trigger, cycle: &F)
    where
        F: Fn() -> Fut,
        Fut: Future<Output = SyncResult<CycleSummary>>,
    {
        debug!(trigger = trigger.as_str(), "Starting sync cycle");
        let result = cycle().await;

        let mut state = self.state.write().await;
        match result {
            Ok(summary) => state.record_success(summary),
            Err(SyncError::AlreadyRunning) => {
                warn!(trigger = trigger.as_str(), "Cycle already in flight, trigger dropped");
                return;
            }
            Err(e) => {
                error!(trigger = trigger.as_str(), error = %e, "Sync cycle failed");
                state.record_failure(e.to_string());
            }
        }
        state.last_trigger = Some(trigger);
    }
}

/// Cloneable control handle for a [`Scheduler`].
#[derive(Clone, Debug)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    state: SharedSchedulerState,
}

impl SchedulerHandle {
    /// Requests an immediate cycle.
    pub async fn sync_now(&self) -> Result<(), SchedulerClosed> {
        self.send(SchedulerCommand::SyncNow).await
    }

    pub async fn stop(&self) -> Result<(), SchedulerClosed> {
        self.send(SchedulerCommand::Stop).await
    }

    async fn send(&self, command: SchedulerCommand) -> Result<(), SchedulerClosed> {
        self.command_tx.send(command).await.map_err(|_| SchedulerClosed)
    }

    /// Snapshot of the scheduler state.
    pub async fn state(&self) -> SchedulerState {
        self.state.read().await.clone()
    }
}
