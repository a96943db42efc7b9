//! `econcal run`: the long-running daemon.

use std::sync::Arc;
use std::time::Duration;

use econcal_sync::{Scheduler, SchedulerConfig, SignalHandler};
use tracing::{info, warn};

use super::build_runner;
use crate::config::ClientConfig;
use crate::error::ClientResult;

/// How long a stopping scheduler may take to finish its current cycle.
const STOP_GRACE: Duration = Duration::from_secs(30);

/// Runs scheduled sync cycles until SIGTERM or SIGINT.
///
/// SIGUSR1 triggers an immediate cycle.
pub async fn run(config: &ClientConfig) -> ClientResult<()> {
    let runner = Arc::new(build_runner(config)?);
    let sync_config = runner.config().clone();

    info!(
        guild_id = %sync_config.guild_id,
        source = %config.source.kind,
        horizon_days = sync_config.horizon_days,
        "Starting econcal daemon"
    );

    let signal_handler = SignalHandler::new();
    signal_handler.spawn_listener()?;

    let scheduler = Scheduler::new(SchedulerConfig::new(sync_config.interval));
    let scheduler_handle = scheduler.handle();

    let cycle_runner = runner.clone();
    let scheduler_task = tokio::spawn(async move {
        scheduler
            .run(move || {
                let runner = cycle_runner.clone();
                async move { runner.run_cycle().await }
            })
            .await;
    });

    let trigger_handle = scheduler_handle.clone();
    let mut requests = signal_handler.sync_requests();
    let trigger_task = tokio::spawn(async move {
        while requests.next().await {
            if trigger_handle.sync_now().await.is_err() {
                break;
            }
        }
    });

    signal_handler.shutdown().wait().await;

    info!("Shutting down...");
    trigger_task.abort();
    if let Err(e) = scheduler_handle.stop().await {
        warn!(error = %e, "Failed to send stop command to scheduler");
    }

    if tokio::time::timeout(STOP_GRACE, scheduler_task).await.is_err() {
        warn!("Scheduler did not stop in time");
    }

    let state = scheduler_handle.state().await;
    info!(
        cycles = state.cycles,
        consecutive_failures = state.consecutive_failures,
        "Daemon stopped"
    );
    Ok(())
}
