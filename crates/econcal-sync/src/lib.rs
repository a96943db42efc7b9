//! Sync engine: reconciliation, stores, cycle driver and scheduler.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use econcal_core::SourceKind;
//! use econcal_providers::StaticSource;
//! use econcal_sync::{MemoryStore, SyncConfig, SyncRunner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = SyncRunner::new(
//!         Arc::new(StaticSource::new(SourceKind::Finnhub, Vec::new())),
//!         Arc::new(MemoryStore::new()),
//!         SyncConfig::new("123456789012345678"),
//!     );
//!     let summary = runner.run_cycle().await?;
//!     println!("created {}", summary.created);
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod lock;
mod pipeline;
mod reconcile;
mod scheduler;
mod signals;
pub mod store;

pub use config::SyncConfig;
pub use error::{StoreError, StoreErrorCode, StoreResult, SyncError, SyncResult};
pub use lock::{CycleLock, default_lock_path};
pub use pipeline::{Candidates, CyclePlan, CycleSummary, SyncRunner, select_candidates};
pub use reconcile::{CreateAction, Plan, PlanReason, plan};
pub use scheduler::{
    Scheduler, SchedulerClosed, SchedulerCommand, SchedulerConfig, SchedulerHandle,
    SchedulerState, SharedSchedulerState, Trigger, new_scheduler_state,
};
pub use signals::{ShutdownSignal, SignalHandler, SyncRequests};
pub use store::{
    DiscordConfig, DiscordStore, EventId, EventPrivacy, ExistingEvents, MemoryStore,
    NewScheduledEvent, StoreClient,
};
