//! Core types: calendar events, impact tiers, sync window, tracing

pub mod event;
pub mod impact;
pub mod source;
pub mod tracing;
pub mod window;

pub use event::{
    CalendarEvent, DEFAULT_LOCATION, MAX_DESCRIPTION_LEN, MAX_DISPLAY_NAME_LEN, NOT_AVAILABLE,
    UNKNOWN_COUNTRY, default_event_duration, display_name, ellipsis,
};
pub use impact::{ImpactTier, classify};
pub use source::{SourceKind, UnknownSourceKind};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
pub use window::{DEFAULT_HORIZON_DAYS, SyncWindow, in_window};
