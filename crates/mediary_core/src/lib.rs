//! Core logic for the Mediary water intake widget.
//! This crate is the single source of truth for counter invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::clock::{Clock, FixedClock, SystemClock};
pub use model::day_key::{resolve as resolve_day_key, DayKey, WATER_KEY_PREFIX};
pub use model::view::{TapRegion, WidgetView};
pub use model::water::{
    DisplayInstanceId, TapDirection, TapEvent, WaterCount, WaterCountRangeError,
    ACTION_DECREMENT, ACTION_INCREMENT,
};
pub use repo::counter_store::{
    CounterStore, MemoryCounterStore, SqliteCounterStore, StoreError, StoreResult,
};
pub use service::counter_sync::{
    CounterError, CounterResult, CounterSyncService, DisplayHost, MAX_SWAP_ATTEMPTS,
};
pub use service::tap_inbox::{parse_tap, DrainReport, TapInbox, TapSender};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
