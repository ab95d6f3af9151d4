//! FFI use-case API for the Flutter app and the home-screen widget host.
//!
//! # Responsibility
//! - Expose stable, use-case-level water counter functions to Dart via FRB.
//! - Own the process-wide counter service so every caller shares one
//!   per-day lock table.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Failures are reported inside response envelopes, never as a reset
//!   counter value.

use mediary_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, parse_tap,
    ping as ping_inner, Clock, CounterResult, CounterStore, CounterSyncService, DisplayHost,
    DisplayInstanceId, SqliteCounterStore, TapEvent, WaterCount, WidgetView,
};
use std::cell::RefCell;
use std::path::PathBuf;
use std::sync::OnceLock;

const PREFS_DB_FILE_NAME: &str = "mediary_prefs.sqlite3";
const PREFS_DB_PATH_ENV: &str = "MEDIARY_PREFS_DB_PATH";
static PREFS_DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static COUNTER_SERVICE: OnceLock<CounterSyncService<SqliteCounterStore>> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Rendered content for one widget instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaterWidgetView {
    /// Host widget id.
    pub instance_id: i32,
    /// Decimal label shown on the widget.
    pub label: String,
    /// Host action bound to the increment region.
    pub increment_action: String,
    /// Request code for the increment region.
    pub increment_request_code: i32,
    /// Host action bound to the decrement region.
    pub decrement_action: String,
    /// Request code for the decrement region.
    pub decrement_request_code: i32,
}

/// Response envelope for water counter calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaterResponse {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Counter value after the call; `None` when unknown.
    pub value: Option<u8>,
    /// Views to push to the host; empty on failure so widgets keep their
    /// last rendered value.
    pub views: Vec<WaterWidgetView>,
    /// Human-readable response message for diagnostics.
    pub message: String,
}

impl WaterResponse {
    fn success(value: u8, views: Vec<WidgetView>, message: impl Into<String>) -> Self {
        Self {
            ok: true,
            value: Some(value),
            views: views.into_iter().map(to_water_widget_view).collect(),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            value: None,
            views: Vec::new(),
            message: message.into(),
        }
    }
}

/// Reads today's water counter.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Store failures return `ok=false`, never a zero value.
#[flutter_rust_bridge::frb(sync)]
pub fn water_current_value() -> WaterResponse {
    match with_counter_service(|service| service.current_value(service.today())) {
        Ok(value) => WaterResponse::success(value.get(), Vec::new(), "Loaded."),
        Err(err) => WaterResponse::failure(format!("water_current_value failed: {err}")),
    }
}

/// Handles one widget tap and returns views for every placed instance.
///
/// Input semantics:
/// - `action`: host action string from the tapped region.
/// - `instance_id`: widget that was tapped.
/// - `placed_instance_ids`: every widget currently placed, as enumerated by
///   the host at tap time.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics; unknown actions return `ok=false` without touching the store.
#[flutter_rust_bridge::frb(sync)]
pub fn water_tap(
    action: String,
    instance_id: i32,
    placed_instance_ids: Vec<i32>,
) -> WaterResponse {
    let event = match parse_tap(action.trim(), instance_id) {
        Ok(event) => event,
        Err(err) => return WaterResponse::failure(format!("water_tap rejected: {err}")),
    };

    let result = with_counter_service(|service| tap_and_collect(service, event, placed_instance_ids));

    match result {
        Ok((value, views)) => WaterResponse::success(value.get(), views, "Tap applied."),
        Err(err) => WaterResponse::failure(format!("water_tap failed: {err}")),
    }
}

/// Renders today's value for every instance the host asks to redraw.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - `value` always matches every returned label.
#[flutter_rust_bridge::frb(sync)]
pub fn water_refresh_all(instance_ids: Vec<i32>) -> WaterResponse {
    match with_counter_service(|service| render_snapshot(service, &instance_ids)) {
        Ok((value, views)) => WaterResponse::success(value.get(), views, "Rendered."),
        Err(err) => WaterResponse::failure(format!("water_refresh_all failed: {err}")),
    }
}

/// Host adapter for one FFI call: reports the ids the caller enumerated and
/// keeps the views the service pushes.
struct CollectingHost {
    placed: Vec<DisplayInstanceId>,
    views: RefCell<Vec<WidgetView>>,
}

impl DisplayHost for CollectingHost {
    fn instance_ids(&self) -> Vec<DisplayInstanceId> {
        self.placed.clone()
    }

    fn update(&self, view: WidgetView) {
        self.views.borrow_mut().push(view);
    }
}

fn tap_and_collect<S: CounterStore, C: Clock>(
    service: &CounterSyncService<S, C>,
    event: TapEvent,
    placed: Vec<DisplayInstanceId>,
) -> CounterResult<(WaterCount, Vec<WidgetView>)> {
    let host = CollectingHost {
        placed,
        views: RefCell::new(Vec::new()),
    };
    let value = service.handle_tap(event, &host)?;
    Ok((value, host.views.into_inner()))
}

fn render_snapshot<S: CounterStore, C: Clock>(
    service: &CounterSyncService<S, C>,
    instance_ids: &[DisplayInstanceId],
) -> CounterResult<(WaterCount, Vec<WidgetView>)> {
    let value = service.current_value(service.today())?;
    let views = instance_ids
        .iter()
        .map(|id| WidgetView::new(*id, value))
        .collect();
    Ok((value, views))
}

fn resolve_prefs_db_path() -> PathBuf {
    PREFS_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(PREFS_DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(PREFS_DB_FILE_NAME)
        })
        .clone()
}

fn with_counter_service<T>(
    f: impl FnOnce(&CounterSyncService<SqliteCounterStore>) -> CounterResult<T>,
) -> Result<T, String> {
    let service = match COUNTER_SERVICE.get() {
        Some(service) => service,
        None => {
            let store = SqliteCounterStore::open(resolve_prefs_db_path())
                .map_err(|err| format!("prefs DB open failed: {err}"))?;
            // A racing caller may have won; its service is kept and ours dropped.
            let _ = COUNTER_SERVICE.set(CounterSyncService::new(store));
            COUNTER_SERVICE
                .get()
                .ok_or_else(|| "counter service unavailable".to_string())?
        }
    };
    f(service).map_err(|err| err.to_string())
}

fn to_water_widget_view(view: WidgetView) -> WaterWidgetView {
    WaterWidgetView {
        instance_id: view.instance,
        label: view.label,
        increment_action: view.increment.action,
        increment_request_code: view.increment.request_code,
        decrement_action: view.decrement.action,
        decrement_request_code: view.decrement.request_code,
    }
}
