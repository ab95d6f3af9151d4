//! Water counter synchronization service.
//!
//! # Responsibility
//! - Read the day's counter from the shared store.
//! - Apply taps as a bounded read-modify-write.
//! - Fan the new value out to every widget instance the host reports.
//!
//! # Invariants
//! - `apply` calls for the same day key never interleave inside this process.
//! - Writes are compare-and-set against the value that was read, so a write
//!   from the Flutter application between read and write is never lost.
//! - Every persisted value is within `0..=10`.
//! - A failed read or write leaves the store untouched and pushes no view.

use crate::model::clock::{Clock, SystemClock};
use crate::model::day_key::{self, DayKey};
use crate::model::view::WidgetView;
use crate::model::water::{DisplayInstanceId, TapDirection, TapEvent, WaterCount};
use crate::repo::counter_store::{CounterStore, StoreError};
use chrono::NaiveDate;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

/// Compare-and-set attempts before an apply gives up on a busy key.
pub const MAX_SWAP_ATTEMPTS: u32 = 8;

pub type CounterResult<T> = Result<T, CounterError>;

/// Service error for counter use-cases.
#[derive(Debug)]
pub enum CounterError {
    /// The shared store could not be read or written.
    UnavailableStore(StoreError),
    /// Another writer changed the key on every attempt.
    Contended { key: DayKey, attempts: u32 },
    /// Host delivered an action outside the two widget actions.
    UnknownDirection(String),
}

impl Display for CounterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnavailableStore(err) => write!(f, "counter store unavailable: {err}"),
            Self::Contended { key, attempts } => {
                write!(f, "counter `{key}` still contended after {attempts} attempts")
            }
            Self::UnknownDirection(action) => write!(f, "unknown tap action `{action}`"),
        }
    }
}

impl Error for CounterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnavailableStore(err) => Some(err),
            Self::Contended { .. } | Self::UnknownDirection(_) => None,
        }
    }
}

impl From<StoreError> for CounterError {
    fn from(value: StoreError) -> Self {
        Self::UnavailableStore(value)
    }
}

/// Host-side widget surface.
///
/// The host owns instance identity; the service asks for the current list on
/// every fan-out and never keeps it.
pub trait DisplayHost {
    /// Ids of every widget instance currently placed.
    fn instance_ids(&self) -> Vec<DisplayInstanceId>;

    /// Replaces the content shown by `view.instance`.
    fn update(&self, view: WidgetView);
}

/// Use-case service for the daily water counter.
pub struct CounterSyncService<S: CounterStore, C: Clock = SystemClock> {
    store: S,
    clock: C,
    key_locks: Mutex<HashMap<DayKey, Arc<Mutex<()>>>>,
}

impl<S: CounterStore> CounterSyncService<S> {
    /// Creates a service reading dates from the host's local clock.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: CounterStore, C: Clock> CounterSyncService<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current local date according to the service clock.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Reads the counter for `date`; an absent key reads as zero.
    ///
    /// # Errors
    /// - `UnavailableStore` when the store read fails.
    pub fn current_value(&self, date: NaiveDate) -> CounterResult<WaterCount> {
        let key = day_key::resolve(date);
        let raw = self.read_raw(&key, "counter_read")?;
        Ok(self.coerce(&key, raw))
    }

    /// Applies one tap to the counter for `date` and returns the new value.
    ///
    /// Saturates silently at `0` and `10`.
    ///
    /// # Errors
    /// - `UnavailableStore` when the read or the write fails; nothing is
    ///   written in either case.
    /// - `Contended` when the key changed under us on every attempt.
    pub fn apply(&self, direction: TapDirection, date: NaiveDate) -> CounterResult<WaterCount> {
        let started_at = Instant::now();
        let key = day_key::resolve(date);
        let lock = self.key_lock(&key);
        let _guard = lock.lock();

        for attempt in 1..=MAX_SWAP_ATTEMPTS {
            let raw = self.read_raw(&key, "counter_apply")?;
            let current = self.coerce(&key, raw);
            let next = current.step(direction);

            let swapped = self
                .store
                .compare_and_set(key.as_str(), raw, i64::from(next))
                .map_err(|err| {
                    error!(
                        "event=counter_apply module=counter status=error direction={} error_code=store_write_failed error={}",
                        direction.label(),
                        err
                    );
                    CounterError::from(err)
                })?;

            if swapped {
                info!(
                    "event=counter_apply module=counter status=ok direction={} from={} to={} attempts={} duration_ms={}",
                    direction.label(),
                    current,
                    next,
                    attempt,
                    started_at.elapsed().as_millis()
                );
                return Ok(next);
            }

            warn!(
                "event=counter_apply module=counter status=retry direction={} attempt={}",
                direction.label(),
                attempt
            );
        }

        error!(
            "event=counter_apply module=counter status=error direction={} error_code=contended attempts={}",
            direction.label(),
            MAX_SWAP_ATTEMPTS
        );
        Err(CounterError::Contended {
            key,
            attempts: MAX_SWAP_ATTEMPTS,
        })
    }

    /// Builds the view for one instance from today's value.
    pub fn render(&self, instance: DisplayInstanceId) -> CounterResult<WidgetView> {
        let value = self.current_value(self.today())?;
        Ok(WidgetView::new(instance, value))
    }

    /// Builds views for every instance the host supplied.
    ///
    /// The value is read once, so all returned views agree.
    pub fn refresh_all(&self, instances: &[DisplayInstanceId]) -> CounterResult<Vec<WidgetView>> {
        let value = self.current_value(self.today())?;
        Ok(instances
            .iter()
            .map(|instance| WidgetView::new(*instance, value))
            .collect())
    }

    /// Handles one host tap: applies it for today, then refreshes every
    /// placed instance.
    ///
    /// On failure no view is pushed, so every instance keeps its last value.
    pub fn handle_tap(
        &self,
        event: TapEvent,
        host: &dyn DisplayHost,
    ) -> CounterResult<WaterCount> {
        let written = self.apply(event.direction, self.today())?;
        let instances = host.instance_ids();

        let views = match self.refresh_all(&instances) {
            Ok(views) => views,
            Err(err) => {
                // The write is committed; render it rather than leave stale views.
                warn!(
                    "event=counter_fanout module=counter status=degraded error_code=reread_failed error={}",
                    err
                );
                instances
                    .iter()
                    .map(|instance| WidgetView::new(*instance, written))
                    .collect()
            }
        };

        let count = views.len();
        for view in views {
            host.update(view);
        }
        debug!(
            "event=counter_fanout module=counter status=ok instances={} value={}",
            count, written
        );
        Ok(written)
    }

    fn read_raw(&self, key: &DayKey, event: &'static str) -> CounterResult<Option<i64>> {
        self.store.get(key.as_str()).map_err(|err| {
            error!(
                "event={} module=counter status=error error_code=store_read_failed error={}",
                event, err
            );
            CounterError::from(err)
        })
    }

    fn coerce(&self, key: &DayKey, raw: Option<i64>) -> WaterCount {
        let Some(raw) = raw else {
            return WaterCount::MIN;
        };
        let (count, clamped) = WaterCount::from_stored(raw);
        if clamped {
            warn!(
                "event=counter_legacy_clamp module=counter status=ok key={} stored={} coerced={}",
                key, raw, count
            );
        }
        count
    }

    fn key_lock(&self, key: &DayKey) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock();
        // Drop idle locks for other days so the table does not grow over time.
        locks.retain(|existing, lock| existing == key || Arc::strong_count(lock) > 1);
        locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
