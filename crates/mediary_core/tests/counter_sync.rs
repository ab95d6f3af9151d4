use chrono::NaiveDate;
use mediary_core::{
    resolve_day_key, CounterError, CounterStore, CounterSyncService, DisplayHost,
    DisplayInstanceId, FixedClock, MemoryCounterStore, SqliteCounterStore, StoreError,
    StoreResult, TapDirection, TapEvent, TapInbox, WidgetView, ACTION_DECREMENT, ACTION_INCREMENT,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Barrier, Mutex};
use std::thread;

fn day(year: i32, month: u32, dom: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, dom).unwrap()
}

fn today() -> NaiveDate {
    day(2024, 3, 5)
}

fn service_with<S: CounterStore>(store: S) -> CounterSyncService<S, FixedClock> {
    CounterSyncService::with_clock(store, FixedClock(today()))
}

/// Host double that records the latest view per instance.
#[derive(Default)]
struct FakeLauncher {
    placed: Mutex<Vec<DisplayInstanceId>>,
    shown: Mutex<BTreeMap<DisplayInstanceId, WidgetView>>,
}

impl FakeLauncher {
    fn with_instances(ids: &[DisplayInstanceId]) -> Self {
        let launcher = Self::default();
        *launcher.placed.lock().unwrap() = ids.to_vec();
        launcher
    }

    fn label(&self, instance: DisplayInstanceId) -> Option<String> {
        self.shown
            .lock()
            .unwrap()
            .get(&instance)
            .map(|view| view.label.clone())
    }
}

impl DisplayHost for FakeLauncher {
    fn instance_ids(&self) -> Vec<DisplayInstanceId> {
        self.placed.lock().unwrap().clone()
    }

    fn update(&self, view: WidgetView) {
        self.shown.lock().unwrap().insert(view.instance, view);
    }
}

/// Store wrapper whose reads or writes can be switched off.
struct FlakyStore {
    inner: MemoryCounterStore,
    reads_fail: AtomicBool,
    writes_fail: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryCounterStore::new(),
            reads_fail: AtomicBool::new(false),
            writes_fail: AtomicBool::new(false),
        }
    }
}

impl CounterStore for FlakyStore {
    fn get(&self, key: &str) -> StoreResult<Option<i64>> {
        if self.reads_fail.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("preferences file locked".to_string()));
        }
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: i64) -> StoreResult<()> {
        if self.writes_fail.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        self.inner.set(key, value)
    }

    fn compare_and_set(&self, key: &str, expected: Option<i64>, value: i64) -> StoreResult<bool> {
        if self.writes_fail.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        self.inner.compare_and_set(key, expected, value)
    }
}

/// Store that lets the co-resident app write once right after the first read.
struct AppWritesAfterFirstRead {
    inner: MemoryCounterStore,
    app_value: i64,
    fired: AtomicBool,
}

impl CounterStore for AppWritesAfterFirstRead {
    fn get(&self, key: &str) -> StoreResult<Option<i64>> {
        let value = self.inner.get(key)?;
        if !self.fired.swap(true, Ordering::SeqCst) {
            self.inner.set(key, self.app_value)?;
        }
        Ok(value)
    }

    fn set(&self, key: &str, value: i64) -> StoreResult<()> {
        self.inner.set(key, value)
    }

    fn compare_and_set(&self, key: &str, expected: Option<i64>, value: i64) -> StoreResult<bool> {
        self.inner.compare_and_set(key, expected, value)
    }
}

#[test]
fn resolve_matches_flutter_preference_key() {
    assert_eq!(
        resolve_day_key(day(2024, 3, 5)).as_str(),
        "flutter.water_2024-03-05"
    );
    assert_eq!(resolve_day_key(day(2024, 3, 5)), resolve_day_key(day(2024, 3, 5)));
}

#[test]
fn current_value_of_untouched_day_is_zero() {
    let service = service_with(MemoryCounterStore::new());
    assert_eq!(service.current_value(day(2030, 1, 1)).unwrap().get(), 0);
}

#[test]
fn increments_and_decrements_saturate_silently() {
    let service = service_with(MemoryCounterStore::new());

    assert_eq!(service.apply(TapDirection::Decrement, today()).unwrap().get(), 0);
    for expected in 1..=10 {
        assert_eq!(
            service.apply(TapDirection::Increment, today()).unwrap().get(),
            expected
        );
    }
    assert_eq!(service.apply(TapDirection::Increment, today()).unwrap().get(), 10);
    assert_eq!(service.apply(TapDirection::Increment, today()).unwrap().get(), 10);
    assert_eq!(
        service.store().get("flutter.water_2024-03-05").unwrap(),
        Some(10)
    );
}

#[test]
fn every_step_from_every_start_stays_in_range() {
    for start in 0..=10 {
        let store = MemoryCounterStore::new();
        store.set("flutter.water_2024-03-05", start).unwrap();
        let service = service_with(store);

        for step in 0..30 {
            let direction = if (step * 7 + start) % 3 == 0 {
                TapDirection::Decrement
            } else {
                TapDirection::Increment
            };
            let value = service.apply(direction, today()).unwrap();
            assert!(value.get() <= 10);
            let stored = service
                .store()
                .get("flutter.water_2024-03-05")
                .unwrap()
                .unwrap();
            assert!((0..=10).contains(&stored));
        }
    }
}

#[test]
fn apply_on_one_day_never_touches_another() {
    let service = service_with(MemoryCounterStore::new());
    let yesterday = day(2024, 3, 4);

    service.apply(TapDirection::Increment, yesterday).unwrap();
    service.apply(TapDirection::Increment, yesterday).unwrap();
    service.apply(TapDirection::Increment, today()).unwrap();
    service.apply(TapDirection::Decrement, today()).unwrap();

    assert_eq!(service.current_value(yesterday).unwrap().get(), 2);
    assert_eq!(service.current_value(today()).unwrap().get(), 0);
}

#[test]
fn two_concurrent_increments_from_three_reach_five() {
    let store = MemoryCounterStore::new();
    store.set("flutter.water_2024-03-05", 3).unwrap();
    let service = service_with(store);
    let barrier = Barrier::new(2);

    thread::scope(|scope| {
        for _ in 0..2 {
            scope.spawn(|| {
                barrier.wait();
                service.apply(TapDirection::Increment, today()).unwrap();
            });
        }
    });

    assert_eq!(service.current_value(today()).unwrap().get(), 5);
}

#[test]
fn many_threads_sharing_a_sqlite_store_lose_no_updates() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteCounterStore::open(dir.path().join("prefs.sqlite3")).unwrap();
    let service = service_with(store);
    let barrier = Barrier::new(4);

    // At most 8 increments land before any decrement, so nothing saturates.
    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                barrier.wait();
                for direction in [
                    TapDirection::Increment,
                    TapDirection::Increment,
                    TapDirection::Decrement,
                ] {
                    service.apply(direction, today()).unwrap();
                }
            });
        }
    });

    assert_eq!(service.current_value(today()).unwrap().get(), 4);
}

#[test]
fn external_writer_between_read_and_write_is_not_overwritten() {
    let store = AppWritesAfterFirstRead {
        inner: MemoryCounterStore::new(),
        app_value: 6,
        fired: AtomicBool::new(false),
    };
    let service = service_with(store);

    let value = service.apply(TapDirection::Increment, today()).unwrap();

    assert_eq!(value.get(), 7);
    assert_eq!(service.current_value(today()).unwrap().get(), 7);
}

#[test]
fn store_read_failure_is_not_reported_as_zero() {
    let store = FlakyStore::new();
    store.inner.set("flutter.water_2024-03-05", 4).unwrap();
    store.reads_fail.store(true, Ordering::SeqCst);
    let service = service_with(store);

    let err = service.current_value(today()).unwrap_err();
    assert!(matches!(err, CounterError::UnavailableStore(_)));

    let err = service.apply(TapDirection::Increment, today()).unwrap_err();
    assert!(matches!(err, CounterError::UnavailableStore(_)));
    assert_eq!(
        service.store().inner.get("flutter.water_2024-03-05").unwrap(),
        Some(4)
    );
}

#[test]
fn failed_write_discards_value_and_next_apply_rederives() {
    let store = FlakyStore::new();
    store.inner.set("flutter.water_2024-03-05", 2).unwrap();
    let service = service_with(store);

    service.store().writes_fail.store(true, Ordering::SeqCst);
    let err = service.apply(TapDirection::Increment, today()).unwrap_err();
    assert!(matches!(err, CounterError::UnavailableStore(_)));
    assert_eq!(service.current_value(today()).unwrap().get(), 2);

    service.store().writes_fail.store(false, Ordering::SeqCst);
    assert_eq!(service.apply(TapDirection::Increment, today()).unwrap().get(), 3);
}

#[test]
fn failed_tap_leaves_displays_on_last_rendered_value() {
    let service = service_with(FlakyStore::new());
    let launcher = FakeLauncher::with_instances(&[11, 12]);

    service.handle_tap(TapEvent::increment(11), &launcher).unwrap();
    assert_eq!(launcher.label(12).as_deref(), Some("1"));

    service.store().writes_fail.store(true, Ordering::SeqCst);
    assert!(service.handle_tap(TapEvent::increment(11), &launcher).is_err());

    assert_eq!(launcher.label(11).as_deref(), Some("1"));
    assert_eq!(launcher.label(12).as_deref(), Some("1"));
}

#[test]
fn end_to_end_two_widgets_share_one_counter() {
    let service = service_with(MemoryCounterStore::new());
    let launcher = FakeLauncher::with_instances(&[1]);

    let values = (0..3)
        .map(|_| {
            service
                .handle_tap(TapEvent::increment(1), &launcher)
                .unwrap()
                .get()
        })
        .collect::<Vec<_>>();
    assert_eq!(values, vec![1, 2, 3]);

    launcher.placed.lock().unwrap().push(2);
    let views = service.refresh_all(&launcher.instance_ids()).unwrap();
    for view in views {
        launcher.update(view);
    }
    assert_eq!(launcher.label(1).as_deref(), Some("3"));
    assert_eq!(launcher.label(2).as_deref(), Some("3"));

    for _ in 0..9 {
        service.handle_tap(TapEvent::increment(2), &launcher).unwrap();
    }
    assert_eq!(launcher.label(1).as_deref(), Some("10"));

    let last = service.handle_tap(TapEvent::increment(1), &launcher).unwrap();
    assert_eq!(last.get(), 10);
    assert_eq!(launcher.label(2).as_deref(), Some("10"));
}

#[test]
fn rendered_regions_route_taps_back_to_their_instance() {
    let service = service_with(MemoryCounterStore::new());
    let view = service.render(42).unwrap();

    assert_eq!(view.label, "0");
    assert_eq!(view.increment.action, ACTION_INCREMENT);
    assert_eq!(view.decrement.action, ACTION_DECREMENT);
    assert_eq!(view.increment.tap_event(), TapEvent::increment(42));
    assert_eq!(view.decrement.tap_event(), TapEvent::decrement(42));
}

#[test]
fn inbox_drains_taps_from_several_dispatch_threads() {
    let service = service_with(MemoryCounterStore::new());
    let launcher = FakeLauncher::with_instances(&[5, 6]);
    let inbox = TapInbox::unbounded();

    thread::scope(|scope| {
        for instance in [5, 6] {
            let sender = inbox.sender();
            scope.spawn(move || {
                for _ in 0..3 {
                    assert!(sender.send_action(ACTION_INCREMENT, instance).unwrap());
                }
            });
        }
    });
    assert!(inbox.sender().send_action("bogus.ACTION", 5).is_err());

    let report = inbox.drain(&service, &launcher);
    assert_eq!(report.applied, 6);
    assert_eq!(report.failed, 0);
    assert_eq!(inbox.pending(), 0);
    assert_eq!(launcher.label(5).as_deref(), Some("6"));
    assert_eq!(launcher.label(6).as_deref(), Some("6"));
}

#[test]
fn widget_view_serializes_with_plain_value() {
    let service = service_with(MemoryCounterStore::new());
    service.apply(TapDirection::Increment, today()).unwrap();
    let view = service.render(3).unwrap();

    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["value"], 1);
    assert_eq!(json["label"], "1");
    assert_eq!(json["increment"]["direction"], "increment");
    assert_eq!(json["decrement"]["request_code"], 7);

    let decoded: WidgetView = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, view);
}
