//! Day-scoped storage key scheme.
//!
//! # Responsibility
//! - Map a calendar date to the preference key shared with the Flutter app.
//!
//! # Invariants
//! - Keys are `flutter.water_YYYY-MM-DD` with zero padding, so keys for
//!   years `0..=9999` sort lexicographically in calendar order.
//! - The mapping is pure: the same date always yields the same key.

use chrono::{Datelike, NaiveDate};
use std::fmt::{Display, Formatter};

/// Preference key prefix. The Flutter `shared_preferences` plugin prepends
/// `flutter.` to every key written from Dart.
pub const WATER_KEY_PREFIX: &str = "flutter.water_";

/// Storage key for one day's water counter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(String);

impl DayKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DayKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves the storage key for `date`.
pub fn resolve(date: NaiveDate) -> DayKey {
    DayKey(format!(
        "{WATER_KEY_PREFIX}{:04}-{:02}-{:02}",
        date.year(),
        date.month(),
        date.day()
    ))
}
