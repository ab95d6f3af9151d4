//! Water counter domain model.
//!
//! # Responsibility
//! - Represent the bounded daily counter and its saturating transitions.
//! - Represent tap events delivered by the widget host.
//!
//! # Invariants
//! - `WaterCount` never leaves `WaterCount::MIN..=WaterCount::MAX`.
//! - Saturation is silent: stepping past a bound returns the bound.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Host action string bound to the increment region.
pub const ACTION_INCREMENT: &str = "com.mirpuertas.mediary.WATER_INC";
/// Host action string bound to the decrement region.
pub const ACTION_DECREMENT: &str = "com.mirpuertas.mediary.WATER_DEC";

/// Opaque widget id assigned by the host launcher.
pub type DisplayInstanceId = i32;

/// Bounded daily water intake counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct WaterCount(u8);

/// Error returned when a raw value is outside the counter range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaterCountRangeError(pub i64);

impl Display for WaterCountRangeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "water count {} is outside {}..={}",
            self.0,
            WaterCount::MIN.get(),
            WaterCount::MAX.get()
        )
    }
}

impl Error for WaterCountRangeError {}

impl WaterCount {
    pub const MIN: Self = Self(0);
    pub const MAX: Self = Self(10);

    /// Returns the counter as a plain integer.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Coerces a raw stored value into range.
    ///
    /// Returns the coerced count and whether clamping changed the value.
    /// The shared store may hold out-of-range legacy values written by other
    /// code paths; they are clamped rather than rejected.
    pub fn from_stored(raw: i64) -> (Self, bool) {
        let clamped = raw.clamp(i64::from(Self::MIN.0), i64::from(Self::MAX.0));
        // `clamped` is within 0..=10 here.
        (Self(clamped as u8), clamped != raw)
    }

    /// Applies one tap, saturating at the bounds.
    pub fn step(self, direction: TapDirection) -> Self {
        match direction {
            TapDirection::Increment => Self(self.0.saturating_add(1).min(Self::MAX.0)),
            TapDirection::Decrement => Self(self.0.saturating_sub(1)),
        }
    }
}

impl TryFrom<i64> for WaterCount {
    type Error = WaterCountRangeError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match Self::from_stored(value) {
            (count, false) => Ok(count),
            (_, true) => Err(WaterCountRangeError(value)),
        }
    }
}

impl From<WaterCount> for i64 {
    fn from(value: WaterCount) -> Self {
        i64::from(value.0)
    }
}

impl Display for WaterCount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction carried by a widget tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TapDirection {
    Increment,
    Decrement,
}

impl TapDirection {
    /// Parses a host action string.
    ///
    /// Returns `None` for any action other than the two widget actions.
    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            ACTION_INCREMENT => Some(Self::Increment),
            ACTION_DECREMENT => Some(Self::Decrement),
            _ => None,
        }
    }

    /// Returns the host action string bound to this direction.
    pub fn action(self) -> &'static str {
        match self {
            Self::Increment => ACTION_INCREMENT,
            Self::Decrement => ACTION_DECREMENT,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Increment => "inc",
            Self::Decrement => "dec",
        }
    }
}

/// One tap delivered by the host for a specific widget instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapEvent {
    pub direction: TapDirection,
    pub target: DisplayInstanceId,
}

impl TapEvent {
    pub fn new(direction: TapDirection, target: DisplayInstanceId) -> Self {
        Self { direction, target }
    }

    pub fn increment(target: DisplayInstanceId) -> Self {
        Self::new(TapDirection::Increment, target)
    }

    pub fn decrement(target: DisplayInstanceId) -> Self {
        Self::new(TapDirection::Decrement, target)
    }
}
