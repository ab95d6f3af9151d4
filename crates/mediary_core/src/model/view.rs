//! Rendered widget content returned to the host.
//!
//! # Responsibility
//! - Carry the label text and the two tappable regions for one instance.
//!
//! # Invariants
//! - Region request codes are 32-bit like the host's slot: `target * 2` for
//!   increment and `target * 2 + 1` for decrement, wrapping on overflow.
//!   They are unique per `(instance, direction)` for ids in `-2^30..2^30`.

use crate::model::water::{DisplayInstanceId, TapDirection, TapEvent, WaterCount};
use serde::{Deserialize, Serialize};

/// One tappable region bound to a future tap on a specific instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapRegion {
    pub direction: TapDirection,
    pub target: DisplayInstanceId,
    /// Host action string delivered back with the tap.
    pub action: String,
    /// Host-side request code; `target * 2` for increment, `+ 1` for decrement.
    pub request_code: i32,
}

impl TapRegion {
    pub fn new(direction: TapDirection, target: DisplayInstanceId) -> Self {
        Self {
            direction,
            target,
            action: direction.action().to_string(),
            request_code: request_code(direction, target),
        }
    }

    /// Tap event the host should deliver when this region is pressed.
    pub fn tap_event(&self) -> TapEvent {
        TapEvent::new(self.direction, self.target)
    }
}

/// Complete visual content for one widget instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetView {
    pub instance: DisplayInstanceId,
    pub value: WaterCount,
    /// Decimal label shown on the widget.
    pub label: String,
    pub increment: TapRegion,
    pub decrement: TapRegion,
}

impl WidgetView {
    pub fn new(instance: DisplayInstanceId, value: WaterCount) -> Self {
        Self {
            instance,
            value,
            label: value.to_string(),
            increment: TapRegion::new(TapDirection::Increment, instance),
            decrement: TapRegion::new(TapDirection::Decrement, instance),
        }
    }
}

fn request_code(direction: TapDirection, target: DisplayInstanceId) -> i32 {
    let base = target.wrapping_mul(2);
    match direction {
        TapDirection::Increment => base,
        TapDirection::Decrement => base.wrapping_add(1),
    }
}
