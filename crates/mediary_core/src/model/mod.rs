//! Domain model for the daily water counter and its home-screen widget.
//!
//! # Responsibility
//! - Define the bounded counter value and tap direction types.
//! - Derive day-scoped storage keys shared with the Flutter application.
//! - Describe the rendered widget content handed back to the host.
//!
//! # Invariants
//! - A `WaterCount` is always within `0..=10`.
//! - Storage keys are a pure function of the calendar date.

pub mod clock;
pub mod day_key;
pub mod view;
pub mod water;
