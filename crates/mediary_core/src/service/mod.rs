//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store access into counter use-cases.
//! - Keep FFI and host layers decoupled from storage details.

pub mod counter_sync;
pub mod tap_inbox;
