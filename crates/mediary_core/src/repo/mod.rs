//! Persistence contracts and implementations for the shared counter store.
//!
//! # Responsibility
//! - Define the single-key access pattern the counter imposes on storage.
//! - Isolate SQLite query details from the sync service.
//!
//! # Invariants
//! - Store failures are reported as errors, never as absent keys.
//! - `compare_and_set` is atomic with respect to every other store call.

pub mod counter_store;
