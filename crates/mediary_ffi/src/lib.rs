//! Flutter-facing bindings for the Mediary water widget core.

pub mod api;
