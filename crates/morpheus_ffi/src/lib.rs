//! Flutter-facing bindings over `morpheus_core`.

pub mod api;
mod host;
