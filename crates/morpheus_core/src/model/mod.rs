//! Domain model for alarms and dream-journal entries.
//!
//! # Responsibility
//! - Define the records persisted by the core store.
//! - Keep wall-clock validation next to the data it guards.
//!
//! # Invariants
//! - Every persisted record is identified by a store-assigned integer id.
//! - Alarm hour/minute values are always valid wall-clock values.

pub mod alarm;
pub mod journal;
