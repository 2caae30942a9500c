//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store writes and timer registrations into use-case APIs.
//! - Keep UI/FFI layers decoupled from storage and host details.

pub mod alarm_service;
pub mod journal_service;
pub mod worker;
