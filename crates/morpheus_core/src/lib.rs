//! Core domain logic for Morpheus, an alarm clock with a dream journal.
//! Host platforms plug in through the traits in [`platform`].

pub mod config;
pub mod db;
pub mod dismiss;
pub mod firing;
pub mod logging;
pub mod model;
pub mod platform;
pub mod repo;
pub mod schedule;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use dismiss::{DismissFlow, DismissHosts, DismissOutcome, DismissSlot};
pub use firing::{FiringHandler, FiringReport, StepOutcome};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::alarm::{Alarm, AlarmId, AlarmValidationError};
pub use model::journal::{JournalDraft, JournalEntry, JournalEntryId, JournalValidationError};
pub use platform::{PlatformError, WakeTimer, WakeTimerHost};
pub use repo::alarm_repo::{AlarmStore, SqliteAlarmStore};
pub use repo::journal_repo::{JournalRepository, SqliteJournalRepository};
pub use repo::{RepoError, RepoResult};
pub use schedule::clock::{Clock, FixedClock, SystemClock};
pub use schedule::payload::TimerPayload;
pub use schedule::scheduler::AlarmScheduler;
pub use schedule::trigger::{compute_next_trigger, compute_next_trigger_ms};
pub use schedule::{ScheduleError, ScheduleResult, ScheduledTimer, TimerState};
pub use service::alarm_service::{
    AlarmService, AlarmServiceError, AlarmServiceResult, CreateAlarmRequest, RecurrencePolicy,
};
pub use service::journal_service::{JournalService, JournalServiceError};
pub use service::worker::AlarmWorker;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
