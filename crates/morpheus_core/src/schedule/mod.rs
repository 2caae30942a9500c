//! Alarm scheduling: trigger computation and wake-up timer registration.
//!
//! # Responsibility
//! - Compute the next absolute trigger instant for an alarm.
//! - Keep exactly one wake-up registration per enabled alarm id.
//!
//! # Invariants
//! - Scheduling never falls back to an inexact timer; missing precise-timer
//!   permission fails with `ScheduleError::PermissionDenied`.
//! - `cancel` is idempotent.

use crate::model::alarm::{AlarmId, AlarmValidationError};
use crate::platform::PlatformError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod clock;
pub mod payload;
pub mod scheduler;
pub mod trigger;

pub type ScheduleResult<T> = Result<T, ScheduleError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Precise wake timers are not granted; the user must enable
    /// "Alarms & reminders" in system settings.
    PermissionDenied,
    /// The alarm has no store-assigned id yet.
    Unpersisted,
    InvalidAlarm(AlarmValidationError),
    /// The wall-clock time could not be resolved in the local time zone.
    UnresolvableTrigger { hour_of_day: u8, minute: u8 },
    /// Host refused the registration.
    Host(PlatformError),
}

impl ScheduleError {
    /// Whether the user can fix this in system settings.
    pub fn needs_settings_remediation(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }
}

impl Display for ScheduleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(
                f,
                "exact alarm permission not granted; enable 'Alarms & reminders' in app settings"
            ),
            Self::Unpersisted => write!(f, "alarm must be persisted before scheduling"),
            Self::InvalidAlarm(err) => write!(f, "{err}"),
            Self::UnresolvableTrigger {
                hour_of_day,
                minute,
            } => write!(
                f,
                "unable to resolve local trigger time {hour_of_day:02}:{minute:02}"
            ),
            Self::Host(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ScheduleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidAlarm(err) => Some(err),
            Self::Host(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AlarmValidationError> for ScheduleError {
    fn from(value: AlarmValidationError) -> Self {
        Self::InvalidAlarm(value)
    }
}

impl From<PlatformError> for ScheduleError {
    fn from(value: PlatformError) -> Self {
        Self::Host(value)
    }
}

/// Per-id registration state tracked by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Unscheduled,
    Scheduled { trigger_at_ms: i64 },
    /// The host delivered the timer; no registration is live.
    Fired,
}

/// Outcome of a successful `schedule` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTimer {
    pub alarm_id: AlarmId,
    pub trigger_at_ms: i64,
    /// Whether this scheduler instance already held a live registration
    /// for the id. Tracks in-process state only; a scheduler rebuilt per
    /// call (as over FFI) always reports `false`.
    pub replaced: bool,
}
