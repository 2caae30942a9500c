//! Alarm domain model.
//!
//! # Responsibility
//! - Define the canonical alarm record shared by store, scheduler and FFI.
//! - Validate wall-clock fields before any persistence or scheduling.
//!
//! # Invariants
//! - `hour_of_day` is in `0..=23`, `minute` is in `0..=59`.
//! - `id == UNASSIGNED_ALARM_ID` until the store assigns one on insert.
//! - A persisted id is never reused for another alarm.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned alarm identity.
pub type AlarmId = i64;

/// Placeholder id carried by alarms that were not persisted yet.
pub const UNASSIGNED_ALARM_ID: AlarmId = 0;

/// Label used when the user leaves the label blank.
pub const DEFAULT_ALARM_LABEL: &str = "Wake up";

/// One alarm definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    /// Store-assigned id; `UNASSIGNED_ALARM_ID` before insert.
    pub id: AlarmId,
    /// Hour in 24h clock, `0..=23`.
    pub hour_of_day: u8,
    /// Minute, `0..=59`.
    pub minute: u8,
    /// Enabled alarms own exactly one live wake-up registration.
    pub is_enabled: bool,
    pub label: String,
    pub vibrate: bool,
    /// Host sound reference. `None` means the system default alarm sound.
    pub ringtone_ref: Option<String>,
}

impl Alarm {
    /// Creates an unpersisted, enabled alarm with vibration on and the
    /// default sound.
    pub fn new(hour_of_day: u8, minute: u8, label: impl Into<String>) -> Self {
        Self {
            id: UNASSIGNED_ALARM_ID,
            hour_of_day,
            minute,
            is_enabled: true,
            label: label.into(),
            vibrate: true,
            ringtone_ref: None,
        }
    }

    /// Returns a copy carrying the store-assigned id.
    pub fn with_id(mut self, id: AlarmId) -> Self {
        self.id = id;
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.id != UNASSIGNED_ALARM_ID
    }

    /// Validates wall-clock and label invariants.
    ///
    /// # Errors
    /// - `InvalidHour` / `InvalidMinute` for out-of-range clock values.
    /// - `EmptyLabel` when the label is blank after trimming.
    pub fn validate(&self) -> Result<(), AlarmValidationError> {
        if self.hour_of_day > 23 {
            return Err(AlarmValidationError::InvalidHour(self.hour_of_day));
        }
        if self.minute > 59 {
            return Err(AlarmValidationError::InvalidMinute(self.minute));
        }
        if self.label.trim().is_empty() {
            return Err(AlarmValidationError::EmptyLabel);
        }
        Ok(())
    }

    /// Wall-clock time of day at second zero, or `None` when out of range.
    pub fn wall_clock(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(u32::from(self.hour_of_day), u32::from(self.minute), 0)
    }
}

/// Normalizes user label input; blank input falls back to the default label.
pub fn normalize_label(label: &str) -> String {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        DEFAULT_ALARM_LABEL.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Validation failures for alarm records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmValidationError {
    InvalidHour(u8),
    InvalidMinute(u8),
    EmptyLabel,
}

impl Display for AlarmValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidHour(value) => write!(f, "hour_of_day must be in 0..=23, got {value}"),
            Self::InvalidMinute(value) => write!(f, "minute must be in 0..=59, got {value}"),
            Self::EmptyLabel => write!(f, "alarm label must not be empty"),
        }
    }
}

impl Error for AlarmValidationError {}
