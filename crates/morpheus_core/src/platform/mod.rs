//! Host collaborator contracts.
//!
//! # Responsibility
//! - Describe the narrow platform services the alarm core drives: wake-up
//!   timers, notifications, vibration, sound playback and navigation.
//! - Keep the core free of any concrete mobile OS API.
//!
//! # Invariants
//! - Host traits are `Send + Sync`; implementations use interior mutability.
//! - `WakeTimerHost::register` replaces any live registration for the same
//!   alarm id.
//! - Stopping sound or vibration that is not active is not an error.

use crate::model::alarm::AlarmId;
use crate::model::journal::JournalDraft;
use crate::schedule::payload::TimerPayload;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub mod recording;

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Failure reported by a host service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformError(pub String);

impl PlatformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl Display for PlatformError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "platform failure: {}", self.0)
    }
}

impl Error for PlatformError {}

/// One-shot, idle-tolerant wake-up registration keyed by alarm id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WakeTimer {
    pub alarm_id: AlarmId,
    /// Absolute trigger instant in epoch milliseconds.
    pub trigger_at_ms: i64,
    pub payload: TimerPayload,
}

pub trait WakeTimerHost: Send + Sync {
    /// Whether the host currently grants precise wake timers.
    fn can_schedule_exact(&self) -> bool;
    /// Registers `timer`, replacing any registration for the same alarm id.
    fn register(&self, timer: WakeTimer) -> PlatformResult<()>;
    /// Drops the registration for `alarm_id`; returns whether one was live.
    fn unregister(&self, alarm_id: AlarmId) -> bool;
}

impl<H: WakeTimerHost + ?Sized> WakeTimerHost for Arc<H> {
    fn can_schedule_exact(&self) -> bool {
        (**self).can_schedule_exact()
    }

    fn register(&self, timer: WakeTimer) -> PlatformResult<()> {
        (**self).register(timer)
    }

    fn unregister(&self, alarm_id: AlarmId) -> bool {
        (**self).unregister(alarm_id)
    }
}

pub const ALARM_CHANNEL_ID: &str = "alarm_channel";
pub const ALARM_CHANNEL_NAME: &str = "Alarm Notifications";
/// Single notification slot used for ringing alarms.
pub const ALARM_NOTIFICATION_ID: i32 = 1001;
pub const CAPTURE_DREAM_ACTION_LABEL: &str = "Capture Dream";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Default,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Alarm,
    Reminder,
}

/// Direct action shown on the notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub label: String,
    pub target: JournalDraft,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmNotification {
    pub id: i32,
    pub channel_id: String,
    pub title: String,
    pub text: String,
    pub priority: NotificationPriority,
    pub category: NotificationCategory,
    /// Full-screen presentation used when the device is locked.
    pub full_screen: Option<TimerPayload>,
    /// Target opened when the notification body is tapped.
    pub content_target: JournalDraft,
    pub actions: Vec<NotificationAction>,
    pub auto_cancel: bool,
}

pub trait NotificationHost: Send + Sync {
    /// Creates the alarm notification channel; repeated calls are no-ops.
    fn ensure_alarm_channel(&self) -> PlatformResult<()>;
    /// Whether the user allows this app to post notifications.
    fn notifications_permitted(&self) -> bool;
    fn post(&self, notification: &AlarmNotification) -> PlatformResult<()>;
    fn cancel(&self, notification_id: i32) -> PlatformResult<()>;
}

/// Waveform in milliseconds: delay, on, off, ... repeated from `repeat_from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VibrationPattern {
    pub timings_ms: Vec<u64>,
    /// Index to loop back to; `None` plays once.
    pub repeat_from: Option<usize>,
}

impl VibrationPattern {
    /// Alarm waveform: no delay, 1s on, 1s off, repeating indefinitely.
    pub fn alarm() -> Self {
        Self {
            timings_ms: vec![0, 1000, 1000],
            repeat_from: Some(0),
        }
    }

    pub fn repeats(&self) -> bool {
        self.repeat_from.is_some()
    }
}

pub trait Vibrator: Send + Sync {
    fn start_pattern(&self, pattern: &VibrationPattern) -> PlatformResult<()>;
    fn cancel(&self) -> PlatformResult<()>;
}

/// Sound candidates in resolution order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundSource {
    Ringtone(String),
    DefaultAlarm,
    DefaultNotification,
}

/// Sound the host managed to resolve to something playable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSound {
    pub source: SoundSource,
    pub uri: String,
}

pub trait SoundPlayer: Send + Sync {
    /// Resolves `source` to a playable sound, `None` when unavailable.
    fn resolve(&self, source: &SoundSource) -> Option<ResolvedSound>;
    fn play(&self, sound: &ResolvedSound) -> PlatformResult<()>;
    fn stop(&self) -> PlatformResult<()>;
}

/// Presents the full-screen dismiss flow, cold-starting the UI if needed.
pub trait DismissLauncher: Send + Sync {
    fn launch(&self, payload: &TimerPayload) -> PlatformResult<()>;
}

/// UI navigation out of the dismiss flow.
pub trait Navigator: Send + Sync {
    fn open_journal_capture(&self, draft: &JournalDraft) -> PlatformResult<()>;
}
