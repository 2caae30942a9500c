//! Host adapter that turns core platform calls into actions for Dart.
//!
//! # Responsibility
//! - Implement every core platform trait by queueing a `PlatformAction`.
//! - Carry the permission and availability facts Dart reports per call.
//!
//! # Invariants
//! - No call fails; the queue only records intent.
//! - `drain` returns actions in the order core issued them.

use crate::api::PlatformAction;
use morpheus_core::platform::{
    AlarmNotification, DismissLauncher, Navigator, NotificationHost, PlatformResult,
    ResolvedSound, SoundPlayer, SoundSource, VibrationPattern, Vibrator, WakeTimer,
    WakeTimerHost, ALARM_CHANNEL_ID, ALARM_CHANNEL_NAME,
};
use morpheus_core::{AlarmId, JournalDraft, TimerPayload};
use log::warn;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

const DEFAULT_ALARM_SOUND_URI: &str = "system://alarm";
const DEFAULT_NOTIFICATION_SOUND_URI: &str = "system://notification";

#[derive(Debug)]
pub(crate) struct ActionQueue {
    exact_permitted: AtomicBool,
    notifications_permitted: AtomicBool,
    ringtone_available: AtomicBool,
    actions: Mutex<Vec<PlatformAction>>,
}

impl ActionQueue {
    pub(crate) fn new() -> Self {
        Self {
            exact_permitted: AtomicBool::new(true),
            notifications_permitted: AtomicBool::new(true),
            ringtone_available: AtomicBool::new(true),
            actions: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_exact_permission(self, permitted: bool) -> Self {
        self.exact_permitted.store(permitted, Ordering::SeqCst);
        self
    }

    pub(crate) fn with_notification_permission(self, permitted: bool) -> Self {
        self.notifications_permitted.store(permitted, Ordering::SeqCst);
        self
    }

    pub(crate) fn set_ringtone_available(&self, available: bool) {
        self.ringtone_available.store(available, Ordering::SeqCst);
    }

    pub(crate) fn drain(&self) -> Vec<PlatformAction> {
        std::mem::take(&mut *self.guard())
    }

    fn push(&self, action: PlatformAction) {
        self.guard().push(action);
    }

    fn guard(&self) -> MutexGuard<'_, Vec<PlatformAction>> {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// JSON form of `payload` handed to the host; an encoding failure is logged
/// and yields an id-only payload the core can still decode.
pub(crate) fn payload_json(payload: &TimerPayload) -> String {
    payload.to_json().unwrap_or_else(|err| {
        warn!(
            "event=payload_encode module=ffi status=error alarm_id={} error={err}",
            payload.alarm_id
        );
        format!("{{\"alarm_id\":{}}}", payload.alarm_id)
    })
}

impl WakeTimerHost for ActionQueue {
    fn can_schedule_exact(&self) -> bool {
        self.exact_permitted.load(Ordering::SeqCst)
    }

    fn register(&self, timer: WakeTimer) -> PlatformResult<()> {
        self.push(PlatformAction::ScheduleWakeTimer {
            alarm_id: timer.alarm_id,
            trigger_at_ms: timer.trigger_at_ms,
            payload_json: payload_json(&timer.payload),
        });
        Ok(())
    }

    fn unregister(&self, alarm_id: AlarmId) -> bool {
        self.push(PlatformAction::CancelWakeTimer { alarm_id });
        // Unknown on this side; the host treats a missing timer as a no-op.
        false
    }
}

impl NotificationHost for ActionQueue {
    fn ensure_alarm_channel(&self) -> PlatformResult<()> {
        self.push(PlatformAction::EnsureAlarmChannel {
            channel_id: ALARM_CHANNEL_ID.to_string(),
            name: ALARM_CHANNEL_NAME.to_string(),
        });
        Ok(())
    }

    fn notifications_permitted(&self) -> bool {
        self.notifications_permitted.load(Ordering::SeqCst)
    }

    fn post(&self, notification: &AlarmNotification) -> PlatformResult<()> {
        let action = notification.actions.first();
        self.push(PlatformAction::PostNotification {
            notification_id: notification.id,
            channel_id: notification.channel_id.clone(),
            title: notification.title.clone(),
            text: notification.text.clone(),
            full_screen_payload_json: notification.full_screen.as_ref().map(payload_json),
            action_label: action.map(|a| a.label.clone()),
            capture_title: notification.content_target.title.clone(),
        });
        Ok(())
    }

    fn cancel(&self, notification_id: i32) -> PlatformResult<()> {
        self.push(PlatformAction::CancelNotification { notification_id });
        Ok(())
    }
}

impl Vibrator for ActionQueue {
    fn start_pattern(&self, pattern: &VibrationPattern) -> PlatformResult<()> {
        self.push(PlatformAction::StartVibration {
            timings_ms: pattern.timings_ms.clone(),
            repeat_from: pattern
                .repeat_from
                .and_then(|index| u32::try_from(index).ok()),
        });
        Ok(())
    }

    fn cancel(&self) -> PlatformResult<()> {
        self.push(PlatformAction::CancelVibration);
        Ok(())
    }
}

impl SoundPlayer for ActionQueue {
    fn resolve(&self, source: &SoundSource) -> Option<ResolvedSound> {
        let uri = match source {
            SoundSource::Ringtone(reference) => {
                if !self.ringtone_available.load(Ordering::SeqCst) {
                    return None;
                }
                reference.clone()
            }
            SoundSource::DefaultAlarm => DEFAULT_ALARM_SOUND_URI.to_string(),
            SoundSource::DefaultNotification => DEFAULT_NOTIFICATION_SOUND_URI.to_string(),
        };
        Some(ResolvedSound {
            source: source.clone(),
            uri,
        })
    }

    fn play(&self, sound: &ResolvedSound) -> PlatformResult<()> {
        self.push(PlatformAction::PlaySound {
            uri: sound.uri.clone(),
        });
        Ok(())
    }

    fn stop(&self) -> PlatformResult<()> {
        self.push(PlatformAction::StopSound);
        Ok(())
    }
}

impl DismissLauncher for ActionQueue {
    fn launch(&self, payload: &TimerPayload) -> PlatformResult<()> {
        self.push(PlatformAction::LaunchDismiss {
            payload_json: payload_json(payload),
        });
        Ok(())
    }
}

impl Navigator for ActionQueue {
    fn open_journal_capture(&self, draft: &JournalDraft) -> PlatformResult<()> {
        self.push(PlatformAction::OpenJournalCapture {
            title: draft.title.clone(),
        });
        Ok(())
    }
}
