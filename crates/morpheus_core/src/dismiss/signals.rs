//! Scoped ownership of alarm sound and vibration.
//!
//! # Invariants
//! - Signals are released exactly once: on explicit `release`, or on drop
//!   for every other exit path, unwinding included.
//! - Release never fails and never panics; host failures are logged as
//!   `resource_cleanup_failure` and swallowed.

use crate::platform::{PlatformResult, SoundPlayer, SoundSource, Vibrator};
use crate::schedule::payload::TimerPayload;
use log::{info, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Sound candidates for an alarm, in resolution order.
pub fn sound_candidates(ringtone_ref: Option<&str>) -> Vec<SoundSource> {
    let mut candidates = Vec::with_capacity(3);
    if let Some(reference) = ringtone_ref.map(str::trim).filter(|value| !value.is_empty()) {
        candidates.push(SoundSource::Ringtone(reference.to_string()));
    }
    candidates.push(SoundSource::DefaultAlarm);
    candidates.push(SoundSource::DefaultNotification);
    candidates
}

/// Guard over the sound and vibration of one ringing alarm.
pub struct AlarmSignals {
    sound: Arc<dyn SoundPlayer>,
    vibrator: Option<Arc<dyn Vibrator>>,
    playing: Option<SoundSource>,
    released: bool,
}

impl AlarmSignals {
    /// Starts the first resolvable sound and takes ownership of the
    /// vibration started by the firing handler, when the alarm vibrates.
    pub fn acquire(
        payload: &TimerPayload,
        sound: Arc<dyn SoundPlayer>,
        vibrator: Arc<dyn Vibrator>,
    ) -> Self {
        let playing = start_sound(payload, sound.as_ref());
        Self {
            sound,
            vibrator: payload.vibrate.then_some(vibrator),
            playing,
            released: false,
        }
    }

    /// Source currently playing, `None` when no candidate resolved.
    pub fn playing(&self) -> Option<&SoundSource> {
        self.playing.as_ref()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Stops sound and vibration. Idempotent.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if self.playing.take().is_some() {
            swallow("sound_stop", || self.sound.stop());
        }
        if let Some(vibrator) = self.vibrator.take() {
            swallow("vibration_stop", || vibrator.cancel());
        }
    }
}

impl Drop for AlarmSignals {
    fn drop(&mut self) {
        self.release();
    }
}

fn start_sound(payload: &TimerPayload, player: &dyn SoundPlayer) -> Option<SoundSource> {
    for source in sound_candidates(payload.ringtone_ref.as_deref()) {
        let Some(resolved) = player.resolve(&source) else {
            continue;
        };
        return match player.play(&resolved) {
            Ok(()) => {
                info!(
                    "event=alarm_sound module=dismiss status=playing alarm_id={} source={}",
                    payload.alarm_id, kind(&source)
                );
                Some(source)
            }
            Err(err) => {
                warn!(
                    "event=alarm_sound module=dismiss status=error alarm_id={} error={err}",
                    payload.alarm_id
                );
                None
            }
        };
    }
    warn!(
        "event=alarm_sound module=dismiss status=unresolved alarm_id={}",
        payload.alarm_id
    );
    None
}

fn kind(source: &SoundSource) -> &'static str {
    match source {
        SoundSource::Ringtone(_) => "ringtone",
        SoundSource::DefaultAlarm => "default_alarm",
        SoundSource::DefaultNotification => "default_notification",
    }
}

fn swallow(step: &'static str, action: impl FnOnce() -> PlatformResult<()>) {
    match catch_unwind(AssertUnwindSafe(action)) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(
            "event=resource_cleanup_failure module=dismiss step={step} error={err}"
        ),
        Err(_) => warn!("event=resource_cleanup_failure module=dismiss step={step} panic=true"),
    }
}

#[cfg(test)]
mod tests {
    use super::sound_candidates;
    use crate::platform::SoundSource;

    #[test]
    fn candidates_prefer_alarm_ringtone_then_system_defaults() {
        assert_eq!(
            sound_candidates(Some("content://tones/3")),
            vec![
                SoundSource::Ringtone("content://tones/3".to_string()),
                SoundSource::DefaultAlarm,
                SoundSource::DefaultNotification,
            ]
        );
    }

    #[test]
    fn blank_ringtone_reference_is_ignored() {
        assert_eq!(
            sound_candidates(Some("  ")),
            vec![SoundSource::DefaultAlarm, SoundSource::DefaultNotification]
        );
        assert_eq!(sound_candidates(None).len(), 2);
    }
}
