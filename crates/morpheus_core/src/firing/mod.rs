//! Fired-timer entry point.
//!
//! # Responsibility
//! - React to a matured wake-up timer: notification channel, vibration,
//!   alarm notification, dismiss flow launch.
//!
//! # Invariants
//! - Each step is best-effort; a failed or panicking step never prevents
//!   the next one and never escapes the handler.
//! - The handler reads nothing but its payload, so it works while the
//!   store is unavailable or the app is cold-starting.
//! - A denied notification permission degrades to sound, vibration and the
//!   dismiss flow without a visible notification.

mod notification;

pub use notification::alarm_notification;

use crate::model::alarm::AlarmId;
use crate::platform::{DismissLauncher, NotificationHost, PlatformResult, VibrationPattern, Vibrator};
use crate::schedule::payload::TimerPayload;
use log::{error, info, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Why a step did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    VibrationDisabled,
    NotificationDenied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Done,
    Skipped(SkipReason),
    Failed(String),
}

impl StepOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Per-step outcome of one fired timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiringReport {
    pub alarm_id: AlarmId,
    pub channel: StepOutcome,
    pub vibration: StepOutcome,
    pub notification: StepOutcome,
    pub dismiss_launch: StepOutcome,
}

impl FiringReport {
    /// Whether the user is guaranteed to see the dismiss flow.
    pub fn dismiss_launched(&self) -> bool {
        self.dismiss_launch.is_done()
    }
}

/// Self-contained handler built per fired timer.
pub struct FiringHandler<'a> {
    notifier: &'a dyn NotificationHost,
    vibrator: &'a dyn Vibrator,
    launcher: &'a dyn DismissLauncher,
}

impl<'a> FiringHandler<'a> {
    pub fn new(
        notifier: &'a dyn NotificationHost,
        vibrator: &'a dyn Vibrator,
        launcher: &'a dyn DismissLauncher,
    ) -> Self {
        Self {
            notifier,
            vibrator,
            launcher,
        }
    }

    /// Runs every firing step for `payload` in order.
    pub fn on_timer_fired(&self, payload: &TimerPayload) -> FiringReport {
        let alarm_id = payload.alarm_id;
        info!("event=alarm_fired module=firing status=start alarm_id={alarm_id}");

        let channel = run_step(alarm_id, "channel", || self.notifier.ensure_alarm_channel());

        let vibration = if payload.vibrate {
            run_step(alarm_id, "vibration", || {
                self.vibrator.start_pattern(&VibrationPattern::alarm())
            })
        } else {
            StepOutcome::Skipped(SkipReason::VibrationDisabled)
        };

        let notification = if self.notifications_permitted() {
            let notification = alarm_notification(payload);
            run_step(alarm_id, "notification", || self.notifier.post(&notification))
        } else {
            warn!(
                "event=alarm_fired module=firing step=notification status=skipped alarm_id={alarm_id} reason=notification_denied"
            );
            StepOutcome::Skipped(SkipReason::NotificationDenied)
        };

        let dismiss_launch = run_step(alarm_id, "dismiss_launch", || self.launcher.launch(payload));

        info!(
            "event=alarm_fired module=firing status=done alarm_id={alarm_id} dismiss_launched={}",
            dismiss_launch.is_done()
        );
        FiringReport {
            alarm_id,
            channel,
            vibration,
            notification,
            dismiss_launch,
        }
    }

    fn notifications_permitted(&self) -> bool {
        catch_unwind(AssertUnwindSafe(|| self.notifier.notifications_permitted())).unwrap_or(false)
    }
}

fn run_step(
    alarm_id: AlarmId,
    step: &'static str,
    action: impl FnOnce() -> PlatformResult<()>,
) -> StepOutcome {
    match catch_unwind(AssertUnwindSafe(action)) {
        Ok(Ok(())) => StepOutcome::Done,
        Ok(Err(err)) => {
            error!(
                "event=alarm_fired module=firing step={step} status=error alarm_id={alarm_id} error={err}"
            );
            StepOutcome::Failed(err.to_string())
        }
        Err(_) => {
            error!(
                "event=alarm_fired module=firing step={step} status=panic alarm_id={alarm_id}"
            );
            StepOutcome::Failed(format!("{step} step panicked"))
        }
    }
}
