//! Full-screen dismiss flow for a ringing alarm.
//!
//! # Responsibility
//! - Own the ringing alarm's sound and vibration until the user dismisses.
//! - Hand over to journal capture after an explicit dismissal.
//!
//! # Invariants
//! - Only the dismiss action stops a ringing alarm; back navigation is
//!   ignored and no timeout exists.
//! - Navigation to journal capture happens at most once per flow.
//! - Teardown for any reason stops sound and vibration.
//! - `DismissSlot` keeps at most one live flow per device.

mod signals;

pub use signals::{sound_candidates, AlarmSignals};

use crate::model::alarm::AlarmId;
use crate::model::journal::JournalDraft;
use crate::platform::{
    Navigator, NotificationHost, SoundPlayer, SoundSource, Vibrator, ALARM_NOTIFICATION_ID,
};
use crate::schedule::payload::TimerPayload;
use chrono::{DateTime, TimeZone};
use log::{info, warn};
use std::fmt::Display;
use std::sync::Arc;

/// Host services a dismiss flow holds for its lifetime.
#[derive(Clone)]
pub struct DismissHosts {
    pub sound: Arc<dyn SoundPlayer>,
    pub vibrator: Arc<dyn Vibrator>,
    pub notifier: Arc<dyn NotificationHost>,
}

/// What the dismiss screen shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DismissScreen {
    /// Current time, `h:mm AM/PM`.
    pub current_time: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackNavigation {
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DismissOutcome {
    /// Signals stopped and journal capture opened with `draft`.
    Dismissed { draft: JournalDraft },
    /// Signals stopped but the host failed to open journal capture.
    DismissedWithoutNavigation { draft: JournalDraft, error: String },
    AlreadyDismissed,
}

pub struct DismissFlow {
    payload: TimerPayload,
    signals: AlarmSignals,
    notifier: Arc<dyn NotificationHost>,
    dismissed: bool,
}

impl DismissFlow {
    /// Presents the flow and starts the alarm sound.
    pub fn start(payload: TimerPayload, hosts: &DismissHosts) -> Self {
        info!(
            "event=dismiss_flow module=dismiss status=start alarm_id={}",
            payload.alarm_id
        );
        let signals = AlarmSignals::acquire(
            &payload,
            Arc::clone(&hosts.sound),
            Arc::clone(&hosts.vibrator),
        );
        Self {
            payload,
            signals,
            notifier: Arc::clone(&hosts.notifier),
            dismissed: false,
        }
    }

    pub fn alarm_id(&self) -> AlarmId {
        self.payload.alarm_id
    }

    pub fn payload(&self) -> &TimerPayload {
        &self.payload
    }

    pub fn is_ringing(&self) -> bool {
        !self.signals.is_released()
    }

    pub fn playing_sound(&self) -> Option<&SoundSource> {
        self.signals.playing()
    }

    pub fn screen<Tz>(&self, now: &DateTime<Tz>) -> DismissScreen
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        DismissScreen {
            current_time: now.format("%-I:%M %p").to_string(),
            label: self.payload.label.clone(),
        }
    }

    /// Back navigation never dismisses a ringing alarm.
    pub fn on_back_pressed(&self) -> BackNavigation {
        info!(
            "event=dismiss_flow module=dismiss status=back_ignored alarm_id={}",
            self.payload.alarm_id
        );
        BackNavigation::Ignored
    }

    /// User-initiated dismissal: stop signals, clear the notification, open
    /// journal capture once.
    pub fn dismiss(&mut self, navigator: &dyn Navigator) -> DismissOutcome {
        if self.dismissed {
            return DismissOutcome::AlreadyDismissed;
        }
        self.dismissed = true;
        self.signals.release();

        let alarm_id = self.payload.alarm_id;
        if let Err(err) = self.notifier.cancel(ALARM_NOTIFICATION_ID) {
            warn!(
                "event=dismiss_flow module=dismiss step=notification_cancel status=error alarm_id={alarm_id} error={err}"
            );
        }

        let draft = JournalDraft::for_alarm(&self.payload.label);
        match navigator.open_journal_capture(&draft) {
            Ok(()) => {
                info!("event=dismiss_flow module=dismiss status=dismissed alarm_id={alarm_id}");
                DismissOutcome::Dismissed { draft }
            }
            Err(err) => {
                warn!(
                    "event=dismiss_flow module=dismiss step=navigate status=error alarm_id={alarm_id} error={err}"
                );
                DismissOutcome::DismissedWithoutNavigation {
                    draft,
                    error: err.to_string(),
                }
            }
        }
    }
}

/// Device-wide holder of the single active dismiss flow.
#[derive(Default)]
pub struct DismissSlot {
    active: Option<DismissFlow>,
}

impl DismissSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tears down any active flow, then starts one for `payload`.
    pub fn present(&mut self, payload: TimerPayload, hosts: &DismissHosts) -> &mut DismissFlow {
        if let Some(previous) = self.active.take() {
            info!(
                "event=dismiss_flow module=dismiss status=replaced alarm_id={} by_alarm_id={}",
                previous.alarm_id(),
                payload.alarm_id
            );
            drop(previous);
        }
        self.active.insert(DismissFlow::start(payload, hosts))
    }

    pub fn active(&mut self) -> Option<&mut DismissFlow> {
        self.active.as_mut()
    }

    pub fn active_alarm_id(&self) -> Option<AlarmId> {
        self.active.as_ref().map(DismissFlow::alarm_id)
    }

    /// Dismisses and closes the active flow.
    pub fn dismiss(&mut self, navigator: &dyn Navigator) -> Option<DismissOutcome> {
        let mut flow = self.active.take()?;
        Some(flow.dismiss(navigator))
    }

    /// Forced teardown without a dismissal; signals are still stopped.
    pub fn teardown(&mut self) -> Option<AlarmId> {
        let flow = self.active.take()?;
        let alarm_id = flow.alarm_id();
        info!("event=dismiss_flow module=dismiss status=torn_down alarm_id={alarm_id}");
        Some(alarm_id)
    }
}
