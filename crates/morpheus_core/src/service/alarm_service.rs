//! Alarm use-case service.
//!
//! # Responsibility
//! - Sequence store mutations with scheduler calls for one alarm at a time.
//! - Roll back store writes whose scheduling step failed.
//!
//! # Invariants
//! - Create is insert-then-schedule; a failed schedule deletes the record.
//! - An enabled alarm ends every successful call with one live registration;
//!   a disabled or deleted alarm with none.
//! - Enabling re-schedules from the current clock, never from creation time.

use crate::model::alarm::{normalize_label, Alarm, AlarmId, UNASSIGNED_ALARM_ID};
use crate::platform::WakeTimerHost;
use crate::repo::alarm_repo::{AlarmListener, AlarmStore};
use crate::repo::observer::Subscription;
use crate::repo::{RepoError, RepoResult};
use crate::schedule::clock::Clock;
use crate::schedule::scheduler::AlarmScheduler;
use crate::schedule::ScheduleError;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// What happens to an alarm after its timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrencePolicy {
    /// Fire once, then persist the alarm as disabled.
    #[default]
    OneShot,
    /// Re-arm for the next day while the alarm stays enabled.
    Daily,
}

/// Request model for creating an alarm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAlarmRequest {
    pub hour_of_day: u8,
    pub minute: u8,
    /// Blank input falls back to the default label.
    pub label: String,
    pub vibrate: bool,
    pub ringtone_ref: Option<String>,
}

impl CreateAlarmRequest {
    /// Request with vibration on and the default sound.
    pub fn new(hour_of_day: u8, minute: u8, label: impl Into<String>) -> Self {
        Self {
            hour_of_day,
            minute,
            label: label.into(),
            vibrate: true,
            ringtone_ref: None,
        }
    }
}

#[derive(Debug)]
pub enum AlarmServiceError {
    Store(RepoError),
    Schedule(ScheduleError),
    NotFound(AlarmId),
    /// The background worker is gone.
    WorkerStopped,
}

impl AlarmServiceError {
    /// Whether the UI should offer a shortcut to the exact-alarm settings.
    pub fn needs_settings_remediation(&self) -> bool {
        matches!(self, Self::Schedule(err) if err.needs_settings_remediation())
    }

    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_store_unavailable())
    }
}

impl Display for AlarmServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Schedule(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "alarm not found: {id}"),
            Self::WorkerStopped => write!(f, "alarm worker is not running"),
        }
    }
}

impl Error for AlarmServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Schedule(err) => Some(err),
            Self::NotFound(_) | Self::WorkerStopped => None,
        }
    }
}

impl From<RepoError> for AlarmServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::AlarmNotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

impl From<ScheduleError> for AlarmServiceError {
    fn from(value: ScheduleError) -> Self {
        Self::Schedule(value)
    }
}

pub type AlarmServiceResult<T> = Result<T, AlarmServiceError>;

/// Alarm service over an explicitly injected store and scheduler.
pub struct AlarmService<S: AlarmStore, H: WakeTimerHost, C: Clock> {
    store: S,
    scheduler: AlarmScheduler<H, C>,
    recurrence: RecurrencePolicy,
}

impl<S: AlarmStore, H: WakeTimerHost, C: Clock> AlarmService<S, H, C> {
    pub fn new(store: S, scheduler: AlarmScheduler<H, C>) -> Self {
        Self {
            store,
            scheduler,
            recurrence: RecurrencePolicy::default(),
        }
    }

    pub fn with_recurrence(mut self, recurrence: RecurrencePolicy) -> Self {
        self.recurrence = recurrence;
        self
    }

    pub fn recurrence(&self) -> RecurrencePolicy {
        self.recurrence
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn scheduler(&self) -> &AlarmScheduler<H, C> {
        &self.scheduler
    }

    pub fn can_schedule_exact(&self) -> bool {
        self.scheduler.can_schedule_exact()
    }

    /// Ordered alarm collection.
    pub fn alarms(&self) -> RepoResult<Vec<Alarm>> {
        self.store.get_all()
    }

    pub fn alarm(&self, id: AlarmId) -> RepoResult<Option<Alarm>> {
        self.store.get(id)
    }

    pub fn subscribe(&self, listener: AlarmListener) -> RepoResult<Subscription> {
        self.store.subscribe(listener)
    }

    /// Persists a new enabled alarm and schedules it.
    ///
    /// # Errors
    /// - `Store` when validation or the insert fails; nothing persisted.
    /// - `Schedule` when registration fails; the inserted record is removed.
    pub fn create_alarm(&mut self, request: &CreateAlarmRequest) -> AlarmServiceResult<Alarm> {
        let alarm = Alarm {
            id: UNASSIGNED_ALARM_ID,
            hour_of_day: request.hour_of_day,
            minute: request.minute,
            is_enabled: true,
            label: normalize_label(&request.label),
            vibrate: request.vibrate,
            ringtone_ref: request
                .ringtone_ref
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
        };
        alarm.validate().map_err(RepoError::from)?;

        let id = self.store.insert(&alarm)?;
        let alarm = alarm.with_id(id);

        if let Err(err) = self.scheduler.schedule(&alarm) {
            error!(
                "event=alarm_create module=service status=rolled_back alarm_id={id} error={err}"
            );
            if let Err(rollback_err) = self.store.delete(id) {
                error!(
                    "event=alarm_create module=service status=rollback_failed alarm_id={id} error={rollback_err}"
                );
            }
            return Err(err.into());
        }

        info!("event=alarm_create module=service status=ok alarm_id={id}");
        Ok(alarm)
    }

    /// Flips `is_enabled` and re-schedules or cancels accordingly.
    pub fn toggle_alarm(&mut self, id: AlarmId) -> AlarmServiceResult<Alarm> {
        let current = self.require(id)?;
        self.set_enabled(id, !current.is_enabled)
    }

    /// Persists the enabled flag, then schedules from now or cancels.
    ///
    /// When enabling fails to schedule, the record is restored to its
    /// previous state before the error is returned.
    pub fn set_enabled(&mut self, id: AlarmId, enabled: bool) -> AlarmServiceResult<Alarm> {
        let current = self.require(id)?;
        let mut updated = current.clone();
        updated.is_enabled = enabled;
        self.apply_update(&current, updated)
    }

    /// Replaces an alarm definition and re-syncs its registration.
    pub fn edit_alarm(&mut self, alarm: &Alarm) -> AlarmServiceResult<Alarm> {
        let current = self.require(alarm.id)?;
        let mut updated = alarm.clone();
        updated.label = normalize_label(&updated.label);
        self.apply_update(&current, updated)
    }

    /// Cancels the registration, then removes the record.
    ///
    /// Deleting an unknown id is a no-op. If the store refuses the delete,
    /// an enabled alarm gets its registration back.
    pub fn delete_alarm(&mut self, id: AlarmId) -> AlarmServiceResult<()> {
        let Some(current) = self.store.get(id)? else {
            self.scheduler.cancel(id);
            return Ok(());
        };

        self.scheduler.cancel(id);
        if let Err(err) = self.store.delete(id) {
            if current.is_enabled {
                if let Err(reschedule_err) = self.scheduler.schedule(&current) {
                    warn!(
                        "event=alarm_delete module=service status=restore_failed alarm_id={id} error={reschedule_err}"
                    );
                }
            }
            return Err(err.into());
        }

        info!("event=alarm_delete module=service status=ok alarm_id={id}");
        Ok(())
    }

    /// Applies the recurrence policy after the host delivered the timer.
    ///
    /// Returns the alarm as persisted afterwards, or `None` when the alarm
    /// was deleted meanwhile.
    pub fn on_alarm_fired(&mut self, id: AlarmId) -> AlarmServiceResult<Option<Alarm>> {
        self.scheduler.mark_fired(id);
        let Some(alarm) = self.store.get(id)? else {
            self.scheduler.clear_fired(id);
            return Ok(None);
        };

        if !alarm.is_enabled {
            self.scheduler.clear_fired(id);
            return Ok(Some(alarm));
        }

        let result = match self.recurrence {
            RecurrencePolicy::OneShot => {
                let mut done = alarm;
                done.is_enabled = false;
                self.store
                    .update(&done)
                    .map(|()| done)
                    .map_err(AlarmServiceError::from)
            }
            RecurrencePolicy::Daily => match self.scheduler.schedule(&alarm) {
                Ok(_) => Ok(alarm),
                Err(err) => {
                    // Fired registration is already consumed.
                    let mut orphan = alarm;
                    orphan.is_enabled = false;
                    match self.store.update(&orphan) {
                        Ok(()) => warn!(
                            "event=alarm_fired module=service status=disabled alarm_id={id} error={err}"
                        ),
                        Err(store_err) => error!(
                            "event=alarm_fired module=service status=disable_failed alarm_id={id} error={store_err}"
                        ),
                    }
                    Err(err.into())
                }
            },
        };
        self.scheduler.clear_fired(id);

        let alarm = result?;
        info!(
            "event=alarm_fired module=service status=ok alarm_id={id} recurrence={:?}",
            self.recurrence
        );
        Ok(Some(alarm))
    }

    /// Re-registers every enabled alarm, e.g. after the host lost its
    /// timers on reboot. Returns the number of registrations made.
    ///
    /// Every enabled alarm is attempted even when an earlier one fails;
    /// the first failure is returned once the pass completes.
    pub fn reschedule_enabled(&mut self) -> AlarmServiceResult<usize> {
        let alarms = self.store.get_all()?;
        let mut scheduled = 0;
        let mut failed = 0;
        let mut first_error = None;
        for alarm in alarms.iter().filter(|alarm| alarm.is_enabled) {
            match self.scheduler.schedule(alarm) {
                Ok(_) => scheduled += 1,
                Err(err) => {
                    warn!(
                        "event=alarm_resync module=service status=error alarm_id={} error={err}",
                        alarm.id
                    );
                    failed += 1;
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            None => {
                info!("event=alarm_resync module=service status=ok scheduled={scheduled}");
                Ok(scheduled)
            }
            Some(err) => {
                warn!(
                    "event=alarm_resync module=service status=partial scheduled={scheduled} failed={failed}"
                );
                Err(err.into())
            }
        }
    }

    fn require(&self, id: AlarmId) -> AlarmServiceResult<Alarm> {
        self.store.get(id)?.ok_or(AlarmServiceError::NotFound(id))
    }

    fn apply_update(&mut self, current: &Alarm, updated: Alarm) -> AlarmServiceResult<Alarm> {
        self.store.update(&updated)?;

        if !updated.is_enabled {
            self.scheduler.cancel(updated.id);
            return Ok(updated);
        }

        if let Err(err) = self.scheduler.schedule(&updated) {
            warn!(
                "event=alarm_update module=service status=restored alarm_id={} error={err}",
                updated.id
            );
            if let Err(restore_err) = self.store.update(current) {
                error!(
                    "event=alarm_update module=service status=restore_failed alarm_id={} error={restore_err}",
                    updated.id
                );
            }
            return Err(err.into());
        }
        Ok(updated)
    }
}
