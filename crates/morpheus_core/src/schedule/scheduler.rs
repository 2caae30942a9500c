//! Alarm scheduler over a host wake-timer service.
//!
//! # Responsibility
//! - Translate one alarm into exactly one host registration, or cancel it.
//! - Track the per-id `Unscheduled → Scheduled → Fired → Unscheduled` state.
//!
//! # Invariants
//! - At most one live registration per alarm id; re-scheduling replaces.
//! - A denied precise-timer capability never reaches the host.

use super::clock::Clock;
use super::payload::TimerPayload;
use super::trigger::compute_next_trigger;
use super::{ScheduleError, ScheduleResult, ScheduledTimer, TimerState};
use crate::model::alarm::{Alarm, AlarmId};
use crate::platform::{WakeTimer, WakeTimerHost};
use chrono::DateTime;
use log::{debug, error, info, warn};
use std::collections::HashMap;

pub struct AlarmScheduler<H: WakeTimerHost, C: Clock> {
    host: H,
    clock: C,
    states: HashMap<AlarmId, TimerState>,
}

impl<H: WakeTimerHost, C: Clock> AlarmScheduler<H, C> {
    pub fn new(host: H, clock: C) -> Self {
        Self {
            host,
            clock,
            states: HashMap::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Capability probe; always true on hosts without the restriction.
    pub fn can_schedule_exact(&self) -> bool {
        self.host.can_schedule_exact()
    }

    /// Next trigger instant for `alarm` relative to the scheduler clock.
    pub fn next_trigger(&self, alarm: &Alarm) -> ScheduleResult<DateTime<C::Tz>> {
        compute_next_trigger(alarm.hour_of_day, alarm.minute, &self.clock.now())
    }

    /// Registers the one-shot wake timer for `alarm`.
    ///
    /// # Errors
    /// - `PermissionDenied` when precise timers are not granted; nothing is
    ///   registered and any previous registration is left untouched.
    /// - `Unpersisted` / `InvalidAlarm` for alarms that cannot be keyed.
    /// - `Host` when the host rejects the registration.
    pub fn schedule(&mut self, alarm: &Alarm) -> ScheduleResult<ScheduledTimer> {
        if !alarm.is_persisted() {
            return Err(ScheduleError::Unpersisted);
        }
        alarm.validate()?;

        if !self.host.can_schedule_exact() {
            error!(
                "event=alarm_schedule module=scheduler status=error alarm_id={} error_code=exact_alarm_permission_denied",
                alarm.id
            );
            return Err(ScheduleError::PermissionDenied);
        }

        let trigger_at_ms = self.next_trigger(alarm)?.timestamp_millis();
        let replaced = matches!(self.state(alarm.id), TimerState::Scheduled { .. });
        self.host.register(WakeTimer {
            alarm_id: alarm.id,
            trigger_at_ms,
            payload: TimerPayload::from(alarm),
        })?;
        self.states
            .insert(alarm.id, TimerState::Scheduled { trigger_at_ms });

        info!(
            "event=alarm_schedule module=scheduler status=ok alarm_id={} trigger_ms={} replaced={}",
            alarm.id, trigger_at_ms, replaced
        );
        Ok(ScheduledTimer {
            alarm_id: alarm.id,
            trigger_at_ms,
            replaced,
        })
    }

    /// Drops any registration for `alarm_id`. Cancelling an id without a
    /// live registration is a no-op.
    pub fn cancel(&mut self, alarm_id: AlarmId) {
        let was_live = self.host.unregister(alarm_id);
        self.states.remove(&alarm_id);
        debug!(
            "event=alarm_cancel module=scheduler status=ok alarm_id={alarm_id} was_live={was_live}"
        );
    }

    /// Records that the host delivered the timer for `alarm_id`.
    ///
    /// Returns `false` when no registration was tracked for the id, e.g.
    /// after a cold start; the transition still happens.
    pub fn mark_fired(&mut self, alarm_id: AlarmId) -> bool {
        let previous = self.states.insert(alarm_id, TimerState::Fired);
        self.host.unregister(alarm_id);
        let tracked = matches!(previous, Some(TimerState::Scheduled { .. }));
        if !tracked {
            warn!(
                "event=alarm_fired module=scheduler status=untracked alarm_id={alarm_id}"
            );
        }
        tracked
    }

    /// Closes the fired state for `alarm_id` (`Fired → Unscheduled`).
    pub fn clear_fired(&mut self, alarm_id: AlarmId) {
        if self.state(alarm_id) == TimerState::Fired {
            self.states.remove(&alarm_id);
        }
    }

    pub fn state(&self, alarm_id: AlarmId) -> TimerState {
        self.states
            .get(&alarm_id)
            .copied()
            .unwrap_or(TimerState::Unscheduled)
    }
}

#[cfg(test)]
mod tests {
    use super::AlarmScheduler;
    use crate::model::alarm::Alarm;
    use crate::platform::recording::InMemoryWakeTimers;
    use crate::schedule::clock::FixedClock;
    use crate::schedule::{ScheduleError, TimerState};
    use chrono::{FixedOffset, TimeZone};
    use std::sync::Arc;

    fn scheduler() -> (AlarmScheduler<Arc<InMemoryWakeTimers>, FixedClock>, Arc<InMemoryWakeTimers>) {
        let host = Arc::new(InMemoryWakeTimers::new());
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 10, 8, 0, 0)
            .unwrap();
        (
            AlarmScheduler::new(Arc::clone(&host), FixedClock::new(now)),
            host,
        )
    }

    #[test]
    fn schedule_rejects_unpersisted_alarm() {
        let (mut scheduler, host) = scheduler();
        let err = scheduler.schedule(&Alarm::new(7, 30, "x")).unwrap_err();
        assert_eq!(err, ScheduleError::Unpersisted);
        assert_eq!(host.live_count(), 0);
    }

    #[test]
    fn fired_state_is_cleared_only_from_fired() {
        let (mut scheduler, _host) = scheduler();
        let alarm = Alarm::new(7, 30, "x").with_id(2);
        scheduler.schedule(&alarm).unwrap();

        scheduler.clear_fired(2);
        assert!(matches!(scheduler.state(2), TimerState::Scheduled { .. }));

        assert!(scheduler.mark_fired(2));
        assert_eq!(scheduler.state(2), TimerState::Fired);
        scheduler.clear_fired(2);
        assert_eq!(scheduler.state(2), TimerState::Unscheduled);
    }

    #[test]
    fn mark_fired_for_untracked_id_still_transitions() {
        let (mut scheduler, _host) = scheduler();
        assert!(!scheduler.mark_fired(42));
        assert_eq!(scheduler.state(42), TimerState::Fired);
    }
}
