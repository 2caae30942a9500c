use chrono::{DateTime, FixedOffset, TimeZone};
use morpheus_core::db::open_db_in_memory;
use morpheus_core::db::DbError;
use morpheus_core::platform::recording::InMemoryWakeTimers;
use morpheus_core::repo::alarm_repo::AlarmListener;
use morpheus_core::repo::observer::Subscription;
use morpheus_core::{
    Alarm, AlarmId, AlarmScheduler, AlarmService, AlarmServiceError, AlarmStore,
    CreateAlarmRequest, FixedClock, RecurrencePolicy, RepoError, RepoResult, ScheduleError,
    SqliteAlarmStore, TimerState,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Service<S> = AlarmService<S, Arc<InMemoryWakeTimers>, Arc<FixedClock>>;

fn at(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2024, 5, day, hour, minute, 0)
        .unwrap()
}

struct Harness<S: AlarmStore> {
    service: Service<S>,
    timers: Arc<InMemoryWakeTimers>,
    clock: Arc<FixedClock>,
}

fn harness_with<S: AlarmStore>(store: S, now: DateTime<FixedOffset>) -> Harness<S> {
    let timers = Arc::new(InMemoryWakeTimers::new());
    let clock = Arc::new(FixedClock::new(now));
    let scheduler = AlarmScheduler::new(Arc::clone(&timers), Arc::clone(&clock));
    Harness {
        service: AlarmService::new(store, scheduler),
        timers,
        clock,
    }
}

fn harness(now: DateTime<FixedOffset>) -> Harness<SqliteAlarmStore> {
    harness_with(
        SqliteAlarmStore::try_new(open_db_in_memory().unwrap()).unwrap(),
        now,
    )
}

/// Store whose deletes can be switched to fail like an unavailable database.
struct FlakyStore {
    inner: SqliteAlarmStore,
    fail_deletes: AtomicBool,
}

impl AlarmStore for FlakyStore {
    fn get_all(&self) -> RepoResult<Vec<Alarm>> {
        self.inner.get_all()
    }

    fn get(&self, id: AlarmId) -> RepoResult<Option<Alarm>> {
        self.inner.get(id)
    }

    fn insert(&self, alarm: &Alarm) -> RepoResult<AlarmId> {
        self.inner.insert(alarm)
    }

    fn update(&self, alarm: &Alarm) -> RepoResult<()> {
        self.inner.update(alarm)
    }

    fn delete(&self, id: AlarmId) -> RepoResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(RepoError::Db(DbError::SchemaNotReady("alarms")));
        }
        self.inner.delete(id)
    }

    fn subscribe(&self, listener: AlarmListener) -> RepoResult<Subscription> {
        self.inner.subscribe(listener)
    }
}

#[test]
fn toggle_scenario_reschedules_from_current_time() {
    let mut h = harness(at(10, 8, 0));

    let alarm = h
        .service
        .create_alarm(&CreateAlarmRequest::new(7, 30, "Wake up"))
        .unwrap();
    assert!(alarm.is_enabled);
    assert_eq!(
        h.timers.live(alarm.id).unwrap().trigger_at_ms,
        at(11, 7, 30).timestamp_millis()
    );

    let disabled = h.service.toggle_alarm(alarm.id).unwrap();
    assert!(!disabled.is_enabled);
    assert!(h.timers.live(alarm.id).is_none());
    assert!(!h.service.alarm(alarm.id).unwrap().unwrap().is_enabled);

    h.clock.set(at(11, 7, 0));
    let enabled = h.service.toggle_alarm(alarm.id).unwrap();
    assert!(enabled.is_enabled);
    assert_eq!(
        h.timers.live(alarm.id).unwrap().trigger_at_ms,
        at(11, 7, 30).timestamp_millis()
    );
}

#[test]
fn create_uses_default_label_for_blank_input() {
    let mut h = harness(at(10, 6, 0));
    let alarm = h
        .service
        .create_alarm(&CreateAlarmRequest::new(6, 15, "   "))
        .unwrap();
    assert_eq!(alarm.label, "Wake up");
    assert_eq!(h.timers.live(alarm.id).unwrap().payload.label, "Wake up");
}

#[test]
fn permission_denied_rolls_back_the_inserted_record() {
    let mut h = harness(at(10, 6, 0));
    h.timers.set_exact_permitted(false);

    let err = h
        .service
        .create_alarm(&CreateAlarmRequest::new(7, 0, "Gym"))
        .unwrap_err();

    assert!(matches!(
        err,
        AlarmServiceError::Schedule(ScheduleError::PermissionDenied)
    ));
    assert!(err.needs_settings_remediation());
    assert!(h.service.alarms().unwrap().is_empty());
    assert_eq!(h.timers.live_count(), 0);
}

#[test]
fn invalid_request_persists_nothing() {
    let mut h = harness(at(10, 6, 0));
    let err = h
        .service
        .create_alarm(&CreateAlarmRequest::new(7, 75, "Gym"))
        .unwrap_err();
    assert!(matches!(err, AlarmServiceError::Store(RepoError::InvalidAlarm(_))));
    assert!(h.service.alarms().unwrap().is_empty());
}

#[test]
fn enabling_without_permission_restores_disabled_record() {
    let mut h = harness(at(10, 6, 0));
    let alarm = h
        .service
        .create_alarm(&CreateAlarmRequest::new(7, 0, "Gym"))
        .unwrap();
    h.service.set_enabled(alarm.id, false).unwrap();

    h.timers.set_exact_permitted(false);
    let err = h.service.set_enabled(alarm.id, true).unwrap_err();

    assert!(err.needs_settings_remediation());
    assert!(!h.service.alarm(alarm.id).unwrap().unwrap().is_enabled);
    assert_eq!(h.timers.live_count(), 0);
}

#[test]
fn editing_time_replaces_the_registration() {
    let mut h = harness(at(10, 6, 0));
    let alarm = h
        .service
        .create_alarm(&CreateAlarmRequest::new(7, 0, "Gym"))
        .unwrap();

    let mut edited = alarm.clone();
    edited.hour_of_day = 6;
    edited.minute = 30;
    h.service.edit_alarm(&edited).unwrap();

    assert_eq!(h.timers.live_count(), 1);
    assert_eq!(h.timers.register_calls(), 2);
    assert_eq!(
        h.timers.live(alarm.id).unwrap().trigger_at_ms,
        at(10, 6, 30).timestamp_millis()
    );
}

#[test]
fn editing_unknown_alarm_is_not_found() {
    let mut h = harness(at(10, 6, 0));
    let ghost = Alarm::new(7, 0, "ghost").with_id(41);
    assert!(matches!(
        h.service.edit_alarm(&ghost),
        Err(AlarmServiceError::NotFound(41))
    ));
}

#[test]
fn delete_cancels_registration_and_removes_record() {
    let mut h = harness(at(10, 6, 0));
    let alarm = h
        .service
        .create_alarm(&CreateAlarmRequest::new(7, 0, "Gym"))
        .unwrap();

    h.service.delete_alarm(alarm.id).unwrap();
    h.service.delete_alarm(alarm.id).unwrap();

    assert!(h.service.alarm(alarm.id).unwrap().is_none());
    assert_eq!(h.timers.live_count(), 0);
    assert_eq!(h.service.scheduler().state(alarm.id), TimerState::Unscheduled);
}

#[test]
fn failed_delete_keeps_enabled_alarm_armed() {
    let store = FlakyStore {
        inner: SqliteAlarmStore::try_new(open_db_in_memory().unwrap()).unwrap(),
        fail_deletes: AtomicBool::new(false),
    };
    let mut h = harness_with(store, at(10, 6, 0));
    let alarm = h
        .service
        .create_alarm(&CreateAlarmRequest::new(7, 0, "Gym"))
        .unwrap();

    h.service.store().fail_deletes.store(true, Ordering::SeqCst);
    let err = h.service.delete_alarm(alarm.id).unwrap_err();

    assert!(err.is_store_unavailable());
    assert!(h.service.alarm(alarm.id).unwrap().is_some());
    assert!(h.timers.live(alarm.id).is_some());
}

#[test]
fn one_shot_alarm_is_disabled_after_firing() {
    let mut h = harness(at(10, 6, 0));
    let alarm = h
        .service
        .create_alarm(&CreateAlarmRequest::new(7, 0, "Gym"))
        .unwrap();

    h.clock.set(at(10, 7, 0));
    let fired = h.timers.take_due(at(10, 7, 0).timestamp_millis());
    assert_eq!(fired.len(), 1);

    let after = h.service.on_alarm_fired(alarm.id).unwrap().unwrap();
    assert!(!after.is_enabled);
    assert_eq!(h.timers.live_count(), 0);
    assert_eq!(h.service.scheduler().state(alarm.id), TimerState::Unscheduled);
}

#[test]
fn daily_alarm_is_rearmed_for_tomorrow_after_firing() {
    let mut h = harness(at(10, 6, 0));
    h.service = h.service.with_recurrence(RecurrencePolicy::Daily);

    let alarm = h
        .service
        .create_alarm(&CreateAlarmRequest::new(7, 0, "Gym"))
        .unwrap();

    h.clock.set(at(10, 7, 0));
    h.timers.take_due(at(10, 7, 0).timestamp_millis());
    let after = h.service.on_alarm_fired(alarm.id).unwrap().unwrap();

    assert!(after.is_enabled);
    assert_eq!(
        h.timers.live(alarm.id).unwrap().trigger_at_ms,
        at(11, 7, 0).timestamp_millis()
    );
    assert!(matches!(
        h.service.scheduler().state(alarm.id),
        TimerState::Scheduled { .. }
    ));
}

#[test]
fn daily_alarm_that_cannot_be_rearmed_is_disabled() {
    let mut h = harness(at(10, 6, 0));
    h.service = h.service.with_recurrence(RecurrencePolicy::Daily);

    let alarm = h
        .service
        .create_alarm(&CreateAlarmRequest::new(7, 0, "Gym"))
        .unwrap();

    h.clock.set(at(10, 7, 0));
    h.timers.take_due(at(10, 7, 0).timestamp_millis());
    h.timers.set_exact_permitted(false);

    let err = h.service.on_alarm_fired(alarm.id).unwrap_err();
    assert!(err.needs_settings_remediation());
    assert!(!h.service.alarm(alarm.id).unwrap().unwrap().is_enabled);
    assert_eq!(h.timers.live_count(), 0);
    assert_eq!(h.service.scheduler().state(alarm.id), TimerState::Unscheduled);
}

#[test]
fn firing_for_deleted_alarm_is_ignored() {
    let mut h = harness(at(10, 6, 0));
    assert!(h.service.on_alarm_fired(77).unwrap().is_none());
    assert_eq!(h.service.scheduler().state(77), TimerState::Unscheduled);
}

#[test]
fn reschedule_enabled_rearms_only_enabled_alarms() {
    let mut h = harness(at(10, 6, 0));
    let first = h
        .service
        .create_alarm(&CreateAlarmRequest::new(7, 0, "one"))
        .unwrap();
    let second = h
        .service
        .create_alarm(&CreateAlarmRequest::new(8, 0, "two"))
        .unwrap();
    h.service.set_enabled(second.id, false).unwrap();

    // Host lost every registration, e.g. after a reboot.
    h.timers.take_due(i64::MAX);
    assert_eq!(h.timers.live_count(), 0);

    assert_eq!(h.service.reschedule_enabled().unwrap(), 1);
    assert!(h.timers.live(first.id).is_some());
    assert!(h.timers.live(second.id).is_none());
}

#[test]
fn reschedule_enabled_keeps_going_past_a_failed_registration() {
    let mut h = harness(at(10, 6, 0));
    let first = h
        .service
        .create_alarm(&CreateAlarmRequest::new(7, 0, "one"))
        .unwrap();
    let second = h
        .service
        .create_alarm(&CreateAlarmRequest::new(8, 0, "two"))
        .unwrap();

    h.timers.take_due(i64::MAX);
    h.timers.reject_registrations_for(first.id);

    let err = h.service.reschedule_enabled().unwrap_err();
    assert!(matches!(
        err,
        AlarmServiceError::Schedule(ScheduleError::Host(_))
    ));
    assert!(h.timers.live(first.id).is_none());
    assert_eq!(
        h.timers.live(second.id).unwrap().trigger_at_ms,
        at(10, 8, 0).timestamp_millis()
    );
}
