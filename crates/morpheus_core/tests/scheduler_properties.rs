use chrono::{DateTime, Duration, FixedOffset, TimeZone, Timelike};
use morpheus_core::platform::recording::InMemoryWakeTimers;
use morpheus_core::{
    compute_next_trigger, Alarm, AlarmScheduler, FixedClock, ScheduleError, TimerState,
};
use std::sync::Arc;

fn base(offset_hours: i32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(offset_hours * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 12, 31, 0, 0, 0)
        .unwrap()
}

fn scheduler(
    now: DateTime<FixedOffset>,
) -> (
    AlarmScheduler<Arc<InMemoryWakeTimers>, FixedClock>,
    Arc<InMemoryWakeTimers>,
) {
    let timers = Arc::new(InMemoryWakeTimers::new());
    (
        AlarmScheduler::new(Arc::clone(&timers), FixedClock::new(now)),
        timers,
    )
}

#[test]
fn next_trigger_is_strictly_future_and_within_a_day() {
    for offset in [-11, 0, 5, 14] {
        let day_start = base(offset);
        for now_step in (0..24 * 60).step_by(37) {
            let now = day_start + Duration::minutes(now_step) + Duration::seconds(13);
            for hour in (0..24u8).step_by(5) {
                for minute in [0u8, 29, 59] {
                    let next = compute_next_trigger(hour, minute, &now).unwrap();
                    assert!(next > now, "{next} not after {now}");
                    assert!(next - now <= Duration::hours(24));
                    assert_eq!(next.hour(), u32::from(hour));
                    assert_eq!(next.minute(), u32::from(minute));
                    assert_eq!(next.second(), 0);
                    let days_ahead = (next.date_naive() - now.date_naive()).num_days();
                    assert!(days_ahead == 0 || days_ahead == 1);
                }
            }
        }
    }
}

#[test]
fn schedule_then_cancel_leaves_no_registration() {
    let (mut scheduler, timers) = scheduler(base(0));
    let alarm = Alarm::new(6, 0, "run").with_id(3);

    scheduler.schedule(&alarm).unwrap();
    scheduler.cancel(alarm.id);

    assert_eq!(timers.live_count(), 0);
    assert_eq!(scheduler.state(alarm.id), TimerState::Unscheduled);
}

#[test]
fn rescheduling_replaces_the_live_registration() {
    let (mut scheduler, timers) = scheduler(base(0));
    let alarm = Alarm::new(6, 0, "run").with_id(3);

    let first = scheduler.schedule(&alarm).unwrap();
    let second = scheduler.schedule(&alarm).unwrap();

    assert!(!first.replaced);
    assert!(second.replaced);
    assert_eq!(timers.live_count(), 1);
    assert_eq!(timers.register_calls(), 2);
}

#[test]
fn cancelling_unknown_id_is_a_no_op() {
    let (mut scheduler, timers) = scheduler(base(0));
    scheduler.cancel(404);
    assert_eq!(timers.live_count(), 0);
}

#[test]
fn denied_permission_keeps_previous_registration() {
    let (mut scheduler, timers) = scheduler(base(0));
    let alarm = Alarm::new(6, 0, "run").with_id(3);
    let original = scheduler.schedule(&alarm).unwrap();

    timers.set_exact_permitted(false);
    let mut moved = alarm.clone();
    moved.hour_of_day = 9;
    assert!(matches!(
        scheduler.schedule(&moved),
        Err(ScheduleError::PermissionDenied)
    ));

    assert_eq!(
        timers.live(alarm.id).unwrap().trigger_at_ms,
        original.trigger_at_ms
    );
}

#[test]
fn payload_carries_everything_the_firing_path_needs() {
    let (mut scheduler, timers) = scheduler(base(0));
    let mut alarm = Alarm::new(6, 0, "run").with_id(8);
    alarm.vibrate = false;
    alarm.ringtone_ref = Some("content://tones/7".to_string());
    scheduler.schedule(&alarm).unwrap();

    let payload = timers.live(8).unwrap().payload;
    assert_eq!(payload.alarm_id, 8);
    assert_eq!(payload.label, "run");
    assert!(!payload.vibrate);
    assert_eq!(payload.ringtone_ref.as_deref(), Some("content://tones/7"));
}
