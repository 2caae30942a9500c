//! Next-trigger computation.
//!
//! # Invariants
//! - The result is strictly after `now` and is today's or tomorrow's local
//!   instance of the wall-clock time, at second zero.
//! - Day rollover is calendar arithmetic on the local date, never a fixed
//!   24h offset, so month/year ends and DST days resolve correctly.
//! - A wall-clock time inside a DST gap resolves to the first valid minute
//!   after the gap; inside a DST overlap it resolves to the earlier instant.

use super::{ScheduleError, ScheduleResult};
use crate::model::alarm::AlarmValidationError;
use chrono::{
    DateTime, Days, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone,
};

/// Upper bound on minutes probed forward through a DST gap.
const MAX_GAP_PROBE_MINUTES: u32 = 24 * 60;

/// Computes the next instant at which an alarm set to `hour_of_day:minute`
/// fires, relative to `now`.
///
/// # Errors
/// - `InvalidAlarm` for out-of-range clock values.
/// - `UnresolvableTrigger` if the local time cannot be mapped to an instant.
pub fn compute_next_trigger<Tz: TimeZone>(
    hour_of_day: u8,
    minute: u8,
    now: &DateTime<Tz>,
) -> ScheduleResult<DateTime<Tz>> {
    let unresolvable = || ScheduleError::UnresolvableTrigger {
        hour_of_day,
        minute,
    };
    let wall_clock = parse_wall_clock(hour_of_day, minute)?;
    let zone = now.timezone();
    let today = now.date_naive();

    let candidate = resolve_local(&zone, today, wall_clock).ok_or_else(unresolvable)?;
    if candidate > *now {
        return Ok(candidate);
    }

    let tomorrow = today
        .checked_add_days(Days::new(1))
        .ok_or_else(unresolvable)?;
    resolve_local(&zone, tomorrow, wall_clock).ok_or_else(unresolvable)
}

/// `compute_next_trigger` expressed in epoch milliseconds.
pub fn compute_next_trigger_ms<Tz: TimeZone>(
    hour_of_day: u8,
    minute: u8,
    now: &DateTime<Tz>,
) -> ScheduleResult<i64> {
    compute_next_trigger(hour_of_day, minute, now).map(|trigger| trigger.timestamp_millis())
}

fn parse_wall_clock(hour_of_day: u8, minute: u8) -> ScheduleResult<NaiveTime> {
    if hour_of_day > 23 {
        return Err(AlarmValidationError::InvalidHour(hour_of_day).into());
    }
    NaiveTime::from_hms_opt(u32::from(hour_of_day), u32::from(minute), 0)
        .ok_or_else(|| AlarmValidationError::InvalidMinute(minute).into())
}

fn resolve_local<Tz: TimeZone>(
    zone: &Tz,
    date: NaiveDate,
    wall_clock: NaiveTime,
) -> Option<DateTime<Tz>> {
    let mut probe: NaiveDateTime = date.and_time(wall_clock);
    for _ in 0..=MAX_GAP_PROBE_MINUTES {
        match zone.from_local_datetime(&probe) {
            LocalResult::Single(value) => return Some(value),
            LocalResult::Ambiguous(earliest, _) => return Some(earliest),
            LocalResult::None => {
                probe = probe.checked_add_signed(TimeDelta::minutes(1))?;
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{compute_next_trigger, compute_next_trigger_ms};
    use crate::model::alarm::AlarmValidationError;
    use crate::schedule::ScheduleError;
    use chrono::{DateTime, FixedOffset, TimeZone, Utc};

    fn at(
        offset_hours: i32,
        y: i32,
        mo: u32,
        d: u32,
        h: u32,
        mi: u32,
        s: u32,
    ) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(offset_hours * 3600)
            .unwrap()
            .with_ymd_and_hms(y, mo, d, h, mi, s)
            .unwrap()
    }

    #[test]
    fn later_today_stays_today() {
        let now = at(2, 2024, 5, 10, 7, 0, 0);
        let trigger = compute_next_trigger(7, 30, &now).unwrap();
        assert_eq!(trigger, at(2, 2024, 5, 10, 7, 30, 0));
    }

    #[test]
    fn passed_time_moves_to_tomorrow() {
        let now = at(2, 2024, 5, 10, 8, 0, 0);
        let trigger = compute_next_trigger(7, 30, &now).unwrap();
        assert_eq!(trigger, at(2, 2024, 5, 11, 7, 30, 0));
    }

    #[test]
    fn exactly_now_moves_to_tomorrow() {
        let now = at(0, 2024, 5, 10, 7, 30, 0);
        let trigger = compute_next_trigger(7, 30, &now).unwrap();
        assert_eq!(trigger, at(0, 2024, 5, 11, 7, 30, 0));
    }

    #[test]
    fn seconds_past_the_minute_move_to_tomorrow() {
        let now = at(0, 2024, 5, 10, 7, 30, 1);
        let trigger = compute_next_trigger(7, 30, &now).unwrap();
        assert_eq!(trigger, at(0, 2024, 5, 11, 7, 30, 0));
    }

    #[test]
    fn rolls_over_month_and_year_ends() {
        let new_year = compute_next_trigger(6, 0, &at(-5, 2023, 12, 31, 23, 0, 0)).unwrap();
        assert_eq!(new_year, at(-5, 2024, 1, 1, 6, 0, 0));

        let leap_day = compute_next_trigger(6, 0, &at(9, 2024, 2, 28, 6, 30, 0)).unwrap();
        assert_eq!(leap_day, at(9, 2024, 2, 29, 6, 0, 0));

        let march = compute_next_trigger(6, 0, &at(9, 2024, 2, 29, 6, 30, 0)).unwrap();
        assert_eq!(march, at(9, 2024, 3, 1, 6, 0, 0));
    }

    #[test]
    fn result_is_always_future_and_within_a_day() {
        let base = at(1, 2024, 3, 30, 0, 0, 0);
        for now_offset_minutes in (0..24 * 60).step_by(37) {
            let now = base + chrono::TimeDelta::minutes(now_offset_minutes);
            for hour_of_day in 0..24u8 {
                for minute in [0u8, 1, 29, 30, 59] {
                    let trigger = compute_next_trigger(hour_of_day, minute, &now).unwrap();
                    assert!(trigger > now);
                    assert!(trigger - now <= chrono::TimeDelta::hours(24));
                    assert_eq!(
                        trigger.format("%H:%M:%S").to_string(),
                        format!("{hour_of_day:02}:{minute:02}:00")
                    );
                }
            }
        }
    }

    #[test]
    fn millis_variant_matches_datetime() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 5, 11, 7, 30, 0).unwrap();
        assert_eq!(
            compute_next_trigger_ms(7, 30, &now).unwrap(),
            expected.timestamp_millis()
        );
    }

    #[test]
    fn rejects_invalid_clock_values() {
        let now = at(0, 2024, 5, 10, 8, 0, 0);
        assert_eq!(
            compute_next_trigger(24, 0, &now).unwrap_err(),
            ScheduleError::InvalidAlarm(AlarmValidationError::InvalidHour(24))
        );
        assert_eq!(
            compute_next_trigger(7, 60, &now).unwrap_err(),
            ScheduleError::InvalidAlarm(AlarmValidationError::InvalidMinute(60))
        );
    }

    #[test]
    fn wall_clock_inside_spring_forward_gap_rings_when_the_gap_ends() {
        use chrono_tz::America::New_York;

        let now = New_York.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let trigger = compute_next_trigger(2, 30, &now).unwrap();

        assert_eq!(trigger, New_York.with_ymd_and_hms(2024, 3, 10, 3, 0, 0).unwrap());
        assert_eq!(trigger.format("%H:%M %Z").to_string(), "03:00 EDT");
    }

    #[test]
    fn repeated_wall_clock_in_fall_back_fold_takes_the_first_instance() {
        use chrono_tz::America::New_York;

        let now = New_York.with_ymd_and_hms(2024, 11, 3, 0, 0, 0).unwrap();
        let trigger = compute_next_trigger(1, 30, &now).unwrap();

        assert_eq!(trigger.format("%H:%M %Z").to_string(), "01:30 EDT");
        assert_eq!(
            trigger.timestamp(),
            Utc.with_ymd_and_hms(2024, 11, 3, 5, 30, 0).unwrap().timestamp()
        );
    }

    #[test]
    fn next_day_across_fall_back_keeps_the_wall_clock() {
        use chrono_tz::America::New_York;

        let now = New_York.with_ymd_and_hms(2024, 11, 2, 8, 0, 0).unwrap();
        let trigger = compute_next_trigger(7, 30, &now).unwrap();

        assert_eq!(trigger.format("%Y-%m-%d %H:%M %Z").to_string(), "2024-11-03 07:30 EST");
        assert_eq!(
            trigger.signed_duration_since(now),
            chrono::TimeDelta::minutes(24 * 60 + 30)
        );
    }
}
