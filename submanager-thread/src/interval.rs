//! When a thread is due to be replaced.

use chrono::{DateTime, Datelike, Duration, Months, Timelike, Utc};

use submanager_core::platform::Submission;
use submanager_core::{DynamicThreadState, Interval, IntervalUnit, ThreadItem};

/// The calendar field named by `unit`. Weeks have none.
fn calendar_field(t: &DateTime<Utc>, unit: IntervalUnit) -> Option<i64> {
    match unit {
        IntervalUnit::Year => Some(i64::from(t.year())),
        IntervalUnit::Month => Some(i64::from(t.month())),
        IntervalUnit::Week => None,
        IntervalUnit::Day => Some(i64::from(t.day())),
        IntervalUnit::Hour => Some(i64::from(t.hour())),
        IntervalUnit::Minute => Some(i64::from(t.minute())),
        IntervalUnit::Second => Some(i64::from(t.second())),
    }
}

/// `created + n units`, or `None` on overflow.
fn add_units(created: DateTime<Utc>, unit: IntervalUnit, n: u32) -> Option<DateTime<Utc>> {
    let n64 = i64::from(n);
    match unit {
        IntervalUnit::Year => created.checked_add_months(Months::new(n.checked_mul(12)?)),
        IntervalUnit::Month => created.checked_add_months(Months::new(n)),
        IntervalUnit::Week => created.checked_add_signed(Duration::try_weeks(n64)?),
        IntervalUnit::Day => created.checked_add_signed(Duration::try_days(n64)?),
        IntervalUnit::Hour => created.checked_add_signed(Duration::try_hours(n64)?),
        IntervalUnit::Minute => created.checked_add_signed(Duration::try_minutes(n64)?),
        IntervalUnit::Second => created.checked_add_signed(Duration::try_seconds(n64)?),
    }
}

/// Whether `interval` has passed between `created` and `now` (both UTC).
///
/// A bare unit rotates as soon as the calendar field named by the unit
/// differs between `created` and `now` (only the month number for "month");
/// a bare week counts as one week. `n` units rotate once `now` is strictly
/// after `created + n units`.
pub fn interval_elapsed(interval: &Interval, created: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let relative = |n| add_units(created, interval.unit, n).is_some_and(|due| now > due);
    match interval.n {
        Some(n) => relative(n),
        None => match (
            calendar_field(&created, interval.unit),
            calendar_field(&now, interval.unit),
        ) {
            (Some(then), Some(current)) => then != current,
            _ => relative(1),
        },
    }
}

/// Decide whether `item` needs a new thread.
///
/// Never when rotation is disabled; always when there is no current thread.
pub fn should_rotate(
    item: &ThreadItem,
    state: &DynamicThreadState,
    current: Option<&Submission>,
    now: DateTime<Utc>,
) -> bool {
    let Some(interval) = item.new_thread_interval else {
        return false;
    };
    let (Some(_), Some(current)) = (state.thread_id.as_deref(), current) else {
        return true;
    };
    let Some(created) = DateTime::<Utc>::from_timestamp(current.created_utc, 0) else {
        return true;
    };
    interval_elapsed(&interval, created, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn interval(raw: &str) -> Interval {
        raw.parse().unwrap()
    }

    #[rstest]
    #[case("month", at(2024, 3, 1, 0), at(2024, 3, 31, 23), false)]
    #[case("month", at(2024, 3, 31, 23), at(2024, 4, 1, 0), true)]
    #[case("month", at(2023, 3, 10, 0), at(2024, 3, 10, 0), false)]
    #[case("yearly", at(2024, 1, 1, 0), at(2024, 12, 31, 23), false)]
    #[case("yearly", at(2024, 12, 31, 23), at(2025, 1, 1, 0), true)]
    #[case("daily", at(2024, 3, 1, 0), at(2024, 3, 1, 23), false)]
    #[case("daily", at(2024, 3, 1, 23), at(2024, 3, 2, 0), true)]
    #[case("hourly", at(2024, 3, 1, 5), at(2024, 3, 1, 6), true)]
    #[case("daily", at(2024, 3, 1, 9), at(2024, 4, 1, 9), false)]
    fn calendar_units(
        #[case] raw: &str,
        #[case] created: DateTime<Utc>,
        #[case] now: DateTime<Utc>,
        #[case] expected: bool,
    ) {
        assert_eq!(interval_elapsed(&interval(raw), created, now), expected);
    }

    #[rstest]
    #[case("2 weeks", 13, false)]
    #[case("2 weeks", 14, false)]
    #[case("2 weeks", 15, true)]
    #[case("weekly", 6, false)]
    #[case("weekly", 8, true)]
    #[case("3 days", 3, false)]
    #[case("3 days", 4, true)]
    fn relative_units_in_days(#[case] raw: &str, #[case] days: i64, #[case] expected: bool) {
        let created = at(2024, 3, 1, 12);
        let now = created + Duration::days(days);
        assert_eq!(interval_elapsed(&interval(raw), created, now), expected);
    }

    #[test]
    fn bare_week_built_by_hand_counts_one_week() {
        let bare = Interval {
            unit: IntervalUnit::Week,
            n: None,
        };
        let created = at(2024, 3, 1, 12);
        assert!(!interval_elapsed(&bare, created, created + Duration::days(7)));
        assert!(interval_elapsed(&bare, created, created + Duration::days(8)));
    }

    #[test]
    fn relative_months_follow_the_calendar() {
        let created = at(2024, 1, 31, 12);
        // Jan 31 + 1 month clamps to Feb 29 in a leap year.
        assert!(!interval_elapsed(&interval("1 month"), created, at(2024, 2, 29, 12)));
        assert!(interval_elapsed(&interval("1 month"), created, at(2024, 2, 29, 13)));
    }
}
