//! Day-granularity date arithmetic shared by the ledger operations.

use chrono::{DateTime, Duration, Utc};

/// Truncates a timestamp to the beginning of its day (00:00:00).
pub fn day_start(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always representable")
        .and_utc()
}

/// Rounds a timestamp up to the last second of its day, so a finish date is
/// inclusive of the whole day it names.
pub fn day_end(instant: DateTime<Utc>) -> DateTime<Utc> {
    day_start(instant) + Duration::days(1) - Duration::seconds(1)
}

/// Number of calendar days from `from` to `to`, counting both endpoints.
/// Never less than 1, which keeps allowance divisions well-defined on the
/// last day of a period.
pub fn count_days(to: DateTime<Utc>, from: DateTime<Utc>) -> i64 {
    let span = (to.date_naive() - from.date_naive()).num_days() + 1;
    span.max(1)
}

/// Signed number of day boundaries between two instants.
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to.date_naive() - from.date_naive()).num_days()
}

/// True when both instants fall on the same calendar day.
pub fn same_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.date_naive() == b.date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn day_bounds() {
        let noon = at(2024, 5, 10, 12);
        assert_eq!(day_start(noon), at(2024, 5, 10, 0));
        assert_eq!(day_end(noon), at(2024, 5, 10, 23) + Duration::minutes(59) + Duration::seconds(59));
    }

    #[test]
    fn count_days_is_inclusive() {
        assert_eq!(count_days(at(2024, 5, 14, 23), at(2024, 5, 10, 1)), 5);
        assert_eq!(count_days(at(2024, 5, 10, 0), at(2024, 5, 10, 23)), 1);
    }

    #[test]
    fn count_days_floors_at_one() {
        assert_eq!(count_days(at(2024, 5, 9, 0), at(2024, 5, 10, 0)), 1);
    }

    #[test]
    fn days_between_is_signed() {
        assert_eq!(days_between(at(2024, 5, 10, 22), at(2024, 5, 12, 1)), 2);
        assert_eq!(days_between(at(2024, 5, 12, 1), at(2024, 5, 10, 22)), -2);
    }
}
