//! Weekday (Mon–Fri) calendar arithmetic.
//!
//! No exchange holidays: a "business day" here is any Monday through Friday.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// True for Monday through Friday.
pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Number of weekdays in the closed range `[start, end]`. Zero if `start > end`.
pub fn weekdays_inclusive(start: NaiveDate, end: NaiveDate) -> i64 {
    if start > end {
        return 0;
    }
    let total = (end - start).num_days() + 1;
    let full_weeks = total / 7;
    let mut count = full_weeks * 5;

    let mut day = start + Duration::days(full_weeks * 7);
    while day <= end {
        if is_weekday(day) {
            count += 1;
        }
        day += Duration::days(1);
    }
    count
}

/// Number of weekdays strictly between `a` and `b` (both endpoints excluded).
///
/// Symmetric in its arguments; adjacent or equal dates give zero.
pub fn business_days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if (hi - lo).num_days() < 2 {
        return 0;
    }
    weekdays_inclusive(lo + Duration::days(1), hi - Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn weekday_detection() {
        assert!(is_weekday(d(2024, 1, 15))); // Monday
        assert!(is_weekday(d(2024, 1, 19))); // Friday
        assert!(!is_weekday(d(2024, 1, 20))); // Saturday
        assert!(!is_weekday(d(2024, 1, 21))); // Sunday
    }

    #[test]
    fn weekdays_in_one_full_week() {
        assert_eq!(weekdays_inclusive(d(2024, 1, 15), d(2024, 1, 21)), 5);
        assert_eq!(weekdays_inclusive(d(2024, 1, 13), d(2024, 1, 14)), 0);
        assert_eq!(weekdays_inclusive(d(2024, 1, 15), d(2024, 1, 15)), 1);
        assert_eq!(weekdays_inclusive(d(2024, 1, 16), d(2024, 1, 15)), 0);
    }

    #[test]
    fn weekdays_matches_day_by_day_count() {
        let start = d(2023, 11, 3);
        for span in 0..60 {
            let end = start + Duration::days(span);
            let mut naive = 0;
            let mut day = start;
            while day <= end {
                if is_weekday(day) {
                    naive += 1;
                }
                day += Duration::days(1);
            }
            assert_eq!(weekdays_inclusive(start, end), naive, "span {span}");
        }
    }

    #[test]
    fn business_days_between_excludes_endpoints() {
        // Friday -> Monday: nothing in between
        assert_eq!(business_days_between(d(2024, 1, 19), d(2024, 1, 22)), 0);
        // Monday -> next Monday: Tue..Fri
        assert_eq!(business_days_between(d(2024, 1, 8), d(2024, 1, 15)), 4);
        assert_eq!(business_days_between(d(2024, 1, 15), d(2024, 1, 8)), 4);
        assert_eq!(business_days_between(d(2024, 1, 15), d(2024, 1, 15)), 0);
    }
}
