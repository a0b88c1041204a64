//! Month enumeration for half-open date windows

use chrono::{Datelike, NaiveDate};

/// Enumerate every (year, month) pair whose first-of-month falls in
/// `[start, end)`.
///
/// A mid-month `start` excludes its own month: only months whose first
/// day is on or after `start` qualify.
pub fn months_in_window(start: NaiveDate, end: NaiveDate) -> Vec<(u16, u8)> {
    let mut months = Vec::new();

    // First-of-month of the start date; the window filter below drops it
    // when start is not itself a first-of-month.
    let mut cur = match start.with_day(1) {
        Some(d) => d,
        None => return months,
    };

    while cur < end {
        if cur >= start {
            months.push((cur.year() as u16, cur.month() as u8));
        }
        cur = match next_month(cur) {
            Some(d) => d,
            None => break,
        };
    }

    months
}

fn next_month(first_of_month: NaiveDate) -> Option<NaiveDate> {
    if first_of_month.month() == 12 {
        NaiveDate::from_ymd_opt(first_of_month.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first_of_month.year(), first_of_month.month() + 1, 1)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_two_month_window() {
        let months = months_in_window(date(2024, 1, 1), date(2024, 3, 1));
        assert_eq!(months, vec![(2024, 1), (2024, 2)]);
    }

    #[test]
    fn test_end_is_exclusive() {
        let months = months_in_window(date(2024, 1, 1), date(2024, 2, 1));
        assert_eq!(months, vec![(2024, 1)]);
    }

    #[test]
    fn test_year_rollover() {
        let months = months_in_window(date(2023, 11, 1), date(2024, 2, 1));
        assert_eq!(months, vec![(2023, 11), (2023, 12), (2024, 1)]);
    }

    #[test]
    fn test_mid_month_start_excludes_own_month() {
        let months = months_in_window(date(2024, 1, 15), date(2024, 3, 1));
        assert_eq!(months, vec![(2024, 2)]);
    }

    #[test]
    fn test_mid_month_end_includes_started_month() {
        let months = months_in_window(date(2024, 1, 1), date(2024, 2, 15));
        assert_eq!(months, vec![(2024, 1), (2024, 2)]);
    }

    #[test]
    fn test_empty_window() {
        assert!(months_in_window(date(2024, 3, 1), date(2024, 3, 1)).is_empty());
        assert!(months_in_window(date(2024, 3, 1), date(2024, 1, 1)).is_empty());
    }
}
