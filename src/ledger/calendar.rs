//! Calendar arithmetic on plain dates. Everything works on `NaiveDate`, so a
//! `YYYY-MM-DD` value always lands in the same month whatever the server's
//! timezone is.

use chrono::{Datelike, Months, NaiveDate};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = first.checked_add_months(Months::new(1))?;
    next.pred_opt().map(|day| day.day())
}

/// Moves `date` to `day` within its month, clamping to the month's last day.
pub fn with_day_clamped(date: NaiveDate, day: u32) -> Option<NaiveDate> {
    let last = last_day_of_month(date.year(), date.month())?;
    date.with_day(day.clamp(1, last))
}

/// Adds whole months, clamping the day (Jan 31 + 1 month = Feb 28/29).
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

/// First and last day of a calendar month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = with_day_clamped(first, 31)?;
    Some((first, last))
}

pub fn in_month(date: NaiveDate, year: i32, month: u32) -> bool {
    date.year() == year && date.month() == month
}

/// Next statement due date for a card. If today is already past the due day
/// the bill belongs to next month.
pub fn card_due_date(today: NaiveDate, due_day: u32) -> Option<NaiveDate> {
    let anchor = if today.day() > due_day {
        add_months(today.with_day(1)?, 1)?
    } else {
        today
    };
    with_day_clamped(anchor, due_day)
}

/// Week-of-month bucket: 0 for days 1-7, 1 for 8-14, 2 for 15-21, 3 for 22-31.
pub fn week_of_month(date: NaiveDate) -> usize {
    (((date.day() - 1) / 7) as usize).min(3)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn last_day_handles_leap_years() {
        assert_eq!(last_day_of_month(2024, 2), Some(29));
        assert_eq!(last_day_of_month(2023, 2), Some(28));
        assert_eq!(last_day_of_month(2024, 12), Some(31));
        assert_eq!(last_day_of_month(2024, 13), None);
    }

    #[test]
    fn add_months_clamps_to_month_end() {
        assert_eq!(add_months(date(2024, 1, 31), 1), Some(date(2024, 2, 29)));
        assert_eq!(add_months(date(2024, 11, 15), 3), Some(date(2025, 2, 15)));
    }

    #[test]
    fn card_due_date_stays_in_month_until_due_day() {
        assert_eq!(card_due_date(date(2024, 3, 10), 10), Some(date(2024, 3, 10)));
        assert_eq!(card_due_date(date(2024, 3, 5), 10), Some(date(2024, 3, 10)));
    }

    #[test]
    fn card_due_date_rolls_over_after_due_day() {
        assert_eq!(card_due_date(date(2024, 3, 11), 10), Some(date(2024, 4, 10)));
        assert_eq!(card_due_date(date(2024, 12, 20), 5), Some(date(2025, 1, 5)));
        assert_eq!(card_due_date(date(2024, 1, 31), 30), Some(date(2024, 2, 29)));
    }

    #[test]
    fn month_membership_ignores_time_of_day() {
        let d = parse_date("2024-03-15").unwrap();
        assert!(in_month(d, 2024, 3));
        assert!(!in_month(d, 2024, 2));
        assert!(!in_month(d, 2023, 3));
    }

    #[test]
    fn weeks_of_month() {
        assert_eq!(week_of_month(date(2024, 5, 1)), 0);
        assert_eq!(week_of_month(date(2024, 5, 7)), 0);
        assert_eq!(week_of_month(date(2024, 5, 8)), 1);
        assert_eq!(week_of_month(date(2024, 5, 21)), 2);
        assert_eq!(week_of_month(date(2024, 5, 22)), 3);
        assert_eq!(week_of_month(date(2024, 5, 31)), 3);
    }

    #[test]
    fn month_bounds_cover_whole_month() {
        assert_eq!(month_bounds(2024, 2), Some((date(2024, 2, 1), date(2024, 2, 29))));
        assert_eq!(month_bounds(2024, 0), None);
    }
}
