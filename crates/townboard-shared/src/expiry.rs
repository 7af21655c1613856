//! Expiry arithmetic for records with a visibility window.
//!
//! Dates in the `ExpiresOn` column are plain calendar days. Anything that
//! does not parse is treated as "no date": approval and extension fall back
//! to today, and the visibility filter lets the row through.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, Utc};

use crate::constants::DATE_FORMAT;

/// Parse a calendar date cell. Accepts `YYYY-MM-DD`, `YYYY/MM/DD` and the
/// date part of an RFC 3339 timestamp.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y/%m/%d"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

pub fn format_calendar_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a creation timestamp cell: RFC 3339, or the `YYYY-MM-DD HH:MM:SS`
/// form spreadsheets like to produce.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.and_utc())
        })
}

/// `from + days`, or `None` past the end of the calendar.
pub fn expires_on(from: NaiveDate, days: u32) -> Option<NaiveDate> {
    from.checked_add_days(Days::new(u64::from(days)))
}

/// New expiry after extending by `extra_days`: the current expiry when it
/// parses, otherwise today, plus `extra_days`. No bounds are applied here;
/// `None` when the result leaves the calendar range.
pub fn extended_expiry(current: Option<NaiveDate>, today: NaiveDate, extra_days: i64) -> Option<NaiveDate> {
    let base = current.unwrap_or(today);
    let days = Days::new(extra_days.unsigned_abs());
    if extra_days >= 0 {
        base.checked_add_days(days)
    } else {
        base.checked_sub_days(days)
    }
}

/// Still visible on `today`: no expiry, or an expiry of today or later.
pub fn is_live(expires: Option<NaiveDate>, today: NaiveDate) -> bool {
    expires.map_or(true, |date| date >= today)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_calendar_date_formats() {
        assert_eq!(parse_calendar_date("2024-03-05"), Some(d(2024, 3, 5)));
        assert_eq!(parse_calendar_date(" 2024/03/05 "), Some(d(2024, 3, 5)));
        assert_eq!(
            parse_calendar_date("2024-03-05T10:00:00+00:00"),
            Some(d(2024, 3, 5))
        );
        assert_eq!(parse_calendar_date(""), None);
        assert_eq!(parse_calendar_date("next week"), None);
        assert_eq!(parse_calendar_date("2024-13-40"), None);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-03-05T10:00:00Z").is_some());
        assert!(parse_timestamp("2024-03-05 10:00:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_expires_on_crosses_month() {
        assert_eq!(expires_on(d(2024, 1, 20), 30), Some(d(2024, 2, 19)));
    }

    #[test]
    fn test_huge_durations_do_not_overflow() {
        let today = d(2024, 1, 1);
        assert_eq!(expires_on(today, u32::MAX), None);
        assert_eq!(extended_expiry(Some(NaiveDate::MAX), today, 1), None);
        assert_eq!(extended_expiry(None, today, i64::MAX), None);
        assert_eq!(extended_expiry(None, today, i64::MIN), None);
    }

    #[test]
    fn test_extended_expiry() {
        let today = d(2024, 6, 1);
        assert_eq!(extended_expiry(Some(d(2024, 6, 10)), today, 10), Some(d(2024, 6, 20)));
        // Unparseable or absent expiry extends from today.
        assert_eq!(extended_expiry(None, today, 10), Some(d(2024, 6, 11)));
        // Already expired dates are extended from the old date, not today.
        assert_eq!(extended_expiry(Some(d(2024, 5, 1)), today, 10), Some(d(2024, 5, 11)));
    }

    #[test]
    fn test_is_live() {
        let today = d(2024, 6, 1);
        assert!(is_live(None, today));
        assert!(is_live(Some(today), today));
        assert!(is_live(Some(d(2024, 6, 2)), today));
        assert!(!is_live(Some(d(2024, 5, 31)), today));
    }
}
