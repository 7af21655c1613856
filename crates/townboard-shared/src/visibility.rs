//! Public visibility filter.

use chrono::{DateTime, NaiveDate, Utc};

use crate::expiry::is_live;
use crate::status::ApprovalStatus;

/// A record with an approval status and, optionally, an expiry.
pub trait Moderated {
    fn status(&self) -> ApprovalStatus;

    /// Parsed `ExpiresOn`; `None` when blank or malformed.
    fn expires_on(&self) -> Option<NaiveDate> {
        None
    }

    fn created_at(&self) -> Option<DateTime<Utc>>;

    fn is_approved(&self) -> bool {
        self.status().is_approved()
    }
}

/// Rows a non-moderator may see: approved, and when the table carries an
/// expiry, not yet expired. Unparseable expiries are kept. Order is not
/// guaranteed.
pub fn public_view<T: Moderated>(rows: Vec<T>, has_expiry: bool, today: NaiveDate) -> Vec<T> {
    rows.into_iter()
        .filter(|row| row.is_approved())
        .filter(|row| !has_expiry || is_live(row.expires_on(), today))
        .collect()
}

/// Moderation triage list: everything not approved, rejected rows included.
pub fn awaiting_review<T: Moderated>(rows: Vec<T>) -> Vec<T> {
    rows.into_iter().filter(|row| !row.is_approved()).collect()
}

/// Sort by creation time, newest first. Rows without a parseable timestamp
/// sink to the bottom.
pub fn newest_first<T: Moderated>(rows: &mut [T]) {
    rows.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, Clone)]
    struct Row {
        name: &'static str,
        status: &'static str,
        expires: Option<NaiveDate>,
        created: Option<DateTime<Utc>>,
    }

    impl Moderated for Row {
        fn status(&self) -> ApprovalStatus {
            ApprovalStatus::from_cell(self.status)
        }
        fn expires_on(&self) -> Option<NaiveDate> {
            self.expires
        }
        fn created_at(&self) -> Option<DateTime<Utc>> {
            self.created
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn row(name: &'static str, status: &'static str, expires: Option<NaiveDate>) -> Row {
        Row {
            name,
            status,
            expires,
            created: None,
        }
    }

    fn names(rows: &[Row]) -> Vec<&'static str> {
        rows.iter().map(|r| r.name).collect()
    }

    #[test]
    fn test_public_view_with_expiry() {
        let today = d(2024, 6, 1);
        let rows = vec![
            row("live", "TRUE", Some(d(2024, 6, 30))),
            row("today", "yes", Some(today)),
            row("expired", "TRUE", Some(d(2024, 5, 31))),
            row("no-date", "y", None),
            row("pending", "", Some(d(2024, 6, 30))),
            row("rejected", "REJECTED", None),
        ];

        let visible = public_view(rows, true, today);
        assert_eq!(names(&visible), vec!["live", "today", "no-date"]);
    }

    #[test]
    fn test_public_view_without_expiry_ignores_dates() {
        let today = d(2024, 6, 1);
        let rows = vec![row("old", "TRUE", Some(d(2020, 1, 1))), row("new", "no", None)];

        let visible = public_view(rows, false, today);
        assert_eq!(names(&visible), vec!["old"]);
    }

    #[test]
    fn test_awaiting_review_keeps_rejected() {
        let rows = vec![
            row("a", "TRUE", None),
            row("b", "", None),
            row("c", "REJECTED", None),
        ];
        assert_eq!(names(&awaiting_review(rows)), vec!["b", "c"]);
    }

    #[test]
    fn test_newest_first() {
        let mut rows = vec![
            Row {
                created: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
                ..row("old", "TRUE", None)
            },
            row("undated", "TRUE", None),
            Row {
                created: Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
                ..row("new", "TRUE", None)
            },
        ];
        newest_first(&mut rows);
        assert_eq!(names(&rows), vec!["new", "old", "undated"]);
    }
}
