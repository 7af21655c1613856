//! Approval state machine over the moderated tables.
//!
//! Every transition locates its row by a full scan of the `ID` column on a
//! fresh read, resolves all the columns it will touch before writing
//! anything, and writes expiry before status so a failure part-way never
//! leaves an approved row with a stale window.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use townboard_shared::expiry::{expires_on, extended_expiry, format_calendar_date, parse_calendar_date};
use townboard_shared::{ApprovalStatus, DomainError, RecordId, TableKind};

use crate::error::Result;
use crate::record::columns;
use crate::tables::Tables;

/// Outcome of an approve or reject.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Transition {
    pub kind: TableKind,
    pub id: RecordId,
    pub status: ApprovalStatus,
    /// Expiry written by this transition, if any.
    pub expires_on: Option<NaiveDate>,
}

impl Tables {
    /// Mark a row approved. For tables with an expiry the window restarts
    /// today, using the row's own `DurationDays`.
    pub fn approve(&self, kind: TableKind, id: &RecordId, today: NaiveDate) -> Result<Transition> {
        kind.ensure_moderated()?;
        let table = kind.table_name();
        let header = self.header_index(kind)?;
        let status_col = header.require(columns::APPROVED)?;
        let expiry_cols = if kind.has_expiry() {
            Some((
                header.require(columns::DURATION_DAYS)?,
                header.require(columns::EXPIRES_ON)?,
            ))
        } else {
            None
        };

        let found = self.locate(kind, &header, id)?;

        let mut new_expiry = None;
        if let Some((duration_col, expires_col)) = expiry_cols {
            let raw = found.cells.get(duration_col).map(|s| s.trim()).unwrap_or("");
            match raw.parse::<u32>().ok().and_then(|days| expires_on(today, days)) {
                Some(date) => {
                    self.store()
                        .update_cell(table, found.row, expires_col, &format_calendar_date(date))?;
                    new_expiry = Some(date);
                }
                None => {
                    warn!(table, %id, duration = raw, "unreadable duration, expiry left unchanged");
                }
            }
        }

        let status = ApprovalStatus::Approved;
        self.store()
            .update_cell(table, found.row, status_col, status.sentinel())?;
        info!(table, %id, expires_on = ?new_expiry, "record approved");

        Ok(Transition {
            kind,
            id: id.clone(),
            status,
            expires_on: new_expiry,
        })
    }

    pub fn reject(&self, kind: TableKind, id: &RecordId) -> Result<Transition> {
        kind.ensure_moderated()?;
        let table = kind.table_name();
        let header = self.header_index(kind)?;
        let status_col = header.require(columns::APPROVED)?;
        let found = self.locate(kind, &header, id)?;

        let status = ApprovalStatus::Rejected;
        self.store()
            .update_cell(table, found.row, status_col, status.sentinel())?;
        info!(table, %id, "record rejected");

        Ok(Transition {
            kind,
            id: id.clone(),
            status,
            expires_on: None,
        })
    }

    /// Push a row's expiry out by `extra_days` from its current value, or
    /// from today when the current value is blank or unreadable. Status is
    /// not consulted and no bounds are applied.
    pub fn extend(&self, kind: TableKind, id: &RecordId, extra_days: i64, today: NaiveDate) -> Result<NaiveDate> {
        if !kind.has_expiry() {
            return Err(DomainError::NoExpiry(kind).into());
        }
        let table = kind.table_name();
        let header = self.header_index(kind)?;
        let expires_col = header.require(columns::EXPIRES_ON)?;
        let found = self.locate(kind, &header, id)?;

        let current = found
            .cells
            .get(expires_col)
            .and_then(|raw| parse_calendar_date(raw));
        if current.is_none() {
            warn!(table, %id, "no readable expiry, extending from today");
        }
        let date = extended_expiry(current, today, extra_days)
            .ok_or(DomainError::ExpiryOutOfRange(extra_days))?;
        self.store()
            .update_cell(table, found.row, expires_col, &format_calendar_date(date))?;
        info!(table, %id, extra_days, expires_on = %date, "expiry extended");
        Ok(date)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use townboard_shared::public_view;

    use super::*;
    use crate::error::StoreError;
    use crate::memory::MemoryTableStore;
    use crate::models::{Listing, Member};
    use crate::table::TableStore;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn tables() -> Tables {
        let tables = Tables::new(Arc::new(MemoryTableStore::new()));
        tables.ensure_schema().unwrap();
        tables
    }

    fn listing(id: &str, days: u32, submitted: NaiveDate) -> Listing {
        Listing {
            id: RecordId::from(id),
            created_at: None,
            status: ApprovalStatus::Pending,
            email: "owner@example.com".into(),
            business_name: "Tiffin Co".into(),
            category: "Food".into(),
            subcategory: String::new(),
            description: "Home cooked lunch".into(),
            contact: String::new(),
            images: Vec::new(),
            duration_days: Some(days),
            expires_on: expires_on(submitted, days),
        }
    }

    fn visible(tables: &Tables, today: NaiveDate) -> Vec<RecordId> {
        let rows: Vec<Listing> = tables.load().unwrap();
        public_view(rows, true, today).into_iter().map(|l| l.id).collect()
    }

    #[test]
    fn test_approve_expire_extend_scenario() {
        let tables = tables();
        let day = d(2024, 3, 1);
        let id = RecordId::from("L");

        tables.append(&listing("L", 30, day)).unwrap();
        let stored: Vec<Listing> = tables.load().unwrap();
        assert_eq!(stored[0].status, ApprovalStatus::Pending);
        assert_eq!(stored[0].expires_on, Some(day + Duration::days(30)));
        assert!(visible(&tables, day).is_empty());

        let t = tables
            .approve(TableKind::Listings, &id, day + Duration::days(5))
            .unwrap();
        assert_eq!(t.status, ApprovalStatus::Approved);
        assert_eq!(t.expires_on, Some(day + Duration::days(35)));
        assert_eq!(visible(&tables, day + Duration::days(35)), vec![id.clone()]);

        assert!(visible(&tables, day + Duration::days(40)).is_empty());

        let extended = tables
            .extend(TableKind::Listings, &id, 10, day + Duration::days(40))
            .unwrap();
        assert_eq!(extended, day + Duration::days(45));
        assert_eq!(visible(&tables, day + Duration::days(40)), vec![id.clone()]);
        assert_eq!(visible(&tables, day + Duration::days(45)), vec![id]);
        assert!(visible(&tables, day + Duration::days(46)).is_empty());
    }

    #[test]
    fn test_reject_is_distinct_from_pending() {
        let tables = tables();
        tables.append(&listing("L", 7, d(2024, 1, 1))).unwrap();

        let t = tables.reject(TableKind::Listings, &RecordId::from(" L ")).unwrap();
        assert_eq!(t.status, ApprovalStatus::Rejected);

        let raw = tables.store().read_all("Business_Listings").unwrap();
        assert_eq!(raw[1][2], "REJECTED");
        let rows: Vec<Listing> = tables.load().unwrap();
        assert_eq!(rows[0].status, ApprovalStatus::Rejected);
    }

    #[test]
    fn test_extend_unreadable_expiry_counts_from_today() {
        let store = Arc::new(MemoryTableStore::new().with_table(
            "Vendors",
            &["ID", "Approved", "DurationDays", "ExpiresOn"],
            vec![vec!["v1", "yes", "15", "someday"]],
        ));
        let tables = Tables::new(store);
        let today = d(2024, 6, 10);
        let date = tables
            .extend(TableKind::Vendors, &RecordId::from("v1"), 20, today)
            .unwrap();
        assert_eq!(date, d(2024, 6, 30));
    }

    #[test]
    fn test_approve_member_has_no_expiry() {
        let tables = tables();
        let member = Member {
            id: RecordId::from("m1"),
            created_at: None,
            status: ApprovalStatus::Pending,
            resident_type: Default::default(),
            phase: String::new(),
            wing: String::new(),
            unit: String::new(),
            name: "Ravi".into(),
            email: "ravi@example.com".into(),
            phone: String::new(),
        };
        tables.append(&member).unwrap();

        let t = tables
            .approve(TableKind::Members, &RecordId::from("m1"), d(2024, 1, 1))
            .unwrap();
        assert_eq!(t.expires_on, None);
        let members: Vec<Member> = tables.load().unwrap();
        assert!(members[0].status.is_approved());

        assert!(matches!(
            tables.extend(TableKind::Members, &RecordId::from("m1"), 5, d(2024, 1, 1)),
            Err(StoreError::Domain(DomainError::NoExpiry(TableKind::Members)))
        ));
    }

    #[test]
    fn test_approve_unknown_id_and_missing_column() {
        let tables = tables();
        assert!(matches!(
            tables.approve(TableKind::Vendors, &RecordId::from("ghost"), d(2024, 1, 1)),
            Err(StoreError::NotFound { .. })
        ));

        let store = Arc::new(MemoryTableStore::new().with_table(
            "Members",
            &["ID", "Email"],
            vec![vec!["m1", "a@example.com"]],
        ));
        let tables = Tables::new(store.clone());
        assert!(matches!(
            tables.approve(TableKind::Members, &RecordId::from("m1"), d(2024, 1, 1)),
            Err(StoreError::Schema { ref column, .. }) if column == "Approved"
        ));
        // Nothing written.
        assert_eq!(store.read_all("Members").unwrap()[1], vec!["m1", "a@example.com"]);
    }

    #[test]
    fn test_ratings_are_not_moderated() {
        let tables = tables();
        assert!(matches!(
            tables.reject(TableKind::Ratings, &RecordId::from("x")),
            Err(StoreError::Domain(DomainError::NotModerated(TableKind::Ratings)))
        ));
    }

    #[test]
    fn test_unreadable_duration_keeps_expiry() {
        let store = Arc::new(MemoryTableStore::new().with_table(
            "Vendors",
            &["ID", "Approved", "DurationDays", "ExpiresOn"],
            vec![vec!["v1", "", "a month", "2024-02-01"]],
        ));
        let tables = Tables::new(store.clone());
        let t = tables
            .approve(TableKind::Vendors, &RecordId::from("v1"), d(2024, 1, 1))
            .unwrap();
        assert_eq!(t.expires_on, None);
        assert_eq!(
            store.read_all("Vendors").unwrap()[1],
            vec!["v1", "TRUE", "a month", "2024-02-01"]
        );
    }

    #[test]
    fn test_oversized_duration_keeps_expiry() {
        let store = Arc::new(MemoryTableStore::new().with_table(
            "Vendors",
            &["ID", "Approved", "DurationDays", "ExpiresOn"],
            vec![vec!["v1", "", "4000000000", "2024-02-01"]],
        ));
        let tables = Tables::new(store.clone());
        let t = tables
            .approve(TableKind::Vendors, &RecordId::from("v1"), d(2024, 1, 1))
            .unwrap();
        assert_eq!(t.status, ApprovalStatus::Approved);
        assert_eq!(t.expires_on, None);
        assert_eq!(
            store.read_all("Vendors").unwrap()[1],
            vec!["v1", "TRUE", "4000000000", "2024-02-01"]
        );
    }

    #[test]
    fn test_extend_past_calendar_end_is_refused() {
        let store = Arc::new(MemoryTableStore::new().with_table(
            "Vendors",
            &["ID", "Approved", "DurationDays", "ExpiresOn"],
            vec![vec!["v1", "TRUE", "30", "2024-02-01"]],
        ));
        let tables = Tables::new(store.clone());
        assert!(matches!(
            tables.extend(TableKind::Vendors, &RecordId::from("v1"), i64::MAX, d(2024, 1, 1)),
            Err(StoreError::Domain(DomainError::ExpiryOutOfRange(_)))
        ));
        assert_eq!(store.read_all("Vendors").unwrap()[1][3], "2024-02-01");
    }
}
