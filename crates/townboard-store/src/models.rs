//! Domain model structs persisted as table rows.
//!
//! Every struct derives `Serialize` so it can be handed directly to the API
//! layer. Reads are lenient: a cell that does not parse becomes `None` (or
//! the type's default) rather than failing the whole table.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;

use townboard_shared::expiry::{format_calendar_date, parse_calendar_date, parse_timestamp};
use townboard_shared::{
    ApprovalStatus, MediaKind, Moderated, RatingTarget, RecordId, ResidentType, TableKind,
    TicketStatus,
};

use crate::record::columns::*;
use crate::record::{join_links, split_links, Record, RowRef};

fn timestamp_cell(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

fn date_cell(date: Option<NaiveDate>) -> String {
    date.map(format_calendar_date).unwrap_or_default()
}

fn positive_days(raw: &str) -> Option<u32> {
    raw.parse::<u32>().ok().filter(|d| *d > 0)
}

// ---------------------------------------------------------------------------
// Member
// ---------------------------------------------------------------------------

/// A registered resident or tenant.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Member {
    pub id: RecordId,
    pub created_at: Option<DateTime<Utc>>,
    pub status: ApprovalStatus,
    pub resident_type: ResidentType,
    pub phase: String,
    pub wing: String,
    pub unit: String,
    pub name: String,
    /// Lookup key for "may this person post". Not unique in the store.
    pub email: String,
    pub phone: String,
}

impl Member {
    pub fn email_matches(&self, email: &str) -> bool {
        let wanted = email.trim();
        !wanted.is_empty() && self.email.trim().eq_ignore_ascii_case(wanted)
    }
}

impl Record for Member {
    const KIND: TableKind = TableKind::Members;

    fn from_row(row: &RowRef<'_>) -> Self {
        Self {
            id: RecordId::from(row.get(ID)),
            created_at: parse_timestamp(row.get(TIMESTAMP)),
            status: ApprovalStatus::from_cell(row.get(APPROVED)),
            resident_type: ResidentType::from_cell(row.get(RESIDENT_TYPE)),
            phase: row.get(PHASE).to_string(),
            wing: row.get(WING).to_string(),
            unit: row.get(UNIT).to_string(),
            name: row.get(NAME).to_string(),
            email: row.get(EMAIL).to_string(),
            phone: row.get(PHONE).to_string(),
        }
    }

    fn to_cells(&self) -> Vec<(&'static str, String)> {
        vec![
            (ID, self.id.to_string()),
            (TIMESTAMP, timestamp_cell(self.created_at)),
            (APPROVED, self.status.sentinel().to_string()),
            (RESIDENT_TYPE, self.resident_type.as_str().to_string()),
            (PHASE, self.phase.clone()),
            (WING, self.wing.clone()),
            (UNIT, self.unit.clone()),
            (NAME, self.name.clone()),
            (EMAIL, self.email.clone()),
            (PHONE, self.phone.clone()),
        ]
    }
}

impl Moderated for Member {
    fn status(&self) -> ApprovalStatus {
        self.status
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

// ---------------------------------------------------------------------------
// Listing (business)
// ---------------------------------------------------------------------------

/// A resident-run business listing with a visibility window.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Listing {
    pub id: RecordId,
    pub created_at: Option<DateTime<Utc>>,
    pub status: ApprovalStatus,
    /// Submitter; must belong to an approved member at submission time.
    pub email: String,
    pub business_name: String,
    pub category: String,
    pub subcategory: String,
    pub description: String,
    pub contact: String,
    pub images: Vec<String>,
    pub duration_days: Option<u32>,
    pub expires_on: Option<NaiveDate>,
}

impl Record for Listing {
    const KIND: TableKind = TableKind::Listings;

    fn from_row(row: &RowRef<'_>) -> Self {
        Self {
            id: RecordId::from(row.get(ID)),
            created_at: parse_timestamp(row.get(TIMESTAMP)),
            status: ApprovalStatus::from_cell(row.get(APPROVED)),
            email: row.get(EMAIL).to_string(),
            business_name: row.get(BUSINESS_NAME).to_string(),
            category: row.get(CATEGORY).to_string(),
            subcategory: row.get(SUBCATEGORY).to_string(),
            description: row.get(DESCRIPTION).to_string(),
            contact: row.get(CONTACT).to_string(),
            images: split_links(row.get(IMAGES)),
            duration_days: positive_days(row.get(DURATION_DAYS)),
            expires_on: parse_calendar_date(row.get(EXPIRES_ON)),
        }
    }

    fn to_cells(&self) -> Vec<(&'static str, String)> {
        vec![
            (ID, self.id.to_string()),
            (TIMESTAMP, timestamp_cell(self.created_at)),
            (APPROVED, self.status.sentinel().to_string()),
            (EMAIL, self.email.clone()),
            (BUSINESS_NAME, self.business_name.clone()),
            (CATEGORY, self.category.clone()),
            (SUBCATEGORY, self.subcategory.clone()),
            (DESCRIPTION, self.description.clone()),
            (CONTACT, self.contact.clone()),
            (IMAGES, join_links(&self.images)),
            (
                DURATION_DAYS,
                self.duration_days.map(|d| d.to_string()).unwrap_or_default(),
            ),
            (EXPIRES_ON, date_cell(self.expires_on)),
        ]
    }
}

impl Moderated for Listing {
    fn status(&self) -> ApprovalStatus {
        self.status
    }

    fn expires_on(&self) -> Option<NaiveDate> {
        self.expires_on
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

// ---------------------------------------------------------------------------
// Vendor
// ---------------------------------------------------------------------------

/// An outside service provider recommended by a member.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Vendor {
    pub id: RecordId,
    pub created_at: Option<DateTime<Utc>>,
    pub status: ApprovalStatus,
    pub email: String,
    pub vendor_name: String,
    pub category: String,
    pub service: String,
    pub description: String,
    pub contact: String,
    pub images: Vec<String>,
    pub duration_days: Option<u32>,
    pub expires_on: Option<NaiveDate>,
}

impl Record for Vendor {
    const KIND: TableKind = TableKind::Vendors;

    fn from_row(row: &RowRef<'_>) -> Self {
        Self {
            id: RecordId::from(row.get(ID)),
            created_at: parse_timestamp(row.get(TIMESTAMP)),
            status: ApprovalStatus::from_cell(row.get(APPROVED)),
            email: row.get(EMAIL).to_string(),
            vendor_name: row.get(VENDOR_NAME).to_string(),
            category: row.get(CATEGORY).to_string(),
            service: row.get(SERVICE).to_string(),
            description: row.get(DESCRIPTION).to_string(),
            contact: row.get(CONTACT).to_string(),
            images: split_links(row.get(IMAGES)),
            duration_days: positive_days(row.get(DURATION_DAYS)),
            expires_on: parse_calendar_date(row.get(EXPIRES_ON)),
        }
    }

    fn to_cells(&self) -> Vec<(&'static str, String)> {
        vec![
            (ID, self.id.to_string()),
            (TIMESTAMP, timestamp_cell(self.created_at)),
            (APPROVED, self.status.sentinel().to_string()),
            (EMAIL, self.email.clone()),
            (VENDOR_NAME, self.vendor_name.clone()),
            (CATEGORY, self.category.clone()),
            (SERVICE, self.service.clone()),
            (DESCRIPTION, self.description.clone()),
            (CONTACT, self.contact.clone()),
            (IMAGES, join_links(&self.images)),
            (
                DURATION_DAYS,
                self.duration_days.map(|d| d.to_string()).unwrap_or_default(),
            ),
            (EXPIRES_ON, date_cell(self.expires_on)),
        ]
    }
}

impl Moderated for Vendor {
    fn status(&self) -> ApprovalStatus {
        self.status
    }

    fn expires_on(&self) -> Option<NaiveDate> {
        self.expires_on
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

// ---------------------------------------------------------------------------
// Showcase
// ---------------------------------------------------------------------------

/// An entry on the promotional showcase wall.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShowcaseItem {
    pub id: RecordId,
    pub created_at: Option<DateTime<Utc>>,
    pub status: ApprovalStatus,
    pub title: String,
    pub media_kind: MediaKind,
    pub media_url: String,
    pub posted_by: String,
    pub notes: String,
}

impl Record for ShowcaseItem {
    const KIND: TableKind = TableKind::Showcase;

    fn from_row(row: &RowRef<'_>) -> Self {
        Self {
            id: RecordId::from(row.get(ID)),
            created_at: parse_timestamp(row.get(TIMESTAMP)),
            status: ApprovalStatus::from_cell(row.get(APPROVED)),
            title: row.get(TITLE).to_string(),
            media_kind: MediaKind::from_cell(row.get(MEDIA_KIND)),
            media_url: row.get(MEDIA_URL).to_string(),
            posted_by: row.get(POSTED_BY).to_string(),
            notes: row.get(NOTES).to_string(),
        }
    }

    fn to_cells(&self) -> Vec<(&'static str, String)> {
        vec![
            (ID, self.id.to_string()),
            (TIMESTAMP, timestamp_cell(self.created_at)),
            (APPROVED, self.status.sentinel().to_string()),
            (TITLE, self.title.clone()),
            (MEDIA_KIND, self.media_kind.as_str().to_string()),
            (MEDIA_URL, self.media_url.clone()),
            (POSTED_BY, self.posted_by.clone()),
            (NOTES, self.notes.clone()),
        ]
    }
}

impl Moderated for ShowcaseItem {
    fn status(&self) -> ApprovalStatus {
        self.status
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

// ---------------------------------------------------------------------------
// Rating
// ---------------------------------------------------------------------------

/// One star rating. Append-only, only ever used in aggregate.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Rating {
    pub created_at: Option<DateTime<Utc>>,
    /// `None` when the cell holds something other than listing/vendor.
    pub target: Option<RatingTarget>,
    pub target_id: RecordId,
    /// `None` when the cell is not an integer in 1..=5.
    pub stars: Option<u8>,
    pub comment: String,
    pub email: String,
}

impl Rating {
    pub fn is_for(&self, target: RatingTarget, id: &RecordId) -> bool {
        self.target == Some(target) && id.matches(self.target_id.as_str())
    }
}

impl Record for Rating {
    const KIND: TableKind = TableKind::Ratings;

    fn from_row(row: &RowRef<'_>) -> Self {
        Self {
            created_at: parse_timestamp(row.get(TIMESTAMP)),
            target: row.get(TARGET_KIND).parse().ok(),
            target_id: RecordId::from(row.get(TARGET_ID)),
            stars: row
                .get(STARS)
                .parse::<u8>()
                .ok()
                .filter(|s| (1..=5).contains(s)),
            comment: row.get(COMMENT).to_string(),
            email: row.get(EMAIL).to_string(),
        }
    }

    fn to_cells(&self) -> Vec<(&'static str, String)> {
        vec![
            (TIMESTAMP, timestamp_cell(self.created_at)),
            (
                TARGET_KIND,
                self.target.map(|t| t.as_str().to_string()).unwrap_or_default(),
            ),
            (TARGET_ID, self.target_id.to_string()),
            (STARS, self.stars.map(|s| s.to_string()).unwrap_or_default()),
            (COMMENT, self.comment.clone()),
            (EMAIL, self.email.clone()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Ticket
// ---------------------------------------------------------------------------

/// A support request read by the moderator.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Ticket {
    pub id: RecordId,
    pub created_at: Option<DateTime<Utc>>,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: TicketStatus,
}

impl Record for Ticket {
    const KIND: TableKind = TableKind::Tickets;

    fn from_row(row: &RowRef<'_>) -> Self {
        Self {
            id: RecordId::from(row.get(ID)),
            created_at: parse_timestamp(row.get(TIMESTAMP)),
            email: row.get(EMAIL).to_string(),
            subject: row.get(SUBJECT).to_string(),
            message: row.get(MESSAGE).to_string(),
            status: TicketStatus::from_cell(row.get(STATUS)),
        }
    }

    fn to_cells(&self) -> Vec<(&'static str, String)> {
        vec![
            (ID, self.id.to_string()),
            (TIMESTAMP, timestamp_cell(self.created_at)),
            (EMAIL, self.email.clone()),
            (SUBJECT, self.subject.clone()),
            (MESSAGE, self.message.clone()),
            (STATUS, self.status.as_str().to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::HeaderIndex;

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_listing_reads_hand_edited_row() {
        let header = HeaderIndex::defaults(TableKind::Listings);
        let cells = row(&[
            "l1",
            "2024-05-01 09:30:00",
            " Yes",
            "a@example.com",
            "Tiffin Co",
            "Food",
            "Lunch",
            "Home cooked",
            "555-0100",
            "https://img/1.jpg, https://img/2.jpg",
            "30",
            "31/05/2024",
        ]);
        let listing = Listing::from_row(&RowRef::new(&header, &cells));

        assert_eq!(listing.status, ApprovalStatus::Approved);
        assert!(listing.created_at.is_some());
        assert_eq!(listing.images.len(), 2);
        assert_eq!(listing.duration_days, Some(30));
        // Not a supported date format: treated as no expiry.
        assert_eq!(listing.expires_on, None);
    }

    #[test]
    fn test_rating_rejects_out_of_range_stars() {
        let header = HeaderIndex::defaults(TableKind::Ratings);
        let cells = row(&["", "vendor", "v1", "7", "", "r@example.com"]);
        let rating = Rating::from_row(&RowRef::new(&header, &cells));
        assert_eq!(rating.stars, None);
        assert!(rating.is_for(RatingTarget::Vendor, &RecordId::from("v1")));
        assert!(!rating.is_for(RatingTarget::Listing, &RecordId::from("v1")));
    }

    #[test]
    fn test_member_email_match() {
        let header = HeaderIndex::defaults(TableKind::Members);
        let cells = row(&["m1", "", "TRUE", "Tenant", "", "", "", "Asha", " Asha@Example.com "]);
        let member = Member::from_row(&RowRef::new(&header, &cells));
        assert!(member.email_matches("asha@example.com"));
        assert!(!member.email_matches(""));
        assert_eq!(member.resident_type, ResidentType::Tenant);
    }

    #[test]
    fn test_ticket_cells_use_default_status() {
        let ticket = Ticket {
            id: RecordId::from("t1"),
            created_at: None,
            email: "a@example.com".into(),
            subject: "Gate".into(),
            message: "Broken".into(),
            status: TicketStatus::default(),
        };
        let cells = ticket.to_cells();
        assert!(cells.contains(&(STATUS, "Open".to_string())));
    }
}
