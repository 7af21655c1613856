use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::VISIBILITY_WINDOWS;
use crate::error::DomainError;

// Row identifier = whatever sits in the `ID` column. Generated ones are UUID v4,
// but rows typed in by hand can carry anything.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Cells are compared after trimming so stray spaces typed into the
    /// sheet do not hide a row.
    pub fn matches(&self, cell: &str) -> bool {
        !self.0.trim().is_empty() && cell.trim() == self.0.trim()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.trim().to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s.trim().to_string())
    }
}

/// One table per entity kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Members,
    Listings,
    Vendors,
    Showcase,
    Ratings,
    Tickets,
}

impl TableKind {
    pub const ALL: [TableKind; 6] = [
        TableKind::Members,
        TableKind::Listings,
        TableKind::Vendors,
        TableKind::Showcase,
        TableKind::Ratings,
        TableKind::Tickets,
    ];

    /// Name of the backing table in the record store.
    pub fn table_name(self) -> &'static str {
        match self {
            TableKind::Members => "Members",
            TableKind::Listings => "Business_Listings",
            TableKind::Vendors => "Vendors",
            TableKind::Showcase => "Showcase",
            TableKind::Ratings => "Ratings",
            TableKind::Tickets => "Tickets",
        }
    }

    /// URL / form slug.
    pub fn slug(self) -> &'static str {
        match self {
            TableKind::Members => "members",
            TableKind::Listings => "listings",
            TableKind::Vendors => "vendors",
            TableKind::Showcase => "showcase",
            TableKind::Ratings => "ratings",
            TableKind::Tickets => "tickets",
        }
    }

    /// Whether rows carry `DurationDays` / `ExpiresOn`.
    pub fn has_expiry(self) -> bool {
        matches!(self, TableKind::Listings | TableKind::Vendors)
    }

    /// Whether rows carry an `Approved` status column.
    pub fn is_moderated(self) -> bool {
        matches!(
            self,
            TableKind::Members | TableKind::Listings | TableKind::Vendors | TableKind::Showcase
        )
    }

    pub fn ensure_moderated(self) -> Result<Self, DomainError> {
        if self.is_moderated() {
            Ok(self)
        } else {
            Err(DomainError::NotModerated(self))
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for TableKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "members" | "member" => Ok(TableKind::Members),
            "listings" | "listing" | "business_listings" => Ok(TableKind::Listings),
            "vendors" | "vendor" => Ok(TableKind::Vendors),
            "showcase" => Ok(TableKind::Showcase),
            "ratings" | "rating" => Ok(TableKind::Ratings),
            "tickets" | "ticket" => Ok(TableKind::Tickets),
            other => Err(DomainError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ResidentType {
    #[default]
    Resident,
    Tenant,
}

impl ResidentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResidentType::Resident => "Resident",
            ResidentType::Tenant => "Tenant",
        }
    }

    /// Lenient read of a stored cell: anything not recognisably a tenant
    /// is a resident.
    pub fn from_cell(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }
}

impl FromStr for ResidentType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resident" | "owner" => Ok(ResidentType::Resident),
            "tenant" => Ok(ResidentType::Tenant),
            other => Err(DomainError::InvalidValue {
                field: "resident_type",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub fn from_cell(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }
}

impl FromStr for MediaKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" | "photo" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            other => Err(DomainError::InvalidValue {
                field: "media_kind",
                value: other.to_string(),
            }),
        }
    }
}

/// What a rating points at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RatingTarget {
    Listing,
    Vendor,
}

impl RatingTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            RatingTarget::Listing => "listing",
            RatingTarget::Vendor => "vendor",
        }
    }

    pub fn table(self) -> TableKind {
        match self {
            RatingTarget::Listing => TableKind::Listings,
            RatingTarget::Vendor => TableKind::Vendors,
        }
    }
}

impl FromStr for RatingTarget {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "listing" | "listings" | "business" => Ok(RatingTarget::Listing),
            "vendor" | "vendors" => Ok(RatingTarget::Vendor),
            other => Err(DomainError::InvalidValue {
                field: "target_kind",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TicketStatus {
    #[default]
    Open,
    Closed,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Open => crate::constants::TICKET_OPEN,
            TicketStatus::Closed => crate::constants::TICKET_CLOSED,
        }
    }

    pub fn from_cell(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "closed" | "resolved" | "done" => TicketStatus::Closed,
            _ => TicketStatus::Open,
        }
    }
}

/// Submitter-chosen number of days a listing stays visible once approved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "i64", into = "u32")]
pub struct VisibilityWindow(u32);

impl VisibilityWindow {
    pub fn days(self) -> u32 {
        self.0
    }
}

impl Default for VisibilityWindow {
    fn default() -> Self {
        Self(30)
    }
}

impl TryFrom<i64> for VisibilityWindow {
    type Error = DomainError;

    fn try_from(days: i64) -> Result<Self, Self::Error> {
        VISIBILITY_WINDOWS
            .iter()
            .copied()
            .find(|allowed| i64::from(*allowed) == days)
            .map(Self)
            .ok_or(DomainError::InvalidWindow(days))
    }
}

impl From<VisibilityWindow> for u32 {
    fn from(w: VisibilityWindow) -> Self {
        w.0
    }
}
