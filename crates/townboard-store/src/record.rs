//! Mapping between positional rows and typed records.
//!
//! Columns are found by header name (trimmed, ASCII case-insensitive), never
//! by a fixed position, so moderators can reorder or add columns in the
//! sheet without breaking anything.

use std::collections::HashMap;

use townboard_shared::TableKind;

use crate::error::{Result, StoreError};

pub mod columns {
    pub const ID: &str = "ID";
    pub const TIMESTAMP: &str = "Timestamp";
    pub const APPROVED: &str = "Approved";
    pub const EMAIL: &str = "Email";
    pub const NAME: &str = "Name";
    pub const PHONE: &str = "Phone";
    pub const RESIDENT_TYPE: &str = "ResidentType";
    pub const PHASE: &str = "Phase";
    pub const WING: &str = "Wing";
    pub const UNIT: &str = "Unit";
    pub const BUSINESS_NAME: &str = "BusinessName";
    pub const VENDOR_NAME: &str = "VendorName";
    pub const CATEGORY: &str = "Category";
    pub const SUBCATEGORY: &str = "Subcategory";
    pub const SERVICE: &str = "Service";
    pub const DESCRIPTION: &str = "Description";
    pub const CONTACT: &str = "Contact";
    pub const IMAGES: &str = "Images";
    pub const DURATION_DAYS: &str = "DurationDays";
    pub const EXPIRES_ON: &str = "ExpiresOn";
    pub const TITLE: &str = "Title";
    pub const MEDIA_KIND: &str = "MediaKind";
    pub const MEDIA_URL: &str = "MediaUrl";
    pub const POSTED_BY: &str = "PostedBy";
    pub const NOTES: &str = "Notes";
    pub const TARGET_KIND: &str = "TargetKind";
    pub const TARGET_ID: &str = "TargetID";
    pub const STARS: &str = "Stars";
    pub const COMMENT: &str = "Comment";
    pub const SUBJECT: &str = "Subject";
    pub const MESSAGE: &str = "Message";
    pub const STATUS: &str = "Status";
}

use columns::*;

/// Header written into a new or blank table, and used to read a table whose
/// header row is missing.
pub fn default_header(kind: TableKind) -> &'static [&'static str] {
    match kind {
        TableKind::Members => &[
            ID, TIMESTAMP, APPROVED, RESIDENT_TYPE, PHASE, WING, UNIT, NAME, EMAIL, PHONE,
        ],
        TableKind::Listings => &[
            ID, TIMESTAMP, APPROVED, EMAIL, BUSINESS_NAME, CATEGORY, SUBCATEGORY, DESCRIPTION,
            CONTACT, IMAGES, DURATION_DAYS, EXPIRES_ON,
        ],
        TableKind::Vendors => &[
            ID, TIMESTAMP, APPROVED, EMAIL, VENDOR_NAME, CATEGORY, SERVICE, DESCRIPTION, CONTACT,
            IMAGES, DURATION_DAYS, EXPIRES_ON,
        ],
        TableKind::Showcase => &[
            ID, TIMESTAMP, APPROVED, TITLE, MEDIA_KIND, MEDIA_URL, POSTED_BY, NOTES,
        ],
        TableKind::Ratings => &[TIMESTAMP, TARGET_KIND, TARGET_ID, STARS, COMMENT, EMAIL],
        TableKind::Tickets => &[ID, TIMESTAMP, EMAIL, SUBJECT, MESSAGE, STATUS],
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Column name -> position for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderIndex {
    table: String,
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    /// Build from a header row. `None` when the row is empty or all blank.
    pub fn from_header_row(table: &str, row: &[String]) -> Option<Self> {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            return None;
        }
        let mut positions = HashMap::new();
        for (i, name) in row.iter().enumerate() {
            let key = normalize(name);
            // First occurrence wins when a header is duplicated.
            if !key.is_empty() {
                positions.entry(key).or_insert(i);
            }
        }
        Some(Self {
            table: table.to_string(),
            names: row.to_vec(),
            positions,
        })
    }

    pub fn defaults(kind: TableKind) -> Self {
        let row: Vec<String> = default_header(kind).iter().map(|s| s.to_string()).collect();
        // The default header is never blank.
        Self::from_header_row(kind.table_name(), &row).unwrap_or_else(|| Self {
            table: kind.table_name().to_string(),
            names: Vec::new(),
            positions: HashMap::new(),
        })
    }

    /// Header from a table snapshot, falling back to the kind's defaults.
    pub fn for_snapshot(kind: TableKind, rows: &[Vec<String>]) -> Self {
        rows.first()
            .and_then(|header| Self::from_header_row(kind.table_name(), header))
            .unwrap_or_else(|| {
                tracing::warn!(table = kind.table_name(), "header row missing, using defaults");
                Self::defaults(kind)
            })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(&normalize(column)).copied()
    }

    /// Position of a column the caller cannot do without.
    pub fn require(&self, column: &str) -> Result<usize> {
        self.position(column).ok_or_else(|| StoreError::Schema {
            table: self.table.clone(),
            column: column.to_string(),
        })
    }

    /// Default columns this header lacks.
    pub fn missing_defaults(&self, kind: TableKind) -> Vec<&'static str> {
        default_header(kind)
            .iter()
            .copied()
            .filter(|col| self.position(col).is_none())
            .collect()
    }

    /// Lay named cells out in header order. Columns the header lacks are
    /// dropped and returned so the caller can log them.
    pub fn layout(&self, cells: Vec<(&'static str, String)>) -> (Vec<String>, Vec<&'static str>) {
        let mut row = vec![String::new(); self.names.len()];
        let mut dropped = Vec::new();
        for (column, value) in cells {
            match self.position(column) {
                Some(i) => row[i] = value,
                None if value.is_empty() => {}
                None => dropped.push(column),
            }
        }
        (row, dropped)
    }
}

/// A borrowed data row read through its table's header.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    header: &'a HeaderIndex,
    cells: &'a [String],
}

impl<'a> RowRef<'a> {
    pub fn new(header: &'a HeaderIndex, cells: &'a [String]) -> Self {
        Self { header, cells }
    }

    /// Trimmed cell value; blank when the column or cell is missing.
    pub fn get(&self, column: &str) -> &'a str {
        self.header
            .position(column)
            .and_then(|i| self.cells.get(i))
            .map(|s| s.trim())
            .unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }
}

/// A typed row of one table.
pub trait Record: Sized {
    const KIND: TableKind;

    fn from_row(row: &RowRef<'_>) -> Self;

    /// Named cells to append; order does not matter.
    fn to_cells(&self) -> Vec<(&'static str, String)>;
}

/// Split an `Images` cell into individual links.
pub fn split_links(raw: &str) -> Vec<String> {
    raw.split(|c| c == ',' || c == '\n' || c == ';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_links(links: &[String]) -> String {
    links
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}
