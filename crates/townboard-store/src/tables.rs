//! Typed access to the record store.
//!
//! [`Tables`] resolves column positions through a per-table header cache,
//! finds rows by a full scan of the `ID` column, and lays appended records
//! out in whatever column order the table actually has.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::{debug, info, warn};

use townboard_shared::{RecordId, TableKind};

use crate::error::{Result, StoreError};
use crate::record::{columns, default_header, HeaderIndex, Record, RowRef};
use crate::table::TableStore;

/// What the schema check found (or did) for one table.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TableReport {
    pub kind: TableKind,
    pub table: String,
    pub header: Vec<String>,
    /// Data rows, header excluded.
    pub rows: usize,
    /// Default columns the header lacks.
    pub missing_columns: Vec<String>,
    pub created: bool,
    pub header_written: bool,
}

/// A row found by identifier. `row` indexes the full table (0 = header).
#[derive(Debug, Clone)]
pub(crate) struct Located {
    pub row: usize,
    pub cells: Vec<String>,
}

pub struct Tables {
    store: Arc<dyn TableStore>,
    headers: RwLock<HashMap<TableKind, HeaderIndex>>,
}

impl Tables {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            store,
            headers: RwLock::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &dyn TableStore {
        self.store.as_ref()
    }

    // ------------------------------------------------------------------
    // Schema
    // ------------------------------------------------------------------

    /// Create missing tables and fill blank header rows with the defaults.
    pub fn ensure_schema(&self) -> Result<Vec<TableReport>> {
        let existing = self.store.table_names()?;
        info!(tables = ?existing, "record store tables");

        let mut reports = Vec::with_capacity(TableKind::ALL.len());
        for kind in TableKind::ALL {
            let table = kind.table_name();
            let defaults: Vec<String> = default_header(kind).iter().map(|s| s.to_string()).collect();
            let mut created = false;
            let mut header_written = false;

            if !existing.iter().any(|name| name == table) {
                self.store.create_table(table)?;
                created = true;
                info!(table, "created missing table");
            }

            let rows = self.store.read_fresh(table)?;
            let header = match rows.first().and_then(|h| HeaderIndex::from_header_row(table, h)) {
                Some(header) => header,
                None => {
                    self.store.write_header(table, &defaults)?;
                    header_written = true;
                    info!(table, "wrote default header");
                    HeaderIndex::defaults(kind)
                }
            };

            let missing: Vec<String> = header
                .missing_defaults(kind)
                .into_iter()
                .map(str::to_string)
                .collect();
            if !missing.is_empty() {
                warn!(table, missing = ?missing, "table header lacks expected columns");
            }

            reports.push(TableReport {
                kind,
                table: table.to_string(),
                header: header.names().to_vec(),
                rows: rows.len().saturating_sub(1),
                missing_columns: missing,
                created,
                header_written,
            });
        }

        self.reload_schema();
        Ok(reports)
    }

    /// Current state of every table, without changing anything.
    pub fn probe(&self) -> Result<Vec<TableReport>> {
        let existing = self.store.table_names()?;
        let mut reports = Vec::new();
        for kind in TableKind::ALL {
            let table = kind.table_name();
            if !existing.iter().any(|name| name == table) {
                reports.push(TableReport {
                    kind,
                    table: table.to_string(),
                    header: Vec::new(),
                    rows: 0,
                    missing_columns: default_header(kind).iter().map(|s| s.to_string()).collect(),
                    created: false,
                    header_written: false,
                });
                continue;
            }
            let rows = self.store.read_fresh(table)?;
            let header = rows
                .first()
                .and_then(|h| HeaderIndex::from_header_row(table, h));
            reports.push(TableReport {
                kind,
                table: table.to_string(),
                header: header.as_ref().map(|h| h.names().to_vec()).unwrap_or_default(),
                rows: rows.len().saturating_sub(1),
                missing_columns: header
                    .map(|h| h.missing_defaults(kind))
                    .unwrap_or_else(|| default_header(kind).to_vec())
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                created: false,
                header_written: false,
            });
        }
        Ok(reports)
    }

    /// Forget cached header positions; the next mutation re-reads them.
    pub fn reload_schema(&self) {
        let mut headers = self.headers.write().unwrap_or_else(|e| e.into_inner());
        headers.clear();
    }

    /// Cached header index for a table, read on first use.
    pub fn header_index(&self, kind: TableKind) -> Result<HeaderIndex> {
        {
            let headers = self.headers.read().unwrap_or_else(|e| e.into_inner());
            if let Some(header) = headers.get(&kind) {
                return Ok(header.clone());
            }
        }

        let rows = self.store.read_fresh(kind.table_name())?;
        let header = HeaderIndex::for_snapshot(kind, &rows);
        debug!(table = kind.table_name(), columns = header.len(), "cached header index");

        let mut headers = self.headers.write().unwrap_or_else(|e| e.into_inner());
        headers.insert(kind, header.clone());
        Ok(header)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Every non-blank data row of `R`'s table, possibly from the read cache.
    pub fn load<R: Record>(&self) -> Result<Vec<R>> {
        let rows = self.store.read_all(R::KIND.table_name())?;
        let header = HeaderIndex::for_snapshot(R::KIND, &rows);
        Ok(rows
            .iter()
            .skip(1)
            .map(|cells| RowRef::new(&header, cells))
            .filter(|row| !row.is_blank())
            .map(|row| R::from_row(&row))
            .collect())
    }

    // ------------------------------------------------------------------
    // Write
    // ------------------------------------------------------------------

    pub fn append<R: Record>(&self, record: &R) -> Result<()> {
        let table = R::KIND.table_name();
        let header = self.header_index(R::KIND)?;
        let (cells, dropped) = header.layout(record.to_cells());
        if !dropped.is_empty() {
            warn!(table, dropped = ?dropped, "table has no column for these fields");
        }
        self.store.append_row(table, &cells)
    }

    /// Set one named field on the row with this identifier.
    pub fn update_field(&self, kind: TableKind, id: &RecordId, column: &str, value: &str) -> Result<()> {
        let header = self.header_index(kind)?;
        let col = header.require(column)?;
        let found = self.locate(kind, &header, id)?;
        self.store.update_cell(kind.table_name(), found.row, col, value)
    }

    /// Full scan of the `ID` column on a fresh read.
    pub(crate) fn locate(&self, kind: TableKind, header: &HeaderIndex, id: &RecordId) -> Result<Located> {
        let table = kind.table_name();
        let id_col = header.require(columns::ID)?;
        let rows = self.store.read_fresh(table)?;

        rows.into_iter()
            .enumerate()
            .skip(1)
            .find(|(_, cells)| cells.get(id_col).is_some_and(|cell| id.matches(cell)))
            .map(|(row, cells)| Located { row, cells })
            .ok_or_else(|| StoreError::NotFound {
                table: table.to_string(),
                id: id.to_string(),
            })
    }
}
