//! v001 -- Initial schema creation.
//!
//! A sheet-shaped layout: `sheets` names the tables, `sheet_rows` holds each
//! row as a JSON array of cells. Row 0 is the header.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Sheets (one per entity kind)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS sheets (
    name       TEXT PRIMARY KEY NOT NULL,
    created_at TEXT NOT NULL                  -- RFC-3339
);

-- ----------------------------------------------------------------
-- Rows
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS sheet_rows (
    sheet   TEXT NOT NULL,                    -- FK -> sheets(name)
    row_idx INTEGER NOT NULL,                 -- 0 = header
    cells   TEXT NOT NULL,                    -- JSON array of strings

    PRIMARY KEY (sheet, row_idx),
    FOREIGN KEY (sheet) REFERENCES sheets(name) ON DELETE CASCADE
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
