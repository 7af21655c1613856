//! SQLite-backed [`TableStore`].
//!
//! The [`SqliteTableStore`] owns a [`rusqlite::Connection`] and guarantees
//! that migrations are run before any other operation. Tables keep the
//! spreadsheet shape (header row plus positional rows) so the rest of the
//! workspace cannot tell it apart from a hosted sheet.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};
use crate::migrations;
use crate::table::{set_cell, TableStore};

pub struct SqliteTableStore {
    conn: Mutex<Connection>,
}

impl SqliteTableStore {
    /// Open (or create) the default application database.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/townboard/townboard.db`
    /// - macOS:   `~/Library/Application Support/org.townboard.townboard/townboard.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\townboard\townboard\data\townboard.db`
    pub fn new() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("org", "townboard", "townboard").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        let db_path = data_dir.join("townboard.db");

        tracing::info!(path = %db_path.display(), "opening database");

        Self::open_at(&db_path)
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn)
    }

    /// A private database that lives as long as the handle.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_secs(2))?;

        migrations::run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn().path().map(PathBuf::from)
    }

    fn ensure_exists(conn: &Connection, table: &str) -> Result<()> {
        let found: Option<String> = conn
            .query_row(
                "SELECT name FROM sheets WHERE name = ?1",
                params![table],
                |row| row.get(0),
            )
            .optional()?;
        match found {
            Some(_) => Ok(()),
            None => Err(StoreError::UnknownTable(table.to_string())),
        }
    }

    fn load_row(conn: &Connection, table: &str, row: usize) -> Result<Option<Vec<String>>> {
        let json: Option<String> = conn
            .query_row(
                "SELECT cells FROM sheet_rows WHERE sheet = ?1 AND row_idx = ?2",
                params![table, row as i64],
                |r| r.get(0),
            )
            .optional()?;
        json.map(|j| serde_json::from_str(&j).map_err(StoreError::from))
            .transpose()
    }

    fn store_row(conn: &Connection, table: &str, row: usize, cells: &[String]) -> Result<()> {
        conn.execute(
            "INSERT INTO sheet_rows (sheet, row_idx, cells) VALUES (?1, ?2, ?3)
             ON CONFLICT(sheet, row_idx) DO UPDATE SET cells = excluded.cells",
            params![table, row as i64, serde_json::to_string(cells)?],
        )?;
        Ok(())
    }
}

impl TableStore for SqliteTableStore {
    fn table_names(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT name FROM sheets ORDER BY rowid ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    fn create_table(&self, table: &str) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO sheets (name, created_at) VALUES (?1, ?2)",
            params![table, Utc::now().to_rfc3339()],
        )?;
        if inserted > 0 {
            Self::store_row(&tx, table, 0, &[])?;
            tracing::debug!(table, "created table");
        }
        tx.commit()?;
        Ok(())
    }

    fn read_all(&self, table: &str) -> Result<Vec<Vec<String>>> {
        let conn = self.conn();
        Self::ensure_exists(&conn, table)?;

        let mut stmt =
            conn.prepare("SELECT cells FROM sheet_rows WHERE sheet = ?1 ORDER BY row_idx ASC")?;
        let rows = stmt.query_map(params![table], |row| row.get::<_, String>(0))?;

        let mut all = Vec::new();
        for json in rows {
            all.push(serde_json::from_str::<Vec<String>>(&json?)?);
        }
        if all.is_empty() {
            all.push(Vec::new());
        }
        Ok(all)
    }

    fn append_row(&self, table: &str, cells: &[String]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        Self::ensure_exists(&tx, table)?;

        let next: i64 = tx.query_row(
            "SELECT COALESCE(MAX(row_idx), 0) + 1 FROM sheet_rows WHERE sheet = ?1",
            params![table],
            |row| row.get(0),
        )?;
        Self::store_row(&tx, table, next as usize, cells)?;
        tx.commit()?;
        Ok(())
    }

    fn update_cell(&self, table: &str, row: usize, col: usize, value: &str) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        Self::ensure_exists(&tx, table)?;

        let mut cells = Self::load_row(&tx, table, row)?.ok_or_else(|| StoreError::OutOfRange {
            table: table.to_string(),
            row,
            col,
        })?;
        set_cell(&mut cells, col, value);
        Self::store_row(&tx, table, row, &cells)?;
        tx.commit()?;
        Ok(())
    }

    fn write_header(&self, table: &str, header: &[String]) -> Result<()> {
        let conn = self.conn();
        Self::ensure_exists(&conn, table)?;
        Self::store_row(&conn, table, 0, header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        let db = SqliteTableStore::open_at(&path).expect("should open");
        assert!(db.path().is_some());
    }

    #[test]
    fn test_rows_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheets.db");

        {
            let db = SqliteTableStore::open_at(&path).unwrap();
            db.create_table("Members").unwrap();
            db.write_header("Members", &cells(&["ID", "Approved", "Email"]))
                .unwrap();
            db.append_row("Members", &cells(&["m1", "FALSE", "a@example.com"]))
                .unwrap();
            db.append_row("Members", &cells(&["m2", "", "b@example.com"]))
                .unwrap();
        }

        let db = SqliteTableStore::open_at(&path).unwrap();
        db.update_cell("Members", 2, 1, "TRUE").unwrap();

        let rows = db.read_all("Members").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], cells(&["ID", "Approved", "Email"]));
        assert_eq!(rows[2], cells(&["m2", "TRUE", "b@example.com"]));
    }

    #[test]
    fn test_update_pads_and_rejects_missing_rows() {
        let db = SqliteTableStore::open_in_memory().unwrap();
        db.create_table("Tickets").unwrap();
        db.append_row("Tickets", &cells(&["t1"])).unwrap();

        db.update_cell("Tickets", 1, 2, "Closed").unwrap();
        assert_eq!(db.read_all("Tickets").unwrap()[1], cells(&["t1", "", "Closed"]));

        assert!(matches!(
            db.update_cell("Tickets", 9, 0, "x"),
            Err(StoreError::OutOfRange { row: 9, .. })
        ));
    }

    #[test]
    fn test_table_order_and_unknown_table() {
        let db = SqliteTableStore::open_in_memory().unwrap();
        db.create_table("Members").unwrap();
        db.create_table("Vendors").unwrap();
        db.create_table("Members").unwrap();

        assert_eq!(db.table_names().unwrap(), vec!["Members", "Vendors"]);
        assert_eq!(db.read_all("Vendors").unwrap(), vec![Vec::<String>::new()]);
        assert!(matches!(
            db.read_all("Tickets"),
            Err(StoreError::UnknownTable(_))
        ));
        assert!(matches!(
            db.append_row("Tickets", &cells(&["x"])),
            Err(StoreError::UnknownTable(_))
        ));
    }
}
