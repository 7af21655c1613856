//! In-process [`TableStore`] used by tests and throwaway demo instances.

use std::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::table::{set_cell, TableStore};

#[derive(Debug, Default)]
pub struct MemoryTableStore {
    // Insertion order is the table order.
    tables: RwLock<Vec<(String, Vec<Vec<String>>)>>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table with a header and rows, replacing any existing one.
    pub fn with_table(self, table: &str, header: &[&str], rows: Vec<Vec<&str>>) -> Self {
        {
            let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
            tables.retain(|(name, _)| name != table);
            let mut all = vec![header.iter().map(|s| s.to_string()).collect::<Vec<_>>()];
            all.extend(
                rows.into_iter()
                    .map(|r| r.into_iter().map(str::to_string).collect()),
            );
            tables.push((table.to_string(), all));
        }
        self
    }

    fn with_rows<T>(&self, table: &str, f: impl FnOnce(&mut Vec<Vec<String>>) -> Result<T>) -> Result<T> {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        let (_, rows) = tables
            .iter_mut()
            .find(|(name, _)| name == table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        f(rows)
    }
}

impl TableStore for MemoryTableStore {
    fn table_names(&self) -> Result<Vec<String>> {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        Ok(tables.iter().map(|(name, _)| name.clone()).collect())
    }

    fn create_table(&self, table: &str) -> Result<()> {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        if !tables.iter().any(|(name, _)| name == table) {
            tables.push((table.to_string(), vec![Vec::new()]));
        }
        Ok(())
    }

    fn read_all(&self, table: &str) -> Result<Vec<Vec<String>>> {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, rows)| rows.clone())
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))
    }

    fn append_row(&self, table: &str, cells: &[String]) -> Result<()> {
        self.with_rows(table, |rows| {
            if rows.is_empty() {
                rows.push(Vec::new());
            }
            rows.push(cells.to_vec());
            Ok(())
        })
    }

    fn update_cell(&self, table: &str, row: usize, col: usize, value: &str) -> Result<()> {
        self.with_rows(table, |rows| {
            let target = rows.get_mut(row).ok_or_else(|| StoreError::OutOfRange {
                table: table.to_string(),
                row,
                col,
            })?;
            set_cell(target, col, value);
            Ok(())
        })
    }

    fn write_header(&self, table: &str, header: &[String]) -> Result<()> {
        self.with_rows(table, |rows| {
            match rows.first_mut() {
                Some(first) => *first = header.to_vec(),
                None => rows.push(header.to_vec()),
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_create_append_update() {
        let store = MemoryTableStore::new();
        store.create_table("Tickets").unwrap();
        store.write_header("Tickets", &cells(&["ID", "Status"])).unwrap();
        store.append_row("Tickets", &cells(&["t1", "Open"])).unwrap();
        store.update_cell("Tickets", 1, 1, "Closed").unwrap();

        let rows = store.read_all("Tickets").unwrap();
        assert_eq!(rows, vec![cells(&["ID", "Status"]), cells(&["t1", "Closed"])]);
    }

    #[test]
    fn test_create_table_is_idempotent() {
        let store = MemoryTableStore::new().with_table("Members", &["ID"], vec![vec!["m1"]]);
        store.create_table("Members").unwrap();
        assert_eq!(store.read_all("Members").unwrap().len(), 2);
        assert_eq!(store.table_names().unwrap(), vec!["Members"]);
    }

    #[test]
    fn test_unknown_table_and_out_of_range() {
        let store = MemoryTableStore::new().with_table("Members", &["ID"], vec![]);
        assert!(matches!(
            store.read_all("Vendors"),
            Err(StoreError::UnknownTable(_))
        ));
        assert!(matches!(
            store.update_cell("Members", 5, 0, "x"),
            Err(StoreError::OutOfRange { row: 5, .. })
        ));
    }
}
