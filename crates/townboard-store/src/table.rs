//! The record store contract.
//!
//! A store is a set of named tables. Row 0 of every table is its header;
//! data rows follow positionally. Rows are never deleted, so a row's index
//! is stable once appended.

use crate::error::Result;

pub trait TableStore: Send + Sync {
    /// Names of every table, in the store's own order.
    fn table_names(&self) -> Result<Vec<String>>;

    /// Create an empty table (blank header). No-op when it already exists.
    fn create_table(&self, table: &str) -> Result<()>;

    /// Every row including the header at index 0. An empty table yields a
    /// single empty header row.
    fn read_all(&self, table: &str) -> Result<Vec<Vec<String>>>;

    /// Like [`read_all`](Self::read_all) but never served from a cache.
    /// Mutations resolve row positions from this.
    fn read_fresh(&self, table: &str) -> Result<Vec<Vec<String>>> {
        self.read_all(table)
    }

    fn append_row(&self, table: &str, cells: &[String]) -> Result<()>;

    /// Overwrite one cell. `row` indexes [`read_all`](Self::read_all)'s
    /// output (0 is the header), `col` is zero-based. Rows shorter than
    /// `col` are padded with blanks.
    fn update_cell(&self, table: &str, row: usize, col: usize, value: &str) -> Result<()>;

    /// Replace the header row.
    fn write_header(&self, table: &str, header: &[String]) -> Result<()>;
}

/// Pad `row` with blanks so that `col` is addressable, then set it.
pub(crate) fn set_cell(row: &mut Vec<String>, col: usize, value: &str) {
    if row.len() <= col {
        row.resize(col + 1, String::new());
    }
    row[col] = value.to_string();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_cell_pads_short_rows() {
        let mut row = vec!["a".to_string()];
        set_cell(&mut row, 3, "d");
        assert_eq!(row, vec!["a", "", "", "d"]);

        set_cell(&mut row, 0, "z");
        assert_eq!(row[0], "z");
    }
}
