//! Short-lived read cache in front of a [`TableStore`].
//!
//! Whole-table reads are kept for a bounded time-to-live. A write drops the
//! table's entry both before and after it reaches the inner store, and bumps
//! the table's generation. A read only fills the cache if no write finished
//! while it was in flight, so once a write returns no reader can cache the
//! rows it replaced.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::Result;
use crate::table::TableStore;

#[derive(Debug, Clone)]
struct CachedTable {
    rows: Vec<Vec<String>>,
    fetched_at: Instant,
}

impl CachedTable {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

#[derive(Debug, Default)]
struct CacheState {
    tables: HashMap<String, CachedTable>,
    /// Completed writes per table.
    generations: HashMap<String, u64>,
}

impl CacheState {
    fn generation(&self, table: &str) -> u64 {
        self.generations.get(table).copied().unwrap_or(0)
    }
}

pub struct CachedStore<S> {
    inner: S,
    ttl: Duration,
    state: RwLock<CacheState>,
}

impl<S: TableStore> CachedStore<S> {
    /// A zero `ttl` disables caching.
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            state: RwLock::new(CacheState::default()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Evict stale entries.
    pub fn purge_expired(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let before = state.tables.len();
        state.tables.retain(|_, entry| entry.is_fresh(self.ttl));
        let removed = before - state.tables.len();
        if removed > 0 {
            debug!(removed, "Purged expired table cache entries");
        }
    }

    fn cached(&self, table: &str) -> Option<Vec<Vec<String>>> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state
            .tables
            .get(table)
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| entry.rows.clone())
    }

    fn generation(&self, table: &str) -> u64 {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.generation(table)
    }

    fn invalidate(&self, table: &str) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.tables.remove(table);
    }

    /// Run a write against the inner store with the table's entry dropped on
    /// both sides of it.
    fn write_through<T>(&self, table: &str, write: impl FnOnce(&S) -> Result<T>) -> Result<T> {
        self.invalidate(table);
        let result = write(&self.inner);
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.tables.remove(table);
        *state.generations.entry(table.to_string()).or_insert(0) += 1;
        result
    }
}

impl<S: TableStore> TableStore for CachedStore<S> {
    fn table_names(&self) -> Result<Vec<String>> {
        self.inner.table_names()
    }

    fn create_table(&self, table: &str) -> Result<()> {
        self.write_through(table, |inner| inner.create_table(table))
    }

    fn read_all(&self, table: &str) -> Result<Vec<Vec<String>>> {
        if let Some(rows) = self.cached(table) {
            debug!(table, "table served from cache");
            return Ok(rows);
        }
        self.read_fresh(table)
    }

    fn read_fresh(&self, table: &str) -> Result<Vec<Vec<String>>> {
        let seen = self.generation(table);
        let rows = self.inner.read_fresh(table)?;
        if !self.ttl.is_zero() {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            if state.generation(table) == seen {
                state.tables.insert(
                    table.to_string(),
                    CachedTable {
                        rows: rows.clone(),
                        fetched_at: Instant::now(),
                    },
                );
            } else {
                debug!(table, "table written during read, not caching");
            }
        }
        Ok(rows)
    }

    fn append_row(&self, table: &str, cells: &[String]) -> Result<()> {
        self.write_through(table, |inner| inner.append_row(table, cells))
    }

    fn update_cell(&self, table: &str, row: usize, col: usize, value: &str) -> Result<()> {
        self.write_through(table, |inner| inner.update_cell(table, row, col, value))
    }

    fn write_header(&self, table: &str, header: &[String]) -> Result<()> {
        self.write_through(table, |inner| inner.write_header(table, header))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;

    use super::*;
    use crate::memory::MemoryTableStore;

    fn store(ttl: Duration) -> CachedStore<MemoryTableStore> {
        let inner = MemoryTableStore::new().with_table("Vendors", &["ID", "Approved"], vec![vec!["v1", ""]]);
        CachedStore::new(inner, ttl)
    }

    #[test]
    fn test_reads_are_cached_until_a_write() {
        let cache = store(Duration::from_secs(60));
        assert_eq!(cache.read_all("Vendors").unwrap().len(), 2);

        // A write that bypasses the cache is not seen...
        cache
            .inner()
            .append_row("Vendors", &["v2".to_string(), String::new()])
            .unwrap();
        assert_eq!(cache.read_all("Vendors").unwrap().len(), 2);

        // ...but one through the cache invalidates it.
        cache.update_cell("Vendors", 1, 1, "TRUE").unwrap();
        let rows = cache.read_all("Vendors").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][1], "TRUE");
    }

    #[test]
    fn test_read_fresh_bypasses_cache() {
        let cache = store(Duration::from_secs(60));
        cache.read_all("Vendors").unwrap();
        cache
            .inner()
            .append_row("Vendors", &["v2".to_string()])
            .unwrap();
        assert_eq!(cache.read_fresh("Vendors").unwrap().len(), 3);
        // and refreshes the entry
        assert_eq!(cache.read_all("Vendors").unwrap().len(), 3);
    }

    #[test]
    fn test_zero_ttl_disables_cache() {
        let cache = store(Duration::ZERO);
        cache.read_all("Vendors").unwrap();
        cache
            .inner()
            .append_row("Vendors", &["v2".to_string()])
            .unwrap();
        assert_eq!(cache.read_all("Vendors").unwrap().len(), 3);
    }

    #[test]
    fn test_purge_expired() {
        let cache = store(Duration::from_millis(1));
        cache.read_all("Vendors").unwrap();
        std::thread::sleep(Duration::from_millis(5));
        cache.purge_expired();
        assert!(cache.state.read().unwrap().tables.is_empty());
    }

    /// Holds every `update_cell` between two barriers so a test can read
    /// while the write is in flight.
    struct GatedStore {
        inner: MemoryTableStore,
        entered: Barrier,
        release: Barrier,
    }

    impl TableStore for GatedStore {
        fn table_names(&self) -> Result<Vec<String>> {
            self.inner.table_names()
        }

        fn create_table(&self, table: &str) -> Result<()> {
            self.inner.create_table(table)
        }

        fn read_all(&self, table: &str) -> Result<Vec<Vec<String>>> {
            self.inner.read_all(table)
        }

        fn append_row(&self, table: &str, cells: &[String]) -> Result<()> {
            self.inner.append_row(table, cells)
        }

        fn update_cell(&self, table: &str, row: usize, col: usize, value: &str) -> Result<()> {
            self.entered.wait();
            self.release.wait();
            self.inner.update_cell(table, row, col, value)
        }

        fn write_header(&self, table: &str, header: &[String]) -> Result<()> {
            self.inner.write_header(table, header)
        }
    }

    #[test]
    fn test_read_during_write_does_not_pin_old_rows() {
        let inner = GatedStore {
            inner: MemoryTableStore::new().with_table("Members", &["ID", "Approved"], vec![vec!["m1", ""]]),
            entered: Barrier::new(2),
            release: Barrier::new(2),
        };
        let cache = CachedStore::new(inner, Duration::from_secs(60));

        std::thread::scope(|s| {
            let writer = s.spawn(|| cache.update_cell("Members", 1, 1, "TRUE"));

            cache.inner().entered.wait();
            // The write has not landed yet, so this sees the old row.
            assert_eq!(cache.read_all("Members").unwrap()[1][1], "");
            cache.inner().release.wait();

            writer.join().unwrap().unwrap();
        });

        assert_eq!(cache.read_all("Members").unwrap()[1][1], "TRUE");
    }
}
