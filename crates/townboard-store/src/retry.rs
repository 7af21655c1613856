//! Capped exponential backoff around a [`TableStore`].
//!
//! Only transient failures are retried. When the attempt cap is reached the
//! caller gets a [`StoreError::Transient`] carrying the last cause.

use std::time::Duration;

use tracing::warn;

use townboard_shared::constants::{
    DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BASE_MS, DEFAULT_RETRY_MAX_MS,
};

use crate::error::{Result, StoreError};
use crate::table::TableStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero behaves like one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_MS),
            max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_MS),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no sleeping.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Sleep before retry number `attempt` (1-based): `base * 2^(attempt-1)`,
    /// capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    pub fn run<T>(&self, op: &str, table: &str, mut f: impl FnMut() -> Result<T>) -> Result<T> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match f() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        op,
                        table,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "store call failed, retrying"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) if e.is_transient() => {
                    return Err(StoreError::Transient(format!(
                        "{op} on {table} gave up after {attempts} attempts: {e}"
                    )));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Wraps a store so every call goes through a [`RetryPolicy`].
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: TableStore> RetryingStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: TableStore> TableStore for RetryingStore<S> {
    fn table_names(&self) -> Result<Vec<String>> {
        self.policy.run("table_names", "*", || self.inner.table_names())
    }

    fn create_table(&self, table: &str) -> Result<()> {
        self.policy
            .run("create_table", table, || self.inner.create_table(table))
    }

    fn read_all(&self, table: &str) -> Result<Vec<Vec<String>>> {
        self.policy.run("read_all", table, || self.inner.read_all(table))
    }

    fn read_fresh(&self, table: &str) -> Result<Vec<Vec<String>>> {
        self.policy
            .run("read_fresh", table, || self.inner.read_fresh(table))
    }

    fn append_row(&self, table: &str, cells: &[String]) -> Result<()> {
        self.policy
            .run("append_row", table, || self.inner.append_row(table, cells))
    }

    fn update_cell(&self, table: &str, row: usize, col: usize, value: &str) -> Result<()> {
        self.policy.run("update_cell", table, || {
            self.inner.update_cell(table, row, col, value)
        })
    }

    fn write_header(&self, table: &str, header: &[String]) -> Result<()> {
        self.policy
            .run("write_header", table, || self.inner.write_header(table, header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTableStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` reads with a transient error.
    struct Flaky {
        inner: MemoryTableStore,
        failures: AtomicU32,
        calls: AtomicU32,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                inner: MemoryTableStore::new().with_table("Members", &["ID"], vec![vec!["m1"]]),
                failures: AtomicU32::new(failures),
                calls: AtomicU32::new(0),
            }
        }
    }

    impl TableStore for Flaky {
        fn table_names(&self) -> Result<Vec<String>> {
            self.inner.table_names()
        }
        fn create_table(&self, table: &str) -> Result<()> {
            self.inner.create_table(table)
        }
        fn read_all(&self, table: &str) -> Result<Vec<Vec<String>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(StoreError::Transient("429 rate limited".into()));
            }
            self.inner.read_all(table)
        }
        fn append_row(&self, table: &str, cells: &[String]) -> Result<()> {
            self.inner.append_row(table, cells)
        }
        fn update_cell(&self, table: &str, row: usize, col: usize, value: &str) -> Result<()> {
            self.inner.update_cell(table, row, col, value)
        }
        fn write_header(&self, table: &str, header: &[String]) -> Result<()> {
            self.inner.write_header(table, header)
        }
    }

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_delay_is_exponential_and_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(4), Duration::from_millis(800));
        assert_eq!(policy.delay_for(5), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(60), Duration::from_millis(1000));
    }

    #[test]
    fn test_recovers_from_transient_failures() {
        let store = RetryingStore::new(Flaky::new(2), fast(3));
        let rows = store.read_all("Members").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_exhaustion_surfaces_transient() {
        let store = RetryingStore::new(Flaky::new(10), fast(3));
        let err = store.read_all("Members").unwrap_err();
        assert!(matches!(err, StoreError::Transient(_)));
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_permanent_errors_are_not_retried() {
        let store = RetryingStore::new(Flaky::new(0), fast(5));
        let err = store.read_all("Vendors").unwrap_err();
        assert!(matches!(err, StoreError::UnknownTable(_)));
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 1);
    }
}
