use rusqlite::ErrorCode;
use thiserror::Error;

use townboard_shared::DomainError;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error from the local backend.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No row in `table` carries this identifier.
    #[error("No record with ID {id} in {table}")]
    NotFound { table: String, id: String },

    /// The table's header row lacks a column the operation needs.
    #[error("Table {table} has no '{column}' column")]
    Schema { table: String, column: String },

    /// The store has no table by that name.
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// A (row, column) position outside the table.
    #[error("Cell ({row}, {col}) is outside table {table}")]
    OutOfRange { table: String, row: usize, col: usize },

    /// The store is rate-limited or unreachable; safe to retry.
    #[error("Store temporarily unavailable: {0}")]
    Transient(String),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// A stored row could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl StoreError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Transient(_) => true,
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
