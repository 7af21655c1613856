//! # townboard-store
//!
//! Record storage for the Townboard portal.
//!
//! Every entity lives in a spreadsheet-shaped table: a header row followed
//! by positional data rows that are never deleted. [`TableStore`] is the
//! raw contract, implemented by [`SqliteTableStore`] and
//! [`MemoryTableStore`] and decorated by [`RetryingStore`] and
//! [`CachedStore`]. [`Tables`] adds typed records, header lookup and the
//! approve / reject / extend transitions on top.

pub mod cache;
pub mod database;
pub mod memory;
pub mod migrations;
pub mod models;
pub mod moderation;
pub mod record;
pub mod retry;
pub mod table;
pub mod tables;

mod error;

pub use cache::CachedStore;
pub use database::SqliteTableStore;
pub use error::{Result, StoreError};
pub use memory::MemoryTableStore;
pub use models::*;
pub use moderation::Transition;
pub use record::{HeaderIndex, Record};
pub use retry::{RetryPolicy, RetryingStore};
pub use table::TableStore;
pub use tables::{TableReport, Tables};
