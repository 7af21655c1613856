use thiserror::Error;

use crate::types::TableKind;

/// Validation failures raised before anything reaches the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid visibility window: {0} days (allowed: 7, 15, 30, 45, 60, 90)")]
    InvalidWindow(i64),

    #[error("Star rating must be between 1 and 5, got {0}")]
    InvalidStars(i64),

    #[error("Unknown table kind: {0}")]
    UnknownKind(String),

    #[error("{0} records have no approval status")]
    NotModerated(TableKind),

    #[error("{0} records have no expiry date")]
    NoExpiry(TableKind),

    #[error("Extending by {0} days leaves the supported date range")]
    ExpiryOutOfRange(i64),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}
