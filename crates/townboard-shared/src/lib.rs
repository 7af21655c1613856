//! # townboard-shared
//!
//! Domain vocabulary shared by the store and the server: identifiers, table
//! kinds, the approval status encoding, expiry arithmetic and the public
//! visibility filter. Nothing in this crate performs I/O.

pub mod clock;
pub mod constants;
pub mod error;
pub mod expiry;
pub mod status;
pub mod types;
pub mod visibility;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::DomainError;
pub use status::{is_true_like, ApprovalStatus};
pub use types::{MediaKind, RatingTarget, RecordId, ResidentType, TableKind, TicketStatus, VisibilityWindow};
pub use visibility::{awaiting_review, newest_first, public_view, Moderated};
