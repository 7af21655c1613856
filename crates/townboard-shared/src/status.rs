//! Approval status encoding.
//!
//! The `Approved` column is edited by hand as often as by this program, so
//! reads are forgiving: a small set of true-like tokens means approved, the
//! rejected sentinel means rejected, and everything else (blank included)
//! is still waiting for review.

use serde::{Deserialize, Serialize};

use crate::constants::{APPROVED_SENTINEL, PENDING_SENTINEL, REJECTED_SENTINEL};

const TRUE_LIKE: [&str; 4] = ["true", "yes", "y", "1"];

/// Trim, case-fold, and test membership in the true-like token set.
pub fn is_true_like(raw: &str) -> bool {
    let normalized = raw.trim().to_lowercase();
    TRUE_LIKE.contains(&normalized.as_str())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn from_cell(raw: &str) -> Self {
        if is_true_like(raw) {
            ApprovalStatus::Approved
        } else if raw.trim().eq_ignore_ascii_case(REJECTED_SENTINEL) {
            ApprovalStatus::Rejected
        } else {
            ApprovalStatus::Pending
        }
    }

    /// Value written back to the store for this status.
    pub fn sentinel(self) -> &'static str {
        match self {
            ApprovalStatus::Pending => PENDING_SENTINEL,
            ApprovalStatus::Approved => APPROVED_SENTINEL,
            ApprovalStatus::Rejected => REJECTED_SENTINEL,
        }
    }

    pub fn is_approved(self) -> bool {
        matches!(self, ApprovalStatus::Approved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_true_like_is_case_and_space_insensitive() {
        for raw in ["TRUE", " yes ", "Y", "1", "True", "\tyes\n"] {
            assert!(is_true_like(raw), "{raw:?} should be true-like");
        }
        for raw in ["no", "", "REJECTED", "false", "0", "approved", "yes please"] {
            assert!(!is_true_like(raw), "{raw:?} should not be true-like");
        }
    }

    #[test]
    fn test_from_cell() {
        assert_eq!(ApprovalStatus::from_cell(" y"), ApprovalStatus::Approved);
        assert_eq!(ApprovalStatus::from_cell("rejected "), ApprovalStatus::Rejected);
        assert_eq!(ApprovalStatus::from_cell(""), ApprovalStatus::Pending);
        assert_eq!(ApprovalStatus::from_cell("FALSE"), ApprovalStatus::Pending);
        assert_eq!(ApprovalStatus::from_cell("maybe"), ApprovalStatus::Pending);
    }

    #[test]
    fn test_sentinels_read_back_as_themselves() {
        for status in [
            ApprovalStatus::Pending,
            ApprovalStatus::Approved,
            ApprovalStatus::Rejected,
        ] {
            assert_eq!(ApprovalStatus::from_cell(status.sentinel()), status);
        }
    }

    #[test]
    fn test_json_form_is_lowercase() {
        assert_eq!(serde_json::to_value(ApprovalStatus::Pending).unwrap(), "pending");
        assert_eq!(serde_json::to_value(ApprovalStatus::Approved).unwrap(), "approved");
        let parsed: ApprovalStatus = serde_json::from_str("\"rejected\"").unwrap();
        assert_eq!(parsed, ApprovalStatus::Rejected);
    }
}
