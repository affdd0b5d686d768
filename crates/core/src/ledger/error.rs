//! Ledger error types for entry and posting validation.

use contab_shared::AppError;
use contab_shared::types::{CurrencyId, EntryId, NodeId, PostingId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur while validating or persisting journal entries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Shape Errors ==========
    /// Entry has no postings.
    #[error("Entry must have at least one posting")]
    EmptyEntry,

    /// Entry description too long.
    #[error("Entry description exceeds {max} characters")]
    DescriptionTooLong {
        /// Maximum length.
        max: usize,
    },

    /// Posting without account.
    #[error("Posting {position} has no account")]
    MissingAccount {
        /// 1-based line.
        position: usize,
    },

    /// Posting amount cannot be zero.
    #[error("Posting {position} has a zero amount")]
    ZeroAmount {
        /// 1-based line.
        position: usize,
    },

    /// Posting amount with more than two decimals.
    #[error("Posting {position} amount {amount} has more than two decimal places")]
    InvalidScale {
        /// 1-based line.
        position: usize,
        /// Offending amount.
        amount: Decimal,
    },

    /// Posting detail is blank.
    #[error("Posting {position} needs a detail")]
    EmptyDetail {
        /// 1-based line.
        position: usize,
    },

    /// Posting detail too long.
    #[error("Posting {position} detail exceeds {max} characters")]
    DetailTooLong {
        /// 1-based line.
        position: usize,
        /// Maximum length.
        max: usize,
    },

    /// Entry has more lines than allowed.
    #[error("Entry exceeds {max} postings")]
    TooManyPostings {
        /// Maximum number of lines.
        max: usize,
    },

    /// Two lines claim the same stored posting.
    #[error("Posting {position} repeats posting id {posting_id}")]
    RepeatedPosting {
        /// 1-based line.
        position: usize,
        /// Id claimed twice.
        posting_id: PostingId,
    },

    // ========== Account Errors ==========
    /// Account not found in the organization.
    #[error("Account not found: {0}")]
    AccountNotFound(NodeId),

    /// Posting targets a category.
    #[error("Node {0} is a category and cannot receive postings")]
    NotAnAccount(NodeId),

    // ========== Balance Errors ==========
    /// Postings in one currency do not sum to zero.
    #[error("Entry is not balanced in currency {currency_id}: difference {difference}")]
    Unbalanced {
        /// Currency that does not balance.
        currency_id: CurrencyId,
        /// Signed sum of the currency's postings.
        difference: Decimal,
    },

    // ========== Entry Errors ==========
    /// Entry not found in the period.
    #[error("Entry not found: {0}")]
    EntryNotFound(EntryId),

    /// Opening, closing, consolidation and adjustment entries are managed by the period.
    #[error("Entry {0} is generated by the period lifecycle and cannot be deleted")]
    SpecialEntry(EntryId),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyEntry => "EMPTY_ENTRY",
            Self::DescriptionTooLong { .. } => "DESCRIPTION_TOO_LONG",
            Self::MissingAccount { .. } => "MISSING_ACCOUNT",
            Self::ZeroAmount { .. } => "ZERO_AMOUNT",
            Self::InvalidScale { .. } => "INVALID_SCALE",
            Self::EmptyDetail { .. } => "EMPTY_DETAIL",
            Self::DetailTooLong { .. } => "DETAIL_TOO_LONG",
            Self::TooManyPostings { .. } => "TOO_MANY_POSTINGS",
            Self::RepeatedPosting { .. } => "REPEATED_POSTING",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::NotAnAccount(_) => "NOT_AN_ACCOUNT",
            Self::Unbalanced { .. } => "UNBALANCED_ENTRY",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::SpecialEntry(_) => "SPECIAL_ENTRY",
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::AccountNotFound(_) | LedgerError::EntryNotFound(_) => {
                Self::NotFound(message)
            }
            LedgerError::SpecialEntry(_) => Self::Conflict(message),
            LedgerError::EmptyEntry
            | LedgerError::DescriptionTooLong { .. }
            | LedgerError::MissingAccount { .. }
            | LedgerError::ZeroAmount { .. }
            | LedgerError::InvalidScale { .. }
            | LedgerError::EmptyDetail { .. }
            | LedgerError::DetailTooLong { .. }
            | LedgerError::TooManyPostings { .. }
            | LedgerError::RepeatedPosting { .. }
            | LedgerError::NotAnAccount(_)
            | LedgerError::Unbalanced { .. } => Self::InvalidInput(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(LedgerError::EmptyEntry.error_code(), "EMPTY_ENTRY");
        assert_eq!(
            LedgerError::ZeroAmount { position: 1 }.error_code(),
            "ZERO_AMOUNT"
        );
        assert_eq!(
            LedgerError::SpecialEntry(EntryId(1)).error_code(),
            "SPECIAL_ENTRY"
        );
        assert_eq!(
            LedgerError::RepeatedPosting {
                position: 2,
                posting_id: PostingId(4)
            }
            .error_code(),
            "REPEATED_POSTING"
        );
    }

    #[test]
    fn test_kinds() {
        assert!(matches!(
            AppError::from(LedgerError::ZeroAmount { position: 2 }),
            AppError::InvalidInput(_)
        ));
        assert!(matches!(
            AppError::from(LedgerError::AccountNotFound(NodeId(9))),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(LedgerError::SpecialEntry(EntryId(1))),
            AppError::Conflict(_)
        ));
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::Unbalanced {
            currency_id: CurrencyId(1),
            difference: dec!(10.50),
        };
        assert_eq!(
            err.to_string(),
            "Entry is not balanced in currency 1: difference 10.50"
        );
    }
}
