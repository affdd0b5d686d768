//! Report query error types.

use contab_shared::AppError;
use contab_shared::types::NodeId;
use thiserror::Error;

/// Errors raised while preparing a balance or ledger query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    /// Filter names an unknown node.
    #[error("Category not found: {0}")]
    CategoryNotFound(NodeId),

    /// Filter names an account.
    #[error("Node {0} is not a category")]
    NotACategory(NodeId),

    /// Ledger asked for an unknown account.
    #[error("Account not found: {0}")]
    AccountNotFound(NodeId),

    /// Lower bound after upper bound.
    #[error("Invalid range: lower bound is after upper bound")]
    InvalidRange,
}

impl ReportError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::CategoryNotFound(_) => "CATEGORY_NOT_FOUND",
            Self::NotACategory(_) => "NOT_A_CATEGORY",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::InvalidRange => "INVALID_RANGE",
        }
    }
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        let message = err.to_string();
        match err {
            ReportError::CategoryNotFound(_) | ReportError::AccountNotFound(_) => {
                Self::NotFound(message)
            }
            ReportError::NotACategory(_) | ReportError::InvalidRange => {
                Self::InvalidInput(message)
            }
        }
    }
}
