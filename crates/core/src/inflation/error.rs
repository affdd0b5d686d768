//! Inflation error types.

use chrono::NaiveDate;
use contab_shared::AppError;
use contab_shared::types::{CurrencyId, InflationIndexId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by index management and the adjustment calculation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InflationError {
    /// No index for a month the calculation touches.
    #[error("No inflation index for currency {currency_id} in {month}")]
    MissingIndex {
        /// Currency.
        currency_id: CurrencyId,
        /// First day of the month.
        month: NaiveDate,
    },

    /// Index value must be positive.
    #[error("Inflation index must be positive, got {0}")]
    NonPositiveIndex(Decimal),

    /// Index value with more than four decimals.
    #[error("Inflation index {0} has more than four decimal places")]
    InvalidIndexScale(Decimal),

    /// An index already exists for the currency and month.
    #[error("An inflation index for currency {currency_id} in {month} already exists")]
    DuplicateIndex {
        /// Currency.
        currency_id: CurrencyId,
        /// First day of the month.
        month: NaiveDate,
    },

    /// Index not found.
    #[error("Inflation index not found: {0}")]
    IndexNotFound(InflationIndexId),

    /// Currency not found in the organization.
    #[error("Currency not found: {0}")]
    CurrencyNotFound(CurrencyId),

    /// The organization has no account balancing adjustable accounts.
    #[error("No account balances the adjustable accounts")]
    NoAdjustablesBalancingAccount,

    /// No account balances adjustable accounts in the given currency.
    #[error("No account balances the adjustable accounts in currency {0}")]
    MissingAdjustablesAccount(CurrencyId),

    /// Decimal overflow while restating balances.
    #[error("Arithmetic overflow while restating balances")]
    Overflow,
}

impl InflationError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingIndex { .. } => "MISSING_INDEX",
            Self::NonPositiveIndex(_) => "NON_POSITIVE_INDEX",
            Self::InvalidIndexScale(_) => "INVALID_INDEX_SCALE",
            Self::DuplicateIndex { .. } => "DUPLICATE_INDEX",
            Self::IndexNotFound(_) => "INDEX_NOT_FOUND",
            Self::CurrencyNotFound(_) => "CURRENCY_NOT_FOUND",
            Self::NoAdjustablesBalancingAccount => "NO_ADJUSTABLES_BALANCING_ACCOUNT",
            Self::MissingAdjustablesAccount(_) => "MISSING_ADJUSTABLES_ACCOUNT",
            Self::Overflow => "OVERFLOW",
        }
    }
}

impl From<InflationError> for AppError {
    fn from(err: InflationError) -> Self {
        let message = err.to_string();
        match err {
            InflationError::MissingIndex { .. } => Self::MissingIndex(message),
            InflationError::DuplicateIndex { .. } => Self::Conflict(message),
            InflationError::IndexNotFound(_) | InflationError::CurrencyNotFound(_) => {
                Self::NotFound(message)
            }
            InflationError::Overflow => Self::Internal(message),
            InflationError::NonPositiveIndex(_)
            | InflationError::InvalidIndexScale(_)
            | InflationError::NoAdjustablesBalancingAccount
            | InflationError::MissingAdjustablesAccount(_) => Self::InvalidInput(message),
        }
    }
}
