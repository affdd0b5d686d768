//! Fiscal period error types.

use chrono::NaiveDate;
use contab_shared::AppError;
use contab_shared::types::{CurrencyId, FiscalPeriodId};
use thiserror::Error;

use crate::ledger::LedgerError;

/// Errors raised by the period lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FiscalError {
    // ========== Lock Errors ==========
    /// The period is closed.
    #[error("Fiscal period {0} is finalized")]
    Finalized(FiscalPeriodId),

    /// The date is already confirmed.
    #[error("Date {date} is on or before the confirmed date {confirmed_through}")]
    DateConfirmed {
        /// Requested date.
        date: NaiveDate,
        /// Current confirmed-through day.
        confirmed_through: NaiveDate,
    },

    // ========== State Errors ==========
    /// Closing a period that is already closed.
    #[error("Fiscal period {0} is already closed")]
    AlreadyClosed(FiscalPeriodId),

    /// Reopening a period that is open.
    #[error("Fiscal period {0} is not closed")]
    NotClosed(FiscalPeriodId),

    /// Period not found in the organization.
    #[error("Fiscal period not found: {0}")]
    PeriodNotFound(FiscalPeriodId),

    // ========== Input Errors ==========
    /// Date outside the period.
    #[error("Date {date} is outside the period {start} to {end}")]
    DateOutsidePeriod {
        /// Requested date.
        date: NaiveDate,
        /// Period start.
        start: NaiveDate,
        /// Period end.
        end: NaiveDate,
    },

    /// Start not before end.
    #[error("Period start {start} must be before its end {end}")]
    InvalidRange {
        /// Start.
        start: NaiveDate,
        /// End.
        end: NaiveDate,
    },

    /// New period overlaps or precedes the previous one.
    #[error("Period must start after {previous_end}, got {start}")]
    StartNotAfterPrevious {
        /// Requested start.
        start: NaiveDate,
        /// End of the previous period.
        previous_end: NaiveDate,
    },

    /// Confirmation does not move forward.
    #[error("Date {date} must be after the confirmed date {confirmed_through}")]
    ConfirmationNotAfter {
        /// Requested date.
        date: NaiveDate,
        /// Current confirmed-through day.
        confirmed_through: NaiveDate,
    },

    /// The organization has no account balancing results.
    #[error("No account balances results, the period cannot be closed")]
    NoResultsBalancingAccount,

    /// No account balances results in the given currency.
    #[error("No account balances results in currency {0}")]
    MissingResultsAccount(CurrencyId),

    // ========== Wrapped ==========
    /// Posting rule broken by a generated entry.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl FiscalError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Finalized(_) => "PERIOD_FINALIZED",
            Self::DateConfirmed { .. } => "DATE_CONFIRMED",
            Self::AlreadyClosed(_) => "PERIOD_ALREADY_CLOSED",
            Self::NotClosed(_) => "PERIOD_NOT_CLOSED",
            Self::PeriodNotFound(_) => "PERIOD_NOT_FOUND",
            Self::DateOutsidePeriod { .. } => "DATE_OUTSIDE_PERIOD",
            Self::InvalidRange { .. } => "INVALID_PERIOD_RANGE",
            Self::StartNotAfterPrevious { .. } => "PERIOD_OVERLAP",
            Self::ConfirmationNotAfter { .. } => "CONFIRMATION_NOT_AFTER",
            Self::NoResultsBalancingAccount => "NO_RESULTS_BALANCING_ACCOUNT",
            Self::MissingResultsAccount(_) => "MISSING_RESULTS_ACCOUNT",
            Self::Ledger(err) => err.error_code(),
        }
    }
}

impl From<FiscalError> for AppError {
    fn from(err: FiscalError) -> Self {
        let message = err.to_string();
        match err {
            FiscalError::Finalized(_) | FiscalError::DateConfirmed { .. } => Self::Frozen(message),
            FiscalError::AlreadyClosed(_) | FiscalError::NotClosed(_) => Self::Conflict(message),
            FiscalError::PeriodNotFound(_) => Self::NotFound(message),
            FiscalError::DateOutsidePeriod { .. }
            | FiscalError::InvalidRange { .. }
            | FiscalError::StartNotAfterPrevious { .. }
            | FiscalError::ConfirmationNotAfter { .. }
            | FiscalError::NoResultsBalancingAccount
            | FiscalError::MissingResultsAccount(_) => Self::InvalidInput(message),
            FiscalError::Ledger(inner) => inner.into(),
        }
    }
}
