//! Fiscal period lifecycle rules.
//!
//! Period guards (finalized flag, confirmed-through day, date window) and the
//! pure builders for the consolidation, closing and opening entries.

pub mod closing;
pub mod error;
pub mod period;

#[cfg(test)]
mod closing_props;

pub use closing::{
    CLOSING_DETAIL, CONSOLIDATION_DETAIL, ClosingBalance, ClosingPlan, ClosingService,
    OPENING_DETAIL,
};
pub use error::FiscalError;
pub use period::{FiscalPeriod, PeriodInput, validate_next, validate_range};
