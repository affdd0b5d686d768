//! Balance and ledger aggregation.
//!
//! This module provides pure business logic for:
//! - Account balances over a date or number range, with category filters
//! - Totals by currency
//! - Running-balance ledgers with the balance carried into each page
//! - Monthly balances feeding the inflation adjustment

pub mod error;
pub mod service;
pub mod types;


pub use error::ReportError;
pub use service::{ReportService, first_of_month};
pub use types::*;
