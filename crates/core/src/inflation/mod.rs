//! Inflation adjustment.
//!
//! Monthly balances of adjustable accounts are restated with a per-currency
//! index table; the differences become the period's adjustment entry.

pub mod adjustment;
pub mod calculator;
pub mod error;
pub mod types;

pub use adjustment::{ADJUSTMENT_DETAIL, AdjustmentService};
pub use calculator::InflationCalculator;
pub use error::InflationError;
pub use types::{AccountAdjustment, IndexInput, IndexTable, InflationIndex};
