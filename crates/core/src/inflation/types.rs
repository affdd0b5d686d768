//! Inflation index types.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use contab_shared::types::{CurrencyId, InflationIndexId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::reports::first_of_month;

/// Index value of one currency for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InflationIndex {
    /// Unique identifier.
    pub id: InflationIndexId,
    /// Currency the index applies to.
    pub currency_id: CurrencyId,
    /// First day of the month.
    pub month: NaiveDate,
    /// Positive index value, up to four decimal places.
    pub value: Decimal,
    /// Optimistic concurrency version.
    pub version: u32,
}

/// Input for creating an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInput {
    /// Currency.
    pub currency_id: CurrencyId,
    /// Any day of the month; stored as the first day.
    pub month: NaiveDate,
    /// Index value.
    pub value: Decimal,
}

/// Lookup of index values by (currency, month).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexTable {
    values: BTreeMap<(CurrencyId, NaiveDate), Decimal>,
}

impl IndexTable {
    /// Builds the table from stored indexes.
    #[must_use]
    pub fn new<'a>(indexes: impl IntoIterator<Item = &'a InflationIndex>) -> Self {
        Self {
            values: indexes
                .into_iter()
                .map(|i| ((i.currency_id, first_of_month(i.month)), i.value))
                .collect(),
        }
    }

    /// Index of `currency_id` for the month containing `date`.
    #[must_use]
    pub fn get(&self, currency_id: CurrencyId, date: NaiveDate) -> Option<Decimal> {
        self.values.get(&(currency_id, first_of_month(date))).copied()
    }

    /// Number of indexes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when no index is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Inflation difference of one account over the period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAdjustment {
    /// Account.
    pub account_id: contab_shared::types::NodeId,
    /// Account currency.
    pub currency_id: CurrencyId,
    /// Accumulated nominal balance.
    pub nominal: Decimal,
    /// Accumulated restated balance.
    pub adjusted: Decimal,
    /// `adjusted - nominal` rounded to two decimals.
    pub difference: Decimal,
}
