//! Restates monthly balances with an index table.
//!
//! For each (account, month, balance) row:
//!
//! ```text
//! adjusted = trunc4(trunc4(balance / trunc4(index[month])) * index[closing month])
//! ```
//!
//! Nominal and adjusted values are accumulated per account (truncated to four
//! decimals) and the difference is rounded to two decimals with halves going
//! toward zero.

use std::collections::HashMap;

use chrono::NaiveDate;
use contab_shared::types::money::{AMOUNT_SCALE, INDEX_SCALE, round_half_down, truncate};
use contab_shared::types::{CurrencyId, NodeId};
use rust_decimal::Decimal;

use super::error::InflationError;
use super::types::{AccountAdjustment, IndexTable};
use crate::reports::{MonthlyBalance, first_of_month};

#[derive(Debug, Clone, Copy)]
struct Sums {
    currency_id: CurrencyId,
    nominal: Decimal,
    adjusted: Decimal,
}

/// Accumulates restated balances per account.
#[derive(Debug)]
pub struct InflationCalculator<'a> {
    table: &'a IndexTable,
    closing_month: NaiveDate,
    order: Vec<NodeId>,
    sums: HashMap<NodeId, Sums>,
}

impl<'a> InflationCalculator<'a> {
    /// Calculator for a period ending on `period_end`.
    #[must_use]
    pub fn new(table: &'a IndexTable, period_end: NaiveDate) -> Self {
        Self {
            table,
            closing_month: first_of_month(period_end),
            order: Vec::new(),
            sums: HashMap::new(),
        }
    }

    fn index(&self, currency_id: CurrencyId, month: NaiveDate) -> Result<Decimal, InflationError> {
        self.table
            .get(currency_id, month)
            .ok_or(InflationError::MissingIndex {
                currency_id,
                month: first_of_month(month),
            })
    }

    /// Adds one monthly balance.
    ///
    /// # Errors
    ///
    /// `MissingIndex` when the row's month or the closing month has no index
    /// for the row's currency, `Overflow` on decimal overflow.
    pub fn add(&mut self, row: &MonthlyBalance) -> Result<(), InflationError> {
        let month_index = truncate(self.index(row.currency_id, row.month)?, INDEX_SCALE);
        let closing_index = self.index(row.currency_id, self.closing_month)?;

        let nominal = row.balance;
        let restated = truncate(
            nominal
                .checked_div(month_index)
                .ok_or(InflationError::Overflow)?,
            INDEX_SCALE,
        );
        let adjusted = truncate(
            restated
                .checked_mul(closing_index)
                .ok_or(InflationError::Overflow)?,
            INDEX_SCALE,
        );

        if !self.sums.contains_key(&row.account_id) {
            self.order.push(row.account_id);
        }
        let sums = self.sums.entry(row.account_id).or_insert(Sums {
            currency_id: row.currency_id,
            nominal: Decimal::ZERO,
            adjusted: Decimal::ZERO,
        });
        sums.nominal = truncate(sums.nominal + nominal, INDEX_SCALE);
        sums.adjusted = truncate(sums.adjusted + adjusted, INDEX_SCALE);
        Ok(())
    }

    /// Adds every row, stopping at the first error.
    ///
    /// # Errors
    ///
    /// See [`Self::add`].
    pub fn add_all<'r>(
        &mut self,
        rows: impl IntoIterator<Item = &'r MonthlyBalance>,
    ) -> Result<(), InflationError> {
        rows.into_iter().try_for_each(|row| self.add(row))
    }

    /// Accumulated results, in the order accounts were first seen.
    #[must_use]
    pub fn adjustments(&self) -> Vec<AccountAdjustment> {
        self.order
            .iter()
            .filter_map(|id| {
                let sums = self.sums.get(id)?;
                Some(AccountAdjustment {
                    account_id: *id,
                    currency_id: sums.currency_id,
                    nominal: sums.nominal,
                    adjusted: sums.adjusted,
                    difference: round_half_down(sums.adjusted - sums.nominal, AMOUNT_SCALE),
                })
            })
            .collect()
    }

    /// Rounded difference of one account, zero when it was never added.
    #[must_use]
    pub fn difference(&self, account_id: NodeId) -> Decimal {
        self.sums.get(&account_id).map_or(Decimal::ZERO, |s| {
            round_half_down(s.adjusted - s.nominal, AMOUNT_SCALE)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inflation::types::InflationIndex;
    use contab_shared::types::InflationIndexId;
    use rust_decimal_macros::dec;

    const ARS: CurrencyId = CurrencyId(1);

    fn month(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, 1).unwrap()
    }

    fn table(values: &[(u32, Decimal)]) -> IndexTable {
        let indexes: Vec<InflationIndex> = values
            .iter()
            .enumerate()
            .map(|(i, (m, v))| InflationIndex {
                id: InflationIndexId(i64::try_from(i).unwrap() + 1),
                currency_id: ARS,
                month: month(*m),
                value: *v,
                version: 1,
            })
            .collect();
        IndexTable::new(&indexes)
    }

    fn row(account: i64, m: u32, balance: Decimal) -> MonthlyBalance {
        MonthlyBalance {
            account_id: NodeId(account),
            currency_id: ARS,
            month: month(m),
            balance,
        }
    }

    #[test]
    fn test_restates_by_ratio() {
        let table = table(&[(1, dec!(100)), (12, dec!(150))]);
        let mut calc = InflationCalculator::new(&table, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        calc.add(&row(1, 1, dec!(1000))).unwrap();
        let adj = calc.adjustments();
        assert_eq!(adj[0].nominal, dec!(1000));
        assert_eq!(adj[0].adjusted, dec!(1500));
        assert_eq!(adj[0].difference, dec!(500.00));
    }

    #[test]
    fn test_truncates_each_step() {
        // 100 / 3 = 33.3333 (truncated), * 3.5 = 116.66655 -> 116.6665
        let table = table(&[(1, dec!(3)), (12, dec!(3.5))]);
        let mut calc = InflationCalculator::new(&table, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        calc.add(&row(1, 1, dec!(100))).unwrap();
        let adj = calc.adjustments();
        assert_eq!(adj[0].adjusted, dec!(116.6665));
        assert_eq!(adj[0].difference, dec!(16.67));
    }

    #[test]
    fn test_accumulates_per_account_in_first_seen_order() {
        let table = table(&[(1, dec!(100)), (2, dec!(110)), (12, dec!(121))]);
        let mut calc = InflationCalculator::new(&table, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        calc.add_all(&[row(7, 1, dec!(100)), row(3, 1, dec!(-50)), row(7, 2, dec!(110))])
            .unwrap();
        let adj = calc.adjustments();
        assert_eq!(adj.iter().map(|a| a.account_id.0).collect::<Vec<_>>(), vec![7, 3]);
        // 100/100*121 + 110/110*121 = 242, nominal 210
        assert_eq!(adj[0].difference, dec!(32.00));
        assert_eq!(calc.difference(NodeId(3)), dec!(-10.50));
        assert_eq!(calc.difference(NodeId(99)), Decimal::ZERO);
    }

    #[test]
    fn test_missing_month_index() {
        let table = table(&[(12, dec!(150))]);
        let mut calc = InflationCalculator::new(&table, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(
            calc.add(&row(1, 3, dec!(10))),
            Err(InflationError::MissingIndex {
                currency_id: ARS,
                month: month(3)
            })
        );
    }

    #[test]
    fn test_missing_closing_index() {
        let table = table(&[(1, dec!(100))]);
        let mut calc = InflationCalculator::new(&table, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(
            calc.add(&row(1, 1, dec!(10))),
            Err(InflationError::MissingIndex {
                currency_id: ARS,
                month: month(12)
            })
        );
    }

    #[test]
    fn test_half_goes_toward_zero() {
        // 1 / 8 = 0.125, * 9 = 1.125: difference 0.125 rounds to 0.12
        let table = table(&[(1, dec!(8)), (12, dec!(9))]);
        let mut calc = InflationCalculator::new(&table, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        calc.add(&row(1, 1, dec!(1))).unwrap();
        assert_eq!(calc.difference(NodeId(1)), dec!(0.12));
    }
}
