//! Inflation adjustment entry builder and index rules.

use std::collections::BTreeMap;

use contab_shared::types::money::INDEX_SCALE;
use contab_shared::types::{CurrencyId, NodeId};
use rust_decimal::Decimal;

use super::error::InflationError;
use super::types::{AccountAdjustment, IndexInput};
use crate::ledger::ResolvedPosting;
use crate::reports::first_of_month;

/// Description and posting detail of the adjustment entry.
pub const ADJUSTMENT_DETAIL: &str = "Inflation adjustment";

/// Stateless rules for indexes and the adjustment entry.
pub struct AdjustmentService;

impl AdjustmentService {
    /// Validates an index value and normalises its month to the first day.
    ///
    /// # Errors
    ///
    /// `NonPositiveIndex` or `InvalidIndexScale`.
    pub fn normalize_index(input: IndexInput) -> Result<IndexInput, InflationError> {
        Self::validate_value(input.value)?;
        Ok(IndexInput {
            month: first_of_month(input.month),
            ..input
        })
    }

    /// Validates an index value.
    ///
    /// # Errors
    ///
    /// `NonPositiveIndex` or `InvalidIndexScale`.
    pub fn validate_value(value: Decimal) -> Result<(), InflationError> {
        if value <= Decimal::ZERO {
            return Err(InflationError::NonPositiveIndex(value));
        }
        if value.normalize().scale() > INDEX_SCALE {
            return Err(InflationError::InvalidIndexScale(value));
        }
        Ok(())
    }

    /// Adjustment postings: one per nonzero difference, then one offset per
    /// currency into the account balancing adjustables.
    ///
    /// An empty result means no entry is needed.
    ///
    /// # Errors
    ///
    /// `MissingAdjustablesAccount` for a currency with differences and no
    /// balancing account.
    pub fn postings(
        adjustments: &[AccountAdjustment],
        adjustables_accounts: &BTreeMap<CurrencyId, NodeId>,
    ) -> Result<Vec<ResolvedPosting>, InflationError> {
        let mut postings: Vec<ResolvedPosting> = adjustments
            .iter()
            .filter(|a| !a.difference.is_zero())
            .map(|a| ResolvedPosting {
                id: None,
                account_id: a.account_id,
                currency_id: a.currency_id,
                amount: a.difference,
                detail: ADJUSTMENT_DETAIL.to_string(),
            })
            .collect();
        if postings.is_empty() {
            return Ok(postings);
        }

        let mut totals: BTreeMap<CurrencyId, Decimal> = BTreeMap::new();
        for p in &postings {
            *totals.entry(p.currency_id).or_insert(Decimal::ZERO) += p.amount;
        }
        for (currency_id, total) in totals {
            let account_id = *adjustables_accounts
                .get(&currency_id)
                .ok_or(InflationError::MissingAdjustablesAccount(currency_id))?;
            if !total.is_zero() {
                postings.push(ResolvedPosting {
                    id: None,
                    account_id,
                    currency_id,
                    amount: -total,
                    detail: ADJUSTMENT_DETAIL.to_string(),
                });
            }
        }
        Ok(postings)
    }
}
