//! Closing, consolidation and opening entry builders.
//!
//! The same pure builder serves the real close and the simulation used to
//! open the next period while the previous one is still open, so both always
//! produce the same postings.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use contab_shared::types::{CurrencyId, NodeId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::FiscalError;
use crate::ledger::{PostingService, ResolvedPosting};

/// Description and posting detail of the opening entry.
pub const OPENING_DETAIL: &str = "Opening entry";

/// Description and posting detail of the closing entry.
pub const CLOSING_DETAIL: &str = "Closing entry";

/// Description and posting detail of the consolidation entry.
pub const CONSOLIDATION_DETAIL: &str = "Profit and loss consolidation";

/// Whole-period balance of one account, as seen by the closing builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingBalance {
    /// Account.
    pub account_id: NodeId,
    /// Account currency.
    pub currency_id: CurrencyId,
    /// Sortable code of the account.
    pub order_key: String,
    /// Whether the account descends from a result category.
    pub in_result_category: bool,
    /// Signed balance.
    pub balance: Decimal,
}

/// Postings of the two entries a close generates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClosingPlan {
    /// Consolidation postings, empty when result accounts are already zero.
    pub consolidation: Vec<ResolvedPosting>,
    /// Closing postings.
    pub closing: Vec<ResolvedPosting>,
}

/// Stateless builder for generated period entries.
pub struct ClosingService;

impl ClosingService {
    /// Builds the consolidation and closing postings for a period.
    ///
    /// `balances` should list every account of the organization, zero ones
    /// included. `results_accounts` maps each currency to the account that
    /// balances results in it.
    ///
    /// # Errors
    ///
    /// `NoResultsBalancingAccount` when the organization has none at all,
    /// `MissingResultsAccount` when a touched currency has none.
    pub fn plan(
        balances: &[ClosingBalance],
        results_accounts: &BTreeMap<CurrencyId, NodeId>,
    ) -> Result<ClosingPlan, FiscalError> {
        if results_accounts.is_empty() {
            return Err(FiscalError::NoResultsBalancingAccount);
        }
        let consolidation = Self::consolidation_postings(balances, results_accounts)?;
        let after = Self::apply(balances, &consolidation);
        let closing = Self::closing_postings(&after);
        Ok(ClosingPlan {
            consolidation,
            closing,
        })
    }

    /// Postings zeroing every result account, offset per currency into the
    /// results balancing account.
    ///
    /// # Errors
    ///
    /// `MissingResultsAccount` for a currency with nonzero result accounts
    /// and no balancing account.
    pub fn consolidation_postings(
        balances: &[ClosingBalance],
        results_accounts: &BTreeMap<CurrencyId, NodeId>,
    ) -> Result<Vec<ResolvedPosting>, FiscalError> {
        let mut results: Vec<&ClosingBalance> = balances
            .iter()
            .filter(|b| b.in_result_category && !b.balance.is_zero())
            .collect();
        results.sort_by(|a, b| a.order_key.cmp(&b.order_key));

        let mut totals: BTreeMap<CurrencyId, Decimal> = BTreeMap::new();
        let mut postings = Vec::with_capacity(results.len() + 1);
        for row in results {
            *totals.entry(row.currency_id).or_insert(Decimal::ZERO) += row.balance;
            postings.push(ResolvedPosting {
                id: None,
                account_id: row.account_id,
                currency_id: row.currency_id,
                amount: -row.balance,
                detail: CONSOLIDATION_DETAIL.to_string(),
            });
        }

        for (currency_id, total) in totals {
            let account_id = *results_accounts
                .get(&currency_id)
                .ok_or(FiscalError::MissingResultsAccount(currency_id))?;
            if !total.is_zero() {
                postings.push(ResolvedPosting {
                    id: None,
                    account_id,
                    currency_id,
                    amount: total,
                    detail: CONSOLIDATION_DETAIL.to_string(),
                });
            }
        }
        Ok(postings)
    }

    /// Balances after `postings` have been applied.
    #[must_use]
    pub fn apply(balances: &[ClosingBalance], postings: &[ResolvedPosting]) -> Vec<ClosingBalance> {
        let mut after = balances.to_vec();
        let mut index: HashMap<NodeId, usize> = after
            .iter()
            .enumerate()
            .map(|(i, b)| (b.account_id, i))
            .collect();
        for p in postings {
            if let Some(&i) = index.get(&p.account_id) {
                after[i].balance += p.amount;
            } else {
                index.insert(p.account_id, after.len());
                after.push(ClosingBalance {
                    account_id: p.account_id,
                    currency_id: p.currency_id,
                    order_key: String::new(),
                    in_result_category: false,
                    balance: p.amount,
                });
            }
        }
        after
    }

    /// One posting per nonzero account cancelling its balance, in account order.
    #[must_use]
    pub fn closing_postings(balances: &[ClosingBalance]) -> Vec<ResolvedPosting> {
        let mut rows: Vec<&ClosingBalance> =
            balances.iter().filter(|b| !b.balance.is_zero()).collect();
        rows.sort_by(|a, b| {
            a.order_key
                .cmp(&b.order_key)
                .then(a.account_id.cmp(&b.account_id))
        });
        rows.into_iter()
            .map(|b| ResolvedPosting {
                id: None,
                account_id: b.account_id,
                currency_id: b.currency_id,
                amount: -b.balance,
                detail: CLOSING_DETAIL.to_string(),
            })
            .collect()
    }

    /// Opening postings of the next period: the closing postings inverted.
    #[must_use]
    pub fn opening_postings(closing: &[ResolvedPosting]) -> Vec<ResolvedPosting> {
        PostingService::inverse(closing, OPENING_DETAIL)
    }

    /// Currencies touched by a set of postings.
    #[must_use]
    pub fn currencies(postings: &[ResolvedPosting]) -> BTreeSet<CurrencyId> {
        postings.iter().map(|p| p.currency_id).collect()
    }
}
