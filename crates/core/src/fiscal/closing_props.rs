//! Property-based tests for the closing builder.
//!
//! - Property 5: Closing zeroes every account
//! - Property 6: Opening mirrors closing

use std::collections::BTreeMap;

use contab_shared::types::{CurrencyId, NodeId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::closing::{ClosingBalance, ClosingService};
use crate::ledger::validation::{currency_totals, validate_balanced};

/// Strategy for a set of per-account balances that sum to zero per currency.
///
/// Accounts 1 and 2 balance results in currencies 1 and 2; they are never
/// result accounts themselves.
fn balances_strategy() -> impl Strategy<Value = Vec<ClosingBalance>> {
    proptest::collection::vec(
        (
            0usize..2,
            any::<bool>(),
            (-1_000_000i64..1_000_000i64).prop_map(|c| Decimal::new(c, 2)),
        ),
        0..15,
    )
    .prop_map(|rows| {
        let mut balances: Vec<ClosingBalance> = rows
            .into_iter()
            .enumerate()
            .map(|(i, (currency, result, balance))| {
                let id = i64::try_from(i).unwrap() + 10;
                ClosingBalance {
                    account_id: NodeId(id),
                    currency_id: CurrencyId(i64::try_from(currency).unwrap() + 1),
                    order_key: format!("{:02}/{id:04}", if result { 4 } else { 1 }),
                    in_result_category: result,
                    balance,
                }
            })
            .collect();
        for currency in 1..=2 {
            let total: Decimal = balances
                .iter()
                .filter(|b| b.currency_id == CurrencyId(currency))
                .map(|b| b.balance)
                .sum();
            balances.push(ClosingBalance {
                account_id: NodeId(currency),
                currency_id: CurrencyId(currency),
                order_key: format!("02/{currency:02}"),
                in_result_category: false,
                balance: -total,
            });
        }
        balances
    })
}

fn holders() -> BTreeMap<CurrencyId, NodeId> {
    BTreeMap::from([(CurrencyId(1), NodeId(1)), (CurrencyId(2), NodeId(2))])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Property 5: Closing zeroes every account
    // =========================================================================

    /// *For any* balanced set of accounts, consolidation and closing are each
    /// balanced per currency and together bring every account to zero.
    #[test]
    fn prop_closing_zeroes_every_account(balances in balances_strategy()) {
        let plan = ClosingService::plan(&balances, &holders()).unwrap();
        prop_assert!(validate_balanced(&plan.consolidation).is_ok());
        prop_assert!(validate_balanced(&plan.closing).is_ok());

        let after_consolidation = ClosingService::apply(&balances, &plan.consolidation);
        for row in after_consolidation.iter().filter(|b| b.in_result_category) {
            prop_assert!(row.balance.is_zero());
        }
        let after = ClosingService::apply(&after_consolidation, &plan.closing);
        prop_assert!(after.iter().all(|b| b.balance.is_zero()));
    }

    // =========================================================================
    // Property 6: Opening mirrors closing
    // =========================================================================

    /// *For any* closing, the opening postings sum per currency to the
    /// negation of the closing postings and restore the pre-closing
    /// balances of every non-result account.
    #[test]
    fn prop_opening_mirrors_closing(balances in balances_strategy()) {
        let plan = ClosingService::plan(&balances, &holders()).unwrap();
        let opening = ClosingService::opening_postings(&plan.closing);

        let closing_totals = currency_totals(&plan.closing);
        let opening_totals = currency_totals(&opening);
        prop_assert_eq!(closing_totals.len(), opening_totals.len());
        for (currency, total) in &closing_totals {
            prop_assert_eq!(opening_totals.get(currency).copied(), Some(-*total));
        }

        let mut per_account: BTreeMap<NodeId, Decimal> = BTreeMap::new();
        for (c, o) in plan.closing.iter().zip(&opening) {
            prop_assert_eq!(c.account_id, o.account_id);
            prop_assert_eq!(c.amount, -o.amount);
            *per_account.entry(o.account_id).or_default() += o.amount;
        }
        let consolidated = ClosingService::apply(&balances, &plan.consolidation);
        for row in consolidated.iter().filter(|b| !b.balance.is_zero()) {
            prop_assert_eq!(per_account.get(&row.account_id).copied(), Some(row.balance));
        }
    }
}
