//! Property-based tests for the posting service.
//!
//! - Property 1: Accepted entries balance per currency
//! - Property 2: Arrangement keeps every posting

use contab_shared::types::{CurrencyId, NodeId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::service::PostingService;
use super::types::{EntryInput, PostingAccount, PostingInput};
use super::validation::currency_totals;

/// Accounts 1..=50 are in currency 1, 51..=100 in currency 2.
fn lookup(id: NodeId) -> Option<PostingAccount> {
    let currency_id = match id.0 {
        1..=50 => CurrencyId(1),
        51..=100 => CurrencyId(2),
        _ => return None,
    };
    Some(PostingAccount {
        id,
        currency_id,
        is_account: true,
    })
}

/// Strategy for generating a nonzero amount with two decimals.
fn nonzero_amount() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2)),
        (1i64..10_000_000i64).prop_map(|cents| Decimal::new(-cents, 2)),
    ]
}

/// Strategy for an arbitrary list of posting lines.
fn lines_strategy() -> impl Strategy<Value = Vec<PostingInput>> {
    proptest::collection::vec((1i64..=100, nonzero_amount()), 1..12).prop_map(|rows| {
        rows.into_iter()
            .map(|(account, amount)| PostingInput::new(NodeId(account), amount, "line"))
            .collect()
    })
}

/// Appends, per currency, a line that cancels the running total.
fn balance(mut lines: Vec<PostingInput>) -> Vec<PostingInput> {
    let mut totals = [Decimal::ZERO; 2];
    for line in &lines {
        let slot = usize::from(line.account_id.is_some_and(|id| id.0 > 50));
        totals[slot] += line.amount;
    }
    for (slot, total) in totals.into_iter().enumerate() {
        if !total.is_zero() {
            let account = if slot == 0 { 1 } else { 51 };
            lines.push(PostingInput::new(NodeId(account), -total, "offset"));
        }
    }
    lines
}

fn entry(postings: Vec<PostingInput>) -> EntryInput {
    EntryInput {
        date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        description: "generated".into(),
        postings,
        version: 0,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Property 1: Accepted entries balance per currency
    // =========================================================================

    /// *For any* list of lines, the service either rejects the entry or every
    /// currency of the accepted postings sums to zero.
    #[test]
    fn prop_accepted_entries_balance(lines in lines_strategy()) {
        if let Ok(resolved) = PostingService::validate_and_resolve(&entry(lines), true, lookup) {
            for total in currency_totals(&resolved).values() {
                prop_assert!(total.is_zero());
            }
        }
    }

    /// *For any* list of lines completed with per-currency offsets, the entry
    /// is accepted.
    #[test]
    fn prop_offset_lines_are_accepted(lines in lines_strategy()) {
        let balanced = balance(lines);
        prop_assert!(PostingService::validate_and_resolve(&entry(balanced), true, lookup).is_ok());
    }

    // =========================================================================
    // Property 2: Arrangement keeps every posting
    // =========================================================================

    /// *For any* balanced entry, arranging keeps the multiset of postings,
    /// assigns positions 1..n and never puts a credit before a debit of the
    /// same currency.
    #[test]
    fn prop_arrange_is_a_permutation(lines in lines_strategy()) {
        let resolved = PostingService::validate_and_resolve(&entry(balance(lines)), true, lookup).unwrap();
        let arranged = PostingService::arrange(resolved.clone(), Some(CurrencyId(2)));

        prop_assert_eq!(arranged.len(), resolved.len());
        for (i, (position, _)) in arranged.iter().enumerate() {
            prop_assert_eq!(usize::try_from(*position).unwrap(), i + 1);
        }
        prop_assert_eq!(currency_totals(&resolved), currency_totals(
            &arranged.iter().map(|(_, p)| p.clone()).collect::<Vec<_>>()
        ));
        for pair in arranged.windows(2) {
            let (a, b) = (&pair[0].1, &pair[1].1);
            if a.currency_id == b.currency_id {
                prop_assert!(a.is_debit() || !b.is_debit());
            }
        }
        prop_assert_eq!(arranged[0].1.currency_id == CurrencyId(2),
            resolved.iter().any(|p| p.currency_id == CurrencyId(2)));
    }
}
