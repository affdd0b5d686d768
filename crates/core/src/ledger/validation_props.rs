//! Property-based tests for posting validation.
//!
//! - Property 3: Zero amounts are rejected wherever they appear
//! - Property 4: Amount scale

use proptest::prelude::*;
use rust_decimal::Decimal;

use contab_shared::types::NodeId;

use super::error::LedgerError;
use super::types::{EntryInput, PostingInput};
use super::validation::{validate_posting, validate_shape};

/// Strategy for generating a positive amount with two decimals.
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Property 3: Zero amounts are rejected wherever they appear
    // =========================================================================

    /// *For any* entry with one zero line, validation fails with
    /// `ZeroAmount` naming that line.
    #[test]
    fn prop_zero_amount_rejected(
        amounts in proptest::collection::vec(positive_amount(), 1..10),
        at in 0usize..10,
    ) {
        let mut postings: Vec<PostingInput> = amounts
            .into_iter()
            .map(|a| PostingInput::new(NodeId(1), a, "line"))
            .collect();
        let index = at % (postings.len() + 1);
        postings.insert(index, PostingInput::new(NodeId(1), Decimal::ZERO, "zero"));

        let input = EntryInput {
            date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            description: "zero".into(),
            postings,
            version: 0,
        };
        prop_assert_eq!(
            validate_shape(&input, true),
            Err(LedgerError::ZeroAmount { position: index + 1 })
        );
    }

    // =========================================================================
    // Property 4: Amount scale
    // =========================================================================

    /// *For any* amount with three significant decimals, the line is rejected.
    #[test]
    fn prop_three_decimals_rejected(mills in 1i64..100_000_000i64) {
        prop_assume!(mills % 10 != 0);
        let amount = Decimal::new(mills, 3);
        let line = PostingInput::new(NodeId(1), amount, "x");
        let rejected = matches!(
            validate_posting(&line, 1),
            Err(LedgerError::InvalidScale { .. })
        );
        prop_assert!(rejected);
    }

    /// *For any* nonzero amount with two decimals, the line is accepted.
    #[test]
    fn prop_two_decimals_accepted(amount in positive_amount(), negate in any::<bool>()) {
        let amount = if negate { -amount } else { amount };
        prop_assert!(validate_posting(&PostingInput::new(NodeId(1), amount, "x"), 1).is_ok());
    }
}
