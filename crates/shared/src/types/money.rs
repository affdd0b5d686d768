//! Decimal helpers for posting amounts and index arithmetic.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Posting amounts carry at most two decimal places; inflation arithmetic works
//! on four decimal places truncated toward zero.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places allowed on a posting amount.
pub const AMOUNT_SCALE: u32 = 2;

/// Decimal places used by intermediate inflation arithmetic.
pub const INDEX_SCALE: u32 = 4;

/// Returns true if `amount` fits in [`AMOUNT_SCALE`] decimal places.
#[must_use]
pub fn has_amount_scale(amount: Decimal) -> bool {
    amount.normalize().scale() <= AMOUNT_SCALE
}

/// Truncates toward zero keeping `dp` decimal places.
#[must_use]
pub fn truncate(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::ToZero)
}

/// Rounds to `dp` places, sending exact halves toward zero.
#[must_use]
pub fn round_half_down(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointTowardZero)
}

/// Returns true for a debit amount (zero counts as debit).
#[must_use]
pub fn is_debit(amount: Decimal) -> bool {
    amount >= Decimal::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_scale() {
        assert!(has_amount_scale(dec!(100)));
        assert!(has_amount_scale(dec!(10.50)));
        assert!(has_amount_scale(dec!(10.5000)));
        assert!(!has_amount_scale(dec!(10.005)));
    }

    #[test]
    fn test_truncate_goes_toward_zero() {
        assert_eq!(truncate(dec!(1.23456), 4), dec!(1.2345));
        assert_eq!(truncate(dec!(-1.23456), 4), dec!(-1.2345));
    }

    #[test]
    fn test_round_half_down() {
        assert_eq!(round_half_down(dec!(0.125), 2), dec!(0.12));
        assert_eq!(round_half_down(dec!(0.1251), 2), dec!(0.13));
        assert_eq!(round_half_down(dec!(-0.125), 2), dec!(-0.12));
    }

    #[test]
    fn test_is_debit() {
        assert!(is_debit(dec!(0.01)));
        assert!(!is_debit(dec!(-0.01)));
    }
}
