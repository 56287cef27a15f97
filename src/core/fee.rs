//! Charge computation
//!
//! Pure fee calculation from a single charge rule. Cheap enough to run on every
//! keystroke while a user edits an amount.

use crate::types::{ChargeRule, ChargeType, WalletError};
use rust_decimal::Decimal;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Compute the fee a rule charges on `amount`
///
/// - Non-positive amounts are charged nothing, whatever the rule type.
/// - Flat rules charge their flat amount (zero when the rule has none).
/// - Percentage rules pick a tier by amount, `(0, b1]`, `(b1, b2]` or `> b2`,
///   apply `amount * rate / 100` and clamp the result to the rule's cap.
///
/// # Errors
///
/// [`WalletError::InvalidAmount`] when the amount is too large to price.
pub fn compute_fee(amount: Decimal, rule: &ChargeRule) -> Result<Decimal, WalletError> {
    if amount <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }

    match rule.charge_type {
        ChargeType::Flat => Ok(rule.flat_amount.unwrap_or(Decimal::ZERO)),
        ChargeType::Percentage => {
            let rate = tier_rate(amount, rule);
            let fee = amount
                .checked_mul(rate)
                .and_then(|product| product.checked_div(HUNDRED))
                .ok_or_else(|| WalletError::invalid_amount(amount))?;
            Ok(fee.min(rule.cap))
        }
    }
}

fn tier_rate(amount: Decimal, rule: &ChargeRule) -> Decimal {
    if amount <= rule.tier_boundary_1 {
        rule.tier_rate_1
    } else if amount <= rule.tier_boundary_2 {
        rule.tier_rate_2
    } else {
        rule.tier_rate_3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn topup_rule() -> ChargeRule {
        ChargeRule::percentage("rule-1", "topup", (dec!(1.5), dec!(1.0), dec!(2)))
    }

    #[rstest]
    #[case::first_tier(dec!(10000), dec!(150))]
    #[case::first_tier_boundary(dec!(50000), dec!(750))]
    #[case::second_tier(dec!(50001), dec!(500.01))]
    #[case::second_tier_boundary(dec!(150000), dec!(1500))]
    #[case::third_tier_capped(dec!(200000), dec!(2500))]
    #[case::second_tier_fractional(dec!(100000.5), dec!(1000.005))]
    fn test_percentage_tiers(#[case] amount: Decimal, #[case] expected: Decimal) {
        assert_eq!(compute_fee(amount, &topup_rule()).unwrap(), expected);
    }

    #[test]
    fn test_raw_third_tier_fee_is_clamped_to_cap() {
        let uncapped = topup_rule().with_cap(dec!(1000000));
        assert_eq!(compute_fee(dec!(200000), &uncapped).unwrap(), dec!(4000));
        assert_eq!(compute_fee(dec!(200000), &topup_rule()).unwrap(), dec!(2500));
    }

    #[rstest]
    #[case::zero(dec!(0))]
    #[case::negative(dec!(-10))]
    fn test_non_positive_amount_is_free(#[case] amount: Decimal) {
        assert_eq!(compute_fee(amount, &topup_rule()).unwrap(), Decimal::ZERO);
        assert_eq!(
            compute_fee(amount, &ChargeRule::flat("f", "topup", dec!(100))).unwrap(),
            Decimal::ZERO
        );
    }

    #[rstest]
    #[case(dec!(1))]
    #[case(dec!(1000000))]
    fn test_flat_rule_ignores_amount(#[case] amount: Decimal) {
        let rule = ChargeRule::flat("f", "topup", dec!(100));
        assert_eq!(compute_fee(amount, &rule).unwrap(), dec!(100));
    }

    #[test]
    fn test_flat_rule_without_amount_is_free() {
        let mut rule = ChargeRule::flat("f", "topup", dec!(100));
        rule.flat_amount = None;
        assert_eq!(compute_fee(dec!(5000), &rule).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_amount_too_large_to_price_is_rejected() {
        let err = compute_fee(Decimal::MAX, &topup_rule()).unwrap_err();
        assert!(matches!(err, WalletError::InvalidAmount { .. }));

        // Flat rules never multiply, so any amount is priced.
        let flat = ChargeRule::flat("f", "topup", dec!(100));
        assert_eq!(compute_fee(Decimal::MAX, &flat).unwrap(), dec!(100));
    }

    proptest! {
        #[test]
        fn prop_first_tier_formula(cents in 1i64..=5_000_000i64, cap in 1i64..5_000i64) {
            let amount = Decimal::new(cents, 2);
            let rule = topup_rule().with_cap(Decimal::from(cap));
            let expected = (amount * dec!(1.5) / dec!(100)).min(Decimal::from(cap));
            prop_assert_eq!(compute_fee(amount, &rule).unwrap(), expected);
        }

        #[test]
        fn prop_fee_never_exceeds_cap(cents in 1i64..=100_000_000i64) {
            let amount = Decimal::new(cents, 2);
            prop_assert!(compute_fee(amount, &topup_rule()).unwrap() <= dec!(2500));
        }
    }
}
