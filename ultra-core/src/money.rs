//! Currency arithmetic helpers.
//!
//! Amounts are whole currency units held as `Decimal`. Percentages and
//! whole-unit outputs round half away from zero.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Round to whole currency units.
pub fn round_whole(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Round to `dp` decimal places.
pub fn round_to(amount: Decimal, dp: u32) -> Decimal {
    amount.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// `round(part / whole * 100)`, or 0 when `whole <= 0` or the ratio does
/// not fit a `Decimal`.
pub fn percent_of(part: Decimal, whole: Decimal) -> i64 {
    if whole <= Decimal::ZERO {
        return 0;
    }
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .and_then(|pct| round_whole(pct).to_i64())
        .unwrap_or(0)
}

/// `ceil(numerator / denominator)` for strictly positive inputs, else `None`.
/// Also `None` when the quotient overflows.
pub fn ceil_div(numerator: Decimal, denominator: Decimal) -> Option<i64> {
    if numerator <= Decimal::ZERO || denominator <= Decimal::ZERO {
        return None;
    }
    numerator.checked_div(denominator)?.ceil().to_i64()
}

/// Sum that stops at `Decimal::MAX` / `Decimal::MIN` instead of panicking.
pub fn saturating_sum<I: IntoIterator<Item = Decimal>>(amounts: I) -> Decimal {
    amounts
        .into_iter()
        .fold(Decimal::ZERO, |acc, a| acc.saturating_add(a))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_round_whole_half_away_from_zero() {
        assert_eq!(round_whole(dec("2.5")), dec("3"));
        assert_eq!(round_whole(dec("-2.5")), dec("-3"));
        assert_eq!(round_whole(dec("2.49")), dec("2"));
    }

    #[test]
    fn test_percent_of_guards_zero() {
        assert_eq!(percent_of(dec("2500"), dec("10000")), 25);
        assert_eq!(percent_of(dec("100"), Decimal::ZERO), 0);
        assert_eq!(percent_of(dec("100"), dec("-5")), 0);
        assert_eq!(percent_of(dec("1"), dec("8")), 13); // 12.5 -> 13
    }

    #[test]
    fn test_ceil_div() {
        assert_eq!(ceil_div(dec("7500"), dec("500")), Some(15));
        assert_eq!(ceil_div(dec("7501"), dec("500")), Some(16));
        assert_eq!(ceil_div(Decimal::ZERO, dec("500")), None);
        assert_eq!(ceil_div(dec("100"), Decimal::ZERO), None);
    }

    #[test]
    fn test_extreme_ratios_do_not_panic() {
        let tiny = dec("0.0000000001");
        assert_eq!(percent_of(Decimal::MAX, tiny), 0);
        assert_eq!(ceil_div(Decimal::MAX, tiny), None);
        assert_eq!(saturating_sum([Decimal::MAX, Decimal::MAX]), Decimal::MAX);
        assert_eq!(saturating_sum([dec("1.5"), dec("2")]), dec("3.5"));
    }
}
