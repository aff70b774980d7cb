//! Monetary rounding and clamping rules.
//!
//! Every derived amount in the receiving engine is a [`Decimal`] rounded once,
//! at the end of its own computation, to [`MONEY_SCALE`] places using
//! round-half-up (midpoint away from zero).

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places kept on monetary outputs.
pub const MONEY_SCALE: u32 = 2;

/// Round a monetary amount to two places, half-up.
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Clamp negatives to zero.
#[inline]
pub fn clamp_non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// Clamp a percentage into `[0, 100]`.
#[inline]
pub fn clamp_percent(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO).min(Decimal::ONE_HUNDRED)
}

/// `a × b`, pinned to `Decimal::MAX`/`Decimal::MIN` instead of overflowing.
#[inline]
pub fn saturating_mul(a: Decimal, b: Decimal) -> Decimal {
    a.checked_mul(b).unwrap_or_else(|| saturated(a.is_sign_negative() != b.is_sign_negative()))
}

/// `a + b`, pinned to `Decimal::MAX`/`Decimal::MIN` instead of overflowing.
#[inline]
pub fn saturating_add(a: Decimal, b: Decimal) -> Decimal {
    a.checked_add(b).unwrap_or_else(|| saturated(a.is_sign_negative()))
}

/// `a ÷ b`; zero for a zero divisor, saturated on overflow.
#[inline]
pub fn saturating_div(a: Decimal, b: Decimal) -> Decimal {
    if b.is_zero() {
        return Decimal::ZERO;
    }
    a.checked_div(b).unwrap_or_else(|| saturated(a.is_sign_negative() != b.is_sign_negative()))
}

/// Sum without overflowing.
pub fn saturating_sum(values: impl IntoIterator<Item = Decimal>) -> Decimal {
    values.into_iter().fold(Decimal::ZERO, saturating_add)
}

fn saturated(negative: bool) -> Decimal {
    if negative { Decimal::MIN } else { Decimal::MAX }
}
