//! Min/max clamping of calculated fee amounts.

use rust_decimal::Decimal;

use crate::core::FeeLimits;

/// Clamp a calculated amount to the fee's configured bounds: the minimum
/// threshold is a floor, the maximum cap a ceiling. Absent bounds leave
/// the amount untouched.
pub fn apply_limits(amount: Decimal, limits: &FeeLimits) -> Decimal {
    let mut amount = amount;
    if let Some(minimum) = limits.minimum {
        amount = amount.max(minimum);
    }
    if let Some(maximum) = limits.maximum {
        amount = amount.min(maximum);
    }
    amount
}
