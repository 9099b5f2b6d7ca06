//! Pair-scoped currency conversion.
//!
//! A tenant configures exactly one exchange-rate pair
//! (see [`ExchangeRateSettings`]); conversion is defined only between
//! those two currencies. Asking for any other pair is a no-op with a
//! logged warning, never an error — a misconfigured rate must not block
//! billing.

use rust_decimal::Decimal;
use tracing::warn;

use super::types::ExchangeRateSettings;

/// Convert `amount` from `from` to `to` using the configured rate pair.
///
/// Same-currency conversion is the identity. Base→target multiplies by
/// the rate, target→base divides. Any other pair (or a zero rate, which
/// would divide by zero) returns the amount unchanged with a warning.
pub fn convert(
    amount: Decimal,
    from: &str,
    to: &str,
    settings: &ExchangeRateSettings,
) -> Decimal {
    if from == to {
        return amount;
    }
    if settings.exchange_rate.is_zero() {
        warn!(from, to, "exchange rate is zero, returning amount unconverted");
        return amount;
    }
    if from == settings.base_currency && to == settings.target_currency {
        return amount * settings.exchange_rate;
    }
    if from == settings.target_currency && to == settings.base_currency {
        return amount / settings.exchange_rate;
    }
    warn!(
        from,
        to,
        base = %settings.base_currency,
        target = %settings.target_currency,
        "no exchange rate configured for currency pair, returning amount unconverted"
    );
    amount
}

/// The currency invoices are displayed and stored in — the tenant's base
/// currency.
pub fn display_currency(settings: &ExchangeRateSettings) -> &str {
    &settings.base_currency
}

/// Round an invoice total up to a cash-friendly increment: nearest 100
/// for JMD, nearest 10 for USD, untouched for anything else. A positive
/// amount never rounds to zero. Presentation helper — the engine stores
/// exact totals and leaves rounding to the caller.
pub fn round_total(amount: Decimal, currency: &str) -> Decimal {
    if amount <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let step = match currency {
        "JMD" => Decimal::from(100),
        "USD" => Decimal::from(10),
        _ => return amount,
    };
    let rounded = (amount / step).ceil() * step;
    if rounded.is_zero() { step } else { rounded }
}
