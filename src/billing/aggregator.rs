//! Per-package fee aggregation.
//!
//! Runs every active fee definition against one package: applicability,
//! amount, currency conversion, limits — in a fixed category order with
//! tax last, since tax fees base themselves on the pre-tax subtotal.
//! Pure over its inputs, so invoice previews and real generation share
//! the arithmetic bit for bit.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::core::{currency, CalculationMethod, ExchangeRateSettings, Fee, FeeBreakdown, FeeType, LineItemDraft, Package, TarifaError};
use crate::fees::{apply_limits, calculate_fee_amount, fee_applies_at, FeeContext};

/// The fee breakdown for one package: per-category totals plus the line
/// items that produced them. `subtotal` is the pre-tax sum, `total`
/// includes taxes. All amounts are in the display currency.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageFees {
    pub shipping: Decimal,
    pub handling: Decimal,
    pub customs: Decimal,
    pub service: Decimal,
    pub other: Decimal,
    pub taxes: Decimal,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub line_items: Vec<LineItemDraft>,
}

/// Compute all applicable fees for `package` from the tenant's active
/// fee definitions.
///
/// Three passes: base (non-percentage) fees in category order, then
/// percentage fees once every base contribution is in, then tax fees on
/// the completed pre-tax subtotal. Deferring the percentage fees means
/// their base is the whole pre-tax picture, not whatever happened to
/// have accumulated when their own category ran.
///
/// `fixed_applied` carries fee ids already charged on the current
/// invoice: a fixed fee contributes at most once per invoice, not once
/// per package. `now` anchors validity-window checks so one invoice run
/// evaluates every package against the same instant.
pub fn aggregate_package_fees(
    package: &Package,
    active_fees: &[Fee],
    settings: &ExchangeRateSettings,
    display_currency: &str,
    fixed_applied: &mut HashSet<Uuid>,
    now: DateTime<Utc>,
) -> Result<PackageFees, TarifaError> {
    let mut totals = Totals::default();
    let mut line_items = Vec::new();
    let mut deferred = Vec::new();

    for category in FeeType::PRETAX_ORDER {
        for fee in fees_for(active_fees, category, package, now) {
            if matches!(fee.calculation, CalculationMethod::Percentage { .. }) {
                deferred.push(fee);
                continue;
            }
            if fee.calculation == CalculationMethod::Fixed && !fixed_applied.insert(fee.id) {
                continue;
            }
            let raw = calculate_fee_amount(fee, Decimal::ZERO, package, None, None)?;
            record(fee, raw, &mut totals, &mut line_items, package, settings, display_currency);
        }
    }

    // Percentage fees compute on the unconverted totals and have their
    // own result converted, so no charge is ever converted twice. One
    // shared snapshot: percentage fees do not compound on each other.
    // A missing base attribute defaults to the pre-tax subtotal, except
    // for customs fees, which are assessed on the declared value.
    let context = totals.context(package);
    for fee in deferred {
        let base = if fee.fee_type == FeeType::Customs {
            package.declared_value
        } else {
            context.subtotal
        };
        let raw = calculate_fee_amount(fee, base, package, Some(&context), None)?;
        record(fee, raw, &mut totals, &mut line_items, package, settings, display_currency);
    }

    // Tax fees run last, with the pre-tax subtotal as their default base.
    let context = totals.context(package);
    for fee in fees_for(active_fees, FeeType::Tax, package, now) {
        if fee.calculation == CalculationMethod::Fixed && !fixed_applied.insert(fee.id) {
            continue;
        }
        let raw = calculate_fee_amount(fee, context.subtotal, package, Some(&context), None)?;
        record(fee, raw, &mut totals, &mut line_items, package, settings, display_currency);
    }

    let subtotal = totals.display.pretax_subtotal();
    Ok(PackageFees {
        shipping: totals.display.shipping,
        handling: totals.display.handling,
        customs: totals.display.customs,
        service: totals.display.service,
        other: totals.display.other,
        taxes: totals.display.taxes,
        subtotal,
        total: subtotal + totals.display.taxes,
        line_items,
    })
}

fn fees_for<'a>(
    active_fees: &'a [Fee],
    category: FeeType,
    package: &'a Package,
    now: DateTime<Utc>,
) -> impl Iterator<Item = &'a Fee> {
    active_fees.iter().filter(move |fee| {
        fee.is_active && fee.fee_type == category && fee_applies_at(fee, package, now)
    })
}

/// Display-currency totals for invoicing, next to the unconverted
/// totals that percentage fees base themselves on.
#[derive(Debug, Default)]
struct Totals {
    display: FeeBreakdown,
    original: FeeBreakdown,
}

impl Totals {
    fn context(&self, package: &Package) -> FeeContext {
        FeeContext {
            shipping: self.original.shipping,
            handling: self.original.handling,
            customs: self.original.customs,
            service: self.original.service,
            other: self.original.other,
            subtotal: self.original.pretax_subtotal(),
            declared_value: package.declared_value,
        }
    }
}

/// Fold one fee's raw amount into the totals and line items.
///
/// A zero raw amount means the method decided the fee does not apply
/// here (out-of-phase threshold or timed fee, zero percentage base), so
/// nothing is recorded. A non-zero raw amount that a cap clamps to zero
/// still gets its line item, so the invoice shows the fee was assessed.
fn record(
    fee: &Fee,
    raw: Decimal,
    totals: &mut Totals,
    line_items: &mut Vec<LineItemDraft>,
    package: &Package,
    settings: &ExchangeRateSettings,
    display_currency: &str,
) {
    if raw.is_zero() {
        return;
    }

    let needs_conversion = fee.currency != display_currency;
    let converted = if needs_conversion {
        currency::convert(raw, &fee.currency, display_currency, settings)
    } else {
        raw
    };
    let amount = apply_limits(converted, &fee.limits);
    totals.display.add(fee.fee_type, amount);
    totals.original.add(fee.fee_type, apply_limits(raw, &fee.limits));

    let description = if needs_conversion {
        format!(
            "{} ({} {} -> {})",
            fee.name,
            fee.currency,
            raw.round_dp(2),
            display_currency
        )
    } else {
        fee.name.clone()
    };

    line_items.push(LineItemDraft {
        package_id: Some(package.id),
        description,
        quantity: Decimal::ONE,
        unit_price: amount,
        line_total: amount,
        item_type: fee.fee_type,
    });
}
