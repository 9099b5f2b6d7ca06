//! Fee amount calculation — the eight calculation methods.

use rust_decimal::Decimal;

use crate::core::{currency, CalculationMethod, ExchangeRateSettings, Fee, Package, TarifaError, ThresholdApplication, TimedApplication};

/// Aggregates already computed for the current package, used as the base
/// for percentage fees. Totals are unconverted (fee-currency) amounts;
/// the percentage result is what gets converted for display.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeeContext {
    pub shipping: Decimal,
    pub handling: Decimal,
    pub customs: Decimal,
    pub service: Decimal,
    pub other: Decimal,
    pub subtotal: Decimal,
    pub declared_value: Decimal,
}

impl FeeContext {
    /// Resolve a base attribute by name.
    pub fn get(&self, name: &str) -> Option<Decimal> {
        match name {
            "shipping" => Some(self.shipping),
            "handling" => Some(self.handling),
            // A customs base means the package's declared value, matching
            // how customs fees themselves are computed.
            "customs" | "declared_value" | "declaredValue" => Some(self.declared_value),
            "service" => Some(self.service),
            "other" => Some(self.other),
            "subtotal" => Some(self.subtotal),
            _ => None,
        }
    }
}

/// Compute the amount `fee` charges for `package`.
///
/// `base_amount` is the caller-supplied fallback base for percentage
/// fees (the aggregator passes the declared value for customs fees and
/// the pre-tax subtotal for everything else). `context` supplies
/// already-computed category totals for percentage fees based on them.
///
/// When `display` is given and the fee's currency differs from the
/// requested display currency, the result is converted via the settings'
/// configured pair before returning.
///
/// Missing optional inputs degrade to a zero (or floor) contribution;
/// only a missing weight/quantity for the per-weight/per-item methods is
/// an error, since those fees are meaningless without them.
pub fn calculate_fee_amount(
    fee: &Fee,
    base_amount: Decimal,
    package: &Package,
    context: Option<&FeeContext>,
    display: Option<(&ExchangeRateSettings, &str)>,
) -> Result<Decimal, TarifaError> {
    let raw = raw_amount(fee, base_amount, package, context)?;

    match display {
        Some((settings, display_currency)) if fee.currency != display_currency => {
            Ok(currency::convert(raw, &fee.currency, display_currency, settings))
        }
        _ => Ok(raw),
    }
}

fn raw_amount(
    fee: &Fee,
    base_amount: Decimal,
    package: &Package,
    context: Option<&FeeContext>,
) -> Result<Decimal, TarifaError> {
    match &fee.calculation {
        CalculationMethod::Fixed => Ok(fee.amount),

        CalculationMethod::Percentage { base_attribute } => {
            // With no named base the caller-supplied base applies (the
            // aggregator passes the declared value for customs fees and
            // the pre-tax subtotal for everything else).
            let base = match base_attribute.as_deref() {
                Some(attr) => context
                    .and_then(|ctx| ctx.get(attr))
                    .or_else(|| package.attribute(attr))
                    .unwrap_or(base_amount),
                None => base_amount,
            };
            Ok(base * fee.amount / Decimal::from(100))
        }

        CalculationMethod::PerWeight => {
            let weight = package
                .weight
                .filter(|w| !w.is_zero())
                .ok_or_else(|| TarifaError::WeightRequired(fee.code.clone()))?;
            Ok(fee.amount * weight)
        }

        CalculationMethod::PerItem => {
            // Quantity defaults to 1 when the field is absent; an explicit
            // zero is a data problem the caller must hear about.
            let quantity = match package.quantity {
                None => Decimal::ONE,
                Some(0) => return Err(TarifaError::QuantityRequired(fee.code.clone())),
                Some(q) => Decimal::from(q),
            };
            Ok(fee.amount * quantity)
        }

        CalculationMethod::Dimensional { factor } => {
            let dimensional_weight = match (&package.dimensions, factor.is_zero()) {
                (Some(dims), false) => dims.volume() / factor,
                _ => Decimal::ZERO,
            };
            let actual_weight = package.weight.unwrap_or(Decimal::ZERO);
            let chargeable = dimensional_weight.max(actual_weight);
            Ok(fee.amount * chargeable)
        }

        CalculationMethod::Tiered { attribute, tiers } => {
            // Fee amount is an absolute floor: a matched tier below it, or
            // no matching tier at all, still charges at least the floor.
            let rate = package.attribute(attribute).and_then(|value| {
                tiers
                    .iter()
                    .find(|tier| {
                        value >= tier.min && tier.max.is_none_or(|max| value < max)
                    })
                    .map(|tier| tier.rate)
            });
            Ok(match rate {
                Some(rate) => rate.max(fee.amount),
                None => fee.amount,
            })
        }

        CalculationMethod::Threshold {
            attribute,
            min,
            max,
            application,
        } => {
            let Some(value) = package.attribute(attribute) else {
                return Ok(Decimal::ZERO);
            };
            let in_range = match max {
                Some(max) => value >= *min && value <= *max,
                None => value >= *min,
            };
            let applies = match application {
                ThresholdApplication::Before => value < *min,
                ThresholdApplication::During => in_range,
                ThresholdApplication::After => match max {
                    Some(max) => value > *max,
                    None => value > *min,
                },
            };
            Ok(if applies { fee.amount } else { Decimal::ZERO })
        }

        CalculationMethod::Timed { days, application } => {
            let Some(value) = package.attribute("days") else {
                return Ok(Decimal::ZERO);
            };
            let applies = match application {
                TimedApplication::Before => value < *days,
                TimedApplication::After => value > *days,
            };
            Ok(if applies { fee.amount } else { Decimal::ZERO })
        }
    }
}
