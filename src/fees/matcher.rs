//! Fee applicability matching.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::core::{Fee, Package};

/// Decide whether `fee` applies to `package` right now.
///
/// See [`fee_applies_at`] for the rules; this evaluates the validity
/// window against the current time.
pub fn fee_applies(fee: &Fee, package: &Package) -> bool {
    fee_applies_at(fee, package, Utc::now())
}

/// Decide whether `fee` applies to `package` at time `now`.
///
/// All checks are AND-ed; there is no OR across condition groups:
/// 1. `applies_to` — empty or containing "all" (case-insensitive) passes;
///    otherwise the package must share at least one tag with it.
/// 2. Tag conditions — every required tag present, no excluded tag present.
/// 3. Threshold conditions — weight, declared value, and `now` must each
///    sit inside their (optionally open-ended) bounds.
pub fn fee_applies_at(fee: &Fee, package: &Package, now: DateTime<Utc>) -> bool {
    let applies_to_all = fee.applies_to.is_empty()
        || fee.applies_to.iter().any(|t| t.eq_ignore_ascii_case("all"));
    if !applies_to_all && !fee.applies_to.iter().any(|t| package.has_tag(t)) {
        return false;
    }

    if let Some(conditions) = &fee.tag_conditions {
        if !conditions.required_tags.iter().all(|t| package.has_tag(t)) {
            return false;
        }
        if conditions.excluded_tags.iter().any(|t| package.has_tag(t)) {
            return false;
        }
    }

    if let Some(conditions) = &fee.threshold_conditions {
        let weight = package.weight.unwrap_or(Decimal::ZERO);
        if conditions.min_weight.is_some_and(|min| weight < min)
            || conditions.max_weight.is_some_and(|max| weight > max)
        {
            return false;
        }

        let value = package.declared_value;
        if conditions.min_value.is_some_and(|min| value < min)
            || conditions.max_value.is_some_and(|max| value > max)
        {
            return false;
        }

        if conditions.valid_from.is_some_and(|from| from > now)
            || conditions.valid_until.is_some_and(|until| until < now)
        {
            return false;
        }
    }

    true
}
