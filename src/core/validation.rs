//! Fee-definition validation.
//!
//! Which parameters a calculation method needs is enforced here, at
//! creation/update time — never at billing time, where a misconfigured
//! fee degrades to a zero contribution instead of blocking an invoice.
//! Returns all errors found, not just the first.

use rust_decimal::Decimal;

use super::error::ValidationError;
use super::types::{CalculationMethod, Fee};

/// Validate a fee definition for creation or update.
pub fn validate_fee(fee: &Fee) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if fee.name.len() < 2 || fee.name.len() > 255 {
        errors.push(ValidationError::new(
            "name",
            "name must be between 2 and 255 characters",
        ));
    }

    if fee.code.len() < 2 || fee.code.len() > 50 {
        errors.push(ValidationError::new(
            "code",
            "code must be between 2 and 50 characters",
        ));
    } else if !fee
        .code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
    {
        errors.push(ValidationError::new(
            "code",
            "code must be uppercase letters, numbers, and underscores only",
        ));
    }

    if fee.amount <= Decimal::ZERO {
        errors.push(ValidationError::new("amount", "amount must be positive"));
    }

    if fee.currency.len() != 3 {
        errors.push(ValidationError::new(
            "currency",
            "currency must be a 3-letter ISO 4217 code",
        ));
    }

    match &fee.calculation {
        CalculationMethod::Tiered { attribute, tiers } => {
            if attribute.is_empty() {
                errors.push(ValidationError::new(
                    "attribute",
                    "tiered fees must name the attribute they tier on",
                ));
            }
            if tiers.is_empty() {
                errors.push(ValidationError::new(
                    "tiers",
                    "tier table must not be empty",
                ));
            }
            for (i, tier) in tiers.iter().enumerate() {
                if let Some(max) = tier.max {
                    if max <= tier.min {
                        errors.push(ValidationError::new(
                            format!("tiers.{i}.max"),
                            "tier max must be greater than its min",
                        ));
                    }
                }
            }
            for (i, pair) in tiers.windows(2).enumerate() {
                if pair[1].min < pair[0].min {
                    errors.push(ValidationError::new(
                        format!("tiers.{}.min", i + 1),
                        "tiers must be ordered by ascending min",
                    ));
                }
                if pair[0].max.is_none() {
                    errors.push(ValidationError::new(
                        format!("tiers.{i}.max"),
                        "only the last tier may be open-ended",
                    ));
                }
            }
        }
        CalculationMethod::Threshold {
            attribute, min, max, ..
        } => {
            if attribute.is_empty() {
                errors.push(ValidationError::new(
                    "attribute",
                    "threshold fees must name the attribute they gate on",
                ));
            }
            if let Some(max) = max {
                if max <= min {
                    errors.push(ValidationError::new(
                        "max",
                        "threshold max must be greater than its min",
                    ));
                }
            }
        }
        CalculationMethod::Timed { days, .. } => {
            if *days < Decimal::ZERO {
                errors.push(ValidationError::new("days", "days must not be negative"));
            }
        }
        CalculationMethod::Dimensional { factor } => {
            if *factor <= Decimal::ZERO {
                errors.push(ValidationError::new(
                    "factor",
                    "dimensional factor must be positive",
                ));
            }
        }
        CalculationMethod::Fixed
        | CalculationMethod::Percentage { .. }
        | CalculationMethod::PerWeight
        | CalculationMethod::PerItem => {}
    }

    if let (Some(min), Some(max)) = (fee.limits.minimum, fee.limits.maximum) {
        if max < min {
            errors.push(ValidationError::new(
                "limits.maximum",
                "maximum cap must not be below the minimum threshold",
            ));
        }
    }

    errors
}
