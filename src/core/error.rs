use thiserror::Error;
use uuid::Uuid;

use super::types::{InvoiceStatus, PaymentStatus};

/// Errors that can occur during fee calculation, invoice generation, or
/// payment reconciliation.
///
/// Configuration errors (a fee that cannot be computed for a package it
/// was matched against) and data errors (missing or mismatched rows)
/// abort the operation; soft degradations never surface here — they fall
/// back to zero contributions with a logged warning instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TarifaError {
    /// Package lookup failed.
    #[error("package {0} not found")]
    PackageNotFound(Uuid),

    /// Invoice lookup failed.
    #[error("invoice {0} not found")]
    InvoiceNotFound(Uuid),

    /// Payment lookup failed.
    #[error("payment {0} not found")]
    PaymentNotFound(Uuid),

    /// A package named in an invoice request belongs to someone else.
    #[error("package {package} does not belong to user {user}")]
    PackageOwnership { package: Uuid, user: Uuid },

    /// An invoice request named no packages and no custom line items.
    #[error("at least one package or line item is required")]
    EmptyInvoice,

    /// Batch invoicing found nothing to bill.
    #[error("no unbilled packages found for user {0}")]
    NothingToBill(Uuid),

    /// Per-weight fees cannot be computed without a positive weight.
    #[error("weight is required for per-weight fee '{0}'")]
    WeightRequired(String),

    /// Per-item fees cannot be computed with a zero quantity.
    #[error("quantity is required for per-item fee '{0}'")]
    QuantityRequired(String),

    /// A lifecycle operation hit an invoice in the wrong state.
    #[error("cannot {action} invoice {id} while it is {status}")]
    InvoiceState {
        id: Uuid,
        status: InvoiceStatus,
        action: &'static str,
    },

    /// Refunds are only defined for completed payments.
    #[error("only completed payments can be refunded; payment {0} is {1}")]
    NotRefundable(Uuid, PaymentStatus),

    /// A collaborator store failed. The message is implementation-defined.
    #[error("store error: {0}")]
    Store(String),
}

/// A single fee-definition validation error with field path and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dot-separated path to the invalid field (e.g. "tiers.1.max").
    pub field: String,
    /// Human-readable error description.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}
