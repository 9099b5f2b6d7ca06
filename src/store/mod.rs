//! Collaborator contracts for the surrounding persistence layer.
//!
//! The engine persists nothing itself: every read and write goes through
//! one of these async traits, each call a separate round trip with no
//! transaction spanning them. Implementations are expected to scope every
//! query by the tenant id they are handed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::core::{
    ExchangeRateSettings, Fee, FeeBreakdown, FeeType, Invoice, InvoiceStatus, LineItem,
    LineItemDraft, Package, Payment, PaymentMeta, PaymentMethod, PaymentStatus, TarifaError,
    TenantId,
};

/// Fields for a new invoice header. Totals start at zero; the final
/// totals land in a later [`InvoicePatch`] once all line items exist.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub user_id: Uuid,
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub issue_date: Option<DateTime<Utc>>,
    pub due_date: DateTime<Utc>,
    pub currency: String,
    pub notes: String,
}

/// Partial invoice update. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct InvoicePatch {
    pub status: Option<InvoiceStatus>,
    pub issue_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub subtotal: Option<Decimal>,
    pub tax_amount: Option<Decimal>,
    pub total_amount: Option<Decimal>,
    pub fee_breakdown: Option<FeeBreakdown>,
    pub notes: Option<String>,
}

/// Fields for a new payment row.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub invoice_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub meta: PaymentMeta,
}

/// Partial payment update.
#[derive(Debug, Clone, Default)]
pub struct PaymentPatch {
    pub status: Option<PaymentStatus>,
    pub payment_date: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait FeeStore: Send + Sync {
    /// All active fee definitions for the tenant.
    async fn find_active_fees(&self, tenant: TenantId) -> Result<Vec<Fee>, TarifaError>;

    /// Active fee definitions of one category.
    async fn find_fees_by_type(
        &self,
        tenant: TenantId,
        fee_type: FeeType,
    ) -> Result<Vec<Fee>, TarifaError>;
}

#[async_trait]
pub trait PackageStore: Send + Sync {
    async fn find_package(
        &self,
        tenant: TenantId,
        id: Uuid,
    ) -> Result<Option<Package>, TarifaError>;

    /// Packages of one customer that no invoice references yet.
    async fn find_unbilled_packages(
        &self,
        tenant: TenantId,
        user_id: Uuid,
    ) -> Result<Vec<Package>, TarifaError>;
}

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn create_invoice(
        &self,
        tenant: TenantId,
        invoice: NewInvoice,
    ) -> Result<Invoice, TarifaError>;

    async fn update_invoice(
        &self,
        tenant: TenantId,
        id: Uuid,
        patch: InvoicePatch,
    ) -> Result<Invoice, TarifaError>;

    async fn find_invoice(
        &self,
        tenant: TenantId,
        id: Uuid,
    ) -> Result<Option<Invoice>, TarifaError>;

    /// Permanently remove an invoice header. Only ever called for drafts.
    async fn delete_invoice(&self, tenant: TenantId, id: Uuid) -> Result<(), TarifaError>;
}

#[async_trait]
pub trait LineItemStore: Send + Sync {
    async fn create_line_item(
        &self,
        tenant: TenantId,
        invoice_id: Uuid,
        item: &LineItemDraft,
    ) -> Result<LineItem, TarifaError>;

    async fn delete_by_invoice(
        &self,
        tenant: TenantId,
        invoice_id: Uuid,
    ) -> Result<(), TarifaError>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn create_payment(
        &self,
        tenant: TenantId,
        payment: NewPayment,
    ) -> Result<Payment, TarifaError>;

    async fn update_payment(
        &self,
        tenant: TenantId,
        id: Uuid,
        patch: PaymentPatch,
    ) -> Result<Payment, TarifaError>;

    async fn find_payment(
        &self,
        tenant: TenantId,
        id: Uuid,
    ) -> Result<Option<Payment>, TarifaError>;

    async fn find_payments_by_invoice(
        &self,
        tenant: TenantId,
        invoice_id: Uuid,
    ) -> Result<Vec<Payment>, TarifaError>;
}

#[async_trait]
pub trait TenantSettingsStore: Send + Sync {
    /// The tenant's configured exchange-rate pair, if any. Callers fall
    /// back to [`ExchangeRateSettings::default`] when unset.
    async fn exchange_rate_settings(
        &self,
        tenant: TenantId,
    ) -> Result<Option<ExchangeRateSettings>, TarifaError>;

    /// Tenant-specific invoice number prefix, if configured.
    async fn invoice_number_prefix(
        &self,
        tenant: TenantId,
    ) -> Result<Option<String>, TarifaError>;
}

/// Fire-and-forget notifications toward the package-lifecycle owner.
/// Implementations must not fail the calling operation; errors are theirs
/// to swallow and log.
#[async_trait]
pub trait PackageStatusNotifier: Send + Sync {
    /// Every package on `invoice_id` was covered by completed payments.
    async fn invoice_paid(&self, tenant: TenantId, invoice_id: Uuid);

    /// The invoice was cancelled; packages on it may need their status
    /// reverted.
    async fn invoice_cancelled(&self, tenant: TenantId, invoice_id: Uuid);
}
