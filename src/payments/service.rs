//! Records payments against invoices and keeps invoice status consistent
//! with the sum of completed payments.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::{
    currency, ExchangeRateSettings, Invoice, InvoiceStatus, Payment, PaymentMeta, PaymentMethod,
    PaymentStatus, TarifaError, TenantId,
};
use crate::store::{
    InvoicePatch, InvoiceStore, NewPayment, PackageStatusNotifier, PaymentPatch, PaymentStore,
    TenantSettingsStore,
};

/// A payment to record against an invoice.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub invoice_id: Uuid,
    pub user_id: Uuid,
    /// Amount in `meta.currency`, or the tenant's base currency when
    /// `meta.currency` is unset.
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub meta: PaymentMeta,
    /// Record and complete in one call. Card-style payments confirm
    /// immediately; bank transfers stay pending until settled.
    pub complete_immediately: bool,
}

impl PaymentRequest {
    pub fn new(invoice_id: Uuid, user_id: Uuid, amount: Decimal, method: PaymentMethod) -> Self {
        Self {
            invoice_id,
            user_id,
            amount,
            method,
            transaction_id: None,
            payment_date: None,
            notes: None,
            meta: PaymentMeta::default(),
            complete_immediately: false,
        }
    }
}

/// Reconciles payments against invoices.
///
/// Status derivation is recomputed from scratch on every transition: an
/// invoice is paid exactly when its completed payments, converted to its
/// currency, sum to at least its total. Completing an already-completed
/// payment re-runs the same derivation and changes nothing, so the
/// operations are safe to retry.
pub struct PaymentService {
    payments: Arc<dyn PaymentStore>,
    invoices: Arc<dyn InvoiceStore>,
    settings: Arc<dyn TenantSettingsStore>,
    notifier: Arc<dyn PackageStatusNotifier>,
}

impl PaymentService {
    pub fn new(
        payments: Arc<dyn PaymentStore>,
        invoices: Arc<dyn InvoiceStore>,
        settings: Arc<dyn TenantSettingsStore>,
        notifier: Arc<dyn PackageStatusNotifier>,
    ) -> Self {
        Self {
            payments,
            invoices,
            settings,
            notifier,
        }
    }

    /// Record a pending payment against an invoice that accepts payments
    /// (issued or overdue). With `complete_immediately` set, the payment
    /// is completed and the invoice reconciled in the same call.
    pub async fn record_payment(
        &self,
        tenant: TenantId,
        request: PaymentRequest,
    ) -> Result<Payment, TarifaError> {
        let invoice = self
            .invoices
            .find_invoice(tenant, request.invoice_id)
            .await?
            .ok_or(TarifaError::InvoiceNotFound(request.invoice_id))?;
        if !invoice.status.accepts_payments() {
            return Err(TarifaError::InvoiceState {
                id: invoice.id,
                status: invoice.status,
                action: "pay",
            });
        }

        let payment = self
            .payments
            .create_payment(
                tenant,
                NewPayment {
                    invoice_id: request.invoice_id,
                    user_id: request.user_id,
                    amount: request.amount,
                    method: request.method,
                    status: PaymentStatus::Pending,
                    transaction_id: request.transaction_id,
                    payment_date: request.payment_date,
                    notes: request.notes,
                    meta: request.meta,
                },
            )
            .await?;

        if request.complete_immediately {
            self.complete_payment(tenant, payment.id).await
        } else {
            Ok(payment)
        }
    }

    /// Mark a payment completed and reconcile its invoice.
    ///
    /// A missing or garbage payment date (epoch placeholders from
    /// importers) is replaced with the completion time.
    pub async fn complete_payment(
        &self,
        tenant: TenantId,
        id: Uuid,
    ) -> Result<Payment, TarifaError> {
        let payment = self
            .payments
            .find_payment(tenant, id)
            .await?
            .ok_or(TarifaError::PaymentNotFound(id))?;

        let payment_date = payment
            .payment_date
            .filter(|d| d.year() >= 1971)
            .unwrap_or_else(Utc::now);

        let payment = self
            .payments
            .update_payment(
                tenant,
                id,
                PaymentPatch {
                    status: Some(PaymentStatus::Completed),
                    payment_date: Some(payment_date),
                },
            )
            .await?;

        match self.invoices.find_invoice(tenant, payment.invoice_id).await? {
            Some(invoice) => self.reconcile(tenant, &invoice).await?,
            // The payment stands on its own; reconciliation has nothing
            // to update.
            None => warn!(
                payment = %payment.id,
                invoice = %payment.invoice_id,
                "completed payment references a missing invoice"
            ),
        }

        Ok(payment)
    }

    /// Refund a completed payment and re-derive the invoice status. An
    /// invoice that drops below its total reverts from paid to issued.
    pub async fn refund_payment(
        &self,
        tenant: TenantId,
        id: Uuid,
    ) -> Result<Payment, TarifaError> {
        let payment = self
            .payments
            .find_payment(tenant, id)
            .await?
            .ok_or(TarifaError::PaymentNotFound(id))?;
        if payment.status != PaymentStatus::Completed {
            return Err(TarifaError::NotRefundable(payment.id, payment.status));
        }

        let payment = self
            .payments
            .update_payment(
                tenant,
                id,
                PaymentPatch {
                    status: Some(PaymentStatus::Refunded),
                    ..Default::default()
                },
            )
            .await?;

        match self.invoices.find_invoice(tenant, payment.invoice_id).await? {
            Some(invoice) => self.reconcile(tenant, &invoice).await?,
            None => warn!(
                payment = %payment.id,
                invoice = %payment.invoice_id,
                "refunded payment references a missing invoice"
            ),
        }

        Ok(payment)
    }

    /// Re-derive one invoice's status from its completed payments.
    async fn reconcile(&self, tenant: TenantId, invoice: &Invoice) -> Result<(), TarifaError> {
        let settings = self
            .settings
            .exchange_rate_settings(tenant)
            .await?
            .unwrap_or_default();

        let payments = self
            .payments
            .find_payments_by_invoice(tenant, invoice.id)
            .await?;
        let total_paid: Decimal = payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Completed)
            .map(|p| paid_in_base(p, &settings))
            .sum();

        // Exact comparison: an invoice is paid only when the converted
        // sum covers the total to the last fraction of a cent.
        if total_paid >= invoice.total_amount {
            if invoice.status.accepts_payments() {
                self.invoices
                    .update_invoice(
                        tenant,
                        invoice.id,
                        InvoicePatch {
                            status: Some(InvoiceStatus::Paid),
                            ..Default::default()
                        },
                    )
                    .await?;
                info!(
                    invoice = %invoice.invoice_number,
                    paid = %total_paid,
                    total = %invoice.total_amount,
                    "invoice fully paid"
                );
                self.notifier.invoice_paid(tenant, invoice.id).await;
            }
        } else if invoice.status == InvoiceStatus::Paid {
            self.invoices
                .update_invoice(
                    tenant,
                    invoice.id,
                    InvoicePatch {
                        status: Some(InvoiceStatus::Issued),
                        ..Default::default()
                    },
                )
                .await?;
            info!(
                invoice = %invoice.invoice_number,
                paid = %total_paid,
                total = %invoice.total_amount,
                "invoice no longer covered, reverting to issued"
            );
        }

        Ok(())
    }
}

/// A payment's value in the tenant's base currency.
///
/// The rate recorded on the payment at completion time wins over the
/// tenant's current rate, so later rate changes never flip an invoice's
/// paid status retroactively.
fn paid_in_base(payment: &Payment, settings: &ExchangeRateSettings) -> Decimal {
    let paid_currency = payment
        .meta
        .currency
        .as_deref()
        .unwrap_or(&settings.base_currency);
    if paid_currency == settings.base_currency {
        return payment.amount;
    }

    let effective = ExchangeRateSettings {
        exchange_rate: payment
            .meta
            .exchange_rate
            .unwrap_or(settings.exchange_rate),
        ..settings.clone()
    };
    currency::convert(
        payment.amount,
        paid_currency,
        &settings.base_currency,
        &effective,
    )
}
