//! Invoice generation, preview, and lifecycle transitions.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::billing::aggregator::aggregate_package_fees;
use crate::core::{currency, numbering, FeeBreakdown, FeeType, Invoice, InvoiceStatus, LineItemDraft, TarifaError, TenantId};
use crate::store::{
    FeeStore, InvoicePatch, InvoiceStore, LineItemStore, NewInvoice, PackageStatusNotifier,
    PackageStore, TenantSettingsStore,
};

/// A caller-supplied charge added to an invoice alongside the computed
/// fees — manual adjustments, one-off services, hand-entered taxes.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomLineItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Optional association with one of the invoiced packages.
    pub package_id: Option<Uuid>,
    /// Tax items feed the tax total instead of the subtotal.
    pub is_tax: bool,
}

/// What to invoice. At least one package or custom line item is required.
#[derive(Debug, Clone)]
pub struct InvoiceRequest {
    pub user_id: Uuid,
    pub package_ids: Vec<Uuid>,
    pub custom_line_items: Vec<CustomLineItem>,
    pub notes: Option<String>,
    /// Ignored for drafts; defaults to now when issuing.
    pub issue_date: Option<DateTime<Utc>>,
    /// Defaults to 30 days after the issue date.
    pub due_date: Option<DateTime<Utc>>,
    /// Currency to compute and store amounts in; defaults to the
    /// tenant's base currency.
    pub preferred_currency: Option<String>,
    /// Create as an editable draft instead of issuing immediately.
    pub as_draft: bool,
}

impl InvoiceRequest {
    /// Bill the given packages with default dates and currency.
    pub fn for_packages(user_id: Uuid, package_ids: Vec<Uuid>) -> Self {
        Self {
            user_id,
            package_ids,
            custom_line_items: Vec::new(),
            notes: None,
            issue_date: None,
            due_date: None,
            preferred_currency: None,
            as_draft: false,
        }
    }
}

/// The result of an invoice computation before (or instead of) any
/// persistence. `generate` persists exactly these figures.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoicePreview {
    pub user_id: Uuid,
    pub package_ids: Vec<Uuid>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
    pub fee_breakdown: FeeBreakdown,
    pub line_items: Vec<LineItemDraft>,
}

/// Orchestrates fee aggregation across a customer's packages into
/// persisted invoices.
///
/// Writes follow a two-write pattern: the header is created first with
/// zeroed totals so line items can reference a real invoice id, and the
/// totals land in one final update after every line item exists — a
/// reader mid-build never sees a non-zero total with incomplete items.
pub struct BillingService {
    fees: Arc<dyn FeeStore>,
    packages: Arc<dyn PackageStore>,
    invoices: Arc<dyn InvoiceStore>,
    line_items: Arc<dyn LineItemStore>,
    settings: Arc<dyn TenantSettingsStore>,
    notifier: Arc<dyn PackageStatusNotifier>,
}

impl BillingService {
    pub fn new(
        fees: Arc<dyn FeeStore>,
        packages: Arc<dyn PackageStore>,
        invoices: Arc<dyn InvoiceStore>,
        line_items: Arc<dyn LineItemStore>,
        settings: Arc<dyn TenantSettingsStore>,
        notifier: Arc<dyn PackageStatusNotifier>,
    ) -> Self {
        Self {
            fees,
            packages,
            invoices,
            line_items,
            settings,
            notifier,
        }
    }

    /// Compute and persist an invoice for the requested packages.
    ///
    /// Any missing or foreign package aborts the whole operation before
    /// anything is written — no partial invoices.
    pub async fn generate_invoice(
        &self,
        tenant: TenantId,
        request: InvoiceRequest,
    ) -> Result<Invoice, TarifaError> {
        let computed = self.compute(tenant, &request).await?;

        let prefix = self
            .settings
            .invoice_number_prefix(tenant)
            .await?
            .unwrap_or_else(|| numbering::DEFAULT_PREFIX.to_string());
        let invoice_number = numbering::generate_invoice_number(&prefix);

        let issue_date = if request.as_draft {
            None
        } else {
            Some(request.issue_date.unwrap_or_else(Utc::now))
        };
        let due_date = request
            .due_date
            .unwrap_or_else(|| issue_date.unwrap_or_else(Utc::now) + Duration::days(30));

        let invoice = self
            .invoices
            .create_invoice(
                tenant,
                NewInvoice {
                    user_id: request.user_id,
                    invoice_number,
                    status: if request.as_draft {
                        InvoiceStatus::Draft
                    } else {
                        InvoiceStatus::Issued
                    },
                    issue_date,
                    due_date,
                    currency: computed.currency.clone(),
                    notes: request.notes.clone().unwrap_or_default(),
                },
            )
            .await?;

        for item in &computed.line_items {
            self.line_items
                .create_line_item(tenant, invoice.id, item)
                .await?;
        }

        // Totals are the last write.
        let invoice = self
            .invoices
            .update_invoice(
                tenant,
                invoice.id,
                InvoicePatch {
                    subtotal: Some(computed.subtotal),
                    tax_amount: Some(computed.tax_amount),
                    total_amount: Some(computed.total_amount),
                    fee_breakdown: Some(computed.fee_breakdown),
                    ..Default::default()
                },
            )
            .await?;

        info!(
            invoice = %invoice.invoice_number,
            total = %invoice.total_amount,
            currency = %invoice.currency,
            items = computed.line_items.len(),
            "generated invoice"
        );
        Ok(invoice)
    }

    /// Run the identical computation as [`generate_invoice`] without any
    /// persistence.
    ///
    /// [`generate_invoice`]: BillingService::generate_invoice
    pub async fn preview_invoice(
        &self,
        tenant: TenantId,
        request: &InvoiceRequest,
    ) -> Result<InvoicePreview, TarifaError> {
        self.compute(tenant, request).await
    }

    /// Bill every unbilled package of one customer on a single invoice
    /// due in seven days.
    pub async fn generate_invoice_for_user(
        &self,
        tenant: TenantId,
        user_id: Uuid,
    ) -> Result<Invoice, TarifaError> {
        let packages = self.packages.find_unbilled_packages(tenant, user_id).await?;
        if packages.is_empty() {
            return Err(TarifaError::NothingToBill(user_id));
        }

        let mut request =
            InvoiceRequest::for_packages(user_id, packages.iter().map(|p| p.id).collect());
        request.due_date = Some(Utc::now() + Duration::days(7));
        self.generate_invoice(tenant, request).await
    }

    /// Move a draft invoice to `issued`, stamping the issue date.
    pub async fn finalize_invoice(
        &self,
        tenant: TenantId,
        id: Uuid,
    ) -> Result<Invoice, TarifaError> {
        let invoice = self.require_invoice(tenant, id).await?;
        if invoice.status != InvoiceStatus::Draft {
            return Err(TarifaError::InvoiceState {
                id,
                status: invoice.status,
                action: "finalize",
            });
        }

        self.invoices
            .update_invoice(
                tenant,
                id,
                InvoicePatch {
                    status: Some(InvoiceStatus::Issued),
                    issue_date: Some(invoice.issue_date.unwrap_or_else(Utc::now)),
                    ..Default::default()
                },
            )
            .await
    }

    /// Cancel an invoice, removing its line items so the packages on it
    /// are unlinked. Paid invoices cannot be cancelled.
    pub async fn cancel_invoice(
        &self,
        tenant: TenantId,
        id: Uuid,
    ) -> Result<Invoice, TarifaError> {
        let invoice = self.require_invoice(tenant, id).await?;
        if invoice.status == InvoiceStatus::Paid {
            return Err(TarifaError::InvoiceState {
                id,
                status: invoice.status,
                action: "cancel",
            });
        }

        self.line_items.delete_by_invoice(tenant, id).await?;
        let invoice = self
            .invoices
            .update_invoice(
                tenant,
                id,
                InvoicePatch {
                    status: Some(InvoiceStatus::Cancelled),
                    ..Default::default()
                },
            )
            .await?;

        self.notifier.invoice_cancelled(tenant, id).await;
        info!(invoice = %invoice.invoice_number, "cancelled invoice");
        Ok(invoice)
    }

    /// Delete a draft invoice and its line items. Anything past draft is
    /// immutable history and can only be cancelled.
    pub async fn delete_invoice(&self, tenant: TenantId, id: Uuid) -> Result<(), TarifaError> {
        let invoice = self.require_invoice(tenant, id).await?;
        if invoice.status != InvoiceStatus::Draft {
            return Err(TarifaError::InvoiceState {
                id,
                status: invoice.status,
                action: "delete",
            });
        }

        self.line_items.delete_by_invoice(tenant, id).await?;
        self.invoices.delete_invoice(tenant, id).await
    }

    /// The arithmetic shared by generation and preview.
    async fn compute(
        &self,
        tenant: TenantId,
        request: &InvoiceRequest,
    ) -> Result<InvoicePreview, TarifaError> {
        if request.package_ids.is_empty() && request.custom_line_items.is_empty() {
            return Err(TarifaError::EmptyInvoice);
        }

        let mut packages = Vec::with_capacity(request.package_ids.len());
        for &id in &request.package_ids {
            let package = self
                .packages
                .find_package(tenant, id)
                .await?
                .ok_or(TarifaError::PackageNotFound(id))?;
            if package.user_id != request.user_id {
                return Err(TarifaError::PackageOwnership {
                    package: id,
                    user: request.user_id,
                });
            }
            packages.push(package);
        }

        let settings = self
            .settings
            .exchange_rate_settings(tenant)
            .await?
            .unwrap_or_default();
        let display_currency = request
            .preferred_currency
            .clone()
            .unwrap_or_else(|| currency::display_currency(&settings).to_string());

        let active_fees = self.fees.find_active_fees(tenant).await?;
        let now = Utc::now();

        let mut breakdown = FeeBreakdown::default();
        let mut line_items = Vec::new();
        let mut subtotal = Decimal::ZERO;
        let mut tax_amount = Decimal::ZERO;
        let mut fixed_applied = HashSet::new();

        for package in &packages {
            let fees = aggregate_package_fees(
                package,
                &active_fees,
                &settings,
                &display_currency,
                &mut fixed_applied,
                now,
            )?;
            breakdown.merge(&FeeBreakdown {
                shipping: fees.shipping,
                handling: fees.handling,
                customs: fees.customs,
                service: fees.service,
                other: fees.other,
                taxes: fees.taxes,
            });
            subtotal += fees.subtotal;
            tax_amount += fees.taxes;
            line_items.extend(fees.line_items);
        }

        for item in &request.custom_line_items {
            let line_total = item.quantity * item.unit_price;
            let item_type = if item.is_tax {
                FeeType::Tax
            } else {
                FeeType::Other
            };
            if item.is_tax {
                tax_amount += line_total;
            } else {
                subtotal += line_total;
            }
            breakdown.add(item_type, line_total);
            line_items.push(LineItemDraft {
                package_id: item.package_id,
                description: item.description.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                line_total,
                item_type,
            });
        }

        Ok(InvoicePreview {
            user_id: request.user_id,
            package_ids: request.package_ids.clone(),
            subtotal,
            tax_amount,
            total_amount: subtotal + tax_amount,
            currency: display_currency,
            fee_breakdown: breakdown,
            line_items,
        })
    }

    async fn require_invoice(
        &self,
        tenant: TenantId,
        id: Uuid,
    ) -> Result<Invoice, TarifaError> {
        self.invoices
            .find_invoice(tenant, id)
            .await?
            .ok_or(TarifaError::InvoiceNotFound(id))
    }
}
