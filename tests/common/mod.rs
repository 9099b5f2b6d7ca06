//! Shared in-memory store backing the integration tests. One struct
//! implements every collaborator trait, so a single `Arc<MemStore>` can
//! be handed to both services and inspected afterwards.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use tarifa::billing::BillingService;
use tarifa::core::*;
use tarifa::payments::PaymentService;
use tarifa::store::*;

/// Install a test subscriber so `RUST_LOG=tarifa=debug cargo test` shows
/// the engine's log output. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
pub struct MemStore {
    pub fees: Mutex<Vec<Fee>>,
    pub packages: Mutex<Vec<Package>>,
    pub invoices: Mutex<HashMap<Uuid, Invoice>>,
    pub line_items: Mutex<Vec<LineItem>>,
    pub payments: Mutex<HashMap<Uuid, Payment>>,
    pub settings: Mutex<Option<ExchangeRateSettings>>,
    pub prefix: Mutex<Option<String>>,
    pub paid_notices: Mutex<Vec<Uuid>>,
    pub cancelled_notices: Mutex<Vec<Uuid>>,
}

impl MemStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_fee(&self, fee: Fee) {
        self.fees.lock().unwrap().push(fee);
    }

    pub fn add_package(&self, package: Package) {
        self.packages.lock().unwrap().push(package);
    }

    pub fn line_items_for(&self, invoice_id: Uuid) -> Vec<LineItem> {
        self.line_items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.invoice_id == invoice_id)
            .cloned()
            .collect()
    }

    pub fn invoice(&self, id: Uuid) -> Invoice {
        self.invoices.lock().unwrap().get(&id).cloned().unwrap()
    }

    pub fn payment(&self, id: Uuid) -> Payment {
        self.payments.lock().unwrap().get(&id).cloned().unwrap()
    }
}

#[async_trait]
impl FeeStore for MemStore {
    async fn find_active_fees(&self, tenant: TenantId) -> Result<Vec<Fee>, TarifaError> {
        Ok(self
            .fees
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.company_id == tenant && f.is_active)
            .cloned()
            .collect())
    }

    async fn find_fees_by_type(
        &self,
        tenant: TenantId,
        fee_type: FeeType,
    ) -> Result<Vec<Fee>, TarifaError> {
        Ok(self
            .find_active_fees(tenant)
            .await?
            .into_iter()
            .filter(|f| f.fee_type == fee_type)
            .collect())
    }
}

#[async_trait]
impl PackageStore for MemStore {
    async fn find_package(
        &self,
        tenant: TenantId,
        id: Uuid,
    ) -> Result<Option<Package>, TarifaError> {
        Ok(self
            .packages
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.company_id == tenant && p.id == id)
            .cloned())
    }

    async fn find_unbilled_packages(
        &self,
        tenant: TenantId,
        user_id: Uuid,
    ) -> Result<Vec<Package>, TarifaError> {
        let billed: Vec<Uuid> = self
            .line_items
            .lock()
            .unwrap()
            .iter()
            .filter_map(|i| i.package_id)
            .collect();
        Ok(self
            .packages
            .lock()
            .unwrap()
            .iter()
            .filter(|p| {
                p.company_id == tenant && p.user_id == user_id && !billed.contains(&p.id)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl InvoiceStore for MemStore {
    async fn create_invoice(
        &self,
        tenant: TenantId,
        invoice: NewInvoice,
    ) -> Result<Invoice, TarifaError> {
        let row = Invoice {
            id: Uuid::new_v4(),
            company_id: tenant,
            user_id: invoice.user_id,
            invoice_number: invoice.invoice_number,
            status: invoice.status,
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            subtotal: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            currency: invoice.currency,
            fee_breakdown: FeeBreakdown::default(),
            notes: invoice.notes,
        };
        self.invoices.lock().unwrap().insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_invoice(
        &self,
        tenant: TenantId,
        id: Uuid,
        patch: InvoicePatch,
    ) -> Result<Invoice, TarifaError> {
        let mut invoices = self.invoices.lock().unwrap();
        let row = invoices
            .get_mut(&id)
            .filter(|i| i.company_id == tenant)
            .ok_or(TarifaError::InvoiceNotFound(id))?;
        if let Some(status) = patch.status {
            row.status = status;
        }
        if let Some(issue_date) = patch.issue_date {
            row.issue_date = Some(issue_date);
        }
        if let Some(due_date) = patch.due_date {
            row.due_date = due_date;
        }
        if let Some(subtotal) = patch.subtotal {
            row.subtotal = subtotal;
        }
        if let Some(tax_amount) = patch.tax_amount {
            row.tax_amount = tax_amount;
        }
        if let Some(total_amount) = patch.total_amount {
            row.total_amount = total_amount;
        }
        if let Some(fee_breakdown) = patch.fee_breakdown {
            row.fee_breakdown = fee_breakdown;
        }
        if let Some(notes) = patch.notes {
            row.notes = notes;
        }
        Ok(row.clone())
    }

    async fn find_invoice(
        &self,
        tenant: TenantId,
        id: Uuid,
    ) -> Result<Option<Invoice>, TarifaError> {
        Ok(self
            .invoices
            .lock()
            .unwrap()
            .get(&id)
            .filter(|i| i.company_id == tenant)
            .cloned())
    }

    async fn delete_invoice(&self, tenant: TenantId, id: Uuid) -> Result<(), TarifaError> {
        let mut invoices = self.invoices.lock().unwrap();
        match invoices.get(&id) {
            Some(i) if i.company_id == tenant => {
                invoices.remove(&id);
                Ok(())
            }
            _ => Err(TarifaError::InvoiceNotFound(id)),
        }
    }
}

#[async_trait]
impl LineItemStore for MemStore {
    async fn create_line_item(
        &self,
        tenant: TenantId,
        invoice_id: Uuid,
        item: &LineItemDraft,
    ) -> Result<LineItem, TarifaError> {
        let row = LineItem {
            id: Uuid::new_v4(),
            invoice_id,
            company_id: tenant,
            package_id: item.package_id,
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total: item.line_total,
            item_type: item.item_type,
        };
        self.line_items.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn delete_by_invoice(
        &self,
        tenant: TenantId,
        invoice_id: Uuid,
    ) -> Result<(), TarifaError> {
        self.line_items
            .lock()
            .unwrap()
            .retain(|i| !(i.company_id == tenant && i.invoice_id == invoice_id));
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for MemStore {
    async fn create_payment(
        &self,
        tenant: TenantId,
        payment: NewPayment,
    ) -> Result<Payment, TarifaError> {
        let row = Payment {
            id: Uuid::new_v4(),
            company_id: tenant,
            invoice_id: payment.invoice_id,
            user_id: payment.user_id,
            amount: payment.amount,
            method: payment.method,
            status: payment.status,
            transaction_id: payment.transaction_id,
            payment_date: payment.payment_date,
            notes: payment.notes,
            meta: payment.meta,
        };
        self.payments.lock().unwrap().insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_payment(
        &self,
        tenant: TenantId,
        id: Uuid,
        patch: PaymentPatch,
    ) -> Result<Payment, TarifaError> {
        let mut payments = self.payments.lock().unwrap();
        let row = payments
            .get_mut(&id)
            .filter(|p| p.company_id == tenant)
            .ok_or(TarifaError::PaymentNotFound(id))?;
        if let Some(status) = patch.status {
            row.status = status;
        }
        if let Some(payment_date) = patch.payment_date {
            row.payment_date = Some(payment_date);
        }
        Ok(row.clone())
    }

    async fn find_payment(
        &self,
        tenant: TenantId,
        id: Uuid,
    ) -> Result<Option<Payment>, TarifaError> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .get(&id)
            .filter(|p| p.company_id == tenant)
            .cloned())
    }

    async fn find_payments_by_invoice(
        &self,
        tenant: TenantId,
        invoice_id: Uuid,
    ) -> Result<Vec<Payment>, TarifaError> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.company_id == tenant && p.invoice_id == invoice_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TenantSettingsStore for MemStore {
    async fn exchange_rate_settings(
        &self,
        _tenant: TenantId,
    ) -> Result<Option<ExchangeRateSettings>, TarifaError> {
        Ok(self.settings.lock().unwrap().clone())
    }

    async fn invoice_number_prefix(
        &self,
        _tenant: TenantId,
    ) -> Result<Option<String>, TarifaError> {
        Ok(self.prefix.lock().unwrap().clone())
    }
}

#[async_trait]
impl PackageStatusNotifier for MemStore {
    async fn invoice_paid(&self, _tenant: TenantId, invoice_id: Uuid) {
        self.paid_notices.lock().unwrap().push(invoice_id);
    }

    async fn invoice_cancelled(&self, _tenant: TenantId, invoice_id: Uuid) {
        self.cancelled_notices.lock().unwrap().push(invoice_id);
    }
}

pub fn billing_service(store: &Arc<MemStore>) -> BillingService {
    BillingService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
    )
}

pub fn payment_service(store: &Arc<MemStore>) -> PaymentService {
    PaymentService::new(store.clone(), store.clone(), store.clone(), store.clone())
}

pub fn package_with_weight(tenant: TenantId, user: Uuid, weight: Decimal) -> Package {
    let mut package = Package::new(tenant, user);
    package.weight = Some(weight);
    package
}

/// Flat 20.00 shipping fee applying to everything.
pub fn flat_shipping_fee(tenant: TenantId) -> Fee {
    Fee::new(
        tenant,
        "SHIP_FLAT",
        "Flat Shipping",
        FeeType::Shipping,
        CalculationMethod::Fixed,
        dec!(20),
    )
}

/// 10% tax on the pre-tax subtotal.
pub fn gct_fee(tenant: TenantId) -> Fee {
    Fee::new(
        tenant,
        "GCT",
        "General Consumption Tax",
        FeeType::Tax,
        CalculationMethod::Percentage {
            base_attribute: None,
        },
        dec!(10),
    )
}
