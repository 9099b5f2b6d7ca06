use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tenant (company) identifier. All data is isolated per tenant and every
/// store call carries one.
pub type TenantId = Uuid;

/// Fee category. Determines aggregation bucket and calculation order —
/// tax fees are always computed last, on the pre-tax subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeType {
    Shipping,
    Handling,
    Customs,
    Service,
    Tax,
    Other,
}

impl FeeType {
    /// Aggregation order for the non-tax categories; tax always runs last.
    pub const PRETAX_ORDER: [FeeType; 5] = [
        FeeType::Shipping,
        FeeType::Handling,
        FeeType::Customs,
        FeeType::Other,
        FeeType::Service,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shipping => "shipping",
            Self::Handling => "handling",
            Self::Customs => "customs",
            Self::Service => "service",
            Self::Tax => "tax",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for FeeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tier of a tiered rate table. Matches values in `[min, max)`;
/// `max = None` leaves the tier open-ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub min: Decimal,
    pub max: Option<Decimal>,
    pub rate: Decimal,
}

/// Phase selector for threshold fees: charge before the range is reached,
/// while inside it, or after it is exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdApplication {
    Before,
    During,
    After,
}

/// Phase selector for timed fees (relative to a day count).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimedApplication {
    Before,
    After,
}

/// How a fee's amount is computed from a package snapshot.
///
/// Each variant carries exactly the parameters its formula needs; an
/// unknown method tag fails at deserialization rather than at billing
/// time. The semantics of `Fee::amount` depend on the variant (flat
/// amount, percentage, per-unit rate, or tier floor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum CalculationMethod {
    /// Flat amount, applied at most once per invoice.
    Fixed,
    /// `base * amount / 100`. A named base attribute is resolved from
    /// the aggregation context, then the package; with no name the
    /// caller-supplied base amount applies (declared value for customs,
    /// pre-tax subtotal for every other category).
    Percentage {
        #[serde(default)]
        base_attribute: Option<String>,
    },
    /// `amount * weight`. A missing or zero weight is a configuration
    /// error, not a silent zero.
    PerWeight,
    /// `amount * quantity` (quantity defaults to 1 when absent; an
    /// explicit zero is an error).
    PerItem,
    /// `amount * max(dimensional_weight, actual_weight)` where the
    /// dimensional weight is `l*w*h / factor`.
    Dimensional {
        #[serde(default = "default_dimensional_factor")]
        factor: Decimal,
    },
    /// Rate looked up from a tier table on a package attribute;
    /// `Fee::amount` acts as an absolute floor (minimum-fee guarantee).
    Tiered { attribute: String, tiers: Vec<Tier> },
    /// Flat amount charged when a package attribute sits in the selected
    /// phase relative to `[min, max]`.
    Threshold {
        attribute: String,
        min: Decimal,
        max: Option<Decimal>,
        application: ThresholdApplication,
    },
    /// Flat amount charged before/after a number of days (read from the
    /// package's `days` attribute).
    Timed {
        days: Decimal,
        application: TimedApplication,
    },
}

fn default_dimensional_factor() -> Decimal {
    Decimal::from(139)
}

/// Tag requirements layered on top of the `applies_to` overlap check:
/// every required tag must be present, no excluded tag may be.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagConditions {
    #[serde(default)]
    pub required_tags: Vec<String>,
    #[serde(default)]
    pub excluded_tags: Vec<String>,
}

/// Weight, declared-value, and validity-window gates. Absent bounds are
/// open-ended.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConditions {
    pub min_weight: Option<Decimal>,
    pub max_weight: Option<Decimal>,
    pub min_value: Option<Decimal>,
    pub max_value: Option<Decimal>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

/// Optional clamp applied after calculation: `minimum` is a floor,
/// `maximum` a cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeLimits {
    pub minimum: Option<Decimal>,
    pub maximum: Option<Decimal>,
}

/// A configurable charge rule. `code` is unique per tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fee {
    pub id: Uuid,
    pub company_id: TenantId,
    pub name: String,
    pub code: String,
    pub fee_type: FeeType,
    #[serde(flatten)]
    pub calculation: CalculationMethod,
    /// Semantics depend on `calculation` — flat amount, percentage,
    /// per-unit rate, or tier floor.
    pub amount: Decimal,
    /// ISO 4217 code the amount is expressed in.
    pub currency: String,
    /// Package tags this fee targets. Empty, or containing "all"
    /// (case-insensitive), means every package.
    #[serde(default)]
    pub applies_to: Vec<String>,
    #[serde(default)]
    pub tag_conditions: Option<TagConditions>,
    #[serde(default)]
    pub threshold_conditions: Option<ThresholdConditions>,
    #[serde(default)]
    pub limits: FeeLimits,
    #[serde(default)]
    pub description: Option<String>,
    pub is_active: bool,
}

impl Fee {
    /// Create an active USD fee with no targeting conditions or limits.
    pub fn new(
        company_id: TenantId,
        code: impl Into<String>,
        name: impl Into<String>,
        fee_type: FeeType,
        calculation: CalculationMethod,
        amount: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id,
            name: name.into(),
            code: code.into(),
            fee_type,
            calculation,
            amount,
            currency: "USD".to_string(),
            applies_to: Vec::new(),
            tag_conditions: None,
            threshold_conditions: None,
            limits: FeeLimits::default(),
            description: None,
            is_active: true,
        }
    }
}

/// Outer package dimensions in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: Decimal,
    pub width: Decimal,
    pub height: Decimal,
}

impl Dimensions {
    pub fn volume(&self) -> Decimal {
        self.length * self.width * self.height
    }
}

/// Read-only snapshot of a package as the billing engine sees it. The
/// package lifecycle is owned by an external collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub id: Uuid,
    pub company_id: TenantId,
    pub user_id: Uuid,
    pub weight: Option<Decimal>,
    pub dimensions: Option<Dimensions>,
    pub declared_value: Decimal,
    pub quantity: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Arbitrary numeric attributes referenced by fee definitions
    /// (e.g. `days` in storage for timed fees).
    #[serde(default)]
    pub attributes: HashMap<String, Decimal>,
}

impl Package {
    /// Empty snapshot with a fresh id and zero declared value.
    pub fn new(company_id: TenantId, user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id,
            user_id,
            weight: None,
            dimensions: None,
            declared_value: Decimal::ZERO,
            quantity: None,
            tags: Vec::new(),
            attributes: HashMap::new(),
        }
    }

    /// Resolve a numeric attribute by name. Well-known fields take
    /// precedence over the freeform attribute map.
    pub fn attribute(&self, name: &str) -> Option<Decimal> {
        match name {
            "weight" => self.weight,
            "declared_value" | "declaredValue" => Some(self.declared_value),
            "quantity" => self.quantity.map(Decimal::from),
            _ => self.attributes.get(name).copied(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Invoice lifecycle. `Overdue` is derived externally from the due date;
/// the engine only ever writes `Draft`, `Issued`, `Paid`, and `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Issued => "issued",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether payments may be recorded against an invoice in this state.
    pub fn accepts_payments(&self) -> bool {
        matches!(self, Self::Issued | Self::Overdue)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Informational per-category totals stored alongside an invoice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub shipping: Decimal,
    pub handling: Decimal,
    pub customs: Decimal,
    pub service: Decimal,
    pub other: Decimal,
    pub taxes: Decimal,
}

impl FeeBreakdown {
    /// Add an amount to the bucket for `fee_type`.
    pub fn add(&mut self, fee_type: FeeType, amount: Decimal) {
        match fee_type {
            FeeType::Shipping => self.shipping += amount,
            FeeType::Handling => self.handling += amount,
            FeeType::Customs => self.customs += amount,
            FeeType::Service => self.service += amount,
            FeeType::Other => self.other += amount,
            FeeType::Tax => self.taxes += amount,
        }
    }

    /// Sum of the pre-tax buckets.
    pub fn pretax_subtotal(&self) -> Decimal {
        self.shipping + self.handling + self.customs + self.service + self.other
    }

    /// Merge another breakdown into this one.
    pub fn merge(&mut self, other: &FeeBreakdown) {
        self.shipping += other.shipping;
        self.handling += other.handling;
        self.customs += other.customs;
        self.service += other.service;
        self.other += other.other;
        self.taxes += other.taxes;
    }
}

/// An invoice header. Line items live in their own store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub company_id: TenantId,
    pub user_id: Uuid,
    /// Unique per tenant, generated by [`crate::core::numbering`].
    pub invoice_number: String,
    pub status: InvoiceStatus,
    /// Unset while the invoice is a draft.
    pub issue_date: Option<DateTime<Utc>>,
    pub due_date: DateTime<Utc>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    /// Currency every amount on this invoice is expressed in. Defaults to
    /// the tenant's base currency unless the request asked otherwise.
    pub currency: String,
    pub fee_breakdown: FeeBreakdown,
    #[serde(default)]
    pub notes: String,
}

/// A computed charge that has not been persisted yet. Produced by the
/// aggregator; `preview` returns these directly, `generate` persists them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemDraft {
    pub package_id: Option<Uuid>,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub item_type: FeeType,
}

/// A persisted invoice line item. Immutable once the invoice leaves draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub company_id: TenantId,
    pub package_id: Option<Uuid>,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub item_type: FeeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    BankTransfer,
    Cash,
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Currency facts recorded when the payment was taken. Reconciliation
/// prefers the recorded `exchange_rate` over the tenant's current rate so
/// historical payments keep their value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentMeta {
    /// Currency the payment was actually made in. Absent means the
    /// tenant's base currency.
    pub currency: Option<String>,
    /// Target-per-base rate in effect at payment time.
    pub exchange_rate: Option<Decimal>,
    pub original_amount: Option<Decimal>,
    pub converted_amount: Option<Decimal>,
    pub base_currency: Option<String>,
}

/// A payment against one invoice, stored in whatever currency it was made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub company_id: TenantId,
    pub invoice_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[serde(default)]
    pub meta: PaymentMeta,
}

/// Tenant-scoped exchange rate configuration: `exchange_rate` is units of
/// `target_currency` per one unit of `base_currency`. Conversion is only
/// defined between exactly this pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRateSettings {
    pub base_currency: String,
    pub target_currency: String,
    pub exchange_rate: Decimal,
}

impl Default for ExchangeRateSettings {
    /// Fallback used when a tenant has no settings row.
    fn default() -> Self {
        Self {
            base_currency: "USD".to_string(),
            target_currency: "JMD".to_string(),
            exchange_rate: Decimal::from(150),
        }
    }
}
