//! # tarifa
//!
//! Multi-tenant fee-calculation and invoice-reconciliation engine for a
//! package-forwarding back office: configurable fee rules are matched
//! against package snapshots, computed amounts roll up into invoices, and
//! multi-currency payments reconcile against invoice totals.
//!
//! All monetary values use [`rust_decimal::Decimal`] — never floating point.
//! Persistence is delegated to the collaborator traits in [`store`]; the
//! engine itself holds no connection and runs no transactions.
//!
//! ## Quick Start
//!
//! ```rust
//! use rust_decimal_macros::dec;
//! use tarifa::core::*;
//! use tarifa::fees::{calculate_fee_amount, fee_applies};
//! use uuid::Uuid;
//!
//! let tenant = Uuid::new_v4();
//! let fee = Fee::new(
//!     tenant,
//!     "SHIP_BASE",
//!     "Base shipping",
//!     FeeType::Shipping,
//!     CalculationMethod::PerWeight,
//!     dec!(2.50),
//! );
//!
//! let mut package = Package::new(tenant, Uuid::new_v4());
//! package.weight = Some(dec!(4));
//!
//! assert!(fee_applies(&fee, &package));
//! let raw = calculate_fee_amount(&fee, dec!(0), &package, None, None).unwrap();
//! assert_eq!(raw, dec!(10.00));
//! ```
//!
//! ## Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`core`] | Domain types, errors, currency conversion, invoice numbering, fee validation |
//! | [`fees`] | Applicability matching, the eight calculation methods, min/max limits |
//! | [`billing`] | Per-package fee aggregation and invoice generation/preview |
//! | [`payments`] | Payment completion, refunds, and paid-status reconciliation |
//! | [`store`] | Async collaborator traits for the surrounding persistence layer |

pub mod billing;
pub mod core;
pub mod fees;
pub mod payments;
pub mod store;

// Re-export core types at crate root for convenience
pub use crate::core::*;
