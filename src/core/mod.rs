//! Domain types, errors, and tenant-level utilities.
//!
//! Everything in here is pure data plus pure functions: currency
//! conversion against a configured rate pair, invoice number generation,
//! and fee-definition validation.

mod error;
mod types;

pub mod currency;
pub mod numbering;
pub mod validation;

pub use error::*;
pub use types::*;
