//! Payment recording and invoice reconciliation.

mod service;

pub use service::*;
