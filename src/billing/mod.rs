//! Per-package fee aggregation and invoice generation.

mod aggregator;
mod service;

pub use aggregator::*;
pub use service::*;
