//! Invoice number generation.
//!
//! Numbers are `{prefix}-{time}{random}` — the last six digits of the
//! current millisecond timestamp plus four random digits. Deliberately
//! not a sequential counter: invoice creation is not transactional, and
//! concurrent generation against a shared counter would race.

use chrono::Utc;
use rand::Rng;

/// Default prefix when a tenant has not configured one.
pub const DEFAULT_PREFIX: &str = "INV";

/// Generate an invoice number with the given tenant prefix.
pub fn generate_invoice_number(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis().to_string();
    let time_part = &millis[millis.len().saturating_sub(6)..];
    let random_part: u32 = rand::thread_rng().gen_range(1000..10000);
    format!("{prefix}-{time_part}{random_part}")
}
