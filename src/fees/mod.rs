//! Fee applicability, amount calculation, and limits.
//!
//! The three stages a fee passes through for one package: does it apply
//! at all ([`fee_applies`]), what raw amount does its method produce
//! ([`calculate_fee_amount`]), and what do its configured min/max bounds
//! clamp that to ([`apply_limits`]).

mod calculator;
mod limits;
mod matcher;

pub use calculator::*;
pub use limits::*;
pub use matcher::*;
