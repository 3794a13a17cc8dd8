//! Short-term reversal signals.
//!
//! Both signals bet against a security's recent performance:
//! - Rolling: negated sum of `ln(1 + r)` over a trailing window of total returns
//! - Smoothed: negated exponentially weighted mean of idiosyncratic returns
//!
//! Each is computed per security in date order and shifted forward so the
//! value stamped on day T only uses data through day T - shift.

mod rolling;
mod smoothed;

pub use rolling::{Reversal, ReversalConfig};
pub use smoothed::{SmoothedReversal, SmoothedReversalConfig};
