//! Signal implementations for the reverso alpha model.
//!
//! This crate provides per-security time-series signals:
//! - Reversal: negated trailing sums of log returns, rolling or exponentially smoothed
//! - Volume: time-series z-score of log dollar volume
//!
//! Signals append a column to the panel and never reorder rows. Values are
//! computed within each security in date order, so a security's history
//! never leaks into another's.
//!
//! # Example
//!
//! ```ignore
//! use reverso_signals::reversal::Reversal;
//! use reverso_signals::registry::available_signals;
//!
//! // Create a signal with default configuration
//! let signal = Reversal::default();
//!
//! // Discover available signals
//! let signals = available_signals();
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod registry;
pub mod reversal;
pub mod volume;

// Re-export key types
pub use registry::{SignalCategory, SignalInfo};
pub use reversal::{Reversal, ReversalConfig, SmoothedReversal, SmoothedReversalConfig};
pub use volume::{DollarVolumeScore, DollarVolumeScoreConfig};
