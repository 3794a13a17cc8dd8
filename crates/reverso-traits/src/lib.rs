#![doc(issue_tracker_base_url = "https://github.com/factordynamics/reverso/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core types and trait definitions for the Reverso research pipeline.
//!
//! This crate provides the panel container, the column vocabulary, the
//! [`Signal`] and [`Optimizer`] abstractions and the numeric helpers that
//! the signal, alpha and evaluation crates build on.

/// The version of the reverso-traits crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod frame;
pub mod optimizer;
pub mod signal;
pub mod stats;
pub mod types;

// Re-exports
pub use error::{ReversoError, Result};
pub use frame::CE_TO_UNIX_EPOCH_DAYS;
pub use optimizer::{Constraint, OptimizationProblem, Optimizer};
pub use signal::Signal;
pub use types::{Date, Panel, SecurityId, columns};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }
}
