//! Universe filtering and alpha mapping for the reverso pipeline.
//!
//! This crate turns raw signal values into expected-return forecasts:
//! - [`UniverseFilter`]: drops penny stocks (on the lagged price) and rows
//!   missing the signal or risk inputs
//! - [`cross_sectional_zscore`] and [`Winsorization`]: per-date scoring
//! - [`AlphaModel`]: `alpha = score × IC × specific_risk`, with an optional
//!   volume-conditioned override
//!
//! # Examples
//!
//! ```rust,no_run
//! use reverso_alpha::{AlphaConfig, AlphaModel, UniverseFilter};
//! # fn run(panel: &reverso_traits::Panel) -> reverso_traits::Result<()> {
//! let filtered = UniverseFilter::default().apply(panel, "reversal")?;
//! let alphas = AlphaModel::new(AlphaConfig::default()).apply(&filtered, "reversal")?;
//! # Ok(())
//! # }
//! ```

mod alpha;
mod filter;
mod score;

// Re-export main types
pub use alpha::{AlphaConfig, AlphaModel, VolumeOverride};
pub use filter::{UniverseFilter, UniverseFilterConfig};
pub use score::{Winsorization, cross_sectional_zscore};
