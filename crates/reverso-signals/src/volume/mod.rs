//! Trading-volume signals.
//!
//! The dollar-volume score flags sessions with abnormal trading activity
//! relative to each security's own trailing history. It conditions the
//! reversal alpha rather than forecasting returns on its own.

mod dollar_volume;

pub use dollar_volume::{DollarVolumeScore, DollarVolumeScoreConfig};
