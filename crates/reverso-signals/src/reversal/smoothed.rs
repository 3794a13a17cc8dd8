//! Exponentially smoothed idiosyncratic reversal.

use polars::prelude::*;
use reverso_traits::{Panel, ReversoError, Result, Signal, columns, frame};
use serde::{Deserialize, Serialize};

/// Configuration for the smoothed reversal signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoothedReversalConfig {
    /// EWM span in trading days (default: 5)
    pub span: f64,
    /// Observations required before a value is emitted (default: 5)
    pub min_samples: usize,
    /// Periods to shift forward after computing (default: 1)
    pub shift: usize,
}

impl Default for SmoothedReversalConfig {
    fn default() -> Self {
        Self {
            span: 5.0,
            min_samples: 5,
            shift: 1,
        }
    }
}

/// Smoothed reversal on idiosyncratic (specific) returns.
///
/// Negated exponentially weighted mean of `specific_return` with
/// `alpha = 2 / (span + 1)`, null until `min_samples` observations, then
/// shifted forward by `shift` periods within each security.
#[derive(Debug, Clone)]
pub struct SmoothedReversal {
    config: SmoothedReversalConfig,
    name: String,
}

impl SmoothedReversal {
    /// Create a new smoothed reversal signal with the given configuration.
    #[must_use]
    pub fn new(config: SmoothedReversalConfig) -> Self {
        Self::named("barra_reversal", config)
    }

    /// Create a smoothed reversal signal writing to a custom column name.
    #[must_use]
    pub fn named(name: impl Into<String>, config: SmoothedReversalConfig) -> Self {
        Self {
            config,
            name: name.into(),
        }
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &SmoothedReversalConfig {
        &self.config
    }

    /// The signal as a per-security expression over rows sorted by
    /// security and date.
    #[must_use]
    pub fn expr(&self) -> Expr {
        let options = EWMOptions {
            alpha: 2.0 / (self.config.span + 1.0),
            adjust: true,
            bias: false,
            min_periods: self.config.min_samples,
            ignore_nulls: false,
        };
        (col(columns::SPECIFIC_RETURN).ewm_mean(options) * lit(-1.0))
            .shift(lit(self.config.shift as i64))
            .over([col(columns::BARRID)])
            .alias(self.name.as_str())
    }
}

impl Default for SmoothedReversal {
    fn default() -> Self {
        Self::new(SmoothedReversalConfig::default())
    }
}

impl Signal for SmoothedReversal {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, panel: &Panel) -> Result<Panel> {
        panel.require_columns(self.required_columns())?;
        if self.config.span.is_nan() || self.config.span < 1.0 {
            return Err(ReversoError::SignalComputation(format!(
                "{}: span must be at least 1, got {}",
                self.name, self.config.span
            )));
        }
        let out = frame::with_security_columns(panel.data(), vec![self.expr()])?;
        let values = out.column(self.name.as_str())?.as_materialized_series().clone();
        tracing::debug!(
            signal = %self.name,
            rows = values.len(),
            valid = values.len() - values.null_count(),
            "computed smoothed reversal"
        );
        panel.clone().with_derived(values)
    }

    fn lookback(&self) -> usize {
        self.config.min_samples + self.config.shift
    }

    fn required_columns(&self) -> &[&str] {
        &[columns::BARRID, columns::DATE, columns::SPECIFIC_RETURN]
    }
}
