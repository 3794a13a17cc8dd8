//! Mapping standardized scores to expected-return forecasts.

use crate::score::{Winsorization, log_unscored, zscore_expr};
use polars::prelude::*;
use reverso_traits::{Panel, ReversoError, Result, columns};
use serde::{Deserialize, Serialize};

const SUPPRESSED: &str = "__suppressed";

/// Volume-conditioned override of the alpha.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeOverride {
    /// Magnitude both scores must exceed for the alpha to be zeroed (default: 2.0)
    pub threshold: f64,

    /// Column holding the volume score (default: `volume_score`)
    pub column: String,
}

impl Default for VolumeOverride {
    fn default() -> Self {
        Self {
            threshold: 2.0,
            column: columns::VOLUME_SCORE.to_string(),
        }
    }
}

/// Configuration for alpha mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlphaConfig {
    /// Information coefficient scaling score into alpha (default: 0.05)
    pub ic: f64,

    /// Clipping applied to the score before mapping
    #[serde(default)]
    pub winsorization: Winsorization,

    /// Zero the alpha on abnormal-volume days when set
    #[serde(default)]
    pub volume_override: Option<VolumeOverride>,
}

impl Default for AlphaConfig {
    fn default() -> Self {
        Self {
            ic: 0.05,
            winsorization: Winsorization::default(),
            volume_override: None,
        }
    }
}

/// Cross-sectional alpha model.
///
/// For each date the signal is standardized to a z-score, clipped by the
/// winsorization policy and mapped to `alpha = score × IC × specific_risk`.
/// The `score` and `alpha` columns are appended to the panel.
///
/// With a [`VolumeOverride`], rows whose unclipped score magnitude and
/// volume score both exceed the threshold get an alpha of exactly zero.
///
/// # Example
///
/// ```ignore
/// use reverso_alpha::{AlphaConfig, AlphaModel};
///
/// let model = AlphaModel::new(AlphaConfig { ic: 0.05, ..Default::default() });
/// let panel = model.apply(&filtered, "reversal")?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct AlphaModel {
    config: AlphaConfig,
}

impl AlphaModel {
    /// Create a new alpha model with the given configuration.
    #[must_use]
    pub const fn new(config: AlphaConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &AlphaConfig {
        &self.config
    }

    /// Scores `signal` and appends the `score` and `alpha` columns.
    pub fn apply(&self, panel: &Panel, signal: &str) -> Result<Panel> {
        if !self.config.ic.is_finite() {
            return Err(ReversoError::Config(format!(
                "information coefficient must be finite, got {}",
                self.config.ic
            )));
        }
        self.config.winsorization.validate()?;

        let mut needed = vec![columns::DATE, columns::SPECIFIC_RISK, signal];
        if let Some(rule) = &self.config.volume_override {
            needed.push(rule.column.as_str());
        }
        panel.require_columns(&needed)?;

        let ic = self.config.ic;
        let clipped = self.config.winsorization.expr(col(columns::SCORE));
        let mapped = clipped.clone() * lit(ic) * col(columns::SPECIFIC_RISK);
        let suppressed = match &self.config.volume_override {
            Some(rule) => col(columns::SCORE)
                .abs()
                .gt(lit(rule.threshold))
                .and(col(rule.column.as_str()).gt(lit(rule.threshold)))
                .and(col(columns::SPECIFIC_RISK).is_not_null())
                .fill_null(lit(false)),
            None => lit(false),
        };

        // Expressions in one `with_columns` all read the unclipped score.
        let mapped = panel
            .data()
            .clone()
            .lazy()
            .with_column(zscore_expr(signal).alias(columns::SCORE))
            .with_columns([
                clipped.alias(columns::SCORE),
                when(suppressed.clone())
                    .then(lit(0.0))
                    .otherwise(mapped)
                    .alias(columns::ALPHA),
                suppressed.alias(SUPPRESSED),
            ])
            .collect()?;
        log_unscored(panel.data(), &mapped, signal)?;

        let zeroed = mapped
            .column(SUPPRESSED)?
            .as_materialized_series()
            .bool()?
            .sum()
            .unwrap_or(0);
        if zeroed > 0 {
            tracing::info!(signal, zeroed, "volume override zeroed alphas");
        }

        let column = |name: &str| -> Result<Series> {
            Ok(mapped.column(name)?.as_materialized_series().clone())
        };
        panel
            .clone()
            .with_derived(column(columns::SCORE)?)?
            .with_derived(column(columns::ALPHA)?)
    }
}
