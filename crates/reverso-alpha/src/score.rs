//! Cross-sectional standardization and winsorization.

use polars::prelude::*;
use reverso_traits::stats::MIN_STD_THRESHOLD;
use reverso_traits::{Panel, ReversoError, Result, columns};
use serde::{Deserialize, Serialize};

/// Policy for clipping extreme scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Winsorization {
    /// Leave scores untouched.
    None,
    /// Clip to fixed bounds in z-score units.
    Fixed {
        /// Lower bound
        lower: f64,
        /// Upper bound
        upper: f64,
    },
    /// Clip to per-date nearest-rank quantiles of the score.
    Quantile {
        /// Lower quantile in [0, 1]
        lower: f64,
        /// Upper quantile in [0, 1]
        upper: f64,
    },
}

impl Default for Winsorization {
    fn default() -> Self {
        Self::Fixed {
            lower: -2.0,
            upper: 2.0,
        }
    }
}

impl Winsorization {
    /// Checks that the bounds are ordered and quantiles lie in [0, 1].
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::None => Ok(()),
            Self::Fixed { lower, upper } if lower < upper => Ok(()),
            Self::Quantile { lower, upper }
                if (0.0..=1.0).contains(&lower) && (0.0..=1.0).contains(&upper) && lower < upper =>
            {
                Ok(())
            }
            other => Err(ReversoError::Config(format!(
                "invalid winsorization bounds: {other:?}"
            ))),
        }
    }

    /// Clips `score`; quantile bounds are taken per date.
    #[must_use]
    pub fn expr(&self, score: Expr) -> Expr {
        match *self {
            Self::None => score,
            Self::Fixed { lower, upper } => clip(score, lit(lower), lit(upper)),
            Self::Quantile { lower, upper } => {
                let bound = |q: f64| {
                    score
                        .clone()
                        .quantile(lit(q), QuantileMethod::Nearest)
                        .over([col(columns::DATE)])
                };
                clip(score.clone(), bound(lower), bound(upper))
            }
        }
    }
}

fn clip(value: Expr, lower: Expr, upper: Expr) -> Expr {
    when(value.clone().lt(lower.clone()))
        .then(lower)
        .when(value.clone().gt(upper.clone()))
        .then(upper)
        .otherwise(value)
}

/// Per-date z-score of `column`.
///
/// Each date is standardized with its own mean and sample standard
/// deviation over the non-null values, NaN counting as null. Dates with
/// fewer than two observations or a deviation at or below
/// [`MIN_STD_THRESHOLD`] produce nulls for every row.
pub fn zscore_expr(column: &str) -> Expr {
    let value = col(column).fill_nan(lit(Null {}));
    let by_date = [col(columns::DATE)];
    let std = value.clone().std(1).over(by_date.clone());
    let valid = value.clone().count().over(by_date.clone());
    when(
        valid
            .gt_eq(lit(2))
            .and(std.clone().gt(lit(MIN_STD_THRESHOLD))),
    )
    .then((value.clone() - value.mean().over(by_date)) / std)
    .otherwise(lit(Null {}).cast(DataType::Float64))
}

/// Appends the `score` column: per-date z-scores of `column`.
///
/// See [`zscore_expr`] for the treatment of degenerate dates.
pub fn cross_sectional_zscore(panel: &Panel, column: &str) -> Result<Panel> {
    panel.require_columns(&[columns::DATE, column])?;
    let scored = panel
        .data()
        .clone()
        .lazy()
        .select([zscore_expr(column).alias(columns::SCORE)])
        .collect()?;
    log_unscored(panel.data(), &scored, column)?;
    let score = scored.column(columns::SCORE)?.as_materialized_series().clone();
    panel.clone().with_derived(score)
}

/// Logs rows that carry a value but no score, i.e. degenerate dates.
pub(crate) fn log_unscored(input: &DataFrame, scored: &DataFrame, column: &str) -> Result<()> {
    let valid = input.column(column)?.as_materialized_series().is_not_null();
    let scores = scored.column(columns::SCORE)?.as_materialized_series().is_null();
    let unscored = (&valid & &scores).sum().unwrap_or(0);
    if unscored > 0 {
        tracing::debug!(column, unscored, "degenerate cross-sections left unscored");
    }
    Ok(())
}
