//! Equal-weight quantile portfolios.
//!
//! Securities are ranked by signal within each date and split into `K`
//! buckets of equal population. Ranks are ordinal: ties are broken by row
//! order, so duplicate values never produce duplicate bucket edges and
//! populations differ by at most one.

use polars::prelude::*;
use reverso_traits::{Panel, ReversoError, Result, columns, stats};
use serde::{Deserialize, Serialize};

/// Label of the long-short spread series.
pub const SPREAD: &str = "spread";

const BOTTOM_LEG: &str = "bottom";
const TOP_LEG: &str = "top";

/// How the bottom leg is scaled before differencing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpreadMethod {
    /// `top - bottom`
    #[default]
    Plain,
    /// `top - bottom × std(top) / std(bottom)`, so both legs carry the same
    /// ex-post volatility.
    VolMatched,
}

/// Configuration for quantile portfolios.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantileConfig {
    /// Number of buckets (default: 10)
    pub bins: usize,

    /// Spread construction (default: plain)
    #[serde(default)]
    pub spread: SpreadMethod,

    /// Column averaged into bucket returns (default: `return`)
    pub return_column: String,
}

impl Default for QuantileConfig {
    fn default() -> Self {
        Self {
            bins: 10,
            spread: SpreadMethod::Plain,
            return_column: columns::RETURN.to_string(),
        }
    }
}

/// Bucket index of `signal`, computed date by date.
///
/// Rows with a null value get no bucket. Within a date of `n` valid rows,
/// the row of ordinal rank `r` (from zero) lands in bucket
/// `floor(r × bins / n)`.
pub fn bin_expr(signal: &str, bins: usize) -> Expr {
    let rank = col(signal)
        .rank(
            RankOptions {
                method: RankMethod::Ordinal,
                descending: false,
            },
            None,
        )
        .over([col(columns::DATE)])
        .cast(DataType::Int64);
    let valid = col(signal)
        .count()
        .over([col(columns::DATE)])
        .cast(DataType::Int64);
    ((rank - lit(1i64)) * lit(bins as i64))
        .floor_div(valid)
        .cast(DataType::UInt32)
        .alias(columns::BIN)
}

/// Quantile portfolio builder.
#[derive(Debug, Clone, Default)]
pub struct QuantilePortfolios {
    config: QuantileConfig,
}

impl QuantilePortfolios {
    /// Create a new builder with the given configuration.
    #[must_use]
    pub const fn new(config: QuantileConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &QuantileConfig {
        &self.config
    }

    /// Appends the `bin` column for `signal`.
    pub fn assign(&self, panel: &Panel, signal: &str) -> Result<Panel> {
        if self.config.bins == 0 {
            return Err(ReversoError::Config("quantile bins must be positive".into()));
        }
        panel.require_columns(&[columns::DATE, signal])?;

        let nan_free = panel
            .data()
            .clone()
            .lazy()
            .with_column(
                when(col(signal).is_nan())
                    .then(lit(Null {}).cast(DataType::Float64))
                    .otherwise(col(signal))
                    .alias(signal),
            )
            .with_column(bin_expr(signal, self.config.bins))
            .collect()?;
        let bins = nan_free.column(columns::BIN)?.as_materialized_series().clone();
        panel.clone().with_derived(bins)
    }

    /// Equal-weight bucket returns and the spread, in long format.
    ///
    /// `binned` must carry the `bin` column from [`Self::assign`]. The
    /// output has one row per (date, portfolio) with columns `date`,
    /// `portfolio` (`"0"`..`"K-1"` and `"spread"`) and `return`. Buckets
    /// without a valid return on a date are absent for that date, and the
    /// spread only exists where both legs do.
    pub fn returns(&self, binned: &Panel) -> Result<DataFrame> {
        let return_column = self.config.return_column.as_str();
        binned.require_columns(&[columns::DATE, columns::BIN, return_column])?;

        let means = binned
            .data()
            .clone()
            .lazy()
            .filter(
                col(columns::BIN)
                    .is_not_null()
                    .and(col(return_column).is_not_null())
                    .and(col(return_column).is_not_nan()),
            )
            .with_column(col(columns::BIN).cast(DataType::UInt32))
            .group_by([col(columns::DATE), col(columns::BIN)])
            .agg([col(return_column).mean().alias(columns::RETURN)])
            .sort([columns::DATE, columns::BIN], SortMultipleOptions::default())
            .collect()?;

        let top = self.config.bins.saturating_sub(1) as u32;
        let leg = |bin: u32, name: &str| {
            means
                .clone()
                .lazy()
                .filter(col(columns::BIN).eq(lit(bin)))
                .select([col(columns::DATE), col(columns::RETURN).alias(name)])
        };
        let legs = leg(0, BOTTOM_LEG)
            .join(
                leg(top, TOP_LEG),
                [col(columns::DATE)],
                [col(columns::DATE)],
                JoinArgs::new(JoinType::Inner),
            )
            .sort([columns::DATE], SortMultipleOptions::default())
            .collect()?;

        let scale = match self.config.spread {
            SpreadMethod::Plain => 1.0,
            SpreadMethod::VolMatched => {
                let std = |name: &str| -> Result<Option<f64>> {
                    Ok(legs.column(name)?.as_materialized_series().std(1))
                };
                match (std(TOP_LEG)?, std(BOTTOM_LEG)?) {
                    (Some(t), Some(b)) if b > stats::MIN_STD_THRESHOLD => t / b,
                    _ => {
                        tracing::warn!("bottom leg has no volatility, spread left unscaled");
                        1.0
                    }
                }
            }
        };

        let buckets = means.lazy().select([
            col(columns::DATE),
            col(columns::BIN).cast(DataType::String).alias(columns::PORTFOLIO),
            col(columns::RETURN),
        ]);
        let spread = legs.lazy().select([
            col(columns::DATE),
            lit(SPREAD).alias(columns::PORTFOLIO),
            (col(TOP_LEG) - col(BOTTOM_LEG) * lit(scale)).alias(columns::RETURN),
        ]);
        Ok(concat([buckets, spread], UnionArgs::default())?.collect()?)
    }
}
