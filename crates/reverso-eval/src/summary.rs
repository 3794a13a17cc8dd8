//! Annualized performance summary.

use polars::prelude::*;
use reverso_traits::{Result, columns, frame, stats};
use serde::{Deserialize, Serialize};

/// Trading days used to annualize daily statistics.
pub const PERIODS_PER_YEAR: usize = 252;

/// Annualized statistics of one return series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Series label (bucket, spread or signal name)
    pub name: String,
    /// Mean return × periods per year
    pub mean_return: f64,
    /// Standard deviation × √periods per year
    pub volatility: f64,
    /// Annualized mean over annualized volatility
    pub sharpe: f64,
    /// Largest peak-to-trough loss of compounded wealth
    pub max_drawdown: f64,
    /// Number of non-null returns
    pub n_obs: usize,
}

impl PerformanceSummary {
    /// Summarizes a date-ordered return series.
    ///
    /// Nulls are skipped. With fewer than two observations the volatility
    /// and Sharpe ratio are NaN; a zero volatility also gives a NaN Sharpe.
    pub fn from_returns(
        name: impl Into<String>,
        returns: &[Option<f64>],
        periods_per_year: usize,
    ) -> Self {
        let periods = periods_per_year as f64;
        let n_obs = returns.iter().flatten().count();
        let mean_return = stats::mean(returns).map_or(f64::NAN, |m| m * periods);
        let volatility = stats::sample_std(returns).map_or(f64::NAN, |s| s * periods.sqrt());
        let sharpe = if volatility > 0.0 {
            mean_return / volatility
        } else {
            f64::NAN
        };

        Self {
            name: name.into(),
            mean_return,
            volatility,
            sharpe,
            max_drawdown: max_drawdown(returns),
            n_obs,
        }
    }
}

/// Maximum drawdown of compounded wealth, as a positive fraction.
pub fn max_drawdown(returns: &[Option<f64>]) -> f64 {
    let mut wealth = 1.0;
    let mut peak = 1.0;
    let mut max_dd = 0.0;
    for r in returns.iter().flatten() {
        wealth *= 1.0 + r;
        if wealth > peak {
            peak = wealth;
        }
        let dd = 1.0 - wealth / peak;
        if dd > max_dd {
            max_dd = dd;
        }
    }
    max_dd
}

/// Summarizes every partition of a long return frame.
///
/// `df` holds `date`, `return_column` and, when given, the partition
/// column. Each partition is summarized in date order.
pub fn summarize(
    df: &DataFrame,
    partition: Option<&str>,
    return_column: &str,
    periods_per_year: usize,
) -> Result<Vec<PerformanceSummary>> {
    let parts = match partition {
        Some(name) => df.partition_by_stable([name], true)?,
        None => vec![df.clone()],
    };

    parts
        .into_iter()
        .map(|part| {
            let name = match partition {
                Some(key) => frame::str_values(&part, key)?
                    .into_iter()
                    .flatten()
                    .next()
                    .unwrap_or_default(),
                None => return_column.to_string(),
            };
            let ordered = part.sort([columns::DATE], SortMultipleOptions::default().with_maintain_order(true))?;
            let series = frame::f64_values(&ordered, return_column)?;
            Ok(PerformanceSummary::from_returns(name, &series, periods_per_year))
        })
        .collect()
}

/// Tabulates summaries, one row per series.
pub fn summary_frame(summaries: &[PerformanceSummary]) -> Result<DataFrame> {
    let column =
        |f: fn(&PerformanceSummary) -> f64| -> Vec<f64> { summaries.iter().map(f).collect() };
    Ok(DataFrame::new(vec![
        Series::new(
            columns::PORTFOLIO.into(),
            summaries.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new("mean_return".into(), column(|s| s.mean_return)).into(),
        Series::new("volatility".into(), column(|s| s.volatility)).into(),
        Series::new("sharpe".into(), column(|s| s.sharpe)).into(),
        Series::new("max_drawdown".into(), column(|s| s.max_drawdown)).into(),
        Series::new(
            "n_obs".into(),
            summaries.iter().map(|s| s.n_obs as u64).collect::<Vec<_>>(),
        )
        .into(),
    ])?)
}
