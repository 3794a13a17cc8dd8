//! Portfolio weights against the benchmark.

use polars::prelude::*;
use reverso_traits::{ReversoError, Result, columns};

/// Active weight column: `weight - bmk_weight`.
pub const ACTIVE_WEIGHT: &str = "active_weight";

/// Relative deviation column: `weight / bmk_weight - 1`.
pub const PCT_CHANGE_BMK: &str = "pct_change_bmk";

fn require(df: &DataFrame, names: &[&str]) -> Result<()> {
    match names.iter().find(|name| df.column(name).is_err()) {
        Some(name) => Err(ReversoError::MissingColumn((*name).to_string())),
        None => Ok(()),
    }
}

/// Joins portfolio weights onto the benchmark.
///
/// Every benchmark holding appears once per date; names the portfolio does
/// not hold get a weight of 0. Tickers are attached when `tickers` (with
/// `date`, `barrid`, `ticker`) is given. Rows are sorted by date, then by
/// weight descending.
pub fn active_weights(
    weights: &DataFrame,
    benchmark: &DataFrame,
    tickers: Option<&DataFrame>,
) -> Result<DataFrame> {
    require(weights, &[columns::DATE, columns::BARRID, columns::WEIGHT])?;
    require(benchmark, &[columns::DATE, columns::BARRID, columns::BMK_WEIGHT])?;
    let keys = [col(columns::DATE), col(columns::BARRID)];

    let mut report = benchmark
        .clone()
        .lazy()
        .select([
            col(columns::DATE),
            col(columns::BARRID),
            col(columns::BMK_WEIGHT),
        ])
        .join(
            weights
                .clone()
                .lazy()
                .select([col(columns::DATE), col(columns::BARRID), col(columns::WEIGHT)]),
            keys.clone(),
            keys.clone(),
            JoinArgs::new(JoinType::Left),
        );
    if let Some(tickers) = tickers {
        require(tickers, &[columns::DATE, columns::BARRID, columns::TICKER])?;
        report = report.join(
            tickers
                .clone()
                .lazy()
                .select([col(columns::DATE), col(columns::BARRID), col(columns::TICKER)]),
            keys.clone(),
            keys,
            JoinArgs::new(JoinType::Left),
        );
    }

    Ok(report
        .with_column(col(columns::WEIGHT).fill_null(lit(0.0)))
        .with_columns([
            (col(columns::WEIGHT) - col(columns::BMK_WEIGHT)).alias(ACTIVE_WEIGHT),
            (col(columns::WEIGHT) / col(columns::BMK_WEIGHT) - lit(1.0)).alias(PCT_CHANGE_BMK),
        ])
        .sort_by_exprs(
            [col(columns::DATE), col(columns::WEIGHT)],
            SortMultipleOptions::default().with_order_descending_multi([false, true]),
        )
        .collect()?)
}

/// Active risk under a diagonal risk model: `sqrt(Σ (a_i σ_i)²)`.
///
/// Pairs with a null active weight or risk are skipped.
pub fn active_risk(active: &[Option<f64>], specific_risk: &[Option<f64>]) -> f64 {
    active
        .iter()
        .zip(specific_risk)
        .filter_map(|(a, s)| Some((a.as_ref()? * s.as_ref()?).powi(2)))
        .sum::<f64>()
        .sqrt()
}
