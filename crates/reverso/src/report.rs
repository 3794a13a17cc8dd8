//! Performance reports and their on-disk form.
//!
//! Charts are left to downstream tooling: the cumulative-return series are
//! written as plot-ready CSV and the tables as JSON plus a plain-text
//! rendering.

use crate::io;
use crate::pipeline::QuantileReport;
use polars::prelude::*;
use reverso_eval::{
    DEFAULT_FACTORS, OlsResult, PERIODS_PER_YEAR, PerformanceSummary, cumulative_log_returns,
    factor_regression, forward_returns, portfolio_returns, regression_frame, summarize,
};
use reverso_traits::{Panel, ReversoError, Result, columns};
use std::fmt::Write as _;
use std::path::Path;

/// Performance of one weight set.
#[derive(Debug, Clone)]
pub struct PerformanceReport {
    /// Portfolio returns with `cum_log_return`
    pub returns: DataFrame,
    /// Annualized summary
    pub summary: Vec<PerformanceSummary>,
    /// Factor regression, when factor returns were supplied
    pub regression: Option<Vec<(String, OlsResult)>>,
}

/// Joins `weights` to next-period returns and summarizes the portfolio.
///
/// `weights` holds `date`, `barrid` and `weight`; `panel` holds the
/// `return` column the forward returns are taken from. The portfolio is
/// labelled `name`.
pub fn performance_report(
    weights: &DataFrame,
    panel: &Panel,
    factors: Option<&DataFrame>,
    name: &str,
) -> Result<PerformanceReport> {
    let with_forward = forward_returns(panel, columns::RETURN)?;
    let mut labelled = weights.clone();
    labelled.with_column(Series::new(
        columns::PORTFOLIO.into(),
        vec![name; weights.height()],
    ))?;

    let returns = portfolio_returns(&labelled, &with_forward, Some(columns::PORTFOLIO))?;
    if returns.height() == 0 {
        return Err(ReversoError::InsufficientData(
            "no weights matched a forward return".into(),
        ));
    }
    let returns = cumulative_log_returns(&returns, Some(columns::PORTFOLIO), columns::RETURN)?;
    let summary = summarize(
        &returns,
        Some(columns::PORTFOLIO),
        columns::RETURN,
        PERIODS_PER_YEAR,
    )?;
    let regression = factors
        .map(|f| factor_regression(&returns, f, &DEFAULT_FACTORS, Some(columns::PORTFOLIO)))
        .transpose()?;

    Ok(PerformanceReport {
        returns,
        summary,
        regression,
    })
}

/// Renders summaries as an aligned text table.
pub fn summary_table(title: &str, summaries: &[PerformanceSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", "-".repeat(72));
    let _ = writeln!(
        out,
        "{:<16} {:>12} {:>12} {:>10} {:>12} {:>6}",
        "portfolio", "mean (ann)", "vol (ann)", "sharpe", "max dd", "n"
    );
    for s in summaries {
        let _ = writeln!(
            out,
            "{:<16} {:>11.2}% {:>11.2}% {:>10.2} {:>11.2}% {:>6}",
            s.name,
            s.mean_return * 100.0,
            s.volatility * 100.0,
            s.sharpe,
            s.max_drawdown * 100.0,
            s.n_obs
        );
    }
    out
}

/// Renders regression results as a text table.
pub fn regression_table(results: &[(String, OlsResult)]) -> String {
    let mut out = String::new();
    for (name, fit) in results {
        let _ = writeln!(out, "{name} (n = {}, R² = {:.3})", fit.n_obs, fit.r_squared);
        let _ = writeln!(out, "{:<12} {:>12} {:>12} {:>8}", "term", "coef", "std err", "t");
        for j in 0..fit.terms.len() {
            let _ = writeln!(
                out,
                "{:<12} {:>12.6} {:>12.6} {:>8.2}",
                fit.terms[j], fit.coef[j], fit.std_err[j], fit.t_stat[j]
            );
        }
        out.push('\n');
    }
    out
}

fn write_summary(dir: &Path, title: &str, summaries: &[PerformanceSummary]) -> Result<()> {
    let json = serde_json::to_string_pretty(summaries)
        .map_err(|e| ReversoError::Other(format!("failed to encode summary: {e}")))?;
    std::fs::write(dir.join("summary.json"), json)?;
    std::fs::write(dir.join("summary.txt"), summary_table(title, summaries))?;
    Ok(())
}

/// Writes `returns.csv`, `summary.json`, `summary.txt` and, with a
/// regression, `regression.csv` and `regression.txt` into `dir`.
pub fn write_performance_report(report: &PerformanceReport, dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    io::write_csv(&mut report.returns.clone(), dir.join("returns.csv"))?;
    write_summary(dir, "Portfolio performance", &report.summary)?;
    if let Some(regression) = &report.regression {
        io::write_csv(&mut regression_frame(regression)?, dir.join("regression.csv"))?;
        std::fs::write(dir.join("regression.txt"), regression_table(regression))?;
    }
    tracing::info!(dir = %dir.display(), "wrote performance report");
    Ok(())
}

/// Writes `returns.csv`, `summary.json` and `summary.txt` into `dir`.
pub fn write_quantile_report(report: &QuantileReport, signal: &str, dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    io::write_csv(&mut report.returns.clone(), dir.join("returns.csv"))?;
    write_summary(dir, &format!("Quantile portfolios for {signal}"), &report.summary)?;
    tracing::info!(dir = %dir.display(), "wrote quantile report");
    Ok(())
}
