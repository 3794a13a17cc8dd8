//! Ordinary least squares factor regressions.

use ndarray::{Array1, Array2};
use polars::prelude::*;
use reverso_traits::{ReversoError, Result, columns, frame, stats};
use serde::{Deserialize, Serialize};

/// Default factor set: market excess, size, value and momentum.
pub const DEFAULT_FACTORS: [&str; 4] = ["mktrf", "smb", "hml", "umd"];

/// Risk-free rate column subtracted from returns when present.
pub const RISK_FREE: &str = "rf";

/// Name of the intercept term.
pub const INTERCEPT: &str = "intercept";

const EXCESS_RETURN: &str = "excess_return";

/// Fitted OLS model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OlsResult {
    /// Term names, intercept first
    pub terms: Vec<String>,
    /// Estimated coefficients
    pub coef: Vec<f64>,
    /// Standard errors
    pub std_err: Vec<f64>,
    /// t-statistics
    pub t_stat: Vec<f64>,
    /// Coefficient of determination
    pub r_squared: f64,
    /// Observations used
    pub n_obs: usize,
}

/// Fits `y = Xb + e` with an intercept prepended to `regressors`.
///
/// # Errors
///
/// Fails when there are no more observations than terms, when a regressor
/// length disagrees with `y`, or when `XᵀX` is singular.
pub fn ols(y: &[f64], regressors: &[(&str, Vec<f64>)]) -> Result<OlsResult> {
    let n = y.len();
    let k = regressors.len() + 1;
    if n <= k {
        return Err(ReversoError::InsufficientData(format!(
            "OLS needs more than {k} observations, got {n}"
        )));
    }
    if let Some((name, _)) = regressors.iter().find(|(_, x)| x.len() != n) {
        return Err(ReversoError::InvalidData(format!(
            "regressor '{name}' length differs from the response"
        )));
    }

    let mut x = Array2::<f64>::ones((n, k));
    for (j, (_, values)) in regressors.iter().enumerate() {
        x.column_mut(j + 1).assign(&Array1::from_vec(values.clone()));
    }
    let y = Array1::from_vec(y.to_vec());

    let xtx_inv = stats::invert(&x.t().dot(&x))
        .ok_or_else(|| ReversoError::InvalidData("singular design matrix".into()))?;
    let coef = xtx_inv.dot(&x.t().dot(&y));

    let residuals = &y - &x.dot(&coef);
    let ssr = residuals.dot(&residuals);
    let mean_y = y.mean().unwrap_or(0.0);
    let sst = y.mapv(|v| (v - mean_y).powi(2)).sum();
    let sigma2 = ssr / (n - k) as f64;

    let std_err: Vec<f64> = xtx_inv
        .diag()
        .iter()
        .map(|v| (v * sigma2).sqrt())
        .collect();
    let t_stat = coef
        .iter()
        .zip(&std_err)
        .map(|(b, se)| if *se > 0.0 { b / se } else { f64::NAN })
        .collect();

    let mut terms = vec![INTERCEPT.to_string()];
    terms.extend(regressors.iter().map(|(name, _)| (*name).to_string()));

    Ok(OlsResult {
        terms,
        coef: coef.to_vec(),
        std_err,
        t_stat,
        r_squared: if sst > 0.0 { 1.0 - ssr / sst } else { f64::NAN },
        n_obs: n,
    })
}

/// Regresses each partition's returns on the factor returns of the same
/// date.
///
/// `returns` holds `date`, `return` and optionally the partition column;
/// `factors` holds `date`, each of `factor_names` and optionally `rf`,
/// which is subtracted from the portfolio return. Dates missing from the
/// factor file or with any null input are dropped.
pub fn factor_regression(
    returns: &DataFrame,
    factors: &DataFrame,
    factor_names: &[&str],
    partition: Option<&str>,
) -> Result<Vec<(String, OlsResult)>> {
    for name in factor_names.iter().copied().chain([columns::DATE]) {
        if factors.column(name).is_err() {
            return Err(ReversoError::MissingColumn(name.to_string()));
        }
    }
    let has_rf = factors.column(RISK_FREE).is_ok();

    let mut factor_columns = vec![col(columns::DATE)];
    factor_columns.extend(
        factor_names
            .iter()
            .map(|name| col(*name).cast(DataType::Float64)),
    );
    let excess = if has_rf {
        factor_columns.push(col(RISK_FREE).cast(DataType::Float64));
        col(columns::RETURN).cast(DataType::Float64) - col(RISK_FREE)
    } else {
        col(columns::RETURN).cast(DataType::Float64)
    };

    let complete = factor_names
        .iter()
        .copied()
        .chain([EXCESS_RETURN])
        .fold(lit(true), |all, name| {
            all.and(col(name).is_not_null()).and(col(name).is_not_nan())
        });

    let joined = frame::with_date_column(returns.clone())?
        .lazy()
        .join(
            frame::with_date_column(factors.clone())?
                .lazy()
                .select(factor_columns),
            [col(columns::DATE)],
            [col(columns::DATE)],
            JoinArgs::new(JoinType::Inner),
        )
        .with_column(excess.alias(EXCESS_RETURN))
        .filter(complete)
        .sort([columns::DATE], SortMultipleOptions::default().with_maintain_order(true))
        .collect()?;

    let parts = match partition {
        Some(name) => joined.partition_by_stable([name], true)?,
        None => vec![joined],
    };

    let mut results = Vec::with_capacity(parts.len());
    for part in parts {
        let name = match partition {
            Some(key) => frame::str_values(&part, key)?
                .into_iter()
                .flatten()
                .next()
                .unwrap_or_default(),
            None => columns::RETURN.to_string(),
        };
        let y: Vec<f64> = frame::f64_values(&part, EXCESS_RETURN)?
            .into_iter()
            .flatten()
            .collect();
        let regressors = factor_names
            .iter()
            .map(|factor| {
                let values = frame::f64_values(&part, factor)?.into_iter().flatten().collect();
                Ok((*factor, values))
            })
            .collect::<Result<Vec<(&str, Vec<f64>)>>>()?;

        let fit = ols(&y, &regressors)?;
        tracing::debug!(
            portfolio = %name,
            n_obs = fit.n_obs,
            r_squared = fit.r_squared,
            "fitted factor regression"
        );
        results.push((name, fit));
    }
    Ok(results)
}

/// Tabulates regression results, one row per (portfolio, term).
pub fn regression_frame(results: &[(String, OlsResult)]) -> Result<DataFrame> {
    let mut portfolio = Vec::new();
    let mut term = Vec::new();
    let mut coef = Vec::new();
    let mut std_err = Vec::new();
    let mut t_stat = Vec::new();
    for (name, fit) in results {
        for j in 0..fit.terms.len() {
            portfolio.push(name.as_str());
            term.push(fit.terms[j].as_str());
            coef.push(fit.coef[j]);
            std_err.push(fit.std_err[j]);
            t_stat.push(fit.t_stat[j]);
        }
    }
    Ok(DataFrame::new(vec![
        Series::new(columns::PORTFOLIO.into(), portfolio).into(),
        Series::new("term".into(), term).into(),
        Series::new("coef".into(), coef).into(),
        Series::new("std_err".into(), std_err).into(),
        Series::new("t_stat".into(), t_stat).into(),
    ])?)
}
