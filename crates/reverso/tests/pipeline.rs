//! End-to-end tests of the research pipeline on synthetic panels.

use approx::assert_relative_eq;
use chrono::Days;
use polars::prelude::*;
use reverso::alpha::{AlphaConfig, Winsorization};
use reverso::eval::{QuantileConfig, SPREAD};
use reverso::io::{read_weights_dir, write_parquet, year_path};
use reverso::optimize::{filter_year, years};
use reverso::traits::{Date, Panel, frame};
use reverso::{
    BacktestRunner, DiagonalMeanVariance, ExperimentConfig, Pipeline, SignalSpec,
    performance_report,
};
use std::collections::HashMap;
use tempfile::tempdir;

fn day(t: usize) -> Date {
    Date::from_ymd_opt(2023, 11, 1).unwrap() + Days::new(t as u64)
}

fn synthetic_return(security: usize, t: usize) -> f64 {
    0.02 * ((security as f64 * 1.7) + (t as f64 * 0.9)).sin()
}

/// `n_securities` names over `n_dates` dates, rows in date then id order.
fn panel(n_securities: usize, n_dates: usize) -> Panel {
    let mut dates = Vec::new();
    let mut ids = Vec::new();
    let mut returns = Vec::new();
    let mut prices = Vec::new();
    let mut risks = Vec::new();
    let mut betas = Vec::new();
    for t in 0..n_dates {
        for s in 0..n_securities {
            dates.push(Some(day(t)));
            ids.push(format!("S{s:02}"));
            returns.push(synthetic_return(s, t));
            prices.push(20.0 + s as f64);
            risks.push(0.01 + 0.002 * s as f64);
            betas.push(0.8 + 0.1 * s as f64);
        }
    }
    let mut df = df! {
        "barrid" => ids,
        "return" => returns.clone(),
        "specific_return" => returns,
        "price" => prices,
        "specific_risk" => risks,
        "predicted_beta" => betas,
    }
    .unwrap();
    df.with_column(frame::date_series("date", &dates).unwrap())
        .unwrap();
    Panel::new(df)
}

fn config(window: usize, bins: usize) -> ExperimentConfig {
    ExperimentConfig {
        signal: SignalSpec::Reversal { window, shift: 1 },
        alpha: AlphaConfig {
            winsorization: Winsorization::None,
            ..AlphaConfig::default()
        },
        quantile: QuantileConfig {
            bins,
            ..QuantileConfig::default()
        },
        ..ExperimentConfig::default()
    }
}

#[test]
fn test_short_history_yields_no_signal() {
    let pipeline = Pipeline::new(ExperimentConfig::default()).unwrap();
    let out = pipeline.signals(&panel(3, 5)).unwrap();
    let values = frame::f64_values(out.data(), "reversal").unwrap();
    assert_eq!(values.len(), 15);
    assert!(values.iter().all(Option::is_none));
}

#[test]
fn test_history_shortfall_against_lookback() {
    let pipeline = Pipeline::new(ExperimentConfig::default()).unwrap();
    let signal = ExperimentConfig::default().signal.build("reversal");
    // 21-day window shifted by one needs 22 dates
    assert_eq!(Pipeline::history_shortfall(&panel(3, 5), signal.as_ref()).unwrap(), 17);
    assert_eq!(Pipeline::history_shortfall(&panel(3, 30), signal.as_ref()).unwrap(), 0);
    assert_eq!(pipeline.signal_name(), signal.name());
}

#[test]
fn test_reversal_matches_negated_log_sum() {
    let pipeline = Pipeline::new(ExperimentConfig::default()).unwrap();
    let n = 2;
    let out = pipeline.signals(&panel(n, 30)).unwrap();
    let values = frame::f64_values(out.data(), "reversal").unwrap();

    for s in 0..n {
        // First value on the 22nd date: 21 returns ending the day before.
        assert!(values[20 * n + s].is_none());
        for t in [21, 29] {
            let expected: f64 = -(t - 21..t)
                .map(|k| synthetic_return(s, k).ln_1p())
                .sum::<f64>();
            assert_relative_eq!(values[t * n + s].unwrap(), expected, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_two_bucket_quantile_spread() {
    let pipeline = Pipeline::new(config(3, 2)).unwrap();
    let report = pipeline.quantile(&panel(4, 12)).unwrap();
    let returns = &report.returns;

    let labels = frame::str_values(returns, "portfolio").unwrap();
    let dates = frame::date_values(returns, "date").unwrap();
    let values = frame::f64_values(returns, "return").unwrap();
    let lookup = |label: &str, date: Date| {
        labels
            .iter()
            .zip(&dates)
            .zip(&values)
            .find(|((l, d), _)| l.as_deref() == Some(label) && **d == Some(date))
            .and_then(|(_, v)| *v)
    };

    let spread_dates: Vec<Date> = labels
        .iter()
        .zip(&dates)
        .filter(|(l, _)| l.as_deref() == Some(SPREAD))
        .filter_map(|(_, d)| *d)
        .collect();
    assert!(!spread_dates.is_empty());
    for date in spread_dates {
        let low = lookup("0", date).unwrap();
        let high = lookup("1", date).unwrap();
        assert_relative_eq!(lookup(SPREAD, date).unwrap(), high - low, epsilon = 1e-12);
    }

    // Three summaries: two buckets and the spread.
    assert_eq!(report.summary.len(), 3);
}

#[test]
fn test_quantile_cumulative_log_returns() {
    let pipeline = Pipeline::new(config(3, 2)).unwrap();
    let report = pipeline.quantile(&panel(4, 12)).unwrap();
    let returns = &report.returns;

    let labels = frame::str_values(returns, "portfolio").unwrap();
    let values = frame::f64_values(returns, "return").unwrap();
    let cumulative = frame::f64_values(returns, "cum_log_return").unwrap();

    let rows: Vec<usize> = (0..returns.height())
        .filter(|&i| labels[i].as_deref() == Some(SPREAD))
        .collect();
    let mut running = 0.0;
    for row in rows {
        running += values[row].unwrap().ln_1p();
        assert_relative_eq!(cumulative[row].unwrap(), running, epsilon = 1e-12);
    }
}

#[test]
fn test_scores_standardized_per_date() {
    let pipeline = Pipeline::new(config(3, 2)).unwrap();
    let alphas = pipeline.alphas(&panel(6, 10)).unwrap();
    let df = alphas.data();

    for section in df.partition_by_stable(["date"], true).unwrap() {
        let scores = frame::f64_values(&section, "score").unwrap();
        let alpha = frame::f64_values(&section, "alpha").unwrap();
        let risk = frame::f64_values(&section, "specific_risk").unwrap();

        let xs: Vec<f64> = scores.iter().map(|s| s.unwrap()).collect();
        let n = xs.len() as f64;
        let mean = xs.iter().sum::<f64>() / n;
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
        assert_relative_eq!(mean, 0.0, epsilon = 1e-10);
        assert_relative_eq!(var.sqrt(), 1.0, epsilon = 1e-10);
        for r in 0..section.height() {
            assert_relative_eq!(
                alpha[r].unwrap(),
                scores[r].unwrap() * 0.05 * risk[r].unwrap(),
                epsilon = 1e-14
            );
        }
    }
}

#[test]
fn test_checkpoint_backtest_and_report() {
    let dir = tempdir().unwrap();
    let panel = panel(6, 70);
    let pipeline = Pipeline::new(config(3, 2)).unwrap();
    let alphas = pipeline.alphas(&panel).unwrap();
    let checkpoint = pipeline.checkpoint(&alphas).unwrap();
    let names: Vec<&str> = checkpoint
        .get_column_names()
        .into_iter()
        .map(|name| name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["date", "barrid", "alpha", "predicted_beta", "specific_risk"]
    );

    let optimizer = DiagonalMeanVariance;
    let runner = BacktestRunner {
        optimizer: &optimizer,
        constraints: &pipeline.config().constraints,
        gamma: pipeline.config().gamma,
        n_cpus: 2,
    };

    // One job per year, as the cluster would run them.
    let covered = years(&checkpoint).unwrap();
    assert_eq!(covered, vec![2023, 2024]);
    for year in covered {
        let mut weights = runner.run(&filter_year(&checkpoint, year).unwrap()).unwrap();
        write_parquet(&mut weights, year_path(dir.path(), year)).unwrap();
    }

    let weights = read_weights_dir(dir.path()).unwrap();
    assert_eq!(weights.height(), checkpoint.height());

    // Zero investment and zero beta hold on every date.
    let beta: HashMap<String, f64> = frame::str_values(&checkpoint, "barrid")
        .unwrap()
        .into_iter()
        .zip(frame::f64_values(&checkpoint, "predicted_beta").unwrap())
        .map(|(id, b)| (id.unwrap(), b.unwrap()))
        .collect();
    for section in weights.partition_by_stable(["date"], true).unwrap() {
        let ids = frame::str_values(&section, "barrid").unwrap();
        let w = frame::f64_values(&section, "weight").unwrap();
        let net: f64 = w.iter().map(|x| x.unwrap()).sum();
        let exposure: f64 = ids
            .iter()
            .zip(&w)
            .map(|(id, x)| x.unwrap() * beta[id.as_deref().unwrap()])
            .sum();
        assert_relative_eq!(net, 0.0, epsilon = 1e-9);
        assert_relative_eq!(exposure, 0.0, epsilon = 1e-9);
    }

    let report = performance_report(&weights, &panel, None, "mvo").unwrap();
    assert_eq!(report.summary.len(), 1);
    assert!(report.summary[0].n_obs > 0);
}
