//! Portfolio report command implementation.

use super::banner;
use anyhow::{Context, Result};
use polars::prelude::*;
use reverso::eval::{ACTIVE_WEIGHT, PCT_CHANGE_BMK, active_risk, active_weights};
use reverso::io::{read_csv, read_parquet, read_weights_dir, write_csv};
use reverso::report::{regression_table, summary_table, write_performance_report};
use reverso::traits::frame;
use reverso::{Panel, PanelQuery, columns, performance_report, read_panel};
use std::path::Path;

/// Joins weights to next-day returns, writes the report files and prints
/// the summary, regression and active-weight tables.
pub(crate) fn run_report(
    weights_dir: &Path,
    panel: &Path,
    factors: Option<&Path>,
    benchmark: Option<&Path>,
    name: &str,
    output_dir: &Path,
) -> Result<()> {
    banner("Portfolio Report");

    let weights = read_weights_dir(weights_dir)?;
    let query = PanelQuery {
        columns: Some(vec![
            columns::RETURN.to_string(),
            columns::SPECIFIC_RISK.to_string(),
        ]),
        percent_to_decimal: true,
        ..PanelQuery::default()
    };
    let panel = read_panel(panel, &query)?;
    let factors = factors
        .map(|path| read_csv(path).with_context(|| format!("reading {}", path.display())))
        .transpose()?;

    println!("Weights:  {} rows", weights.height());
    println!("Panel:    {} rows", panel.len());
    println!();

    let report = performance_report(&weights, &panel, factors.as_ref(), name)?;
    write_performance_report(&report, output_dir)?;
    print!("{}", summary_table("Portfolio performance", &report.summary));
    println!();
    if let Some(regression) = &report.regression {
        println!("Factor regression");
        println!("{}", "-".repeat(72));
        print!("{}", regression_table(regression));
    }

    if let Some(path) = benchmark {
        let benchmark = read_parquet(path)?;
        let mut active = active_weights(&weights, &benchmark, None)?;
        write_csv(&mut active, output_dir.join("active_weights.csv"))?;
        print_active(&active, &panel)?;
    }

    println!("Results written to {}", output_dir.display());
    Ok(())
}

/// Prints the largest holdings and the active risk of the last date.
fn print_active(active: &DataFrame, panel: &Panel) -> Result<()> {
    let active = frame::with_date_column(active.clone())?;
    let risk = panel
        .data()
        .clone()
        .lazy()
        .select([col(columns::DATE), col(columns::BARRID), col(columns::SPECIFIC_RISK)]);
    let last = active
        .lazy()
        .filter(col(columns::DATE).eq(col(columns::DATE).max()))
        .join(
            risk,
            [col(columns::DATE), col(columns::BARRID)],
            [col(columns::DATE), col(columns::BARRID)],
            JoinArgs::new(JoinType::Left),
        )
        .sort(
            [columns::WEIGHT],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_nulls_last(true),
        )
        .collect()?;
    let Some(date) = frame::date_values(&last, columns::DATE)?.into_iter().flatten().next() else {
        return Ok(());
    };

    let ids = frame::str_values(&last, columns::BARRID)?;
    let weight = frame::f64_values(&last, columns::WEIGHT)?;
    let bmk = frame::f64_values(&last, columns::BMK_WEIGHT)?;
    let diff = frame::f64_values(&last, ACTIVE_WEIGHT)?;
    let pct = frame::f64_values(&last, PCT_CHANGE_BMK)?;
    let sigma = frame::f64_values(&last, columns::SPECIFIC_RISK)?;

    println!("Active weights on {date}");
    println!("{}", "-".repeat(72));
    println!(
        "{:<12} {:>12} {:>12} {:>12} {:>14}",
        "barrid", "weight", "benchmark", "active", "vs benchmark"
    );
    let pct_fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |x| format!("{:.2}%", x * 100.0));
    for r in 0..last.height().min(10) {
        println!(
            "{:<12} {:>12} {:>12} {:>12} {:>14}",
            ids[r].as_deref().unwrap_or("-"),
            pct_fmt(weight[r]),
            pct_fmt(bmk[r]),
            pct_fmt(diff[r]),
            pct_fmt(pct[r])
        );
    }

    println!();
    println!("Active risk: {:.2}%", active_risk(&diff, &sigma) * 100.0);
    println!();
    Ok(())
}
