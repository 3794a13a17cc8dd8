//! Per-year optimizer command implementation.
//!
//! This is the entry point of each cluster array task.

use super::load_config;
use anyhow::{Result, bail};
use reverso::io::{read_parquet, write_parquet, year_path};
use reverso::optimize::filter_year;
use reverso::{BacktestRunner, DiagonalMeanVariance, Optimizer};
use std::path::Path;

/// Optimizes every date of `year` in the checkpoint and writes
/// `{output_dir}/{year}.parquet`.
pub(crate) fn run_mvo(
    data_path: &Path,
    gamma: f64,
    year: i32,
    output_dir: &Path,
    n_cpus: usize,
    config: Option<&Path>,
) -> Result<()> {
    let config = load_config(config)?;
    let alphas = filter_year(&read_parquet(data_path)?, year)?;
    if alphas.height() == 0 {
        bail!("no alphas for {year} in {}", data_path.display());
    }

    let optimizer = DiagonalMeanVariance::new();
    tracing::info!(
        year,
        gamma,
        n_cpus,
        rows = alphas.height(),
        optimizer = optimizer.name(),
        "optimizing"
    );
    let runner = BacktestRunner {
        optimizer: &optimizer,
        constraints: &config.constraints,
        gamma,
        n_cpus,
    };
    let mut weights = runner.run(&alphas)?;

    let path = year_path(output_dir, year);
    write_parquet(&mut weights, &path)?;
    tracing::info!(path = %path.display(), rows = weights.height(), "wrote weights");

    Ok(())
}
