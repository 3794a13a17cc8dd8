//! Quantile portfolio command implementation.

use super::{banner, load_config};
use anyhow::Result;
use reverso::report::{summary_table, write_quantile_report};
use reverso::{PanelQuery, Pipeline, read_panel};
use std::path::Path;

/// Buckets the filtered signal, writes bucket returns and prints their
/// summaries.
pub(crate) fn run_quantile(panel: &Path, config: Option<&Path>, output_dir: &Path) -> Result<()> {
    banner("Quantile Portfolios");

    let config = load_config(config)?;
    println!("Signal:   {}", config.name);
    println!("Buckets:  {}", config.quantile.bins);
    println!();

    let panel = read_panel(panel, &PanelQuery::from_config(&config))?;
    let pipeline = Pipeline::new(config)?;
    let report = pipeline.quantile(&panel)?;
    write_quantile_report(&report, pipeline.signal_name(), output_dir)?;

    print!(
        "{}",
        summary_table(
            &format!("Quantile portfolios for {}", pipeline.signal_name()),
            &report.summary
        )
    );
    println!();
    println!("Results written to {}", output_dir.display());

    Ok(())
}
