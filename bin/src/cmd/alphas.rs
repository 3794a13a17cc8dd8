//! Alpha checkpoint command implementation.

use super::{banner, load_config};
use anyhow::Result;
use reverso::io::write_parquet;
use reverso::{PanelQuery, Pipeline, read_panel};
use std::path::Path;

/// Runs signal construction, filtering and alpha mapping, then writes the
/// optimizer checkpoint.
pub(crate) fn compute_alphas(panel: &Path, config: Option<&Path>, output: &Path) -> Result<()> {
    banner("Alpha Construction");

    let config = load_config(config)?;
    println!("Signal:     {}", config.name);
    println!("IC:         {}", config.alpha.ic);
    println!("Price floor {}", config.filter.price_floor);
    println!();

    let panel = read_panel(panel, &PanelQuery::from_config(&config))?;
    let pipeline = Pipeline::new(config)?;
    let alphas = pipeline.alphas(&panel)?;
    let mut checkpoint = pipeline.checkpoint(&alphas)?;
    write_parquet(&mut checkpoint, output)?;

    println!("Panel rows:   {}", panel.len());
    println!("Alpha rows:   {}", checkpoint.height());
    println!("Checkpoint:   {}", output.display());
    println!();

    Ok(())
}
