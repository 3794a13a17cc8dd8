//! CLI subcommand modules.
//!
//! This module contains the implementations for all reverso CLI subcommands.

pub(crate) mod alphas;
pub(crate) mod mvo;
pub(crate) mod quantile;
pub(crate) mod report;
pub(crate) mod signals;
pub(crate) mod submit;

use anyhow::Result;
use reverso::ExperimentConfig;
use std::path::Path;

/// Prints a boxed section header.
pub(crate) fn banner(title: &str) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║{:^62}║", title);
    println!("╚══════════════════════════════════════════════════════════════╝\n");
}

/// Loads the experiment configuration, or the defaults without a path.
pub(crate) fn load_config(path: Option<&Path>) -> Result<ExperimentConfig> {
    Ok(match path {
        Some(path) => ExperimentConfig::from_path(path)?,
        None => ExperimentConfig::default(),
    })
}
