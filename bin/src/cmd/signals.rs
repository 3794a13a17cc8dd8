//! Signal listing command implementation.

use super::banner;
use anyhow::Result;
use reverso::ReversoError;
use reverso::signals::registry::{SignalCategory, get_signal_info, signals_by_category};

/// List available signals, optionally filtered by category.
pub(crate) fn list_signals(category: Option<String>, verbose: bool) -> Result<()> {
    banner("Available Signals");

    let categories = [
        (SignalCategory::Reversal, "Reversal"),
        (SignalCategory::Volume, "Volume"),
    ];

    for (cat, cat_name) in categories {
        if let Some(ref filter) = category
            && !cat_name.to_lowercase().contains(&filter.to_lowercase())
        {
            continue;
        }

        let signals = signals_by_category(&cat);
        if signals.is_empty() {
            continue;
        }

        println!("{}: {}", cat_name, cat.description());
        println!("{}", "-".repeat(60));

        for info in signals {
            if verbose {
                println!(
                    "  {:16} - {} (lookback: {} days, from `{}`)",
                    info.name, info.description, info.typical_lookback, info.source_column
                );
            } else {
                println!("  {}", info.name);
            }
        }
        println!();
    }

    if !verbose {
        println!("Use --verbose for detailed signal descriptions.\n");
    }

    Ok(())
}

/// Show the metadata of one signal.
pub(crate) fn show_signal(name: &str) -> Result<()> {
    let info = get_signal_info(name).ok_or_else(|| ReversoError::SignalNotFound(name.to_string()))?;

    banner("Signal");
    println!("Name:      {}", info.name);
    println!("Category:  {:?}", info.category);
    println!("Source:    {}", info.source_column);
    println!("Lookback:  {} days", info.typical_lookback);
    println!();
    println!("{}", info.description);
    println!();

    Ok(())
}
