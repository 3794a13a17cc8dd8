//! Universe filtering ahead of standardization.

use polars::prelude::*;
use reverso_traits::{Panel, ReversoError, Result, columns, frame};
use serde::{Deserialize, Serialize};

/// Configuration for the universe filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseFilterConfig {
    /// Minimum lagged price; rows at or below it are dropped (default: 5.0)
    pub price_floor: f64,

    /// Fields that must be non-null for a row to survive, besides the signal
    pub required: Vec<String>,
}

impl Default for UniverseFilterConfig {
    fn default() -> Self {
        Self {
            price_floor: 5.0,
            required: vec![
                columns::SPECIFIC_RISK.to_string(),
                columns::PREDICTED_BETA.to_string(),
            ],
        }
    }
}

/// Drops untradable rows and rows lacking the inputs later stages need.
///
/// A row survives when its same-security price from the previous period is
/// strictly above the floor, its signal value is present and finite, and
/// every required field is non-null. The first record of each security has
/// no lagged price and is always dropped. Surviving rows keep their order,
/// and the lagged price is appended as `price_lag`.
#[derive(Debug, Clone, Default)]
pub struct UniverseFilter {
    config: UniverseFilterConfig,
}

impl UniverseFilter {
    /// Create a new filter with the given configuration.
    #[must_use]
    pub const fn new(config: UniverseFilterConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &UniverseFilterConfig {
        &self.config
    }

    /// Applies the filter to `panel`, keyed on `signal`.
    pub fn apply(&self, panel: &Panel, signal: &str) -> Result<Panel> {
        let mut needed = vec![columns::BARRID, columns::DATE, columns::PRICE, signal];
        needed.extend(self.config.required.iter().map(String::as_str));
        panel.require_columns(&needed)?;

        if panel.has_column(columns::PRICE_LAG) {
            return Err(ReversoError::InvalidData(format!(
                "column '{}' already exists",
                columns::PRICE_LAG
            )));
        }

        let keep = self.config.required.iter().fold(
            col(columns::PRICE_LAG)
                .gt(lit(self.config.price_floor))
                .and(col(signal).is_not_null())
                .and(col(signal).is_finite()),
            |keep, name| keep.and(col(name.as_str()).is_not_null()),
        );
        let lagged = frame::with_security_columns(
            panel.data(),
            vec![
                col(columns::PRICE)
                    .shift(lit(1))
                    .over([col(columns::BARRID)])
                    .alias(columns::PRICE_LAG),
            ],
        )?;
        let filtered = Panel::new(lagged.lazy().filter(keep).collect()?);

        tracing::debug!(
            signal,
            before = panel.len(),
            after = filtered.len(),
            "applied universe filter"
        );
        Ok(filtered)
    }
}
