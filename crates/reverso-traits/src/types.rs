//! Common types used throughout the Reverso pipeline.
//!
//! This module defines the panel container, the column vocabulary shared by
//! every stage, and the temporal and identifier aliases.

use crate::{ReversoError, Result};
use polars::prelude::*;

// Re-export date type from chrono
pub use chrono::NaiveDate as Date;

/// A stable security identifier (the Barra id).
pub type SecurityId = String;

/// Column names of the panel schema and of the derived stage outputs.
pub mod columns {
    /// Trading date.
    pub const DATE: &str = "date";
    /// Stable security identifier.
    pub const BARRID: &str = "barrid";
    /// Display ticker.
    pub const TICKER: &str = "ticker";
    /// Closing price.
    pub const PRICE: &str = "price";
    /// Total daily return.
    pub const RETURN: &str = "return";
    /// Idiosyncratic daily return.
    pub const SPECIFIC_RETURN: &str = "specific_return";
    /// Idiosyncratic volatility.
    pub const SPECIFIC_RISK: &str = "specific_risk";
    /// Predicted beta to the market.
    pub const PREDICTED_BETA: &str = "predicted_beta";
    /// Daily share volume.
    pub const DAILY_VOLUME: &str = "daily_volume";
    /// Universe membership flag.
    pub const IN_UNIVERSE: &str = "in_universe";

    /// Price observed one period earlier for the same security.
    pub const PRICE_LAG: &str = "price_lag";
    /// Cross-sectional z-score of a signal.
    pub const SCORE: &str = "score";
    /// Dollar-volume z-score.
    pub const VOLUME_SCORE: &str = "volume_score";
    /// Expected-return forecast.
    pub const ALPHA: &str = "alpha";
    /// Portfolio weight.
    pub const WEIGHT: &str = "weight";
    /// Benchmark weight.
    pub const BMK_WEIGHT: &str = "bmk_weight";
    /// Return observed one period after the record's date.
    pub const FORWARD_RETURN: &str = "forward_return";
    /// Quantile bucket index.
    pub const BIN: &str = "bin";
    /// Portfolio label of a return series (bucket, spread or signal name).
    pub const PORTFOLIO: &str = "portfolio";
    /// Cumulative log return.
    pub const CUM_LOG_RETURN: &str = "cum_log_return";
}

/// Container for panel data keyed by (date, security-id).
///
/// `Panel` wraps a Polars DataFrame with one row per (date, barrid) pair.
/// Source fields are never rewritten: stages append derived columns through
/// [`Panel::with_derived`], which refuses to overwrite an existing column.
///
/// # Example
///
/// ```no_run
/// use reverso_traits::Panel;
/// use polars::prelude::*;
///
/// let df = df! {
///     "barrid" => &["USA0001", "USA0002"],
///     "price" => &[10.0, 20.0],
/// }.unwrap();
///
/// let panel = Panel::new(df);
/// assert_eq!(panel.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Panel {
    data: DataFrame,
}

impl Panel {
    /// Creates a new `Panel` from a DataFrame.
    pub const fn new(data: DataFrame) -> Self {
        Self { data }
    }

    /// Returns a reference to the underlying DataFrame.
    pub const fn data(&self) -> &DataFrame {
        &self.data
    }

    /// Consumes self and returns the underlying DataFrame.
    pub fn into_inner(self) -> DataFrame {
        self.data
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.data.height()
    }

    /// Returns whether the panel has no rows.
    pub fn is_empty(&self) -> bool {
        self.data.height() == 0
    }

    /// Returns the column names.
    pub fn columns(&self) -> Vec<String> {
        self.data
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Checks if a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.data
            .get_column_names()
            .iter()
            .any(|s| s.as_str() == name)
    }

    /// Fails with [`ReversoError::MissingColumn`] for the first absent column.
    pub fn require_columns(&self, names: &[&str]) -> Result<()> {
        match names.iter().find(|name| !self.has_column(name)) {
            Some(name) => Err(ReversoError::MissingColumn((*name).to_string())),
            None => Ok(()),
        }
    }

    /// Appends a derived column, returning the extended panel.
    ///
    /// # Errors
    ///
    /// Returns [`ReversoError::InvalidData`] if a column with the same name
    /// already exists or the length does not match the panel height.
    pub fn with_derived(mut self, series: Series) -> Result<Self> {
        if self.has_column(series.name().as_str()) {
            return Err(ReversoError::InvalidData(format!(
                "column '{}' already exists",
                series.name()
            )));
        }
        if series.len() != self.data.height() {
            return Err(ReversoError::InvalidData(format!(
                "column '{}' has {} rows, panel has {}",
                series.name(),
                series.len(),
                self.data.height()
            )));
        }
        self.data.with_column(series)?;
        Ok(self)
    }

    /// Keeps the rows where `mask` is true, preserving their order.
    pub fn filter(&self, mask: &BooleanChunked) -> Result<Self> {
        Ok(Self::new(self.data.filter(mask)?))
    }

    /// Projects the panel onto the given columns.
    pub fn select(&self, names: &[&str]) -> Result<Self> {
        self.require_columns(names)?;
        Ok(Self::new(self.data.select(names.iter().copied())?))
    }
}

impl From<DataFrame> for Panel {
    fn from(data: DataFrame) -> Self {
        Self::new(data)
    }
}

impl AsRef<DataFrame> for Panel {
    fn as_ref(&self) -> &DataFrame {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Panel {
        Panel::new(
            df! {
                "barrid" => &["A", "B", "C"],
                "price" => &[10.0, 20.0, 30.0],
            }
            .unwrap(),
        )
    }

    #[test]
    fn test_panel_basics() {
        let panel = sample();
        assert_eq!(panel.len(), 3);
        assert!(!panel.is_empty());
        assert!(panel.has_column("price"));
        assert!(!panel.has_column("volume"));
        assert_eq!(panel.columns(), vec!["barrid".to_string(), "price".to_string()]);
    }

    #[test]
    fn test_require_columns() {
        let panel = sample();
        assert!(panel.require_columns(&["barrid", "price"]).is_ok());
        let err = panel.require_columns(&["barrid", "specific_risk"]).unwrap_err();
        assert!(matches!(err, ReversoError::MissingColumn(c) if c == "specific_risk"));
    }

    #[test]
    fn test_with_derived_appends() {
        let panel = sample()
            .with_derived(Series::new("signal".into(), &[1.0, 2.0, 3.0]))
            .unwrap();
        assert!(panel.has_column("signal"));
        assert_eq!(panel.columns().len(), 3);
    }

    #[test]
    fn test_with_derived_rejects_overwrite() {
        let result = sample().with_derived(Series::new("price".into(), &[0.0, 0.0, 0.0]));
        assert!(matches!(result, Err(ReversoError::InvalidData(_))));
    }

    #[test]
    fn test_with_derived_rejects_length_mismatch() {
        let result = sample().with_derived(Series::new("signal".into(), &[1.0]));
        assert!(result.is_err());
    }

    #[test]
    fn test_select() {
        let panel = sample().select(&["price"]).unwrap();
        assert_eq!(panel.columns(), vec!["price".to_string()]);
        assert!(sample().select(&["missing"]).is_err());
    }
}
