//! Time-series z-score of log dollar volume.

use polars::prelude::*;
use reverso_traits::{Panel, ReversoError, Result, Signal, columns, frame};
use serde::{Deserialize, Serialize};

/// Configuration for the dollar-volume score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DollarVolumeScoreConfig {
    /// Trailing window in trading days (default: 252)
    pub window: usize,
    /// Floor applied to the trailing standard deviation (default: 1e-4)
    pub min_std: f64,
}

impl Default for DollarVolumeScoreConfig {
    fn default() -> Self {
        Self {
            window: 252,
            min_std: 1e-4,
        }
    }
}

/// Dollar-volume score.
///
/// With `dv = ln(1 + volume × price)`, computes per security
/// `(dv - rolling_mean(dv)) / max(rolling_std(dv), min_std)` over the
/// trailing window. The mean needs one observation and the standard
/// deviation two; a missing standard deviation (the first day) counts as
/// 1.0 and any remaining null score becomes 0.0, so the score itself is
/// never a warm-up null.
#[derive(Debug, Clone, Default)]
pub struct DollarVolumeScore {
    config: DollarVolumeScoreConfig,
}

impl DollarVolumeScore {
    /// Create a new dollar-volume score with the given configuration.
    #[must_use]
    pub const fn new(config: DollarVolumeScoreConfig) -> Self {
        Self { config }
    }

    /// The score as a per-security expression over rows sorted by
    /// security and date.
    #[must_use]
    pub fn expr(&self) -> Expr {
        let window = self.config.window;
        let dollar_volume = (col(columns::DAILY_VOLUME) * col(columns::PRICE)).log1p();
        let mean = dollar_volume
            .clone()
            .rolling_mean(RollingOptionsFixedWindow {
                window_size: window,
                min_periods: 1,
                ..Default::default()
            })
            .over([col(columns::BARRID)]);
        let std = dollar_volume
            .clone()
            .rolling_std(RollingOptionsFixedWindow {
                window_size: window,
                min_periods: 2,
                ..Default::default()
            })
            .over([col(columns::BARRID)])
            .fill_null(lit(1.0));
        let floored = when(std.clone().lt(lit(self.config.min_std)))
            .then(lit(self.config.min_std))
            .otherwise(std);

        ((dollar_volume - mean) / floored)
            .fill_null(lit(0.0))
            .alias(columns::VOLUME_SCORE)
    }
}

impl Signal for DollarVolumeScore {
    fn name(&self) -> &str {
        columns::VOLUME_SCORE
    }

    fn compute(&self, panel: &Panel) -> Result<Panel> {
        panel.require_columns(self.required_columns())?;
        if self.config.window == 0 {
            return Err(ReversoError::SignalComputation(
                "volume score window must be positive".to_string(),
            ));
        }
        let out = frame::with_security_columns(panel.data(), vec![self.expr()])?;
        let values = out.column(self.name())?.as_materialized_series().clone();
        tracing::debug!(rows = values.len(), window = self.config.window, "computed volume score");
        panel.clone().with_derived(values)
    }

    fn lookback(&self) -> usize {
        self.config.window
    }

    fn required_columns(&self) -> &[&str] {
        &[
            columns::BARRID,
            columns::DATE,
            columns::PRICE,
            columns::DAILY_VOLUME,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Days, NaiveDate};

    fn panel(volumes: &[f64]) -> Panel {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates: Vec<Option<NaiveDate>> = (0..volumes.len())
            .map(|d| start.checked_add_days(Days::new(d as u64)))
            .collect();
        let mut df = df! {
            "barrid" => vec!["A"; volumes.len()],
            "price" => vec![10.0; volumes.len()],
            "daily_volume" => volumes.to_vec(),
        }
        .unwrap();
        df.with_column(frame::date_series("date", &dates).unwrap())
            .unwrap();
        Panel::new(df)
    }

    #[test]
    fn test_first_day_is_zero() {
        let out = DollarVolumeScore::default()
            .compute(&panel(&[1000.0, 2000.0]))
            .unwrap();
        let values = frame::f64_values(out.data(), "volume_score").unwrap();
        assert_relative_eq!(values[0].unwrap(), 0.0);
    }

    #[test]
    fn test_lookback_is_window() {
        assert_eq!(DollarVolumeScore::default().lookback(), 252);
    }

    #[test]
    fn test_spike_scores_high() {
        let mut volumes = vec![1000.0, 1100.0, 900.0, 1050.0, 950.0, 1000.0, 1020.0, 980.0];
        volumes.push(1_000_000.0);
        let out = DollarVolumeScore::default().compute(&panel(&volumes)).unwrap();
        let values = frame::f64_values(out.data(), "volume_score").unwrap();
        assert!(values.last().unwrap().unwrap() > 2.0);
    }

    #[test]
    fn test_matches_manual_computation() {
        let volumes = [100.0, 300.0, 200.0];
        let out = DollarVolumeScore::default().compute(&panel(&volumes)).unwrap();
        let values = frame::f64_values(out.data(), "volume_score").unwrap();

        let dv: Vec<f64> = volumes.iter().map(|v| (v * 10.0_f64).ln_1p()).collect();
        let mean = dv.iter().sum::<f64>() / 3.0;
        let std = (dv.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / 2.0).sqrt();
        assert_relative_eq!(values[2].unwrap(), (dv[2] - mean) / std, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_volume_is_zero() {
        let mut df = df! {
            "barrid" => &["A", "A"],
            "price" => &[10.0, 10.0],
            "daily_volume" => &[Some(100.0), None],
        }
        .unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        df.with_column(
            frame::date_series("date", &[Some(start), start.checked_add_days(Days::new(1))]).unwrap(),
        )
        .unwrap();
        let out = DollarVolumeScore::default().compute(&Panel::new(df)).unwrap();
        let values = frame::f64_values(out.data(), "volume_score").unwrap();
        assert_eq!(values[1], Some(0.0));
    }
}
