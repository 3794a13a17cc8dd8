//! Rolling log-return reversal.

use polars::prelude::*;
use reverso_traits::{Panel, ReversoError, Result, Signal, columns, frame};
use serde::{Deserialize, Serialize};

/// Configuration for the rolling reversal signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReversalConfig {
    /// Trailing window in trading days (default: 21 days ≈ 1 month)
    pub window: usize,
    /// Periods to shift forward after computing (default: 1)
    pub shift: usize,
}

impl Default for ReversalConfig {
    fn default() -> Self {
        Self {
            window: 21,
            shift: 1,
        }
    }
}

/// Rolling reversal signal.
///
/// `reversal[t] = -Σ ln(1 + r[t - shift - k])` for `k in 0..window`,
/// computed within each security. Positive values mark recent losers.
///
/// # Example
///
/// ```ignore
/// use reverso_signals::reversal::Reversal;
///
/// let signal = Reversal::default();
/// let panel = signal.compute(&panel)?;
/// ```
#[derive(Debug, Clone)]
pub struct Reversal {
    config: ReversalConfig,
    name: String,
}

impl Reversal {
    /// Create a new reversal signal with the given configuration.
    #[must_use]
    pub fn new(config: ReversalConfig) -> Self {
        Self::named("reversal", config)
    }

    /// Create a reversal signal writing to a custom column name.
    #[must_use]
    pub fn named(name: impl Into<String>, config: ReversalConfig) -> Self {
        Self {
            config,
            name: name.into(),
        }
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &ReversalConfig {
        &self.config
    }

    /// The signal as a per-security expression.
    ///
    /// Must be evaluated over rows sorted by security and date, as
    /// [`frame::with_security_columns`] does.
    #[must_use]
    pub fn expr(&self) -> Expr {
        let window = RollingOptionsFixedWindow {
            window_size: self.config.window,
            min_periods: self.config.window,
            ..Default::default()
        };
        (col(columns::RETURN).log1p().rolling_sum(window) * lit(-1.0))
            .shift(lit(self.config.shift as i64))
            .over([col(columns::BARRID)])
            .alias(self.name.as_str())
    }
}

impl Default for Reversal {
    fn default() -> Self {
        Self::new(ReversalConfig::default())
    }
}

impl Signal for Reversal {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, panel: &Panel) -> Result<Panel> {
        panel.require_columns(self.required_columns())?;
        if self.config.window == 0 {
            return Err(ReversoError::SignalComputation(format!(
                "{}: window must be positive",
                self.name
            )));
        }
        let out = frame::with_security_columns(panel.data(), vec![self.expr()])?;
        let values = out.column(self.name.as_str())?.as_materialized_series().clone();
        tracing::debug!(
            signal = %self.name,
            rows = values.len(),
            valid = values.len() - values.null_count(),
            "computed reversal"
        );
        panel.clone().with_derived(values)
    }

    fn lookback(&self) -> usize {
        self.config.window + self.config.shift
    }

    fn required_columns(&self) -> &[&str] {
        &[columns::BARRID, columns::DATE, columns::RETURN]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Days, NaiveDate};

    fn panel(days: usize) -> Panel {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut ids = Vec::new();
        let mut dates = Vec::new();
        let mut returns = Vec::new();
        for id in ["A", "B", "C"] {
            for d in 0..days {
                ids.push(id);
                dates.push(Some(start.checked_add_days(Days::new(d as u64)).unwrap()));
                returns.push(0.001 * (d as f64 + 1.0) * if id == "B" { -1.0 } else { 1.0 });
            }
        }
        let mut df = df! {
            "barrid" => ids,
            "return" => returns,
        }
        .unwrap();
        df.with_column(frame::date_series("date", &dates).unwrap())
            .unwrap();
        Panel::new(df)
    }

    #[test]
    fn test_default_config() {
        let config = ReversalConfig::default();
        assert_eq!(config.window, 21);
        assert_eq!(config.shift, 1);
        assert_eq!(Reversal::default().lookback(), 22);
    }

    #[test]
    fn test_insufficient_history_is_all_null() {
        let out = Reversal::default().compute(&panel(5)).unwrap();
        let values = frame::f64_values(out.data(), "reversal").unwrap();
        assert_eq!(values.len(), 15);
        assert!(values.iter().all(Option::is_none));
    }

    #[test]
    fn test_value_at_window_boundary() {
        let out = Reversal::default().compute(&panel(22)).unwrap();
        let values = frame::f64_values(out.data(), "reversal").unwrap();

        // Security A occupies rows 0..22; only the last row has full history.
        assert!(values[..21].iter().all(Option::is_none));
        let expected: f64 = -(0..21).map(|d| (0.001 * (d as f64 + 1.0)).ln_1p()).sum::<f64>();
        assert_relative_eq!(values[21].unwrap(), expected, epsilon = 1e-12);

        // Security B mirrors A with negative returns.
        let expected_b: f64 = -(0..21).map(|d| (-0.001 * (d as f64 + 1.0)).ln_1p()).sum::<f64>();
        assert_relative_eq!(values[43].unwrap(), expected_b, epsilon = 1e-12);
    }

    #[test]
    fn test_unshifted() {
        let signal = Reversal::new(ReversalConfig {
            window: 2,
            shift: 0,
        });
        let out = signal.compute(&panel(3)).unwrap();
        let values = frame::f64_values(out.data(), "reversal").unwrap();
        assert_eq!(values[0], None);
        assert_relative_eq!(values[1].unwrap(), -(0.001_f64.ln_1p() + 0.002_f64.ln_1p()));
    }

    #[test]
    fn test_custom_name() {
        let signal = Reversal::named("reversal_63", ReversalConfig { window: 63, ..Default::default() });
        assert_eq!(signal.name(), "reversal_63");
        assert_eq!(signal.lookback(), 64);
    }

    #[test]
    fn test_zero_window_rejected() {
        let signal = Reversal::new(ReversalConfig { window: 0, shift: 1 });
        assert!(matches!(
            signal.compute(&panel(3)),
            Err(ReversoError::SignalComputation(_))
        ));
    }

    #[test]
    fn test_rows_out_of_order() {
        // Same panel, reversed row order: each row keeps its own value.
        let sorted = Reversal::default().compute(&panel(25)).unwrap();
        let reversed_df = panel(25).into_inner().reverse();
        let reversed = Reversal::default().compute(&Panel::new(reversed_df)).unwrap();

        let mut expected = frame::f64_values(sorted.data(), "reversal").unwrap();
        expected.reverse();
        assert_eq!(frame::f64_values(reversed.data(), "reversal").unwrap(), expected);
    }

    #[test]
    fn test_missing_return_column() {
        let panel = Panel::new(df! { "barrid" => &["A"] }.unwrap());
        assert!(Reversal::default().compute(&panel).is_err());
    }
}
