//! Signal trait for deriving per-security time-series signals.
//!
//! A signal maps each security's history of a base field to one derived
//! value per (date, security). Values inside the warm-up window are null
//! and must be filtered downstream, never read as zero.

use crate::{Panel, Result};

/// A time-series signal computed independently per security.
///
/// Implementations append exactly one column, named [`Signal::name`], to
/// the panel and leave every other column untouched.
///
/// # Example
///
/// ```no_run
/// use reverso_traits::{Panel, Result, Signal};
/// use polars::prelude::*;
///
/// struct Constant;
///
/// impl Signal for Constant {
///     fn name(&self) -> &str {
///         "constant"
///     }
///
///     fn compute(&self, panel: &Panel) -> Result<Panel> {
///         let values = vec![1.0; panel.len()];
///         panel.clone().with_derived(Series::new(self.name().into(), values))
///     }
///
///     fn lookback(&self) -> usize {
///         0
///     }
///
///     fn required_columns(&self) -> &[&str] {
///         &[]
///     }
/// }
/// ```
pub trait Signal: Send + Sync {
    /// Returns the name of this signal, also used as its output column.
    fn name(&self) -> &str;

    /// Computes the signal and returns the panel with the signal column
    /// appended.
    ///
    /// # Errors
    ///
    /// Returns an error if required columns are missing, the panel keys
    /// are malformed, or the output column already exists.
    fn compute(&self, panel: &Panel) -> Result<Panel>;

    /// Rows of same-security history the signal draws on before its values
    /// are fully formed (window or minimum sample count, plus any shift).
    fn lookback(&self) -> usize;

    /// Returns the required data columns for this signal.
    fn required_columns(&self) -> &[&str];
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    struct TestSignal {
        name: String,
        lookback: usize,
    }

    impl Signal for TestSignal {
        fn name(&self) -> &str {
            &self.name
        }

        fn compute(&self, panel: &Panel) -> Result<Panel> {
            panel.require_columns(self.required_columns())?;
            let values: Vec<Option<f64>> = vec![None; panel.len()];
            panel
                .clone()
                .with_derived(Series::new(self.name().into(), values))
        }

        fn lookback(&self) -> usize {
            self.lookback
        }

        fn required_columns(&self) -> &[&str] {
            &["price"]
        }
    }

    #[test]
    fn test_signal_compute_appends_column() {
        let signal = TestSignal {
            name: "test_signal".to_string(),
            lookback: 21,
        };
        let panel = Panel::new(df! { "price" => &[1.0, 2.0] }.unwrap());
        let out = signal.compute(&panel).unwrap();
        assert!(out.has_column("test_signal"));
        assert_eq!(signal.lookback(), 21);
    }

    #[test]
    fn test_signal_missing_column() {
        let signal = TestSignal {
            name: "test".to_string(),
            lookback: 1,
        };
        let panel = Panel::new(df! { "volume" => &[1.0] }.unwrap());
        assert!(signal.compute(&panel).is_err());
    }

    #[test]
    fn test_signal_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Box<dyn Signal>>();
    }
}
