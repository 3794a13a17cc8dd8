//! Experiment configuration.
//!
//! An experiment is a value, not a script: the signal definition, filter
//! thresholds, alpha mapping, quantile settings, constraint set and risk
//! aversion all live in one [`ExperimentConfig`], loadable from JSON.

use reverso_alpha::{AlphaConfig, UniverseFilterConfig};
use reverso_eval::QuantileConfig;
use reverso_signals::{Reversal, ReversalConfig, SmoothedReversal, SmoothedReversalConfig};
use reverso_traits::{Constraint, Date, ReversoError, Result, Signal};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Definition of the primary signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalSpec {
    /// Negated trailing sum of log total returns.
    Reversal {
        /// Window in trading days
        window: usize,
        /// Forward shift in periods
        shift: usize,
    },
    /// Negated exponentially weighted mean of specific returns.
    Smoothed {
        /// EWM span
        span: f64,
        /// Observations required before a value is emitted
        min_samples: usize,
        /// Forward shift in periods
        shift: usize,
    },
}

impl Default for SignalSpec {
    fn default() -> Self {
        let config = ReversalConfig::default();
        Self::Reversal {
            window: config.window,
            shift: config.shift,
        }
    }
}

impl SignalSpec {
    /// Builds the signal, writing to column `name`.
    #[must_use]
    pub fn build(&self, name: &str) -> Box<dyn Signal> {
        match *self {
            Self::Reversal { window, shift } => {
                Box::new(Reversal::named(name, ReversalConfig { window, shift }))
            }
            Self::Smoothed {
                span,
                min_samples,
                shift,
            } => Box::new(SmoothedReversal::named(
                name,
                SmoothedReversalConfig {
                    span,
                    min_samples,
                    shift,
                },
            )),
        }
    }

    fn validate(&self) -> Result<()> {
        match *self {
            Self::Reversal { window, .. } if window == 0 => {
                Err(ReversoError::Config("reversal window must be positive".into()))
            }
            Self::Smoothed {
                span, min_samples, ..
            } if span.is_nan() || span < 1.0 || min_samples == 0 => Err(ReversoError::Config(format!(
                "smoothed reversal needs span >= 1 and min_samples > 0, got {span} and {min_samples}"
            ))),
            _ => Ok(()),
        }
    }
}

/// One experiment, end to end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Signal column name, also used to key output paths
    pub name: String,

    /// Signal definition
    pub signal: SignalSpec,

    /// First date of the panel to load (inclusive)
    pub start: Option<Date>,

    /// Last date of the panel to load (inclusive)
    pub end: Option<Date>,

    /// Restrict the panel to universe members
    pub in_universe: bool,

    /// Universe filter thresholds
    pub filter: UniverseFilterConfig,

    /// Alpha mapping
    pub alpha: AlphaConfig,

    /// Quantile portfolio settings
    pub quantile: QuantileConfig,

    /// Optimizer constraint set
    pub constraints: Vec<Constraint>,

    /// Risk aversion
    pub gamma: f64,

    /// Worker threads for the optimizer
    pub n_cpus: usize,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            name: "reversal".to_string(),
            signal: SignalSpec::default(),
            start: None,
            end: None,
            in_universe: true,
            filter: UniverseFilterConfig::default(),
            alpha: AlphaConfig::default(),
            quantile: QuantileConfig::default(),
            constraints: vec![Constraint::ZeroBeta, Constraint::ZeroInvestment],
            gamma: 50.0,
            n_cpus: 8,
        }
    }
}

impl ExperimentConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ReversoError::Config(format!("invalid experiment config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    /// Checks the configuration for values no stage can work with.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ReversoError::Config("experiment name is empty".into()));
        }
        self.signal.validate()?;
        if let (Some(start), Some(end)) = (self.start, self.end)
            && start > end
        {
            return Err(ReversoError::Config(format!(
                "start {start} is after end {end}"
            )));
        }
        if !self.filter.price_floor.is_finite() {
            return Err(ReversoError::Config("price floor must be finite".into()));
        }
        self.alpha.winsorization.validate()?;
        if self.quantile.bins == 0 {
            return Err(ReversoError::Config("quantile bins must be positive".into()));
        }
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(ReversoError::Config(format!(
                "gamma must be positive, got {}",
                self.gamma
            )));
        }
        if self.n_cpus == 0 {
            return Err(ReversoError::Config("n_cpus must be positive".into()));
        }
        Ok(())
    }
}
