#![doc(issue_tracker_base_url = "https://github.com/factordynamics/reverso/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # reverso
//!
//! Short-term reversal research for US equities.
//!
//! reverso is the umbrella crate: it re-exports the sub-crates and adds the
//! pieces that tie them into experiments, from reading the asset panel to
//! submitting per-year optimization jobs to a Slurm cluster.
//!
//! ## Quick Start
//!
//! ```ignore
//! use reverso::{ExperimentConfig, PanelQuery, Pipeline, read_panel};
//!
//! # fn main() -> reverso::Result<()> {
//! let config = ExperimentConfig::from_path("experiment.json")?;
//! let query = PanelQuery::from_config(&config);
//! let panel = read_panel("data/assets.parquet", &query)?;
//!
//! let pipeline = Pipeline::new(config)?;
//! let report = pipeline.quantile(&panel)?;
//! let alphas = pipeline.alphas(&panel)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Organization
//!
//! - [`traits`] - Panel, column names, [`Signal`] and [`Optimizer`]
//! - [`signals`] - Reversal and dollar-volume signals
//! - [`alpha`] - Universe filter, cross-sectional scores and alphas
//! - [`eval`] - Quantile portfolios, returns, summaries and regressions
//!
//! ## Workflow
//!
//! 1. **Signals** are computed per security over the date-sorted history
//! 2. **Filter** drops penny stocks and rows missing risk inputs
//! 3. **Alphas** map each date's z-scored signal to `score * IC * risk`
//! 4. **Quantile** portfolios test the signal before optimization
//! 5. **Backtests** solve one mean-variance problem per date, one job per year
//! 6. **Reports** summarize the resulting portfolio and regress it on factors

/// Version information for the reverso crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod batch;
pub mod config;
pub mod io;
pub mod optimize;
pub mod pipeline;
pub mod report;

pub use batch::{
    ClusterConfig, EMAIL_VAR, JobArray, PROJECT_ROOT_VAR, Sbatch, Scheduler, SchedulerResponse,
    SubmissionOutcome, submit_backtest,
};
pub use config::{ExperimentConfig, SignalSpec};
pub use io::{PanelQuery, read_panel};
pub use optimize::{BacktestRunner, DiagonalMeanVariance};
pub use pipeline::{CHECKPOINT_COLUMNS, Pipeline, QuantileReport};
pub use report::{PerformanceReport, performance_report};

// ============================================================================
// Sub-crates
// ============================================================================

/// Core types and trait definitions.
pub mod traits {
    pub use reverso_traits::*;
}

pub use reverso_traits::{
    Constraint, Date, Optimizer, Panel, Result, ReversoError, Signal, columns,
};

/// Signal implementations and the signal registry.
///
/// ```ignore
/// use reverso::signals::{SmoothedReversal, SmoothedReversalConfig};
/// use reverso::Signal;
///
/// let signal = SmoothedReversal::new(SmoothedReversalConfig::default());
/// let values = signal.compute(&panel)?;
/// ```
pub mod signals {
    pub use reverso_signals::*;
}

/// Universe filter, scoring and the alpha model.
pub mod alpha {
    pub use reverso_alpha::*;
}

/// Portfolio construction and performance evaluation.
///
/// - **Quantile portfolios**: equal-weight bins by signal and their spread
/// - **Returns**: forward returns and cumulative log returns
/// - **Summaries**: annualized mean, volatility, Sharpe and drawdown
/// - **Regression**: OLS of excess returns on factor returns
/// - **Active weights**: portfolio against benchmark
pub mod eval {
    pub use reverso_eval::*;
}

/// Commonly used types and traits.
///
/// ```ignore
/// use reverso::prelude::*;
/// ```
pub mod prelude {
    pub use crate::traits::*;
    pub use crate::{ExperimentConfig, Pipeline, SignalSpec};
}
