//! The signal-to-alpha-to-portfolio pipeline.

use crate::config::ExperimentConfig;
use polars::prelude::*;
use reverso_alpha::{AlphaModel, UniverseFilter};
use reverso_eval::{
    PERIODS_PER_YEAR, PerformanceSummary, QuantilePortfolios, cumulative_log_returns, summarize,
};
use reverso_signals::DollarVolumeScore;
use reverso_traits::{Panel, Result, Signal, columns};

/// Columns of the alpha checkpoint handed to the optimizer path.
pub const CHECKPOINT_COLUMNS: [&str; 5] = [
    columns::DATE,
    columns::BARRID,
    columns::ALPHA,
    columns::PREDICTED_BETA,
    columns::SPECIFIC_RISK,
];

/// Output of the quantile path.
#[derive(Debug, Clone)]
pub struct QuantileReport {
    /// Long-format bucket and spread returns with `cum_log_return`
    pub returns: DataFrame,
    /// One summary per bucket and for the spread
    pub summary: Vec<PerformanceSummary>,
}

/// One experiment's pipeline.
///
/// Stages run strictly in order, each consuming the full output of the
/// previous one: signal construction, universe filtering, scoring and
/// alpha mapping, then either quantile portfolios or the alpha checkpoint
/// for the optimizer.
///
/// # Example
///
/// ```ignore
/// use reverso::{ExperimentConfig, Pipeline};
///
/// let pipeline = Pipeline::new(ExperimentConfig::from_path("experiment.json")?)?;
/// let alphas = pipeline.alphas(&panel)?;
/// ```
pub struct Pipeline {
    config: ExperimentConfig,
    signal: Box<dyn Signal>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("signal", &self.signal.name())
            .finish()
    }
}

impl Pipeline {
    /// Validates `config` and builds its signal.
    pub fn new(config: ExperimentConfig) -> Result<Self> {
        config.validate()?;
        let signal = config.signal.build(&config.name);
        Ok(Self { config, signal })
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Name of the signal column.
    #[must_use]
    pub fn signal_name(&self) -> &str {
        self.signal.name()
    }

    /// Dates `panel` is short of `signal`'s lookback, zero when it covers it.
    pub fn history_shortfall(panel: &Panel, signal: &dyn Signal) -> Result<usize> {
        let dates = panel
            .data()
            .column(columns::DATE)?
            .as_materialized_series()
            .n_unique()?;
        Ok(signal.lookback().saturating_sub(dates))
    }

    fn warn_short_history(panel: &Panel, signal: &dyn Signal) -> Result<()> {
        let shortfall = Self::history_shortfall(panel, signal)?;
        if shortfall > 0 {
            tracing::warn!(
                signal = signal.name(),
                lookback = signal.lookback(),
                shortfall,
                "panel covers fewer dates than the signal lookback"
            );
        }
        Ok(())
    }

    /// Appends the signal column, and the volume score when the volume
    /// override is configured.
    ///
    /// Warns when the panel spans fewer dates than a signal's lookback;
    /// such a signal is null, or not yet fully formed, throughout.
    pub fn signals(&self, panel: &Panel) -> Result<Panel> {
        Self::warn_short_history(panel, self.signal.as_ref())?;
        let mut out = self.signal.compute(panel)?;
        if self.config.alpha.volume_override.is_some() && !out.has_column(columns::VOLUME_SCORE) {
            let volume = DollarVolumeScore::default();
            Self::warn_short_history(&out, &volume)?;
            out = volume.compute(&out)?;
        }
        tracing::info!(signal = self.signal.name(), rows = out.len(), "computed signals");
        Ok(out)
    }

    fn filter(&self, panel: &Panel) -> Result<Panel> {
        UniverseFilter::new(self.config.filter.clone()).apply(panel, self.signal_name())
    }

    /// Signal construction, filtering and alpha mapping.
    pub fn alphas(&self, panel: &Panel) -> Result<Panel> {
        let with_signals = self.signals(panel)?;
        let filtered = self.filter(&with_signals)?;
        tracing::info!(
            before = with_signals.len(),
            after = filtered.len(),
            "filtered universe"
        );
        let alphas =
            AlphaModel::new(self.config.alpha.clone()).apply(&filtered, self.signal_name())?;
        tracing::info!(rows = alphas.len(), "mapped alphas");
        Ok(alphas)
    }

    /// The optimizer's input: rows with an alpha, projected to
    /// [`CHECKPOINT_COLUMNS`].
    pub fn checkpoint(&self, alphas: &Panel) -> Result<DataFrame> {
        let projected = alphas.select(&CHECKPOINT_COLUMNS)?;
        let mask = projected
            .data()
            .column(columns::ALPHA)?
            .as_materialized_series()
            .is_not_null();
        Ok(projected.filter(&mask)?.into_inner())
    }

    /// The quantile path: buckets on the filtered signal, equal-weight
    /// returns, cumulative log returns and annualized summaries.
    pub fn quantile(&self, panel: &Panel) -> Result<QuantileReport> {
        let with_signals = self.signals(panel)?;
        let filtered = self.filter(&with_signals)?;

        let builder = QuantilePortfolios::new(self.config.quantile.clone());
        let binned = builder.assign(&filtered, self.signal_name())?;
        let returns = builder.returns(&binned)?;
        let returns = cumulative_log_returns(&returns, Some(columns::PORTFOLIO), columns::RETURN)?;
        let summary = summarize(
            &returns,
            Some(columns::PORTFOLIO),
            columns::RETURN,
            PERIODS_PER_YEAR,
        )?;

        tracing::info!(
            bins = self.config.quantile.bins,
            rows = returns.height(),
            "built quantile portfolios"
        );
        Ok(QuantileReport { returns, summary })
    }
}
