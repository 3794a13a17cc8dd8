//! Portfolio construction and performance reporting for reverso.
//!
//! This crate covers everything downstream of the alpha:
//! - Equal-weight quantile portfolios and their long-short spread
//! - Forward returns, weight-dot-return portfolio returns and cumulative
//!   log returns
//! - Annualized summaries (mean, volatility, Sharpe, drawdown)
//! - OLS factor regressions
//! - Active weights against a benchmark
//!
//! # Example
//!
//! ```rust,ignore
//! use reverso_eval::{QuantileConfig, QuantilePortfolios, cumulative_log_returns, summarize};
//!
//! let builder = QuantilePortfolios::new(QuantileConfig::default());
//! let binned = builder.assign(&alphas, "alpha")?;
//! let returns = builder.returns(&binned)?;
//! let cumulative = cumulative_log_returns(&returns, Some("portfolio"), "return")?;
//! let summary = summarize(&returns, Some("portfolio"), "return", 252)?;
//! ```

pub mod quantile;
pub mod regression;
pub mod returns;
pub mod summary;
pub mod weights;

// Re-export main types
pub use quantile::{QuantileConfig, QuantilePortfolios, SPREAD, SpreadMethod, bin_expr};
pub use regression::{DEFAULT_FACTORS, OlsResult, factor_regression, ols, regression_frame};
pub use returns::{cumulative_log_returns, forward_returns, portfolio_returns};
pub use summary::{PERIODS_PER_YEAR, PerformanceSummary, max_drawdown, summarize, summary_frame};
pub use weights::{ACTIVE_WEIGHT, PCT_CHANGE_BMK, active_risk, active_weights};
