//! Portfolio optimizer capability.
//!
//! The mean-variance solver is an external collaborator. This module fixes
//! its interface: a per-date problem of ids, alphas, a covariance matrix,
//! a named constraint set, a risk-aversion `gamma` and optional betas in;
//! a weight vector aligned to the ids out. The structure implied by the
//! constraints is the optimizer's guarantee and is not re-verified here.

use crate::{ReversoError, Result, SecurityId};
use derive_more::Display;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Named portfolio constraints understood by optimizers.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Weights sum to one.
    #[display("full_investment")]
    FullInvestment,
    /// No negative weights.
    #[display("long_only")]
    LongOnly,
    /// Gross long exposure at most one.
    #[display("no_buying_on_margin")]
    NoBuyingOnMargin,
    /// Portfolio beta equals one.
    #[display("unit_beta")]
    UnitBeta,
    /// Portfolio beta equals zero.
    #[display("zero_beta")]
    ZeroBeta,
    /// Weights sum to zero.
    #[display("zero_investment")]
    ZeroInvestment,
}

impl Constraint {
    /// Whether the constraint references security betas.
    pub const fn needs_betas(&self) -> bool {
        matches!(self, Self::UnitBeta | Self::ZeroBeta)
    }
}

impl std::str::FromStr for Constraint {
    type Err = ReversoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "full_investment" => Ok(Self::FullInvestment),
            "long_only" => Ok(Self::LongOnly),
            "no_buying_on_margin" => Ok(Self::NoBuyingOnMargin),
            "unit_beta" => Ok(Self::UnitBeta),
            "zero_beta" => Ok(Self::ZeroBeta),
            "zero_investment" => Ok(Self::ZeroInvestment),
            other => Err(ReversoError::Config(format!("unknown constraint '{other}'"))),
        }
    }
}

/// One cross-section handed to an optimizer.
#[derive(Debug, Clone)]
pub struct OptimizationProblem<'a> {
    /// Security ids; every vector and the covariance are aligned to these.
    pub ids: &'a [SecurityId],
    /// Alpha forecasts.
    pub alphas: &'a Array1<f64>,
    /// Covariance matrix (n x n).
    pub covariance: &'a Array2<f64>,
    /// Constraint set.
    pub constraints: &'a [Constraint],
    /// Risk aversion.
    pub gamma: f64,
    /// Predicted betas, required by beta constraints.
    pub betas: Option<&'a Array1<f64>>,
}

impl OptimizationProblem<'_> {
    /// Checks dimensions, gamma and beta availability.
    pub fn validate(&self) -> Result<()> {
        let n = self.ids.len();
        if n == 0 {
            return Err(ReversoError::Optimization("empty universe".to_string()));
        }
        if self.alphas.len() != n {
            return Err(ReversoError::Optimization(format!(
                "{} alphas for {n} ids",
                self.alphas.len()
            )));
        }
        if self.covariance.dim() != (n, n) {
            return Err(ReversoError::Optimization(format!(
                "covariance is {:?}, expected ({n}, {n})",
                self.covariance.dim()
            )));
        }
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(ReversoError::Optimization(format!(
                "gamma must be positive, got {}",
                self.gamma
            )));
        }
        match self.betas {
            Some(betas) if betas.len() != n => Err(ReversoError::Optimization(format!(
                "{} betas for {n} ids",
                betas.len()
            ))),
            None if self.constraints.iter().any(Constraint::needs_betas) => Err(
                ReversoError::Optimization("beta constraint without betas".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

/// A mean-variance optimizer.
pub trait Optimizer: Send + Sync {
    /// Name of the optimizer, for logging.
    fn name(&self) -> &str;

    /// Returns weights aligned to `problem.ids`.
    fn optimize(&self, problem: &OptimizationProblem<'_>) -> Result<Array1<f64>>;
}
