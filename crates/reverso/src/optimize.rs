//! Optimizer path: per-date mean-variance weights.

use ndarray::{Array1, Array2};
use polars::prelude::*;
use rayon::prelude::*;
use reverso_traits::{
    Constraint, Date, OptimizationProblem, Optimizer, ReversoError, Result, SecurityId, columns,
    frame, stats,
};

/// Closed-form mean-variance optimizer for a diagonal risk model.
///
/// Maximizes `αᵀw - (γ/2) wᵀDw` subject to the equality constraints in the
/// problem, where `D` is the diagonal of the covariance. The solution is
/// `w = D⁻¹(α - Aᵀλ) / γ` with `(A D⁻¹ Aᵀ) λ = A D⁻¹ α - γ b`, each
/// constraint contributing one row of `A w = b`. Off-diagonal covariance
/// terms are ignored.
///
/// Long-only and no-margin constraints are inequalities and are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagonalMeanVariance;

impl DiagonalMeanVariance {
    /// Create a new optimizer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Optimizer for DiagonalMeanVariance {
    fn name(&self) -> &str {
        "diagonal_mean_variance"
    }

    fn optimize(&self, problem: &OptimizationProblem<'_>) -> Result<Array1<f64>> {
        problem.validate()?;
        let n = problem.ids.len();
        let gamma = problem.gamma;

        let variance = problem.covariance.diag().to_owned();
        if let Some(i) = variance.iter().position(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(ReversoError::Optimization(format!(
                "non-positive variance for {}",
                problem.ids[i]
            )));
        }
        let inv_var = variance.mapv(f64::recip);

        let mut rows: Vec<(Array1<f64>, f64)> = Vec::with_capacity(problem.constraints.len());
        for constraint in problem.constraints {
            let betas = || {
                problem.betas.cloned().ok_or_else(|| {
                    ReversoError::Optimization(format!("{constraint} requires betas"))
                })
            };
            rows.push(match constraint {
                Constraint::FullInvestment => (Array1::ones(n), 1.0),
                Constraint::ZeroInvestment => (Array1::ones(n), 0.0),
                Constraint::UnitBeta => (betas()?, 1.0),
                Constraint::ZeroBeta => (betas()?, 0.0),
                Constraint::LongOnly | Constraint::NoBuyingOnMargin => {
                    return Err(ReversoError::Optimization(format!(
                        "{constraint} is an inequality constraint and needs a QP solver"
                    )));
                }
            });
        }

        let scaled_alpha = &inv_var * problem.alphas;
        if rows.is_empty() {
            return Ok(scaled_alpha / gamma);
        }

        let m = rows.len();
        let mut a = Array2::<f64>::zeros((m, n));
        let mut b = Array1::<f64>::zeros(m);
        for (i, (row, target)) in rows.into_iter().enumerate() {
            a.row_mut(i).assign(&row);
            b[i] = target;
        }

        let a_scaled = &a * &inv_var;
        let lhs = a_scaled.dot(&a.t());
        let rhs = a.dot(&scaled_alpha) - &(b * gamma);
        let lambda = stats::solve_linear_system(&lhs, &rhs).ok_or_else(|| {
            ReversoError::Optimization("constraint set is degenerate or contradictory".into())
        })?;

        let weights = &inv_var * &(problem.alphas - &a.t().dot(&lambda)) / gamma;
        Ok(weights)
    }
}

/// Rows of `alphas` whose date falls in `year`.
pub fn filter_year(alphas: &DataFrame, year: i32) -> Result<DataFrame> {
    Ok(frame::with_date_column(alphas.clone())?
        .lazy()
        .filter(col(columns::DATE).dt().year().eq(lit(year)))
        .collect()?)
}

/// Distinct years present in the `date` column, ascending.
pub fn years(alphas: &DataFrame) -> Result<Vec<i32>> {
    let out = frame::with_date_column(alphas.clone())?
        .lazy()
        .select([col(columns::DATE)
            .dt()
            .year()
            .drop_nulls()
            .unique()
            .sort(SortOptions::default())
            .alias("year")])
        .collect()?;
    Ok(out
        .column("year")?
        .as_materialized_series()
        .i32()?
        .into_iter()
        .flatten()
        .collect())
}

/// Runs an optimizer independently on every date of an alpha table.
#[derive(Clone, Copy)]
pub struct BacktestRunner<'a> {
    /// Solver
    pub optimizer: &'a dyn Optimizer,
    /// Constraint set applied on every date
    pub constraints: &'a [Constraint],
    /// Risk aversion
    pub gamma: f64,
    /// Worker threads
    pub n_cpus: usize,
}

impl std::fmt::Debug for BacktestRunner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BacktestRunner")
            .field("optimizer", &self.optimizer.name())
            .field("constraints", &self.constraints)
            .field("gamma", &self.gamma)
            .field("n_cpus", &self.n_cpus)
            .finish()
    }
}

struct CrossSection {
    date: Date,
    ids: Vec<SecurityId>,
    alphas: Array1<f64>,
    variance: Array1<f64>,
    betas: Option<Array1<f64>>,
}

impl BacktestRunner<'_> {
    /// Weights for every date of `alphas`.
    ///
    /// `alphas` holds `date`, `barrid`, `alpha` and `specific_risk`, plus
    /// `predicted_beta` when a beta constraint is used. The covariance of
    /// each date is `diag(specific_risk²)`. Rows with a null input are
    /// skipped. The output has `date`, `barrid` and `weight`, in date
    /// order.
    pub fn run(&self, alphas: &DataFrame) -> Result<DataFrame> {
        let sections = self.cross_sections(alphas)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.n_cpus.max(1))
            .build()
            .map_err(|e| ReversoError::Other(format!("failed to build thread pool: {e}")))?;

        let solved: Vec<(Date, Vec<SecurityId>, Array1<f64>)> = pool.install(|| {
            sections
                .into_par_iter()
                .map(|section| {
                    let covariance = Array2::from_diag(&section.variance);
                    let problem = OptimizationProblem {
                        ids: &section.ids,
                        alphas: &section.alphas,
                        covariance: &covariance,
                        constraints: self.constraints,
                        gamma: self.gamma,
                        betas: section.betas.as_ref(),
                    };
                    let weights = self.optimizer.optimize(&problem).map_err(|e| {
                        ReversoError::Optimization(format!("{}: {e}", section.date))
                    })?;
                    Ok((section.date, section.ids, weights))
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let mut dates = Vec::new();
        let mut ids = Vec::new();
        let mut weights = Vec::new();
        for (date, section_ids, w) in solved {
            dates.extend(std::iter::repeat_n(Some(date), section_ids.len()));
            ids.extend(section_ids);
            weights.extend(w);
        }
        tracing::info!(
            optimizer = self.optimizer.name(),
            rows = weights.len(),
            gamma = self.gamma,
            "optimized weights"
        );

        Ok(DataFrame::new(vec![
            frame::date_series(columns::DATE, &dates)?.into(),
            Series::new(columns::BARRID.into(), ids).into(),
            Series::new(columns::WEIGHT.into(), weights).into(),
        ])?)
    }

    fn cross_sections(&self, alphas: &DataFrame) -> Result<Vec<CrossSection>> {
        let needs_betas = self.constraints.iter().any(Constraint::needs_betas);
        let mut numeric = vec![columns::ALPHA, columns::SPECIFIC_RISK];
        if needs_betas {
            numeric.push(columns::PREDICTED_BETA);
        }
        let complete = numeric.iter().fold(
            col(columns::DATE)
                .is_not_null()
                .and(col(columns::BARRID).is_not_null()),
            |all, name| {
                all.and(col(*name).is_not_null())
                    .and(col(*name).cast(DataType::Float64).is_not_nan())
            },
        );

        let alphas = frame::with_date_column(alphas.clone())?;
        let kept = alphas
            .clone()
            .lazy()
            .filter(complete)
            .sort(
                [columns::DATE],
                SortMultipleOptions::default().with_maintain_order(true),
            )
            .collect()?;
        let skipped = alphas.height() - kept.height();
        if skipped > 0 {
            tracing::warn!(skipped, "rows with null optimizer inputs skipped");
        }

        kept.partition_by_stable([columns::DATE], true)?
            .into_iter()
            .map(|part| {
                let date = frame::date_values(&part, columns::DATE)?
                    .into_iter()
                    .flatten()
                    .next()
                    .ok_or_else(|| ReversoError::InvalidData("empty cross-section".into()))?;
                let risk = dense(&part, columns::SPECIFIC_RISK)?;
                Ok(CrossSection {
                    date,
                    ids: frame::str_values(&part, columns::BARRID)?
                        .into_iter()
                        .flatten()
                        .collect(),
                    alphas: dense(&part, columns::ALPHA)?,
                    variance: risk.mapv(|r| r * r),
                    betas: if needs_betas {
                        Some(dense(&part, columns::PREDICTED_BETA)?)
                    } else {
                        None
                    },
                })
            })
            .collect()
    }
}

/// A null-free numeric column as an `ndarray` vector.
fn dense(df: &DataFrame, name: &str) -> Result<Array1<f64>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series.f64()?.into_no_null_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use rstest::rstest;

    fn ids(n: usize) -> Vec<SecurityId> {
        (0..n).map(|i| format!("S{i}")).collect()
    }

    fn solve(constraints: &[Constraint]) -> Result<Array1<f64>> {
        let ids = ids(4);
        let alphas = array![0.02, -0.01, 0.015, 0.005];
        let covariance = Array2::from_diag(&array![0.04, 0.09, 0.01, 0.0625]);
        let betas = array![1.2, 0.8, 1.0, 0.5];
        DiagonalMeanVariance.optimize(&OptimizationProblem {
            ids: &ids,
            alphas: &alphas,
            covariance: &covariance,
            constraints,
            gamma: 2.0,
            betas: Some(&betas),
        })
    }

    #[test]
    fn test_unconstrained_closed_form() {
        let w = solve(&[]).unwrap();
        assert_relative_eq!(w[0], 0.02 / 0.04 / 2.0, epsilon = 1e-12);
        assert_relative_eq!(w[1], -0.01 / 0.09 / 2.0, epsilon = 1e-12);
    }

    #[rstest]
    #[case(vec![Constraint::FullInvestment], 1.0, None)]
    #[case(vec![Constraint::ZeroInvestment], 0.0, None)]
    #[case(vec![Constraint::ZeroBeta, Constraint::ZeroInvestment], 0.0, Some(0.0))]
    #[case(vec![Constraint::UnitBeta, Constraint::FullInvestment], 1.0, Some(1.0))]
    fn test_equality_constraints_hold(
        #[case] constraints: Vec<Constraint>,
        #[case] sum: f64,
        #[case] beta: Option<f64>,
    ) {
        let w = solve(&constraints).unwrap();
        assert_relative_eq!(w.sum(), sum, epsilon = 1e-10);
        if let Some(beta) = beta {
            assert_relative_eq!(w.dot(&array![1.2, 0.8, 1.0, 0.5]), beta, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_constrained_solution_is_optimal() {
        // Moving along a direction that keeps Σw = 0 must not improve utility.
        let w = solve(&[Constraint::ZeroInvestment]).unwrap();
        let alphas = array![0.02, -0.01, 0.015, 0.005];
        let var = array![0.04, 0.09, 0.01, 0.0625];
        let utility = |w: &Array1<f64>| alphas.dot(w) - (w * w * &var).sum();
        let step = array![1e-3, -1e-3, 0.0, 0.0];
        assert!(utility(&w) >= utility(&(&w + &step)));
        assert!(utility(&w) >= utility(&(&w - &step)));
    }

    #[rstest]
    #[case(Constraint::LongOnly)]
    #[case(Constraint::NoBuyingOnMargin)]
    fn test_inequality_constraints_rejected(#[case] constraint: Constraint) {
        assert!(matches!(
            solve(&[constraint]),
            Err(ReversoError::Optimization(_))
        ));
    }

    #[test]
    fn test_contradictory_constraints() {
        assert!(solve(&[Constraint::FullInvestment, Constraint::ZeroInvestment]).is_err());
    }

    fn alpha_table() -> DataFrame {
        let d = |y, m, day| Date::from_ymd_opt(y, m, day);
        let mut df = df! {
            "barrid" => &["A", "B", "C", "A", "B", "C", "A"],
            "alpha" => &[Some(0.01), Some(-0.02), Some(0.005), Some(0.0), Some(0.01), None, Some(0.02)],
            "specific_risk" => &[0.2, 0.3, 0.25, 0.2, 0.3, 0.25, 0.2],
            "predicted_beta" => &[1.0, 1.1, 0.9, 1.0, 1.1, 0.9, 1.0],
        }
        .unwrap();
        let dates = [
            d(2023, 12, 29),
            d(2023, 12, 29),
            d(2023, 12, 29),
            d(2024, 1, 2),
            d(2024, 1, 2),
            d(2024, 1, 2),
            d(2024, 1, 3),
        ];
        df.with_column(frame::date_series("date", &dates).unwrap())
            .unwrap();
        df
    }

    #[test]
    fn test_years_and_filter() {
        let table = alpha_table();
        assert_eq!(years(&table).unwrap(), vec![2023, 2024]);
        assert_eq!(filter_year(&table, 2024).unwrap().height(), 4);
    }

    #[test]
    fn test_years_from_string_dates() {
        let table = df! {
            "date" => &[Some("2024-03-01"), None, Some("2021-06-30"), Some("2024-01-02")],
            "barrid" => &["A", "A", "B", "B"],
        }
        .unwrap();
        assert_eq!(years(&table).unwrap(), vec![2021, 2024]);
        assert_eq!(filter_year(&table, 2021).unwrap().height(), 1);
    }

    #[test]
    fn test_runner_solves_each_date() {
        let table = filter_year(&alpha_table(), 2024).unwrap();
        let constraints = [Constraint::ZeroInvestment];
        let runner = BacktestRunner {
            optimizer: &DiagonalMeanVariance,
            constraints: &constraints,
            gamma: 10.0,
            n_cpus: 2,
        };
        let weights = runner.run(&table).unwrap();

        // 2024-01-02 keeps A and B (C has no alpha); 2024-01-03 has only A,
        // whose zero-investment weight must be 0.
        assert_eq!(weights.height(), 3);
        let w = frame::f64_values(&weights, "weight").unwrap();
        assert_relative_eq!(w[0].unwrap() + w[1].unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(w[2].unwrap(), 0.0, epsilon = 1e-12);
    }
}
