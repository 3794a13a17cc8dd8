//! Statistical utility functions shared by the pipeline stages.
//!
//! Sample moments over optional values and thin adapters from `ndarray`
//! onto `nalgebra`'s LU decomposition, used by the OLS regression and the
//! closed-form optimizer.

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};

/// Minimum threshold for standard deviation to avoid division by zero.
/// Values at or below this threshold are treated as zero variance.
pub const MIN_STD_THRESHOLD: f64 = 1e-10;

/// Mean of the non-null values, `None` if there are none.
pub fn mean(values: &[Option<f64>]) -> Option<f64> {
    let (sum, n) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Sample standard deviation (ddof = 1) of the non-null values.
///
/// Returns `None` with fewer than two observations.
pub fn sample_std(values: &[Option<f64>]) -> Option<f64> {
    let finite: Vec<f64> = values.iter().flatten().copied().collect();
    if finite.len() < 2 {
        return None;
    }
    let m = finite.iter().sum::<f64>() / finite.len() as f64;
    let var = finite.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (finite.len() - 1) as f64;
    Some(var.sqrt())
}

fn to_nalgebra(a: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

/// Solves the dense system `a x = b` through an LU decomposition with
/// partial pivoting.
///
/// Returns `None` if `a` is not square, the shapes disagree, or a pivot is
/// at or below [`MIN_STD_THRESHOLD`] in magnitude.
pub fn solve_linear_system(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if a.ncols() != n || b.len() != n {
        return None;
    }
    let lu = to_nalgebra(a).lu();
    if lu.u().diagonal().iter().any(|p| p.abs() <= MIN_STD_THRESHOLD) {
        return None;
    }
    let x = lu.solve(&DVector::from_iterator(n, b.iter().copied()))?;
    Some(Array1::from_iter(x.iter().copied()))
}

/// Inverts a square matrix, `None` when it is singular.
pub fn invert(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    if a.ncols() != n {
        return None;
    }
    let inv = to_nalgebra(a).try_inverse()?;
    Some(Array2::from_shape_fn((n, n), |(i, j)| inv[(i, j)]))
}
