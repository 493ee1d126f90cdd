//! Incremental least-squares solvers.
//!
//! The learner only talks to the [`IncrementalSolver`] trait: it pushes one
//! encoded row at a time and asks for a [`FittedModel`] at the end. The
//! bundled [`NormalEquationsSolver`] keeps the cross-product matrix of the
//! design matrix (plus target) and solves it with a sweep, which also yields
//! the inverse needed for the coefficient covariance.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RegressionError, Result};

/// Relative pivot size below which a column counts as redundant.
pub const DEFAULT_PIVOT_TOLERANCE: f64 = 1e-10;

/// A least-squares solver fed one row at a time.
pub trait IncrementalSolver {
    /// Design-matrix columns the solver expects, intercept included.
    fn columns(&self) -> usize;

    /// Add one row. The solver decides how to treat NaN entries.
    fn update(&mut self, features: &[f64], target: f64);

    /// Solve for the rows seen so far.
    fn result(&self) -> Result<FittedModel>;
}

/// Output of a solver.
///
/// When an intercept is fitted it is coefficient 0 and the first
/// row/column of the covariance matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    /// NaN for structurally redundant columns.
    pub coefficients: DVector<f64>,
    pub covariance: DMatrix<f64>,
    /// Rows used in the fit.
    pub value_count: usize,
    /// Residual sum of squares.
    pub sum_squared_errors: f64,
    /// Total sum of squares, centered when an intercept is fitted.
    pub total_sum_squares: f64,
    /// Number of non-redundant columns.
    pub rank: usize,
}

impl FittedModel {
    /// Coefficient of determination, NaN when the target has no variance.
    pub fn r_squared(&self) -> f64 {
        if self.total_sum_squares > 0.0 {
            1.0 - self.sum_squared_errors / self.total_sum_squares
        } else {
            f64::NAN
        }
    }

    /// R² adjusted for the number of design-matrix columns.
    pub fn adjusted_r_squared(&self, include_constant: bool) -> f64 {
        let n = self.value_count as f64;
        let p = self.coefficients.len() as f64;
        if n - p <= 0.0 {
            return f64::NAN;
        }
        if include_constant {
            if self.total_sum_squares > 0.0 {
                1.0 - (self.sum_squared_errors * (n - 1.0)) / (self.total_sum_squares * (n - p))
            } else {
                f64::NAN
            }
        } else {
            1.0 - (1.0 - self.r_squared()) * (n / (n - p))
        }
    }
}

/// Normal-equations solver with sweep-based inversion.
///
/// Memory is quadratic in the parameter count and independent of the number
/// of rows. Rows with a NaN feature or target are ignored and counted in
/// [`skipped`](Self::skipped).
///
/// With an intercept, the solver keeps running means and the centered
/// cross-products of `[x y]` (Welford updates), so covariates with a large
/// mean and a small spread are not mistaken for redundant columns. The
/// intercept and its covariance are recovered from the means afterwards.
#[derive(Debug, Clone)]
pub struct NormalEquationsSolver {
    include_constant: bool,
    /// `[x y]ᵀ[x y]`, centered when an intercept is fitted.
    cross: DMatrix<f64>,
    /// Running means of `[x y]`; only maintained with an intercept.
    mean: DVector<f64>,
    row: DVector<f64>,
    delta: DVector<f64>,
    value_count: usize,
    skipped: usize,
    tolerance: f64,
}

impl NormalEquationsSolver {
    pub fn new(parameter_count: usize, include_constant: bool) -> Self {
        let width = parameter_count + 1;
        Self {
            include_constant,
            cross: DMatrix::zeros(width, width),
            mean: DVector::zeros(width),
            row: DVector::zeros(width),
            delta: DVector::zeros(width),
            value_count: 0,
            skipped: 0,
            tolerance: DEFAULT_PIVOT_TOLERANCE,
        }
    }

    /// Set the relative pivot tolerance used to detect redundant columns.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Rows ignored because of NaN entries.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn parameter_count(&self) -> usize {
        self.cross.nrows() - 1
    }
}

impl IncrementalSolver for NormalEquationsSolver {
    fn columns(&self) -> usize {
        self.parameter_count() + usize::from(self.include_constant)
    }

    fn update(&mut self, features: &[f64], target: f64) {
        let p = self.parameter_count();
        debug_assert_eq!(features.len(), p);

        if target.is_nan() || features.iter().any(|v| v.is_nan()) {
            self.skipped += 1;
            return;
        }

        for (i, value) in features.iter().enumerate() {
            self.row[i] = *value;
        }
        self.row[p] = target;
        self.value_count += 1;

        if self.include_constant {
            let n = self.value_count as f64;
            self.delta.copy_from(&self.row);
            self.delta -= &self.mean;
            self.mean.axpy(1.0 / n, &self.delta, 1.0);
            self.cross
                .ger((n - 1.0) / n, &self.delta, &self.delta, 1.0);
        } else {
            self.cross.ger(1.0, &self.row, &self.row, 1.0);
        }
    }

    fn result(&self) -> Result<FittedModel> {
        let p = self.parameter_count();
        let mut a = self.cross.clone();
        if a.iter().chain(self.mean.iter()).any(|v| !v.is_finite()) {
            return Err(RegressionError::Solver(
                "cross-product matrix contains non-finite values".to_string(),
            ));
        }

        let diagonal: Vec<f64> = (0..p).map(|j| a[(j, j)]).collect();
        let mut swept = vec![false; p];
        for j in 0..p {
            let pivot = a[(j, j)];
            if !(pivot > 0.0 && pivot > self.tolerance * diagonal[j]) {
                debug!("Column {} is redundant (pivot {:e})", j, pivot);
                continue;
            }
            sweep(&mut a, j);
            swept[j] = true;
        }

        let has_intercept = self.include_constant && self.value_count > 0;
        let rank = swept.iter().filter(|s| **s).count() + usize::from(has_intercept);
        let n = self.value_count as f64;
        let sum_squared_errors = a[(p, p)].max(0.0);
        let degrees_of_freedom = n - rank as f64;
        let sigma_squared = if degrees_of_freedom > 0.0 {
            sum_squared_errors / degrees_of_freedom
        } else {
            f64::NAN
        };

        let slopes = DVector::from_fn(p, |j, _| if swept[j] { a[(j, p)] } else { f64::NAN });
        let slope_covariance = DMatrix::from_fn(p, p, |i, j| {
            if swept[i] && swept[j] {
                sigma_squared * a[(i, j)]
            } else {
                f64::NAN
            }
        });

        let total_sum_squares = if self.value_count == 0 {
            f64::NAN
        } else {
            self.cross[(p, p)].max(0.0)
        };

        let (coefficients, covariance) = if self.include_constant {
            // inverse of the swept block applied to the feature means
            let scaled_means = DVector::from_fn(p, |j, _| {
                (0..p)
                    .filter(|i| swept[*i])
                    .map(|i| a[(j, i)] * self.mean[i])
                    .sum::<f64>()
            });
            let (intercept, intercept_variance) = if has_intercept {
                let fitted_mean: f64 = (0..p)
                    .filter(|j| swept[*j])
                    .map(|j| slopes[j] * self.mean[j])
                    .sum();
                let leverage: f64 = (0..p)
                    .filter(|j| swept[*j])
                    .map(|j| self.mean[j] * scaled_means[j])
                    .sum();
                (
                    self.mean[p] - fitted_mean,
                    sigma_squared * (1.0 / n + leverage),
                )
            } else {
                (f64::NAN, f64::NAN)
            };

            let coefficients = DVector::from_fn(p + 1, |j, _| {
                if j == 0 { intercept } else { slopes[j - 1] }
            });
            let covariance = DMatrix::from_fn(p + 1, p + 1, |i, j| match (i, j) {
                (0, 0) => intercept_variance,
                (0, j) | (j, 0) if has_intercept && swept[j - 1] => {
                    -sigma_squared * scaled_means[j - 1]
                }
                (0, _) | (_, 0) => f64::NAN,
                (i, j) => slope_covariance[(i - 1, j - 1)],
            });
            (coefficients, covariance)
        } else {
            (slopes, slope_covariance)
        };

        Ok(FittedModel {
            coefficients,
            covariance,
            value_count: self.value_count,
            sum_squared_errors,
            total_sum_squares,
            rank,
        })
    }
}

/// Sweep the symmetric matrix `a` on pivot `j` in place.
fn sweep(a: &mut DMatrix<f64>, j: usize) {
    let m = a.nrows();
    let pivot = a[(j, j)];
    for l in 0..m {
        a[(j, l)] /= pivot;
    }
    for i in 0..m {
        if i == j {
            continue;
        }
        let factor = a[(i, j)];
        if factor == 0.0 {
            continue;
        }
        for l in 0..m {
            a[(i, l)] -= factor * a[(j, l)];
        }
        a[(i, j)] = -factor / pivot;
    }
    a[(j, j)] = 1.0 / pivot;
}
