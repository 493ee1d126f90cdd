//! Fitted regression model and its coefficient statistics.
//!
//! [`RegressionContent`] is built once from a [`FittedModel`] and the
//! [`ColumnPlan`] it was trained against. Construction zeroes coefficients
//! the solver left undefined (redundant columns) and records a warning
//! naming them; the value is read-only afterwards.
//!
//! Coefficient `i` of the model is the intercept when `i == 0` and a constant
//! is fitted; the remaining coefficients follow the plan's degree-major slot
//! order.

pub mod attribution;
pub mod prediction;

use nalgebra::{DMatrix, DVector};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

use crate::error::{RegressionError, Result};
use crate::plan::ColumnPlan;
use crate::solver::FittedModel;
use attribution::{AttributionFn, AttributionStrategy, TermLayout};
pub use prediction::{PREDICTION_COLUMN, PREDICTION_ERROR_COLUMN, Predictions};

/// Label of the intercept row in results.
pub const INTERCEPT: &str = "Intercept";

/// Parameter name plus polynomial degree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParameterKey {
    pub name: String,
    pub degree: u32,
}

impl ParameterKey {
    pub fn new(name: impl Into<String>, degree: u32) -> Self {
        Self {
            name: name.into(),
            degree,
        }
    }
}

/// One row of the coefficient statistics table. `None` marks a value that
/// is undefined (NaN).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub parameter: String,
    pub degree: u32,
    pub coefficient: Option<f64>,
    pub std_err: Option<f64>,
    pub t_value: Option<f64>,
    pub p_value: Option<f64>,
}

/// Inputs for [`RegressionContent::new`] besides the plan.
#[derive(Debug, Clone)]
pub struct ContentParts {
    pub fitted: FittedModel,
    /// Mean of every parameter slot over the rows used in the fit.
    pub means: Vec<f64>,
    pub skipped_rows: usize,
    pub offset_value: f64,
    pub attribution: AttributionStrategy,
}

/// A trained model with everything needed to report on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionContent {
    target: String,
    learning_fields: Vec<String>,
    slot_widths: Vec<usize>,
    factors: Vec<String>,
    covariates: Vec<String>,
    domain_values: BTreeMap<String, Vec<String>>,
    vector_lengths: BTreeMap<String, usize>,
    parameter_names: Vec<String>,
    coefficients: DVector<f64>,
    covariance: DMatrix<f64>,
    value_count: usize,
    skipped_rows: usize,
    r_squared: f64,
    adjusted_r_squared: f64,
    means: Vec<f64>,
    max_exponent: u32,
    include_constant: bool,
    offset_value: f64,
    warning: Option<String>,
    /// Encoding used for training; reused to score new rows.
    plan: ColumnPlan,
}

impl RegressionContent {
    /// Assemble the content and zero undefined coefficients.
    ///
    /// # Errors
    ///
    /// [`RegressionError::Solver`] when the fitted model's dimensions do not
    /// match the plan.
    pub fn new(plan: &ColumnPlan, parts: ContentParts) -> Result<Self> {
        let expected = plan.parameter_count() + usize::from(plan.include_constant());
        let ContentParts {
            fitted,
            means,
            skipped_rows,
            offset_value,
            attribution,
        } = parts;

        if fitted.coefficients.len() != expected
            || fitted.covariance.nrows() != expected
            || fitted.covariance.ncols() != expected
        {
            return Err(RegressionError::Solver(format!(
                "expected {} coefficients, solver returned {} (covariance {}x{})",
                expected,
                fitted.coefficients.len(),
                fitted.covariance.nrows(),
                fitted.covariance.ncols()
            )));
        }

        let mut content = Self {
            target: plan.target().name().to_string(),
            learning_fields: plan.learning_fields(),
            slot_widths: plan.columns().iter().map(|c| c.slot().width()).collect(),
            factors: plan.factor_names(),
            covariates: plan.covariate_names(),
            domain_values: plan.domain_values().into_iter().collect(),
            vector_lengths: plan.vector_lengths().into_iter().collect(),
            parameter_names: plan.parameter_names(),
            r_squared: fitted.r_squared(),
            adjusted_r_squared: fitted.adjusted_r_squared(plan.include_constant()),
            coefficients: fitted.coefficients,
            covariance: fitted.covariance,
            value_count: fitted.value_count,
            skipped_rows,
            means,
            max_exponent: plan.max_exponent(),
            include_constant: plan.include_constant(),
            offset_value,
            warning: None,
            plan: plan.clone(),
        };
        content.init(attribution.function());
        Ok(content)
    }

    /// Zero NaN coefficients and word the redundancy warning.
    fn init(&mut self, attribute: AttributionFn) {
        let layout = TermLayout {
            fields: &self.learning_fields,
            widths: &self.slot_widths,
            include_constant: self.include_constant,
        };

        let mut terms: Vec<String> = Vec::new();
        for (i, coefficient) in self.coefficients.iter_mut().enumerate() {
            if !coefficient.is_nan() {
                continue;
            }
            *coefficient = 0.0;
            let term = attribute(&layout, i)
                .map(|t| t.to_string())
                .unwrap_or_else(|| INTERCEPT.to_string());
            if !terms.contains(&term) {
                terms.push(term);
            }
        }

        if !terms.is_empty() {
            let message = format!(
                "The following columns are redundant and will not contribute to the model: {}. \
                 Coefficient statistics will not be accurate and contain missing information.",
                terms.join(", ")
            );
            warn!("{}", message);
            self.warning = Some(message);
        }
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// `valueCount - parameterCount - (intercept ? 1 : 0)`; may be negative.
    pub fn degrees_of_freedom(&self) -> i64 {
        self.value_count as i64 - self.coefficients.len() as i64
    }

    /// Standard error of coefficient `i`. Negative round-off on the
    /// covariance diagonal is absorbed by taking the absolute value.
    pub fn std_error(&self, i: usize) -> f64 {
        self.covariance[(i, i)].abs().sqrt()
    }

    pub fn t_value(&self, i: usize) -> f64 {
        self.coefficients[i] / self.std_error(i)
    }

    /// Two-sided p-value of coefficient `i`; NaN when the degrees of freedom
    /// are not positive.
    pub fn p_value(&self, i: usize) -> f64 {
        match self.t_distribution() {
            Some(dist) => two_sided_p(&dist, self.t_value(i)),
            None => f64::NAN,
        }
    }

    pub fn std_errors(&self) -> Vec<f64> {
        (0..self.coefficients.len()).map(|i| self.std_error(i)).collect()
    }

    pub fn t_values(&self) -> Vec<f64> {
        (0..self.coefficients.len()).map(|i| self.t_value(i)).collect()
    }

    pub fn p_values(&self) -> Vec<f64> {
        let dist = self.t_distribution();
        (0..self.coefficients.len())
            .map(|i| match &dist {
                Some(dist) => two_sided_p(dist, self.t_value(i)),
                None => f64::NAN,
            })
            .collect()
    }

    fn t_distribution(&self) -> Option<StudentsT> {
        let dof = self.degrees_of_freedom();
        if dof <= 0 {
            return None;
        }
        StudentsT::new(0.0, 1.0, dof as f64).ok()
    }

    // =========================================================================
    // Parameter naming
    // =========================================================================

    /// Names of the regressors of degree 1, in slot order.
    ///
    /// Factors contribute `column=value` for each non-reference category,
    /// covariates `column`, vector covariates `column[k]` per element.
    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    /// Pair every (name, degree) with the entry of `values` at its
    /// coefficient index. `values` is indexed like the coefficients
    /// (intercept first when fitted); missing entries read as NaN.
    pub fn values_by_parameter(&self, values: &[f64]) -> HashMap<ParameterKey, f64> {
        self.keyed(values, usize::from(self.include_constant))
    }

    pub fn coefficients_by_parameter(&self) -> HashMap<ParameterKey, f64> {
        self.values_by_parameter(self.coefficients.as_slice())
    }

    pub fn std_errors_by_parameter(&self) -> HashMap<ParameterKey, f64> {
        self.values_by_parameter(&self.std_errors())
    }

    pub fn t_values_by_parameter(&self) -> HashMap<ParameterKey, f64> {
        self.values_by_parameter(&self.t_values())
    }

    pub fn p_values_by_parameter(&self) -> HashMap<ParameterKey, f64> {
        self.values_by_parameter(&self.p_values())
    }

    /// Slot means keyed like the regressors (no intercept entry).
    pub fn means_by_parameter(&self) -> HashMap<ParameterKey, f64> {
        self.keyed(&self.means, 0)
    }

    fn keyed(&self, values: &[f64], offset: usize) -> HashMap<ParameterKey, f64> {
        self.indexed_parameters(offset)
            .map(|(key, index)| {
                let value = values.get(index).copied().unwrap_or(f64::NAN);
                (key, value)
            })
            .collect()
    }

    /// (name, degree) with its coefficient index, degree-major.
    fn indexed_parameters(&self, offset: usize) -> impl Iterator<Item = (ParameterKey, usize)> + '_ {
        let per_degree = self.parameter_names.len();
        let highest = if per_degree == 0 { 0 } else { self.max_exponent };
        (1..=highest).flat_map(move |degree| {
            self.parameter_names
                .iter()
                .enumerate()
                .map(move |(k, name)| {
                    let index = offset + (degree as usize - 1) * per_degree + k;
                    (ParameterKey::new(name.clone(), degree), index)
                })
        })
    }

    // =========================================================================
    // Intercept
    // =========================================================================

    pub fn intercept(&self) -> Option<f64> {
        self.include_constant.then(|| self.coefficients[0])
    }

    pub fn intercept_std_err(&self) -> Option<f64> {
        self.include_constant.then(|| self.std_error(0))
    }

    pub fn intercept_t_value(&self) -> Option<f64> {
        self.include_constant.then(|| self.t_value(0))
    }

    pub fn intercept_p_value(&self) -> Option<f64> {
        self.include_constant.then(|| self.p_value(0))
    }

    // =========================================================================
    // Results table
    // =========================================================================

    /// One row per (parameter, degree) plus a trailing intercept row when a
    /// constant is fitted. The intercept row has degree 0.
    pub fn results_table(&self) -> Vec<ResultRow> {
        let offset = usize::from(self.include_constant);
        let std_errors = self.std_errors();
        let t_values = self.t_values();
        let p_values = self.p_values();

        let row = |parameter: String, degree: u32, i: usize| ResultRow {
            parameter,
            degree,
            coefficient: defined(self.coefficients[i]),
            std_err: defined(std_errors[i]),
            t_value: defined(t_values[i]),
            p_value: defined(p_values[i]),
        };

        let mut rows: Vec<ResultRow> = self
            .indexed_parameters(offset)
            .map(|(key, i)| row(key.name, key.degree, i))
            .collect();
        if self.include_constant {
            rows.push(row(INTERCEPT.to_string(), 0, 0));
        }
        rows
    }

    /// [`results_table`](Self::results_table) as a DataFrame with columns
    /// `Parameter, Degree, Coefficient, StdErr, t-value, P>|t|`; undefined
    /// values are null.
    pub fn results_frame(&self) -> Result<DataFrame> {
        let rows = self.results_table();
        let column = |name: &str, f: fn(&ResultRow) -> Option<f64>| {
            Column::new(name.into(), rows.iter().map(f).collect::<Vec<_>>())
        };

        let df = DataFrame::new(vec![
            Column::new(
                "Parameter".into(),
                rows.iter().map(|r| r.parameter.clone()).collect::<Vec<_>>(),
            ),
            Column::new(
                "Degree".into(),
                rows.iter().map(|r| r.degree).collect::<Vec<_>>(),
            ),
            column("Coefficient", |r| r.coefficient),
            column("StdErr", |r| r.std_err),
            column("t-value", |r| r.t_value),
            column("P>|t|", |r| r.p_value),
        ])?;
        Ok(df)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn learning_fields(&self) -> &[String] {
        &self.learning_fields
    }

    pub fn factors(&self) -> &[String] {
        &self.factors
    }

    /// Plain and vector covariates.
    pub fn covariates(&self) -> &[String] {
        &self.covariates
    }

    /// Ordered categories per factor, reference category first.
    pub fn domain_values(&self) -> &BTreeMap<String, Vec<String>> {
        &self.domain_values
    }

    pub fn vector_lengths(&self) -> &BTreeMap<String, usize> {
        &self.vector_lengths
    }

    pub fn coefficients(&self) -> &DVector<f64> {
        &self.coefficients
    }

    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Number of regressors, intercept excluded.
    pub fn parameter_count(&self) -> usize {
        self.coefficients.len() - usize::from(self.include_constant)
    }

    /// Rows used in the fit.
    pub fn value_count(&self) -> usize {
        self.value_count
    }

    /// Rows left out because of missing values.
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    pub fn r_squared(&self) -> f64 {
        self.r_squared
    }

    pub fn adjusted_r_squared(&self) -> f64 {
        self.adjusted_r_squared
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn max_exponent(&self) -> u32 {
        self.max_exponent
    }

    pub fn include_constant(&self) -> bool {
        self.include_constant
    }

    /// Fixed intercept used when no constant is fitted.
    pub fn offset_value(&self) -> f64 {
        self.offset_value
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    /// Column layout the model was trained with.
    pub fn plan(&self) -> &ColumnPlan {
        &self.plan
    }
}

fn two_sided_p(dist: &StudentsT, t: f64) -> f64 {
    if t.is_nan() {
        f64::NAN
    } else if t.is_infinite() {
        0.0
    } else {
        2.0 * (1.0 - dist.cdf(t.abs()))
    }
}

fn defined(value: f64) -> Option<f64> {
    (!value.is_nan()).then_some(value)
}
