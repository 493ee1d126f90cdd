//! Parameter layout of the design matrix.
//!
//! A [`ColumnPlan`] is computed once per training run from the table schema
//! and the configuration. It fixes the number of parameters, the slot range
//! every learning column writes to, the category order of every factor and
//! the length of every vector column. The plan is immutable afterwards and
//! shared by reference with the encoder and the dataset.
//!
//! # Layout
//!
//! Each learning column owns a contiguous block of base slots:
//!
//! | Role              | Slots                      |
//! |-------------------|----------------------------|
//! | `Factor`          | `domain.len() - 1`         |
//! | `VectorCovariate` | longest vector in the data |
//! | `Covariate`       | 1                          |
//!
//! With `max_exponent > 1` the whole block of base slots is repeated once
//! per degree (degree-major), so slot `j` of degree `d` sits at
//! `(d - 1) * slots_per_degree + j` and holds the base value raised to `d`.

pub mod encoder;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;
use tracing::{debug, info};

use crate::config::{RegressionConfig, VectorLengthPolicy};
use crate::error::{RegressionError, Result};
use crate::table::{ColumnKind, ColumnSpec, TableSpec};
use crate::utils::{compare_categories, vector_length};

pub use encoder::{EncodedRow, RowEncoder, SourceRow};

/// Largest vector length and parameter count the plan accepts.
pub const MAX_PARAMETER_COUNT: usize = i32::MAX as usize;

/// Role a column plays in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Target,
    /// Nominal column, dummy encoded against its reference category
    Factor,
    /// Numeric column used as is
    Covariate,
    /// Vector column flattened into one slot per element
    VectorCovariate,
}

/// Position of a learning column inside the parameter vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSlot {
    offset: usize,
    width: usize,
    stride: usize,
}

impl ParameterSlot {
    /// Parameter indices (intercept excluded) written for `degree`.
    pub fn range(&self, degree: u32) -> Range<usize> {
        let start = self.offset + (degree.max(1) as usize - 1) * self.stride;
        start..start + self.width
    }

    /// Number of slots per degree.
    pub fn width(&self) -> usize {
        self.width
    }

    /// First base slot.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Ordered category labels with O(1) lookup.
///
/// Serialized as the plain label list; the lookup table is rebuilt on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CategoryIndex {
    values: Vec<String>,
    positions: HashMap<String, usize>,
}

impl CategoryIndex {
    fn new(column: &str, values: Vec<String>) -> Result<Self> {
        let mut positions = HashMap::with_capacity(values.len());
        for (i, value) in values.iter().enumerate() {
            if positions.insert(value.clone(), i).is_some() {
                return Err(RegressionError::configuration(format!(
                    "Domain of column '{column}' lists category '{value}' more than once"
                )));
            }
        }
        Ok(Self { values, positions })
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn position(&self, category: &str) -> Option<usize> {
        self.positions.get(category).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<CategoryIndex> for Vec<String> {
    fn from(index: CategoryIndex) -> Self {
        index.values
    }
}

impl TryFrom<Vec<String>> for CategoryIndex {
    type Error = RegressionError;

    fn try_from(values: Vec<String>) -> Result<Self> {
        Self::new("<deserialized>", values)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ColumnEncoding {
    /// Reference category is `categories.values()[0]`.
    Factor(CategoryIndex),
    Covariate,
    Vector {
        length: usize,
        policy: VectorLengthPolicy,
    },
}

/// A learning column with its role and slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedColumn {
    name: String,
    role: ColumnRole,
    slot: ParameterSlot,
    pub(crate) encoding: ColumnEncoding,
}

impl PlannedColumn {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> ColumnRole {
        self.role
    }

    pub fn slot(&self) -> ParameterSlot {
        self.slot
    }

    /// Ordered categories of a factor (reference first).
    pub fn categories(&self) -> Option<&[String]> {
        match &self.encoding {
            ColumnEncoding::Factor(categories) => Some(categories.values()),
            _ => None,
        }
    }

    /// Planned element count of a vector covariate.
    pub fn vector_length(&self) -> Option<usize> {
        match &self.encoding {
            ColumnEncoding::Vector { length, .. } => Some(*length),
            _ => None,
        }
    }

    /// Parameter names of this column's base slots.
    fn slot_names(&self) -> Vec<String> {
        match &self.encoding {
            ColumnEncoding::Factor(categories) => categories
                .values()
                .iter()
                .skip(1)
                .map(|value| format!("{}={}", self.name, value))
                .collect(),
            ColumnEncoding::Covariate => vec![self.name.clone()],
            ColumnEncoding::Vector { length, .. } => {
                (0..*length).map(|k| format!("{}[{}]", self.name, k)).collect()
            }
        }
    }
}

/// How the target cell becomes a scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetEncoding {
    Numeric,
    /// Category position in the ordered target domain.
    Nominal(CategoryIndex),
}

/// The target column of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedTarget {
    name: String,
    encoding: TargetEncoding,
}

impl PlannedTarget {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn encoding(&self) -> &TargetEncoding {
        &self.encoding
    }

    /// Ordered target domain of a nominal target.
    pub fn categories(&self) -> Option<&[String]> {
        match &self.encoding {
            TargetEncoding::Nominal(categories) => Some(categories.values()),
            TargetEncoding::Numeric => None,
        }
    }
}

/// Immutable parameter layout for one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnPlan {
    columns: Vec<PlannedColumn>,
    target: PlannedTarget,
    slots_per_degree: usize,
    parameter_count: usize,
    max_exponent: u32,
    include_constant: bool,
    fail_on_missing: bool,
}

impl ColumnPlan {
    /// Derive the plan from the schema.
    ///
    /// `df` is read only to find the longest vector of each vector column.
    ///
    /// # Errors
    ///
    /// [`RegressionError::Configuration`] when the config does not validate,
    /// a factor has no domain, a vector column has no usable length, the
    /// target reference category is unknown or the parameter count is not
    /// representable;
    /// [`RegressionError::ColumnNotFound`] for unknown column names.
    pub fn build(spec: &TableSpec, df: &DataFrame, config: &RegressionConfig) -> Result<Self> {
        config.validate()?;
        let target_spec = spec.require(config.target())?;
        let target = plan_target(target_spec, config)?;

        let learning_specs: Vec<&ColumnSpec> = match &config.learning_columns {
            Some(names) => names
                .iter()
                .map(|name| spec.require(name))
                .collect::<Result<_>>()?,
            None => spec
                .columns()
                .iter()
                .filter(|c| c.name != target.name)
                .collect(),
        };

        let mut encodings = Vec::with_capacity(learning_specs.len());
        for column in &learning_specs {
            let (role, encoding) = plan_column(column, df, config)?;
            encodings.push((column.name.clone(), role, encoding));
        }

        let widths: Vec<usize> = encodings
            .iter()
            .map(|(_, _, encoding)| match encoding {
                ColumnEncoding::Factor(categories) => categories.len().saturating_sub(1),
                ColumnEncoding::Covariate => 1,
                ColumnEncoding::Vector { length, .. } => *length,
            })
            .collect();

        let slots_per_degree = widths
            .iter()
            .try_fold(0usize, |acc, w| acc.checked_add(*w))
            .ok_or_else(|| RegressionError::configuration("Parameter count overflows"))?;
        let parameter_count = slots_per_degree
            .checked_mul(config.max_exponent as usize)
            .filter(|count| {
                count
                    .checked_add(usize::from(config.include_constant))
                    .is_some_and(|total| total <= MAX_PARAMETER_COUNT)
            })
            .ok_or_else(|| {
                RegressionError::configuration(format!(
                    "{} slots at degree {} exceed the supported parameter count",
                    slots_per_degree, config.max_exponent
                ))
            })?;

        if parameter_count == 0 && !config.include_constant {
            return Err(RegressionError::configuration(
                "Model has neither parameters nor an intercept",
            ));
        }

        let mut offset = 0;
        let columns = encodings
            .into_iter()
            .zip(widths)
            .map(|((name, role, encoding), width)| {
                let slot = ParameterSlot {
                    offset,
                    width,
                    stride: slots_per_degree,
                };
                offset += width;
                debug!("Planned '{}' as {:?} at slots {:?}", name, role, slot.range(1));
                PlannedColumn {
                    name,
                    role,
                    slot,
                    encoding,
                }
            })
            .collect::<Vec<_>>();

        info!(
            "Column plan: {} learning columns, {} parameters (degree {}, intercept: {})",
            columns.len(),
            parameter_count,
            config.max_exponent,
            config.include_constant
        );

        Ok(Self {
            columns,
            target,
            slots_per_degree,
            parameter_count,
            max_exponent: config.max_exponent,
            include_constant: config.include_constant,
            fail_on_missing: config.fail_on_missing,
        })
    }

    /// Number of regressors, intercept excluded.
    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    /// Number of base slots; equals `parameter_count / max_exponent`.
    pub fn slots_per_degree(&self) -> usize {
        self.slots_per_degree
    }

    pub fn columns(&self) -> &[PlannedColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&PlannedColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn target(&self) -> &PlannedTarget {
        &self.target
    }

    pub fn max_exponent(&self) -> u32 {
        self.max_exponent
    }

    pub fn include_constant(&self) -> bool {
        self.include_constant
    }

    pub fn fail_on_missing(&self) -> bool {
        self.fail_on_missing
    }

    /// Copy of the plan that encodes missing cells as NaN instead of failing.
    pub(crate) fn tolerating_missing(&self) -> Self {
        Self {
            fail_on_missing: false,
            ..self.clone()
        }
    }

    pub fn role_of(&self, name: &str) -> Option<ColumnRole> {
        if name == self.target.name {
            return Some(ColumnRole::Target);
        }
        self.column(name).map(PlannedColumn::role)
    }

    /// Learning column names in encoding order.
    pub fn learning_fields(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn factor_names(&self) -> Vec<String> {
        self.names_with(|role| role == ColumnRole::Factor)
    }

    /// Plain and vector covariates.
    pub fn covariate_names(&self) -> Vec<String> {
        self.names_with(|role| role != ColumnRole::Factor)
    }

    fn names_with(&self, keep: impl Fn(ColumnRole) -> bool) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| keep(c.role))
            .map(|c| c.name.clone())
            .collect()
    }

    /// Ordered categories of every factor.
    pub fn domain_values(&self) -> HashMap<String, Vec<String>> {
        self.columns
            .iter()
            .filter_map(|c| c.categories().map(|v| (c.name.clone(), v.to_vec())))
            .collect()
    }

    /// Planned length of every vector covariate.
    pub fn vector_lengths(&self) -> HashMap<String, usize> {
        self.columns
            .iter()
            .filter_map(|c| c.vector_length().map(|len| (c.name.clone(), len)))
            .collect()
    }

    /// Names of the base slots in slot order.
    pub fn parameter_names(&self) -> Vec<String> {
        self.columns.iter().flat_map(PlannedColumn::slot_names).collect()
    }
}

fn plan_column(
    column: &ColumnSpec,
    df: &DataFrame,
    config: &RegressionConfig,
) -> Result<(ColumnRole, ColumnEncoding)> {
    match &column.kind {
        ColumnKind::Nominal => {
            let categories = ordered_domain(column, config.sort_factor_categories)?;
            Ok((ColumnRole::Factor, ColumnEncoding::Factor(categories)))
        }
        ColumnKind::Numeric => Ok((ColumnRole::Covariate, ColumnEncoding::Covariate)),
        ColumnKind::Vector => {
            let length = scan_vector_length(df, &column.name, config.vector_length_policy)?;
            Ok((
                ColumnRole::VectorCovariate,
                ColumnEncoding::Vector {
                    length,
                    policy: config.vector_length_policy,
                },
            ))
        }
        ColumnKind::Unsupported(dtype) => Err(RegressionError::configuration(format!(
            "Column '{}' has unsupported type {}",
            column.name, dtype
        ))),
    }
}

fn plan_target(column: &ColumnSpec, config: &RegressionConfig) -> Result<PlannedTarget> {
    let encoding = match &column.kind {
        ColumnKind::Numeric => {
            if let Some(reference) = &config.target_reference_category {
                return Err(RegressionError::configuration(format!(
                    "Reference category '{}' requested for numeric target '{}'",
                    reference, column.name
                )));
            }
            TargetEncoding::Numeric
        }
        ColumnKind::Nominal => {
            let mut values = ordered_domain(column, config.sort_target_categories)?.values;
            if let Some(reference) = &config.target_reference_category {
                let position = values.iter().position(|v| v == reference).ok_or_else(|| {
                    RegressionError::configuration(format!(
                        "Reference category '{}' not found in domain of target '{}'",
                        reference, column.name
                    ))
                })?;
                let value = values.remove(position);
                values.push(value);
            }
            TargetEncoding::Nominal(CategoryIndex::new(&column.name, values)?)
        }
        other => {
            return Err(RegressionError::configuration(format!(
                "Target column '{}' must be numeric or nominal, found {:?}",
                column.name, other
            )));
        }
    };

    Ok(PlannedTarget {
        name: column.name.clone(),
        encoding,
    })
}

fn ordered_domain(column: &ColumnSpec, sort: bool) -> Result<CategoryIndex> {
    let mut values = match &column.domain {
        Some(values) if !values.is_empty() => values.clone(),
        _ => {
            return Err(RegressionError::configuration(format!(
                "Nominal column '{}' has no precomputed domain",
                column.name
            )));
        }
    };
    if sort {
        values.sort_by(|a, b| compare_categories(a, b));
    }
    CategoryIndex::new(&column.name, values)
}

fn scan_vector_length(df: &DataFrame, name: &str, policy: VectorLengthPolicy) -> Result<usize> {
    let series = df
        .column(name)
        .map_err(|_| RegressionError::ColumnNotFound(name.to_string()))?
        .as_materialized_series();

    let mut longest = 0usize;
    let mut first: Option<usize> = None;
    for i in 0..series.len() {
        let value = series.get(i)?;
        if value.is_null() {
            continue;
        }
        let length = vector_length(&value).ok_or_else(|| {
            RegressionError::configuration(format!(
                "Column '{name}' holds a non-vector cell at row {i}"
            ))
        })?;
        if policy == VectorLengthPolicy::Exact {
            match first {
                Some(expected) if expected != length => {
                    return Err(RegressionError::configuration(format!(
                        "Column '{name}' has vectors of different lengths ({expected} and {length})"
                    )));
                }
                Some(_) => {}
                None => first = Some(length),
            }
        }
        longest = longest.max(length);
    }

    if longest == 0 {
        return Err(RegressionError::configuration(format!(
            "Column '{name}' has no non-empty vectors"
        )));
    }
    if longest > MAX_PARAMETER_COUNT {
        return Err(RegressionError::configuration(format!(
            "Column '{name}' has vectors of length {longest}, which is not supported"
        )));
    }
    Ok(longest)
}
