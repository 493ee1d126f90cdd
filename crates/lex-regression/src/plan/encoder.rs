//! Row encoding against a [`ColumnPlan`].

use polars::prelude::AnyValue;
use serde::{Deserialize, Serialize};

use super::{ColumnEncoding, ColumnPlan, TargetEncoding};
use crate::config::VectorLengthPolicy;
use crate::error::{RegressionError, Result};
use crate::utils::{category_key, numeric_value, vector_elements};

/// Raw cells of one table row, learning cells in plan order.
#[derive(Debug, Clone)]
pub struct SourceRow<'a> {
    /// Zero-based row index in the source table (used in error messages).
    pub index: usize,
    pub learning: Vec<AnyValue<'a>>,
    pub target: AnyValue<'a>,
}

/// One row of the design matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedRow {
    pub target: f64,
    /// Exactly `parameter_count` entries; NaN marks a tolerated missing cell.
    pub parameters: Vec<f64>,
    pub has_missing: bool,
}

/// Turns source rows into [`EncodedRow`]s. Holds nothing but the plan.
#[derive(Debug, Clone, Copy)]
pub struct RowEncoder<'p> {
    plan: &'p ColumnPlan,
}

impl<'p> RowEncoder<'p> {
    pub fn new(plan: &'p ColumnPlan) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> &'p ColumnPlan {
        self.plan
    }

    /// Encode one row.
    ///
    /// # Errors
    ///
    /// [`RegressionError::MissingValue`] for a missing cell when the plan
    /// does not tolerate missing values; [`RegressionError::DataIntegrity`]
    /// for categories outside the domain, vectors longer than planned and
    /// cells of the wrong type.
    pub fn encode(&self, row: &SourceRow) -> Result<EncodedRow> {
        let plan = self.plan;
        if row.learning.len() != plan.columns().len() {
            return Err(RegressionError::data_integrity(
                plan.target().name(),
                row.index,
                format!(
                    "row has {} learning cells, expected {}",
                    row.learning.len(),
                    plan.columns().len()
                ),
            ));
        }

        let mut parameters = vec![0.0; plan.parameter_count()];
        let mut has_missing = false;

        for (column, value) in plan.columns().iter().zip(&row.learning) {
            let slots = &mut parameters[column.slot().range(1)];
            if value.is_null() {
                self.missing(column.name(), row.index)?;
                slots.fill(f64::NAN);
                has_missing = true;
                continue;
            }

            match &column.encoding {
                ColumnEncoding::Factor(categories) => {
                    let key = category_key(value).ok_or_else(|| {
                        unexpected_cell(column.name(), row.index, value, "a category label")
                    })?;
                    match categories.position(&key) {
                        None => {
                            return Err(RegressionError::data_integrity(
                                column.name(),
                                row.index,
                                format!("category '{key}' is not part of the column domain"),
                            ));
                        }
                        Some(0) => {}
                        Some(position) => slots[position - 1] = 1.0,
                    }
                }
                ColumnEncoding::Covariate => {
                    slots[0] = numeric_value(value).ok_or_else(|| {
                        unexpected_cell(column.name(), row.index, value, "a number")
                    })?;
                }
                ColumnEncoding::Vector { length, policy } => {
                    let elements = vector_elements(value).ok_or_else(|| {
                        unexpected_cell(column.name(), row.index, value, "a vector")
                    })?;
                    if elements.len() > *length
                        || (*policy == VectorLengthPolicy::Exact && elements.len() != *length)
                    {
                        return Err(RegressionError::data_integrity(
                            column.name(),
                            row.index,
                            format!(
                                "vector has {} elements, planned length is {}",
                                elements.len(),
                                length
                            ),
                        ));
                    }
                    for (k, slot) in slots.iter_mut().enumerate() {
                        *slot = elements.get(k).copied().unwrap_or(f64::NAN);
                    }
                }
            }
        }

        let base = plan.slots_per_degree();
        let highest = if base == 0 { 1 } else { plan.max_exponent() };
        for degree in 2..=highest {
            let start = (degree as usize - 1) * base;
            for j in 0..base {
                parameters[start + j] = parameters[j].powi(degree as i32);
            }
        }

        let target = self.encode_target(row, &mut has_missing)?;

        Ok(EncodedRow {
            target,
            parameters,
            has_missing,
        })
    }

    fn encode_target(&self, row: &SourceRow, has_missing: &mut bool) -> Result<f64> {
        let target = self.plan.target();
        let value = &row.target;
        if value.is_null() {
            self.missing(target.name(), row.index)?;
            *has_missing = true;
            return Ok(f64::NAN);
        }

        match target.encoding() {
            TargetEncoding::Numeric => numeric_value(value)
                .ok_or_else(|| unexpected_cell(target.name(), row.index, value, "a number")),
            TargetEncoding::Nominal(categories) => {
                let key = category_key(value).ok_or_else(|| {
                    unexpected_cell(target.name(), row.index, value, "a category label")
                })?;
                categories.position(&key).map(|p| p as f64).ok_or_else(|| {
                    RegressionError::data_integrity(
                        target.name(),
                        row.index,
                        format!("category '{key}' is not part of the target domain"),
                    )
                })
            }
        }
    }

    fn missing(&self, column: &str, row: usize) -> Result<()> {
        if self.plan.fail_on_missing() {
            return Err(RegressionError::MissingValue {
                column: column.to_string(),
                row,
            });
        }
        Ok(())
    }
}

fn unexpected_cell(column: &str, row: usize, value: &AnyValue, expected: &str) -> RegressionError {
    RegressionError::data_integrity(
        column,
        row,
        format!("expected {expected}, found {}", value.dtype()),
    )
}
