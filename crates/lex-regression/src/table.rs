//! Schema view of a training table.
//!
//! A [`TableSpec`] is the column metadata the plan is derived from: one
//! [`ColumnSpec`] per column with its kind and, for nominal columns, the
//! precomputed domain of category labels. Domains are computed once by
//! [`TableSpec::from_dataframe`] or supplied by the caller; the plan never
//! recomputes them.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::error::{RegressionError, Result, ResultExt};
use crate::utils::{category_key, is_nominal_dtype, is_numeric_dtype, is_vector_dtype};

/// How a column's cells are interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Category labels (strings, categoricals, enums, booleans)
    Nominal,
    /// Integers and floats
    Numeric,
    /// Numeric lists, numeric arrays and binary cells
    Vector,
    /// Anything else; carries the polars dtype name
    Unsupported(String),
}

impl ColumnKind {
    /// Classify a polars dtype.
    pub fn from_dtype(dtype: &DataType) -> Self {
        if is_nominal_dtype(dtype) {
            ColumnKind::Nominal
        } else if is_numeric_dtype(dtype) {
            ColumnKind::Numeric
        } else if is_vector_dtype(dtype) {
            ColumnKind::Vector
        } else {
            ColumnKind::Unsupported(format!("{dtype:?}"))
        }
    }
}

/// Metadata for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
    /// Distinct category labels, present only for nominal columns whose
    /// domain has been computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<Vec<String>>,
}

impl ColumnSpec {
    pub fn nominal<I, S>(name: impl Into<String>, domain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind: ColumnKind::Nominal,
            domain: Some(domain.into_iter().map(Into::into).collect()),
        }
    }

    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Numeric,
            domain: None,
        }
    }

    pub fn vector(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Vector,
            domain: None,
        }
    }
}

/// Ordered column metadata of a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    columns: Vec<ColumnSpec>,
}

impl TableSpec {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    /// Derive the spec of a DataFrame, computing the domain of every
    /// nominal column in first-appearance order.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let mut columns = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            let series = column.as_materialized_series();
            let kind = ColumnKind::from_dtype(series.dtype());
            let domain = match kind {
                ColumnKind::Nominal => Some(
                    compute_domain(series)
                        .context(format!("Computing domain of '{}'", series.name()))?,
                ),
                _ => None,
            };
            debug!(
                "Column '{}': {:?}{}",
                series.name(),
                kind,
                domain
                    .as_ref()
                    .map(|d| format!(" ({} categories)", d.len()))
                    .unwrap_or_default()
            );
            columns.push(ColumnSpec {
                name: series.name().to_string(),
                kind,
                domain,
            });
        }
        Ok(Self { columns })
    }

    /// Same as [`from_dataframe`](Self::from_dataframe) but leaves every
    /// domain unset.
    pub fn without_domains(df: &DataFrame) -> Self {
        let columns = df
            .get_columns()
            .iter()
            .map(|c| ColumnSpec {
                name: c.name().to_string(),
                kind: ColumnKind::from_dtype(c.dtype()),
                domain: None,
            })
            .collect();
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a column or fail with [`RegressionError::ColumnNotFound`].
    pub fn require(&self, name: &str) -> Result<&ColumnSpec> {
        self.column(name)
            .ok_or_else(|| RegressionError::ColumnNotFound(name.to_string()))
    }

    /// Replace the domain of a column.
    pub fn set_domain<I, S>(&mut self, name: &str, domain: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let column = self.column_mut(name)?;
        column.domain = Some(domain.into_iter().map(Into::into).collect());
        Ok(())
    }

    /// Drop the domain of a column.
    pub fn clear_domain(&mut self, name: &str) -> Result<()> {
        self.column_mut(name)?.domain = None;
        Ok(())
    }

    fn column_mut(&mut self, name: &str) -> Result<&mut ColumnSpec> {
        self.columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| RegressionError::ColumnNotFound(name.to_string()))
    }
}

fn compute_domain(series: &Series) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut domain = Vec::new();
    for i in 0..series.len() {
        if let Some(key) = category_key(&series.get(i)?) {
            if seen.insert(key.clone()) {
                domain.push(key);
            }
        }
    }
    Ok(domain)
}
