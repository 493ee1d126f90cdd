//! Lazy sequence of encoded training rows.
//!
//! [`TrainingDataset`] pairs a DataFrame with a [`ColumnPlan`] and encodes
//! rows on demand. Iterating it reads one row at a time; nothing beyond the
//! current row is buffered. Iterating again restarts from the first row with
//! the same plan.

use polars::prelude::*;
use std::iter::FusedIterator;

use crate::error::{RegressionError, Result};
use crate::plan::{ColumnPlan, EncodedRow, RowEncoder, SourceRow};

/// A table bound to its column plan.
pub struct TrainingDataset<'a> {
    plan: &'a ColumnPlan,
    learning: Vec<&'a Series>,
    target: &'a Series,
    row_count: usize,
}

impl<'a> TrainingDataset<'a> {
    /// Resolve the plan's columns in `df`.
    pub fn new(df: &'a DataFrame, plan: &'a ColumnPlan) -> Result<Self> {
        let series = |name: &str| -> Result<&'a Series> {
            df.column(name)
                .map(Column::as_materialized_series)
                .map_err(|_| RegressionError::ColumnNotFound(name.to_string()))
        };

        let learning = plan
            .columns()
            .iter()
            .map(|c| series(c.name()))
            .collect::<Result<Vec<_>>>()?;
        let target = series(plan.target().name())?;

        Ok(Self {
            plan,
            learning,
            target,
            row_count: df.height(),
        })
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn parameter_count(&self) -> usize {
        self.plan.parameter_count()
    }

    pub fn plan(&self) -> &'a ColumnPlan {
        self.plan
    }

    /// Start a new pass over the rows.
    pub fn iter(&self) -> TrainingRows<'_, 'a> {
        TrainingRows {
            dataset: self,
            encoder: RowEncoder::new(self.plan),
            next: 0,
        }
    }

    fn source_row(&self, index: usize) -> Result<SourceRow<'a>> {
        let learning = self
            .learning
            .iter()
            .map(|&s| s.get(index))
            .collect::<PolarsResult<Vec<_>>>()?;
        Ok(SourceRow {
            index,
            learning,
            target: self.target.get(index)?,
        })
    }
}

impl<'d, 'a> IntoIterator for &'d TrainingDataset<'a> {
    type Item = Result<EncodedRow>;
    type IntoIter = TrainingRows<'d, 'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Single forward pass over a [`TrainingDataset`].
///
/// Yields one `Err` at most: after an error the iterator is exhausted.
pub struct TrainingRows<'d, 'a> {
    dataset: &'d TrainingDataset<'a>,
    encoder: RowEncoder<'a>,
    next: usize,
}

impl TrainingRows<'_, '_> {
    /// Index of the next row to be read.
    pub fn position(&self) -> usize {
        self.next
    }
}

impl Iterator for TrainingRows<'_, '_> {
    type Item = Result<EncodedRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.dataset.row_count {
            return None;
        }
        let index = self.next;
        self.next += 1;

        let encoded = self
            .dataset
            .source_row(index)
            .and_then(|row| self.encoder.encode(&row));
        if encoded.is_err() {
            self.next = self.dataset.row_count;
        }
        Some(encoded)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.dataset.row_count.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl FusedIterator for TrainingRows<'_, '_> {}
