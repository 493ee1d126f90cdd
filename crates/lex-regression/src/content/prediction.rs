//! Scoring rows with a trained model.
//!
//! Rows are encoded with the plan the model was trained on, so factor
//! dummies, vector slots and polynomial terms line up with the
//! coefficients. A row with a missing learning or target cell gets no
//! prediction and no error.

use polars::prelude::*;
use tracing::debug;

use super::RegressionContent;
use crate::dataset::TrainingDataset;
use crate::error::Result;

/// Name of the appended prediction column.
pub const PREDICTION_COLUMN: &str = "PolyReg prediction";

/// Name of the appended absolute error column.
pub const PREDICTION_ERROR_COLUMN: &str = "Prediction Error";

/// Per-row predictions and absolute errors.
#[derive(Debug, Clone, PartialEq)]
pub struct Predictions {
    pub predicted: Vec<Option<f64>>,
    /// `|predicted - target|`.
    pub errors: Vec<Option<f64>>,
    /// Accumulated squared error over every scored row.
    pub squared_error: f64,
}

impl Predictions {
    /// Rows that received a prediction.
    pub fn scored_rows(&self) -> usize {
        self.predicted.iter().flatten().count()
    }

    /// Mean squared error over all rows, missing rows included in the count;
    /// NaN for an empty table.
    pub fn mean_squared_error(&self) -> f64 {
        if self.predicted.is_empty() {
            f64::NAN
        } else {
            self.squared_error / self.predicted.len() as f64
        }
    }

    /// The two output columns, nulls for unscored rows.
    pub fn to_columns(&self) -> [Column; 2] {
        [
            Column::new(PREDICTION_COLUMN.into(), self.predicted.clone()),
            Column::new(PREDICTION_ERROR_COLUMN.into(), self.errors.clone()),
        ]
    }
}

impl RegressionContent {
    /// Predict the target of every row of `df`.
    ///
    /// `df` needs the learning columns and the target column of the
    /// training table. Missing cells never fail here, whatever the training
    /// policy was; the row is left unscored instead.
    ///
    /// # Errors
    ///
    /// [`RegressionError::ColumnNotFound`](crate::RegressionError::ColumnNotFound)
    /// for absent columns and
    /// [`RegressionError::DataIntegrity`](crate::RegressionError::DataIntegrity)
    /// for categories outside the training domain or over-long vectors.
    pub fn predict(&self, df: &DataFrame) -> Result<Predictions> {
        let plan = self.plan.tolerating_missing();
        let dataset = TrainingDataset::new(df, &plan)?;

        let offset = usize::from(self.include_constant);
        let base = if self.include_constant {
            self.coefficients[0]
        } else {
            self.offset_value
        };
        let slopes = &self.coefficients.as_slice()[offset..];

        let mut predictions = Predictions {
            predicted: Vec::with_capacity(dataset.row_count()),
            errors: Vec::with_capacity(dataset.row_count()),
            squared_error: 0.0,
        };
        for encoded in &dataset {
            let encoded = encoded?;
            let predicted = base
                + slopes
                    .iter()
                    .zip(&encoded.parameters)
                    .map(|(b, x)| b * x)
                    .sum::<f64>();

            if encoded.has_missing || predicted.is_nan() || encoded.target.is_nan() {
                predictions.predicted.push(None);
                predictions.errors.push(None);
                continue;
            }
            let error = (predicted - encoded.target).abs();
            predictions.squared_error += error * error;
            predictions.predicted.push(Some(predicted));
            predictions.errors.push(Some(error));
        }

        debug!(
            "Scored {}/{} rows",
            predictions.scored_rows(),
            predictions.predicted.len()
        );
        Ok(predictions)
    }

    /// `df` with the prediction and error columns appended.
    pub fn append_predictions(&self, df: &DataFrame) -> Result<DataFrame> {
        let predictions = self.predict(df)?;
        let mut scored = df.clone();
        for column in predictions.to_columns() {
            scored.with_column(column)?;
        }
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegressionConfig;
    use crate::learner::Learner;
    use crate::table::TableSpec;
    use approx::assert_relative_eq;

    fn fit(df: &DataFrame, config: RegressionConfig) -> RegressionContent {
        let spec = TableSpec::from_dataframe(df).unwrap();
        Learner::builder()
            .config(config)
            .build()
            .unwrap()
            .fit(df, &spec)
            .unwrap()
    }

    #[test]
    fn test_predictions_on_exact_line() {
        let df = df! {
            "x" => [1.0, 2.0, 3.0, 4.0],
            "y" => [3.0, 5.0, 7.0, 9.0],
        }
        .unwrap();
        let content = fit(
            &df,
            RegressionConfig::builder().target_column("y").build().unwrap(),
        );

        let new_rows = df! {
            "x" => [Some(10.0), None],
            "y" => [Some(20.0), Some(1.0)],
        }
        .unwrap();
        let predictions = content.predict(&new_rows).unwrap();

        assert_relative_eq!(predictions.predicted[0].unwrap(), 21.0, epsilon = 1e-9);
        assert_relative_eq!(predictions.errors[0].unwrap(), 1.0, epsilon = 1e-9);
        assert_eq!(predictions.predicted[1], None);
        assert_eq!(predictions.errors[1], None);
        assert_eq!(predictions.scored_rows(), 1);
        assert_relative_eq!(predictions.mean_squared_error(), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_prediction_uses_offset_without_constant() {
        let df = df! {
            "x" => [1.0, 2.0, 3.0],
            "y" => [12.0, 14.0, 16.0],
        }
        .unwrap();
        let content = fit(
            &df,
            RegressionConfig::builder()
                .target_column("y")
                .include_constant(false)
                .offset_value(10.0)
                .build()
                .unwrap(),
        );

        let predictions = content.predict(&df).unwrap();
        assert_relative_eq!(predictions.predicted[2].unwrap(), 16.0, epsilon = 1e-9);
        assert_relative_eq!(predictions.squared_error, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_cells_unscored_even_when_training_failed_fast() {
        let df = df! {
            "x" => [1.0, 2.0, 3.0],
            "y" => [2.0, 4.0, 6.0],
        }
        .unwrap();
        let content = fit(
            &df,
            RegressionConfig::builder()
                .target_column("y")
                .fail_on_missing(true)
                .build()
                .unwrap(),
        );

        let new_rows = df! {
            "x" => [Some(4.0), Some(5.0)],
            "y" => [None, Some(10.0)],
        }
        .unwrap();
        let predictions = content.predict(&new_rows).unwrap();
        assert_eq!(predictions.predicted[0], None);
        assert_relative_eq!(predictions.predicted[1].unwrap(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_append_predictions_adds_two_columns() {
        let df = df! {
            "x" => [1.0, 2.0, 3.0],
            "y" => [2.0, 4.0, 6.0],
        }
        .unwrap();
        let content = fit(
            &df,
            RegressionConfig::builder().target_column("y").build().unwrap(),
        );

        let out = content.append_predictions(&df).unwrap();
        assert_eq!(out.width(), 4);
        assert_eq!(out.height(), 3);
        let predicted = out.column(PREDICTION_COLUMN).unwrap().f64().unwrap();
        assert_relative_eq!(predicted.get(1).unwrap(), 4.0, epsilon = 1e-9);
        assert!(out.column(PREDICTION_ERROR_COLUMN).is_ok());
    }

    #[test]
    fn test_unknown_column_is_error() {
        let df = df! {
            "x" => [1.0, 2.0, 3.0],
            "y" => [2.0, 4.0, 6.0],
        }
        .unwrap();
        let content = fit(
            &df,
            RegressionConfig::builder().target_column("y").build().unwrap(),
        );

        let other = df! { "z" => [1.0], "y" => [1.0] }.unwrap();
        let err = content.predict(&other).unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }
}
