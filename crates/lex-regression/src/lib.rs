//! Polynomial Linear Regression Library
//!
//! Fits a polynomial linear regression over a polars table in a single
//! streaming pass and reports per-coefficient statistics.
//!
//! # Overview
//!
//! - **Column Plan**: Nominal columns become dummy-encoded factors, numeric
//!   columns covariates, list/array/binary columns one slot per element
//! - **Polynomial Terms**: Every slot is repeated for degrees `2..=max_exponent`
//! - **Streaming Fit**: Rows are encoded one at a time and fed to an
//!   incremental least-squares solver
//! - **Statistics**: Standard errors, t-values, two-sided p-values, R² and
//!   a results table with explicit missing markers
//! - **Scoring**: Prediction and absolute error columns for any table with
//!   the training columns
//! - **Progress Reporting**: Progress updates with cooperative cancellation
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_regression::{Learner, RegressionConfig, TableSpec};
//! use polars::prelude::*;
//!
//! let df = CsvReadOptions::default()
//!     .with_has_header(true)
//!     .try_into_reader_with_file_path(Some("data.csv".into()))?
//!     .finish()?;
//! let spec = TableSpec::from_dataframe(&df)?;
//!
//! let config = RegressionConfig::builder()
//!     .target_column("price")
//!     .max_exponent(2)
//!     .build()?;
//!
//! let content = Learner::builder()
//!     .config(config)
//!     .on_progress(|update| println!("[{:.0}%] {}", update.progress * 100.0, update.message))
//!     .build()?
//!     .fit(&df, &spec)?;
//!
//! println!("R² = {:.4}", content.r_squared());
//! println!("{}", content.results_frame()?);
//! ```
//!
//! # Custom Solvers
//!
//! [`Learner::fit`] uses the bundled [`NormalEquationsSolver`]. Any type
//! implementing [`IncrementalSolver`] can be passed to [`Learner::fit_with`]
//! instead, and [`Learner::scan`] exposes the row loop itself with a
//! per-row consumer callback.

pub mod config;
pub mod content;
pub mod dataset;
pub mod error;
pub mod learner;
pub mod plan;
pub mod progress;
pub mod solver;
pub mod table;
pub mod utils;

// Re-exports for convenient access
pub use config::{
    ConfigValidationError, RegressionConfig, RegressionConfigBuilder, VectorLengthPolicy,
};
pub use content::attribution::{AttributionStrategy, Term};
pub use content::{
    ContentParts, PREDICTION_COLUMN, PREDICTION_ERROR_COLUMN, ParameterKey, Predictions,
    RegressionContent, ResultRow,
};
pub use dataset::{TrainingDataset, TrainingRows};
pub use error::{RegressionError, Result as RegressionResult, ResultExt};
pub use learner::{Learner, LearnerBuilder, ScanSummary};
pub use plan::{
    ColumnPlan, ColumnRole, EncodedRow, ParameterSlot, PlannedColumn, PlannedTarget, RowEncoder,
    SourceRow, TargetEncoding,
};
pub use progress::{
    CancellationToken, ClosureProgressReporter, ProgressReporter, ProgressUpdate, TrainingStage,
};
pub use solver::{FittedModel, IncrementalSolver, NormalEquationsSolver};
pub use table::{ColumnKind, ColumnSpec, TableSpec};
