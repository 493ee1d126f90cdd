//! Training orchestration.
//!
//! The [`Learner`] derives a [`ColumnPlan`] from the table schema, walks the
//! encoded rows once, feeds them to an [`IncrementalSolver`] and wraps the
//! solver's output into a [`RegressionContent`].

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigValidationError, RegressionConfig};
use crate::content::{ContentParts, RegressionContent};
use crate::dataset::TrainingDataset;
use crate::error::{RegressionError, Result};
use crate::plan::{ColumnPlan, EncodedRow};
use crate::progress::{
    CancellationToken, ClosureProgressReporter, ProgressReporter, ProgressUpdate, TrainingStage,
};
use crate::solver::{IncrementalSolver, NormalEquationsSolver};
use crate::table::TableSpec;

/// Counters of one pass over a [`TrainingDataset`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Rows handed to the consumer.
    pub rows_used: usize,
    /// Rows left out because of tolerated missing values.
    pub rows_skipped: usize,
    /// Per-slot mean over the rows handed to the consumer, NaN entries
    /// ignored. NaN for a slot that never had a value.
    pub means: Vec<f64>,
}

/// Polynomial linear regression learner.
///
/// Use [`Learner::builder()`] to create one.
///
/// # Example
///
/// ```rust,ignore
/// use lex_regression::{Learner, RegressionConfig, TableSpec};
///
/// let spec = TableSpec::from_dataframe(&df)?;
/// let content = Learner::builder()
///     .config(RegressionConfig::builder().target_column("price").max_exponent(2).build()?)
///     .on_progress(|update| println!("[{:.0}%] {}", update.progress * 100.0, update.message))
///     .build()?
///     .fit(&df, &spec)?;
///
/// for row in content.results_table() {
///     println!("{} ^{}: {:?}", row.parameter, row.degree, row.coefficient);
/// }
/// ```
pub struct Learner {
    config: RegressionConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: CancellationToken,
}

static_assertions::assert_impl_all!(Learner: Send, Sync);

impl Learner {
    /// Create a new learner builder.
    pub fn builder() -> LearnerBuilder {
        LearnerBuilder::default()
    }

    pub fn config(&self) -> &RegressionConfig {
        &self.config
    }

    /// Derive the column plan this learner would train with.
    pub fn plan(&self, df: &DataFrame, spec: &TableSpec) -> Result<ColumnPlan> {
        ColumnPlan::build(spec, df, &self.config)
    }

    /// Train with the bundled [`NormalEquationsSolver`].
    ///
    /// # Errors
    ///
    /// Returns `Err(RegressionError::Cancelled)` if the token was cancelled
    /// before the scan finished. Configuration, missing-value and
    /// data-integrity errors abort training without a partial result.
    pub fn fit(&self, df: &DataFrame, spec: &TableSpec) -> Result<RegressionContent> {
        self.run(|| {
            let plan = self.planned(df, spec)?;
            let mut solver =
                NormalEquationsSolver::new(plan.parameter_count(), plan.include_constant());
            self.train(df, &plan, &mut solver)
        })
    }

    /// Train with a caller-provided solver.
    ///
    /// The solver must be sized for the plan: `parameter_count` columns plus
    /// one for the intercept when a constant is fitted.
    pub fn fit_with<S>(
        &self,
        df: &DataFrame,
        spec: &TableSpec,
        solver: &mut S,
    ) -> Result<RegressionContent>
    where
        S: IncrementalSolver + ?Sized,
    {
        self.run(|| {
            let plan = self.planned(df, spec)?;
            let expected = plan.parameter_count() + usize::from(plan.include_constant());
            if solver.columns() != expected {
                return Err(RegressionError::configuration(format!(
                    "Solver expects {} columns, the column plan has {}",
                    solver.columns(),
                    expected
                )));
            }
            self.train(df, &plan, solver)
        })
    }

    /// Walk every row of `dataset` once and hand the complete ones to
    /// `consumer`.
    ///
    /// Rows with tolerated missing values are skipped. Cancellation is
    /// checked, and progress reported, every `cancel_check_interval` rows.
    pub fn scan<F>(&self, dataset: &TrainingDataset<'_>, mut consumer: F) -> Result<ScanSummary>
    where
        F: FnMut(&EncodedRow) -> Result<()>,
    {
        let total = dataset.row_count();
        let interval = self.config.cancel_check_interval.max(1);
        let width = dataset.parameter_count();
        let mut sums = vec![0.0; width];
        let mut counts = vec![0usize; width];
        let mut rows_used = 0;
        let mut rows_skipped = 0;

        for (index, row) in dataset.iter().enumerate() {
            if index % interval == 0 {
                self.check_cancelled()?;
                self.report_progress(ProgressUpdate::with_items(
                    TrainingStage::Scanning,
                    index,
                    total,
                    format!("Scanning rows ({}/{})", index, total),
                ));
            }

            let row = row?;
            if row.has_missing {
                rows_skipped += 1;
                if rows_skipped == 1 {
                    warn!(
                        "Row {} has missing values and is skipped; further skipped rows are only logged at debug level",
                        index
                    );
                } else {
                    debug!("Skipping row {} (missing values)", index);
                }
                continue;
            }

            for ((sum, count), value) in sums.iter_mut().zip(&mut counts).zip(&row.parameters) {
                if !value.is_nan() {
                    *sum += value;
                    *count += 1;
                }
            }
            consumer(&row)?;
            rows_used += 1;
        }
        self.check_cancelled()?;

        self.report_progress(ProgressUpdate::with_items(
            TrainingStage::Scanning,
            total,
            total,
            format!("Scanned {} rows", total),
        ));

        let means = sums
            .into_iter()
            .zip(counts)
            .map(|(sum, count)| if count > 0 { sum / count as f64 } else { f64::NAN })
            .collect();

        Ok(ScanSummary {
            rows_used,
            rows_skipped,
            means,
        })
    }

    /// Report the terminal update and log failures.
    fn run<F>(&self, train: F) -> Result<RegressionContent>
    where
        F: FnOnce() -> Result<RegressionContent>,
    {
        match train() {
            Ok(content) => {
                self.report_progress(ProgressUpdate::complete("Training completed successfully"));
                Ok(content)
            }
            Err(e) => {
                if e.is_cancelled() {
                    info!("Training cancelled");
                    self.report_progress(ProgressUpdate::cancelled());
                } else {
                    error!("Training error: {}", e);
                    self.report_progress(ProgressUpdate::failed(e.to_string()));
                }
                Err(e)
            }
        }
    }

    fn planned(&self, df: &DataFrame, spec: &TableSpec) -> Result<ColumnPlan> {
        info!("Starting regression training on {} rows...", df.height());
        self.report_progress(ProgressUpdate::new(
            TrainingStage::Initializing,
            0.0,
            "Starting regression training...",
        ));
        self.check_cancelled()?;

        self.report_progress(ProgressUpdate::new(
            TrainingStage::Planning,
            0.0,
            "Deriving column plan...",
        ));
        let plan = self.plan(df, spec)?;
        self.report_progress(ProgressUpdate::new(
            TrainingStage::Planning,
            1.0,
            format!("{} parameters planned", plan.parameter_count()),
        ));
        Ok(plan)
    }

    fn train<S>(
        &self,
        df: &DataFrame,
        plan: &ColumnPlan,
        solver: &mut S,
    ) -> Result<RegressionContent>
    where
        S: IncrementalSolver + ?Sized,
    {
        let start_time = Instant::now();
        self.check_cancelled()?;

        let dataset = TrainingDataset::new(df, plan)?;
        let offset = if plan.include_constant() {
            0.0
        } else {
            self.config.offset_value
        };

        info!("Scanning {} rows...", dataset.row_count());
        let summary = self.scan(&dataset, |row| {
            solver.update(&row.parameters, row.target - offset);
            Ok(())
        })?;
        info!(
            "Scan complete: {} rows used, {} rows skipped",
            summary.rows_used, summary.rows_skipped
        );

        info!("Solving normal equations...");
        self.report_progress(ProgressUpdate::new(
            TrainingStage::Solving,
            0.0,
            "Solving for coefficients...",
        ));
        let fitted = solver.result()?;
        // rows the solver itself refused (NaN padding, NaN target) count as skipped
        let refused = summary.rows_used.saturating_sub(fitted.value_count);

        info!("Computing coefficient statistics...");
        self.report_progress(ProgressUpdate::new(
            TrainingStage::Statistics,
            0.0,
            "Computing coefficient statistics...",
        ));
        let content = RegressionContent::new(
            plan,
            ContentParts {
                fitted,
                means: summary.means,
                skipped_rows: summary.rows_skipped + refused,
                offset_value: offset,
                attribution: self.config.attribution,
            },
        )?;

        info!(
            "Training completed in {:.2?}: {} rows, R² = {:.4}",
            start_time.elapsed(),
            content.value_count(),
            content.r_squared()
        );
        Ok(content)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(RegressionError::Cancelled);
        }
        Ok(())
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }
}

/// Builder for [`Learner`].
#[derive(Default)]
pub struct LearnerBuilder {
    config: Option<RegressionConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: Option<CancellationToken>,
}

static_assertions::assert_impl_all!(LearnerBuilder: Send);

impl LearnerBuilder {
    pub fn config(mut self, config: RegressionConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during training.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Set a cancellation token. Cancel a clone of it from any thread to
    /// stop training at the next check.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Build the learner.
    ///
    /// Returns an error if the configuration is missing or invalid.
    pub fn build(self) -> std::result::Result<Learner, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Learner {
            config,
            progress_reporter: self.progress_reporter,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
        })
    }
}
