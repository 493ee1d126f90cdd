//! Progress reporting and cancellation support for regression training.
//!
//! The learner reports a [`ProgressUpdate`] at every stage boundary and, while
//! scanning rows, once per cancellation check. Cancellation is cooperative:
//! the learner polls a [`CancellationToken`] between row batches and stops
//! with [`RegressionError::Cancelled`](crate::error::RegressionError::Cancelled)
//! without building any statistics.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_regression::{Learner, CancellationToken};
//!
//! let token = CancellationToken::new();
//! let token_clone = token.clone();
//!
//! std::thread::spawn(move || {
//!     std::thread::sleep(std::time::Duration::from_secs(5));
//!     token_clone.cancel();
//! });
//!
//! let content = Learner::builder()
//!     .config(config)
//!     .cancellation_token(token)
//!     .on_progress(|update| {
//!         println!("[{:?}] {}", update.stage, update.message);
//!     })
//!     .build()?
//!     .fit(&df, &spec)?;
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stages of a training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingStage {
    /// Validating inputs
    Initializing,
    /// Deriving the parameter layout from the schema
    Planning,
    /// Encoding rows and feeding them to the solver
    Scanning,
    /// Extracting coefficients and covariance from the solver
    Solving,
    /// Computing fit quality and coefficient statistics
    Statistics,
    /// Training completed successfully
    Complete,
    /// Training was cancelled
    Cancelled,
    /// Training failed with an error
    Failed,
}

impl TrainingStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::Planning => "Planning Columns",
            Self::Scanning => "Scanning Rows",
            Self::Solving => "Solving",
            Self::Statistics => "Computing Statistics",
            Self::Complete => "Complete",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }

    /// Returns the share of a full run spent in this stage (0.0 - 1.0).
    pub fn weight(&self) -> f32 {
        match self {
            Self::Initializing => 0.02,
            Self::Planning => 0.08,
            Self::Scanning => 0.75,
            Self::Solving => 0.10,
            Self::Statistics => 0.05,
            Self::Complete | Self::Cancelled | Self::Failed => 0.0,
        }
    }

    /// Returns the cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Initializing => 0.0,
            Self::Planning => 0.02,
            Self::Scanning => 0.10,
            Self::Solving => 0.85,
            Self::Statistics => 0.95,
            Self::Complete => 1.0,
            Self::Cancelled | Self::Failed => 0.0,
        }
    }
}

/// A single progress report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Current stage
    pub stage: TrainingStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    /// Human-readable message describing current activity
    pub message: String,

    /// Rows processed so far (scanning stage only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_processed: Option<usize>,

    /// Total rows to process (scanning stage only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_total: Option<usize>,
}

impl ProgressUpdate {
    /// Creates a new progress update for a stage.
    pub fn new(stage: TrainingStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    /// Creates a new progress update with item counts.
    pub fn with_items(
        stage: TrainingStage,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = if total > 0 {
            current as f32 / total as f32
        } else {
            0.0
        };
        Self {
            items_processed: Some(current),
            items_total: Some(total),
            ..Self::new(stage, stage_progress, message)
        }
    }

    /// Creates a completion progress update.
    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(TrainingStage::Complete, 1.0, message)
    }

    /// Creates a cancelled progress update.
    pub fn cancelled() -> Self {
        Self::new(TrainingStage::Cancelled, 0.0, "Training cancelled by user")
    }

    /// Creates a failed progress update.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(TrainingStage::Failed, 0.0, message)
    }
}

/// Trait for receiving progress updates during training.
///
/// Implementations must be `Send + Sync` so a learner running on a
/// background thread can report to a UI thread.
pub trait ProgressReporter: Send + Sync {
    /// Called when progress is made. May be called once per check interval
    /// while scanning, so implementations should be cheap.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    /// Creates a new closure-based progress reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

/// Token for cancelling a running training.
///
/// Clones share the same flag, so one clone can be handed to another thread
/// and [`cancel()`](Self::cancel)led from there.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

impl CancellationToken {
    /// Creates a new cancellation token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Safe to call from any thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested on this token or any clone.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Reset the token for reuse.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}
