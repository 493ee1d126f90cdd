//! Configuration types for the regression learner.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic learner setup.

use serde::{Deserialize, Serialize};

use crate::content::attribution::AttributionStrategy;

/// Highest supported polynomial degree.
pub const MAX_EXPONENT: u32 = 1024;

/// How the slot count of a vector column is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VectorLengthPolicy {
    /// Slot count is the longest vector seen; shorter rows are padded with NaN.
    #[default]
    Bounded,
    /// Every non-missing vector must have the same length.
    Exact,
}

/// Configuration for the regression learner.
///
/// Use [`RegressionConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use lex_regression::RegressionConfig;
///
/// let config = RegressionConfig::builder()
///     .target_column("price")
///     .learning_columns(["area", "district"])
///     .max_exponent(2)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionConfig {
    /// Column to predict.
    /// Default: None (must be set before training)
    pub target_column: Option<String>,

    /// Columns used as regressors, in the order they are encoded.
    /// If None, every column except the target is used in schema order.
    /// Default: None
    pub learning_columns: Option<Vec<String>>,

    /// Abort on the first missing cell instead of skipping the row.
    /// Default: false
    pub fail_on_missing: bool,

    /// Sort factor categories before choosing the reference category.
    /// When false, categories keep their domain order.
    /// Default: true
    pub sort_factor_categories: bool,

    /// Sort the categories of a nominal target.
    /// Default: true
    pub sort_target_categories: bool,

    /// Category of a nominal target moved to the end of its domain.
    /// Default: None
    pub target_reference_category: Option<String>,

    /// Highest polynomial degree applied to every regressor (at least 1).
    /// Default: 1
    pub max_exponent: u32,

    /// Fit an intercept term.
    /// Default: true
    pub include_constant: bool,

    /// Fixed intercept subtracted from the target when `include_constant`
    /// is false.
    /// Default: 0.0
    pub offset_value: f64,

    /// Slot derivation for vector columns.
    /// Default: Bounded
    pub vector_length_policy: VectorLengthPolicy,

    /// Rows scanned between cancellation checks and progress reports.
    /// Default: 64
    pub cancel_check_interval: usize,

    /// Mapping from NaN coefficient index to the term named in the
    /// redundancy warning.
    /// Default: SlotAware
    pub attribution: AttributionStrategy,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            target_column: None,
            learning_columns: None,
            fail_on_missing: false,
            sort_factor_categories: true,
            sort_target_categories: true,
            target_reference_category: None,
            max_exponent: 1,
            include_constant: true,
            offset_value: 0.0,
            vector_length_policy: VectorLengthPolicy::default(),
            cancel_check_interval: 64,
            attribution: AttributionStrategy::default(),
        }
    }
}

impl RegressionConfig {
    /// Create a new configuration builder.
    pub fn builder() -> RegressionConfigBuilder {
        RegressionConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let Some(target) = &self.target_column else {
            return Err(ConfigValidationError::MissingTarget);
        };

        if self.max_exponent == 0 || self.max_exponent > MAX_EXPONENT {
            return Err(ConfigValidationError::InvalidMaxExponent(self.max_exponent));
        }

        if self.cancel_check_interval == 0 {
            return Err(ConfigValidationError::InvalidCheckInterval(
                self.cancel_check_interval,
            ));
        }

        if !self.offset_value.is_finite() {
            return Err(ConfigValidationError::InvalidOffset(self.offset_value));
        }

        if let Some(columns) = &self.learning_columns {
            if columns.iter().any(|c| c == target) {
                return Err(ConfigValidationError::TargetAsRegressor(target.clone()));
            }
            for (i, column) in columns.iter().enumerate() {
                if columns[..i].contains(column) {
                    return Err(ConfigValidationError::DuplicateColumn(column.clone()));
                }
            }
        }

        Ok(())
    }

    /// The target column name. Only meaningful on a validated config.
    pub fn target(&self) -> &str {
        self.target_column.as_deref().unwrap_or_default()
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("No target column specified")]
    MissingTarget,

    #[error("Invalid max exponent: {0} (must be between 1 and 1024)")]
    InvalidMaxExponent(u32),

    #[error("Invalid cancellation check interval: {0} (must be at least 1)")]
    InvalidCheckInterval(usize),

    #[error("Invalid offset value: {0} (must be finite)")]
    InvalidOffset(f64),

    #[error("Target column '{0}' cannot also be a learning column")]
    TargetAsRegressor(String),

    #[error("Learning column '{0}' listed more than once")]
    DuplicateColumn(String),
}

/// Builder for [`RegressionConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct RegressionConfigBuilder {
    target_column: Option<String>,
    learning_columns: Option<Vec<String>>,
    fail_on_missing: Option<bool>,
    sort_factor_categories: Option<bool>,
    sort_target_categories: Option<bool>,
    target_reference_category: Option<String>,
    max_exponent: Option<u32>,
    include_constant: Option<bool>,
    offset_value: Option<f64>,
    vector_length_policy: Option<VectorLengthPolicy>,
    cancel_check_interval: Option<usize>,
    attribution: Option<AttributionStrategy>,
}

impl RegressionConfigBuilder {
    /// Set the column to predict.
    pub fn target_column(mut self, column: impl Into<String>) -> Self {
        self.target_column = Some(column.into());
        self
    }

    /// Restrict the regressors to these columns, encoded in the given order.
    pub fn learning_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.learning_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Fail on the first missing cell instead of skipping incomplete rows.
    pub fn fail_on_missing(mut self, fail: bool) -> Self {
        self.fail_on_missing = Some(fail);
        self
    }

    /// Sort factor categories before the reference category is chosen.
    pub fn sort_factor_categories(mut self, sort: bool) -> Self {
        self.sort_factor_categories = Some(sort);
        self
    }

    /// Sort the categories of a nominal target.
    pub fn sort_target_categories(mut self, sort: bool) -> Self {
        self.sort_target_categories = Some(sort);
        self
    }

    /// Move this category of a nominal target to the end of its domain.
    pub fn target_reference_category(mut self, category: impl Into<String>) -> Self {
        self.target_reference_category = Some(category.into());
        self
    }

    /// Set the highest polynomial degree.
    ///
    /// # Arguments
    /// * `exponent` - Degree applied to every regressor (1 = plain linear model)
    pub fn max_exponent(mut self, exponent: u32) -> Self {
        self.max_exponent = Some(exponent);
        self
    }

    /// Enable or disable the intercept term.
    pub fn include_constant(mut self, include: bool) -> Self {
        self.include_constant = Some(include);
        self
    }

    /// Set the fixed intercept used when no constant is fitted.
    pub fn offset_value(mut self, offset: f64) -> Self {
        self.offset_value = Some(offset);
        self
    }

    /// Set how vector column lengths are derived.
    pub fn vector_length_policy(mut self, policy: VectorLengthPolicy) -> Self {
        self.vector_length_policy = Some(policy);
        self
    }

    /// Set the number of rows between cancellation checks.
    pub fn cancel_check_interval(mut self, rows: usize) -> Self {
        self.cancel_check_interval = Some(rows);
        self
    }

    /// Choose how redundant coefficients are attributed to terms.
    pub fn attribution(mut self, strategy: AttributionStrategy) -> Self {
        self.attribution = Some(strategy);
        self
    }

    /// Build the configuration.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<RegressionConfig, ConfigValidationError> {
        let config = RegressionConfig {
            target_column: self.target_column,
            learning_columns: self.learning_columns,
            fail_on_missing: self.fail_on_missing.unwrap_or(false),
            sort_factor_categories: self.sort_factor_categories.unwrap_or(true),
            sort_target_categories: self.sort_target_categories.unwrap_or(true),
            target_reference_category: self.target_reference_category,
            max_exponent: self.max_exponent.unwrap_or(1),
            include_constant: self.include_constant.unwrap_or(true),
            offset_value: self.offset_value.unwrap_or(0.0),
            vector_length_policy: self.vector_length_policy.unwrap_or_default(),
            cancel_check_interval: self.cancel_check_interval.unwrap_or(64),
            attribution: self.attribution.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}
