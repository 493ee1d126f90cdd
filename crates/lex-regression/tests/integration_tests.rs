//! Integration tests for the regression learner.
//!
//! These tests train end to end on small in-memory frames and on the CSV
//! fixtures under `tests/fixtures`.

use approx::assert_relative_eq;
use lex_regression::{
    AttributionStrategy, CancellationToken, ColumnPlan, ColumnSpec, FittedModel,
    IncrementalSolver, Learner, NormalEquationsSolver, PREDICTION_COLUMN,
    PREDICTION_ERROR_COLUMN, ParameterKey, RegressionConfig, RegressionContent, RegressionError,
    RegressionResult, RowEncoder, SourceRow, TableSpec, TrainingStage, VectorLengthPolicy,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::Cell;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_csv(filename: &str) -> DataFrame {
    let path = fixtures_path().join(filename);
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path))
        .expect("Failed to create CSV reader")
        .finish()
        .expect("Failed to read CSV file")
}

fn config(target: &str) -> RegressionConfig {
    RegressionConfig::builder()
        .target_column(target)
        .build()
        .unwrap()
}

fn fit(df: &DataFrame, config: RegressionConfig) -> RegressionResult<RegressionContent> {
    let spec = TableSpec::from_dataframe(df)?;
    Learner::builder().config(config).build()?.fit(df, &spec)
}

fn linear_frame(rows: usize) -> DataFrame {
    let x: Vec<f64> = (0..rows).map(|i| i as f64).collect();
    let y: Vec<f64> = x.iter().map(|x| 2.0 * x).collect();
    df! { "x" => x, "y" => y }.unwrap()
}

/// Solver that cancels a token after a number of updates and records
/// whether a result was ever requested.
struct CancellingSolver {
    inner: NormalEquationsSolver,
    token: CancellationToken,
    cancel_after: usize,
    updates: usize,
    result_requested: Cell<bool>,
}

impl IncrementalSolver for CancellingSolver {
    fn columns(&self) -> usize {
        self.inner.columns()
    }

    fn update(&mut self, features: &[f64], target: f64) {
        self.updates += 1;
        if self.updates == self.cancel_after {
            self.token.cancel();
        }
        self.inner.update(features, target);
    }

    fn result(&self) -> RegressionResult<FittedModel> {
        self.result_requested.set(true);
        self.inner.result()
    }
}

// ============================================================================
// End-to-End Fits
// ============================================================================

#[test]
fn test_perfect_line() {
    let df = df! {
        "x" => [1.0, 2.0, 3.0, 4.0, 5.0],
        "y" => [2.0, 4.0, 6.0, 8.0, 10.0],
    }
    .unwrap();

    let content = fit(&df, config("y")).unwrap();

    assert_eq!(content.coefficients().len(), 2);
    assert_relative_eq!(content.intercept().unwrap(), 0.0, epsilon = 1e-9);
    assert_relative_eq!(content.coefficients()[1], 2.0, epsilon = 1e-9);
    assert_relative_eq!(content.r_squared(), 1.0, epsilon = 1e-9);
    assert_eq!(content.value_count(), 5);
    assert_eq!(content.degrees_of_freedom(), 3);
    // residuals are zero, so the standard errors are too; no panic either way
    assert!(content.std_errors().iter().all(|se| *se >= 0.0 || se.is_nan()));
    assert_eq!(content.results_table().len(), 2);
}

#[test]
fn test_fixture_with_factor() {
    let df = load_csv("paint_sales.csv");

    let content = fit(&df, config("sales")).unwrap();

    assert_eq!(content.factors(), &["color"]);
    assert_eq!(content.covariates(), &["area"]);
    assert_eq!(
        content.domain_values()["color"],
        vec!["Blue", "Green", "Red"]
    );
    assert_eq!(
        content.parameter_names(),
        &["color=Green", "color=Red", "area"]
    );

    let coefficients = content.coefficients_by_parameter();
    assert_relative_eq!(
        coefficients[&ParameterKey::new("color=Green", 1)],
        2.0,
        epsilon = 1e-8
    );
    assert_relative_eq!(
        coefficients[&ParameterKey::new("color=Red", 1)],
        -3.0,
        epsilon = 1e-8
    );
    assert_relative_eq!(coefficients[&ParameterKey::new("area", 1)], 1.5, epsilon = 1e-8);
    assert_relative_eq!(content.intercept().unwrap(), 4.0, epsilon = 1e-8);
    assert!(content.warning().is_none());
}

#[test]
fn test_noisy_dataset_statistics() {
    let mut rng = StdRng::seed_from_u64(42);
    let n = 200;
    let x: Vec<f64> = (0..n).map(|i| i as f64 * 0.1).collect();
    let z: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let y: Vec<f64> = x
        .iter()
        .map(|x| 3.0 + 1.5 * x + rng.gen_range(-0.5..0.5))
        .collect();
    let df = df! { "x" => x, "z" => z, "y" => y }.unwrap();

    let content = fit(&df, config("y")).unwrap();

    let coefficients = content.coefficients_by_parameter();
    assert_relative_eq!(coefficients[&ParameterKey::new("x", 1)], 1.5, epsilon = 0.05);
    assert_relative_eq!(content.intercept().unwrap(), 3.0, epsilon = 0.25);
    assert!(content.p_values_by_parameter()[&ParameterKey::new("x", 1)] < 1e-10);
    assert!(content.r_squared() > 0.99);
    assert!(content.adjusted_r_squared() < content.r_squared());
    assert_eq!(content.degrees_of_freedom(), n as i64 - 3);

    for row in content.results_table() {
        let p = row.p_value.unwrap();
        assert!((0.0..=1.0).contains(&p));
        assert!(row.std_err.unwrap() > 0.0);
    }
}

#[test]
fn test_quadratic_fit() {
    let x: Vec<f64> = (-5..=5).map(f64::from).collect();
    let y: Vec<f64> = x.iter().map(|x| 1.0 - 2.0 * x + 0.5 * x * x).collect();
    let df = df! { "x" => x, "y" => y }.unwrap();

    let content = fit(
        &df,
        RegressionConfig::builder()
            .target_column("y")
            .max_exponent(2)
            .build()
            .unwrap(),
    )
    .unwrap();

    let coefficients = content.coefficients_by_parameter();
    assert_relative_eq!(coefficients[&ParameterKey::new("x", 1)], -2.0, epsilon = 1e-8);
    assert_relative_eq!(coefficients[&ParameterKey::new("x", 2)], 0.5, epsilon = 1e-8);
    assert_relative_eq!(content.intercept().unwrap(), 1.0, epsilon = 1e-8);
}

#[test]
fn test_covariate_with_large_mean_is_kept() {
    let x: Vec<f64> = (0..20).map(|i| 1e6 + f64::from(i)).collect();
    let y: Vec<f64> = (0..20)
        .map(|i| 3.0 * f64::from(i) + 5.0 + if i % 2 == 0 { -0.1 } else { 0.1 })
        .collect();
    let df = df! { "x" => x, "y" => y }.unwrap();

    let content = fit(&df, config("y")).unwrap();

    assert!(content.warning().is_none(), "{:?}", content.warning());
    let slope = content.coefficients_by_parameter()[&ParameterKey::new("x", 1)];
    assert_relative_eq!(slope, 3.0, epsilon = 0.01);
    // fitted value at the first row
    assert_relative_eq!(content.intercept().unwrap() + slope * 1e6, 5.0, epsilon = 0.1);
    assert!(content.p_values()[1] < 1e-10);
}

#[test]
fn test_nominal_target_fit() {
    let df = df! {
        "x" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
        "label" => ["low", "low", "low", "low", "high", "high", "high", "high"],
    }
    .unwrap();

    // sorted domain is [high, low], so "low" rows encode as 1
    let content = fit(&df, config("label")).unwrap();
    assert_eq!(content.target(), "label");
    assert_eq!(content.parameter_names(), &["x"]);
    assert_relative_eq!(content.coefficients()[1], -8.0 / 42.0, epsilon = 1e-10);
    assert_relative_eq!(content.intercept().unwrap(), 0.5 + 4.5 * 8.0 / 42.0, epsilon = 1e-10);

    // moving "high" to the end flips the encoding
    let flipped = fit(
        &df,
        RegressionConfig::builder()
            .target_column("label")
            .target_reference_category("high")
            .build()
            .unwrap(),
    )
    .unwrap();
    assert_relative_eq!(flipped.coefficients()[1], 8.0 / 42.0, epsilon = 1e-10);
}

#[test]
fn test_numeric_like_factor_labels() {
    // 20 numeric and 10 alphanumeric labels, two rows each
    let labels: Vec<String> = (0..30)
        .map(|k| {
            if k % 3 == 0 {
                format!("{}a", k)
            } else {
                format!("{}", k * 7 % 40)
            }
        })
        .collect();
    let code: Vec<String> = labels.iter().chain(labels.iter()).cloned().collect();
    let y: Vec<f64> = (0..60).map(|i| (i % 30) as f64 + if i < 30 { 0.0 } else { 0.5 }).collect();
    let df = df! { "code" => code, "y" => y }.unwrap();

    let content = fit(&df, config("y")).unwrap();

    let domain = &content.domain_values()["code"];
    assert_eq!(domain.len(), 30);
    // numeric order, not "1" < "11" < "3"
    assert_eq!(&domain[..5], &["1", "3", "7", "9", "11"]);
    assert_eq!(domain[20], "0a");
    assert_eq!(domain.last().map(String::as_str), Some("9a"));
    assert_eq!(content.parameter_names().len(), 29);
    assert!(!content.parameter_names().contains(&"code=1".to_string()));
    assert_eq!(content.degrees_of_freedom(), 30);
}

#[test]
fn test_exact_vector_policy_fit() {
    let rows = [[1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [2.0, 1.0], [1.0, 3.0], [3.0, 2.0]];
    let vectors: Vec<Series> = rows
        .iter()
        .map(|v| Series::new("".into(), v.to_vec()))
        .collect();
    let y: Vec<f64> = rows.iter().map(|v| 1.0 + 2.0 * v[0] - v[1]).collect();
    let df = df! { "v" => vectors, "y" => y }.unwrap();
    let spec = TableSpec::new(vec![ColumnSpec::vector("v"), ColumnSpec::numeric("y")]);
    let config = RegressionConfig::builder()
        .target_column("y")
        .vector_length_policy(VectorLengthPolicy::Exact)
        .build()
        .unwrap();

    let content = Learner::builder()
        .config(config.clone())
        .build()
        .unwrap()
        .fit(&df, &spec)
        .unwrap();

    assert_eq!(content.parameter_names(), &["v[0]", "v[1]"]);
    let coefficients = content.coefficients_by_parameter();
    assert_relative_eq!(coefficients[&ParameterKey::new("v[0]", 1)], 2.0, epsilon = 1e-9);
    assert_relative_eq!(coefficients[&ParameterKey::new("v[1]", 1)], -1.0, epsilon = 1e-9);
    assert_relative_eq!(content.intercept().unwrap(), 1.0, epsilon = 1e-9);
    assert_eq!(content.skipped_rows(), 0);

    let ragged = df! {
        "v" => [
            Series::new("".into(), &[1.0, 2.0]),
            Series::new("".into(), &[3.0]),
        ],
        "y" => [1.0, 2.0],
    }
    .unwrap();
    let err = Learner::builder()
        .config(config)
        .build()
        .unwrap()
        .fit(&ragged, &spec)
        .unwrap_err();
    assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
}

// ============================================================================
// Encoding
// ============================================================================

#[test]
fn test_color_factor_encoding() {
    let spec = TableSpec::new(vec![
        ColumnSpec::nominal("Color", ["Red", "Green", "Blue"]),
        ColumnSpec::numeric("y"),
    ]);
    let config = RegressionConfig::builder()
        .target_column("y")
        .sort_factor_categories(false)
        .build()
        .unwrap();
    let plan = ColumnPlan::build(&spec, &DataFrame::empty(), &config).unwrap();
    let encoder = RowEncoder::new(&plan);

    let encode = |color: &'static str| {
        encoder
            .encode(&SourceRow {
                index: 0,
                learning: vec![AnyValue::String(color)],
                target: AnyValue::Float64(1.0),
            })
            .unwrap()
            .parameters
    };

    assert_eq!(plan.parameter_count(), 2);
    assert_eq!(encode("Green"), vec![1.0, 0.0]);
    assert_eq!(encode("Blue"), vec![0.0, 1.0]);
    assert_eq!(encode("Red"), vec![0.0, 0.0]);
}

#[test]
fn test_vector_column_names_and_padding() {
    let vectors: Vec<Series> = [
        vec![1.0, 2.0],
        vec![2.0, 1.0],
        vec![3.0, 4.0],
        vec![4.0, 3.0],
        vec![5.0, 6.0],
        vec![6.0, 5.0],
        vec![7.0, 8.0],
        vec![1.0],
    ]
    .into_iter()
    .map(|v| Series::new("".into(), v))
    .collect();
    let df = df! {
        "v" => vectors,
        "x" => [0.5, 1.5, 1.0, 3.0, 2.5, 4.0, 3.5, 2.0],
        "y" => [1.0, 3.0, 2.0, 5.0, 4.0, 6.0, 8.0, 7.0],
    }
    .unwrap();

    let content = fit(
        &df,
        RegressionConfig::builder()
            .target_column("y")
            .max_exponent(2)
            .build()
            .unwrap(),
    )
    .unwrap();

    assert_eq!(content.vector_lengths()["v"], 2);
    assert_eq!(content.parameter_names(), &["v[0]", "v[1]", "x"]);
    assert_eq!(
        content.values_by_parameter(content.coefficients().as_slice()).len(),
        content.parameter_names().len() * 2
    );
    // the short vector is padded with NaN and left out of the fit
    assert_eq!(content.value_count(), 7);
    assert_eq!(content.skipped_rows(), 1);
    // seven rows for seven coefficients
    assert_eq!(content.degrees_of_freedom(), 0);
    assert!(content.p_values().iter().all(|p| p.is_nan()));
    assert!(content.results_table().iter().all(|r| r.p_value.is_none()));
}

// ============================================================================
// Redundant Columns
// ============================================================================

#[test]
fn test_squared_dummy_is_redundant() {
    let df = df! {
        "color" => ["a", "b", "a", "b", "b", "a", "b", "a", "a", "b"],
        "x" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
        "y" => [1.2, 7.9, 7.1, 16.8, 22.4, 22.0, 38.2, 37.9, 47.1, 64.3],
    }
    .unwrap();

    let content = fit(
        &df,
        RegressionConfig::builder()
            .target_column("y")
            .max_exponent(2)
            .build()
            .unwrap(),
    )
    .unwrap();

    let warning = content.warning().expect("redundant column warning");
    assert!(warning.contains("color^2"), "{}", warning);
    assert!(!warning.contains("x^2"), "{}", warning);

    let dummy_squared = ParameterKey::new("color=b", 2);
    assert_eq!(content.coefficients_by_parameter()[&dummy_squared], 0.0);

    let row = content
        .results_table()
        .into_iter()
        .find(|r| r.parameter == "color=b" && r.degree == 2)
        .unwrap();
    assert_eq!(row.coefficient, Some(0.0));
    assert_eq!(row.std_err, None);
    assert_eq!(row.p_value, None);
}

#[test]
fn test_uniform_attribution_strategy() {
    let df = df! {
        "color" => ["a", "b", "c", "a", "b", "c", "a", "b", "c", "a"],
        "x" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
        "y" => [1.0, 4.5, 8.8, 13.1, 20.0, 30.2, 37.9, 50.1, 64.8, 79.3],
    }
    .unwrap();
    let build = |strategy| {
        RegressionConfig::builder()
            .target_column("y")
            .max_exponent(2)
            .attribution(strategy)
            .build()
            .unwrap()
    };

    let slot_aware = fit(&df, build(AttributionStrategy::SlotAware)).unwrap();
    let uniform = fit(&df, build(AttributionStrategy::Uniform)).unwrap();

    // both dummies squared are redundant; per degree: color=b, color=c, x
    assert!(slot_aware.warning().unwrap().contains(": color^2."));
    // uniform math assumes one slot per column and misnames the terms
    assert!(uniform.warning().is_some());
    assert_ne!(slot_aware.warning(), uniform.warning());
    assert_eq!(
        slot_aware.coefficients().as_slice(),
        uniform.coefficients().as_slice()
    );
}

// ============================================================================
// Missing Values and Integrity
// ============================================================================

fn frame_with_missing() -> DataFrame {
    df! {
        "color" => [Some("a"), Some("b"), Some("a"), None, Some("b"), Some("a")],
        "x" => [Some(1.0), Some(2.0), None, Some(4.0), Some(5.0), Some(6.0)],
        "y" => [1.0, 3.0, 2.0, 5.0, 4.0, 6.0],
    }
    .unwrap()
}

#[test]
fn test_tolerant_mode_skips_rows() {
    let content = fit(&frame_with_missing(), config("y")).unwrap();

    assert_eq!(content.value_count(), 4);
    assert_eq!(content.skipped_rows(), 2);
    // means over the four used rows: x = 1, 2, 5, 6
    assert_relative_eq!(
        content.means_by_parameter()[&ParameterKey::new("x", 1)],
        3.5
    );
}

#[test]
fn test_fail_fast_mode_reports_missing_cell() {
    let config = RegressionConfig::builder()
        .target_column("y")
        .fail_on_missing(true)
        .build()
        .unwrap();

    let err = fit(&frame_with_missing(), config).unwrap_err();
    match err {
        RegressionError::MissingValue { column, row } => {
            assert_eq!(column, "x");
            assert_eq!(row, 2);
        }
        other => panic!("expected MissingValue, got {:?}", other),
    }
}

#[test]
fn test_stale_domain_is_integrity_error() {
    let df = df! {
        "color" => ["a", "b", "c"],
        "y" => [1.0, 2.0, 3.0],
    }
    .unwrap();
    let mut spec = TableSpec::from_dataframe(&df).unwrap();
    spec.set_domain("color", ["a", "b"]).unwrap();

    let stages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&stages);
    let err = Learner::builder()
        .config(config("y"))
        .on_progress(move |update| sink.lock().unwrap().push(update.stage))
        .build()
        .unwrap()
        .fit(&df, &spec)
        .unwrap_err();

    assert_eq!(err.error_code(), "DATA_INTEGRITY");
    assert!(!err.is_cancelled());
    assert_eq!(stages.lock().unwrap().last(), Some(&TrainingStage::Failed));
}

// ============================================================================
// Configuration Errors
// ============================================================================

#[test]
fn test_factor_without_domain() {
    let df = df! { "color" => ["a", "b"], "y" => [1.0, 2.0] }.unwrap();
    let spec = TableSpec::without_domains(&df);

    let err = Learner::builder()
        .config(config("y"))
        .build()
        .unwrap()
        .fit(&df, &spec)
        .unwrap_err();
    assert!(matches!(err, RegressionError::Configuration(_)));
}

#[test]
fn test_unknown_target_reference_category() {
    let df = df! {
        "x" => [1.0, 2.0, 3.0],
        "label" => ["low", "high", "low"],
    }
    .unwrap();
    let config = RegressionConfig::builder()
        .target_column("label")
        .target_reference_category("medium")
        .build()
        .unwrap();

    let err = fit(&df, config).unwrap_err();
    assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
}

#[test]
fn test_unknown_target_column() {
    let err = fit(&linear_frame(5), config("missing")).unwrap_err();
    assert!(matches!(err, RegressionError::ColumnNotFound(_)));
}

#[test]
fn test_empty_model_without_constant() {
    let config = RegressionConfig::builder()
        .target_column("y")
        .learning_columns(Vec::<String>::new())
        .include_constant(false)
        .build()
        .unwrap();

    let err = fit(&linear_frame(5), config).unwrap_err();
    assert!(matches!(err, RegressionError::Configuration(_)));
}

// ============================================================================
// Cancellation
// ============================================================================

#[test]
fn test_cancellation_stops_within_one_interval() {
    let df = linear_frame(10_000);
    let spec = TableSpec::from_dataframe(&df).unwrap();
    let token = CancellationToken::new();
    let learner = Learner::builder()
        .config(config("y"))
        .cancellation_token(token.clone())
        .build()
        .unwrap();
    let interval = learner.config().cancel_check_interval;

    let mut solver = CancellingSolver {
        inner: NormalEquationsSolver::new(1, true),
        token,
        cancel_after: 5,
        updates: 0,
        result_requested: Cell::new(false),
    };
    let result = learner.fit_with(&df, &spec, &mut solver);

    assert!(matches!(result, Err(RegressionError::Cancelled)));
    assert!(solver.updates >= 5);
    assert!(solver.updates <= 5 + interval);
    assert!(!solver.result_requested.get());
}

#[test]
fn test_cancellation_from_progress_callback() {
    let df = linear_frame(10_000);
    let spec = TableSpec::from_dataframe(&df).unwrap();
    let token = CancellationToken::new();
    let trigger = token.clone();
    let scanned = Arc::new(Mutex::new(0usize));
    let last_scanned = Arc::clone(&scanned);
    let stages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&stages);

    let result = Learner::builder()
        .config(
            RegressionConfig::builder()
                .target_column("y")
                .cancel_check_interval(1)
                .build()
                .unwrap(),
        )
        .cancellation_token(token)
        .on_progress(move |update| {
            if let Some(processed) = update.items_processed {
                *last_scanned.lock().unwrap() = processed;
                if processed >= 5 {
                    trigger.cancel();
                }
            }
            sink.lock().unwrap().push(update.stage);
        })
        .build()
        .unwrap()
        .fit(&df, &spec);

    assert!(matches!(result, Err(RegressionError::Cancelled)));
    assert_eq!(*scanned.lock().unwrap(), 5);
    let stages = stages.lock().unwrap();
    assert_eq!(stages.last(), Some(&TrainingStage::Cancelled));
    assert!(!stages.contains(&TrainingStage::Solving));
}

// ============================================================================
// Output
// ============================================================================

#[test]
fn test_results_frame_from_fixture() {
    let df = load_csv("paint_sales.csv");
    let content = fit(&df, config("sales")).unwrap();
    let results = content.results_frame().unwrap();

    assert_eq!(results.height(), 4);
    let parameters: Vec<Option<&str>> = results
        .column("Parameter")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(
        parameters,
        vec![Some("color=Green"), Some("color=Red"), Some("area"), Some("Intercept")]
    );
}

#[test]
fn test_append_predictions_to_fixture() {
    let df = load_csv("paint_sales.csv");
    let content = fit(&df, config("sales")).unwrap();

    let scored = content.append_predictions(&df).unwrap();
    assert_eq!(scored.height(), 12);
    assert_eq!(scored.width(), 5);

    let predicted = scored.column(PREDICTION_COLUMN).unwrap().f64().unwrap();
    // Red, area 2.0: 4 + 1.5 * 2 - 3
    assert_relative_eq!(predicted.get(0).unwrap(), 4.0, epsilon = 1e-8);
    let errors = scored.column(PREDICTION_ERROR_COLUMN).unwrap().f64().unwrap();
    assert!(errors.into_iter().all(|e| e.unwrap() < 1e-8));
}

#[test]
fn test_predictions_on_new_rows() {
    let content = fit(&load_csv("paint_sales.csv"), config("sales")).unwrap();
    let new_rows = df! {
        "color" => [Some("Green"), Some("Blue"), None],
        "area" => [Some(2.0), Some(4.0), Some(1.0)],
        "sales" => [Some(10.0), None, Some(1.0)],
    }
    .unwrap();

    let predictions = content.predict(&new_rows).unwrap();

    assert_relative_eq!(predictions.predicted[0].unwrap(), 9.0, epsilon = 1e-8);
    assert_relative_eq!(predictions.errors[0].unwrap(), 1.0, epsilon = 1e-8);
    assert_eq!(predictions.predicted[1], None);
    assert_eq!(predictions.predicted[2], None);
    assert_relative_eq!(predictions.mean_squared_error(), 1.0 / 3.0, epsilon = 1e-8);

    let unknown = df! {
        "color" => ["Purple"],
        "area" => [1.0],
        "sales" => [1.0],
    }
    .unwrap();
    let err = content.predict(&unknown).unwrap_err();
    assert_eq!(err.error_code(), "DATA_INTEGRITY");
}

#[test]
fn test_content_json_shape() {
    let content = fit(&load_csv("paint_sales.csv"), config("sales")).unwrap();
    let json = serde_json::to_value(&content).unwrap();

    assert_eq!(json["target"], "sales");
    assert_eq!(json["value_count"], 12);
    assert_eq!(json["include_constant"], true);
    assert_eq!(json["parameter_names"][2], "area");
}
