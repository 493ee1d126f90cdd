//! CLI entry point for the polynomial regression learner.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use lex_regression::{
    Learner, RegressionConfig, RegressionContent, ResultRow, TableSpec, VectorLengthPolicy,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// CLI-compatible vector length policy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliVectorPolicy {
    /// Longest vector in the data; shorter vectors are padded with missing values
    Bounded,
    /// Every vector must have the same length
    Exact,
}

impl From<CliVectorPolicy> for VectorLengthPolicy {
    fn from(cli: CliVectorPolicy) -> Self {
        match cli {
            CliVectorPolicy::Bounded => VectorLengthPolicy::Bounded,
            CliVectorPolicy::Exact => VectorLengthPolicy::Exact,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Polynomial Linear Regression",
    long_about = "Fits a polynomial linear regression to a CSV file and prints \
                  coefficient statistics.\n\n\
                  EXAMPLES:\n  \
                  # Regress price on every other column\n  \
                  lex-regression -i houses.csv -t price\n\n  \
                  # Quadratic model on two columns, JSON output\n  \
                  lex-regression -i houses.csv -t price -c area,rooms --max-exponent 2 --json\n\n  \
                  # Fail on the first missing value\n  \
                  lex-regression -i houses.csv -t price --fail-on-missing"
)]
struct Args {
    /// Path to the CSV file to train on
    #[arg(short, long)]
    input: String,

    /// Target column
    #[arg(short, long)]
    target: String,

    /// Learning columns, comma separated
    ///
    /// If not specified, every column except the target is used
    #[arg(short = 'c', long, value_delimiter = ',')]
    columns: Option<Vec<String>>,

    /// Highest polynomial degree
    #[arg(long, default_value = "1")]
    max_exponent: u32,

    /// Do not fit an intercept
    #[arg(long)]
    no_constant: bool,

    /// Fixed intercept used together with --no-constant
    #[arg(long, default_value = "0.0")]
    offset: f64,

    /// Abort on the first missing value instead of skipping the row
    #[arg(long)]
    fail_on_missing: bool,

    /// Keep categories in order of first appearance instead of sorting them
    #[arg(long)]
    no_sort_categories: bool,

    /// Reference category of a nominal target
    #[arg(long)]
    target_reference: Option<String>,

    /// How vector column lengths are determined
    #[arg(long, value_enum, default_value = "bounded")]
    vector_policy: CliVectorPolicy,

    /// Write the input table with prediction and error columns to this CSV file
    #[arg(short, long)]
    predictions: Option<PathBuf>,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// JSON document printed by `--json`.
#[derive(Serialize)]
struct JsonReport<'a> {
    content: &'a RegressionContent,
    results: Vec<ResultRow>,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    info!("Loading dataset from: {}", args.input);
    let data = load_csv(&args.input)?;
    info!("Dataset loaded successfully: {:?}", data.shape());

    let spec = TableSpec::from_dataframe(&data)?;
    let config = build_config(&args)?;

    let mut builder = Learner::builder().config(config);
    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }
    let learner = builder.build()?;

    info!("{}", "=".repeat(80));
    info!("Training polynomial regression on '{}'...", args.target);
    info!("{}", "=".repeat(80));

    let content = match learner.fit(&data, &spec) {
        Ok(content) => content,
        Err(e) => {
            error!("Training failed: {}", e);
            return Err(anyhow!("Training failed: {}", e));
        }
    };

    if let Some(ref path) = args.predictions {
        write_predictions(&content, &data, path)?;
    }

    if args.json {
        let report = JsonReport {
            content: &content,
            results: content.results_table(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_human_readable_summary(&content, &args);
    Ok(())
}

fn load_csv(path: &str) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
        .map_err(|e| anyhow!("Failed to read {}: {}", path, e))
}

fn write_predictions(content: &RegressionContent, data: &DataFrame, path: &Path) -> Result<()> {
    let mut scored = content.append_predictions(data)?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(&mut scored)?;
    info!("Predictions saved: {}", path.display());
    Ok(())
}

fn build_config(args: &Args) -> Result<RegressionConfig> {
    let mut builder = RegressionConfig::builder()
        .target_column(&args.target)
        .max_exponent(args.max_exponent)
        .include_constant(!args.no_constant)
        .offset_value(args.offset)
        .fail_on_missing(args.fail_on_missing)
        .sort_factor_categories(!args.no_sort_categories)
        .sort_target_categories(!args.no_sort_categories)
        .vector_length_policy(args.vector_policy.into());

    if let Some(ref columns) = args.columns {
        builder = builder.learning_columns(columns.iter().map(|c| c.trim()));
    }
    if let Some(ref reference) = args.target_reference {
        builder = builder.target_reference_category(reference);
    }

    Ok(builder.build()?)
}

/// Print the fit summary and coefficient table.
fn print_human_readable_summary(content: &RegressionContent, args: &Args) {
    println!();
    println!("{}", "=".repeat(80));
    println!("REGRESSION COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!("Input:  {}", args.input);
    println!("Target: {}", content.target());
    println!("Degree: {}", content.max_exponent());
    if !content.include_constant() {
        println!("Fixed intercept: {}", content.offset_value());
    }
    println!();

    println!("Fit Summary:");
    println!("  Rows used: {}", content.value_count());
    println!("  Rows skipped: {}", content.skipped_rows());
    println!("  Parameters: {}", content.parameter_count());
    println!("  Degrees of freedom: {}", content.degrees_of_freedom());
    println!("  R²: {}", format_value(Some(content.r_squared())));
    println!(
        "  Adjusted R²: {}",
        format_value(Some(content.adjusted_r_squared()))
    );
    println!();

    if let Some(warning) = content.warning() {
        println!("WARNING: {}", warning);
        println!();
    }

    println!(
        "{:<30} {:>6} {:>14} {:>14} {:>10} {:>10}",
        "Parameter", "Degree", "Coefficient", "StdErr", "t-value", "P>|t|"
    );
    println!("{}", "-".repeat(89));
    for row in content.results_table() {
        println!(
            "{:<30} {:>6} {:>14} {:>14} {:>10} {:>10}",
            truncate_str(&row.parameter, 29),
            row.degree,
            format_value(row.coefficient),
            format_value(row.std_err),
            format_value(row.t_value),
            format_value(row.p_value)
        );
    }
    println!("{}", "=".repeat(80));
}

/// Render a statistic, `?` when it is undefined.
fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) if !v.is_nan() => format!("{:.4}", v),
        _ => "?".to_string(),
    }
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
