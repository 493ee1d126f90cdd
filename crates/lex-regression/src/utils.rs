//! Shared utilities for reading polars cells.
//!
//! Column classification and per-cell extraction live here so the schema
//! view, the plan builder and the row encoder all agree on what a cell means.

use polars::prelude::*;
use std::cmp::Ordering;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType holds category labels.
#[inline]
pub fn is_nominal_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::String
            | DataType::Boolean
            | DataType::Categorical(_, _)
            | DataType::Enum(_, _)
    )
}

/// Check if a DataType holds a variable or fixed length numeric vector per cell.
///
/// Lists and arrays of numbers or booleans qualify, as do binary cells
/// (read as byte vectors).
#[inline]
pub fn is_vector_dtype(dtype: &DataType) -> bool {
    match dtype {
        DataType::List(inner) | DataType::Array(inner, _) => {
            is_numeric_dtype(inner) || matches!(inner.as_ref(), DataType::Boolean)
        }
        DataType::Binary => true,
        _ => false,
    }
}

// =============================================================================
// Cell Utilities
// =============================================================================

/// Category label of a nominal cell, or `None` for null and non-nominal cells.
pub fn category_key(value: &AnyValue) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::Boolean(b) => Some(b.to_string()),
        other => other.get_str().map(str::to_string),
    }
}

/// Numeric value of a scalar cell. Booleans read as 0/1.
pub fn numeric_value(value: &AnyValue) -> Option<f64> {
    match value {
        AnyValue::Null => None,
        AnyValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        AnyValue::String(_) | AnyValue::StringOwned(_) => None,
        other => other.extract::<f64>(),
    }
}

/// Elements of a vector cell as floats; null elements become NaN.
///
/// Returns `None` for null cells and for cells that are not vectors.
pub fn vector_elements(value: &AnyValue) -> Option<Vec<f64>> {
    match value {
        AnyValue::List(series) | AnyValue::Array(series, _) => series_to_f64(series),
        AnyValue::Binary(bytes) => Some(bytes.iter().map(|&b| f64::from(b)).collect()),
        AnyValue::BinaryOwned(bytes) => Some(bytes.iter().map(|&b| f64::from(b)).collect()),
        _ => None,
    }
}

/// Element count of a vector cell without materializing its values.
pub fn vector_length(value: &AnyValue) -> Option<usize> {
    match value {
        AnyValue::List(series) | AnyValue::Array(series, _) => Some(series.len()),
        AnyValue::Binary(bytes) => Some(bytes.len()),
        AnyValue::BinaryOwned(bytes) => Some(bytes.len()),
        _ => None,
    }
}

fn series_to_f64(series: &Series) -> Option<Vec<f64>> {
    let casted = series.cast(&DataType::Float64).ok()?;
    let values = casted.f64().ok()?;
    Some(values.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

/// Ordering used when sorting category labels.
///
/// Numeric labels come first and compare numerically, so "2" sorts before
/// "10". All other labels follow in lexicographic order. Ties between equal
/// numbers ("1" and "1.0") fall back to the text, keeping the order total.
pub fn compare_categories(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
