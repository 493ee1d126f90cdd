//! Mapping from coefficient index to model term.
//!
//! Used only to word the warning about redundant columns. Two mappings are
//! available. [`slot_attribution`] walks the real slot widths and is exact
//! for any mix of factors, vectors and covariates. [`uniform_attribution`]
//! assumes every learning column owns exactly one slot per degree; it names
//! the wrong column as soon as a factor or vector column is present.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which attribution function a model uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionStrategy {
    /// Walk the per-column slot widths.
    #[default]
    SlotAware,
    /// One slot per column per degree.
    Uniform,
}

impl AttributionStrategy {
    pub fn function(self) -> AttributionFn {
        match self {
            Self::SlotAware => slot_attribution,
            Self::Uniform => uniform_attribution,
        }
    }
}

/// A learning column raised to a power.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub column: String,
    pub exponent: u32,
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exponent > 1 {
            write!(f, "{}^{}", self.column, self.exponent)
        } else {
            f.write_str(&self.column)
        }
    }
}

/// Column layout the attribution functions read.
#[derive(Debug, Clone, Copy)]
pub struct TermLayout<'a> {
    pub fields: &'a [String],
    /// Base slots of each field, parallel to `fields`.
    pub widths: &'a [usize],
    pub include_constant: bool,
}

/// Maps a coefficient index (intercept included) to its term; `None` for
/// the intercept and out-of-range indices.
pub type AttributionFn = fn(&TermLayout<'_>, usize) -> Option<Term>;

pub fn slot_attribution(layout: &TermLayout<'_>, index: usize) -> Option<Term> {
    let slot = regressor_index(layout, index)?;
    let per_degree: usize = layout.widths.iter().sum();
    if per_degree == 0 {
        return None;
    }
    let exponent = u32::try_from(slot / per_degree + 1).ok()?;
    let mut within = slot % per_degree;
    for (field, width) in layout.fields.iter().zip(layout.widths) {
        if within < *width {
            return Some(Term {
                column: field.clone(),
                exponent,
            });
        }
        within -= width;
    }
    None
}

pub fn uniform_attribution(layout: &TermLayout<'_>, index: usize) -> Option<Term> {
    let slot = regressor_index(layout, index)?;
    let size = layout.fields.len();
    if size == 0 {
        return None;
    }
    Some(Term {
        column: layout.fields[slot % size].clone(),
        exponent: u32::try_from(slot / size + 1).ok()?,
    })
}

fn regressor_index(layout: &TermLayout<'_>, index: usize) -> Option<usize> {
    if layout.include_constant {
        index.checked_sub(1)
    } else {
        Some(index)
    }
}
