//! Dense scalar fields over the mesh points.

use serde::{Deserialize, Serialize};

/// A scalar value per mesh point (temperature in K for the marina model).
///
/// Fields are only produced by reconstruction and are never mutated after
/// publication; sessions share them behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    values: Vec<f64>,
}

impl Field {
    /// Wraps an existing vector of per-point values.
    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Number of mesh points.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the field has no points.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Per-point values in mesh order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Returns `(min, max)` over finite values, or `None` if there are none.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let mut range: Option<(f64, f64)> = None;
        for &v in self.values.iter().filter(|v| v.is_finite()) {
            range = Some(match range {
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
                None => (v, v),
            });
        }
        range
    }

    /// Arithmetic mean of all values (NaN for an empty field).
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return f64::NAN;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Largest absolute per-point difference to `other`.
    ///
    /// Returns `f64::INFINITY` when the lengths differ.
    pub fn max_abs_diff(&self, other: &Field) -> f64 {
        if self.len() != other.len() {
            return f64::INFINITY;
        }
        self.values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

impl AsRef<[f64]> for Field {
    fn as_ref(&self) -> &[f64] {
        &self.values
    }
}
