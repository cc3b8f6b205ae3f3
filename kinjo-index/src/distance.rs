//! # Distance Metrics
//!
//! The metric family shared by every index: L2, squared L2, cosine
//! distance and negative inner product. All metrics return a value where
//! **lower means more similar**, so every index can rank candidates with
//! one comparison direction.
//!
//! Metrics are pure functions and fail only on malformed input: dimension
//! mismatch, empty vectors, or a domain violation (cosine of a zero
//! vector). A metric is chosen at index construction and cannot be swapped
//! afterwards.

use serde::{Deserialize, Serialize};

use kinjo_core::error::{Error, Result};

/// Distance metric used for vector similarity computation.
///
/// Represented as a plain tagged value so it can live inside index
/// configuration, be copied freely, and be serialized alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    /// Euclidean distance: `sqrt(sum((a[i] - b[i])^2))`. Range: [0, ∞).
    L2,
    /// Squared Euclidean distance. Same ranking as [`Metric::L2`] without
    /// the square root; preferred when only rank order matters.
    SquaredL2,
    /// Cosine distance: `1 - cos(a, b)`. Range: [0, 2]. Errors on a zero
    /// vector.
    Cosine,
    /// Negative inner product: `-dot(a, b)`. A signed
    /// similarity-as-distance; more aligned pairs score lower.
    InnerProduct,
}

impl Metric {
    /// Compute the distance between two equal-dimension vectors.
    pub fn distance(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        match self {
            Metric::L2 => l2_distance(a, b),
            Metric::SquaredL2 => l2_distance_squared(a, b),
            Metric::Cosine => cosine_distance(a, b),
            Metric::InnerProduct => inner_product_distance(a, b),
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Metric::L2 => "l2",
            Metric::SquaredL2 => "squared-l2",
            Metric::Cosine => "cosine",
            Metric::InnerProduct => "inner-product",
        };
        write!(f, "{name}")
    }
}

fn check_pair(a: &[f64], b: &[f64]) -> Result<()> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    if a.is_empty() {
        return Err(Error::InvalidVector {
            message: "cannot calculate distance for empty vectors".to_string(),
        });
    }
    Ok(())
}

/// Euclidean (L2) distance.
pub fn l2_distance(a: &[f64], b: &[f64]) -> Result<f64> {
    Ok(l2_distance_squared(a, b)?.sqrt())
}

/// Squared Euclidean distance. Avoids the square root; order-equivalent to
/// [`l2_distance`].
pub fn l2_distance_squared(a: &[f64], b: &[f64]) -> Result<f64> {
    check_pair(a, b)?;
    let mut sum = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let diff = x - y;
        sum += diff * diff;
    }
    Ok(sum)
}

/// Cosine distance: `1 - dot(a, b) / (||a|| * ||b||)`.
///
/// The similarity is clamped to [-1, 1] before subtraction so floating
/// point drift cannot push the distance outside [0, 2]. Errors when either
/// vector has zero norm.
pub fn cosine_distance(a: &[f64], b: &[f64]) -> Result<f64> {
    check_pair(a, b)?;
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(Error::InvalidVector {
            message: "cannot calculate cosine distance for a zero vector".to_string(),
        });
    }
    let similarity = (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0);
    Ok(1.0 - similarity)
}

/// Negative inner product: `-dot(a, b)`.
pub fn inner_product_distance(a: &[f64], b: &[f64]) -> Result<f64> {
    check_pair(a, b)?;
    let mut sum = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        sum += x * y;
    }
    Ok(-sum)
}
