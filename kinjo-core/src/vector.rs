//! # Vector Type
//!
//! Dense `f64` vector value type shared by every index family.
//!
//! A [`Vector`] is an ordered sequence of finite reals. Indexes store deep
//! clones of accepted vectors, so callers keep full ownership of their
//! originals. Validation rejects empty vectors and non-finite components
//! (NaN, ±∞) with the offending position named in the error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::error::{Error, Result};

/// Dense vector of `f64` components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector(Vec<f64>);

impl Vector {
    /// Wrap raw components. No validation is performed here; indexes call
    /// [`Vector::validate`] at their boundary.
    pub fn new(data: Vec<f64>) -> Self {
        Self(data)
    }

    /// A vector of `dim` zeros.
    pub fn zeros(dim: usize) -> Self {
        Self(vec![0.0; dim])
    }

    /// Number of components.
    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    /// Check that the vector is non-empty and every component is finite.
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(Error::InvalidVector {
                message: "vector is empty".to_string(),
            });
        }
        for (i, &val) in self.0.iter().enumerate() {
            if val.is_nan() {
                return Err(Error::InvalidVector {
                    message: format!("invalid value at index {i}: NaN"),
                });
            }
            if val.is_infinite() {
                return Err(Error::InvalidVector {
                    message: format!("invalid value at index {i}: infinity"),
                });
            }
        }
        Ok(())
    }

    /// Componentwise equality within `epsilon`. Vectors of different
    /// dimension are never equal.
    pub fn approx_eq(&self, other: &Vector, epsilon: f64) -> bool {
        if self.0.len() != other.0.len() {
            return false;
        }
        self.0
            .iter()
            .zip(other.0.iter())
            .all(|(a, b)| (a - b).abs() <= epsilon)
    }

    /// Borrow the components as a slice.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Consume the vector, returning its components.
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl Deref for Vector {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

impl DerefMut for Vector {
    fn deref_mut(&mut self) -> &mut [f64] {
        &mut self.0
    }
}

impl From<Vec<f64>> for Vector {
    fn from(data: Vec<f64>) -> Self {
        Self(data)
    }
}

impl From<&[f64]> for Vector {
    fn from(data: &[f64]) -> Self {
        Self(data.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for Vector {
    fn from(data: [f64; N]) -> Self {
        Self(data.to_vec())
    }
}

impl FromIterator<f64> for Vector {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Vector {
    /// Truncated rendering: long vectors show the first three and last two
    /// components plus the dimension.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = &self.0;
        if v.is_empty() {
            return write!(f, "[]");
        }
        if v.len() <= 5 {
            write!(f, "[")?;
            for (i, val) in v.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{val}")?;
            }
            return write!(f, "]");
        }
        write!(
            f,
            "[{} {} {} ... {} {}] (dim={})",
            v[0],
            v[1],
            v[2],
            v[v.len() - 2],
            v[v.len() - 1],
            v.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_and_slice() {
        let v = Vector::from([1.0, 2.0, 3.0]);
        assert_eq!(v.dimension(), 3);
        assert_eq!(v.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn validate_accepts_finite() {
        assert!(Vector::from([0.0, -1.5, 1e300]).validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty() {
        let err = Vector::new(Vec::new()).validate().unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn validate_rejects_nan_with_position() {
        let err = Vector::from([1.0, f64::NAN, 3.0]).validate().unwrap_err();
        assert!(err.to_string().contains("index 1"));
    }

    #[test]
    fn validate_rejects_infinity() {
        assert!(Vector::from([1.0, f64::INFINITY]).validate().is_err());
        assert!(Vector::from([f64::NEG_INFINITY, 1.0]).validate().is_err());
    }

    #[test]
    fn approx_eq_tolerance() {
        let a = Vector::from([1.0, 2.0]);
        let b = Vector::from([1.0 + 1e-10, 2.0 - 1e-10]);
        assert!(a.approx_eq(&b, 1e-9));
        assert!(!a.approx_eq(&b, 1e-12));
    }

    #[test]
    fn approx_eq_dimension_mismatch() {
        let a = Vector::from([1.0, 2.0]);
        let b = Vector::from([1.0, 2.0, 3.0]);
        assert!(!a.approx_eq(&b, 1.0));
    }

    #[test]
    fn clone_is_deep() {
        let mut a = Vector::from([1.0, 2.0]);
        let b = a.clone();
        a[0] = 99.0;
        assert_eq!(b.as_slice(), &[1.0, 2.0]);
    }

    #[test]
    fn display_truncates_long_vectors() {
        let v: Vector = (0..10).map(|i| i as f64).collect();
        let s = v.to_string();
        assert!(s.contains("..."));
        assert!(s.contains("dim=10"));
        assert_eq!(Vector::from([1.0, 2.0]).to_string(), "[1 2]");
        assert_eq!(Vector::new(Vec::new()).to_string(), "[]");
    }
}
