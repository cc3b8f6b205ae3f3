//! # Flat Index (Brute-Force Exact Search)
//!
//! The index that searches everything. Used for:
//! 1. Ground truth comparison (100% recall)
//! 2. Small datasets where graph or cluster overhead isn't worth it
//! 3. Scoring the approximate indexes in tests and benchmarks
//!
//! Search computes the distance from the query to every stored vector and
//! returns the leading `k` in ascending order. Ties between equal
//! distances resolve in insertion order.

use parking_lot::RwLock;

use kinjo_core::error::{Error, Result};
use kinjo_core::Vector;

use crate::distance::Metric;
use crate::traits::{SearchResult, VectorIndex};

/// Exact brute-force index.
pub struct FlatIndex {
    metric: Metric,
    inner: RwLock<FlatInner>,
}

struct FlatInner {
    /// Stored vectors in insertion order; a vector's position is its
    /// stable result index.
    vectors: Vec<Vector>,
    /// Fixed by the first accepted vector.
    dimension: Option<usize>,
}

impl FlatIndex {
    /// Create an empty index over the given metric.
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            inner: RwLock::new(FlatInner {
                vectors: Vec::new(),
                dimension: None,
            }),
        }
    }

    /// The metric this index ranks with.
    pub fn metric(&self) -> Metric {
        self.metric
    }
}

impl VectorIndex for FlatIndex {
    fn add(&self, vector: &Vector) -> Result<()> {
        vector.validate()?;

        let mut inner = self.inner.write();
        match inner.dimension {
            None => inner.dimension = Some(vector.dimension()),
            Some(dim) => {
                if vector.dimension() != dim {
                    return Err(Error::DimensionMismatch {
                        expected: dim,
                        actual: vector.dimension(),
                    });
                }
            }
        }
        inner.vectors.push(vector.clone());
        Ok(())
    }

    fn search(&self, query: &Vector, k: usize) -> Result<Vec<SearchResult>> {
        query.validate()?;
        if k == 0 {
            return Err(Error::InvalidArgument {
                message: "k must be positive".to_string(),
            });
        }

        let inner = self.inner.read();
        if inner.vectors.is_empty() {
            // An empty index is a valid queryable state, regardless of the
            // query's dimension.
            return Ok(Vec::new());
        }
        if let Some(dim) = inner.dimension {
            if query.dimension() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    actual: query.dimension(),
                });
            }
        }

        let mut results = Vec::with_capacity(inner.vectors.len());
        for (i, v) in inner.vectors.iter().enumerate() {
            let distance = self
                .metric
                .distance(query, v)
                .map_err(|e| Error::metric_failure(format!("query against vector {i}"), e))?;
            results.push(SearchResult {
                vector: v.clone(),
                distance,
                index: i,
            });
        }
        results.sort();
        results.truncate(k);
        Ok(results)
    }

    fn len(&self) -> usize {
        self.inner.read().vectors.len()
    }

    fn dimension(&self) -> Option<usize> {
        self.inner.read().dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_fixes_dimension() {
        let index = FlatIndex::new(Metric::L2);
        assert_eq!(index.dimension(), None);
        index.add(&Vector::from([1.0, 2.0])).unwrap();
        assert_eq!(index.dimension(), Some(2));
        let err = index.add(&Vector::from([1.0, 2.0, 3.0])).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 3 }));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn search_empty_index_returns_empty() {
        let index = FlatIndex::new(Metric::L2);
        let results = index.search(&Vector::from([1.0, 2.0, 3.0]), 5).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn search_rejects_zero_k() {
        let index = FlatIndex::new(Metric::L2);
        index.add(&Vector::from([1.0])).unwrap();
        let err = index.search(&Vector::from([1.0]), 0).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[test]
    fn search_returns_ascending_distances() {
        let index = FlatIndex::new(Metric::L2);
        for x in [5.0, 1.0, 3.0, 2.0, 4.0] {
            index.add(&Vector::from([x, 0.0, 0.0])).unwrap();
        }
        let results = index.search(&Vector::from([0.0, 0.0, 0.0]), 5).unwrap();
        let distances: Vec<f64> = results.iter().map(|r| r.distance).collect();
        assert_eq!(distances, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn metric_failure_names_offending_pair() {
        let index = FlatIndex::new(Metric::Cosine);
        index.add(&Vector::from([1.0, 0.0])).unwrap();
        index.add(&Vector::from([0.0, 0.0])).unwrap(); // finite but zero norm
        let err = index.search(&Vector::from([1.0, 1.0]), 2).unwrap_err();
        match err {
            Error::MetricFailure { context, .. } => assert!(context.contains("vector 1")),
            other => panic!("expected MetricFailure, got {other}"),
        }
    }
}
