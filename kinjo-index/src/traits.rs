//! # Vector Index Traits
//!
//! Common interface implemented by all index families.

use kinjo_core::{Result, Vector};

/// A single search result.
///
/// `index` is the 0-based position assigned when the vector was added,
/// stable across searches of an unchanged index.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub vector: Vector,
    pub distance: f64,
    pub index: usize,
}

impl Eq for SearchResult {}

impl PartialOrd for SearchResult {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchResult {
    /// Orders by distance, ties broken by insertion index. Equal-distance
    /// results therefore surface in insertion order.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(self.index.cmp(&other.index))
    }
}

/// Vector index trait implemented by Flat, IVF and HNSW indexes.
///
/// All methods take `&self`; each index serializes writers and admits
/// concurrent readers through its own lock.
pub trait VectorIndex: Send + Sync {
    /// Insert a vector. The index stores a deep clone; the caller keeps
    /// ownership of the original.
    fn add(&self, vector: &Vector) -> Result<()>;

    /// Find the `k` nearest stored vectors, closest first. An empty index
    /// yields an empty list rather than an error.
    fn search(&self, query: &Vector, k: usize) -> Result<Vec<SearchResult>>;

    /// Number of vectors in the index.
    fn len(&self) -> usize;

    /// True when the index holds no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension fixed by the first accepted vector, or `None` while the
    /// index is empty and untrained.
    fn dimension(&self) -> Option<usize>;
}
