//! # Kinjo Index
//!
//! In-memory nearest-neighbor indexes over dense `f64` vectors.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Vector Index Layer                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  ┌───────────┐     ┌───────────┐     ┌───────────┐           │
//! │  │   Flat    │     │    IVF    │     │   HNSW    │           │
//! │  │  (Exact)  │     │ (k-means) │     │  (Graph)  │           │
//! │  └─────┬─────┘     └─────┬─────┘     └─────┬─────┘           │
//! │        └─────────────────┴─────────────────┘                 │
//! │                          │                                   │
//! │                  VectorIndex trait                           │
//! │                          │                                   │
//! │        distance metrics · evaluation · generators            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `distance`: the metric family (L2, squared L2, cosine, inner product)
//! - `traits`: the common `VectorIndex` operation set
//! - `flat`: brute-force exact search, the ground-truth oracle
//! - `kmeans`: k-means++ trainer feeding the IVF index
//! - `ivf`: inverted-file index with a runtime `nprobe` knob
//! - `hnsw`: hierarchical navigable small-world graph index
//! - `eval`: recall, latency and throughput measurement
//! - `testdata`: seeded vector generators for tests and benchmarks
//!
//! Every index is multi-reader / single-writer: searches run concurrently
//! under a shared lock while mutations take exclusive access.

pub mod distance;
pub mod eval;
pub mod flat;
pub mod hnsw;
pub mod ivf;
pub mod kmeans;
pub mod testdata;
pub mod traits;

pub use distance::Metric;
pub use eval::{
    calculate_detailed_recall, calculate_recall, calculate_recall_at_k, compute_ground_truth,
    extract_indices, extract_indices_batch, measure_build_time, measure_search_latency,
    measure_throughput, LatencyStats, RecallStats, ThroughputStats,
};
pub use flat::FlatIndex;
pub use hnsw::{HnswConfig, HnswIndex, SelectionPolicy};
pub use ivf::{IvfConfig, IvfIndex};
pub use kmeans::kmeans;
pub use traits::{SearchResult, VectorIndex};

// Re-export the core contracts for downstream convenience.
pub use kinjo_core::{Error, Result, Vector};
