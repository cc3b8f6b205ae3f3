//! # IVF Index (Inverted File)
//!
//! Partitioned approximate index. Training runs k-means over a sample of
//! the data and keeps the `nlist` centroids; every added vector lands in
//! the bucket of its nearest centroid. A search ranks the centroids,
//! scans only the `nprobe` nearest buckets exactly, and merges the
//! candidates.
//!
//! `nprobe` is the whole recall/latency trade-off and can be retuned
//! between searches without retraining: `nprobe == 1` inspects a single
//! bucket, `nprobe == nlist` degenerates to an exact scan.
//!
//! Every stored vector receives a monotonic insertion id at add time and
//! reports it as [`SearchResult::index`], so result identity is stable
//! across searches no matter which buckets a query happens to probe.

use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use kinjo_core::error::{Error, Result};
use kinjo_core::Vector;

use crate::distance::Metric;
use crate::kmeans::{find_nearest_centroid, kmeans};
use crate::traits::{SearchResult, VectorIndex};

/// Iteration cap handed to the k-means trainer.
const TRAIN_MAX_ITER: usize = 100;

/// Training-set multiple worth aiming for. Training succeeds with as few
/// as `nlist` vectors, but centroids stabilize around `30 * nlist`.
pub const RECOMMENDED_TRAINING_MULTIPLE: usize = 30;

/// IVF index configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IvfConfig {
    /// Distance function for similarity computation.
    pub metric: Metric,
    /// Number of clusters (buckets) built at training time.
    pub nlist: usize,
    /// Number of buckets inspected per query. `1 <= nprobe <= nlist`.
    pub nprobe: usize,
}

impl Default for IvfConfig {
    fn default() -> Self {
        Self {
            metric: Metric::L2,
            nlist: 100,
            nprobe: 8,
        }
    }
}

/// Inverted-file index. Create, train once, then add and search freely.
pub struct IvfIndex {
    metric: Metric,
    nlist: usize,
    inner: RwLock<IvfInner>,
}

struct IvfInner {
    /// `nlist` centroids once trained, empty before.
    centroids: Vec<Vector>,
    /// One bucket per centroid.
    buckets: Vec<Vec<BucketEntry>>,
    nprobe: usize,
    trained: bool,
    dimension: Option<usize>,
    /// Next insertion id; ids are dense across buckets.
    next_id: usize,
    /// Random source for the k-means trainer.
    rng: StdRng,
}

struct BucketEntry {
    id: usize,
    vector: Vector,
}

impl IvfIndex {
    /// Create an untrained index. Rejects `nlist == 0`, `nprobe == 0` and
    /// `nprobe > nlist`.
    pub fn new(config: IvfConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create with a fixed training seed, for reproducible clustering.
    pub fn with_seed(config: IvfConfig, seed: u64) -> Result<Self> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: IvfConfig, rng: StdRng) -> Result<Self> {
        if config.nlist == 0 {
            return Err(Error::InvalidConfig {
                message: "nlist must be positive".to_string(),
            });
        }
        if config.nprobe == 0 {
            return Err(Error::InvalidConfig {
                message: "nprobe must be positive".to_string(),
            });
        }
        if config.nprobe > config.nlist {
            return Err(Error::InvalidConfig {
                message: format!(
                    "nprobe ({}) cannot exceed nlist ({})",
                    config.nprobe, config.nlist
                ),
            });
        }
        Ok(Self {
            metric: config.metric,
            nlist: config.nlist,
            inner: RwLock::new(IvfInner {
                centroids: Vec::new(),
                buckets: Vec::new(),
                nprobe: config.nprobe,
                trained: false,
                dimension: None,
                next_id: 0,
                rng,
            }),
        })
    }

    /// Cluster the training set into `nlist` centroids and install empty
    /// buckets. Requires at least `nlist` vectors of one dimension; a
    /// failed train leaves the index untrained with no centroids.
    pub fn train(&self, vectors: &[Vector]) -> Result<()> {
        if vectors.len() < self.nlist {
            return Err(Error::InsufficientTrainingData {
                needed: self.nlist,
                got: vectors.len(),
            });
        }
        let dim = vectors[0].dimension();
        for v in vectors {
            v.validate()?;
            if v.dimension() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    actual: v.dimension(),
                });
            }
        }

        let mut inner = self.inner.write();
        if inner.trained {
            return Err(Error::InvalidArgument {
                message: "index is already trained".to_string(),
            });
        }

        let centroids = kmeans(vectors, self.nlist, TRAIN_MAX_ITER, self.metric, &mut inner.rng)?;

        // Commit only after clustering succeeded.
        inner.buckets = (0..self.nlist).map(|_| Vec::new()).collect();
        inner.centroids = centroids;
        inner.dimension = Some(dim);
        inner.trained = true;

        info!(
            nlist = self.nlist,
            training_vectors = vectors.len(),
            dimension = dim,
            "ivf index trained"
        );
        Ok(())
    }

    /// Retune the number of buckets inspected per query. Valid between
    /// searches; takes effect immediately.
    pub fn set_nprobe(&self, nprobe: usize) -> Result<()> {
        if nprobe == 0 {
            return Err(Error::InvalidArgument {
                message: "nprobe must be positive".to_string(),
            });
        }
        if nprobe > self.nlist {
            return Err(Error::InvalidArgument {
                message: format!("nprobe ({nprobe}) cannot exceed nlist ({})", self.nlist),
            });
        }
        self.inner.write().nprobe = nprobe;
        Ok(())
    }

    /// Number of clusters fixed at construction.
    pub fn nlist(&self) -> usize {
        self.nlist
    }

    /// Buckets currently inspected per query.
    pub fn nprobe(&self) -> usize {
        self.inner.read().nprobe
    }

    /// True once [`IvfIndex::train`] has succeeded.
    pub fn is_trained(&self) -> bool {
        self.inner.read().trained
    }

    /// Indices of the `nprobe` centroids nearest to the query, nearest
    /// first.
    fn nearest_centroids(&self, inner: &IvfInner, query: &Vector) -> Result<Vec<usize>> {
        let mut ranked = Vec::with_capacity(inner.centroids.len());
        for (i, centroid) in inner.centroids.iter().enumerate() {
            let dist = self
                .metric
                .distance(query, centroid)
                .map_err(|e| Error::metric_failure(format!("query against centroid {i}"), e))?;
            ranked.push((dist, i));
        }
        ranked.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        Ok(ranked
            .into_iter()
            .take(inner.nprobe)
            .map(|(_, i)| i)
            .collect())
    }
}

impl VectorIndex for IvfIndex {
    fn add(&self, vector: &Vector) -> Result<()> {
        vector.validate()?;

        let mut inner = self.inner.write();
        if !inner.trained {
            return Err(Error::NotTrained);
        }
        if let Some(dim) = inner.dimension {
            if vector.dimension() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    actual: vector.dimension(),
                });
            }
        }

        let bucket = find_nearest_centroid(vector, &inner.centroids, self.metric)?;
        let id = inner.next_id;
        inner.next_id += 1;
        inner.buckets[bucket].push(BucketEntry {
            id,
            vector: vector.clone(),
        });
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
        if !inner.trained {
            return Err(Error::NotTrained);
        }
        if let Some(dim) = inner.dimension {
            if query.dimension() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    actual: query.dimension(),
                });
            }
        }

        let probe = self.nearest_centroids(&inner, query)?;

        let mut candidates = Vec::new();
        for bucket_idx in probe {
            for entry in &inner.buckets[bucket_idx] {
                let distance = self.metric.distance(query, &entry.vector).map_err(|e| {
                    Error::metric_failure(format!("query against vector {}", entry.id), e)
                })?;
                candidates.push(SearchResult {
                    vector: entry.vector.clone(),
                    distance,
                    index: entry.id,
                });
            }
        }

        candidates.sort();
        candidates.truncate(k);
        Ok(candidates)
    }

    fn len(&self) -> usize {
        let inner = self.inner.read();
        inner.buckets.iter().map(Vec::len).sum()
    }

    fn dimension(&self) -> Option<usize> {
        self.inner.read().dimension
    }
}
