//! # K-Means Trainer
//!
//! Lloyd's algorithm with D²-weighted ("k-means++") seeding. Partitions a
//! training set into `k` centroids; the IVF index trains with it.
//!
//! The trainer is a pure function over its inputs: the caller supplies the
//! random source, so two runs with the same data and seed produce the same
//! centroids.

use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use kinjo_core::error::{Error, Result};
use kinjo_core::Vector;

use crate::distance::Metric;

/// Componentwise convergence tolerance between iterations.
pub const CONVERGENCE_EPSILON: f64 = 1e-6;

/// Iteration cap applied when the caller passes `max_iter == 0`.
pub const DEFAULT_MAX_ITER: usize = 100;

/// Cluster `vectors` into `k` centroids.
///
/// Seeding picks the first centroid uniformly at random, then each
/// subsequent centroid with probability proportional to the squared
/// distance (under `metric`) to its nearest already-chosen centroid.
/// Iterations alternate assignment and mean update until every centroid
/// moves less than [`CONVERGENCE_EPSILON`] componentwise, or `max_iter`
/// rounds have run. An empty cluster keeps its previous centroid.
pub fn kmeans(
    vectors: &[Vector],
    k: usize,
    max_iter: usize,
    metric: Metric,
    rng: &mut StdRng,
) -> Result<Vec<Vector>> {
    if vectors.is_empty() {
        return Err(Error::InvalidArgument {
            message: "no training vectors provided".to_string(),
        });
    }
    if k == 0 {
        return Err(Error::InvalidArgument {
            message: "k must be positive".to_string(),
        });
    }
    if k > vectors.len() {
        return Err(Error::InvalidArgument {
            message: format!("k ({k}) cannot exceed number of vectors ({})", vectors.len()),
        });
    }
    let max_iter = if max_iter == 0 { DEFAULT_MAX_ITER } else { max_iter };

    let dim = vectors[0].dimension();
    for v in vectors {
        if v.dimension() != dim {
            return Err(Error::DimensionMismatch {
                expected: dim,
                actual: v.dimension(),
            });
        }
    }

    let mut centroids = seed_centroids(vectors, k, metric, rng)?;

    let mut assignments = vec![0usize; vectors.len()];
    for iter in 0..max_iter {
        // Assignment step
        for (slot, v) in assignments.iter_mut().zip(vectors.iter()) {
            *slot = find_nearest_centroid(v, &centroids, metric)?;
        }

        // Update step: componentwise mean per cluster
        let mut sums = vec![vec![0.0f64; dim]; k];
        let mut counts = vec![0usize; k];
        for (&cluster, v) in assignments.iter().zip(vectors.iter()) {
            counts[cluster] += 1;
            for (acc, &val) in sums[cluster].iter_mut().zip(v.iter()) {
                *acc += val;
            }
        }
        let mut new_centroids = Vec::with_capacity(k);
        for (cluster, sum) in sums.into_iter().enumerate() {
            if counts[cluster] == 0 {
                // Empty cluster keeps its previous centroid.
                new_centroids.push(centroids[cluster].clone());
            } else {
                let inv = 1.0 / counts[cluster] as f64;
                new_centroids.push(sum.into_iter().map(|s| s * inv).collect());
            }
        }

        let converged = centroids
            .iter()
            .zip(new_centroids.iter())
            .all(|(old, new)| old.approx_eq(new, CONVERGENCE_EPSILON));
        centroids = new_centroids;
        if converged {
            debug!(iterations = iter + 1, k, "k-means converged");
            break;
        }
    }

    Ok(centroids)
}

/// Index of the centroid nearest to `v` under `metric`.
pub fn find_nearest_centroid(v: &Vector, centroids: &[Vector], metric: Metric) -> Result<usize> {
    if centroids.is_empty() {
        return Err(Error::InvalidArgument {
            message: "no centroids provided".to_string(),
        });
    }
    let mut best = 0;
    let mut best_dist = metric.distance(v, &centroids[0])?;
    for (i, centroid) in centroids.iter().enumerate().skip(1) {
        let dist = metric.distance(v, centroid)?;
        if dist < best_dist {
            best_dist = dist;
            best = i;
        }
    }
    Ok(best)
}

/// D²-weighted seeding. Keeps a running minimum distance per point and
/// draws the next centroid by cumulative-weight threshold.
fn seed_centroids(
    vectors: &[Vector],
    k: usize,
    metric: Metric,
    rng: &mut StdRng,
) -> Result<Vec<Vector>> {
    let n = vectors.len();
    let mut centroids = Vec::with_capacity(k);

    let first = rng.gen_range(0..n);
    centroids.push(vectors[first].clone());

    let mut min_dists = vec![f64::MAX; n];
    while centroids.len() < k {
        let last = centroids.last().ok_or_else(|| Error::InvalidArgument {
            message: "seeding lost its centroids".to_string(),
        })?;
        let mut total = 0.0;
        for (slot, v) in min_dists.iter_mut().zip(vectors.iter()) {
            let dist = metric.distance(v, last)?;
            let weight = dist * dist;
            if weight < *slot {
                *slot = weight;
            }
            total += *slot;
        }

        if total <= f64::MIN_POSITIVE {
            // Every remaining point coincides with a chosen centroid.
            let idx = rng.gen_range(0..n);
            centroids.push(vectors[idx].clone());
            continue;
        }

        let threshold = rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        let mut chosen = n - 1;
        for (i, &weight) in min_dists.iter().enumerate() {
            cumulative += weight;
            if cumulative >= threshold {
                chosen = i;
                break;
            }
        }
        centroids.push(vectors[chosen].clone());
    }

    Ok(centroids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn two_blobs() -> Vec<Vector> {
        let mut vectors = Vec::new();
        for i in 0..10 {
            let jitter = i as f64 * 0.01;
            vectors.push(Vector::from([0.0 + jitter, 0.0]));
            vectors.push(Vector::from([10.0 + jitter, 10.0]));
        }
        vectors
    }

    #[test]
    fn rejects_bad_arguments() {
        let vectors = two_blobs();
        assert!(kmeans(&[], 2, 10, Metric::L2, &mut rng()).is_err());
        assert!(kmeans(&vectors, 0, 10, Metric::L2, &mut rng()).is_err());
        assert!(kmeans(&vectors, vectors.len() + 1, 10, Metric::L2, &mut rng()).is_err());
    }

    #[test]
    fn rejects_mixed_dimensions() {
        let vectors = vec![Vector::from([1.0, 2.0]), Vector::from([1.0])];
        let err = kmeans(&vectors, 1, 10, Metric::L2, &mut rng()).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn returns_k_centroids_of_input_dimension() {
        let centroids = kmeans(&two_blobs(), 2, 0, Metric::L2, &mut rng()).unwrap();
        assert_eq!(centroids.len(), 2);
        assert!(centroids.iter().all(|c| c.dimension() == 2));
    }

    #[test]
    fn separates_well_separated_blobs() {
        let centroids = kmeans(&two_blobs(), 2, 0, Metric::L2, &mut rng()).unwrap();
        let mut xs: Vec<f64> = centroids.iter().map(|c| c[0]).collect();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        assert!(xs[0] < 1.0, "low blob centroid drifted: {}", xs[0]);
        assert!(xs[1] > 9.0, "high blob centroid drifted: {}", xs[1]);
    }

    #[test]
    fn k_equals_n_reproduces_points() {
        let vectors = vec![
            Vector::from([0.0, 0.0]),
            Vector::from([5.0, 0.0]),
            Vector::from([0.0, 5.0]),
        ];
        let centroids = kmeans(&vectors, 3, 0, Metric::L2, &mut rng()).unwrap();
        for v in &vectors {
            assert!(
                centroids.iter().any(|c| c.approx_eq(v, 1e-9)),
                "no centroid landed on {v}"
            );
        }
    }

    #[test]
    fn deterministic_for_fixed_seed() {
        let vectors = two_blobs();
        let a = kmeans(&vectors, 2, 0, Metric::L2, &mut StdRng::seed_from_u64(11)).unwrap();
        let b = kmeans(&vectors, 2, 0, Metric::L2, &mut StdRng::seed_from_u64(11)).unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!(x.approx_eq(y, 0.0));
        }
    }

    #[test]
    fn nearest_centroid_picks_argmin() {
        let centroids = vec![Vector::from([0.0]), Vector::from([10.0])];
        assert_eq!(
            find_nearest_centroid(&Vector::from([1.0]), &centroids, Metric::L2).unwrap(),
            0
        );
        assert_eq!(
            find_nearest_centroid(&Vector::from([9.0]), &centroids, Metric::L2).unwrap(),
            1
        );
        assert!(find_nearest_centroid(&Vector::from([1.0]), &[], Metric::L2).is_err());
    }
}
