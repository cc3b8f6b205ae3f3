//! # Test Data Generators
//!
//! Seeded vector generators for tests and benchmarks. Every generator
//! takes an explicit seed and is fully deterministic, so fixtures and
//! ground truth are reproducible across runs.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use kinjo_core::Vector;

/// Standard deviation of the Gaussian noise around cluster centers.
const CLUSTER_SIGMA: f64 = 0.1;

/// Uniformly random vectors with components in [0, 1).
pub fn random_vectors(count: usize, dim: usize, seed: u64) -> Vec<Vector> {
    if dim == 0 {
        return Vec::new();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..dim).map(|_| rng.gen::<f64>()).collect())
        .collect()
}

/// Vectors drawn around `num_clusters` uniformly random centers with
/// Gaussian noise (σ = 0.1). The realistic shape for exercising a
/// partitioned index: nearby vectors share a cluster.
pub fn clustered_vectors(count: usize, dim: usize, num_clusters: usize, seed: u64) -> Vec<Vector> {
    if dim == 0 || num_clusters == 0 {
        return Vec::new();
    }
    let num_clusters = num_clusters.min(count.max(1));
    let mut rng = StdRng::seed_from_u64(seed);

    let centers: Vec<Vec<f64>> = (0..num_clusters)
        .map(|_| (0..dim).map(|_| rng.gen::<f64>()).collect())
        .collect();

    (0..count)
        .map(|_| {
            let center = &centers[rng.gen_range(0..num_clusters)];
            center
                .iter()
                .map(|&c| c + gaussian(&mut rng) * CLUSTER_SIGMA)
                .collect()
        })
        .collect()
}

/// Uniformly random vectors scaled to unit length. Useful with the cosine
/// metric, where only direction matters.
pub fn normalized_vectors(count: usize, dim: usize, seed: u64) -> Vec<Vector> {
    random_vectors(count, dim, seed)
        .into_iter()
        .map(|v| {
            let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
            if norm > 0.0 {
                v.iter().map(|x| x / norm).collect()
            } else {
                v
            }
        })
        .collect()
}

/// Copies of `vectors` with Gaussian noise of the given standard
/// deviation added to every component.
pub fn add_noise(vectors: &[Vector], sigma: f64, seed: u64) -> Vec<Vector> {
    let mut rng = StdRng::seed_from_u64(seed);
    vectors
        .iter()
        .map(|v| v.iter().map(|&x| x + gaussian(&mut rng) * sigma).collect())
        .collect()
}

/// A shuffled copy of `vectors`, decoupling tests from generation order.
pub fn shuffled(vectors: &[Vector], seed: u64) -> Vec<Vector> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = vectors.to_vec();
    out.shuffle(&mut rng);
    out
}

/// One standard normal draw via the Box-Muller transform. The u1 guard
/// keeps `ln` off zero.
fn gaussian(rng: &mut StdRng) -> f64 {
    let mut u1: f64 = rng.gen();
    while u1 <= f64::MIN_POSITIVE {
        u1 = rng.gen();
    }
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}
