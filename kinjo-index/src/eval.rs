//! # Evaluation
//!
//! Quality and performance measurement for any [`VectorIndex`]:
//! exact ground truth via brute force, recall@k against it, and
//! latency/throughput measurement.
//!
//! Ground truth is deterministic for a fixed database and insertion
//! order, so approximate indexes can be scored reproducibly.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use kinjo_core::error::{Error, Result};
use kinjo_core::Vector;

use crate::distance::Metric;
use crate::flat::FlatIndex;
use crate::traits::{SearchResult, VectorIndex};

/// Exact top-`k` neighbor indices for each query, computed by brute force
/// over `database` under `metric`. The query sweep runs in parallel; the
/// per-query result lists are in query order regardless.
pub fn compute_ground_truth(
    queries: &[Vector],
    database: &[Vector],
    k: usize,
    metric: Metric,
) -> Result<Vec<Vec<usize>>> {
    if queries.is_empty() {
        return Err(Error::InvalidArgument {
            message: "no queries provided".to_string(),
        });
    }
    let flat = FlatIndex::new(metric);
    for v in database {
        flat.add(v)?;
    }
    queries
        .par_iter()
        .map(|q| flat.search(q, k).map(|results| extract_indices(&results)))
        .collect()
}

/// Mean recall@k: per query, the fraction of true top-`k` neighbors the
/// approximate results recovered, averaged over all queries.
pub fn calculate_recall(
    approx_results: &[Vec<usize>],
    ground_truth: &[Vec<usize>],
    k: usize,
) -> Result<f64> {
    check_result_sets(approx_results, ground_truth, k)?;

    let mut total = 0.0;
    for (approx, truth) in approx_results.iter().zip(ground_truth.iter()) {
        total += query_recall(approx, truth, k);
    }
    Ok(total / approx_results.len() as f64)
}

/// Recall at several cutoffs in one pass over the result sets.
pub fn calculate_recall_at_k(
    approx_results: &[Vec<usize>],
    ground_truth: &[Vec<usize>],
    k_values: &[usize],
) -> Result<HashMap<usize, f64>> {
    let mut recalls = HashMap::with_capacity(k_values.len());
    for &k in k_values {
        recalls.insert(k, calculate_recall(approx_results, ground_truth, k)?);
    }
    Ok(recalls)
}

/// Detailed recall statistics across a query set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecallStats {
    /// Cutoff the statistics were computed at.
    pub k: usize,
    /// Mean recall across queries.
    pub mean: f64,
    /// Worst per-query recall.
    pub min: f64,
    /// Best per-query recall.
    pub max: f64,
    /// Number of queries evaluated.
    pub num_queries: usize,
    /// Queries that recovered every true neighbor.
    pub perfect_queries: usize,
}

/// Recall@k with per-query min/max and the count of perfect queries.
pub fn calculate_detailed_recall(
    approx_results: &[Vec<usize>],
    ground_truth: &[Vec<usize>],
    k: usize,
) -> Result<RecallStats> {
    check_result_sets(approx_results, ground_truth, k)?;

    let mut stats = RecallStats {
        k,
        mean: 0.0,
        min: 1.0,
        max: 0.0,
        num_queries: approx_results.len(),
        perfect_queries: 0,
    };
    let mut total = 0.0;
    for (approx, truth) in approx_results.iter().zip(ground_truth.iter()) {
        let recall = query_recall(approx, truth, k);
        total += recall;
        stats.min = stats.min.min(recall);
        stats.max = stats.max.max(recall);
        if recall == 1.0 {
            stats.perfect_queries += 1;
        }
    }
    stats.mean = total / approx_results.len() as f64;
    Ok(stats)
}

/// Wall-clock latency statistics over a batch of searches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub mean: Duration,
    pub median: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub min: Duration,
    pub max: Duration,
}

/// Time one search per query against `index`, sequentially, and summarize
/// the distribution.
pub fn measure_search_latency(
    index: &dyn VectorIndex,
    queries: &[Vector],
    k: usize,
) -> Result<LatencyStats> {
    if queries.is_empty() {
        return Err(Error::InvalidArgument {
            message: "no queries provided".to_string(),
        });
    }

    let mut latencies = Vec::with_capacity(queries.len());
    for query in queries {
        let start = Instant::now();
        index.search(query, k)?;
        latencies.push(start.elapsed());
    }
    Ok(latency_stats(&mut latencies))
}

/// Throughput measurement over a fixed time budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputStats {
    pub queries_per_second: f64,
    pub total_queries: usize,
    pub elapsed: Duration,
    pub avg_latency: Duration,
}

/// Search repeatedly, cycling through `queries`, until `budget` elapses.
pub fn measure_throughput(
    index: &dyn VectorIndex,
    queries: &[Vector],
    k: usize,
    budget: Duration,
) -> Result<ThroughputStats> {
    if queries.is_empty() {
        return Err(Error::InvalidArgument {
            message: "no queries provided".to_string(),
        });
    }

    let start = Instant::now();
    let mut count = 0usize;
    while start.elapsed() < budget {
        index.search(&queries[count % queries.len()], k)?;
        count += 1;
    }
    let elapsed = start.elapsed();
    Ok(ThroughputStats {
        queries_per_second: count as f64 / elapsed.as_secs_f64(),
        total_queries: count,
        elapsed,
        avg_latency: if count == 0 {
            Duration::ZERO
        } else {
            elapsed / count as u32
        },
    })
}

/// Time a build closure (training, bulk insertion, or both).
pub fn measure_build_time<F>(build: F) -> Result<Duration>
where
    F: FnOnce() -> Result<()>,
{
    let start = Instant::now();
    build()?;
    Ok(start.elapsed())
}

/// Stable insertion indices of a result list, in result order.
pub fn extract_indices(results: &[SearchResult]) -> Vec<usize> {
    results.iter().map(|r| r.index).collect()
}

/// [`extract_indices`] applied to a batch of result lists.
pub fn extract_indices_batch(batch: &[Vec<SearchResult>]) -> Vec<Vec<usize>> {
    batch.iter().map(|results| extract_indices(results)).collect()
}

fn check_result_sets(approx: &[Vec<usize>], truth: &[Vec<usize>], k: usize) -> Result<()> {
    if approx.is_empty() || truth.is_empty() {
        return Err(Error::InvalidArgument {
            message: "empty results or ground truth".to_string(),
        });
    }
    if approx.len() != truth.len() {
        return Err(Error::InvalidArgument {
            message: format!(
                "mismatch: {} approximate result lists vs {} ground truth lists",
                approx.len(),
                truth.len()
            ),
        });
    }
    if k == 0 {
        return Err(Error::InvalidArgument {
            message: "k must be positive".to_string(),
        });
    }
    Ok(())
}

fn query_recall(approx: &[usize], truth: &[usize], k: usize) -> f64 {
    let truth_set: HashSet<usize> = truth.iter().take(k).copied().collect();
    let matches = approx
        .iter()
        .take(k)
        .filter(|idx| truth_set.contains(idx))
        .count();
    matches as f64 / k as f64
}

fn latency_stats(latencies: &mut [Duration]) -> LatencyStats {
    latencies.sort_unstable();
    let n = latencies.len();

    let sum: Duration = latencies.iter().sum();
    let mean = sum / n as u32;

    let median = if n % 2 == 0 {
        (latencies[n / 2 - 1] + latencies[n / 2]) / 2
    } else {
        latencies[n / 2]
    };

    // Percentile index: floor(n * p), clamped into range.
    let percentile = |p: f64| {
        let idx = ((n as f64 * p) as usize).min(n - 1);
        latencies[idx]
    };

    LatencyStats {
        mean,
        median,
        p95: percentile(0.95),
        p99: percentile(0.99),
        min: latencies[0],
        max: latencies[n - 1],
    }
}
