//! # HNSW Index (Hierarchical Navigable Small World)
//!
//! Multi-layer proximity graph with logarithmic-expected search.
//!
//! ## Algorithm Overview
//!
//! ```text
//! layer 2:   E ───────────────── F          sparse upper layers
//!            │                   │          route coarsely
//! layer 1:   E ───── C ───────── F ── G
//!            │       │           │    │
//! layer 0:   E ─ A ─ C ─ B ─ D ─ F ── G     every node, dense links
//! ```
//!
//! Every node draws a level from a decaying distribution; search enters at
//! the top layer, greedily descends to a good locality, then runs a
//! best-first sweep at layer 0 with a bounded candidate list (`ef`).
//!
//! Two heaps drive the sweep: a min-heap exploration frontier and a
//! max-heap of the best `ef` discoveries, so the next node to expand and
//! the current worst result are both O(1) away.
//!
//! Edges are bidirectional at all times: inserting an edge writes both
//! endpoints, and pruning an over-capacity node removes each dropped edge
//! from both endpoints.

use std::collections::{BinaryHeap, HashSet};

use ordered_float::OrderedFloat;
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use kinjo_core::error::{Error, Result};
use kinjo_core::Vector;

use crate::distance::Metric;
use crate::traits::{SearchResult, VectorIndex};

/// Hard cap on node levels, bounding per-node memory.
pub const MAX_LEVEL: usize = 32;

/// Neighbor selection policy used at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionPolicy {
    /// Keep the `m` closest candidates.
    Simple,
    /// Keep a candidate only when it is closer to the new node than to any
    /// already-kept neighbor, backfilling with the closest unused
    /// candidates. Promotes geometric diversity at high dimensionality.
    Heuristic,
}

/// HNSW configuration.
///
/// Controls the trade-off between build speed, search speed, recall and
/// memory. No parameter other than `ef_search` may change after the first
/// insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswConfig {
    /// Distance function for similarity computation.
    pub metric: Metric,
    /// Bidirectional links kept per node above layer 0.
    pub m: usize,
    /// Link cap at layer 0 (typically `2 * m`).
    pub m_max: usize,
    /// Candidate list size during construction. Must be `>= m`.
    pub ef_construction: usize,
    /// Candidate list size during search (higher = better recall, slower).
    pub ef_search: usize,
    /// Level decay multiplier. `1 / ln(2)` halves the population per layer.
    pub ml: f64,
    /// Active neighbor selection policy.
    pub selection: SelectionPolicy,
}

impl Default for HnswConfig {
    fn default() -> Self {
        let m = 16;
        Self {
            metric: Metric::L2,
            m,
            m_max: m * 2,
            ef_construction: 200,
            ef_search: 50,
            ml: std::f64::consts::LN_2.recip(),
            selection: SelectionPolicy::Simple,
        }
    }
}

struct HnswNode {
    vector: Vector,
    level: usize,
    /// One neighbor list per layer, `0..=level`.
    neighbors: Vec<Vec<usize>>,
}

struct HnswInner {
    nodes: Vec<HnswNode>,
    /// Highest-level live node; ties keep the earlier id.
    entry_point: Option<usize>,
    max_layer: usize,
    ef_search: usize,
    dimension: Option<usize>,
    /// Per-index random source for level draws, seedable for
    /// reproducible graphs.
    rng: StdRng,
}

/// Hierarchical navigable small-world graph index.
pub struct HnswIndex {
    metric: Metric,
    m: usize,
    m_max: usize,
    ef_construction: usize,
    ml: f64,
    selection: SelectionPolicy,
    inner: RwLock<HnswInner>,
}

/// Frontier entry: max-heap on negated distance gives pop-closest-first.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FrontierEntry {
    neg_distance: OrderedFloat<f64>,
    id: usize,
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.neg_distance
            .cmp(&other.neg_distance)
            .then(other.id.cmp(&self.id))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Result entry: max-heap by distance, so the worst survivor is on top.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResultEntry {
    distance: OrderedFloat<f64>,
    id: usize,
}

impl Ord for ResultEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.distance.cmp(&other.distance).then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for ResultEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl HnswIndex {
    /// Create an empty index. Validates the parameter set; the level RNG
    /// is entropy-seeded.
    pub fn new(config: HnswConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create with a fixed level-draw seed, for reproducible graphs in
    /// tests.
    pub fn with_seed(config: HnswConfig, seed: u64) -> Result<Self> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: HnswConfig, rng: StdRng) -> Result<Self> {
        if config.m == 0 {
            return Err(Error::InvalidConfig {
                message: "m must be positive".to_string(),
            });
        }
        if config.m_max < config.m {
            return Err(Error::InvalidConfig {
                message: format!("m_max ({}) must be at least m ({})", config.m_max, config.m),
            });
        }
        if config.ef_construction < config.m {
            return Err(Error::InvalidConfig {
                message: format!(
                    "ef_construction ({}) must be at least m ({})",
                    config.ef_construction, config.m
                ),
            });
        }
        if config.ef_search == 0 {
            return Err(Error::InvalidConfig {
                message: "ef_search must be positive".to_string(),
            });
        }
        if !(config.ml.is_finite() && config.ml > 0.0) {
            return Err(Error::InvalidConfig {
                message: "ml must be a positive real".to_string(),
            });
        }
        Ok(Self {
            metric: config.metric,
            m: config.m,
            m_max: config.m_max,
            ef_construction: config.ef_construction,
            ml: config.ml,
            selection: config.selection,
            inner: RwLock::new(HnswInner {
                nodes: Vec::new(),
                entry_point: None,
                max_layer: 0,
                ef_search: config.ef_search,
                dimension: None,
                rng,
            }),
        })
    }

    /// Retune the search-time candidate list size. Valid between searches.
    pub fn set_ef_search(&self, ef: usize) -> Result<()> {
        if ef == 0 {
            return Err(Error::InvalidArgument {
                message: "ef_search must be positive".to_string(),
            });
        }
        self.inner.write().ef_search = ef;
        Ok(())
    }

    /// Current search-time candidate list size.
    pub fn ef_search(&self) -> usize {
        self.inner.read().ef_search
    }

    /// Active neighbor selection policy.
    pub fn selection_policy(&self) -> SelectionPolicy {
        self.selection
    }

    /// Current top layer of the graph.
    pub fn max_layer(&self) -> usize {
        self.inner.read().max_layer
    }

    /// Level of the node with the given id, if it exists.
    pub fn node_level(&self, id: usize) -> Option<usize> {
        self.inner.read().nodes.get(id).map(|n| n.level)
    }

    /// Snapshot of a node's neighbor list at `layer`, if both exist.
    pub fn neighbors_at(&self, id: usize, layer: usize) -> Option<Vec<usize>> {
        self.inner
            .read()
            .nodes
            .get(id)
            .and_then(|n| n.neighbors.get(layer))
            .cloned()
    }

    /// One log-uniform draw: `floor(-ln(U) * ml)`, capped at [`MAX_LEVEL`].
    /// The saturating float-to-int cast absorbs the U == 0 edge.
    fn draw_level(&self, rng: &mut StdRng) -> usize {
        let u: f64 = rng.gen();
        let level = (-u.ln() * self.ml).floor();
        (level as usize).min(MAX_LEVEL)
    }

    fn distance_to_node(&self, nodes: &[HnswNode], query: &[f64], id: usize) -> Result<f64> {
        self.metric
            .distance(query, &nodes[id].vector)
            .map_err(|e| Error::metric_failure(format!("query against node {id}"), e))
    }

    /// Best-first search within one layer. Returns the `ef` closest
    /// discovered nodes, ascending by distance.
    ///
    /// `visited` is cleared on entry and reused across calls to avoid
    /// reallocation; it is what guarantees termination on the cyclic
    /// graph.
    fn search_layer(
        &self,
        nodes: &[HnswNode],
        query: &[f64],
        entry_points: &[usize],
        ef: usize,
        layer: usize,
        visited: &mut HashSet<usize>,
    ) -> Result<Vec<(f64, usize)>> {
        visited.clear();
        let mut frontier: BinaryHeap<FrontierEntry> = BinaryHeap::with_capacity(ef * 2);
        let mut results: BinaryHeap<ResultEntry> = BinaryHeap::with_capacity(ef + 1);
        let mut worst_dist = f64::MAX;

        for &ep in entry_points {
            if visited.insert(ep) {
                let dist = self.distance_to_node(nodes, query, ep)?;
                frontier.push(FrontierEntry {
                    neg_distance: OrderedFloat(-dist),
                    id: ep,
                });
                results.push(ResultEntry {
                    distance: OrderedFloat(dist),
                    id: ep,
                });
            }
        }
        while results.len() > ef {
            results.pop();
        }
        if results.len() >= ef {
            worst_dist = results.peek().map_or(f64::MAX, |r| r.distance.0);
        }

        while let Some(candidate) = frontier.pop() {
            let c_dist = -candidate.neg_distance.0;
            if results.len() >= ef && c_dist > worst_dist {
                break;
            }

            let node = &nodes[candidate.id];
            if layer >= node.neighbors.len() {
                continue;
            }
            for &neighbor in &node.neighbors[layer] {
                if !visited.insert(neighbor) {
                    continue;
                }
                let dist = self.distance_to_node(nodes, query, neighbor)?;
                if results.len() < ef || dist < worst_dist {
                    frontier.push(FrontierEntry {
                        neg_distance: OrderedFloat(-dist),
                        id: neighbor,
                    });
                    results.push(ResultEntry {
                        distance: OrderedFloat(dist),
                        id: neighbor,
                    });
                    if results.len() > ef {
                        results.pop();
                    }
                    worst_dist = results.peek().map_or(f64::MAX, |r| r.distance.0);
                }
            }
        }

        Ok(results
            .into_sorted_vec()
            .into_iter()
            .map(|r| (r.distance.0, r.id))
            .collect())
    }

    /// Pick up to `m` edges out of `candidates`, each carrying its
    /// distance to the node being wired. Deterministic given the candidate
    /// set: candidates are ranked by (distance, id) before selection.
    fn select_neighbors(
        &self,
        nodes: &[HnswNode],
        candidates: &[(f64, usize)],
        m: usize,
    ) -> Result<Vec<(f64, usize)>> {
        let mut sorted = candidates.to_vec();
        sorted.sort_by(|a, b| {
            OrderedFloat(a.0)
                .cmp(&OrderedFloat(b.0))
                .then(a.1.cmp(&b.1))
        });

        match self.selection {
            SelectionPolicy::Simple => {
                sorted.truncate(m);
                Ok(sorted)
            }
            SelectionPolicy::Heuristic => {
                let mut selected: Vec<(f64, usize)> = Vec::with_capacity(m);
                for &(dist_to_base, cid) in &sorted {
                    if selected.len() >= m {
                        break;
                    }
                    let mut diverse = true;
                    for &(_, kept) in &selected {
                        let dist_to_kept = self
                            .metric
                            .distance(&nodes[cid].vector, &nodes[kept].vector)
                            .map_err(|e| {
                                Error::metric_failure(
                                    format!("node {cid} against node {kept}"),
                                    e,
                                )
                            })?;
                        if dist_to_base >= dist_to_kept {
                            diverse = false;
                            break;
                        }
                    }
                    if diverse {
                        selected.push((dist_to_base, cid));
                    }
                }
                // Fill remaining slots with the closest unused candidates.
                if selected.len() < m {
                    for &(dist, cid) in &sorted {
                        if selected.len() >= m {
                            break;
                        }
                        if !selected.iter().any(|&(_, id)| id == cid) {
                            selected.push((dist, cid));
                        }
                    }
                }
                Ok(selected)
            }
        }
    }
}

impl VectorIndex for HnswIndex {
    fn add(&self, vector: &Vector) -> Result<()> {
        vector.validate()?;

        let inner = &mut *self.inner.write();
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

        let level = self.draw_level(&mut inner.rng);
        let new_id = inner.nodes.len();

        // First node becomes the entry point outright.
        if inner.nodes.is_empty() {
            inner.nodes.push(HnswNode {
                vector: vector.clone(),
                level,
                neighbors: vec![Vec::new(); level + 1],
            });
            inner.entry_point = Some(new_id);
            inner.max_layer = level;
            return Ok(());
        }

        let entry_point = inner
            .entry_point
            .expect("entry point exists once the graph is non-empty");
        let max_layer = inner.max_layer;
        let top = level.min(max_layer);

        let mut visited = HashSet::new();
        let mut current = entry_point;

        // Descent: greedy ef=1 routing from the top layer down to just
        // above the new node's level.
        for layer in (level + 1..=max_layer).rev() {
            let found = self.search_layer(
                &inner.nodes,
                vector,
                std::slice::from_ref(&current),
                1,
                layer,
                &mut visited,
            )?;
            if let Some(&(_, nearest)) = found.first() {
                current = nearest;
            }
        }

        // Insertion: search each layer with ef_construction and pick the
        // new node's edges. The layer's candidate set (not the pruned
        // selection) seeds the next layer down.
        let mut node_neighbors: Vec<Vec<usize>> = vec![Vec::new(); level + 1];
        let mut layer_eps: Vec<usize> = vec![current];
        for layer in (0..=top).rev() {
            let candidates = self.search_layer(
                &inner.nodes,
                vector,
                &layer_eps,
                self.ef_construction,
                layer,
                &mut visited,
            )?;
            let selected = self.select_neighbors(&inner.nodes, &candidates, self.m)?;
            node_neighbors[layer] = selected.iter().map(|&(_, id)| id).collect();

            layer_eps.clear();
            layer_eps.extend(candidates.iter().map(|&(_, id)| id));
            if layer_eps.is_empty() {
                layer_eps.push(entry_point);
            }
        }

        inner.nodes.push(HnswNode {
            vector: vector.clone(),
            level,
            neighbors: node_neighbors,
        });

        // Backlinks: every chosen edge gets its mirror, and any neighbor
        // pushed over its cap is pruned symmetrically.
        for layer in 0..=top {
            let cap = if layer == 0 { self.m_max } else { self.m };
            let chosen: Vec<usize> = inner.nodes[new_id].neighbors[layer].clone();
            for neighbor in chosen {
                inner.nodes[neighbor].neighbors[layer].push(new_id);
                if inner.nodes[neighbor].neighbors[layer].len() > cap {
                    self.prune_node(&mut inner.nodes, neighbor, layer, cap)?;
                }
            }
        }

        if level > inner.max_layer {
            inner.max_layer = level;
            inner.entry_point = Some(new_id);
            debug!(id = new_id, level, "entry point promoted");
        }
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
        if inner.nodes.is_empty() {
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

        let mut current = inner
            .entry_point
            .expect("entry point exists once the graph is non-empty");
        let mut visited = HashSet::new();

        for layer in (1..=inner.max_layer).rev() {
            let found = self.search_layer(
                &inner.nodes,
                query,
                std::slice::from_ref(&current),
                1,
                layer,
                &mut visited,
            )?;
            if let Some(&(_, nearest)) = found.first() {
                current = nearest;
            }
        }

        let ef = inner.ef_search.max(k);
        let found = self.search_layer(
            &inner.nodes,
            query,
            std::slice::from_ref(&current),
            ef,
            0,
            &mut visited,
        )?;

        Ok(found
            .into_iter()
            .take(k)
            .map(|(distance, id)| SearchResult {
                vector: inner.nodes[id].vector.clone(),
                distance,
                index: id,
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    fn dimension(&self) -> Option<usize> {
        self.inner.read().dimension
    }
}

impl HnswIndex {
    /// Re-select a node's edges at `layer` down to `cap`, removing every
    /// dropped edge from both endpoints so the graph stays bidirectional.
    fn prune_node(
        &self,
        nodes: &mut [HnswNode],
        id: usize,
        layer: usize,
        cap: usize,
    ) -> Result<()> {
        let (kept, dropped) = {
            let base = &nodes[id].vector;
            let connections = &nodes[id].neighbors[layer];
            let mut candidates = Vec::with_capacity(connections.len());
            for &c in connections {
                let dist = self
                    .metric
                    .distance(base, &nodes[c].vector)
                    .map_err(|e| Error::metric_failure(format!("node {id} against node {c}"), e))?;
                candidates.push((dist, c));
            }
            let kept: Vec<usize> = self
                .select_neighbors(nodes, &candidates, cap)?
                .into_iter()
                .map(|(_, cid)| cid)
                .collect();
            let dropped: Vec<usize> = connections
                .iter()
                .copied()
                .filter(|c| !kept.contains(c))
                .collect();
            (kept, dropped)
        };

        nodes[id].neighbors[layer] = kept;
        for d in dropped {
            nodes[d].neighbors[layer].retain(|&x| x != id);
        }
        Ok(())
    }
}
