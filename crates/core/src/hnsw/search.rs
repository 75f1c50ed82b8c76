//! Layered greedy search.
//!
//! A single `search_layer` drives both construction (over the locked
//! builder) and querying (over the frozen index) through the
//! [`GraphView`] seam. Distances are exact single-precision squared
//! Euclidean throughout.

use crate::distance::euclidean_sq;
use crate::hnsw::graph::{GraphView, HnswIndex};
use crate::hnsw::visited::VisitedSet;
use ordered_float::OrderedFloat;
use std::collections::BinaryHeap;

/// Expansion frontier entry: `(negated distance, id)`.
/// `BinaryHeap` is a max-heap; negating the distance pops the closest first.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    neg_distance: OrderedFloat<f32>,
    id: u32,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.neg_distance.cmp(&other.neg_distance)
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Result-set entry, max-heap by distance so the worst result is peekable.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResultEntry {
    distance: OrderedFloat<f32>,
    id: u32,
}

impl Ord for ResultEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.distance.cmp(&other.distance)
    }
}

impl PartialOrd for ResultEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Beam search within one layer: returns up to `ef` nodes closest to
/// `query`, sorted ascending by distance. `visited` is reset on entry and
/// shared across the layers of one descent so re-entered nodes are skipped.
pub(crate) fn search_layer<G: GraphView>(
    graph: &G,
    query: &[f32],
    entry_points: &[u32],
    ef: usize,
    layer: usize,
    visited: &mut VisitedSet,
) -> Vec<(f32, u32)> {
    debug_assert_eq!(query.len(), graph.dim());
    visited.reset();
    let mut candidates: BinaryHeap<Candidate> = BinaryHeap::with_capacity(ef * 2);
    let mut results: BinaryHeap<ResultEntry> = BinaryHeap::with_capacity(ef + 1);
    // Cached worst distance, refreshed on result-set changes only.
    let mut worst_dist = f32::MAX;

    for &ep in entry_points {
        if visited.visit(ep) {
            let dist = euclidean_sq(query, graph.vector(ep));
            candidates.push(Candidate {
                neg_distance: OrderedFloat(-dist),
                id: ep,
            });
            results.push(ResultEntry {
                distance: OrderedFloat(dist),
                id: ep,
            });
            if results.len() > ef {
                results.pop();
            }
            if results.len() >= ef {
                worst_dist = results.peek().map_or(f32::MAX, |r| r.distance.0);
            }
        }
    }

    let mut neighbor_buf: Vec<u32> = Vec::new();
    while let Some(candidate) = candidates.pop() {
        let c_dist = -candidate.neg_distance.0;
        if results.len() >= ef && c_dist > worst_dist {
            break;
        }

        neighbor_buf.clear();
        graph.read_neighbors(candidate.id, layer, &mut neighbor_buf);
        for &neighbor in &neighbor_buf {
            if !visited.visit(neighbor) {
                continue;
            }
            let dist = euclidean_sq(query, graph.vector(neighbor));
            if results.len() < ef || dist < worst_dist {
                candidates.push(Candidate {
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
                worst_dist = results.peek().map_or(f32::MAX, |r| r.distance.0);
            }
        }
    }

    results
        .into_sorted_vec()
        .into_iter()
        .map(|r| (r.distance.0, r.id))
        .collect()
}

/// Greedy single-entry descent through the layers above `to_layer`,
/// returning the entry point for the layer below.
pub(crate) fn descend<G: GraphView>(
    graph: &G,
    query: &[f32],
    mut entry: u32,
    from_layer: usize,
    to_layer: usize,
    visited: &mut VisitedSet,
) -> u32 {
    for layer in (to_layer + 1..=from_layer).rev() {
        let found = search_layer(graph, query, std::slice::from_ref(&entry), 1, layer, visited);
        if let Some(&(_, nearest)) = found.first() {
            entry = nearest;
        }
    }
    entry
}

impl HnswIndex {
    /// Top-k nearest vectors to `query`, best effort.
    ///
    /// Returns up to `k` `(squared distance, id)` pairs sorted ascending by
    /// distance, ties broken by ascending id. The beam width at layer 0 is
    /// `max(ef_search, k)`. An empty graph yields an empty vec.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(f32, u32)> {
        debug_assert_eq!(query.len(), self.dim);
        let Some(entry) = self.entry_point else {
            return Vec::new();
        };

        let mut visited = VisitedSet::new(self.len());
        let entry = descend(self, query, entry, self.max_layer, 0, &mut visited);

        let ef = self.config.ef_search.max(k);
        let mut results = search_layer(
            self,
            query,
            std::slice::from_ref(&entry),
            ef,
            0,
            &mut visited,
        );
        results.sort_unstable_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        results.truncate(k);
        results
    }
}
