//! The search engine: index construction and per-query strategy selection.

use crate::bptree::BPlusTree;
use crate::config;
use crate::dataset::{PointSet, QuerySet};
use crate::distance::euclidean_sq;
use crate::error::{EngineError, Result};
use crate::hnsw::{build_index, HnswConfig, HnswIndex};
use crate::parallel;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Dispatcher tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineParams {
    /// Neighbors returned per query.
    pub k: usize,
    /// Candidate breadth requested from the graph before post-filtering.
    /// Larger values buy recall under narrow filters at latency cost.
    pub k_init: usize,
    /// Filtered-candidate count at or below which the exact brute-force
    /// branch is taken instead of the graph.
    pub brute_threshold: usize,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            k: config::K,
            k_init: config::DEFAULT_K_INIT,
            brute_threshold: config::DEFAULT_BRUTE_THRESHOLD,
        }
    }
}

/// Index-construction options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildOptions {
    /// B+-tree order.
    pub tree_order: usize,
    /// Leaf fill fraction during bulk load.
    pub fill_factor: f32,
    /// Graph parameters, passed through to the HNSW builder.
    pub hnsw: HnswConfig,
    /// Worker threads for the graph build and query batches; 0 selects one
    /// per hardware thread.
    pub num_threads: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            tree_order: config::BPTREE_DEFAULT_ORDER,
            fill_factor: config::DEFAULT_FILL_FACTOR,
            hnsw: HnswConfig::default(),
            num_threads: 0,
        }
    }
}

/// The hybrid index and query dispatcher. Stateless after construction:
/// every field is read-only, so queries run concurrently without locks.
pub struct SearchEngine {
    points: PointSet,
    tree: BPlusTree,
    graph: HnswIndex,
    params: EngineParams,
    num_threads: usize,
}

impl SearchEngine {
    /// Build both indices over `points` and wire up the dispatcher.
    ///
    /// The tree is bulk-loaded in one pass; the graph build fans out across
    /// the worker pool. Both phases are timed and logged.
    pub fn build(points: PointSet, options: &BuildOptions, params: EngineParams) -> Result<Self> {
        if params.k == 0 {
            return Err(EngineError::InvalidParameter("k must be positive".into()));
        }
        if params.k_init < params.k {
            return Err(EngineError::InvalidParameter(format!(
                "k_init {} is below k {}",
                params.k_init, params.k
            )));
        }

        let start = Instant::now();
        let tree = BPlusTree::bulk_load(&points, options.tree_order, options.fill_factor)?;
        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            keys = tree.len(),
            depth = tree.depth(),
            "b+-tree bulk load finished"
        );

        let start = Instant::now();
        let graph = build_index(&points, &options.hnsw, options.num_threads)?;
        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            nodes = graph.len(),
            max_layer = graph.max_layer(),
            "hnsw graph built"
        );

        Ok(Self {
            points,
            tree,
            graph,
            params,
            num_threads: options.num_threads,
        })
    }

    /// The dataset the engine was built over.
    pub fn points(&self) -> &PointSet {
        &self.points
    }

    /// The range index.
    pub fn tree(&self) -> &BPlusTree {
        &self.tree
    }

    /// The proximity graph.
    pub fn graph(&self) -> &HnswIndex {
        &self.graph
    }

    /// The dispatcher parameters.
    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    /// Answer a single query: up to `k` ids, best first.
    ///
    /// Range queries (types 2 and 3) run the tree-then-dispatch pipeline;
    /// every other type lane passes through to unfiltered graph search.
    /// Fewer than `k` ids are returned when the filter admits fewer
    /// candidates than `k` or the graph beam runs dry after filtering.
    pub fn answer(&self, queries: &QuerySet, index: usize) -> Result<Vec<u32>> {
        self.check_dims(queries)?;
        Ok(self.answer_one(queries, index))
    }

    /// Answer every query in the batch, one task per query.
    ///
    /// The result table is pre-sized and each answer is written to the slot
    /// of its input position, so `result[i]` always belongs to query `i`
    /// regardless of completion order.
    pub fn answer_all(&self, queries: &QuerySet) -> Result<Vec<Vec<u32>>> {
        self.check_dims(queries)?;
        Ok(parallel::parallel_map(
            queries.len(),
            self.num_threads,
            |i| self.answer_one(queries, i),
        ))
    }

    /// Exact top-k for a query, by exhaustive scoring of the filtered set
    /// (or the whole dataset for non-range types). The ground truth for
    /// recall audits.
    pub fn exact_answer(&self, queries: &QuerySet, index: usize) -> Result<Vec<u32>> {
        self.check_dims(queries)?;
        let vec = queries.vector(index);
        let ids: Vec<u32> = if queries.kind(index).is_some_and(|k| k.is_range()) {
            let (l, r) = queries.bounds(index);
            self.tree.search_range(l, r)
        } else {
            (0..self.points.len() as u32).collect()
        };
        Ok(self.brute_force(&ids, vec))
    }

    fn check_dims(&self, queries: &QuerySet) -> Result<()> {
        if queries.vec_dim() != self.points.vec_dim() {
            return Err(EngineError::DimensionMismatch {
                expected: self.points.vec_dim(),
                actual: queries.vec_dim(),
            });
        }
        Ok(())
    }

    fn answer_one(&self, queries: &QuerySet, index: usize) -> Vec<u32> {
        let vec = queries.vector(index);
        match queries.kind(index) {
            Some(kind) if kind.is_range() => {
                let (l, r) = queries.bounds(index);
                let matched = self.tree.search_range(l, r);
                if matched.len() <= self.params.brute_threshold {
                    self.brute_force(&matched, vec)
                } else {
                    self.graph_post_filtered(vec, l, r)
                }
            }
            // Types 0/1 carry no range filter (the categorical lane is
            // reserved); unknown type lanes get the same treatment.
            _ => self
                .graph
                .search(vec, self.params.k)
                .into_iter()
                .map(|(_, id)| id)
                .collect(),
        }
    }

    /// Exact top-k over an explicit candidate set. Ties in distance resolve
    /// by ascending id.
    fn brute_force(&self, ids: &[u32], query: &[f32]) -> Vec<u32> {
        let mut scored: Vec<(f32, u32)> = ids
            .iter()
            .map(|&id| (euclidean_sq(self.points.vector(id), query), id))
            .collect();
        scored.sort_unstable_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        scored.truncate(self.params.k);
        scored.into_iter().map(|(_, id)| id).collect()
    }

    /// Wide graph search followed by the range post-filter. The graph
    /// returns candidates sorted by `(distance, id)` already, so filtering
    /// preserves rank order.
    fn graph_post_filtered(&self, query: &[f32], l: f32, r: f32) -> Vec<u32> {
        self.graph
            .search(query, self.params.k_init)
            .into_iter()
            .filter(|&(_, id)| {
                let key = self.points.continuous(id);
                l <= key && key <= r
            })
            .take(self.params.k)
            .map(|(_, id)| id)
            .collect()
    }
}
