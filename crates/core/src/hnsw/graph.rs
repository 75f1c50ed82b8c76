//! HNSW graph storage and configuration.
//!
//! [`HnswConfig`] carries the tuning parameters; [`HnswIndex`] is the frozen
//! graph the query phase reads without locks. Vector data lives in one
//! contiguous arena, neighbor ids in per-node per-layer lists — the graph
//! stores ids only and owns its vector copies.

use crate::config;
use serde::{Deserialize, Serialize};

/// Tuning parameters for HNSW construction and search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswConfig {
    /// Bidirectional links per node on layers above 0.
    pub m: usize,
    /// Maximum links per node at layer 0 (typically `2 * m`).
    pub m_max0: usize,
    /// Candidate-list width during construction.
    pub ef_construction: usize,
    /// Candidate-list width during search; the effective width for a top-k
    /// request is `max(ef_search, k)`.
    pub ef_search: usize,
    /// Upper bound on the number of layers.
    pub max_layers: usize,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: config::HNSW_DEFAULT_M,
            m_max0: config::HNSW_DEFAULT_M * 2,
            ef_construction: config::HNSW_DEFAULT_EF_CONSTRUCTION,
            ef_search: config::HNSW_DEFAULT_EF_SEARCH,
            max_layers: config::HNSW_DEFAULT_MAX_LAYERS,
        }
    }
}

/// Uniform view over graph storage, implemented by both the locked builder
/// and the frozen index so the layer-search loop is written once.
pub(crate) trait GraphView {
    /// Vector lane width.
    fn dim(&self) -> usize;
    /// Vector slice of a node. O(1) into the packed arena.
    fn vector(&self, id: u32) -> &[f32];
    /// Append the node's neighbor ids at `layer` to `out`.
    fn read_neighbors(&self, id: u32, layer: usize, out: &mut Vec<u32>);
}

/// A frozen HNSW graph. All fields are immutable after
/// [`build_index`](crate::hnsw::build_index); readers need no
/// synchronization.
#[derive(Debug)]
pub struct HnswIndex {
    pub(crate) config: HnswConfig,
    pub(crate) dim: usize,
    /// Packed vector arena, `len * dim` lanes.
    pub(crate) vectors: Vec<f32>,
    /// Neighbor ids per node per layer: `neighbors[id][layer]`.
    pub(crate) neighbors: Vec<Vec<Vec<u32>>>,
    /// Top layer assigned to each node.
    pub(crate) levels: Vec<u8>,
    /// Entry node for searches; `None` iff the graph is empty.
    pub(crate) entry_point: Option<u32>,
    /// Highest populated layer.
    pub(crate) max_layer: usize,
}

impl HnswIndex {
    /// Number of indexed vectors.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Returns `true` if no vectors were indexed.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Vector lane width the graph was built with.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The configuration the graph was built with.
    pub fn config(&self) -> &HnswConfig {
        &self.config
    }

    /// Highest populated layer of the graph.
    pub fn max_layer(&self) -> usize {
        self.max_layer
    }
}

impl GraphView for HnswIndex {
    #[inline]
    fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    fn vector(&self, id: u32) -> &[f32] {
        let start = id as usize * self.dim;
        &self.vectors[start..start + self.dim]
    }

    #[inline]
    fn read_neighbors(&self, id: u32, layer: usize, out: &mut Vec<u32>) {
        let layers = &self.neighbors[id as usize];
        if layer < layers.len() {
            out.extend_from_slice(&layers[layer]);
        }
    }
}
