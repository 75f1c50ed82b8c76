//! Hierarchical Navigable Small World (HNSW) proximity graph.
//!
//! The graph is built once over the dataset's vector lanes and is immutable
//! during the query phase. Construction runs in parallel: a
//! [`HnswBuilder`] guards each node's neighbor table with its own lock so
//! inserts appear atomic to concurrent inserters, then freezes into a
//! lock-free [`HnswIndex`] for searching. Vectors are copied into a packed
//! arena owned by the graph; the scalar metadata lanes never enter it.

/// Parallel construction: per-node locking, heuristic neighbor selection.
mod build;
/// Graph storage, configuration, and the neighbor-access seam shared by the
/// builder and the frozen index.
mod graph;
/// Layered greedy search with a bounded candidate beam.
mod search;
/// Epoch-stamped visited set for graph traversal.
mod visited;

pub use build::{build_index, HnswBuilder};
pub use graph::{HnswConfig, HnswIndex};
