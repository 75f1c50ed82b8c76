//! # vecrange-core
//!
//! Hybrid index and query engine for range-filtered approximate k-nearest-
//! neighbor search: a bulk-loaded B+-tree over a scalar attribute answers
//! the range filter, an HNSW proximity graph over the vectors answers
//! nearest-neighbor search, and a dispatcher picks the cheaper strategy per
//! query. All state is immutable after build, so the query phase is
//! lock-free and embarrassingly parallel.
//!
//! This is a sync, zero-async library crate; the process surface lives in
//! the companion CLI crate.

/// Read-only B+-tree over the continuous attribute: bulk load and range scans.
pub mod bptree;
/// Reference configuration constants: row layouts, index and dispatcher defaults.
pub mod config;
/// Row-major dataset and query storage with lane accessors.
pub mod dataset;
/// Squared Euclidean distance kernel with SIMD dispatch.
pub mod distance;
/// Engine error taxonomy.
pub mod error;
/// HNSW proximity graph: parallel construction and layered search.
pub mod hnsw;
/// Binary readers/writers for the fixed dataset, query, and KNN formats.
pub mod io;
/// Scoped worker pools with atomic work claiming.
pub mod parallel;
/// Query dispatch: strategy selection, post-filtering, batch execution.
pub mod query;

pub use bptree::BPlusTree;
pub use dataset::{PointSet, QueryKind, QuerySet};
pub use error::{EngineError, Result};
pub use hnsw::{build_index, HnswBuilder, HnswConfig, HnswIndex};
pub use query::{recall, BuildOptions, EngineParams, SearchEngine};
