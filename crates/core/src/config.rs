//! Reference configuration constants for the vecrange engine.
//!
//! Row layouts and tuning defaults are defined here. Structs such as
//! [`HnswConfig`](crate::hnsw::HnswConfig) and
//! [`EngineParams`](crate::query::EngineParams) draw their `Default` values
//! from these constants; the CLI can override them per run.

/// Number of neighbors returned per query in the reference workload.
pub const K: usize = 100;

/// Vector dimensionality of the reference dataset.
pub const VEC_DIM: usize = 100;

/// Scalar metadata lanes preceding the vector in a dataset row
/// (categorical tag + continuous attribute).
pub const POINT_EXTRAS: usize = 2;

/// Lane index of the categorical tag in a dataset row. Reserved; the engine
/// never reads it.
pub const CATEGORICAL_LANE: usize = 0;

/// Lane index of the continuous attribute in a dataset row. This is the
/// B+-tree key and the range-filter axis.
pub const CONTINUOUS_LANE: usize = 1;

/// Total width of a dataset row in the reference configuration.
pub const POINT_DIMENSION: usize = VEC_DIM + POINT_EXTRAS;

/// Scalar metadata lanes preceding the vector in a query row
/// (type + categorical filter + lower bound + upper bound).
pub const QUERY_EXTRAS: usize = 4;

/// Lane index of the query type in a query row.
pub const QUERY_TYPE_LANE: usize = 0;

/// Lane index of the categorical filter in a query row. Reserved.
pub const QUERY_CATEGORICAL_LANE: usize = 1;

/// Lane index of the range lower bound `l` in a query row.
pub const QUERY_LOWER_LANE: usize = 2;

/// Lane index of the range upper bound `r` in a query row.
pub const QUERY_UPPER_LANE: usize = 3;

/// Total width of a query row in the reference configuration.
pub const QUERY_DIMENSION: usize = VEC_DIM + QUERY_EXTRAS;

/// Default number of bidirectional links per HNSW node on upper layers.
/// Layer 0 uses twice this value.
pub const HNSW_DEFAULT_M: usize = 24;

/// Default candidate-list width during HNSW construction.
///
/// Higher values produce a better-connected graph at build-time cost.
pub const HNSW_DEFAULT_EF_CONSTRUCTION: usize = 140;

/// Default candidate-list width during HNSW search. The effective width is
/// `max(ef_search, k)` for a top-k request.
pub const HNSW_DEFAULT_EF_SEARCH: usize = 100;

/// Maximum number of layers in the HNSW graph.
pub const HNSW_DEFAULT_MAX_LAYERS: usize = 16;

/// Default candidate breadth requested from the graph before post-filtering.
///
/// Must be well above [`K`]; controls the recall/latency trade-off under
/// narrow range filters.
pub const DEFAULT_K_INIT: usize = 3000;

/// Default threshold on the filtered-candidate count below which the
/// dispatcher scores the candidates exhaustively instead of searching the
/// graph. Larger values buy recall on narrow filters at CPU cost.
pub const DEFAULT_BRUTE_THRESHOLD: usize = 4000;

/// Default B+-tree order. A leaf holds at most `2 * order` keys; an internal
/// node at most `2 * order` separators.
pub const BPTREE_DEFAULT_ORDER: usize = 100;

/// Default fraction of leaf capacity used during bulk load. Kept for
/// interface compatibility; the tree is read-only, so reserved slack is
/// never consumed.
pub const DEFAULT_FILL_FACTOR: f32 = 1.0;
