//! Error types for the vecrange engine.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading data or building and querying the
/// hybrid index.
///
/// Recoverable emptiness (empty tree, inverted range interval) is expressed
/// as empty result collections, never as an error.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Underlying filesystem failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// File payload disagrees with its header or row width.
    #[error("{path}: expected {expected} bytes, found {actual}")]
    TruncatedFile {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    /// KNN result file size is not a multiple of `k * 4` bytes.
    #[error("{path}: size {len} is not a multiple of {k} * 4 bytes")]
    InvalidKnnFile { path: PathBuf, len: usize, k: usize },

    /// A result row does not hold exactly `k` ids.
    #[error("result row {row} has {len} ids, expected {k}")]
    RowLength { row: usize, len: usize, k: usize },

    /// Query vector width differs from the indexed vector width.
    #[error("dimension mismatch: query has {actual} lanes, index has {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A tuning parameter is outside its valid domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
