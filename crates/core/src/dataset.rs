//! Row-major storage for dataset points and query records.
//!
//! Both stores keep their rows in one contiguous `Vec<f32>` arena and hand
//! out slices into it. Row width is supplied by the caller at construction
//! time; the binary files do not carry it. The scalar metadata lanes that
//! precede the vector are fixed by [`config`](crate::config):
//! two for points (categorical tag, continuous attribute), four for queries
//! (type, categorical filter, `l`, `r`).

use crate::config;
use crate::error::{EngineError, Result};

/// The dataset: `N` fixed-width point rows, immutable after load.
///
/// Point ids are the row indices `[0, N)`.
#[derive(Debug, Clone)]
pub struct PointSet {
    data: Vec<f32>,
    row_dim: usize,
}

impl PointSet {
    /// Wrap a flat row-major buffer. `data.len()` must be a multiple of
    /// `row_dim`, and `row_dim` must leave room for the vector lanes.
    pub fn new(data: Vec<f32>, row_dim: usize) -> Result<Self> {
        if row_dim <= config::POINT_EXTRAS {
            return Err(EngineError::InvalidParameter(format!(
                "point row width {row_dim} leaves no vector lanes"
            )));
        }
        if data.len() % row_dim != 0 {
            return Err(EngineError::InvalidParameter(format!(
                "buffer of {} lanes is not a multiple of row width {row_dim}",
                data.len()
            )));
        }
        Ok(Self { data, row_dim })
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.data.len() / self.row_dim
    }

    /// Returns `true` if the set holds no points.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Width of a full row, metadata lanes included.
    pub fn row_dim(&self) -> usize {
        self.row_dim
    }

    /// Width of the vector portion of a row.
    pub fn vec_dim(&self) -> usize {
        self.row_dim - config::POINT_EXTRAS
    }

    /// Full row slice for a point, metadata lanes included.
    #[inline]
    pub fn row(&self, id: u32) -> &[f32] {
        let start = id as usize * self.row_dim;
        &self.data[start..start + self.row_dim]
    }

    /// Vector lanes of a point. O(1) slice into the contiguous arena.
    #[inline]
    pub fn vector(&self, id: u32) -> &[f32] {
        &self.row(id)[config::POINT_EXTRAS..]
    }

    /// Continuous attribute of a point (the B+-tree key).
    #[inline]
    pub fn continuous(&self, id: u32) -> f32 {
        self.row(id)[config::CONTINUOUS_LANE]
    }

    /// Categorical tag of a point. Reserved; not consulted by the engine.
    #[inline]
    pub fn categorical(&self, id: u32) -> f32 {
        self.row(id)[config::CATEGORICAL_LANE]
    }
}

/// Query type parsed from lane 0 of a query row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Type 0: plain nearest-neighbor search, no filter.
    Unfiltered,
    /// Type 1: categorical filter only. The categorical lane is reserved,
    /// so this is answered like [`QueryKind::Unfiltered`].
    Categorical,
    /// Type 2: range filter on the continuous attribute.
    Range,
    /// Type 3: categorical + range filter; answered like
    /// [`QueryKind::Range`].
    CategoricalRange,
}

impl QueryKind {
    /// Decode a query-type lane. Returns `None` for values outside {0,1,2,3}.
    pub fn from_lane(value: f32) -> Option<Self> {
        match value as i32 {
            0 => Some(Self::Unfiltered),
            1 => Some(Self::Categorical),
            2 => Some(Self::Range),
            3 => Some(Self::CategoricalRange),
            _ => None,
        }
    }

    /// Whether this query carries a range filter on the continuous attribute.
    pub fn is_range(self) -> bool {
        matches!(self, Self::Range | Self::CategoricalRange)
    }
}

/// A batch of query records with the same flat layout as [`PointSet`].
#[derive(Debug, Clone)]
pub struct QuerySet {
    data: Vec<f32>,
    row_dim: usize,
}

impl QuerySet {
    /// Wrap a flat row-major buffer of query rows.
    pub fn new(data: Vec<f32>, row_dim: usize) -> Result<Self> {
        if row_dim <= config::QUERY_EXTRAS {
            return Err(EngineError::InvalidParameter(format!(
                "query row width {row_dim} leaves no vector lanes"
            )));
        }
        if data.len() % row_dim != 0 {
            return Err(EngineError::InvalidParameter(format!(
                "buffer of {} lanes is not a multiple of row width {row_dim}",
                data.len()
            )));
        }
        Ok(Self { data, row_dim })
    }

    /// Number of queries.
    pub fn len(&self) -> usize {
        self.data.len() / self.row_dim
    }

    /// Returns `true` if the batch holds no queries.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Width of a full query row.
    pub fn row_dim(&self) -> usize {
        self.row_dim
    }

    /// Width of the vector portion of a query row.
    pub fn vec_dim(&self) -> usize {
        self.row_dim - config::QUERY_EXTRAS
    }

    /// Full row slice for a query.
    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        let start = i * self.row_dim;
        &self.data[start..start + self.row_dim]
    }

    /// Vector lanes of a query.
    #[inline]
    pub fn vector(&self, i: usize) -> &[f32] {
        &self.row(i)[config::QUERY_EXTRAS..]
    }

    /// Query type, or `None` if lane 0 holds an unknown value.
    #[inline]
    pub fn kind(&self, i: usize) -> Option<QueryKind> {
        QueryKind::from_lane(self.row(i)[config::QUERY_TYPE_LANE])
    }

    /// Closed range-filter interval `[l, r]` of a query.
    #[inline]
    pub fn bounds(&self, i: usize) -> (f32, f32) {
        let row = self.row(i);
        (
            row[config::QUERY_LOWER_LANE],
            row[config::QUERY_UPPER_LANE],
        )
    }

    /// Categorical filter lane. Reserved; not consulted by the engine.
    #[inline]
    pub fn categorical(&self, i: usize) -> f32 {
        self.row(i)[config::QUERY_CATEGORICAL_LANE]
    }
}
