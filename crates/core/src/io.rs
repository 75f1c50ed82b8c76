//! Binary readers and writers for the fixed external formats.
//!
//! Dataset / query files: a little-endian u32 row count, then `N * row_dim`
//! f32 lanes. The row width is supplied by the caller; the file does not
//! carry it. KNN result files: `N * k` u32 ids, row-major, no header — the
//! row count is derived from the file size.

use crate::dataset::{PointSet, QuerySet};
use crate::error::{EngineError, Result};
use std::fs;
use std::path::Path;

/// Read a dataset file into a [`PointSet`] with the given row width
/// (vector lanes plus the two point-metadata lanes).
pub fn read_points(path: &Path, row_dim: usize) -> Result<PointSet> {
    let (rows, data) = read_rows(path, row_dim)?;
    tracing::info!(path = %path.display(), rows, row_dim, "dataset loaded");
    PointSet::new(data, row_dim)
}

/// Read a query file into a [`QuerySet`] with the given row width
/// (vector lanes plus the four query-metadata lanes).
pub fn read_queries(path: &Path, row_dim: usize) -> Result<QuerySet> {
    let (rows, data) = read_rows(path, row_dim)?;
    tracing::info!(path = %path.display(), rows, row_dim, "queries loaded");
    QuerySet::new(data, row_dim)
}

fn read_rows(path: &Path, row_dim: usize) -> Result<(usize, Vec<f32>)> {
    let bytes = fs::read(path)?;
    if bytes.len() < 4 {
        return Err(EngineError::TruncatedFile {
            path: path.to_path_buf(),
            expected: 4,
            actual: bytes.len(),
        });
    }
    let rows = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let expected = 4 + rows * row_dim * 4;
    if bytes.len() != expected {
        return Err(EngineError::TruncatedFile {
            path: path.to_path_buf(),
            expected,
            actual: bytes.len(),
        });
    }

    let data = bytes[4..]
        .chunks_exact(4)
        .map(|lane| f32::from_le_bytes([lane[0], lane[1], lane[2], lane[3]]))
        .collect();
    Ok((rows, data))
}

/// Write a KNN result table: `knns.len() * k` u32 ids, row-major.
///
/// Every row must hold exactly `k` ids; callers that can produce short rows
/// pad them first (the CLI uses `u32::MAX` as its sentinel).
pub fn save_knn(knns: &[Vec<u32>], k: usize, path: &Path) -> Result<()> {
    for (row, knn) in knns.iter().enumerate() {
        if knn.len() != k {
            return Err(EngineError::RowLength {
                row,
                len: knn.len(),
                k,
            });
        }
    }

    let mut out = Vec::with_capacity(knns.len() * k * 4);
    for knn in knns {
        for &id in knn {
            out.extend_from_slice(&id.to_le_bytes());
        }
    }
    fs::write(path, out)?;
    tracing::info!(path = %path.display(), rows = knns.len(), k, "knn results saved");
    Ok(())
}

/// Read a KNN result table back. The row count is `file_size / (k * 4)`;
/// any other size is a configuration error.
pub fn read_knn(path: &Path, k: usize) -> Result<Vec<Vec<u32>>> {
    let bytes = fs::read(path)?;
    let row_bytes = k * 4;
    if row_bytes == 0 || bytes.len() % row_bytes != 0 {
        return Err(EngineError::InvalidKnnFile {
            path: path.to_path_buf(),
            len: bytes.len(),
            k,
        });
    }

    Ok(bytes
        .chunks_exact(row_bytes)
        .map(|row| {
            row.chunks_exact(4)
                .map(|id| u32::from_le_bytes([id[0], id[1], id[2], id[3]]))
                .collect()
        })
        .collect())
}

/// Assemble a dataset/query file image in the external format. Shared by the
/// tests and benchmarks that fabricate inputs.
pub fn encode_rows(rows: &[Vec<f32>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(rows.len() as u32).to_le_bytes());
    for row in rows {
        for &lane in row {
            out.extend_from_slice(&lane.to_le_bytes());
        }
    }
    out
}

/// Convenience: [`encode_rows`] written straight to `path`.
pub fn write_rows(rows: &[Vec<f32>], path: &Path) -> Result<()> {
    fs::write(path, encode_rows(rows))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{POINT_EXTRAS, QUERY_EXTRAS};
    use tempfile::tempdir;

    #[test]
    fn test_point_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("points.bin");
        let rows = vec![
            vec![0.0, 42.0, 0.25, -0.5],
            vec![1.0, 7.0, 0.75, 0.125],
        ];
        write_rows(&rows, &path).unwrap();

        let points = read_points(&path, POINT_EXTRAS + 2).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points.continuous(0), 42.0);
        assert_eq!(points.vector(1), &[0.75, 0.125]);
    }

    #[test]
    fn test_query_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queries.bin");
        let rows = vec![vec![2.0, 0.0, 1.0, 9.0, 0.5, 0.5]];
        write_rows(&rows, &path).unwrap();

        let queries = read_queries(&path, QUERY_EXTRAS + 2).unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries.bounds(0), (1.0, 9.0));
        assert_eq!(queries.vector(0), &[0.5, 0.5]);
    }

    #[test]
    fn test_header_row_count_must_match_payload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.bin");
        // Header claims 3 rows but only one row of 4 lanes follows.
        let mut bytes = 3u32.to_le_bytes().to_vec();
        bytes.extend([0u8; 16]);
        std::fs::write(&path, bytes).unwrap();

        assert!(matches!(
            read_points(&path, 4),
            Err(EngineError::TruncatedFile { .. })
        ));
    }

    #[test]
    fn test_file_shorter_than_header_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tiny.bin");
        std::fs::write(&path, [1u8, 0]).unwrap();
        assert!(matches!(
            read_points(&path, 4),
            Err(EngineError::TruncatedFile { .. })
        ));
    }

    #[test]
    fn test_empty_dataset_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        write_rows(&[], &path).unwrap();
        let points = read_points(&path, POINT_EXTRAS + 2).unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn test_knn_roundtrip_is_identical() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("output.bin");
        let knns: Vec<Vec<u32>> = (0..5)
            .map(|q| (0..10).map(|j| q * 100 + j).collect())
            .collect();

        save_knn(&knns, 10, &path).unwrap();
        let loaded = read_knn(&path, 10).unwrap();
        assert_eq!(knns, loaded);
    }

    #[test]
    fn test_save_knn_refuses_ragged_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ragged.bin");
        let knns = vec![vec![1, 2, 3], vec![4, 5]];
        assert!(matches!(
            save_knn(&knns, 3, &path),
            Err(EngineError::RowLength { row: 1, len: 2, k: 3 })
        ));
    }

    #[test]
    fn test_read_knn_validates_size_multiple() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("odd.bin");
        std::fs::write(&path, [0u8; 10]).unwrap();
        assert!(matches!(
            read_knn(&path, 3),
            Err(EngineError::InvalidKnnFile { .. })
        ));
    }

    #[test]
    fn test_read_knn_derives_row_count_from_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("derived.bin");
        let knns = vec![vec![9u32, 8, 7], vec![1, 2, 3], vec![4, 5, 6]];
        save_knn(&knns, 3, &path).unwrap();
        let loaded = read_knn(&path, 3).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[2], vec![4, 5, 6]);
    }
}
