//! Basis store: the mean field and the truncated modal basis.
//!
//! Both arrays are loaded once at startup and are immutable afterwards; the
//! store is shared by reference (or `Arc`) between any number of sessions.

use std::path::Path;
use std::time::Instant;

use tracing::info;

use crate::error::LoadError;
use crate::io::read_npy;

/// Row-major `F x M` matrix whose columns are the modal directions.
///
/// Columns are ordered by descending explained variance, so truncating to
/// `k` modes always means "the first `k` columns".
#[derive(Debug, Clone, PartialEq)]
pub struct BasisMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl BasisMatrix {
    /// Creates a matrix from row-major data.
    pub fn from_row_major(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, LoadError> {
        match rows.checked_mul(cols) {
            Some(expected) if expected == data.len() => {}
            Some(expected) => {
                return Err(LoadError::ShapeMismatch(format!(
                    "basis data has {} values, expected {} x {} = {}",
                    data.len(),
                    rows,
                    cols,
                    expected
                )))
            }
            None => {
                return Err(LoadError::ShapeMismatch(format!(
                    "basis shape {} x {} is too large",
                    rows, cols
                )))
            }
        }
        if cols == 0 {
            return Err(LoadError::ShapeMismatch("basis has no modes".into()));
        }
        Ok(Self { rows, cols, data })
    }

    /// Builds a matrix from a list of rows; all rows must share a length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, LoadError> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != cols) {
            return Err(LoadError::ShapeMismatch(format!(
                "basis row {} has {} values, expected {}",
                i,
                row.len(),
                cols
            )));
        }
        let data = rows.iter().flatten().copied().collect();
        Self::from_row_major(rows.len(), cols, data)
    }

    /// Number of mesh points (field dimension F).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of available modes (M).
    pub fn modes(&self) -> usize {
        self.cols
    }

    /// Row `i` across all modes.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Value at `(row, mode)`.
    pub fn get(&self, row: usize, mode: usize) -> f64 {
        self.data[row * self.cols + mode]
    }

    /// Row-major backing storage.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// The immutable mean field and basis matrix for one physical quantity.
#[derive(Debug, Clone)]
pub struct BasisStore {
    mean: Vec<f64>,
    basis: BasisMatrix,
}

impl BasisStore {
    /// Pairs a mean field with a basis, checking that their lengths agree.
    pub fn new(mean: Vec<f64>, basis: BasisMatrix) -> Result<Self, LoadError> {
        if mean.len() != basis.rows() {
            return Err(LoadError::ShapeMismatch(format!(
                "mean field has {} points but basis has {} rows",
                mean.len(),
                basis.rows()
            )));
        }
        if mean.is_empty() {
            return Err(LoadError::ShapeMismatch("mean field is empty".into()));
        }
        Ok(Self { mean, basis })
    }

    /// Loads the mean field and basis matrix from `.npy` files.
    ///
    /// The mean may have any shape and is flattened; the basis must be 2-D
    /// with one row per mesh point.
    pub fn load(mean_path: &Path, basis_path: &Path) -> Result<Self, LoadError> {
        let start = Instant::now();

        let mean = read_npy(mean_path)?;
        let basis = read_npy(basis_path)?;
        if basis.ndim() != 2 {
            return Err(LoadError::ShapeMismatch(format!(
                "basis {} must be 2-D, found shape {:?}",
                basis_path.display(),
                basis.shape
            )));
        }

        let matrix = BasisMatrix::from_row_major(basis.shape[0], basis.shape[1], basis.data)?;
        let store = Self::new(mean.data, matrix)?;

        info!(
            points = store.field_len(),
            modes = store.max_modes(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "loaded basis store"
        );
        Ok(store)
    }

    /// The mean field values.
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// The modal basis.
    pub fn basis(&self) -> &BasisMatrix {
        &self.basis
    }

    /// Field dimension F.
    pub fn field_len(&self) -> usize {
        self.mean.len()
    }

    /// Maximum available mode count M.
    pub fn max_modes(&self) -> usize {
        self.basis.modes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::write_npy;
    use tempfile::tempdir;

    #[test]
    fn test_from_rows_layout() {
        let basis = BasisMatrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]).unwrap();
        assert_eq!(basis.rows(), 3);
        assert_eq!(basis.modes(), 2);
        assert_eq!(basis.row(2), &[1.0, 1.0]);
        assert_eq!(basis.get(1, 1), 1.0);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = BasisMatrix::from_rows(&[vec![1.0, 0.0], vec![0.0]]);
        assert!(matches!(result, Err(LoadError::ShapeMismatch(_))));
    }

    #[test]
    fn test_mean_length_must_match_rows() {
        let basis = BasisMatrix::from_rows(&[vec![1.0], vec![2.0]]).unwrap();
        let result = BasisStore::new(vec![300.0; 3], basis);
        assert!(matches!(result, Err(LoadError::ShapeMismatch(_))));
    }

    #[test]
    fn test_load_from_npy() {
        let dir = tempdir().unwrap();
        let mean_path = dir.path().join("mean.npy");
        let basis_path = dir.path().join("basis.npy");
        // Mean stored as a column vector, like the offline pipeline writes it.
        write_npy(&mean_path, &[3, 1], &[10.0, 10.0, 10.0]).unwrap();
        write_npy(&basis_path, &[3, 2], &[1.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();

        let store = BasisStore::load(&mean_path, &basis_path).unwrap();
        assert_eq!(store.field_len(), 3);
        assert_eq!(store.max_modes(), 2);
        assert_eq!(store.mean(), &[10.0, 10.0, 10.0]);
    }

    #[test]
    fn test_load_rejects_one_dimensional_basis() {
        let dir = tempdir().unwrap();
        let mean_path = dir.path().join("mean.npy");
        let basis_path = dir.path().join("basis.npy");
        write_npy(&mean_path, &[2], &[1.0, 2.0]).unwrap();
        write_npy(&basis_path, &[2], &[1.0, 2.0]).unwrap();

        assert!(matches!(
            BasisStore::load(&mean_path, &basis_path),
            Err(LoadError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_overflowing_shape_rejected() {
        let result = BasisMatrix::from_row_major(4, 1 << 62, Vec::new());
        assert!(matches!(result, Err(LoadError::ShapeMismatch(_))));
    }

    #[test]
    fn test_load_rejects_oversized_basis_header() {
        let dir = tempdir().unwrap();
        let mean_path = dir.path().join("mean.npy");
        let basis_path = dir.path().join("basis.npy");
        write_npy(&mean_path, &[4], &[300.0; 4]).unwrap();

        let header = "{'descr': '<f8', 'fortran_order': False, 'shape': (4, 4611686018427387904), }\n";
        let mut bytes = b"\x93NUMPY\x01\x00".to_vec();
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        std::fs::write(&basis_path, bytes).unwrap();

        assert!(matches!(
            BasisStore::load(&mean_path, &basis_path),
            Err(LoadError::Npy { .. })
        ));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempdir().unwrap();
        let result = BasisStore::load(&dir.path().join("nope.npy"), &dir.path().join("nada.npy"));
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }
}
