//! Domain models for the matrix service.
//!
//! - [`Matrix`] - Row-major grid of integers with aligned rows

use serde::{Deserialize, Serialize};

use crate::error::{MatrixError, MatrixResult};

// =============================================================================
// Matrix
// =============================================================================

/// A row-major grid of integers.
///
/// Every row has the same length. Squareness is not a type invariant: the
/// strict loader enforces it on ingestion, while transposition works on any
/// rectangular grid.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<i64>>", into = "Vec<Vec<i64>>")]
pub struct Matrix {
    rows: Vec<Vec<i64>>,
}

impl Matrix {
    /// Build a matrix from rows, rejecting ragged input.
    ///
    /// Rows without cells are rejected as `EmptyInput`: a grid with rows but no
    /// columns has no transpose that keeps its row count.
    pub fn from_rows(rows: Vec<Vec<i64>>) -> MatrixResult<Self> {
        if let Some(first) = rows.first() {
            let cols = first.len();
            if cols == 0 {
                return Err(MatrixError::EmptyInput);
            }
            if rows.iter().any(|row| row.len() != cols) {
                return Err(MatrixError::NotAligned);
            }
        }
        Ok(Self { rows })
    }

    /// Rows in order.
    pub fn rows(&self) -> &[Vec<i64>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_cols(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell values in row-major order.
    pub fn values(&self) -> impl Iterator<Item = i64> + '_ {
        self.rows.iter().flat_map(|row| row.iter().copied())
    }

    /// Swap rows and columns: `out[j][i] == self[i][j]`.
    pub fn transpose(&self) -> Matrix {
        let (rows, cols) = (self.num_rows(), self.num_cols());
        let mut transposed = vec![Vec::with_capacity(rows); cols];
        for row in &self.rows {
            for (j, &value) in row.iter().enumerate() {
                transposed[j].push(value);
            }
        }
        Matrix { rows: transposed }
    }
}

impl From<Matrix> for Vec<Vec<i64>> {
    fn from(matrix: Matrix) -> Self {
        matrix.rows
    }
}

impl TryFrom<Vec<Vec<i64>>> for Matrix {
    type Error = MatrixError;

    fn try_from(rows: Vec<Vec<i64>>) -> MatrixResult<Self> {
        Matrix::from_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: &[&[i64]]) -> Matrix {
        Matrix::from_rows(rows.iter().map(|r| r.to_vec()).collect()).unwrap()
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = Matrix::from_rows(vec![vec![1, 2], vec![3]]).unwrap_err();
        assert_eq!(err, MatrixError::NotAligned);
    }

    #[test]
    fn test_rows_without_cells_rejected() {
        assert_eq!(Matrix::from_rows(vec![vec![]]), Err(MatrixError::EmptyInput));
        assert_eq!(
            Matrix::from_rows(vec![vec![], vec![]]),
            Err(MatrixError::EmptyInput)
        );
        assert!(serde_json::from_str::<Matrix>("[[]]").is_err());
        // No rows at all is the empty matrix
        assert_eq!(Matrix::from_rows(Vec::new()), Ok(Matrix::default()));
    }

    #[test]
    fn test_dimensions() {
        let m = matrix(&[&[1, 2, 3], &[4, 5, 6]]);
        assert_eq!(m.num_rows(), 2);
        assert_eq!(m.num_cols(), 3);

        let empty = Matrix::default();
        assert!(empty.is_empty());
        assert_eq!(empty.num_cols(), 0);
    }

    #[test]
    fn test_values_are_row_major() {
        let m = matrix(&[&[1, 2], &[3, 4]]);
        assert_eq!(m.values().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_transpose_rectangular() {
        let m = matrix(&[&[1, 2, 3], &[4, 5, 6]]);
        let t = m.transpose();
        assert_eq!(t, matrix(&[&[1, 4], &[2, 5], &[3, 6]]));
    }

    #[test]
    fn test_double_transpose_is_identity() {
        for m in [
            matrix(&[&[1, 2, 3], &[4, 5, 6]]),
            matrix(&[&[7]]),
            matrix(&[&[1, -2], &[3, 0], &[5, 6]]),
            Matrix::default(),
        ] {
            assert_eq!(m.transpose().transpose(), m);
        }
    }

    #[test]
    fn test_serde_as_nested_arrays() {
        let m = matrix(&[&[1, 2], &[3, 4]]);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "[[1,2],[3,4]]");
        let back: Matrix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);

        assert!(serde_json::from_str::<Matrix>("[[1,2],[3]]").is_err());
    }
}
