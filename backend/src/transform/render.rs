//! CSV rendering for materialized matrices.
//!
//! Shared by every service implementation; none of this depends on how the
//! matrix was ingested.

use crate::models::Matrix;

/// Render a matrix as CSV text: cells joined by `,`, rows joined by `\n`,
/// no trailing separators.
pub fn echo(matrix: &Matrix) -> String {
    let mut out = String::new();
    for (i, row) in matrix.rows().iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for (j, value) in row.iter().enumerate() {
            if j > 0 {
                out.push(',');
            }
            out.push_str(&value.to_string());
        }
    }
    out
}

/// Render the transpose of `matrix`. Works for any rectangular grid.
pub fn invert(matrix: &Matrix) -> String {
    echo(&matrix.transpose())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: Vec<Vec<i64>>) -> Matrix {
        Matrix::from_rows(rows).unwrap()
    }

    #[test]
    fn test_echo() {
        assert_eq!(echo(&matrix(vec![vec![1, 2], vec![3, 4]])), "1,2\n3,4");
    }

    #[test]
    fn test_echo_single_cell_and_empty() {
        assert_eq!(echo(&matrix(vec![vec![-7]])), "-7");
        assert_eq!(echo(&Matrix::default()), "");
    }

    #[test]
    fn test_invert_rectangular() {
        let m = matrix(vec![vec![1, 2, 3], vec![4, 5, 6]]);
        assert_eq!(invert(&m), "1,4\n2,5\n3,6");
    }

    #[test]
    fn test_invert_square() {
        let m = matrix(vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]]);
        assert_eq!(invert(&m), "1,4,7\n2,5,8\n3,6,9");
        assert_eq!(invert(&Matrix::default()), "");
    }

    #[test]
    fn test_echo_reparses_to_same_matrix() {
        let m = matrix(vec![vec![10, -20], vec![0, 40]]);
        let reparsed = crate::parser::load_matrix(echo(&m).as_bytes()).unwrap();
        assert_eq!(reparsed, m);
    }
}
