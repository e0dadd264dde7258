//! Folds over a row-major value sequence.
//!
//! A [`Reducer`] only sees values; it never learns whether the sequence was
//! valid. Callers must check the terminal validation outcome and drop the
//! reducer's output on error.

use num_bigint::BigInt;
use num_traits::{One, Zero};

use crate::models::Matrix;

/// A fold step plus its final projection.
pub trait Reducer: Send + 'static {
    type Output: Send + 'static;

    /// Feed the next value in row-major order.
    fn push(&mut self, value: i64);

    /// Consume the accumulator.
    fn finish(self) -> Self::Output;
}

// =============================================================================
// Flatten
// =============================================================================

/// Comma-joined decimal rendering of every value.
#[derive(Debug, Default)]
pub struct Flatten {
    out: String,
}

impl Flatten {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reducer for Flatten {
    type Output = String;

    fn push(&mut self, value: i64) {
        // Every rendered value is non-empty, so an empty buffer means "first".
        if !self.out.is_empty() {
            self.out.push(',');
        }
        self.out.push_str(&value.to_string());
    }

    fn finish(self) -> String {
        self.out
    }
}

// =============================================================================
// Sum
// =============================================================================

/// Arbitrary-precision sum, identity 0.
#[derive(Debug)]
pub struct Sum {
    total: BigInt,
}

impl Sum {
    pub fn new() -> Self {
        Self { total: BigInt::zero() }
    }
}

impl Default for Sum {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for Sum {
    type Output = BigInt;

    fn push(&mut self, value: i64) {
        self.total += value;
    }

    fn finish(self) -> BigInt {
        self.total
    }
}

// =============================================================================
// Product
// =============================================================================

/// Arbitrary-precision product, identity 1.
///
/// Once a zero is seen the result is fixed at 0 and later values are only
/// counted, not multiplied.
#[derive(Debug)]
pub struct Product {
    total: BigInt,
    saw_zero: bool,
}

impl Product {
    pub fn new() -> Self {
        Self {
            total: BigInt::one(),
            saw_zero: false,
        }
    }
}

impl Default for Product {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for Product {
    type Output = BigInt;

    fn push(&mut self, value: i64) {
        if self.saw_zero {
            return;
        }
        if value == 0 {
            self.saw_zero = true;
            self.total = BigInt::zero();
            return;
        }
        self.total *= value;
    }

    fn finish(self) -> BigInt {
        self.total
    }
}

/// Fold an already validated matrix.
pub fn reduce_matrix<F: Reducer>(matrix: &Matrix, mut reducer: F) -> F::Output {
    for value in matrix.values() {
        reducer.push(value);
    }
    reducer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run<F: Reducer>(mut reducer: F, values: &[i64]) -> F::Output {
        for &v in values {
            reducer.push(v);
        }
        reducer.finish()
    }

    #[test]
    fn test_flatten() {
        assert_eq!(run(Flatten::new(), &[1, 2, 3]), "1,2,3");
        assert_eq!(run(Flatten::new(), &[-1, 0]), "-1,0");
        assert_eq!(run(Flatten::new(), &[]), "");
    }

    #[test]
    fn test_flatten_resplits_to_values() {
        let values = [5, -12, 0, 7, i64::MAX];
        let flat = run(Flatten::new(), &values);
        let back: Vec<i64> = flat.split(',').map(|s| s.parse().unwrap()).collect();
        assert_eq!(back, values);
    }

    #[test]
    fn test_sum_identity_and_overflow() {
        assert_eq!(run(Sum::new(), &[]), BigInt::zero());
        let total = run(Sum::new(), &[i64::MAX, i64::MAX, 2]);
        assert_eq!(total.to_string(), "18446744073709551616");
    }

    #[test]
    fn test_product_beyond_u64() {
        let total = run(Product::new(), &[i64::MAX, i64::MAX]);
        assert_eq!(total, BigInt::from(i64::MAX) * BigInt::from(i64::MAX));
        assert_eq!(run(Product::new(), &[-2, 3]), BigInt::from(-6));
        assert_eq!(run(Product::new(), &[]), BigInt::one());
    }

    #[test]
    fn test_product_zero_short_circuit() {
        let mut product = Product::new();
        for v in [5, 0, 7, -3] {
            product.push(v);
        }
        assert!(product.saw_zero);
        assert_eq!(product.finish(), BigInt::zero());
    }

    #[test]
    fn test_reduce_matrix() {
        let m = Matrix::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]]).unwrap();
        assert_eq!(reduce_matrix(&m, Sum::new()).to_string(), "45");
        assert_eq!(reduce_matrix(&m, Product::new()).to_string(), "362880");
        assert_eq!(reduce_matrix(&m, Flatten::new()), "1,2,3,4,5,6,7,8,9");
    }
}
