//! Matrix processing services.
//!
//! Two strategies implement the same [`MatrixProcessor`] contract:
//!
//! - [`SerialMatrixService`] - one blocking pass that folds each cell as it is parsed
//! - [`StreamingMatrixService`] - a producer on a blocking worker emits cells over a
//!   bounded channel while the async consumer folds them
//!
//! Echo and invert operate on a materialized [`Matrix`] and are shared by both
//! strategies through provided trait methods.
//!
//! ```rust,ignore
//! use matrix_api::{MatrixProcessor, StreamingMatrixService};
//!
//! let svc = StreamingMatrixService::new(64);
//! let total = svc.sum("1,2\n3,4".as_bytes()).await?;
//! assert_eq!(total.to_string(), "10");
//! ```

pub mod serial;
pub mod streaming;

use std::future::Future;
use std::io::Read;

use num_bigint::BigInt;
use tokio::task::JoinError;

use crate::error::{MatrixError, MatrixResult};
use crate::models::Matrix;
use crate::transform::reduce::{Flatten, Product, Reducer, Sum};
use crate::transform::render;

pub use serial::SerialMatrixService;
pub use streaming::{stream_matrix, MatrixStream, StreamingMatrixService};

/// Contract shared by every processing strategy.
///
/// File-stream operations validate the whole source: a result is only returned
/// when the input is a well-formed square integer matrix.
pub trait MatrixProcessor: Send + Sync + 'static {
    /// Strategy name, for logs and health output.
    fn name(&self) -> &'static str;

    /// Render a matrix back as CSV text.
    fn echo(&self, matrix: &Matrix) -> String {
        render::echo(matrix)
    }

    /// Render the transpose of a matrix as CSV text.
    fn invert(&self, matrix: &Matrix) -> String {
        render::invert(matrix)
    }

    /// Validate `source` and fold every cell into `reducer`.
    ///
    /// On any validation error the partial accumulation is dropped.
    fn reduce<R, F>(
        &self,
        source: R,
        reducer: F,
    ) -> impl Future<Output = MatrixResult<F::Output>> + Send
    where
        R: Read + Send + 'static,
        F: Reducer;

    /// Comma-joined cells in row-major order.
    fn flatten<R>(&self, source: R) -> impl Future<Output = MatrixResult<String>> + Send
    where
        R: Read + Send + 'static,
    {
        self.reduce(source, Flatten::new())
    }

    /// Sum of all cells.
    fn sum<R>(&self, source: R) -> impl Future<Output = MatrixResult<BigInt>> + Send
    where
        R: Read + Send + 'static,
    {
        self.reduce(source, Sum::new())
    }

    /// Product of all cells; exactly 0 when any cell is 0.
    fn multiply<R>(&self, source: R) -> impl Future<Output = MatrixResult<BigInt>> + Send
    where
        R: Read + Send + 'static,
    {
        self.reduce(source, Product::new())
    }
}

/// Unwrap the outcome of a blocking worker.
///
/// Panics are resumed on the caller; a worker aborted by runtime shutdown is
/// reported as cancelled.
pub(crate) fn join_outcome<T>(joined: Result<MatrixResult<T>, JoinError>) -> MatrixResult<T> {
    match joined {
        Ok(outcome) => outcome,
        Err(err) => match err.try_into_panic() {
            Ok(payload) => std::panic::resume_unwind(payload),
            Err(_) => Err(MatrixError::Cancelled),
        },
    }
}
