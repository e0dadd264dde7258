//! Single-pass strategy: parse and fold on the same worker.

use std::io::Read;

use crate::error::MatrixResult;
use crate::parser;
use crate::transform::reduce::Reducer;

use super::{join_outcome, MatrixProcessor};

/// Folds each cell as soon as it is parsed, with no handoff between threads.
///
/// The whole pass runs on a blocking worker so that slow or blocking sources
/// never stall the async runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialMatrixService;

impl SerialMatrixService {
    pub fn new() -> Self {
        Self
    }
}

impl MatrixProcessor for SerialMatrixService {
    fn name(&self) -> &'static str {
        "serial"
    }

    async fn reduce<R, F>(&self, source: R, mut reducer: F) -> MatrixResult<F::Output>
    where
        R: Read + Send + 'static,
        F: Reducer,
    {
        let joined = tokio::task::spawn_blocking(move || -> MatrixResult<F::Output> {
            parser::for_each_value(source, |value| {
                reducer.push(value);
                Ok(())
            })?;
            Ok(reducer.finish())
        })
        .await;

        join_outcome(joined)
    }
}
