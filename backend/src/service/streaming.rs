//! Producer/consumer strategy.
//!
//! [`stream_matrix`] spawns a producer on a blocking worker that parses the
//! source and pushes each cell through a bounded channel. The consumer drains
//! the channel as a [`Stream`] and then calls [`MatrixStream::finish`] to learn
//! whether the matrix as a whole was valid. Squareness is only decidable at end
//! of input, so a fully drained stream can still fail.

use std::io::Read;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::logs::log_warning;
use crate::error::{MatrixError, MatrixResult};
use crate::parser;
use crate::transform::reduce::Reducer;

use super::{join_outcome, MatrixProcessor};

/// Default capacity of the value channel between producer and consumer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Cells of a matrix in row-major order, plus the deferred validation outcome.
///
/// Dropping the stream (or calling [`finish`](Self::finish) before draining)
/// closes the channel; the producer notices on its next send, stops reading
/// and releases the source.
#[derive(Debug)]
pub struct MatrixStream {
    values: mpsc::Receiver<i64>,
    outcome: JoinHandle<MatrixResult<usize>>,
}

impl MatrixStream {
    /// Resolve the deferred validation outcome, consuming the stream.
    ///
    /// Returns the matrix dimension on success. If values were still pending,
    /// the producer is cancelled and this resolves to
    /// [`MatrixError::Cancelled`] unless it had already finished validating.
    pub async fn finish(self) -> MatrixResult<usize> {
        let MatrixStream { values, outcome } = self;
        drop(values);
        join_outcome(outcome.await)
    }

    /// Drain every value into `reducer`, then check the deferred outcome.
    pub async fn fold<F: Reducer>(mut self, mut reducer: F) -> MatrixResult<F::Output> {
        while let Some(value) = self.next().await {
            reducer.push(value);
        }
        self.finish().await?;
        Ok(reducer.finish())
    }
}

impl Stream for MatrixStream {
    type Item = i64;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<i64>> {
        self.values.poll_recv(cx)
    }
}

/// Start parsing `source` on a blocking worker.
///
/// Must be called from within a Tokio runtime. `capacity` bounds how far the
/// producer may run ahead of the consumer; values below 1 are raised to 1.
pub fn stream_matrix<R>(source: R, capacity: usize) -> MatrixStream
where
    R: Read + Send + 'static,
{
    let (tx, values) = mpsc::channel(capacity.max(1));

    let outcome = tokio::task::spawn_blocking(move || {
        let result = parser::for_each_value(source, |value| {
            tx.blocking_send(value).map_err(|_| MatrixError::Cancelled)
        });
        if result == Err(MatrixError::Cancelled) {
            log_warning("Matrix stream cancelled: consumer stopped draining");
        }
        result
    });

    MatrixStream { values, outcome }
}

/// Overlaps parsing with reduction through a bounded channel.
#[derive(Debug, Clone, Copy)]
pub struct StreamingMatrixService {
    capacity: usize,
}

impl StreamingMatrixService {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for StreamingMatrixService {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl MatrixProcessor for StreamingMatrixService {
    fn name(&self) -> &'static str {
        "streaming"
    }

    async fn reduce<R, F>(&self, source: R, reducer: F) -> MatrixResult<F::Output>
    where
        R: Read + Send + 'static,
        F: Reducer,
    {
        stream_matrix(source, self.capacity).fold(reducer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::reduce::Sum;
    use std::io::Cursor;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn square_csv(dim: usize) -> String {
        (0..dim)
            .map(|i| {
                (0..dim)
                    .map(|j| (i * dim + j).to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Source that reports when the producer releases it.
    struct Tracked<R> {
        inner: R,
        dropped: Option<oneshot::Sender<()>>,
    }

    impl<R: Read> Read for Tracked<R> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl<R> Drop for Tracked<R> {
        fn drop(&mut self) {
            if let Some(tx) = self.dropped.take() {
                let _ = tx.send(());
            }
        }
    }

    #[tokio::test]
    async fn test_values_then_success() {
        let stream = stream_matrix("1,2\n3,4".as_bytes(), 1);
        let (values, stream) = collect_all(stream).await;
        assert_eq!(values, vec![1, 2, 3, 4]);
        assert_eq!(stream.finish().await, Ok(2));
    }

    #[tokio::test]
    async fn test_full_drain_still_reports_not_square() {
        let stream = stream_matrix("1,2,3\n4,5,6".as_bytes(), 8);
        let (values, stream) = collect_all(stream).await;
        // Every value was well-formed, the shape was not
        assert_eq!(values.len(), 6);
        assert_eq!(stream.finish().await, Err(MatrixError::NotSquare));
    }

    #[tokio::test]
    async fn test_partial_emission_before_not_integer() {
        let stream = stream_matrix("1,2\n3,a".as_bytes(), 8);
        let (values, stream) = collect_all(stream).await;
        assert_eq!(values, vec![1, 2, 3]);
        assert_eq!(stream.finish().await, Err(MatrixError::NotInteger));
    }

    #[tokio::test]
    async fn test_empty_emits_nothing() {
        let stream = stream_matrix("".as_bytes(), 8);
        let (values, stream) = collect_all(stream).await;
        assert!(values.is_empty());
        assert_eq!(stream.finish().await, Err(MatrixError::EmptyInput));
    }

    #[tokio::test]
    async fn test_early_stop_is_cancelled_not_success() {
        let mut stream = stream_matrix(Cursor::new(square_csv(40)), 1);
        assert_eq!(stream.next().await, Some(0));
        assert_eq!(stream.finish().await, Err(MatrixError::Cancelled));
    }

    #[tokio::test]
    async fn test_dropped_stream_releases_source() {
        let (tx, rx) = oneshot::channel();
        let source = Tracked {
            inner: Cursor::new(square_csv(40)),
            dropped: Some(tx),
        };
        let mut stream = stream_matrix(source, 1);
        assert_eq!(stream.next().await, Some(0));
        drop(stream);

        tokio::time::timeout(Duration::from_secs(5), rx)
            .await
            .expect("producer kept the source after the consumer left")
            .unwrap();
    }

    #[tokio::test]
    async fn test_backpressure_with_tiny_channel() {
        let dim = 60;
        let total = stream_matrix(Cursor::new(square_csv(dim)), 1)
            .fold(Sum::new())
            .await
            .unwrap();
        let n = (dim * dim) as u64;
        assert_eq!(total.to_string(), (n * (n - 1) / 2).to_string());
    }

    #[tokio::test]
    async fn test_capacity_clamped() {
        assert_eq!(StreamingMatrixService::new(0).capacity(), 1);
        assert_eq!(StreamingMatrixService::default().capacity(), DEFAULT_CHANNEL_CAPACITY);
        let flat = StreamingMatrixService::new(0)
            .flatten("1,2\n0,4".as_bytes())
            .await
            .unwrap();
        assert_eq!(flat, "1,2,0,4");
    }

    async fn collect_all(mut stream: MatrixStream) -> (Vec<i64>, MatrixStream) {
        let mut values = Vec::new();
        while let Some(v) = stream.next().await {
            values.push(v);
        }
        (values, stream)
    }
}
