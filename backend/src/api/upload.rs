//! Multipart upload plumbing.
//!
//! The matrix services consume a blocking [`Read`]. Uploads arrive as an async
//! chunk stream, so a pump task forwards chunks over a bounded channel and an
//! [`UploadReader`] on the blocking side turns them back into bytes. Nothing
//! beyond `buffer` chunks is ever held in memory.

use std::future::Future;
use std::io::{self, Read};

use axum::body::Bytes;
use axum::extract::multipart::{Field, Multipart};
use tokio::sync::mpsc;

use super::logs::log_info_indent;
use crate::error::{MatrixError, MatrixResult};

/// Name of the multipart field carrying the CSV file.
pub const FILE_FIELD: &str = "file";

type Chunk = io::Result<Bytes>;

/// Blocking reader over chunks sent from an async task.
///
/// Reads block on the channel, so this must only be read from a blocking
/// worker (e.g. inside `spawn_blocking`), never from async code.
#[derive(Debug)]
pub struct UploadReader {
    chunks: mpsc::Receiver<Chunk>,
    current: Bytes,
}

impl UploadReader {
    /// Create a reader and the sender that feeds it, holding at most `buffer`
    /// chunks in flight.
    pub fn channel(buffer: usize) -> (mpsc::Sender<Chunk>, UploadReader) {
        let (tx, chunks) = mpsc::channel(buffer.max(1));
        let reader = UploadReader {
            chunks,
            current: Bytes::new(),
        };
        (tx, reader)
    }
}

impl Read for UploadReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.current.is_empty() {
            match self.chunks.blocking_recv() {
                Some(Ok(chunk)) => self.current = chunk,
                Some(Err(err)) => return Err(err),
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.current.len());
        buf[..n].copy_from_slice(&self.current[..n]);
        self.current = self.current.slice(n..);
        Ok(n)
    }
}

/// Forward `field` into `tx` until the field ends, fails, or the reader is
/// dropped. Returns the number of bytes forwarded.
pub async fn pump_field(mut field: Field<'_>, tx: mpsc::Sender<Chunk>) -> u64 {
    let mut forwarded = 0u64;
    loop {
        let item = match field.chunk().await {
            Ok(Some(chunk)) => {
                forwarded += chunk.len() as u64;
                Ok(chunk)
            }
            Ok(None) => break,
            Err(err) => Err(io::Error::other(err.to_string())),
        };
        let failed = item.is_err();
        if tx.send(item).await.is_err() || failed {
            break;
        }
    }
    forwarded
}

/// Read the whole `file` field into memory.
pub async fn read_file_field(multipart: &mut Multipart) -> MatrixResult<Bytes> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| MatrixError::FileError)?
    {
        if field.name() == Some(FILE_FIELD) {
            return field.bytes().await.map_err(|_| MatrixError::FileError);
        }
    }
    Err(MatrixError::FileError)
}

/// Stream the `file` field into `consume` without buffering it.
///
/// The pump and the consumer run concurrently; the consumer's result is
/// returned once both have stopped.
pub async fn stream_file_field<T, F, Fut>(
    multipart: &mut Multipart,
    buffer: usize,
    consume: F,
) -> MatrixResult<T>
where
    F: FnOnce(UploadReader) -> Fut,
    Fut: Future<Output = MatrixResult<T>>,
{
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| MatrixError::FileError)?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let (tx, reader) = UploadReader::channel(buffer);
        let (forwarded, result) = tokio::join!(pump_field(field, tx), consume(reader));
        log_info_indent(format!("Streamed {} bytes", forwarded), 1);
        return result;
    }
    Err(MatrixError::FileError)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(chunks: &[&'static str], buffer: usize) -> UploadReader {
        let (tx, reader) = UploadReader::channel(buffer);
        for chunk in chunks {
            tx.try_send(Ok(Bytes::from_static(chunk.as_bytes()))).unwrap();
        }
        reader
    }

    #[test]
    fn test_reassembles_chunks() {
        let mut reader = feed(&["1,2", "\n3", ",4"], 4);
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "1,2\n3,4");
    }

    #[test]
    fn test_small_reads_split_chunks() {
        let mut reader = feed(&["12345"], 1);
        let mut buf = [0u8; 2];
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"12");
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"34");
        assert_eq!(reader.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], b'5');
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_transport_error_surfaces() {
        let (tx, mut reader) = UploadReader::channel(2);
        tx.try_send(Ok(Bytes::from_static(b"1,2\n"))).unwrap();
        tx.try_send(Err(io::Error::other("connection reset"))).unwrap();
        drop(tx);

        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.to_string(), "connection reset");
    }

    #[test]
    fn test_transport_error_maps_to_file_error() {
        let (tx, reader) = UploadReader::channel(2);
        tx.try_send(Ok(Bytes::from_static(b"1,2\n3,"))).unwrap();
        tx.try_send(Err(io::Error::other("connection reset"))).unwrap();
        drop(tx);

        let result = crate::parser::load_matrix(reader);
        assert_eq!(result, Err(MatrixError::FileError));
    }

    #[tokio::test]
    async fn test_reader_feeds_streaming_service() {
        use crate::service::{MatrixProcessor, StreamingMatrixService};

        let (tx, reader) = UploadReader::channel(1);
        let producer = tokio::spawn(async move {
            for chunk in ["1,2,", "3\n4,5,6\n", "7,8,9"] {
                tx.send(Ok(Bytes::from_static(chunk.as_bytes()))).await.unwrap();
            }
        });
        let total = StreamingMatrixService::new(1).sum(reader).await.unwrap();
        producer.await.unwrap();
        assert_eq!(total.to_string(), "45");
    }
}
