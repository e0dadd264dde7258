//! CSV matrix parsing.
//!
//! Two ingestion styles share the same tokenizer settings and cell parser:
//!
//! - [`load_matrix`] reads every record up front and returns a materialized
//!   [`Matrix`] (strict loader, used by echo/invert)
//! - [`for_each_value`] walks records one at a time, validating shape as rows
//!   arrive and handing each cell to a callback (used by the serial service
//!   and the streaming producer)
//!
//! Input has no header row and each record may carry any number of fields at
//! the syntax level. Shape is validated semantically here.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::error::{MatrixError, MatrixResult};
use crate::models::Matrix;

// =============================================================================
// Record reader
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted,
    /// A `"` inside a quoted field: either an escape or the closing quote.
    QuoteInQuoted,
}

/// Quote validation running beside the csv tokenizer.
///
/// The tokenizer keeps bare quotes as literal text and closes an unterminated
/// quoted field at end of input. Both are malformed CSV; the guard records the
/// byte offset of the first one so the record holding it can be rejected.
#[derive(Debug)]
struct QuoteGuard<R> {
    inner: R,
    offset: u64,
    state: QuoteState,
    open_quote: u64,
    malformed_at: Option<u64>,
}

impl<R> QuoteGuard<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            state: QuoteState::FieldStart,
            open_quote: 0,
            malformed_at: None,
        }
    }

    fn scan(&mut self, bytes: &[u8]) {
        if self.malformed_at.is_none() {
            for (i, &byte) in bytes.iter().enumerate() {
                let at = self.offset + i as u64;
                self.state = match (self.state, byte) {
                    (QuoteState::Quoted, b'"') => QuoteState::QuoteInQuoted,
                    (QuoteState::Quoted, _) => QuoteState::Quoted,
                    (QuoteState::QuoteInQuoted, b'"') => QuoteState::Quoted,
                    (_, b',') | (_, b'\n') => QuoteState::FieldStart,
                    (QuoteState::QuoteInQuoted, b'\r') => QuoteState::QuoteInQuoted,
                    (QuoteState::FieldStart, b'"') => {
                        self.open_quote = at;
                        QuoteState::Quoted
                    }
                    (QuoteState::Unquoted, b'"') | (QuoteState::QuoteInQuoted, _) => {
                        self.malformed_at = Some(at);
                        break;
                    }
                    _ => QuoteState::Unquoted,
                };
            }
        }
        self.offset += bytes.len() as u64;
    }

    fn end_of_input(&mut self) {
        if self.state == QuoteState::Quoted && self.malformed_at.is_none() {
            self.malformed_at = Some(self.open_quote);
        }
    }

    fn malformed_before(&self, end: u64) -> bool {
        matches!(self.malformed_at, Some(at) if at < end)
    }
}

impl<R: Read> Read for QuoteGuard<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.end_of_input();
        } else {
            self.scan(&buf[..n]);
        }
        Ok(n)
    }
}

/// CSV records of a matrix source: comma separated, no headers, variable
/// field count per record, strict quoting.
struct RecordReader<R> {
    csv: csv::Reader<QuoteGuard<R>>,
}

impl<R: Read> RecordReader<R> {
    fn new(source: R) -> Self {
        let csv = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(QuoteGuard::new(source));
        Self { csv }
    }

    /// Read the next record into `record`. Returns `false` at end of input.
    fn read(&mut self, record: &mut StringRecord) -> MatrixResult<bool> {
        let more = self.csv.read_record(record)?;
        let guard = self.csv.get_ref();
        let malformed = if more {
            // Position is the end of the record just read
            guard.malformed_before(self.csv.position().byte())
        } else {
            guard.malformed_at.is_some()
        };
        if malformed {
            return Err(MatrixError::ParsingError);
        }
        Ok(more)
    }
}

/// Parse one field as a base-10 signed integer.
pub fn parse_cell(field: &str) -> MatrixResult<i64> {
    field.parse::<i64>().map_err(|_| MatrixError::NotInteger)
}

// =============================================================================
// Shape tracking
// =============================================================================

/// Incremental row/column bookkeeping for a matrix whose size is unknown
/// until the last record has been read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShapeTracker {
    num_rows: usize,
    num_cols: usize,
}

impl ShapeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record with `len` fields.
    ///
    /// The first record fixes the column count; every later record must match it.
    pub fn observe(&mut self, len: usize) -> MatrixResult<()> {
        if self.num_rows == 0 {
            self.num_cols = len;
        } else if len != self.num_cols {
            return Err(MatrixError::NotAligned);
        }
        self.num_rows += 1;
        Ok(())
    }

    /// Deferred validation, only meaningful once the source is exhausted.
    ///
    /// Returns the matrix dimension on success.
    pub fn finish(&self) -> MatrixResult<usize> {
        if self.num_rows == 0 {
            return Err(MatrixError::EmptyInput);
        }
        if self.num_rows != self.num_cols {
            return Err(MatrixError::NotSquare);
        }
        Ok(self.num_rows)
    }
}

// =============================================================================
// Incremental walk
// =============================================================================

/// Walk `source` record by record and hand every cell to `emit` in row-major
/// order.
///
/// Row-level errors (`NotAligned`, `NotInteger`, malformed CSV) stop the
/// walk at the offending record; cells emitted before that point are not
/// retracted. `NotSquare` and `EmptyInput` can only be decided after the last
/// record. An error returned by `emit` aborts the walk and is propagated as is.
pub fn for_each_value<R, F>(source: R, mut emit: F) -> MatrixResult<usize>
where
    R: Read,
    F: FnMut(i64) -> MatrixResult<()>,
{
    let mut reader = RecordReader::new(source);
    let mut record = StringRecord::new();
    let mut shape = ShapeTracker::new();

    while reader.read(&mut record)? {
        shape.observe(record.len())?;
        for field in record.iter() {
            emit(parse_cell(field)?)?;
        }
    }

    shape.finish()
}

// =============================================================================
// Strict loader
// =============================================================================

/// Read an entire CSV source into a square [`Matrix`].
///
/// Checks run from most structural to least: empty input, then row count
/// against the first record's width, then each row's width, then each cell.
/// No partial matrix is returned on failure.
pub fn load_matrix<R: Read>(source: R) -> MatrixResult<Matrix> {
    let mut reader = RecordReader::new(source);
    let mut records = Vec::new();
    let mut record = StringRecord::new();
    while reader.read(&mut record)? {
        records.push(record.clone());
    }

    let Some(first) = records.first() else {
        return Err(MatrixError::EmptyInput);
    };

    let dim = records.len();
    if first.len() != dim {
        return Err(MatrixError::NotSquare);
    }

    let rows = records
        .iter()
        .map(|record| {
            if record.len() != dim {
                return Err(MatrixError::NotAligned);
            }
            record.iter().map(parse_cell).collect::<MatrixResult<Vec<i64>>>()
        })
        .collect::<MatrixResult<Vec<Vec<i64>>>>()?;

    Matrix::from_rows(rows)
}

/// Load a square matrix from a CSV file on disk.
pub fn load_matrix_file<P: AsRef<Path>>(path: P) -> MatrixResult<Matrix> {
    let file = File::open(path.as_ref()).map_err(|_| MatrixError::FileError)?;
    load_matrix(file)
}
