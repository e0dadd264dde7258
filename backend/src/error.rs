//! Error types for the matrix validate-and-reduce service.
//!
//! - [`MatrixError`] - Domain errors raised while loading or streaming a matrix
//! - [`ConfigError`] - Invalid configuration values
//! - [`ServerError`] - HTTP layer errors
//!
//! Every [`MatrixError`] renders a fixed message that callers may expose
//! verbatim. Conversion into [`ServerError`] is automatic via `From`, so `?`
//! works across the boundary.

use thiserror::Error;

// =============================================================================
// Matrix Errors
// =============================================================================

/// Validation and ingestion failures.
///
/// These are data-validity outcomes, never transient faults: retrying the same
/// input always yields the same error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MatrixError {
    /// The upload or file source could not supply a readable stream.
    #[error("file upload error")]
    FileError,

    /// The CSV text could not be tokenized into records.
    #[error("csv parsing error")]
    ParsingError,

    /// The source contained no records.
    #[error("empty file error")]
    EmptyInput,

    /// Final row count differs from the column count.
    #[error("invalid matrix: number of rows must be same as columns")]
    NotSquare,

    /// A record's field count differs from the first record's.
    #[error("invalid matrix: length of columns are not aligned")]
    NotAligned,

    /// A field is not a base-10 integer.
    #[error("invalid value: contains a non-integer")]
    NotInteger,

    /// The consumer dropped the value stream before it completed.
    #[error("matrix stream cancelled")]
    Cancelled,
}

impl MatrixError {
    /// Machine-readable code for this error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FileError => "file_error",
            Self::ParsingError => "parsing_error",
            Self::EmptyInput => "empty_input",
            Self::NotSquare => "not_square",
            Self::NotAligned => "not_aligned",
            Self::NotInteger => "not_integer",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<csv::Error> for MatrixError {
    fn from(err: csv::Error) -> Self {
        match err.kind() {
            csv::ErrorKind::Io(_) => MatrixError::FileError,
            _ => MatrixError::ParsingError,
        }
    }
}

impl From<std::io::Error> for MatrixError {
    fn from(_: std::io::Error) -> Self {
        MatrixError::FileError
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },

    /// Unknown processing strategy name.
    #[error("Unknown strategy '{0}' (expected 'serial' or 'streaming')")]
    UnknownStrategy(String),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Matrix validation or ingestion error.
    #[error(transparent)]
    Matrix(#[from] MatrixError),

    /// Socket or listener failure.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for matrix operations.
pub type MatrixResult<T> = Result<T, MatrixError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_messages() {
        assert_eq!(MatrixError::FileError.to_string(), "file upload error");
        assert_eq!(MatrixError::ParsingError.to_string(), "csv parsing error");
        assert_eq!(MatrixError::EmptyInput.to_string(), "empty file error");
        assert_eq!(
            MatrixError::NotSquare.to_string(),
            "invalid matrix: number of rows must be same as columns"
        );
        assert_eq!(
            MatrixError::NotAligned.to_string(),
            "invalid matrix: length of columns are not aligned"
        );
        assert_eq!(
            MatrixError::NotInteger.to_string(),
            "invalid value: contains a non-integer"
        );
    }

    #[test]
    fn test_error_conversion_chain() {
        let server_err: ServerError = MatrixError::NotSquare.into();
        assert!(matches!(server_err, ServerError::Matrix(MatrixError::NotSquare)));
        // Transparent: the domain message passes through untouched
        assert_eq!(server_err.to_string(), MatrixError::NotSquare.to_string());

        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert_eq!(MatrixError::from(io), MatrixError::FileError);
    }

    #[test]
    fn test_kind_codes_are_distinct() {
        let all = [
            MatrixError::FileError,
            MatrixError::ParsingError,
            MatrixError::EmptyInput,
            MatrixError::NotSquare,
            MatrixError::NotAligned,
            MatrixError::NotInteger,
            MatrixError::Cancelled,
        ];
        let mut kinds: Vec<_> = all.iter().map(MatrixError::kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), all.len());
    }

    #[test]
    fn test_config_error_format() {
        let err = ConfigError::InvalidValue {
            key: "MATRIX_API_PORT",
            value: "eighty".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("MATRIX_API_PORT"));
        assert!(msg.contains("eighty"));
    }
}
