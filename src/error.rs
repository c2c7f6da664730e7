//! Error types for query normalization and comparison.

use thiserror::Error;

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, ComparatorError>;

/// Errors raised while normalizing query results, running queries, or
/// building and evaluating comparisons.
#[derive(Debug, Error)]
pub enum ComparatorError {
    /// Raw data handed to a `QueryResult` constructor is not a sequence of rows.
    #[error("invalid result type: {message}")]
    InvalidResultType { message: String },

    /// Rows presented to a single `QueryResult` disagree on column keys.
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// Indexed access used a key that is neither a column name, a position, nor a range.
    #[error("lookups must be done with integers, strings or ranges, not {got}")]
    InvalidKeyType { got: String },

    /// Keyed access named a column absent from the result.
    #[error("column not found: {key:?}")]
    ColumnNotFound { key: String },

    /// Positional access outside of the available rows or fields.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    /// Keyed access on an outcome named something other than `name` or `result`.
    #[error("key not found: {key:?}")]
    KeyNotFound { key: String },

    /// `first()` on a result with no rows.
    #[error("result is empty")]
    EmptyResult,

    /// A row or result appended to another has different columns.
    #[error("key mismatch: expected {expected:?}, got {got:?}")]
    KeyMismatch {
        expected: Vec<String>,
        got: Vec<String>,
    },

    /// A query string is empty.
    #[error("invalid query: {message}")]
    InvalidQuery { message: String },

    /// The right query references a column the left result does not have.
    #[error("key not found in lquery result: {key}")]
    QueryFormat { key: String },

    /// Malformed comparison configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// An operation needed a source (or a source's result) that was not configured.
    #[error("missing source: {message}")]
    MissingSource { message: String },

    /// A value has no JSON representation.
    #[error("value is not JSON serializable: {value}")]
    Unserializable { value: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "duckdb")]
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reported by a custom `Source` implementation.
    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

impl ComparatorError {
    pub fn invalid_result_type(message: impl Into<String>) -> Self {
        Self::InvalidResultType {
            message: message.into(),
        }
    }

    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            message: message.into(),
        }
    }

    pub fn column_not_found(key: impl Into<String>) -> Self {
        Self::ColumnNotFound { key: key.into() }
    }

    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    pub fn missing_source(message: impl Into<String>) -> Self {
        Self::MissingSource {
            message: message.into(),
        }
    }

    pub(crate) fn index_out_of_range(index: i64, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }
}
