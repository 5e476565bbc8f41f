//! Error types for the mapping layer
//!
//! This module defines every failure the mapper can surface. Configuration
//! errors (missing tags, unsupported types) are raised before any I/O; row
//! level failures carry the row number and the underlying cause.

/// Result type alias for mapping operations
pub type Result<T> = std::result::Result<T, OrmError>;

/// Boxed error used as the cause of a materialization failure
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error types for mapping operations
#[derive(Debug, thiserror::Error)]
pub enum OrmError {
    /// A type lacks a required table-name or primary-key tag
    #[error("Missing mapping metadata on {type_name}: {detail}")]
    MissingMappingMetadata {
        type_name: String,
        detail: String,
    },

    /// No column remained to write after absent values were filtered out
    #[error("No mapped fields in {type_name}")]
    EmptyMapping { type_name: String },

    /// A destination field's declared type has no registered extractor
    #[error("ORM does not handle property type {column_type} (column {column})")]
    UnsupportedColumnType { column_type: String, column: String },

    /// Construction or assignment failed for a row
    #[error("Failed to materialize row {row}: {source}")]
    MaterializationFailure {
        row: usize,
        #[source]
        source: BoxError,
    },

    /// A primary-key column had no value on the instance being updated
    #[error("Primary key column {column} has no value on {type_name}")]
    MissingKeyValue { type_name: String, column: String },

    /// Type conversion error
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Column index outside the current result row
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Query timeout
    #[error("Query timeout after {timeout_ms}ms")]
    QueryTimeout { timeout_ms: u64 },

    /// Connection error (generic)
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// SQLite error
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a missing metadata error for the named type
    pub fn missing_metadata(type_name: &str, detail: impl Into<String>) -> Self {
        OrmError::MissingMappingMetadata {
            type_name: type_name.to_string(),
            detail: detail.into(),
        }
    }

    /// Create an empty mapping error for the named type
    pub fn empty_mapping(type_name: &str) -> Self {
        OrmError::EmptyMapping {
            type_name: type_name.to_string(),
        }
    }

    /// Create an unsupported column type error
    pub fn unsupported_type(column_type: impl Into<String>, column: &str) -> Self {
        OrmError::UnsupportedColumnType {
            column_type: column_type.into(),
            column: column.to_string(),
        }
    }

    /// Wrap the cause of a failed row
    pub fn materialization(row: usize, source: impl Into<BoxError>) -> Self {
        OrmError::MaterializationFailure {
            row,
            source: source.into(),
        }
    }

    /// Create a missing key value error
    pub fn missing_key_value(type_name: &str, column: &str) -> Self {
        OrmError::MissingKeyValue {
            type_name: type_name.to_string(),
            column: column.to_string(),
        }
    }

    /// Create a new type mismatch error
    pub fn type_mismatch(expected: &str, actual: &str) -> Self {
        OrmError::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a query timeout error
    pub fn query_timeout(timeout_ms: u64) -> Self {
        OrmError::QueryTimeout { timeout_ms }
    }

    /// Create a new connection error
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        OrmError::ConnectionError(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        OrmError::Other(msg.into())
    }

    /// Whether the error is a configuration problem detected before any I/O
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            OrmError::MissingMappingMetadata { .. }
                | OrmError::EmptyMapping { .. }
                | OrmError::UnsupportedColumnType { .. }
        )
    }
}
