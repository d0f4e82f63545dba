//! Error types for polars-cleaner

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for cleaning operations
pub type CleanerResult<T> = Result<T, CleanerError>;

/// Which side of a lookup join a column was expected on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinSide {
    Main,
    Lookup,
}

impl fmt::Display for JoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => write!(f, "main"),
            Self::Lookup => write!(f, "lookup"),
        }
    }
}

/// Error types for cleaning, conversion and lookup operations
#[derive(Error, Debug)]
pub enum CleanerError {
    /// Path does not exist
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Extension is not handled by any registered parser
    #[error("Unsupported file type '{extension}': {}", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// The parser could not read the file
    #[error("Failed to load {}: {source}", path.display())]
    LoadFailure {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Two raw column names normalize to the same canonical name
    #[error("Columns {columns:?} all normalize to '{normalized}'")]
    AmbiguousColumns {
        normalized: String,
        columns: Vec<String>,
    },

    /// Join key absent from one side of the join
    #[error("Join key '{key}' missing from {side} data columns: {available:?}")]
    MissingJoinKey {
        key: String,
        side: JoinSide,
        available: Vec<String>,
    },

    /// Requested lookup fields absent from the lookup table
    #[error("Missing lookup fields in file: {missing:?}")]
    MissingReturnColumn { missing: Vec<String> },

    /// Requested lookup fields already present in the main data
    #[error("Lookup fields {columns:?} already exist in main data")]
    ReturnColumnCollision { columns: Vec<String> },

    /// Columns required by an operation are absent
    #[error("Missing columns for {operation}: {missing:?}. Available columns: {available:?}")]
    MissingColumns {
        operation: String,
        missing: Vec<String>,
        available: Vec<String>,
    },

    /// Empty path or path containing '..'
    #[error("Invalid file path: {0}")]
    InvalidPath(String),

    /// File exists but cannot be read
    #[error("Cannot read file: {}", .0.display())]
    PermissionDenied(PathBuf),

    /// Parsed file contained no rows or no columns
    #[error("File appears to be empty or contains no valid data: {}", .0.display())]
    EmptyInput(PathBuf),

    /// Header line failed validation
    #[error("Invalid header format: {0:?}")]
    InvalidHeader(String),

    /// Invalid configuration or option combination
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Left join produced a different number of rows than the main frame
    #[error("Join changed row count from {expected} to {actual}")]
    RowCountMismatch { expected: usize, actual: usize },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CleanerError {
    /// Wrap a parser error for `path`
    pub fn load_failure(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::LoadFailure {
            path: path.into(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_return_column_message() {
        let err = CleanerError::MissingReturnColumn {
            missing: vec!["region".to_string()],
        };
        assert_eq!(err.to_string(), "Missing lookup fields in file: [\"region\"]");
    }

    #[test]
    fn test_missing_join_key_names_side() {
        let err = CleanerError::MissingJoinKey {
            key: "email".to_string(),
            side: JoinSide::Lookup,
            available: vec!["id".to_string()],
        };
        assert!(err.to_string().contains("from lookup data"));
    }

    #[test]
    fn test_load_failure_keeps_source() {
        let err = CleanerError::load_failure("a.csv", "bad quote");
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "bad quote");
    }
}
