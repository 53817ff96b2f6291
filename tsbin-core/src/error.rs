//! Error types for TsBin

use thiserror::Error;

/// Result type alias for TsBin operations
pub type Result<T> = std::result::Result<T, TsError>;

/// TsBin error types
#[derive(Error, Debug)]
pub enum TsError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File ended before the sizes declared in its headers were satisfied
    #[error("Truncated file while reading {context}: needed {needed} bytes, {available} available")]
    Truncated {
        context: &'static str,
        needed: usize,
        available: usize,
    },

    /// Invalid data format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Appended vector is neither a scalar nor a full row
    #[error("Shape mismatch: expected 1 or {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Column index outside the table
    #[error("Column {column} out of range ({columns} columns)")]
    ColumnOutOfRange { column: usize, columns: usize },

    /// Row index outside the logical row count
    #[error("Row {row} out of range ({rows} rows)")]
    RowOutOfRange { row: usize, rows: usize },
}

impl TsError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, TsError::Io(_))
    }

    /// Check if error indicates a damaged or foreign file
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            TsError::Truncated { .. } | TsError::InvalidFormat(_)
        )
    }
}
