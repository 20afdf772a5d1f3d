//! Error types for sweep decoding.

use thiserror::Error;

/// Result type for decoder operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Reasons an input file could not be turned into a radar record.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Missing required variable, dimension or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Unreadable or inconsistent content
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}
