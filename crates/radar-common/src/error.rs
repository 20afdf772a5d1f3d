//! Error types for run configuration.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type alias using ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that abort a run before any file is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid date '{0}': expected YYYYMMDD")]
    InvalidDate(String),

    #[error("End date {end} older than start date {start}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    #[error("Failed to read layout file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse layout: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
