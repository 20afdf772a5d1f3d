//! Error types for quicklook rendering.

use thiserror::Error;

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Reasons a quicklook could not be produced.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A field the layout marks as required is absent from the sweep
    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    #[error("Unknown colour map: {0}")]
    UnknownColormap(String),

    #[error("Invalid colour: {0}")]
    InvalidColor(String),

    /// Sweep geometry unusable for a PPI (no rays, no gates, mismatched fields)
    #[error("Invalid sweep: {0}")]
    InvalidSweep(String),

    /// The caller asked the render to stop
    #[error("Render cancelled")]
    Cancelled,

    #[error("Unusable font {0}")]
    Font(String),

    #[error("PNG encoding failed: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
