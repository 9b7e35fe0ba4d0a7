//! Error types for the capture pipeline

use thiserror::Error;

/// Result type alias for capture operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can end a capture.
///
/// Every variant is terminal where it is detected: nothing in the pipeline
/// retries or degrades into a partial success.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Missing or malformed command-line input
    #[error("Usage error: {0}")]
    UsageError(String),

    /// Failed to create a rendering backend
    #[error("Engine initialization failed: {0}")]
    InitializationError(String),

    /// The rendering engine reported an unsuccessful load; carries the URL
    #[error("Failed loading {0}")]
    LoadError(String),

    /// The engine could not paint the page
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// The surface could not be written to the output path
    #[error("Failed saving image: {0}")]
    EncodeError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
