//! Error types for the classroom monitoring library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// No current frame could be produced by the frame source
    #[error("Frame unavailable: {0}")]
    FrameUnavailable(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not allowed in the current session state
    #[error("Session state error: {0}")]
    SessionState(String),

    /// Identity matching failed
    #[error("Matcher error: {0}")]
    Matcher(String),

    /// Persistence or network collaborator failed
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic I/O error with description
    #[error("I/O error: {0}")]
    IoError(String),

    /// Image decoding failed
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Background task could not be joined or scheduled
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl Error {
    /// Whether the error only means "skip this cycle"
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::FrameUnavailable(_))
    }
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
