//! Error types for segue-dj
//!
//! Module-specific error types using thiserror for clear propagation.
//! Player and AI clients carry their own error enums (see `player::PlayerError`
//! and `ai::AiError`); this is the daemon-level type everything converges to.

use thiserror::Error;

/// Main error type for the segue-dj daemon
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Remote player errors
    #[error("Player error: {0}")]
    Player(#[from] crate::player::PlayerError),

    /// AI service errors
    #[error("AI service error: {0}")]
    Ai(#[from] crate::ai::AiError),

    /// Transition engine errors
    #[error("Transition error: {0}")]
    Transition(String),

    /// Queue management errors
    #[error("Queue error: {0}")]
    Queue(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<segue_common::Error> for Error {
    fn from(e: segue_common::Error) -> Self {
        match e {
            segue_common::Error::Config(msg) => Error::Config(msg),
            segue_common::Error::NotFound(msg) => Error::NotFound(msg),
            segue_common::Error::InvalidInput(msg) => Error::BadRequest(msg),
            segue_common::Error::Io(e) => Error::Io(e),
            segue_common::Error::Internal(msg) => Error::Internal(msg),
        }
    }
}

/// Convenience Result type using segue-dj Error
pub type Result<T> = std::result::Result<T, Error>;
