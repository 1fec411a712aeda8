//! Error types for the transcription pipeline

use std::fmt;

/// Errors that can occur while transcribing audio into a score
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptionError {
    /// Invalid input parameters (empty arrays, mismatched lengths, non-positive periods...)
    InvalidInput(String),

    /// Audio decoding error
    DecodingError(String),

    /// The caller requested cancellation through the progress handle
    Cancelled,

    /// The stage could not complete with the given parameters
    ///
    /// Raised when auto energy masking finds no bimodal distribution, when no
    /// voiced group is detected, or when the rhythm graph has no START to END path.
    /// Relaxing the parameters may help.
    Infeasible(String),

    /// Internal consistency error (should never happen)
    InternalError(String),

    /// File system error
    IoError(String),

    /// Persisted record could not be encoded or decoded
    SerializationError(String),
}

impl fmt::Display for TranscriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptionError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            TranscriptionError::DecodingError(msg) => write!(f, "Decoding error: {}", msg),
            TranscriptionError::Cancelled => write!(f, "Process cancelled by the user"),
            TranscriptionError::Infeasible(msg) => write!(f, "Could not complete: {}", msg),
            TranscriptionError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            TranscriptionError::IoError(msg) => write!(f, "I/O error: {}", msg),
            TranscriptionError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for TranscriptionError {}

impl From<std::io::Error> for TranscriptionError {
    fn from(err: std::io::Error) -> Self {
        TranscriptionError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for TranscriptionError {
    fn from(err: serde_json::Error) -> Self {
        TranscriptionError::SerializationError(err.to_string())
    }
}

impl TranscriptionError {
    /// True when the error reports a user cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TranscriptionError::Cancelled)
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, TranscriptionError>;
