//! Error types for the scenewright domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error of an exchange: the backend failed or the memory
/// saver refused an evicted turn.
#[derive(Debug, Error)]
pub enum Error {
    // --- Backend errors ---
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of a single exchange with a chat backend.
///
/// Never retried internally; retry policy belongs to the caller.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// Connection refused, DNS failure, timeout.
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    /// The transport succeeded but the body is not the shape the dialect promises.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Backend not configured: {0}")]
    NotConfigured(String),
}

/// A single undecodable frame in a stream. Logged and skipped, never fatal.
#[derive(Debug, Clone, Error)]
pub enum FramingError {
    #[error("Invalid JSON in frame: {reason}")]
    InvalidJson { reason: String },

    #[error("Unexpected frame shape: {0}")]
    UnexpectedShape(String),
}

#[derive(Debug, Clone, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Summarization failed: {0}")]
    Summarize(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("Stream already closed")]
    Closed,

    #[error("Stream does not accept outbound frames")]
    Unsupported,
}
