//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the judgment retrieval system. Every fallible
//! internal operation returns [`Result`]; the public service boundary collapses
//! all failures to `None` and keeps the cause only for structured logging.
//!
//! ## Input/Output Specification
//! - **Input**: Error conditions from network, parsing, archive, and storage code
//! - **Output**: Structured error types with context and a stable category string
//! - **Error Categories**: not_found, network, malformed, storage, configuration
//!
//! ## Key Features
//! - Automatic conversion from common error types
//! - Category accessor for logging and diagnostics
//! - No error ever crosses the collaborator-facing surface

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Error types for the judgment retrieval system
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Resource genuinely absent from the object store
    #[error("Not found in source: {resource}")]
    NotFoundInSource { resource: String },

    /// Network-level failures (timeouts, connection errors)
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx responses from the object store
    #[error("HTTP status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// Unexpected schema or encoding on a remote document
    #[error("Malformed payload from {payload_source}: {details}")]
    MalformedPayload {
        payload_source: String,
        details: String,
    },

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Archive (tar/gzip) handling errors
    #[error("Archive error for {shard}: {details}")]
    Archive { shard: String, details: String },

    /// Snapshot database errors
    #[error("Snapshot store error: {0}")]
    Database(#[from] sled::Error),

    /// Snapshot serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl RetrievalError {
    /// Stable category string for metrics and logging.
    ///
    /// The public boundary returns `None` for every failure; this is the only
    /// place the distinction between "absent", "unreachable" and "unreadable"
    /// survives.
    pub fn category(&self) -> &'static str {
        match self {
            RetrievalError::NotFoundInSource { .. } => "not_found",
            RetrievalError::Http(_) | RetrievalError::HttpStatus { .. } => "network",
            RetrievalError::MalformedPayload { .. }
            | RetrievalError::Json(_)
            | RetrievalError::Archive { .. } => "malformed",
            RetrievalError::Database(_)
            | RetrievalError::Serialization(_)
            | RetrievalError::Io(_) => "storage",
            RetrievalError::Config { .. } => "configuration",
        }
    }

    /// True when the resource is genuinely absent rather than unreachable
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RetrievalError::NotFoundInSource { .. }
                | RetrievalError::HttpStatus { status: 404, .. }
        )
    }
}
