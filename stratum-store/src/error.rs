//! Error types for stratum-store

use thiserror::Error;

/// Result type alias using our StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Storage error type
#[derive(Error, Debug)]
pub enum StoreError {
    /// The named entity (or entity version) does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A uniqueness or version-monotonicity rule was violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Stored data could not be decoded; carries the raw payload for
    /// operator diagnosis
    #[error("Malformed stored data: {message}; payload: {payload}")]
    Malformed { message: String, payload: String },

    /// JSON encode/decode failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Underlying filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Create a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        StoreError::NotFound(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        StoreError::Conflict(msg.into())
    }

    /// Create a malformed-data error carrying the undecodable payload
    pub fn malformed(msg: impl Into<String>, payload: impl Into<String>) -> Self {
        StoreError::Malformed {
            message: msg.into(),
            payload: payload.into(),
        }
    }
}
