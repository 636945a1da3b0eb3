//! Error types for stratum-service

use stratum_store::StoreError;
use thiserror::Error;

/// Result type alias using our ServiceError
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Domain-model failure (parse, validation)
    #[error(transparent)]
    Core(#[from] stratum_core::Error),

    /// Storage failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A referenced or addressed thing does not exist where absence is an
    /// error rather than an empty result
    #[error("Not found: {0}")]
    NotFound(String),
}

impl ServiceError {
    /// Create a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        ServiceError::NotFound(msg.into())
    }
}
