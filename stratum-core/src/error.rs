//! Error types for stratum-core

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed user input (scope strings, precedence strings)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid scope key or value
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    /// Invalid version string
    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    /// Invalid precedence configuration
    #[error("Invalid precedence configuration: {0}")]
    InvalidPrecedence(String),

    /// Model-level validation failure (typed values, duplicate scope sets)
    #[error("Validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// Create an invalid scope error
    pub fn invalid_scope(msg: impl Into<String>) -> Self {
        Error::InvalidScope(msg.into())
    }

    /// Create an invalid version error
    pub fn invalid_version(msg: impl Into<String>) -> Self {
        Error::InvalidVersion(msg.into())
    }

    /// Create an invalid precedence configuration error
    pub fn invalid_precedence(msg: impl Into<String>) -> Self {
        Error::InvalidPrecedence(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}
