//! Error types for tallyweb-core

use serde::{Deserialize, Serialize};
use tallyweb_store::StoreError;
use thiserror::Error;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Record or index absent
    NotFound,
    /// Field carries a value the operation cannot use
    InvalidValue,
    /// Data file could not be read
    AccessError,
    /// Data file could not be written
    WriteError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::NotFound => write!(f, "NOT_FOUND"),
            ErrorCode::InvalidValue => write!(f, "INVALID_VALUE"),
            ErrorCode::AccessError => write!(f, "ACCESS_ERROR"),
            ErrorCode::WriteError => write!(f, "WRITE_ERROR"),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Informational - caller asked for something that is not there
    Info,
    /// Warning - request was rejected
    Warning,
    /// Error - storage failed
    Error,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "info"),
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
        }
    }
}

/// Main error type for tallyweb-core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Not Found: {resource} {key}")]
    NotFound { resource: String, key: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl CoreError {
    pub fn not_found(resource: &str, key: impl std::fmt::Display) -> Self {
        CoreError::NotFound {
            resource: resource.to_string(),
            key: key.to_string(),
        }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::NotFound { .. } => ErrorCode::NotFound,
            CoreError::InvalidValue { .. } => ErrorCode::InvalidValue,
            CoreError::Store(StoreError::Access { .. }) => ErrorCode::AccessError,
            CoreError::Store(_) => ErrorCode::WriteError,
        }
    }

    /// Get the severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CoreError::NotFound { .. } => ErrorSeverity::Info,
            CoreError::InvalidValue { .. } => ErrorSeverity::Warning,
            CoreError::Store(_) => ErrorSeverity::Error,
        }
    }
}

/// Result type with CoreError
pub type CoreResult<T> = Result<T, CoreError>;
