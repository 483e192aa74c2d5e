//! Match store error types.

use thiserror::Error;

/// Result type for match store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during match store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to configure record store: {0}")]
    ConfigError(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid stored item: {0}")]
    InvalidItem(String),
}

impl StoreError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn invalid_item(msg: impl Into<String>) -> Self {
        Self::InvalidItem(msg.into())
    }
}
