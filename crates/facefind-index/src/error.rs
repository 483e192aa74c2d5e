//! Face index error types.

use thiserror::Error;

/// Result type for face index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors that can occur against the face index service.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The collection has never been created/populated. Callers treat this
    /// as "populate then retry", not as a user-facing failure.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// The referenced asset is missing from object storage.
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    /// The asset is in a format the index service cannot ingest.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The service throttled the request; retried internally with backoff.
    #[error("Rate limited by index service")]
    RateLimited,

    /// Terminal per-asset or per-operation failure.
    #[error("Index service error: {0}")]
    ServiceError(String),
}

impl IndexError {
    pub fn service_error(msg: impl Into<String>) -> Self {
        Self::ServiceError(msg.into())
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IndexError::RateLimited)
    }
}
