//! Engine error types.

use thiserror::Error;

use facefind_models::ValidationError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur in the indexing and search pipeline.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Storage(#[from] facefind_storage::StorageError),

    #[error(transparent)]
    Index(#[from] facefind_index::IndexError),

    #[error(transparent)]
    Records(#[from] facefind_records::StoreError),

    #[error(transparent)]
    Media(#[from] facefind_media::MediaError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A search found nothing to search: the collection had no indexable
    /// assets even after a rebuild.
    #[error("No indexable content in collection {0}")]
    NoIndexableContent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
