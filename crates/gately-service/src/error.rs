use gately_core::{CoreError, StorageError};
use thiserror::Error;

/// Result type for mapping service operations.
pub type Result<T> = std::result::Result<T, MappingError>;

#[derive(Debug, Clone, Error)]
pub enum MappingError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("url is already shortened: {0}")]
    AlreadyExists(String),
    #[error("short key not found: {0}")]
    NotFound(String),
    #[error("failed to write to store: {0}")]
    StoreWriteFailed(#[source] StorageError),
    #[error("failed to read from store: {0}")]
    StoreReadFailed(#[source] StorageError),
}

impl From<CoreError> for MappingError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::InvalidShortKey(message) => Self::InvalidInput(message),
        }
    }
}
