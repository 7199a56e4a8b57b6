//! Storage-specific error type wrapping filesystem errors.

use homedash_domain::error::HomeDashError;

/// Errors originating from the local storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading, writing or renaming a slot file failed.
    #[error("filesystem error")]
    Io(#[from] std::io::Error),

    /// The key cannot be mapped onto a file name.
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
}

impl From<StorageError> for HomeDashError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
