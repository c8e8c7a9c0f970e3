use thiserror::Error;

/// Failures raised by a [`KeyValueStore`](crate::storage::KeyValueStore) backend.
///
/// Nothing above the storage layer propagates these: the cache store and the
/// session tracker log them and degrade to "not cached".
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage quota exceeded writing {key}: {size} bytes would exceed limit of {limit}")]
    QuotaExceeded {
        key: String,
        size: usize,
        limit: usize,
    },

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage lock poisoned")]
    Poisoned,
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
