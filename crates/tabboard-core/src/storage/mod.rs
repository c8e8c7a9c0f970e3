//! Key-value storage primitives the cache layer is built on.
//!
//! The dashboard uses two stores with identical shape but different
//! lifetimes:
//! - a durable store for cached data and preferences (`FileStore`)
//! - an ephemeral store that lives as long as one browsing session
//!   (`MemoryStore`, or a `FileStore` the host wipes when the session ends)

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StorageResult;

/// String-keyed, string-valued storage.
///
/// Implementations must make each individual call atomic; no coordination
/// across calls is provided.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. Absent keys are `Ok(None)`.
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete a value. Removing an absent key is not an error.
    fn remove_item(&self, key: &str) -> StorageResult<()>;
}

/// Check a write against an optional byte quota.
pub(crate) fn check_quota(
    key: &str,
    value: &str,
    used_by_others: usize,
    quota: Option<usize>,
) -> StorageResult<()> {
    if let Some(limit) = quota {
        let size = used_by_others + key.len() + value.len();
        if size > limit {
            return Err(crate::error::StorageError::QuotaExceeded {
                key: key.to_string(),
                size,
                limit,
            });
        }
    }
    Ok(())
}
