use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{check_quota, KeyValueStore};
use crate::error::{StorageError, StorageResult};

/// File extension for stored items
const ITEM_EXTENSION: &str = "item";

/// Durable store keeping one file per key inside a directory.
///
/// Writes go through a uniquely named temporary file and a rename, so a
/// reader never sees a half-written value and concurrent writers of one key
/// do not share a temp path.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    item_quota: Option<usize>,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            item_quota: None,
        })
    }

    /// Reject any single item larger than `bytes` (key plus value).
    pub fn with_item_quota(mut self, bytes: usize) -> Self {
        self.item_quota = Some(bytes);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Remove every item in the store.
    pub fn clear(&self) -> StorageResult<()> {
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(ITEM_EXTENSION) {
                std::fs::remove_file(&path)?;
            }
        }
        debug!(dir = %self.dir.display(), "Cleared file store");
        Ok(())
    }

    fn item_path(&self, key: &str) -> StorageResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.{}", key, ITEM_EXTENSION)))
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.item_path(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.item_path(key)?;
        check_quota(key, value, 0, self.item_quota)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        let path = self.item_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
