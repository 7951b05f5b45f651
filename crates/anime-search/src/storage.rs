//! File-backed key-value store for client state.
//!
//! Each key maps to one JSON file under the state directory, which is how the
//! search history survives between runs of the CLI.

use crate::ports::{KeyValueStore, StorageError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Key-value store keeping one file per key
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Root state directory
    state_dir: PathBuf,
}

impl FileStore {
    /// Create a new file store, creating the directory if needed
    pub fn new(state_dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let state_dir = state_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&state_dir)?;
        debug!(state_dir = %state_dir.display(), "State store opened");
        Ok(Self { state_dir })
    }

    /// Get the file path for a given key
    fn key_path(&self, key: &str) -> PathBuf {
        // Sanitize key to create valid filename
        let safe_key = key
            .replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_")
            .replace("__", "_");

        self.state_dir.join(format!("{}.json", safe_key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.key_path(key);
        if !path.exists() {
            debug!(key = key, "State miss");
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)?;
        debug!(key = key, "State hit");
        Ok(Some(content))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.key_path(key);
        let tmp = path.with_extension("json.tmp");

        // Readers only ever see a complete file
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;

        debug!(key = key, path = %path.display(), "State stored");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.key_path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(key = key, "State removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_get_remove() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let mut store = FileStore::new(temp_dir.path())?;

        assert_eq!(store.get("anime-search-history")?, None);

        store.set("anime-search-history", "[\"gundam\"]")?;
        assert_eq!(
            store.get("anime-search-history")?.as_deref(),
            Some("[\"gundam\"]")
        );

        store.remove("anime-search-history")?;
        assert_eq!(store.get("anime-search-history")?, None);

        Ok(())
    }

    #[test]
    fn test_remove_missing_key_is_ok() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let mut store = FileStore::new(temp_dir.path())?;
        store.remove("never-written")?;
        Ok(())
    }

    #[test]
    fn test_key_is_sanitized() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let mut store = FileStore::new(temp_dir.path())?;

        store.set("a/b:c", "1")?;
        assert!(temp_dir.path().join("a_b_c.json").exists());
        assert_eq!(store.get("a/b:c")?.as_deref(), Some("1"));

        Ok(())
    }

    #[test]
    fn test_creates_nested_directory() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let nested = temp_dir.path().join("data").join("state");
        FileStore::new(&nested)?;
        assert!(nested.is_dir());
        Ok(())
    }
}
