//! Player progress, kept in a plain key-value store.
//!
//! The engine never touches this; the frontend reads and writes it around
//! level changes and the tutorial.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access progress file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse progress file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize progress: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub trait ProgressStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;
}

impl<S: ProgressStore + ?Sized> ProgressStore for Box<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl ProgressStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// A flat TOML table on disk, rewritten on every `set`.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            toml::from_str(&content).map_err(|source| StoreError::Parse {
                path: path.clone(),
                source,
            })?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let content = toml::to_string(&self.values)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, content).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl ProgressStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        self.flush()
    }
}

const CURRENT_LEVEL: &str = "current_level";
const HIGHEST_LEVEL: &str = "highest_level";
const TUTORIAL_DONE: &str = "tutorial_done";

/// Typed view over a [`ProgressStore`].
#[derive(Debug, Clone)]
pub struct Progress<S: ProgressStore> {
    store: S,
}

impl<S: ProgressStore> Progress<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn current_level(&self) -> u32 {
        self.read_number(CURRENT_LEVEL)
    }

    pub fn highest_level(&self) -> u32 {
        self.read_number(HIGHEST_LEVEL)
    }

    pub fn tutorial_done(&self) -> bool {
        self.store.get(TUTORIAL_DONE).is_some_and(|v| v == "true")
    }

    /// Records the level being played, raising the high-water mark if needed.
    pub fn set_current_level(&mut self, level: u32) -> Result<(), StoreError> {
        self.store.set(CURRENT_LEVEL, level.to_string())?;
        if level > self.highest_level() {
            self.store.set(HIGHEST_LEVEL, level.to_string())?;
        }
        Ok(())
    }

    pub fn mark_tutorial_done(&mut self) -> Result<(), StoreError> {
        self.store.set(TUTORIAL_DONE, "true".to_string())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn read_number(&self, key: &str) -> u32 {
        match self.store.get(key) {
            None => 0,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(key, value = %raw, "ignoring malformed progress value");
                0
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_store_starts_at_zero() {
        let progress = Progress::new(MemoryStore::default());
        assert_eq!(progress.current_level(), 0);
        assert_eq!(progress.highest_level(), 0);
        assert!(!progress.tutorial_done());
    }

    #[test]
    fn highest_level_only_goes_up() {
        let mut progress = Progress::new(MemoryStore::default());
        progress.set_current_level(4).unwrap();
        progress.set_current_level(2).unwrap();
        assert_eq!(progress.current_level(), 2);
        assert_eq!(progress.highest_level(), 4);
    }

    #[test]
    fn malformed_values_read_as_zero() {
        let mut store = MemoryStore::default();
        store.set(CURRENT_LEVEL, "lots".to_string()).unwrap();
        assert_eq!(Progress::new(store).current_level(), 0);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("progress.toml");

        let mut progress = Progress::new(FileStore::open(&path).unwrap());
        progress.set_current_level(3).unwrap();
        progress.mark_tutorial_done().unwrap();

        let reopened = Progress::new(FileStore::open(&path).unwrap());
        assert_eq!(reopened.current_level(), 3);
        assert_eq!(reopened.highest_level(), 3);
        assert!(reopened.tutorial_done());
        assert_eq!(reopened.store().path(), path.as_path());
    }

    #[test]
    fn corrupt_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.toml");
        fs::write(&path, "current_level = [").unwrap();
        assert!(matches!(FileStore::open(&path), Err(StoreError::Parse { .. })));
    }
}
