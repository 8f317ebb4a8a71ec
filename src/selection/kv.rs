//! String key/value persistence for the selection cache.

use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::warn;

use crate::{
    app_dirs::{AppDirError, AppPaths},
    fs_ops,
};

#[derive(Debug, Error)]
pub enum KvError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    AppDir(#[from] AppDirError),
}

/// Minimal string store the selection model writes through to.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), KvError>;
}

/// In-memory store; nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    values: HashMap<String, String>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), KvError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// A single JSON object on disk, rewritten atomically on every `set`.
#[derive(Debug)]
pub struct JsonFileKv {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileKv {
    /// Open the cache at `path`. A missing file starts empty; an unreadable
    /// document is discarded with a warning.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, KvError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "Discarding corrupt selection cache");
                BTreeMap::new()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(KvError::Read { path, source }),
        };
        Ok(Self { path, values })
    }

    /// Open the cache in the application directory.
    pub fn open_default() -> Result<Self, KvError> {
        Self::open(AppPaths::resolve()?.selection_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for JsonFileKv {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), KvError> {
        self.values.insert(key.to_string(), value);
        let data = serde_json::to_vec_pretty(&self.values).map_err(|source| KvError::Serialize {
            path: self.path.clone(),
            source,
        })?;
        fs_ops::atomic_write(&self.path, &data).map_err(|source| KvError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn json_file_kv_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(crate::app_dirs::SELECTION_FILE);
        let mut kv = JsonFileKv::open(&path).unwrap();
        assert_eq!(kv.get("compare_models_Iris"), None);
        kv.set("compare_models_Iris", "[]".into()).unwrap();
        kv.set("compare_params_Iris", "{\"mask\":10}".into()).unwrap();

        let reopened = JsonFileKv::open(&path).unwrap();
        assert_eq!(reopened.get("compare_models_Iris").as_deref(), Some("[]"));
        assert_eq!(
            reopened.get("compare_params_Iris").as_deref(),
            Some("{\"mask\":10}")
        );
    }

    #[test]
    fn corrupt_cache_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(crate::app_dirs::SELECTION_FILE);
        std::fs::write(&path, "not json").unwrap();
        let kv = JsonFileKv::open(&path).unwrap();
        assert_eq!(kv.get("anything"), None);
    }
}
