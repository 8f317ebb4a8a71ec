//! Training run history backed by run directories under the output root.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    catalog::{DatasetId, ModelKind},
    fs_ops,
    identity::{self, ID_EXTENSION, RunIdentity},
};

use super::{
    errors::{RecordKind, StoreError},
    ids::{RecordId, is_record_id},
    locks::IdLocks,
    sidecar::{self, RUNTIME_FILE},
};

/// One training run as listed by the history endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub run_id: String,
    pub model: ModelKind,
    pub dataset: DatasetId,
    pub accuracy: f64,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Optional filters applied by [`HistoryStore::list`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub model: Option<ModelKind>,
    pub dataset: Option<DatasetId>,
}

impl HistoryFilter {
    fn accepts(&self, identity: &RunIdentity) -> bool {
        self.model.is_none_or(|model| model == identity.model)
            && self.dataset.is_none_or(|dataset| dataset == identity.dataset)
    }
}

/// Training runs stored as `{root}/{runId}/`.
#[derive(Debug)]
pub struct HistoryStore {
    root: PathBuf,
    locks: IdLocks,
}

impl HistoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: IdLocks::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Runs matching `filter`, newest first.
    ///
    /// A missing root yields an empty list. Directories without a decodable
    /// identity file are skipped.
    pub fn list(&self, filter: &HistoryFilter) -> Result<Vec<HistoryEntry>, StoreError> {
        let dirs = match fs_ops::child_dirs(&self.root, is_record_id) {
            Ok(dirs) => dirs,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.root.clone(),
                    source,
                });
            }
        };
        let mut runs = Vec::new();
        for (run_id, dir) in dirs {
            let Some((_, identity)) = find_identity(&dir) else {
                debug!(run_id = %run_id, "Skipping run without identity file");
                continue;
            };
            if !filter.accepts(&identity) {
                continue;
            }
            let timestamp = run_id.parse().unwrap_or_default();
            runs.push(HistoryEntry {
                run_id,
                model: identity.model,
                dataset: identity.dataset,
                accuracy: identity.accuracy,
                timestamp,
                name: identity.name,
            });
        }
        runs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(runs)
    }

    /// Remove a run directory and everything in it.
    pub fn delete(&self, run_id: &str) -> Result<(), StoreError> {
        let id = parse_run_id(run_id)?;
        self.locks.with_lock(id.as_str(), || {
            let dir = self.root.join(id.as_str());
            if !dir.is_dir() {
                return Err(StoreError::NotFound {
                    kind: RecordKind::Run,
                    id: id.to_string(),
                });
            }
            fs::remove_dir_all(&dir).map_err(|source| StoreError::DeleteFailed {
                kind: RecordKind::Run,
                path: dir.clone(),
                source,
            })?;
            info!(run_id = %id, "Deleted training run");
            Ok(())
        })
    }

    /// Apply a new display name to a run and return the stored form.
    ///
    /// An empty or blank name clears the suffix. The identity file is renamed
    /// first; `runtime.json` follows when present, and a failure there undoes
    /// the identity rename.
    pub fn rename(&self, run_id: &str, name: &str) -> Result<Option<String>, StoreError> {
        let id = parse_run_id(run_id)?;
        identity::validate_name(name)?;
        let stored = identity::sanitize_name(name);

        self.locks.with_lock(id.as_str(), || {
            let dir = self.root.join(id.as_str());
            if !dir.is_dir() {
                return Err(StoreError::NotFound {
                    kind: RecordKind::Run,
                    id: id.to_string(),
                });
            }
            let (current_name, current) =
                find_identity(&dir).ok_or_else(|| StoreError::IdentityMissing {
                    id: id.to_string(),
                })?;
            let renamed = current.with_name(stored.clone()).file_name();
            let old_path = dir.join(&current_name);
            let new_path = dir.join(&renamed);
            if old_path != new_path {
                fs::rename(&old_path, &new_path).map_err(|err| StoreError::RenameFailed {
                    kind: RecordKind::Run,
                    id: id.to_string(),
                    reason: err.to_string(),
                })?;
            }

            let runtime_path = dir.join(RUNTIME_FILE);
            if runtime_path.is_file()
                && let Err(err) = sidecar::write_name(&runtime_path, stored.as_deref())
            {
                if old_path != new_path
                    && let Err(rollback) = fs::rename(&new_path, &old_path)
                {
                    warn!(
                        run_id = %id,
                        error = %rollback,
                        "Failed to restore identity file after sidecar error"
                    );
                }
                return Err(err.into());
            }

            info!(run_id = %id, name = ?stored, "Renamed training run");
            Ok(stored)
        })
    }

    /// Stored name recorded in a run's `runtime.json`, if any.
    pub fn run_name(&self, run_id: &str) -> Option<String> {
        read_run_name(&self.root, run_id)
    }

    /// URLs of the `.png` artifacts of a run. Unknown runs have none.
    pub fn images(&self, run_id: &str) -> Vec<String> {
        if !is_record_id(run_id) {
            return Vec::new();
        }
        fs_ops::png_file_names(&self.root.join(run_id))
            .into_iter()
            .map(|file| format!("/output/{run_id}/{file}"))
            .collect()
    }
}

/// Best-effort read of `{root}/{runId}/runtime.json` `name`. Malformed IDs are
/// never joined onto `root`.
pub(super) fn read_run_name(root: &Path, run_id: &str) -> Option<String> {
    if !is_record_id(run_id) {
        return None;
    }
    let path = root.join(run_id).join(RUNTIME_FILE);
    match sidecar::read_training_runtime(&path) {
        Ok(runtime) => runtime.name.filter(|name| !name.is_empty()),
        Err(err) if err.is_missing() => None,
        Err(err) => {
            warn!(run_id, error = %err, "Ignoring unreadable runtime.json");
            None
        }
    }
}

fn parse_run_id(run_id: &str) -> Result<RecordId, StoreError> {
    RecordId::parse(run_id).map_err(|_| StoreError::InvalidId {
        kind: RecordKind::Run,
        id: run_id.to_string(),
    })
}

/// Lexicographically first decodable identity file in `dir`.
fn find_identity(dir: &Path) -> Option<(String, RunIdentity)> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(dir = %dir.display(), error = %err, "Run directory vanished during scan");
            return None;
        }
    };
    let mut names = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.ends_with(ID_EXTENSION))
        .collect::<Vec<_>>();
    names.sort();
    names
        .into_iter()
        .find_map(|name| identity::decode(&name).map(|identity| (name, identity)))
}
