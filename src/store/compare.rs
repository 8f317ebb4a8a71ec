//! Comparison records stored as `{output}/compare/{compareId}/runtime.json`.

use std::{
    collections::HashSet,
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    catalog::{DatasetId, ModelKind},
    fs_ops,
    identity,
};

use super::{
    errors::{RecordKind, StoreError},
    history::read_run_name,
    ids::{RecordId, is_record_id},
    locks::IdLocks,
    sidecar::{self, CompareManifest, ManifestModel, ManifestModels, RUNTIME_FILE},
};

/// Directory under the output root that holds comparison records.
pub const COMPARE_DIR: &str = "compare";

/// A training run referenced by a comparison, with its current name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareModelInfo {
    pub run_id: String,
    pub model: ModelKind,
    pub name: Option<String>,
}

/// One comparison as listed by the compare history endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareEntry {
    pub compare_id: String,
    pub dataset: DatasetId,
    pub timestamp: u64,
    pub name: Option<String>,
    pub mask: u32,
    pub impute: bool,
    #[serde(default)]
    pub sequence: bool,
    pub models: Vec<CompareModelInfo>,
}

#[derive(Debug)]
pub struct CompareStore {
    root: PathBuf,
    runs_root: PathBuf,
    locks: IdLocks,
}

impl CompareStore {
    /// Store rooted at `{output_root}/compare`, resolving run names against
    /// `output_root`.
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        let runs_root = output_root.into();
        Self {
            root: runs_root.join(COMPARE_DIR),
            runs_root,
            locks: IdLocks::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Comparisons for `dataset` (or all), newest first. Records whose
    /// manifest is missing or unreadable are skipped.
    pub fn list(&self, dataset: Option<DatasetId>) -> Result<Vec<CompareEntry>, StoreError> {
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
        for (compare_id, dir) in dirs {
            let manifest = match sidecar::read_compare_manifest(&dir.join(RUNTIME_FILE)) {
                Ok(manifest) => manifest,
                Err(err) if err.is_missing() => {
                    debug!(compare_id = %compare_id, "Skipping comparison without manifest");
                    continue;
                }
                Err(err) => {
                    warn!(compare_id = %compare_id, error = %err, "Skipping unreadable comparison");
                    continue;
                }
            };
            if dataset.is_some_and(|dataset| dataset != manifest.dataset) {
                continue;
            }
            let models = self.enrich(&manifest.models);
            runs.push(CompareEntry {
                timestamp: compare_id.parse().unwrap_or_default(),
                compare_id,
                dataset: manifest.dataset,
                name: manifest.name.filter(|name| !name.is_empty()),
                mask: manifest.mask,
                impute: manifest.impute,
                sequence: manifest.sequence,
                models,
            });
        }
        runs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(runs)
    }

    pub fn delete(&self, compare_id: &str) -> Result<(), StoreError> {
        let id = parse_compare_id(compare_id)?;
        self.locks.with_lock(id.as_str(), || {
            let dir = self.root.join(id.as_str());
            if !dir.is_dir() {
                return Err(StoreError::NotFound {
                    kind: RecordKind::Compare,
                    id: id.to_string(),
                });
            }
            fs::remove_dir_all(&dir).map_err(|source| StoreError::DeleteFailed {
                kind: RecordKind::Compare,
                path: dir.clone(),
                source,
            })?;
            info!(compare_id = %id, "Deleted comparison");
            Ok(())
        })
    }

    /// Set or clear the name stored in a comparison manifest. `None` and `""`
    /// clear it.
    pub fn rename(&self, compare_id: &str, name: Option<&str>) -> Result<Option<String>, StoreError> {
        let id = parse_compare_id(compare_id)?;
        let requested = name.unwrap_or_default();
        identity::validate_name(requested)?;
        let stored = identity::sanitize_name(requested);

        self.locks.with_lock(id.as_str(), || {
            let dir = self.root.join(id.as_str());
            if !dir.is_dir() {
                return Err(StoreError::NotFound {
                    kind: RecordKind::Compare,
                    id: id.to_string(),
                });
            }
            sidecar::write_name(&dir.join(RUNTIME_FILE), stored.as_deref())?;
            info!(compare_id = %id, name = ?stored, "Renamed comparison");
            Ok(stored)
        })
    }

    /// Persist the manifest of a freshly completed comparison. A manifest the
    /// compare script already wrote is left untouched; returns whether one was
    /// written.
    pub fn record(&self, compare_id: &RecordId, manifest: &CompareManifest) -> Result<bool, StoreError> {
        self.locks.with_lock(compare_id.as_str(), || {
            let dir = self.root.join(compare_id.as_str());
            let path = dir.join(RUNTIME_FILE);
            if path.is_file() {
                return Ok(false);
            }
            fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
                path: dir.clone(),
                source,
            })?;
            sidecar::write_compare_manifest(&path, manifest)?;
            info!(compare_id = %compare_id, dataset = %manifest.dataset, "Recorded comparison");
            Ok(true)
        })
    }

    /// URLs of the `.png` artifacts of a comparison.
    pub fn images(&self, compare_id: &str) -> Vec<String> {
        if !is_record_id(compare_id) {
            return Vec::new();
        }
        fs_ops::png_file_names(&self.root.join(compare_id))
            .into_iter()
            .map(|file| format!("/output/{COMPARE_DIR}/{compare_id}/{file}"))
            .collect()
    }

    fn enrich(&self, models: &ManifestModels) -> Vec<CompareModelInfo> {
        unique_refs(models)
            .into_iter()
            .map(|model| CompareModelInfo {
                name: read_run_name(&self.runs_root, &model.run_id).or_else(|| model.name.clone()),
                run_id: model.run_id.clone(),
                model: model.model,
            })
            .collect()
    }
}

/// Run references of a manifest in order of first appearance. Sequence
/// manifests are walked in ascending numeric mask order.
pub fn unique_refs(models: &ManifestModels) -> Vec<&ManifestModel> {
    let ordered: Vec<&ManifestModel> = match models {
        ManifestModels::Flat(models) => models.iter().collect(),
        ManifestModels::ByMask(slices) => {
            let mut masks = slices.iter().collect::<Vec<_>>();
            masks.sort_by_key(|(mask, _)| mask.parse::<u32>().unwrap_or(u32::MAX));
            masks
                .into_iter()
                .flat_map(|(_, slice)| slice.models.iter())
                .collect()
        }
    };
    let mut seen = HashSet::new();
    ordered
        .into_iter()
        .filter(|model| seen.insert(model.run_id.as_str()))
        .collect()
}

fn parse_compare_id(compare_id: &str) -> Result<RecordId, StoreError> {
    RecordId::parse(compare_id).map_err(|_| StoreError::InvalidId {
        kind: RecordKind::Compare,
        id: compare_id.to_string(),
    })
}

#[cfg(test)]
mod tests;
