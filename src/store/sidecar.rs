//! Decoding and updating of `runtime.json` sidecars.
//!
//! Each record type has exactly one decode function returning a typed value or
//! a [`SidecarError`]; callers decide whether a failure skips the record or
//! aborts the operation.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    catalog::{DatasetId, ModelKind},
    fs_ops,
};

/// Filename of the per-run and per-comparison manifest.
pub const RUNTIME_FILE: &str = "runtime.json";

/// Errors raised while reading or rewriting a sidecar.
#[derive(Debug, thiserror::Error)]
pub enum SidecarError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Expected a JSON object in {path}")]
    NotAnObject { path: PathBuf },
    #[error("Failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl SidecarError {
    /// True when the sidecar file simply does not exist.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// `runtime.json` written by a training script.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingRuntime {
    #[serde(default)]
    pub dataset: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, alias = "dataset_params")]
    pub dataset_params: Option<Value>,
    #[serde(default, alias = "model_params")]
    pub model_params: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Reference to a training run inside a comparison manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestModel {
    pub run_id: String,
    pub model: ModelKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Models evaluated at one mask rate of a sequence comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestSlice {
    #[serde(default)]
    pub models: Vec<ManifestModel>,
}

/// Constituent runs of a comparison: a flat list, or one slice per mask rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestModels {
    Flat(Vec<ManifestModel>),
    ByMask(BTreeMap<String, ManifestSlice>),
}

impl Default for ManifestModels {
    fn default() -> Self {
        Self::Flat(Vec::new())
    }
}

/// `compare/{compareId}/runtime.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareManifest {
    #[serde(default)]
    pub compare_id: Option<String>,
    pub dataset: DatasetId,
    #[serde(default)]
    pub mask: u32,
    #[serde(default)]
    pub impute: bool,
    #[serde(default)]
    pub sequence: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub models: ManifestModels,
}

/// Decode a training run's `runtime.json`.
pub fn read_training_runtime(path: &Path) -> Result<TrainingRuntime, SidecarError> {
    read_json(path)
}

/// Decode a comparison manifest.
pub fn read_compare_manifest(path: &Path) -> Result<CompareManifest, SidecarError> {
    read_json(path)
}

/// Write a comparison manifest atomically, pretty-printed.
pub fn write_compare_manifest(path: &Path, manifest: &CompareManifest) -> Result<(), SidecarError> {
    let text = serde_json::to_string_pretty(manifest).map_err(|source| SidecarError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    write_text(path, &text)
}

/// Replace the `name` field of any `runtime.json`, keeping every other key as
/// written by the script. `None` stores JSON `null`.
pub fn write_name(path: &Path, name: Option<&str>) -> Result<(), SidecarError> {
    let mut value: Value = read_json(path)?;
    let Some(object) = value.as_object_mut() else {
        return Err(SidecarError::NotAnObject {
            path: path.to_path_buf(),
        });
    };
    object.insert(
        "name".to_string(),
        name.map_or(Value::Null, |name| Value::String(name.to_string())),
    );
    let text = serde_json::to_string_pretty(&value).map_err(|source| SidecarError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    write_text(path, &text)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, SidecarError> {
    let text = std::fs::read_to_string(path).map_err(|source| SidecarError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| SidecarError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_text(path: &Path, text: &str) -> Result<(), SidecarError> {
    fs_ops::atomic_write(path, text.as_bytes()).map_err(|source| SidecarError::Write {
        path: path.to_path_buf(),
        source,
    })
}
