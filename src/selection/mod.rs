//! Per-dataset list of training runs picked for comparison.
//!
//! The list always holds exactly one empty slot (an entry without a run) so a
//! user can keep adding runs. Every mutation re-establishes that invariant and
//! is written through to the injected [`KeyValueStore`].

use std::{cmp::Ordering, collections::HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{
    catalog::{DatasetId, ModelKind},
    store::HistoryEntry,
};

pub mod kv;

pub use kv::{JsonFileKv, KeyValueStore, KvError, MemoryKv};

const MODELS_KEY: &str = "compare_models";
const PARAMS_KEY: &str = "compare_params";

/// One slot of the selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionEntry {
    pub id: String,
    #[serde(default)]
    pub model_type: Option<ModelKind>,
    #[serde(default)]
    pub run_id: Option<String>,
}

impl SelectionEntry {
    pub fn empty() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            model_type: None,
            run_id: None,
        }
    }

    pub fn filled(run_id: impl Into<String>, model_type: ModelKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            model_type: Some(model_type),
            run_id: Some(run_id.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.run_id.is_none()
    }
}

/// Largest mask rate, in percent.
pub const MAX_MASK: u32 = 100;

/// Comparison options remembered per dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareParams {
    #[serde(default)]
    pub mask: u32,
    #[serde(default)]
    pub impute: bool,
    #[serde(default)]
    pub ignore_columns: Vec<u32>,
    #[serde(default)]
    pub sequence: bool,
}

#[derive(Debug)]
pub struct SelectionModel<S> {
    store: S,
    dataset: DatasetId,
    entries: Vec<SelectionEntry>,
    params: CompareParams,
}

impl<S: KeyValueStore> SelectionModel<S> {
    /// Restore the selection and parameters cached for `dataset`.
    pub fn load(store: S, dataset: DatasetId) -> Self {
        let mut model = Self {
            store,
            dataset,
            entries: Vec::new(),
            params: CompareParams::default(),
        };
        model.restore();
        model
    }

    /// Make `dataset` current, restoring whatever was cached for it.
    pub fn switch_dataset(&mut self, dataset: DatasetId) {
        if self.dataset != dataset {
            self.dataset = dataset;
            self.restore();
        }
    }

    pub fn dataset(&self) -> DatasetId {
        self.dataset
    }

    pub fn entries(&self) -> &[SelectionEntry] {
        &self.entries
    }

    pub fn params(&self) -> &CompareParams {
        &self.params
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Change a slot's model kind. The slot's run no longer matches and is
    /// cleared. Returns `false` for an unknown slot.
    pub fn update_model_type(&mut self, id: &str, model_type: Option<ModelKind>) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) else {
            return false;
        };
        entry.model_type = model_type;
        entry.run_id = None;
        self.normalize(Some(id));
        self.persist_models();
        true
    }

    /// Point a slot at a run, or clear it with `None`.
    pub fn update_model_run(&mut self, id: &str, run_id: Option<String>) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) else {
            return false;
        };
        entry.run_id = run_id;
        self.normalize(Some(id));
        self.persist_models();
        true
    }

    pub fn remove_model(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        if self.entries.len() == before {
            return false;
        }
        self.normalize(None);
        self.persist_models();
        true
    }

    /// Append a run after the filled slots. A run already present is left
    /// alone and `false` is returned.
    pub fn add_model(&mut self, run_id: &str, model_type: ModelKind) -> bool {
        if self
            .entries
            .iter()
            .any(|entry| entry.run_id.as_deref() == Some(run_id))
        {
            return false;
        }
        self.entries.retain(|entry| !entry.is_empty());
        self.entries.push(SelectionEntry::filled(run_id, model_type));
        self.normalize(None);
        self.persist_models();
        true
    }

    /// Replace the selection with every run of the current dataset, grouped by
    /// model kind with named runs first.
    pub fn add_all_models(&mut self, history: &[HistoryEntry]) {
        let mut runs = history
            .iter()
            .filter(|run| run.dataset == self.dataset)
            .collect::<Vec<_>>();
        runs.sort_by(|a, b| compare_for_selection(a, b));
        self.entries = runs
            .into_iter()
            .map(|run| SelectionEntry::filled(run.run_id.clone(), run.model))
            .collect();
        self.normalize(None);
        self.persist_models();
    }

    pub fn clear_all_models(&mut self) {
        self.entries = vec![SelectionEntry::empty()];
        self.persist_models();
    }

    /// Replace the selection with `refs`, keeping the first slot per run.
    pub fn replace_with(&mut self, refs: impl IntoIterator<Item = (String, ModelKind)>) {
        let mut seen = HashSet::new();
        self.entries = refs
            .into_iter()
            .filter(|(run_id, _)| seen.insert(run_id.clone()))
            .map(|(run_id, model)| SelectionEntry::filled(run_id, model))
            .collect();
        self.normalize(None);
        self.persist_models();
    }

    /// Runs selected in two or more slots, in order of first appearance.
    pub fn duplicate_run_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for run_id in self.entries.iter().filter_map(|entry| entry.run_id.as_deref()) {
            if !seen.insert(run_id) && !duplicates.iter().any(|dup| dup == run_id) {
                duplicates.push(run_id.to_string());
            }
        }
        duplicates
    }

    /// At least one run selected and no run selected twice.
    pub fn can_compare(&self) -> bool {
        self.entries.iter().any(|entry| !entry.is_empty()) && self.duplicate_run_ids().is_empty()
    }

    /// Selected runs in slot order.
    pub fn selected_run_ids(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|entry| entry.run_id.clone())
            .collect()
    }

    /// Edit the comparison parameters in place and persist them.
    pub fn set_params(&mut self, apply: impl FnOnce(&mut CompareParams)) {
        apply(&mut self.params);
        self.persist_params();
    }

    pub fn reset_params(&mut self) {
        self.params = CompareParams::default();
        self.persist_params();
    }

    fn restore(&mut self) {
        self.entries = self
            .read_key::<Vec<SelectionEntry>>(&models_key(self.dataset))
            .unwrap_or_default();
        self.params = self
            .read_key::<CompareParams>(&params_key(self.dataset))
            .unwrap_or_default();
        self.normalize(None);
    }

    fn read_key<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key)?;
        serde_json::from_str(&raw)
            .inspect_err(|err| warn!(key, error = %err, "Ignoring unreadable cached selection"))
            .ok()
    }

    /// Keep exactly one empty slot: `preferred` if it is empty, otherwise the
    /// last empty one. Filled slots never move.
    fn normalize(&mut self, preferred: Option<&str>) {
        let keep = preferred
            .and_then(|id| {
                self.entries
                    .iter()
                    .find(|entry| entry.id == id && entry.is_empty())
            })
            .or_else(|| self.entries.iter().rev().find(|entry| entry.is_empty()))
            .map(|entry| entry.id.clone());
        match keep {
            Some(keep) => self
                .entries
                .retain(|entry| !entry.is_empty() || entry.id == keep),
            None => self.entries.push(SelectionEntry::empty()),
        }
    }

    fn persist_models(&mut self) {
        let key = models_key(self.dataset);
        match serde_json::to_string(&self.entries) {
            Ok(value) => self.write_key(&key, value),
            Err(err) => warn!(key = %key, error = %err, "Failed to encode selection"),
        }
    }

    fn persist_params(&mut self) {
        let key = params_key(self.dataset);
        match serde_json::to_string(&self.params) {
            Ok(value) => self.write_key(&key, value),
            Err(err) => warn!(key = %key, error = %err, "Failed to encode compare params"),
        }
    }

    fn write_key(&mut self, key: &str, value: String) {
        if let Err(err) = self.store.set(key, value) {
            warn!(key, error = %err, "Failed to persist selection");
        }
    }
}

fn models_key(dataset: DatasetId) -> String {
    format!("{MODELS_KEY}_{dataset}")
}

fn params_key(dataset: DatasetId) -> String {
    format!("{PARAMS_KEY}_{dataset}")
}

fn compare_for_selection(a: &HistoryEntry, b: &HistoryEntry) -> Ordering {
    let named = |run: &HistoryEntry| run.name.as_deref().is_some_and(|name| !name.is_empty());
    a.model
        .as_str()
        .cmp(b.model.as_str())
        .then_with(|| named(b).cmp(&named(a)))
        .then_with(|| sort_key(a).cmp(sort_key(b)))
}

fn sort_key(run: &HistoryEntry) -> &str {
    run.name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(&run.run_id)
}

#[cfg(test)]
mod tests;
