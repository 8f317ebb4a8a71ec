//! Comparison results: one accuracy per run at a single mask rate, or one
//! slice of accuracies per mask rate for sequence runs.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    catalog::{DatasetId, ModelKind},
    store::{CompareManifest, ManifestModel, ManifestModels, ManifestSlice},
};

use super::request::CompareRequest;

/// Accuracy of one run at the requested mask rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelComparison {
    pub run_id: String,
    pub model: ModelKind,
    #[serde(default)]
    pub columns: Vec<u32>,
    pub train_accuracy: f64,
    pub compare_accuracy: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imputed: Option<bool>,
}

/// Accuracy of one run at one mask rate of a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencePoint {
    pub run_id: String,
    pub model: ModelKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub accuracy: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imputed: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceSlice {
    #[serde(default)]
    pub models: Vec<SequencePoint>,
}

/// Outcome of a successful comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CompareResultWire", into = "CompareResultWire")]
pub enum CompareResult {
    Flat {
        compare_id: String,
        images: Vec<String>,
        models: Vec<ModelComparison>,
    },
    Sequence {
        compare_id: String,
        images: Vec<String>,
        /// Keyed by mask rate as a decimal string.
        results: BTreeMap<String, SequenceSlice>,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompareResultWire {
    #[serde(default)]
    compare_id: String,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    models: Option<Vec<ModelComparison>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sequence: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    results: Option<BTreeMap<String, SequenceSlice>>,
}

/// A result document that is neither a flat nor a sequence comparison.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResultShapeError {
    #[error("Result has both `models` and `results`")]
    Ambiguous,
    #[error("Sequence result is missing `results`")]
    MissingResults,
    #[error("Result has neither `models` nor `results`")]
    Empty,
}

impl TryFrom<CompareResultWire> for CompareResult {
    type Error = ResultShapeError;

    fn try_from(wire: CompareResultWire) -> Result<Self, Self::Error> {
        let sequence = wire.sequence.unwrap_or(false);
        match (wire.models, wire.results) {
            (Some(_), Some(_)) => Err(ResultShapeError::Ambiguous),
            (Some(models), None) if !sequence => Ok(Self::Flat {
                compare_id: wire.compare_id,
                images: wire.images,
                models,
            }),
            (Some(_), None) => Err(ResultShapeError::MissingResults),
            (None, Some(results)) => Ok(Self::Sequence {
                compare_id: wire.compare_id,
                images: wire.images,
                results,
            }),
            (None, None) if sequence => Err(ResultShapeError::MissingResults),
            (None, None) => Err(ResultShapeError::Empty),
        }
    }
}

impl From<CompareResult> for CompareResultWire {
    fn from(result: CompareResult) -> Self {
        match result {
            CompareResult::Flat {
                compare_id,
                images,
                models,
            } => Self {
                compare_id,
                images,
                models: Some(models),
                sequence: None,
                results: None,
            },
            CompareResult::Sequence {
                compare_id,
                images,
                results,
            } => Self {
                compare_id,
                images,
                models: None,
                sequence: Some(true),
                results: Some(results),
            },
        }
    }
}

impl CompareResult {
    pub fn compare_id(&self) -> &str {
        match self {
            Self::Flat { compare_id, .. } | Self::Sequence { compare_id, .. } => compare_id,
        }
    }

    pub fn images(&self) -> &[String] {
        match self {
            Self::Flat { images, .. } | Self::Sequence { images, .. } => images,
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Sequence { .. })
    }

    /// Runs referenced by the result, first appearance wins. Sequence slices
    /// are visited in ascending numeric mask order.
    pub fn run_refs(&self) -> Vec<(String, ModelKind)> {
        let ordered: Vec<(&str, ModelKind)> = match self {
            Self::Flat { models, .. } => models
                .iter()
                .map(|model| (model.run_id.as_str(), model.model))
                .collect(),
            Self::Sequence { results, .. } => sorted_slices(results)
                .into_iter()
                .flat_map(|(_, slice)| slice.models.iter())
                .map(|point| (point.run_id.as_str(), point.model))
                .collect(),
        };
        let mut seen = HashSet::new();
        ordered
            .into_iter()
            .filter(|(run_id, _)| seen.insert(*run_id))
            .map(|(run_id, model)| (run_id.to_string(), model))
            .collect()
    }

    /// Manifest persisted for this result under `compare/{compareId}/`.
    pub fn manifest(&self, dataset: DatasetId, request: &CompareRequest) -> CompareManifest {
        let models = match self {
            Self::Flat { models, .. } => ManifestModels::Flat(
                models
                    .iter()
                    .map(|model| ManifestModel {
                        run_id: model.run_id.clone(),
                        model: model.model,
                        name: None,
                    })
                    .collect(),
            ),
            Self::Sequence { results, .. } => ManifestModels::ByMask(
                results
                    .iter()
                    .map(|(mask, slice)| {
                        let models = slice
                            .models
                            .iter()
                            .map(|point| ManifestModel {
                                run_id: point.run_id.clone(),
                                model: point.model,
                                name: point.name.clone(),
                            })
                            .collect();
                        (mask.clone(), ManifestSlice { models })
                    })
                    .collect(),
            ),
        };
        CompareManifest {
            compare_id: Some(self.compare_id().to_string()),
            dataset,
            mask: request.mask(),
            impute: request.impute(),
            sequence: self.is_sequence(),
            name: None,
            models,
        }
    }
}

fn sorted_slices(results: &BTreeMap<String, SequenceSlice>) -> Vec<(&String, &SequenceSlice)> {
    let mut slices = results.iter().collect::<Vec<_>>();
    slices.sort_by_key(|(mask, _)| mask.parse::<u32>().unwrap_or(u32::MAX));
    slices
}
