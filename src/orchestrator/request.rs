use serde::{Deserialize, Serialize};

use crate::{
    catalog::DatasetId,
    errors::ApiError,
    selection::{CompareParams, MAX_MASK},
    store::is_record_id,
};

/// Body of `POST /compare`.
///
/// Sequence requests carry only `{dataset, models, sequence}`; single-mask
/// requests carry `{dataset, models, mask, impute}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareRequest {
    #[serde(default)]
    pub dataset: String,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impute: Option<bool>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub sequence: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl CompareRequest {
    /// Request for `run_ids` under the cached parameters. Imputation only
    /// applies to masked data, so it is sent as `false` when `mask == 0`.
    pub fn build(dataset: DatasetId, run_ids: Vec<String>, params: &CompareParams) -> Self {
        if params.sequence {
            return Self {
                dataset: dataset.to_string(),
                models: run_ids,
                mask: None,
                impute: None,
                sequence: true,
            };
        }
        Self {
            dataset: dataset.to_string(),
            models: run_ids,
            mask: Some(params.mask),
            impute: Some(params.mask > 0 && params.impute),
            sequence: false,
        }
    }

    /// Check the request before any process is spawned.
    pub fn validate(&self) -> Result<DatasetId, ApiError> {
        if self.dataset.is_empty() || self.models.is_empty() {
            return Err(ApiError::invalid_params(
                "Dataset and at least one model ID are required",
            ));
        }
        let dataset = self
            .dataset
            .parse::<DatasetId>()
            .map_err(|err| ApiError::invalid_params(err.to_string()))?;
        if let Some(bad) = self.models.iter().find(|run_id| !is_record_id(run_id)) {
            return Err(ApiError::invalid_params(format!("Invalid run ID: {bad}")));
        }
        if let Some(mask) = self.mask.filter(|mask| *mask > MAX_MASK) {
            return Err(ApiError::invalid_params(format!(
                "mask must be between 0 and {MAX_MASK}, got {mask}"
            )));
        }
        Ok(dataset)
    }

    pub fn mask(&self) -> u32 {
        self.mask.unwrap_or_default()
    }

    pub fn impute(&self) -> bool {
        self.impute.unwrap_or_default()
    }

    /// Argument vector for the compare script. Images are always requested.
    pub fn script_args(&self) -> Vec<String> {
        let mut args = vec![
            "--dataset".to_string(),
            self.dataset.clone(),
            "--models".to_string(),
            self.models.join(","),
        ];
        if self.mask() > 0 {
            args.extend(["--mask".to_string(), self.mask().to_string()]);
        }
        if self.impute() {
            args.push("--impute".to_string());
        }
        if self.sequence {
            args.push("--sequence".to_string());
        }
        args.push("--images".to_string());
        args
    }
}
