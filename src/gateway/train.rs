//! Training requests: argv construction and normalization of the result the
//! training script prints.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    catalog::{DatasetId, ModelKind},
    errors::{ApiError, ErrorCode},
    selection::MAX_MASK,
};

use super::{
    GatewayError, ScriptGateway, ScriptOutput,
    payload::{check_success, parse_payload},
};

const AGGREGATE_KEYS: [&str; 3] = ["accuracy", "macro avg", "weighted avg"];

/// Dataset options forwarded to every training script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetParams {
    #[serde(default)]
    pub mask: u32,
    #[serde(default)]
    pub impute: bool,
    #[serde(default, alias = "use_output")]
    pub use_output: bool,
    #[serde(default)]
    pub images: bool,
}

/// Body of `POST /train`. Model and dataset stay strings until validated so an
/// unknown value can be reported by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainRequest {
    pub dataset: String,
    pub model: String,
    #[serde(default)]
    pub dataset_params: DatasetParams,
    #[serde(default)]
    pub model_params: Option<Value>,
}

impl TrainRequest {
    pub fn validate(&self) -> Result<(ModelKind, DatasetId), ApiError> {
        let model = self
            .model
            .parse::<ModelKind>()
            .map_err(|err| ApiError::invalid_params(err.to_string()))?;
        let dataset = self
            .dataset
            .parse::<DatasetId>()
            .map_err(|err| ApiError::invalid_params(err.to_string()))?;
        if self.dataset_params.mask > MAX_MASK {
            return Err(ApiError::invalid_params(format!(
                "mask must be between 0 and {MAX_MASK}, got {}",
                self.dataset_params.mask
            )));
        }
        Ok((model, dataset))
    }
}

/// Argument vector for a training script.
pub fn train_args(
    dataset: DatasetId,
    params: &DatasetParams,
    model_params: Option<&Value>,
) -> Vec<String> {
    let mut args = vec![
        "--json".to_string(),
        "--dataset".to_string(),
        dataset.to_string(),
        "--mask".to_string(),
        params.mask.to_string(),
    ];
    if params.impute {
        args.push("--impute".to_string());
    }
    if params.use_output {
        args.extend(["--use-output".to_string(), "true".to_string()]);
    }
    if params.images {
        args.push("--images".to_string());
    }
    if let Some(model_params) = model_params.filter(|value| !value.is_null()) {
        args.extend(["--model-config".to_string(), model_params.to_string()]);
    }
    args
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AggregateMetrics,
    pub weighted_avg: AggregateMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_iterations: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_depth: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_leaves: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_estimators: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oob_score: Option<f64>,
}

/// Training result as returned to the panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainResult {
    pub accuracy: f64,
    pub accuracy_percent: String,
    pub classification_report: ClassificationReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_info: Option<ModelInfo>,
    /// Wall-clock milliseconds spent in the request.
    pub execution_time: u64,
}

/// Reshape the raw training payload. `None` when a required piece is missing
/// or has the wrong type.
pub fn normalize_train_result(payload: &Value) -> Option<TrainResult> {
    let accuracy = payload.get("accuracy")?.as_f64()?;
    let report = payload.get("classification_report")?.as_object()?;

    let classes = report
        .iter()
        .filter(|(label, _)| !AGGREGATE_KEYS.contains(&label.as_str()))
        .filter_map(|(label, metrics)| {
            let metrics = aggregate(metrics)?;
            Some(ClassMetrics {
                label: label.clone(),
                precision: metrics.precision,
                recall: metrics.recall,
                f1_score: metrics.f1_score,
                support: metrics.support,
            })
        })
        .collect();

    let report_accuracy = report
        .get("accuracy")
        .and_then(Value::as_f64)
        .unwrap_or(accuracy);

    Some(TrainResult {
        accuracy,
        accuracy_percent: format!("{:.2}%", accuracy * 100.0),
        classification_report: ClassificationReport {
            classes,
            accuracy: report_accuracy,
            macro_avg: aggregate(report.get("macro avg")?)?,
            weighted_avg: aggregate(report.get("weighted avg")?)?,
        },
        model_info: payload
            .get("model_info")
            .and_then(Value::as_object)
            .map(model_info),
        execution_time: 0,
    })
}

fn aggregate(value: &Value) -> Option<AggregateMetrics> {
    let metrics = value.as_object()?;
    let field = |key: &str| metrics.get(key).and_then(Value::as_f64);
    Some(AggregateMetrics {
        precision: field("precision")?,
        recall: field("recall")?,
        f1_score: field("f1-score")?,
        support: field("support")?,
    })
}

fn model_info(raw: &Map<String, Value>) -> ModelInfo {
    let number = |key: &str| raw.get(key).and_then(Value::as_f64);
    ModelInfo {
        kind: raw.get("type").and_then(Value::as_str).map(str::to_string),
        n_iterations: number("nIterations")
            .filter(|n| *n != 0.0)
            .or_else(|| number("n_iter_")),
        tree_depth: number("treeDepth"),
        n_leaves: number("nLeaves"),
        n_estimators: number("nEstimators"),
        oob_score: number("oobScore"),
    }
}

fn invalid_output(output: &ScriptOutput) -> ApiError {
    ApiError::new(
        ErrorCode::InvalidJsonOutput,
        "Training script returned an unexpected result",
    )
    .with_details(output.stdout.clone())
    .with_stack_trace(Some(output.stderr.clone()).filter(|stderr| !stderr.is_empty()))
}

impl ScriptGateway {
    /// Run the training script for `request` and normalize what it prints.
    pub async fn train(
        &self,
        request: &TrainRequest,
        timeout: Duration,
    ) -> Result<TrainResult, GatewayError> {
        let started = Instant::now();
        let (model, dataset) = request.validate()?;
        let args = train_args(
            dataset,
            &request.dataset_params,
            request.model_params.as_ref(),
        );
        let output = self.invoke(model.script(), &args, timeout).await?;

        let payload = parse_payload(&output, "training script")?;
        check_success(&payload, "Training failed")?;
        let mut result =
            normalize_train_result(&payload).ok_or_else(|| invalid_output(&output))?;
        result.execution_time = started.elapsed().as_millis() as u64;
        tracing::info!(
            model = %model,
            dataset = %dataset,
            accuracy = result.accuracy,
            "Training finished"
        );
        Ok(result)
    }
}
