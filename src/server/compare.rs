use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    response::Response,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{
    catalog::DatasetId,
    errors::{ApiError, ErrorCode},
    gateway::{COMPARE_SCRIPT, check_success, parse_payload},
    orchestrator::{CompareRequest, CompareResult},
    store::RecordId,
};

use super::{AppState, response};

#[derive(Debug, Default, Deserialize)]
pub(super) struct CompareHistoryQuery {
    dataset: Option<String>,
}

pub(super) async fn list(
    State(state): State<AppState>,
    Query(query): Query<CompareHistoryQuery>,
) -> Response {
    let dataset = match query.dataset.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(value) => match value.parse::<DatasetId>() {
            Ok(dataset) => Some(dataset),
            Err(_) => return response::ok(json!({"runs": []})),
        },
    };
    let store = state.compare.clone();
    match response::blocking(move || store.list(dataset)).await {
        Ok(Ok(runs)) => response::ok(json!({"runs": runs})),
        Ok(Err(err)) => {
            warn!(error = %err, "Failed to list comparisons");
            response::ok(json!({"runs": []}))
        }
        Err(resp) => resp,
    }
}

pub(super) async fn remove(
    State(state): State<AppState>,
    Path(compare_id): Path<String>,
) -> Response {
    let store = state.compare.clone();
    match response::blocking(move || store.delete(&compare_id)).await {
        Ok(Ok(())) => response::ok(json!({"success": true})),
        Ok(Err(err)) => response::store_error(err),
        Err(resp) => resp,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RenameBody {
    #[serde(default)]
    compare_id: String,
    #[serde(default)]
    name: Option<String>,
}

pub(super) async fn rename(
    State(state): State<AppState>,
    body: Result<Json<RenameBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return response::api_error(response::bad_body(rejection)),
    };
    let store = state.compare.clone();
    match response::blocking(move || store.rename(&body.compare_id, body.name.as_deref())).await {
        Ok(Ok(name)) => response::ok(json!({"success": true, "name": name})),
        Ok(Err(err)) => response::store_error(err),
        Err(resp) => resp,
    }
}

/// Run the compare script and record its result.
pub(super) async fn run(
    State(state): State<AppState>,
    body: Result<Json<CompareRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return response::api_error(response::bad_body(rejection)),
    };
    match compare(&state, &request).await {
        Ok(result) => response::ok(json!({"success": true, "data": result})),
        Err(err) => {
            warn!(code = %err.code, error = %err.message, "Comparison failed");
            response::api_error(err)
        }
    }
}

async fn compare(state: &AppState, request: &CompareRequest) -> Result<CompareResult, ApiError> {
    let dataset = request.validate()?;
    let output = state
        .gateway
        .invoke(COMPARE_SCRIPT, &request.script_args(), state.compare_timeout)
        .await?;
    let mut payload = parse_payload(&output, "compare script")?;
    check_success(&payload, "Compare failed")?;

    let compare_id = payload
        .get("compareId")
        .and_then(Value::as_str)
        .and_then(|id| RecordId::parse(id).ok())
        .unwrap_or_else(RecordId::now);
    let store = state.compare.clone();
    let id = compare_id.as_str().to_string();
    let images = tokio::task::spawn_blocking(move || store.images(&id))
        .await
        .unwrap_or_default();

    let Some(object) = payload.as_object_mut() else {
        return Err(unexpected_shape("payload is not a JSON object"));
    };
    object.insert("compareId".into(), Value::String(compare_id.to_string()));
    object.insert("images".into(), json!(images));
    let result: CompareResult =
        serde_json::from_value(payload).map_err(|err| unexpected_shape(&err.to_string()))?;

    let manifest = result.manifest(dataset, request);
    let store = state.compare.clone();
    let recorded = tokio::task::spawn_blocking(move || store.record(&compare_id, &manifest)).await;
    match recorded {
        Ok(Ok(_)) => {}
        Ok(Err(err)) => warn!(error = %err, "Failed to record comparison manifest"),
        Err(err) => warn!(error = %err, "Recording comparison manifest panicked"),
    }
    info!(
        compare_id = result.compare_id(),
        dataset = %dataset,
        sequence = result.is_sequence(),
        "Comparison finished"
    );
    Ok(result)
}

fn unexpected_shape(details: &str) -> ApiError {
    ApiError::new(
        ErrorCode::InvalidJsonOutput,
        "Compare script returned an unexpected result",
    )
    .with_details(details)
}
