use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    response::Response,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::{
    catalog::{DatasetId, ModelKind},
    store::{HistoryFilter, is_record_id},
};

use super::{AppState, response};

#[derive(Debug, Default, Deserialize)]
pub(super) struct HistoryQuery {
    model: Option<String>,
    dataset: Option<String>,
}

/// Parse an optional filter value. `Err` means the value names nothing known,
/// so the listing is empty.
fn parse_filter<T: std::str::FromStr>(value: Option<&str>) -> Result<Option<T>, ()> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|_| ()),
    }
}

pub(super) async fn list(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let model = parse_filter::<ModelKind>(query.model.as_deref());
    let dataset = parse_filter::<DatasetId>(query.dataset.as_deref());
    let (Ok(model), Ok(dataset)) = (model, dataset) else {
        return response::ok(json!({"runs": []}));
    };
    let store = state.history.clone();
    let listed = match response::blocking(move || store.list(&HistoryFilter { model, dataset })).await {
        Ok(listed) => listed,
        Err(resp) => return resp,
    };
    let runs = listed.unwrap_or_else(|err| {
        warn!(error = %err, "Failed to list run history");
        Vec::new()
    });
    response::ok(json!({"runs": runs}))
}

pub(super) async fn remove(State(state): State<AppState>, Path(run_id): Path<String>) -> Response {
    let store = state.history.clone();
    match response::blocking(move || store.delete(&run_id)).await {
        Ok(Ok(())) => response::ok(json!({"success": true})),
        Ok(Err(err)) => response::store_error(err),
        Err(resp) => resp,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RenameBody {
    #[serde(default)]
    run_id: String,
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
    let store = state.history.clone();
    let name = body.name.unwrap_or_default();
    match response::blocking(move || store.rename(&body.run_id, &name)).await {
        Ok(Ok(name)) => response::ok(json!({"success": true, "name": name})),
        Ok(Err(err)) => response::store_error(err),
        Err(resp) => resp,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ImagesQuery {
    run_id: Option<String>,
    compare_id: Option<String>,
}

/// Image URLs of a training run or a comparison. Unknown or malformed IDs
/// list nothing.
pub(super) async fn images(
    State(state): State<AppState>,
    Query(query): Query<ImagesQuery>,
) -> Response {
    let state = state.clone();
    let listed = response::blocking(move || {
        match (query.run_id.as_deref(), query.compare_id.as_deref()) {
            (Some(run_id), _) if is_record_id(run_id) => state.history.images(run_id),
            (None, Some(compare_id)) if is_record_id(compare_id) => {
                state.compare.images(compare_id)
            }
            _ => Vec::new(),
        }
    })
    .await;
    match listed {
        Ok(images) => response::ok(json!({"images": images})),
        Err(resp) => resp,
    }
}
