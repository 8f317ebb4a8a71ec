use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::Response,
};
use serde_json::json;
use tracing::warn;

use crate::gateway::TrainRequest;

use super::{AppState, response};

pub(super) async fn run(
    State(state): State<AppState>,
    body: Result<Json<TrainRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return response::api_error(response::bad_body(rejection)),
    };
    match state.gateway.train(&request, state.train_timeout).await {
        Ok(result) => response::ok(json!({"success": true, "data": result})),
        Err(err) => {
            warn!(code = %err.code, error = %err.message, "Training failed");
            response::api_error(err)
        }
    }
}
