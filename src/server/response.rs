use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

use crate::{
    errors::ApiError,
    store::{StoreError, StoreErrorKind},
};

pub(super) fn store_status(kind: StoreErrorKind) -> StatusCode {
    match kind {
        StoreErrorKind::InvalidFormat | StoreErrorKind::InvalidName => StatusCode::BAD_REQUEST,
        StoreErrorKind::NotFound => StatusCode::NOT_FOUND,
        StoreErrorKind::DeleteFailed | StoreErrorKind::RenameFailed | StoreErrorKind::Io => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// `{success: false, error}` with the status matching the store failure.
pub(super) fn store_error(err: StoreError) -> Response {
    let status = store_status(err.kind());
    if status.is_server_error() {
        warn!(error = %err, code = err.kind().code(), "Store operation failed");
    }
    (
        status,
        Json(json!({"success": false, "error": err.public_message()})),
    )
        .into_response()
}

/// `{success: false, error: {message, code, details?, stackTrace?}}`.
pub(super) fn api_error(err: ApiError) -> Response {
    let status = if err.code.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(json!({"success": false, "error": err}))).into_response()
}

pub(super) fn ok(body: serde_json::Value) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

/// Body could not be decoded as the expected JSON document.
pub(super) fn bad_body(rejection: JsonRejection) -> ApiError {
    ApiError::invalid_params("Invalid request body").with_details(rejection.body_text())
}

/// Run a store call on the blocking pool.
pub(super) async fn blocking<T, F>(task: F) -> Result<T, Response>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task).await.map_err(|err| {
        error!(error = %err, "Store task panicked");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "error": "Internal server error"})),
        )
            .into_response()
    })
}
