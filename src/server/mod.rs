//! HTTP surface of the panel.
//!
//! Store operations run on tokio's blocking pool; script invocations are
//! awaited directly. Every failure leaves a handler as a JSON body, never as a
//! panic or a bare status.

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use axum::{
    Json, Router,
    routing::{delete, get, post},
};
use serde_json::json;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;

use crate::{
    config::PanelSettings,
    gateway::{GatewayConfig, ScriptGateway},
    store::{CompareStore, HistoryStore},
};

mod compare;
mod history;
mod response;
mod train;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub history: Arc<HistoryStore>,
    pub compare: Arc<CompareStore>,
    pub gateway: Arc<ScriptGateway>,
    pub output_root: PathBuf,
    pub train_timeout: Duration,
    pub compare_timeout: Duration,
}

impl AppState {
    pub fn new(settings: &PanelSettings) -> Self {
        Self {
            history: Arc::new(HistoryStore::new(&settings.output_root)),
            compare: Arc::new(CompareStore::new(&settings.output_root)),
            gateway: Arc::new(ScriptGateway::new(GatewayConfig::from(&settings.scripts))),
            output_root: settings.output_root.clone(),
            train_timeout: settings.scripts.train_timeout(),
            compare_timeout: settings.scripts.compare_timeout(),
        }
    }
}

/// Build the panel router.
pub fn router(state: AppState) -> Router {
    let artifacts = ServeDir::new(&state.output_root);
    Router::new()
        .route("/health", get(health))
        .route("/history", get(history::list))
        .route("/history/:run_id", delete(history::remove))
        .route("/rename", post(history::rename))
        .route("/images", get(history::images))
        .route("/compare", post(compare::run))
        .route("/compare/history", get(compare::list))
        .route("/compare/history/:compare_id", delete(compare::remove))
        .route("/compare/rename", post(compare::rename))
        .route("/train", post(train::run))
        .nest_service("/output", artifacts)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(settings: &PanelSettings, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(AppState::new(settings));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        addr = %listener.local_addr()?,
        output_root = %settings.output_root.display(),
        scripts_dir = %settings.scripts.dir.display(),
        "Panel server listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
            }
        })
        .await
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")}))
}
