//! HTTP endpoints for the webhook router.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use crate::error::RelayError;
use crate::pipeline::processor::RelayController;
use crate::pipeline::types::RoutingVerdict;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<RelayController>,
}

/// Build the router: `GET /` health probe, `POST /` webhook intake.
pub fn router(controller: Arc<RelayController>) -> Router {
    Router::new()
        .route("/", get(health).post(webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { controller })
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "ok": true,
        "service": "router_online"
    }))
}

/// POST /
///
/// The body is read as raw bytes so a bad payload surfaces as our own
/// 400 rather than the extractor's rejection.
async fn webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RoutingVerdict>, RelayError> {
    state.controller.handle(&body).await.map(Json)
}
