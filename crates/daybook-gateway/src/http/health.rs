use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health — liveness probe, returns server metadata and store status.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    match state.store.profile_count() {
        Ok(profiles) => Json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "profiles": profiles,
        })),
        Err(e) => Json(json!({
            "status": "degraded",
            "version": env!("CARGO_PKG_VERSION"),
            "error": e.to_string(),
        })),
    }
}
