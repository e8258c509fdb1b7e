//! Profile email upsert — POST /profiles/email.
//!
//! The client app calls this on sign-in so the dispatch jobs can read a
//! cached address without a round-trip to the identity provider.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use daybook_core::error::DaybookError;

use crate::app::AppState;
use crate::http::jobs::{check_trigger_auth, error_body, HandlerError};

#[derive(Deserialize)]
pub struct EmailUpsert {
    pub user_id: String,
    pub email: String,
}

/// POST /profiles/email — create-or-update a profile's cached email.
pub async fn upsert_email_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<EmailUpsert>,
) -> Result<Json<Value>, HandlerError> {
    check_trigger_auth(state.config.server.trigger_token.as_deref(), &headers)?;

    if body.user_id.trim().is_empty() || !body.email.contains('@') {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "user_id and a valid email are required"})),
        ));
    }

    state
        .store
        .upsert_profile_email(&body.user_id, &body.email)
        .map_err(|e| {
            let err = DaybookError::Store(e.to_string());
            warn!("profile email upsert failed: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body(&err))
        })?;

    Ok(Json(json!({"ok": true})))
}
