//! Job trigger endpoints — POST /jobs/{habit-reminders,task-reminders,daily-digest}.
//!
//! The external scheduler hits these on a fixed cadence. Responses are the
//! jobs' diagnostic JSON objects; nothing consumes them programmatically.
//!
//! Error taxonomy, in order of checking:
//! - missing trigger token → 401 before anything else
//! - mail not configured → 500 before any store access
//! - store / identity failure → 500 with the underlying message
//! Per-recipient delivery failures never surface here; the jobs log and
//! count them.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use daybook_core::clock;
use daybook_core::error::DaybookError;
use daybook_dispatch::{
    run_daily_digest, run_habit_reminders, run_task_reminders, DigestOutcome, DispatchError,
    HabitReminderOutcome, TaskReminderOutcome,
};
use daybook_mailer::Mailer;

use crate::app::AppState;

pub(crate) type HandlerError = (StatusCode, Json<Value>);

/// POST /jobs/habit-reminders
pub async fn habit_reminders_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<HabitReminderOutcome>, HandlerError> {
    check_trigger_auth(state.config.server.trigger_token.as_deref(), &headers)?;
    let mailer = require_mailer(&state)?;

    let run_id = Uuid::new_v4().to_string();
    let now = clock::reference_now();
    info!(%run_id, job = "habit-reminders", minute = %clock::minute_stamp(now), "trigger accepted");

    let outcome = run_habit_reminders(state.store.as_ref(), &state.resolver, mailer.as_ref(), now)
        .await
        .map_err(dispatch_error)?;
    info!(%run_id, job = "habit-reminders", sent = outcome.sent, "run complete");
    Ok(Json(outcome))
}

/// POST /jobs/task-reminders
pub async fn task_reminders_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TaskReminderOutcome>, HandlerError> {
    check_trigger_auth(state.config.server.trigger_token.as_deref(), &headers)?;
    let mailer = require_mailer(&state)?;

    let run_id = Uuid::new_v4().to_string();
    let now = clock::reference_now();
    info!(%run_id, job = "task-reminders", "trigger accepted");

    let outcome = run_task_reminders(state.store.as_ref(), &state.resolver, mailer.as_ref(), now)
        .await
        .map_err(dispatch_error)?;
    info!(%run_id, job = "task-reminders", "run complete");
    Ok(Json(outcome))
}

/// POST /jobs/daily-digest
pub async fn daily_digest_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<DigestOutcome>, HandlerError> {
    check_trigger_auth(state.config.server.trigger_token.as_deref(), &headers)?;
    let mailer = require_mailer(&state)?;

    let run_id = Uuid::new_v4().to_string();
    let now = clock::reference_now();
    info!(%run_id, job = "daily-digest", "trigger accepted");

    let outcome = run_daily_digest(state.store.as_ref(), &state.resolver, mailer.as_ref(), now)
        .await
        .map_err(dispatch_error)?;
    info!(%run_id, job = "daily-digest", sent = outcome.sent, "run complete");
    Ok(Json(outcome))
}

// ── helpers ──────────────────────────────────────────────────────────────────

/// Verify the static bearer token. A server with no token configured runs
/// open (the operator opted out; main logs a warning at startup).
pub(crate) fn check_trigger_auth(
    expected: Option<&str>,
    headers: &HeaderMap,
) -> Result<(), HandlerError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let provided = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if provided == Some(expected) {
        Ok(())
    } else {
        let err = DaybookError::Unauthorized("trigger token missing or mismatched".to_string());
        warn!("trigger rejected: {err}");
        Err((StatusCode::UNAUTHORIZED, error_body(&err)))
    }
}

/// Config check that must run before any store access.
fn require_mailer(state: &AppState) -> Result<Arc<dyn Mailer>, HandlerError> {
    state.mailer.clone().ok_or_else(|| {
        let err = DaybookError::Config("mail is not configured (set [mail] api_key)".to_string());
        warn!("{err}");
        (StatusCode::INTERNAL_SERVER_ERROR, error_body(&err))
    })
}

fn dispatch_error(e: DispatchError) -> HandlerError {
    let err = match &e {
        DispatchError::Store(inner) => DaybookError::Store(inner.to_string()),
        DispatchError::Resolve(inner) => DaybookError::Identity(inner.to_string()),
    };
    warn!("dispatch run failed: {err}");
    (StatusCode::INTERNAL_SERVER_ERROR, error_body(&err))
}

pub(crate) fn error_body(err: &DaybookError) -> Json<Value> {
    Json(json!({ "error": err.to_string(), "code": err.code() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(v) = value {
            headers.insert("authorization", HeaderValue::from_str(v).unwrap());
        }
        headers
    }

    #[test]
    fn no_configured_token_runs_open() {
        assert!(check_trigger_auth(None, &headers_with(None)).is_ok());
    }

    #[test]
    fn matching_bearer_token_passes() {
        let headers = headers_with(Some("Bearer sekrit"));
        assert!(check_trigger_auth(Some("sekrit"), &headers).is_ok());
    }

    #[test]
    fn missing_or_wrong_token_is_rejected() {
        for headers in [
            headers_with(None),
            headers_with(Some("Bearer wrong")),
            headers_with(Some("sekrit")), // no Bearer scheme
        ] {
            let err = check_trigger_auth(Some("sekrit"), &headers).unwrap_err();
            assert_eq!(err.0, StatusCode::UNAUTHORIZED);
        }
    }
}
