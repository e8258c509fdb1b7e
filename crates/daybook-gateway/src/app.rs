use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use daybook_core::config::DaybookConfig;
use daybook_mailer::Mailer;
use daybook_store::ServiceStore;
use daybook_users::EmailResolver;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: DaybookConfig,
    pub store: Arc<ServiceStore>,
    pub resolver: EmailResolver,
    /// None when [mail] is not configured; job triggers then report a
    /// configuration error before touching the store.
    pub mailer: Option<Arc<dyn Mailer>>,
}

impl AppState {
    pub fn new(
        config: DaybookConfig,
        store: Arc<ServiceStore>,
        resolver: EmailResolver,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Self {
        Self {
            config,
            store,
            resolver,
            mailer,
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route(
            "/jobs/habit-reminders",
            post(crate::http::jobs::habit_reminders_handler),
        )
        .route(
            "/jobs/task-reminders",
            post(crate::http::jobs::task_reminders_handler),
        )
        .route(
            "/jobs/daily-digest",
            post(crate::http::jobs::daily_digest_handler),
        )
        .route(
            "/profiles/email",
            post(crate::http::profiles::upsert_email_handler),
        )
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
