//! Built-in clock driver.
//!
//! Deployments normally fire the jobs with an external scheduler over HTTP;
//! `[scheduler] internal = true` runs them in-process instead for
//! single-box setups. The driver observes minute boundaries and invokes the
//! habit job every minute and the task job on the same cadence (it
//! self-guards to top-of-hour); the digest fires when the configured time
//! matches. A tick that lands after a skipped minute does not backfill it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Timelike;
use tokio::sync::watch;
use tracing::{error, info, warn};

use daybook_core::clock;
use daybook_dispatch::{run_daily_digest, run_habit_reminders, run_task_reminders};

use crate::app::AppState;

/// Drive the dispatch jobs until `shutdown` broadcasts `true`.
pub async fn run(state: Arc<AppState>, mut shutdown: watch::Receiver<bool>) {
    let Some(mailer) = state.mailer.clone() else {
        warn!("internal clock enabled but mail is not configured; driver not started");
        return;
    };
    info!("internal clock driver started");

    let mut interval = tokio::time::interval(Duration::from_secs(15));
    let mut last_fired = String::new();
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = clock::reference_now();
                let stamp = now.format("%Y-%m-%d %H:%M").to_string();
                if stamp == last_fired {
                    continue;
                }
                last_fired = stamp;

                if let Err(e) =
                    run_habit_reminders(state.store.as_ref(), &state.resolver, mailer.as_ref(), now).await
                {
                    error!(job = "habit-reminders", "run failed: {e}");
                }
                if let Err(e) =
                    run_task_reminders(state.store.as_ref(), &state.resolver, mailer.as_ref(), now).await
                {
                    error!(job = "task-reminders", "run failed: {e}");
                }

                let sched = &state.config.scheduler;
                if now.hour() == u32::from(sched.digest_hour)
                    && now.minute() == u32::from(sched.digest_minute)
                {
                    match run_daily_digest(state.store.as_ref(), &state.resolver, mailer.as_ref(), now).await {
                        Ok(outcome) => info!(job = "daily-digest", sent = outcome.sent, "digest run complete"),
                        Err(e) => error!(job = "daily-digest", "run failed: {e}"),
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("clock driver shutting down");
                    break;
                }
            }
        }
    }
}
