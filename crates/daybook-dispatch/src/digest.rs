//! Daily activity digest: one summary email per user covering the previous
//! day's habits, tasks, weight, sleep, workouts, and journal.

use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset};
use tracing::{debug, info, warn};

use daybook_core::clock;
use daybook_mailer::{Mailer, OutboundEmail};
use daybook_store::types::ActivitySummary;
use daybook_store::ServiceStore;
use daybook_users::EmailResolver;

use crate::error::Result;
use crate::outcome::DigestOutcome;

/// Run one digest pass summarising the day before `now`.
///
/// Users with no activity rows for that day receive nothing; the rest get a
/// fixed-width table of their numbers. Per-recipient send failures are
/// logged and skipped, same as the reminder jobs.
pub async fn run_daily_digest(
    store: &ServiceStore,
    resolver: &EmailResolver,
    mailer: &dyn Mailer,
    now: DateTime<FixedOffset>,
) -> Result<DigestOutcome> {
    let day = clock::previous_day_stamp(now);
    let summaries = store.activity_summaries(&day)?;
    if summaries.is_empty() {
        debug!(%day, "no activity to digest");
        return Ok(DigestOutcome {
            users_considered: 0,
            sent: 0,
        });
    }

    let user_ids: BTreeSet<String> = summaries.iter().map(|s| s.user_id.clone()).collect();
    let emails = resolver.emails_for(&user_ids).await?;

    let mut sent = 0;
    for summary in &summaries {
        let Some(address) = emails.get(&summary.user_id) else {
            warn!(user_id = %summary.user_id, "no email resolvable; skipping digest");
            continue;
        };
        let email = OutboundEmail {
            from: mailer.sender().to_string(),
            to: vec![address.clone()],
            subject: format!("Your Daybook digest for {day}"),
            html: render_digest(summary),
        };
        match mailer.send(&email).await {
            Ok(()) => {
                info!(user_id = %summary.user_id, %day, "digest sent");
                sent += 1;
            }
            Err(e) => {
                warn!(user_id = %summary.user_id, error = %e, "digest send failed");
            }
        }
    }

    Ok(DigestOutcome {
        users_considered: summaries.len(),
        sent,
    })
}

/// Two-decimal formatting with trailing zeros trimmed
/// ("7.50" becomes "7.5", "72.00" becomes "72").
fn format_number(v: f64) -> String {
    let s = format!("{v:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn render_digest(summary: &ActivitySummary) -> String {
    let weight = summary
        .weight_kg
        .map(|w| format!("{} kg", format_number(w)))
        .unwrap_or_else(|| "-".to_string());
    let sleep = summary
        .sleep_hours
        .map(|h| format!("{} h", format_number(h)))
        .unwrap_or_else(|| "-".to_string());
    let workouts = if summary.workouts > 0 {
        format!("{} ({} min)", summary.workouts, summary.workout_minutes)
    } else {
        "-".to_string()
    };

    let mut lines = Vec::new();
    lines.push(format!("{:<18} {:>14}", "Metric", "Value"));
    lines.push("-".repeat(33));
    lines.push(format!(
        "{:<18} {:>14}",
        "Habits completed",
        summary.habits_done.len()
    ));
    lines.push(format!(
        "{:<18} {:>14}",
        "Tasks completed", summary.tasks_completed
    ));
    lines.push(format!(
        "{:<18} {:>14}",
        "Tasks pending", summary.tasks_pending
    ));
    lines.push(format!("{:<18} {:>14}", "Weight", weight));
    lines.push(format!("{:<18} {:>14}", "Sleep", sleep));
    lines.push(format!("{:<18} {:>14}", "Workouts", workouts));
    lines.push(format!(
        "{:<18} {:>14}",
        "Journal entries", summary.journal_entries
    ));

    let habits_line = if summary.habits_done.is_empty() {
        String::new()
    } else {
        format!("<p>Habits: {}</p>", summary.habits_done.join(", "))
    };

    format!(
        "<p>Here is your activity for {}.</p><pre>{}</pre>{}",
        summary.date,
        lines.join("\n"),
        habits_line
    )
}
