//! Task reminder dispatch: one summary email per user with pending tasks,
//! at most once per hour within the daytime window.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, FixedOffset, Timelike};
use tracing::{debug, info, warn};

use daybook_core::clock;
use daybook_mailer::{Mailer, OutboundEmail};
use daybook_store::ServiceStore;
use daybook_users::EmailResolver;

use crate::error::Result;
use crate::outcome::{TaskReminderCounts, TaskReminderOutcome};

/// Hours (inclusive, reference zone) within which task reminders may send.
pub const SEND_WINDOW_START_HOUR: u32 = 10;
pub const SEND_WINDOW_END_HOUR: u32 = 22;

/// Run one task-reminder pass for the instant `now`.
///
/// The job may be triggered on any cadence; it self-restricts to true
/// top-of-hour inside the send window, returning a skipped outcome without
/// touching the store otherwise. That makes it idempotent against external
/// schedulers firing more often than hourly.
pub async fn run_task_reminders(
    store: &ServiceStore,
    resolver: &EmailResolver,
    mailer: &dyn Mailer,
    now: DateTime<FixedOffset>,
) -> Result<TaskReminderOutcome> {
    let (hour, minute) = (now.hour(), now.minute());
    if !(SEND_WINDOW_START_HOUR..=SEND_WINDOW_END_HOUR).contains(&hour) {
        debug!(hour, "task reminders skipped");
        return Ok(TaskReminderOutcome::skipped(format!(
            "hour {hour} is outside the {SEND_WINDOW_START_HOUR}:00-{SEND_WINDOW_END_HOUR}:00 window"
        )));
    }
    if minute != 0 {
        debug!(hour, minute, "task reminders skipped");
        return Ok(TaskReminderOutcome::skipped(format!(
            "minute {minute} is not top of hour"
        )));
    }

    let today = clock::date_stamp(now);
    let pending = store.pending_tasks(&today)?;
    if pending.is_empty() {
        return Ok(TaskReminderOutcome::Dispatched(TaskReminderCounts {
            users_considered: 0,
            pending_tasks: 0,
            sent: 0,
            note: Some("No pending tasks".to_string()),
        }));
    }

    let mut by_user: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for task in &pending {
        by_user
            .entry(task.user_id.clone())
            .or_default()
            .push(task.title.clone());
    }
    for titles in by_user.values_mut() {
        titles.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()));
    }

    let user_ids: BTreeSet<String> = by_user.keys().cloned().collect();
    let emails = resolver.emails_for(&user_ids).await?;

    let mut sent = 0;
    for (user_id, titles) in &by_user {
        let Some(address) = emails.get(user_id) else {
            warn!(user_id = %user_id, "no email resolvable; skipping task reminder");
            continue;
        };
        let email = OutboundEmail {
            from: mailer.sender().to_string(),
            to: vec![address.clone()],
            subject: subject_line(titles.len(), hour),
            html: task_list_body(titles, hour),
        };
        match mailer.send(&email).await {
            Ok(()) => {
                info!(user_id = %user_id, tasks = titles.len(), "task reminder sent");
                sent += 1;
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "task reminder send failed");
            }
        }
    }

    Ok(TaskReminderOutcome::Dispatched(TaskReminderCounts {
        users_considered: by_user.len(),
        pending_tasks: pending.len(),
        sent,
        note: None,
    }))
}

fn subject_line(count: usize, hour: u32) -> String {
    let plural = if count == 1 { "" } else { "s" };
    format!("{count} pending task{plural} ({hour:02}:00 check-in)")
}

fn task_list_body(titles: &[String], hour: u32) -> String {
    let mut items = String::new();
    for title in titles {
        items.push_str(&format!("<li>{title}</li>"));
    }
    let plural = if titles.len() == 1 { "" } else { "s" };
    format!(
        "<p>You have {} pending task{plural} for today (as of {hour:02}:00):</p><ul>{items}</ul>",
        titles.len()
    )
}
