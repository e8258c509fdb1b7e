//! Habit reminder dispatch: one email per due habit, once per minute.

use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset};
use tracing::{debug, info, warn};

use daybook_core::clock;
use daybook_mailer::{Mailer, OutboundEmail};
use daybook_store::ServiceStore;
use daybook_users::EmailResolver;

use crate::error::Result;
use crate::outcome::HabitReminderOutcome;

/// Run one habit-reminder pass for the minute containing `now`.
///
/// Matching is exact equality on the "HH:MM" notify time, so a trigger that
/// lands after the minute boundary misses that day's reminder — there is no
/// catch-up, and no dedup guard: a repeat trigger within the same minute
/// resends.
pub async fn run_habit_reminders(
    store: &ServiceStore,
    resolver: &EmailResolver,
    mailer: &dyn Mailer,
    now: DateTime<FixedOffset>,
) -> Result<HabitReminderOutcome> {
    let minute = clock::minute_stamp(now);
    let due = store.due_habits(&minute)?;
    if due.is_empty() {
        // The expected outcome for 1439 of 1440 minutes per habit per day.
        debug!(%minute, "no habits due");
        return Ok(HabitReminderOutcome {
            habits_checked: 0,
            sent: 0,
        });
    }

    let user_ids: BTreeSet<String> = due.iter().map(|h| h.user_id.clone()).collect();
    let emails = resolver.emails_for(&user_ids).await?;

    let mut sent = 0;
    for habit in &due {
        let Some(address) = emails.get(&habit.user_id) else {
            warn!(
                habit = %habit.name,
                user_id = %habit.user_id,
                "no email resolvable; skipping reminder"
            );
            continue;
        };
        let email = OutboundEmail {
            from: mailer.sender().to_string(),
            to: vec![address.clone()],
            subject: format!("Habit reminder: {}", habit.name),
            html: reminder_body(habit.name.as_str(), habit.weekly_goal),
        };
        // One recipient failing must not sink the rest of the batch.
        match mailer.send(&email).await {
            Ok(()) => {
                info!(habit = %habit.name, user_id = %habit.user_id, "habit reminder sent");
                sent += 1;
            }
            Err(e) => {
                warn!(
                    habit = %habit.name,
                    user_id = %habit.user_id,
                    error = %e,
                    "habit reminder send failed"
                );
            }
        }
    }

    Ok(HabitReminderOutcome {
        habits_checked: due.len(),
        sent,
    })
}

fn reminder_body(name: &str, weekly_goal: Option<u32>) -> String {
    let goal_line = match weekly_goal {
        Some(goal) => format!("<p>Weekly target: {goal}x.</p>"),
        None => String::new(),
    };
    format!("<p>It's time for <strong>{name}</strong>. Keep the streak going!</p>{goal_line}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{at, harness, FailingProvider, RecordingMailer, StubProvider};
    use crate::DispatchError;

    #[tokio::test]
    async fn quiet_minute_reports_zero_without_sending() {
        let h = harness();
        h.user_with_email("u1", "u@x.com");
        h.store.add_habit("u1", "Meditate", None, Some("14:00")).unwrap();

        let mailer = RecordingMailer::new();
        let outcome = run_habit_reminders(&h.service, &h.resolver(), &mailer, at(14, 1))
            .await
            .unwrap();

        assert_eq!(outcome.habits_checked, 0);
        assert_eq!(outcome.sent, 0);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn inactive_and_mismatched_habits_never_send() {
        let h = harness();
        h.user_with_email("u1", "u@x.com");
        h.store.add_habit("u1", "Meditate", None, Some("14:00")).unwrap();
        let paused = h.store.add_habit("u1", "Run", None, Some("14:00")).unwrap();
        h.store.set_habit_active("u1", &paused.id, false).unwrap();
        h.store.add_habit("u1", "Journal", None, Some("21:30")).unwrap();

        let mailer = RecordingMailer::new();
        let outcome = run_habit_reminders(&h.service, &h.resolver(), &mailer, at(14, 0))
            .await
            .unwrap();

        assert_eq!(outcome.habits_checked, 1);
        assert_eq!(outcome.sent, 1);
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].subject.contains("Meditate"));
    }

    #[tokio::test]
    async fn matched_minute_sends_to_profile_email() {
        let h = harness();
        h.user_with_email("u1", "u@x.com");
        h.store.add_habit("u1", "Meditate", None, Some("14:00")).unwrap();

        let mailer = RecordingMailer::new();
        let outcome = run_habit_reminders(&h.service, &h.resolver(), &mailer, at(14, 0))
            .await
            .unwrap();

        assert_eq!(outcome.habits_checked, 1);
        assert_eq!(outcome.sent, 1);
        let sent = mailer.sent();
        assert_eq!(sent[0].to, vec!["u@x.com".to_string()]);
        assert_eq!(sent[0].subject, "Habit reminder: Meditate");
    }

    #[tokio::test]
    async fn identity_fallback_covers_missing_profile_email() {
        let h = harness();
        h.user_without_email("u1");
        h.store.add_habit("u1", "Meditate", None, Some("14:00")).unwrap();

        let mailer = RecordingMailer::new();
        let resolver = h.resolver_with(StubProvider::with(&[("u1", "fallback@x.com")]));
        let outcome = run_habit_reminders(&h.service, &resolver, &mailer, at(14, 0))
            .await
            .unwrap();

        assert_eq!(outcome.sent, 1);
        assert_eq!(mailer.sent()[0].to, vec!["fallback@x.com".to_string()]);
    }

    #[tokio::test]
    async fn unresolvable_recipient_reduces_sent_but_succeeds() {
        let h = harness();
        h.user_with_email("u1", "u@x.com");
        h.user_without_email("u2");
        h.store.add_habit("u1", "Meditate", None, Some("14:00")).unwrap();
        h.store.add_habit("u2", "Run", None, Some("14:00")).unwrap();

        let mailer = RecordingMailer::new();
        let outcome = run_habit_reminders(&h.service, &h.resolver(), &mailer, at(14, 0))
            .await
            .unwrap();

        assert_eq!(outcome.habits_checked, 2);
        assert_eq!(outcome.sent, 1);
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn one_failed_send_does_not_abort_the_batch() {
        let h = harness();
        h.user_with_email("u1", "broken@x.com");
        h.user_with_email("u2", "fine@x.com");
        h.store.add_habit("u1", "Meditate", None, Some("14:00")).unwrap();
        h.store.add_habit("u2", "Run", None, Some("14:00")).unwrap();

        let mailer = RecordingMailer::failing_for("broken@x.com");
        let outcome = run_habit_reminders(&h.service, &h.resolver(), &mailer, at(14, 0))
            .await
            .unwrap();

        assert_eq!(outcome.habits_checked, 2);
        assert_eq!(outcome.sent, 1);
        assert_eq!(mailer.sent()[0].to, vec!["fine@x.com".to_string()]);
    }

    #[tokio::test]
    async fn identity_provider_failure_aborts_the_run() {
        let h = harness();
        h.user_without_email("u1");
        h.store.add_habit("u1", "Meditate", None, Some("14:00")).unwrap();

        let mailer = RecordingMailer::new();
        let resolver = h.resolver_with(FailingProvider);
        let err = run_habit_reminders(&h.service, &resolver, &mailer, at(14, 0))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Resolve(_)));
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn repeat_trigger_in_same_minute_resends() {
        let h = harness();
        h.user_with_email("u1", "u@x.com");
        h.store.add_habit("u1", "Meditate", None, Some("14:00")).unwrap();

        let mailer = RecordingMailer::new();
        for _ in 0..2 {
            run_habit_reminders(&h.service, &h.resolver(), &mailer, at(14, 0))
                .await
                .unwrap();
        }
        // Intentionally unguarded: no dedup marker exists between runs.
        assert_eq!(mailer.sent().len(), 2);
    }
}
