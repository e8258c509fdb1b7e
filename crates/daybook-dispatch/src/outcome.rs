//! Diagnostic result objects returned by the jobs.
//!
//! These serialize directly as the trigger endpoints' JSON responses; no
//! caller consumes them programmatically, they exist for operators reading
//! scheduler logs.

use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitReminderOutcome {
    pub habits_checked: usize,
    pub sent: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskReminderCounts {
    pub users_considered: usize,
    pub pending_tasks: usize,
    pub sent: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// The task job either skips (self-guard) or dispatches with counts.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum TaskReminderOutcome {
    Skipped { skipped: bool, reason: String },
    Dispatched(TaskReminderCounts),
}

impl TaskReminderOutcome {
    pub fn skipped(reason: String) -> Self {
        TaskReminderOutcome::Skipped {
            skipped: true,
            reason,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestOutcome {
    pub users_considered: usize,
    pub sent: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn habit_outcome_uses_camel_case_keys() {
        let value = serde_json::to_value(HabitReminderOutcome {
            habits_checked: 1,
            sent: 1,
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({"habitsChecked": 1, "sent": 1}));
    }

    #[test]
    fn skipped_outcome_is_flat() {
        let value =
            serde_json::to_value(TaskReminderOutcome::skipped("not top of hour".to_string()))
                .unwrap();
        assert_eq!(
            value,
            serde_json::json!({"skipped": true, "reason": "not top of hour"})
        );
    }

    #[test]
    fn note_is_omitted_when_absent() {
        let value = serde_json::to_value(TaskReminderOutcome::Dispatched(TaskReminderCounts {
            users_considered: 2,
            pending_tasks: 3,
            sent: 2,
            note: None,
        }))
        .unwrap();
        assert_eq!(
            value,
            serde_json::json!({"usersConsidered": 2, "pendingTasks": 3, "sent": 2})
        );
    }
}
