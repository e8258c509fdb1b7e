use serde::{Deserialize, Serialize};

/// One row per registered user. Created when the user first appears; `email`
/// is opportunistically cached on sign-in so the dispatch jobs can resolve a
/// recipient without calling the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Equals the authentication service's user id.
    pub id: String,
    pub email: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A tracked habit.
///
/// `notify_time`, when present, is a "HH:MM" wall-clock instant in the
/// reference zone at which a reminder fires daily while `active` is true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub user_id: String,
    pub name: String,
    /// Target completions per week; None means no target.
    pub weekly_goal: Option<u32>,
    pub active: bool,
    pub notify_time: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One completion of a habit on a given day. At most one row per
/// (habit, date) — re-logging the same day is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitEntry {
    pub id: String,
    pub habit_id: String,
    pub user_id: String,
    /// "YYYY-MM-DD" in the reference zone.
    pub date: String,
    pub created_at: String,
}

/// A to-do item at day granularity. Pending iff `completed` is false and
/// `date` is the current reference-zone day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub date: String,
    pub completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightEntry {
    pub id: String,
    pub user_id: String,
    pub date: String,
    pub weight_kg: f64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepLog {
    pub id: String,
    pub user_id: String,
    pub date: String,
    pub hours: f64,
    pub quality: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workout {
    pub id: String,
    pub user_id: String,
    pub date: String,
    /// Free-form kind label, e.g. "run", "gym".
    pub kind: String,
    pub duration_min: u32,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub user_id: String,
    pub date: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

/// One user's aggregated activity for a single day — input to the daily
/// digest job. Only users with at least one activity row get a summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub user_id: String,
    pub date: String,
    /// Names of habits completed that day, alphabetical.
    pub habits_done: Vec<String>,
    pub tasks_completed: u32,
    pub tasks_pending: u32,
    /// Most recently recorded weight that day, if any.
    pub weight_kg: Option<f64>,
    /// Total hours slept that day, if logged.
    pub sleep_hours: Option<f64>,
    pub workouts: u32,
    pub workout_minutes: u32,
    pub journal_entries: u32,
}

impl ActivitySummary {
    pub(crate) fn empty(user_id: &str, date: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            date: date.to_string(),
            habits_done: Vec::new(),
            tasks_completed: 0,
            tasks_pending: 0,
            weight_kg: None,
            sleep_hours: None,
            workouts: 0,
            workout_minutes: 0,
            journal_entries: 0,
        }
    }
}
