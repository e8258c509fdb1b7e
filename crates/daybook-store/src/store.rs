use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveTime};
use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::error::{Result, StoreError};
use crate::types::{Habit, HabitEntry, JournalEntry, SleepLog, Task, WeightEntry, Workout};

/// Per-user CRUD surface. Every query is filtered by the owning user id, so
/// a caller holding this handle can never read or mutate another user's rows.
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    // ── habits ────────────────────────────────────────────────────────────────

    pub fn add_habit(
        &self,
        user_id: &str,
        name: &str,
        weekly_goal: Option<u32>,
        notify_time: Option<&str>,
    ) -> Result<Habit> {
        if let Some(t) = notify_time {
            validate_notify_time(t)?;
        }
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO habits
             (id, user_id, name, weekly_goal, active, notify_time, created_at, updated_at)
             VALUES (?1,?2,?3,?4,1,?5,?6,?6)",
            rusqlite::params![id, user_id, name, weekly_goal, notify_time, now],
        )?;
        info!(habit_id = %id, user_id, name, "habit created");
        Ok(Habit {
            id,
            user_id: user_id.to_string(),
            name: name.to_string(),
            weekly_goal,
            active: true,
            notify_time: notify_time.map(String::from),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub fn habits_for(&self, user_id: &str) -> Result<Vec<Habit>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM habits WHERE user_id = ?1 ORDER BY created_at",
            db::HABIT_COLS
        ))?;
        let habits = stmt
            .query_map([user_id], db::row_to_habit)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(habits)
    }

    pub fn set_habit_active(&self, user_id: &str, habit_id: &str, active: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        let n = conn.execute(
            "UPDATE habits SET active = ?3, updated_at = ?4
             WHERE id = ?2 AND user_id = ?1",
            rusqlite::params![user_id, habit_id, active as i32, now],
        )?;
        if n == 0 {
            return Err(not_found("habit", habit_id));
        }
        Ok(())
    }

    pub fn set_habit_notify_time(
        &self,
        user_id: &str,
        habit_id: &str,
        notify_time: Option<&str>,
    ) -> Result<()> {
        if let Some(t) = notify_time {
            validate_notify_time(t)?;
        }
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        let n = conn.execute(
            "UPDATE habits SET notify_time = ?3, updated_at = ?4
             WHERE id = ?2 AND user_id = ?1",
            rusqlite::params![user_id, habit_id, notify_time, now],
        )?;
        if n == 0 {
            return Err(not_found("habit", habit_id));
        }
        Ok(())
    }

    pub fn delete_habit(&self, user_id: &str, habit_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "DELETE FROM habits WHERE id = ?2 AND user_id = ?1",
            rusqlite::params![user_id, habit_id],
        )?;
        if n == 0 {
            return Err(not_found("habit", habit_id));
        }
        info!(habit_id, user_id, "habit deleted");
        Ok(())
    }

    /// Log a completion of `habit_id` on `date`. Returns false when that day
    /// was already logged (the UNIQUE constraint makes re-logging a no-op).
    pub fn log_habit_entry(&self, user_id: &str, habit_id: &str, date: &str) -> Result<bool> {
        validate_date(date)?;
        let conn = self.conn.lock().unwrap();
        // The habit must belong to this user before an entry can reference it.
        let owned: i64 = conn.query_row(
            "SELECT COUNT(*) FROM habits WHERE id = ?1 AND user_id = ?2",
            rusqlite::params![habit_id, user_id],
            |row| row.get(0),
        )?;
        if owned == 0 {
            return Err(not_found("habit", habit_id));
        }
        let now = chrono::Utc::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();
        let n = conn.execute(
            "INSERT OR IGNORE INTO habit_entries (id, habit_id, user_id, date, created_at)
             VALUES (?1,?2,?3,?4,?5)",
            rusqlite::params![id, habit_id, user_id, date, now],
        )?;
        Ok(n > 0)
    }

    pub fn habit_entries_between(
        &self,
        user_id: &str,
        from: &str,
        to: &str,
    ) -> Result<Vec<HabitEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM habit_entries
             WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3
             ORDER BY date",
            db::HABIT_ENTRY_COLS
        ))?;
        let entries = stmt
            .query_map(rusqlite::params![user_id, from, to], db::row_to_habit_entry)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(entries)
    }

    /// Completions of one habit within [from, to] — the weekly-goal progress
    /// query when called with a seven-day range.
    pub fn completion_count_between(
        &self,
        user_id: &str,
        habit_id: &str,
        from: &str,
        to: &str,
    ) -> Result<u32> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM habit_entries
             WHERE user_id = ?1 AND habit_id = ?2 AND date BETWEEN ?3 AND ?4",
            rusqlite::params![user_id, habit_id, from, to],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ── tasks ─────────────────────────────────────────────────────────────────

    pub fn add_task(&self, user_id: &str, title: &str, date: &str) -> Result<Task> {
        validate_date(date)?;
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO tasks (id, user_id, title, date, completed, created_at, updated_at)
             VALUES (?1,?2,?3,?4,0,?5,?5)",
            rusqlite::params![id, user_id, title, date, now],
        )?;
        Ok(Task {
            id,
            user_id: user_id.to_string(),
            title: title.to_string(),
            date: date.to_string(),
            completed: false,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub fn tasks_on(&self, user_id: &str, date: &str) -> Result<Vec<Task>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tasks WHERE user_id = ?1 AND date = ?2 ORDER BY created_at",
            db::TASK_COLS
        ))?;
        let tasks = stmt
            .query_map(rusqlite::params![user_id, date], db::row_to_task)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(tasks)
    }

    pub fn set_task_completed(&self, user_id: &str, task_id: &str, completed: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        let n = conn.execute(
            "UPDATE tasks SET completed = ?3, updated_at = ?4
             WHERE id = ?2 AND user_id = ?1",
            rusqlite::params![user_id, task_id, completed as i32, now],
        )?;
        if n == 0 {
            return Err(not_found("task", task_id));
        }
        Ok(())
    }

    pub fn delete_task(&self, user_id: &str, task_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "DELETE FROM tasks WHERE id = ?2 AND user_id = ?1",
            rusqlite::params![user_id, task_id],
        )?;
        if n == 0 {
            return Err(not_found("task", task_id));
        }
        Ok(())
    }

    // ── weight ────────────────────────────────────────────────────────────────

    pub fn add_weight(&self, user_id: &str, date: &str, weight_kg: f64) -> Result<WeightEntry> {
        validate_date(date)?;
        if !(weight_kg.is_finite() && weight_kg > 0.0) {
            return Err(StoreError::InvalidField {
                field: "weight_kg",
                reason: format!("{weight_kg} is not a positive number"),
            });
        }
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO weight_entries (id, user_id, date, weight_kg, created_at)
             VALUES (?1,?2,?3,?4,?5)",
            rusqlite::params![id, user_id, date, weight_kg, now],
        )?;
        Ok(WeightEntry {
            id,
            user_id: user_id.to_string(),
            date: date.to_string(),
            weight_kg,
            created_at: now,
        })
    }

    pub fn weights_between(&self, user_id: &str, from: &str, to: &str) -> Result<Vec<WeightEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM weight_entries
             WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3
             ORDER BY date, created_at",
            db::WEIGHT_COLS
        ))?;
        let entries = stmt
            .query_map(rusqlite::params![user_id, from, to], db::row_to_weight)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(entries)
    }

    pub fn delete_weight(&self, user_id: &str, entry_id: &str) -> Result<()> {
        self.delete_scoped("weight_entries", "weight entry", user_id, entry_id)
    }

    // ── sleep ─────────────────────────────────────────────────────────────────

    pub fn add_sleep(
        &self,
        user_id: &str,
        date: &str,
        hours: f64,
        quality: Option<&str>,
    ) -> Result<SleepLog> {
        validate_date(date)?;
        if !(hours.is_finite() && (0.0..=24.0).contains(&hours)) {
            return Err(StoreError::InvalidField {
                field: "hours",
                reason: format!("{hours} is not within 0-24"),
            });
        }
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO sleep_logs (id, user_id, date, hours, quality, created_at)
             VALUES (?1,?2,?3,?4,?5,?6)",
            rusqlite::params![id, user_id, date, hours, quality, now],
        )?;
        Ok(SleepLog {
            id,
            user_id: user_id.to_string(),
            date: date.to_string(),
            hours,
            quality: quality.map(String::from),
            created_at: now,
        })
    }

    pub fn sleep_between(&self, user_id: &str, from: &str, to: &str) -> Result<Vec<SleepLog>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sleep_logs
             WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3
             ORDER BY date, created_at",
            db::SLEEP_COLS
        ))?;
        let logs = stmt
            .query_map(rusqlite::params![user_id, from, to], db::row_to_sleep)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(logs)
    }

    pub fn delete_sleep(&self, user_id: &str, log_id: &str) -> Result<()> {
        self.delete_scoped("sleep_logs", "sleep log", user_id, log_id)
    }

    // ── workouts ──────────────────────────────────────────────────────────────

    pub fn add_workout(
        &self,
        user_id: &str,
        date: &str,
        kind: &str,
        duration_min: u32,
        notes: Option<&str>,
    ) -> Result<Workout> {
        validate_date(date)?;
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO workouts (id, user_id, date, kind, duration_min, notes, created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7)",
            rusqlite::params![id, user_id, date, kind, duration_min, notes, now],
        )?;
        Ok(Workout {
            id,
            user_id: user_id.to_string(),
            date: date.to_string(),
            kind: kind.to_string(),
            duration_min,
            notes: notes.map(String::from),
            created_at: now,
        })
    }

    pub fn workouts_between(&self, user_id: &str, from: &str, to: &str) -> Result<Vec<Workout>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM workouts
             WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3
             ORDER BY date, created_at",
            db::WORKOUT_COLS
        ))?;
        let workouts = stmt
            .query_map(rusqlite::params![user_id, from, to], db::row_to_workout)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(workouts)
    }

    pub fn delete_workout(&self, user_id: &str, workout_id: &str) -> Result<()> {
        self.delete_scoped("workouts", "workout", user_id, workout_id)
    }

    // ── journal ───────────────────────────────────────────────────────────────

    pub fn add_journal(&self, user_id: &str, date: &str, content: &str) -> Result<JournalEntry> {
        validate_date(date)?;
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO journal_entries (id, user_id, date, content, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?5)",
            rusqlite::params![id, user_id, date, content, now],
        )?;
        Ok(JournalEntry {
            id,
            user_id: user_id.to_string(),
            date: date.to_string(),
            content: content.to_string(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub fn journal_between(
        &self,
        user_id: &str,
        from: &str,
        to: &str,
    ) -> Result<Vec<JournalEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM journal_entries
             WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3
             ORDER BY date, created_at",
            db::JOURNAL_COLS
        ))?;
        let entries = stmt
            .query_map(rusqlite::params![user_id, from, to], db::row_to_journal)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(entries)
    }

    pub fn delete_journal(&self, user_id: &str, entry_id: &str) -> Result<()> {
        self.delete_scoped("journal_entries", "journal entry", user_id, entry_id)
    }

    // ── helpers ───────────────────────────────────────────────────────────────

    fn delete_scoped(
        &self,
        table: &str,
        entity: &'static str,
        user_id: &str,
        id: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            &format!("DELETE FROM {table} WHERE id = ?2 AND user_id = ?1"),
            rusqlite::params![user_id, id],
        )?;
        if n == 0 {
            return Err(not_found(entity, id));
        }
        Ok(())
    }
}

fn not_found(entity: &'static str, id: &str) -> StoreError {
    StoreError::NotFound {
        entity,
        id: id.to_string(),
    }
}

/// Notify times are "HH:MM", matching the minute stamp the dispatch job
/// compares against. Seconds are not representable.
pub(crate) fn validate_notify_time(value: &str) -> Result<()> {
    if value.len() == 5 && NaiveTime::parse_from_str(value, "%H:%M").is_ok() {
        Ok(())
    } else {
        Err(StoreError::InvalidField {
            field: "notify_time",
            reason: format!("{value:?} is not of the form HH:MM"),
        })
    }
}

pub(crate) fn validate_date(value: &str) -> Result<()> {
    if value.len() == 10 && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
        Ok(())
    } else {
        Err(StoreError::InvalidField {
            field: "date",
            reason: format!("{value:?} is not of the form YYYY-MM-DD"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceStore;

    fn shared_conn() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
        db::init_db(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    fn store_with_users(users: &[&str]) -> (Store, ServiceStore) {
        let conn = shared_conn();
        let service = ServiceStore::new(Arc::clone(&conn));
        for u in users {
            service.create_profile_if_absent(u).unwrap();
        }
        (Store::new(conn), service)
    }

    #[test]
    fn habit_crud_roundtrip() {
        let (store, _) = store_with_users(&["u1"]);
        let habit = store
            .add_habit("u1", "Meditate", Some(5), Some("14:00"))
            .unwrap();
        assert!(habit.active);

        let habits = store.habits_for("u1").unwrap();
        assert_eq!(habits.len(), 1);
        assert_eq!(habits[0].notify_time.as_deref(), Some("14:00"));

        store.set_habit_active("u1", &habit.id, false).unwrap();
        assert!(!store.habits_for("u1").unwrap()[0].active);

        store
            .set_habit_notify_time("u1", &habit.id, Some("09:30"))
            .unwrap();
        assert_eq!(
            store.habits_for("u1").unwrap()[0].notify_time.as_deref(),
            Some("09:30")
        );

        store.delete_habit("u1", &habit.id).unwrap();
        assert!(store.habits_for("u1").unwrap().is_empty());
    }

    #[test]
    fn habit_updates_are_scoped_to_owner() {
        let (store, _) = store_with_users(&["u1", "u2"]);
        let habit = store.add_habit("u1", "Read", None, None).unwrap();

        let err = store.set_habit_active("u2", &habit.id, false).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "habit", .. }));
        // The owner's row is untouched.
        assert!(store.habits_for("u1").unwrap()[0].active);
    }

    #[test]
    fn bad_notify_time_is_rejected() {
        let (store, _) = store_with_users(&["u1"]);
        for bad in ["1400", "14:00:00", "25:00", "14:60", "2pm"] {
            let err = store.add_habit("u1", "X", None, Some(bad)).unwrap_err();
            assert!(
                matches!(err, StoreError::InvalidField { field: "notify_time", .. }),
                "expected rejection for {bad:?}"
            );
        }
    }

    #[test]
    fn relogging_a_habit_entry_is_a_noop() {
        let (store, _) = store_with_users(&["u1"]);
        let habit = store.add_habit("u1", "Run", None, None).unwrap();

        assert!(store.log_habit_entry("u1", &habit.id, "2026-03-14").unwrap());
        assert!(!store.log_habit_entry("u1", &habit.id, "2026-03-14").unwrap());

        let entries = store
            .habit_entries_between("u1", "2026-03-01", "2026-03-31")
            .unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn logging_against_another_users_habit_fails() {
        let (store, _) = store_with_users(&["u1", "u2"]);
        let habit = store.add_habit("u1", "Run", None, None).unwrap();
        let err = store
            .log_habit_entry("u2", &habit.id, "2026-03-14")
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn completion_count_covers_a_week() {
        let (store, _) = store_with_users(&["u1"]);
        let habit = store.add_habit("u1", "Run", Some(3), None).unwrap();
        for d in ["2026-03-09", "2026-03-11", "2026-03-13", "2026-03-20"] {
            store.log_habit_entry("u1", &habit.id, d).unwrap();
        }
        let count = store
            .completion_count_between("u1", &habit.id, "2026-03-09", "2026-03-15")
            .unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn task_crud_and_scoping() {
        let (store, _) = store_with_users(&["u1", "u2"]);
        let task = store.add_task("u1", "Buy milk", "2026-03-14").unwrap();
        assert!(!task.completed);

        store.set_task_completed("u1", &task.id, true).unwrap();
        assert!(store.tasks_on("u1", "2026-03-14").unwrap()[0].completed);

        let err = store.delete_task("u2", &task.id).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "task", .. }));
        store.delete_task("u1", &task.id).unwrap();
        assert!(store.tasks_on("u1", "2026-03-14").unwrap().is_empty());
    }

    #[test]
    fn bad_date_is_rejected() {
        let (store, _) = store_with_users(&["u1"]);
        let err = store.add_task("u1", "X", "14-03-2026").unwrap_err();
        assert!(matches!(err, StoreError::InvalidField { field: "date", .. }));
    }

    #[test]
    fn weight_sleep_workout_journal_roundtrip() {
        let (store, _) = store_with_users(&["u1"]);

        let w = store.add_weight("u1", "2026-03-14", 72.5).unwrap();
        let s = store
            .add_sleep("u1", "2026-03-14", 7.5, Some("good"))
            .unwrap();
        let k = store
            .add_workout("u1", "2026-03-14", "run", 45, None)
            .unwrap();
        let j = store.add_journal("u1", "2026-03-14", "Fine day.").unwrap();

        assert_eq!(
            store
                .weights_between("u1", "2026-03-01", "2026-03-31")
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            store.sleep_between("u1", "2026-03-01", "2026-03-31").unwrap()[0]
                .quality
                .as_deref(),
            Some("good")
        );
        assert_eq!(
            store
                .workouts_between("u1", "2026-03-01", "2026-03-31")
                .unwrap()[0]
                .duration_min,
            45
        );
        assert_eq!(
            store
                .journal_between("u1", "2026-03-01", "2026-03-31")
                .unwrap()[0]
                .content,
            "Fine day."
        );

        store.delete_weight("u1", &w.id).unwrap();
        store.delete_sleep("u1", &s.id).unwrap();
        store.delete_workout("u1", &k.id).unwrap();
        store.delete_journal("u1", &j.id).unwrap();
        assert!(store
            .weights_between("u1", "2026-03-01", "2026-03-31")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn invalid_measurements_are_rejected() {
        let (store, _) = store_with_users(&["u1"]);
        assert!(store.add_weight("u1", "2026-03-14", -3.0).is_err());
        assert!(store.add_sleep("u1", "2026-03-14", 30.0, None).is_err());
    }

    #[test]
    fn deleting_a_profile_cascades_to_owned_rows() {
        let (store, service) = store_with_users(&["u1"]);
        let habit = store.add_habit("u1", "Run", None, None).unwrap();
        store.log_habit_entry("u1", &habit.id, "2026-03-14").unwrap();
        store.add_task("u1", "Buy milk", "2026-03-14").unwrap();
        store.add_weight("u1", "2026-03-14", 72.0).unwrap();

        service.delete_profile("u1").unwrap();

        assert!(store.habits_for("u1").unwrap().is_empty());
        assert!(store.tasks_on("u1", "2026-03-14").unwrap().is_empty());
        assert!(store
            .weights_between("u1", "2026-03-01", "2026-03-31")
            .unwrap()
            .is_empty());
    }
}
