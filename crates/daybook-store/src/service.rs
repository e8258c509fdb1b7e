use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::db;
use crate::error::{Result, StoreError};
use crate::types::{ActivitySummary, Habit, Task};

/// Elevated query surface used by the dispatch jobs and the gateway.
///
/// Queries here are not scoped to a single user — the filter predicates each
/// method applies are the only access boundary, so nothing beyond what a
/// method legitimately returns may be read or sent.
pub struct ServiceStore {
    conn: Arc<Mutex<Connection>>,
}

impl ServiceStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    // ── profiles ──────────────────────────────────────────────────────────────

    /// Create an empty profile row for a newly registered user. Idempotent.
    pub fn create_profile_if_absent(&self, user_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT OR IGNORE INTO profiles (id, email, created_at, updated_at)
             VALUES (?1, NULL, ?2, ?2)",
            rusqlite::params![user_id, now],
        )?;
        Ok(())
    }

    /// The sign-in upsert path: cache the user's email on their profile row,
    /// creating the row if the registration hook never ran.
    pub fn upsert_profile_email(&self, user_id: &str, email: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO profiles (id, email, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(id) DO UPDATE SET
                 email = excluded.email,
                 updated_at = excluded.updated_at",
            rusqlite::params![user_id, email, now],
        )?;
        info!(user_id, "profile email cached");
        Ok(())
    }

    /// Cached email for one user. None covers both "no profile row" and
    /// "profile without an email" — callers treat them identically.
    pub fn profile_email(&self, user_id: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let email: Option<Option<String>> = conn
            .query_row(
                "SELECT email FROM profiles WHERE id = ?1",
                [user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(email.flatten())
    }

    /// Cached emails for a set of users, in one query. Users without a
    /// profile row or without an email are simply absent from the result.
    pub fn profile_emails(&self, user_ids: &BTreeSet<String>) -> Result<HashMap<String, String>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let conn = self.conn.lock().unwrap();
        let placeholders = vec!["?"; user_ids.len()].join(",");
        let mut stmt = conn.prepare(&format!(
            "SELECT id, email FROM profiles
             WHERE email IS NOT NULL AND id IN ({placeholders})"
        ))?;
        let rows = stmt.query_map(rusqlite::params_from_iter(user_ids.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    pub fn profile_ids(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id FROM profiles ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(ids)
    }

    pub fn profile_count(&self) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row("SELECT COUNT(*) FROM profiles", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Remove a user entirely. Owned rows in every table go with the profile
    /// via FK cascade, mirroring the authentication service's user deletion.
    pub fn delete_profile(&self, user_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute("DELETE FROM profiles WHERE id = ?1", [user_id])?;
        if n == 0 {
            return Err(StoreError::NotFound {
                entity: "profile",
                id: user_id.to_string(),
            });
        }
        info!(user_id, "profile deleted (owned rows cascaded)");
        Ok(())
    }

    // ── dispatch queries ──────────────────────────────────────────────────────

    /// Active habits whose notify time equals `minute` ("HH:MM"). The exact
    /// equality is the whole matching contract: a trigger delayed past the
    /// minute boundary misses these habits for the day.
    pub fn due_habits(&self, minute: &str) -> Result<Vec<Habit>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM habits
             WHERE active = 1 AND notify_time = ?1
             ORDER BY user_id, name",
            db::HABIT_COLS
        ))?;
        let habits = stmt
            .query_map([minute], db::row_to_habit)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(habits)
    }

    /// Incomplete tasks dated `date`, across all users.
    pub fn pending_tasks(&self, date: &str) -> Result<Vec<Task>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM tasks
             WHERE date = ?1 AND completed = 0
             ORDER BY user_id, created_at",
            db::TASK_COLS
        ))?;
        let tasks = stmt
            .query_map([date], db::row_to_task)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(tasks)
    }

    /// Per-user digest aggregates for `date`. Users with no activity rows at
    /// all are not represented.
    pub fn activity_summaries(&self, date: &str) -> Result<Vec<ActivitySummary>> {
        let conn = self.conn.lock().unwrap();
        let mut map: BTreeMap<String, ActivitySummary> = BTreeMap::new();

        // Habit completions, with names for the digest body.
        {
            let mut stmt = conn.prepare(
                "SELECT e.user_id, h.name
                 FROM habit_entries e JOIN habits h ON h.id = e.habit_id
                 WHERE e.date = ?1
                 ORDER BY e.user_id, h.name",
            )?;
            let rows = stmt.query_map([date], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for (user_id, name) in rows.filter_map(|r| r.ok()) {
                entry_for(&mut map, &user_id, date).habits_done.push(name);
            }
        }

        // Task counts, split by completion state.
        {
            let mut stmt = conn.prepare(
                "SELECT user_id, completed, COUNT(*)
                 FROM tasks WHERE date = ?1
                 GROUP BY user_id, completed",
            )?;
            let rows = stmt.query_map([date], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i32>(1)? != 0,
                    row.get::<_, u32>(2)?,
                ))
            })?;
            for (user_id, completed, count) in rows.filter_map(|r| r.ok()) {
                let summary = entry_for(&mut map, &user_id, date);
                if completed {
                    summary.tasks_completed = count;
                } else {
                    summary.tasks_pending = count;
                }
            }
        }

        // Latest weight reading of the day wins.
        {
            let mut stmt = conn.prepare(
                "SELECT user_id, weight_kg FROM weight_entries
                 WHERE date = ?1 ORDER BY created_at",
            )?;
            let rows = stmt.query_map([date], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?;
            for (user_id, weight) in rows.filter_map(|r| r.ok()) {
                entry_for(&mut map, &user_id, date).weight_kg = Some(weight);
            }
        }

        // Sleep hours sum (naps plus the main block).
        {
            let mut stmt = conn.prepare(
                "SELECT user_id, SUM(hours) FROM sleep_logs
                 WHERE date = ?1 GROUP BY user_id",
            )?;
            let rows = stmt.query_map([date], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?;
            for (user_id, hours) in rows.filter_map(|r| r.ok()) {
                entry_for(&mut map, &user_id, date).sleep_hours = Some(hours);
            }
        }

        // Workout count and total minutes.
        {
            let mut stmt = conn.prepare(
                "SELECT user_id, COUNT(*), SUM(duration_min) FROM workouts
                 WHERE date = ?1 GROUP BY user_id",
            )?;
            let rows = stmt.query_map([date], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, u32>(2)?,
                ))
            })?;
            for (user_id, count, minutes) in rows.filter_map(|r| r.ok()) {
                let summary = entry_for(&mut map, &user_id, date);
                summary.workouts = count;
                summary.workout_minutes = minutes;
            }
        }

        // Journal entry count.
        {
            let mut stmt = conn.prepare(
                "SELECT user_id, COUNT(*) FROM journal_entries
                 WHERE date = ?1 GROUP BY user_id",
            )?;
            let rows = stmt.query_map([date], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
            })?;
            for (user_id, count) in rows.filter_map(|r| r.ok()) {
                entry_for(&mut map, &user_id, date).journal_entries = count;
            }
        }

        Ok(map.into_values().collect())
    }
}

fn entry_for<'a>(
    map: &'a mut BTreeMap<String, ActivitySummary>,
    user_id: &str,
    date: &str,
) -> &'a mut ActivitySummary {
    map.entry(user_id.to_string())
        .or_insert_with(|| ActivitySummary::empty(user_id, date))
}
