use rusqlite::Connection;

use crate::error::Result;
use crate::types::{Habit, HabitEntry, JournalEntry, SleepLog, Task, WeightEntry, Workout};

/// Initialise all tables for the store. Safe to call on every startup —
/// CREATE IF NOT EXISTS means it's idempotent.
///
/// Callers must have `PRAGMA foreign_keys=ON` set on every connection that
/// writes, or the profile cascade does nothing.
pub fn init_db(conn: &Connection) -> Result<()> {
    create_profiles_table(conn)?;
    create_habits_tables(conn)?;
    create_tasks_table(conn)?;
    create_log_tables(conn)?;
    Ok(())
}

fn create_profiles_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS profiles (
            id         TEXT NOT NULL PRIMARY KEY,  -- authentication service user id
            email      TEXT,                       -- cached on sign-in; NULL until then
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        ) STRICT;",
    )?;
    Ok(())
}

fn create_habits_tables(conn: &Connection) -> Result<()> {
    // idx_habits_notify covers the dispatch hot path:
    // active habits whose notify_time equals the current minute.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS habits (
            id          TEXT    NOT NULL PRIMARY KEY,
            user_id     TEXT    NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            name        TEXT    NOT NULL,
            weekly_goal INTEGER,            -- target completions per week; NULL = none
            active      INTEGER NOT NULL DEFAULT 1,
            notify_time TEXT,               -- 'HH:MM' reference zone; NULL = no reminder
            created_at  TEXT    NOT NULL,
            updated_at  TEXT    NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_habits_notify ON habits (active, notify_time);
        CREATE INDEX IF NOT EXISTS idx_habits_user ON habits (user_id);

        CREATE TABLE IF NOT EXISTS habit_entries (
            id         TEXT NOT NULL PRIMARY KEY,
            habit_id   TEXT NOT NULL REFERENCES habits(id) ON DELETE CASCADE,
            user_id    TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            date       TEXT NOT NULL,       -- 'YYYY-MM-DD'
            created_at TEXT NOT NULL,
            UNIQUE (habit_id, date)         -- one completion per habit per day
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_habit_entries_day ON habit_entries (date);
        CREATE INDEX IF NOT EXISTS idx_habit_entries_user ON habit_entries (user_id, date);",
    )?;
    Ok(())
}

fn create_tasks_table(conn: &Connection) -> Result<()> {
    // idx_tasks_due covers the dispatch hot path: pending tasks for today.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS tasks (
            id         TEXT    NOT NULL PRIMARY KEY,
            user_id    TEXT    NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            title      TEXT    NOT NULL,
            date       TEXT    NOT NULL,    -- 'YYYY-MM-DD', day granularity
            completed  INTEGER NOT NULL DEFAULT 0,
            created_at TEXT    NOT NULL,
            updated_at TEXT    NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_tasks_due ON tasks (date, completed);
        CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks (user_id, date);",
    )?;
    Ok(())
}

fn create_log_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS weight_entries (
            id         TEXT NOT NULL PRIMARY KEY,
            user_id    TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            date       TEXT NOT NULL,
            weight_kg  REAL NOT NULL,
            created_at TEXT NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_weight_user ON weight_entries (user_id, date);
        CREATE INDEX IF NOT EXISTS idx_weight_day ON weight_entries (date);

        CREATE TABLE IF NOT EXISTS sleep_logs (
            id         TEXT NOT NULL PRIMARY KEY,
            user_id    TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            date       TEXT NOT NULL,
            hours      REAL NOT NULL,
            quality    TEXT,
            created_at TEXT NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_sleep_user ON sleep_logs (user_id, date);
        CREATE INDEX IF NOT EXISTS idx_sleep_day ON sleep_logs (date);

        CREATE TABLE IF NOT EXISTS workouts (
            id           TEXT    NOT NULL PRIMARY KEY,
            user_id      TEXT    NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            date         TEXT    NOT NULL,
            kind         TEXT    NOT NULL,
            duration_min INTEGER NOT NULL,
            notes        TEXT,
            created_at   TEXT    NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_workouts_user ON workouts (user_id, date);
        CREATE INDEX IF NOT EXISTS idx_workouts_day ON workouts (date);

        CREATE TABLE IF NOT EXISTS journal_entries (
            id         TEXT NOT NULL PRIMARY KEY,
            user_id    TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            date       TEXT NOT NULL,
            content    TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_journal_user ON journal_entries (user_id, date);
        CREATE INDEX IF NOT EXISTS idx_journal_day ON journal_entries (date);",
    )?;
    Ok(())
}

// Column lists and row mappers are centralised here so every query in this
// crate stays consistent (same pattern for both store handles).

pub(crate) const HABIT_COLS: &str =
    "id, user_id, name, weekly_goal, active, notify_time, created_at, updated_at";

pub(crate) fn row_to_habit(row: &rusqlite::Row<'_>) -> rusqlite::Result<Habit> {
    Ok(Habit {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        weekly_goal: row.get(3)?,
        active: row.get::<_, i32>(4)? != 0,
        notify_time: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub(crate) const HABIT_ENTRY_COLS: &str = "id, habit_id, user_id, date, created_at";

pub(crate) fn row_to_habit_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<HabitEntry> {
    Ok(HabitEntry {
        id: row.get(0)?,
        habit_id: row.get(1)?,
        user_id: row.get(2)?,
        date: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub(crate) const TASK_COLS: &str = "id, user_id, title, date, completed, created_at, updated_at";

pub(crate) fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        date: row.get(3)?,
        completed: row.get::<_, i32>(4)? != 0,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub(crate) const WEIGHT_COLS: &str = "id, user_id, date, weight_kg, created_at";

pub(crate) fn row_to_weight(row: &rusqlite::Row<'_>) -> rusqlite::Result<WeightEntry> {
    Ok(WeightEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        date: row.get(2)?,
        weight_kg: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub(crate) const SLEEP_COLS: &str = "id, user_id, date, hours, quality, created_at";

pub(crate) fn row_to_sleep(row: &rusqlite::Row<'_>) -> rusqlite::Result<SleepLog> {
    Ok(SleepLog {
        id: row.get(0)?,
        user_id: row.get(1)?,
        date: row.get(2)?,
        hours: row.get(3)?,
        quality: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub(crate) const WORKOUT_COLS: &str = "id, user_id, date, kind, duration_min, notes, created_at";

pub(crate) fn row_to_workout(row: &rusqlite::Row<'_>) -> rusqlite::Result<Workout> {
    Ok(Workout {
        id: row.get(0)?,
        user_id: row.get(1)?,
        date: row.get(2)?,
        kind: row.get(3)?,
        duration_min: row.get(4)?,
        notes: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub(crate) const JOURNAL_COLS: &str = "id, user_id, date, content, created_at, updated_at";

pub(crate) fn row_to_journal(row: &rusqlite::Row<'_>) -> rusqlite::Result<JournalEntry> {
    Ok(JournalEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        date: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}
