//! `daybook-dispatch` — the scheduled reminder batch jobs.
//!
//! # Jobs
//!
//! | Job             | Cadence           | Self-guard                          |
//! |-----------------|-------------------|-------------------------------------|
//! | Habit reminders | every minute      | none (exact-minute match only)      |
//! | Task reminders  | at least hourly   | top-of-hour within 10:00–22:00      |
//! | Daily digest    | once per day      | none (caller picks the time)        |
//!
//! Every job is one sequential pass: query due records, resolve recipient
//! emails (profile cache, then identity provider), send one email per
//! recipient serially. Store and identity failures abort the whole run;
//! a failed send for one recipient is logged and skipped.
//!
//! Jobs are stateless across invocations — no "last sent" marker exists, so
//! a repeat trigger inside the same qualifying minute resends.

pub mod digest;
pub mod error;
pub mod habits;
pub mod outcome;
pub mod tasks;

#[cfg(test)]
mod testutil;

pub use digest::run_daily_digest;
pub use error::{DispatchError, Result};
pub use habits::run_habit_reminders;
pub use outcome::{DigestOutcome, HabitReminderOutcome, TaskReminderCounts, TaskReminderOutcome};
pub use tasks::run_task_reminders;
