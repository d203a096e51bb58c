//! Record store for task records.
//!
//! The engine never owns shared mutable state; every operation reads records
//! fresh through [`TaskStore`] and writes through simple CRUD/batch calls.
//! [`TaskDb`] is the SQLite implementation.

pub mod migrations;
pub mod task_db;

pub use task_db::TaskDb;

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::StoreError;
use crate::task::Task;

/// A single schedule field update within a batch.
///
/// `scheduled_date` / `scheduled_end` are the values to store; `None`
/// clears the column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleUpdate {
    pub id: String,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
}

/// Record-store contract the engine computes against.
pub trait TaskStore {
    fn create_task(&self, task: &Task) -> Result<(), StoreError>;

    fn get_task(&self, id: &str) -> Result<Option<Task>, StoreError>;

    fn update_task(&self, task: &Task) -> Result<(), StoreError>;

    fn delete_task(&self, id: &str) -> Result<(), StoreError>;

    /// Non-archived schedulable events for a user whose `scheduled_date`
    /// falls within `[start_of_day, end_of_day)`, ascending by start.
    /// Recurring parents are never returned.
    fn events_for_user_on_date(
        &self,
        user_id: &str,
        date: DateTime<Utc>,
    ) -> Result<Vec<Task>, StoreError>;

    /// All recurring parent/template records, across users.
    fn recurring_parents(&self) -> Result<Vec<Task>, StoreError>;

    /// The instance of `parent_id` with the latest `next_due_date`.
    fn latest_instance(&self, parent_id: &str) -> Result<Option<Task>, StoreError>;

    /// Batch-update schedule fields, scoped to `user_id`. Updates naming
    /// ids the user does not own are no-ops. Returns the number of
    /// records actually updated.
    fn bulk_update_schedule(
        &self,
        user_id: &str,
        updates: &[ScheduleUpdate],
    ) -> Result<usize, StoreError>;
}

/// `[start_of_day, end_of_day)` window containing `date`, in UTC.
pub fn day_bounds(date: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date
        .with_hour(0)
        .and_then(|d| d.with_minute(0))
        .and_then(|d| d.with_second(0))
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(date);
    (start, start + Duration::days(1))
}

/// Returns `~/.config/taskmesh[-dev]/` based on TASKMESH_ENV.
///
/// Set TASKMESH_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TASKMESH_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("taskmesh-dev")
    } else {
        base_dir.join("taskmesh")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_day_bounds_half_open_window() {
        let date = Utc.with_ymd_and_hms(2026, 4, 2, 14, 30, 12).unwrap();
        let (start, end) = day_bounds(date);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 4, 2, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 4, 3, 0, 0, 0).unwrap());
    }
}
