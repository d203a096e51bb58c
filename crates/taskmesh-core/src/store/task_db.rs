//! SQLite-backed task record store.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use super::migrations;
use super::{ScheduleUpdate, TaskStore};
use crate::error::StoreError;
use crate::recurrence::Recurrence;
use crate::task::{Priority, Task};

// === Helper Functions ===

/// Parse priority from database string
fn parse_priority(priority_str: &str) -> Priority {
    match priority_str {
        "high" => Priority::High,
        "low" => Priority::Low,
        _ => Priority::Medium,
    }
}

/// Format priority for database storage
fn format_priority(priority: Priority) -> &'static str {
    priority.as_str()
}

/// Parse an optional RFC3339 timestamp column
fn parse_datetime_opt(dt_str: Option<String>) -> Option<DateTime<Utc>> {
    dt_str
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse datetime from RFC3339 string with fallback to current time
fn parse_datetime_fallback(dt_str: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(dt_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Format an optional timestamp for storage
fn format_datetime_opt(dt: Option<DateTime<Utc>>) -> Option<String> {
    dt.map(|d| d.to_rfc3339())
}

const TASK_COLUMNS: &str = "id, user_id, title, category, priority, completed, archived, \
     scheduled_date, scheduled_end, duration_min, buffer_before_min, buffer_after_min, \
     is_fixed, dependency_ids, recurrence, parent_task_id, next_due_date, created_at";

/// Build a Task from a database row (column order per TASK_COLUMNS)
fn row_to_task(row: &rusqlite::Row) -> Result<Task, rusqlite::Error> {
    let deps_json: String = row.get(13)?;
    let dependency_ids: Vec<String> = serde_json::from_str(&deps_json).unwrap_or_default();
    let recurrence_json: Option<String> = row.get(14)?;
    let recurrence: Option<Recurrence> =
        recurrence_json.and_then(|json| serde_json::from_str(&json).ok());
    let priority_str: String = row.get(4)?;
    let created_at_str: String = row.get(17)?;

    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        category: row.get(3)?,
        priority: parse_priority(&priority_str),
        completed: row.get::<_, i64>(5)? != 0,
        archived: row.get::<_, i64>(6)? != 0,
        scheduled_date: parse_datetime_opt(row.get(7)?),
        scheduled_end: parse_datetime_opt(row.get(8)?),
        duration_min: row.get(9)?,
        buffer_before_min: row.get(10)?,
        buffer_after_min: row.get(11)?,
        is_fixed: row.get::<_, i64>(12)? != 0,
        dependency_ids,
        recurrence,
        parent_task_id: row.get(15)?,
        next_due_date: parse_datetime_opt(row.get(16)?),
        created_at: parse_datetime_fallback(&created_at_str),
    })
}

/// SQLite record store for task records.
pub struct TaskDb {
    conn: Connection,
}

impl TaskDb {
    /// Open (or create) the database under the taskmesh data directory.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let path = super::data_dir()?.join("taskmesh.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }
}

impl TaskStore for TaskDb {
    fn create_task(&self, task: &Task) -> Result<(), StoreError> {
        let deps_json = serde_json::to_string(&task.dependency_ids).unwrap_or_default();
        let recurrence_json = task
            .recurrence
            .as_ref()
            .and_then(|r| serde_json::to_string(r).ok());

        self.conn.execute(
            "INSERT INTO tasks (id, user_id, title, category, priority, completed, archived, \
             scheduled_date, scheduled_end, duration_min, buffer_before_min, buffer_after_min, \
             is_fixed, dependency_ids, recurrence, parent_task_id, next_due_date, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            params![
                task.id,
                task.user_id,
                task.title,
                task.category,
                format_priority(task.priority),
                task.completed as i64,
                task.archived as i64,
                format_datetime_opt(task.scheduled_date),
                format_datetime_opt(task.scheduled_end),
                task.duration_min,
                task.buffer_before_min,
                task.buffer_after_min,
                task.is_fixed as i64,
                deps_json,
                recurrence_json,
                task.parent_task_id,
                format_datetime_opt(task.next_due_date),
                task.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        let task = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                row_to_task,
            )
            .optional()?;
        Ok(task)
    }

    fn update_task(&self, task: &Task) -> Result<(), StoreError> {
        let deps_json = serde_json::to_string(&task.dependency_ids).unwrap_or_default();
        let recurrence_json = task
            .recurrence
            .as_ref()
            .and_then(|r| serde_json::to_string(r).ok());

        self.conn.execute(
            "UPDATE tasks SET user_id = ?2, title = ?3, category = ?4, priority = ?5, \
             completed = ?6, archived = ?7, scheduled_date = ?8, scheduled_end = ?9, \
             duration_min = ?10, buffer_before_min = ?11, buffer_after_min = ?12, \
             is_fixed = ?13, dependency_ids = ?14, recurrence = ?15, parent_task_id = ?16, \
             next_due_date = ?17, created_at = ?18 \
             WHERE id = ?1",
            params![
                task.id,
                task.user_id,
                task.title,
                task.category,
                format_priority(task.priority),
                task.completed as i64,
                task.archived as i64,
                format_datetime_opt(task.scheduled_date),
                format_datetime_opt(task.scheduled_end),
                task.duration_min,
                task.buffer_before_min,
                task.buffer_after_min,
                task.is_fixed as i64,
                deps_json,
                recurrence_json,
                task.parent_task_id,
                format_datetime_opt(task.next_due_date),
                task.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn delete_task(&self, id: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn events_for_user_on_date(
        &self,
        user_id: &str,
        date: DateTime<Utc>,
    ) -> Result<Vec<Task>, StoreError> {
        let (start, end) = super::day_bounds(date);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks \
             WHERE user_id = ?1 AND archived = 0 AND recurrence IS NULL \
               AND scheduled_date IS NOT NULL \
               AND scheduled_date >= ?2 AND scheduled_date < ?3 \
             ORDER BY scheduled_date ASC"
        ))?;
        let tasks = stmt
            .query_map(
                params![user_id, start.to_rfc3339(), end.to_rfc3339()],
                row_to_task,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    fn recurring_parents(&self) -> Result<Vec<Task>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks \
             WHERE recurrence IS NOT NULL AND parent_task_id IS NULL AND archived = 0 \
             ORDER BY created_at ASC"
        ))?;
        let tasks = stmt
            .query_map([], row_to_task)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    fn latest_instance(&self, parent_id: &str) -> Result<Option<Task>, StoreError> {
        let task = self
            .conn
            .query_row(
                &format!(
                    "SELECT {TASK_COLUMNS} FROM tasks \
                     WHERE parent_task_id = ?1 \
                     ORDER BY next_due_date DESC LIMIT 1"
                ),
                params![parent_id],
                row_to_task,
            )
            .optional()?;
        Ok(task)
    }

    fn bulk_update_schedule(
        &self,
        user_id: &str,
        updates: &[ScheduleUpdate],
    ) -> Result<usize, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let mut changed = 0;
        for update in updates {
            changed += tx.execute(
                "UPDATE tasks SET scheduled_date = ?1, scheduled_end = ?2 \
                 WHERE id = ?3 AND user_id = ?4",
                params![
                    format_datetime_opt(update.scheduled_date),
                    format_datetime_opt(update.scheduled_end),
                    update.id,
                    user_id,
                ],
            )?;
        }
        tx.commit()?;
        Ok(changed)
    }
}
