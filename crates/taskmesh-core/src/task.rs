//! Task record types.
//!
//! A [`Task`] is the unit the scheduling engine operates on. Recurring
//! parents carry a [`Recurrence`](crate::recurrence::Recurrence) rule and are
//! never scheduled themselves; generated instances reference the parent via
//! `parent_task_id` and are ordinary schedulable events thereafter.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::recurrence::Recurrence;

/// Default event duration when no explicit end is set (minutes).
pub const DEFAULT_DURATION_MIN: i64 = 30;
/// Default minimum gap required before/after an event (minutes).
pub const DEFAULT_BUFFER_MIN: i64 = 5;

/// Task priority used as a tie-break input to rescheduling costs.
///
/// Ordering is `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// A task record.
///
/// Scheduling fields (`scheduled_date`, `scheduled_end`, duration and
/// buffers) drive conflict detection; recurrence fields exist only on
/// parent/template records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Task title
    pub title: String,
    /// Optional free-form category
    pub category: Option<String>,
    /// Priority (tie-break input for rescheduling)
    pub priority: Priority,
    /// Whether the task is completed
    pub completed: bool,
    /// Archived tasks are invisible to the day loader
    pub archived: bool,
    /// Scheduled start instant
    pub scheduled_date: Option<DateTime<Utc>>,
    /// Scheduled end instant; if absent the effective end is
    /// `scheduled_date + duration_min`
    pub scheduled_end: Option<DateTime<Utc>>,
    /// Duration in minutes (must be positive)
    pub duration_min: i64,
    /// Minimum gap required before this event (minutes, non-negative)
    pub buffer_before_min: i64,
    /// Minimum gap required after this event (minutes, non-negative)
    pub buffer_after_min: i64,
    /// Fixed events are never moved by the rescheduling proposer
    pub is_fixed: bool,
    /// Events that must end before this one starts
    #[serde(default)]
    pub dependency_ids: Vec<String>,
    /// Recurrence rule; present only on parent/template records
    pub recurrence: Option<Recurrence>,
    /// Back-reference from a generated instance to its parent
    pub parent_task_id: Option<String>,
    /// Computed due date of a generated instance
    pub next_due_date: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a new task with default duration, buffers, and priority.
    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            title: title.into(),
            category: None,
            priority: Priority::default(),
            completed: false,
            archived: false,
            scheduled_date: None,
            scheduled_end: None,
            duration_min: DEFAULT_DURATION_MIN,
            buffer_before_min: DEFAULT_BUFFER_MIN,
            buffer_after_min: DEFAULT_BUFFER_MIN,
            is_fixed: false,
            dependency_ids: Vec::new(),
            recurrence: None,
            parent_task_id: None,
            next_due_date: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_schedule(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.scheduled_date = Some(start);
        self.scheduled_end = Some(end);
        self
    }

    pub fn with_duration(mut self, minutes: i64) -> Self {
        self.duration_min = minutes;
        self
    }

    pub fn with_buffers(mut self, before_min: i64, after_min: i64) -> Self {
        self.buffer_before_min = before_min;
        self.buffer_after_min = after_min;
        self
    }

    pub fn fixed(mut self) -> Self {
        self.is_fixed = true;
        self
    }

    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    /// Whether this record is a recurring parent/template.
    ///
    /// Parents are never schedulable occurrences themselves.
    pub fn is_recurring_parent(&self) -> bool {
        self.recurrence.is_some() && self.parent_task_id.is_none()
    }

    /// End instant used for conflict checks: `scheduled_end` if present,
    /// else `scheduled_date + duration_min`.
    pub fn effective_end(&self) -> Option<DateTime<Utc>> {
        self.scheduled_end
            .or_else(|| self.scheduled_date.map(|s| s + Duration::minutes(self.duration_min)))
    }

    /// Check structural invariants on durations, buffers, and recurrence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.duration_min <= 0 {
            return Err(ValidationError::InvalidValue {
                field: "duration_min".to_string(),
                message: format!("must be positive, got {}", self.duration_min),
            });
        }
        if self.buffer_before_min < 0 || self.buffer_after_min < 0 {
            return Err(ValidationError::InvalidValue {
                field: "buffer_min".to_string(),
                message: "buffers must be non-negative".to_string(),
            });
        }
        if let (Some(start), Some(end)) = (self.scheduled_date, self.scheduled_end) {
            if end <= start {
                return Err(ValidationError::InvalidTimeRange { start, end });
            }
        }
        if let Some(rec) = &self.recurrence {
            rec.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }

    #[test]
    fn test_effective_end_falls_back_to_duration() {
        let start = Utc::now();
        let mut task = Task::new("u1", "Write report").with_duration(45);
        task.scheduled_date = Some(start);

        assert_eq!(task.effective_end(), Some(start + Duration::minutes(45)));

        task.scheduled_end = Some(start + Duration::minutes(90));
        assert_eq!(task.effective_end(), Some(start + Duration::minutes(90)));
    }

    #[test]
    fn test_validate_rejects_bad_duration() {
        let task = Task::new("u1", "Broken").with_duration(0);
        assert!(task.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let start = Utc::now();
        let task = Task::new("u1", "Backwards").with_schedule(start, start - Duration::minutes(10));
        assert!(task.validate().is_err());
    }
}
