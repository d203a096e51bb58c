//! Recurring instance generation.
//!
//! Parents are created once and never auto-deleted; child instances are
//! synthesized from the parent's recurrence rule, either immediately on
//! creation or by the periodic [`process_recurring_tasks`] sweep. The sweep
//! is a stateless function driven by an explicit `now` -- hosting code runs
//! it from whatever scheduler primitive it owns, one invocation at a time.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, ValidationError};
use crate::store::TaskStore;
use crate::task::Task;

/// Outcome counts of one recurring-task sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Instances generated this run.
    pub created: usize,
    /// Parents whose recurrence is exhausted (`end_date` passed).
    pub exhausted: usize,
    /// Parents whose latest instance is not yet due.
    pub pending: usize,
    /// Parents skipped because of a storage error.
    pub failed: usize,
}

/// Persist a new recurring parent and generate its first instance.
///
/// The parent record itself is never a schedulable occurrence. If the
/// rule's `end_date` already excludes any occurrence, the parent is still
/// created and no instance is (recurrence exhausted is not an error).
pub fn create_recurring_task(
    store: &dyn TaskStore,
    parent: Task,
    now: DateTime<Utc>,
) -> Result<Task, CoreError> {
    if parent.recurrence.is_none() {
        return Err(ValidationError::NotRecurring(parent.id).into());
    }
    parent.validate()?;
    store.create_task(&parent)?;
    create_next_instance(store, &parent, now)?;
    Ok(parent)
}

/// Generate and persist the next instance of `parent`.
///
/// The evaluator is fed the due date of the parent's most recent instance,
/// defaulting to `now` when none exists yet. Returns `Ok(None)` when the
/// recurrence is exhausted (next occurrence past `end_date`).
pub fn create_next_instance(
    store: &dyn TaskStore,
    parent: &Task,
    now: DateTime<Utc>,
) -> Result<Option<Task>, CoreError> {
    let rule = parent
        .recurrence
        .as_ref()
        .ok_or_else(|| ValidationError::NotRecurring(parent.id.clone()))?;

    let last_due = store
        .latest_instance(&parent.id)?
        .and_then(|child| child.next_due_date)
        .unwrap_or(now);

    let Some(next) = rule.next_due_date(last_due, now) else {
        return Ok(None);
    };
    if rule.end_date.is_some_and(|end| next > end) {
        return Ok(None);
    }

    let mut instance = Task::new(parent.user_id.clone(), parent.title.clone());
    instance.category = parent.category.clone();
    instance.priority = parent.priority;
    instance.duration_min = parent.duration_min;
    instance.buffer_before_min = parent.buffer_before_min;
    instance.buffer_after_min = parent.buffer_after_min;
    instance.is_fixed = parent.is_fixed;
    instance.scheduled_date = Some(next);
    instance.scheduled_end = Some(next + Duration::minutes(parent.duration_min));
    instance.parent_task_id = Some(parent.id.clone());
    instance.next_due_date = Some(next);

    store.create_task(&instance)?;
    debug!(parent_id = %parent.id, due = %next, "generated recurring instance");
    Ok(Some(instance))
}

/// Advance every recurring parent whose latest instance is missing or
/// already overdue.
///
/// A storage failure on one parent is logged and counted; it never aborts
/// the sweep for the others. Only the initial parent listing propagates
/// as an error.
pub fn process_recurring_tasks(
    store: &dyn TaskStore,
    now: DateTime<Utc>,
) -> Result<SweepReport, CoreError> {
    let parents = store.recurring_parents()?;
    let mut report = SweepReport::default();

    for parent in parents {
        let needs_next = match store.latest_instance(&parent.id) {
            Ok(Some(child)) => child.next_due_date.map_or(true, |due| due <= now),
            Ok(None) => true,
            Err(e) => {
                warn!(parent_id = %parent.id, error = %e, "sweep: failed to read latest instance");
                report.failed += 1;
                continue;
            }
        };
        if !needs_next {
            report.pending += 1;
            continue;
        }

        match create_next_instance(store, &parent, now) {
            Ok(Some(_)) => report.created += 1,
            Ok(None) => report.exhausted += 1,
            Err(e) => {
                warn!(parent_id = %parent.id, error = %e, "sweep: failed to generate instance");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::recurrence::{Frequency, Recurrence};
    use crate::store::{ScheduleUpdate, TaskDb};
    use chrono::TimeZone;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, d, h, 0, 0).unwrap()
    }

    fn daily_parent(title: &str) -> Task {
        Task::new("u1", title).with_recurrence(Recurrence::new(Frequency::Daily))
    }

    #[test]
    fn test_create_recurring_task_generates_first_instance() {
        let db = TaskDb::open_memory().unwrap();
        let now = at(2, 9);

        let parent = create_recurring_task(&db, daily_parent("Standup"), now).unwrap();

        let instance = db.latest_instance(&parent.id).unwrap().unwrap();
        assert_eq!(instance.parent_task_id.as_deref(), Some(parent.id.as_str()));
        assert_eq!(instance.next_due_date, Some(at(3, 9)));
        assert_eq!(instance.scheduled_date, Some(at(3, 9)));
        assert!(!instance.completed);
    }

    #[test]
    fn test_non_recurring_template_is_rejected() {
        let db = TaskDb::open_memory().unwrap();
        let plain = Task::new("u1", "One-off");
        assert!(create_recurring_task(&db, plain, at(2, 9)).is_err());
    }

    #[test]
    fn test_end_date_exhausts_recurrence() {
        let db = TaskDb::open_memory().unwrap();
        let now = at(2, 9);
        let parent = Task::new("u1", "Short-lived").with_recurrence(
            Recurrence::new(Frequency::Daily).every(5).until(at(4, 0)),
        );

        let parent = create_recurring_task(&db, parent, now).unwrap();

        // First occurrence would land on day 7, past the end date.
        assert!(db.latest_instance(&parent.id).unwrap().is_none());
        assert!(create_next_instance(&db, &parent, now).unwrap().is_none());
    }

    #[test]
    fn test_instance_due_dates_increase_monotonically() {
        let db = TaskDb::open_memory().unwrap();
        let now = at(2, 9);
        let parent = create_recurring_task(&db, daily_parent("Journal"), now).unwrap();

        let mut last_due = db
            .latest_instance(&parent.id)
            .unwrap()
            .unwrap()
            .next_due_date
            .unwrap();
        for _ in 0..4 {
            let next = create_next_instance(&db, &parent, now).unwrap().unwrap();
            let due = next.next_due_date.unwrap();
            assert!(due > last_due);
            last_due = due;
        }
    }

    #[test]
    fn test_sweep_gates_on_overdue_latest_instance() {
        let db = TaskDb::open_memory().unwrap();
        let created_at = at(2, 9);
        let parent = create_recurring_task(&db, daily_parent("Standup"), created_at).unwrap();

        // Instance due day 3. Not yet due -> nothing happens.
        let report = process_recurring_tasks(&db, created_at).unwrap();
        assert_eq!(report, SweepReport { pending: 1, ..Default::default() });

        // Past the due date the sweep generates exactly one new instance,
        // and running it again without elapsed time adds nothing.
        let later = at(3, 12);
        let report = process_recurring_tasks(&db, later).unwrap();
        assert_eq!(report.created, 1);
        let report = process_recurring_tasks(&db, later).unwrap();
        assert_eq!(report.created, 0);
        assert_eq!(report.pending, 1);
    }

    /// Store wrapper that fails writes for a chosen task title.
    struct FlakyStore {
        inner: TaskDb,
        fail_title: String,
    }

    impl TaskStore for FlakyStore {
        fn create_task(&self, task: &Task) -> Result<(), StoreError> {
            if task.title == self.fail_title {
                return Err(StoreError::QueryFailed("injected failure".to_string()));
            }
            self.inner.create_task(task)
        }
        fn get_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
            self.inner.get_task(id)
        }
        fn update_task(&self, task: &Task) -> Result<(), StoreError> {
            self.inner.update_task(task)
        }
        fn delete_task(&self, id: &str) -> Result<(), StoreError> {
            self.inner.delete_task(id)
        }
        fn events_for_user_on_date(
            &self,
            user_id: &str,
            date: DateTime<Utc>,
        ) -> Result<Vec<Task>, StoreError> {
            self.inner.events_for_user_on_date(user_id, date)
        }
        fn recurring_parents(&self) -> Result<Vec<Task>, StoreError> {
            self.inner.recurring_parents()
        }
        fn latest_instance(&self, parent_id: &str) -> Result<Option<Task>, StoreError> {
            self.inner.latest_instance(parent_id)
        }
        fn bulk_update_schedule(
            &self,
            user_id: &str,
            updates: &[ScheduleUpdate],
        ) -> Result<usize, StoreError> {
            self.inner.bulk_update_schedule(user_id, updates)
        }
    }

    #[test]
    fn test_sweep_tolerates_per_parent_failures() {
        let db = TaskDb::open_memory().unwrap();
        db.create_task(&daily_parent("Doomed")).unwrap();
        db.create_task(&daily_parent("Fine")).unwrap();

        let flaky = FlakyStore {
            inner: db,
            fail_title: "Doomed".to_string(),
        };

        let report = process_recurring_tasks(&flaky, at(2, 9)).unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.created, 1);
    }
}
