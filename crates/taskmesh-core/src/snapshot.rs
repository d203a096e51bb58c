//! Day schedule snapshot and restore.
//!
//! A coarse undo mechanism: capture a day's schedule fields before applying
//! a proposal, restore them if the caller regrets it. Snapshots live in
//! memory for the session only -- this is not a durable versioned log.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::{CoreError, ValidationError};
use crate::store::{ScheduleUpdate, TaskStore};

struct DaySnapshot {
    user_id: String,
    entries: Vec<ScheduleUpdate>,
}

/// In-memory registry of day snapshots, keyed by opaque snapshot id.
#[derive(Default)]
pub struct SnapshotRegistry {
    snapshots: HashMap<String, DaySnapshot>,
}

impl SnapshotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the schedule fields of a user's events on `date`.
    ///
    /// Returns the snapshot id to pass to [`restore_day`](Self::restore_day).
    pub fn snapshot_day(
        &mut self,
        store: &dyn TaskStore,
        user_id: &str,
        date: DateTime<Utc>,
    ) -> Result<String, CoreError> {
        let events = store.events_for_user_on_date(user_id, date)?;
        let entries = events
            .iter()
            .map(|task| ScheduleUpdate {
                id: task.id.clone(),
                scheduled_date: task.scheduled_date,
                scheduled_end: task.scheduled_end,
            })
            .collect();

        let id = uuid::Uuid::new_v4().to_string();
        self.snapshots.insert(
            id.clone(),
            DaySnapshot {
                user_id: user_id.to_string(),
                entries,
            },
        );
        Ok(id)
    }

    /// Write a snapshot's schedule fields back to the store.
    ///
    /// The snapshot is consumed on success (single-use undo). Returns the
    /// number of records restored; events created after the snapshot was
    /// taken are left untouched.
    pub fn restore_day(
        &mut self,
        store: &dyn TaskStore,
        user_id: &str,
        snapshot_id: &str,
    ) -> Result<usize, CoreError> {
        let snapshot = self
            .snapshots
            .get(snapshot_id)
            .ok_or_else(|| ValidationError::UnknownSnapshot(snapshot_id.to_string()))?;
        if snapshot.user_id != user_id {
            return Err(ValidationError::SnapshotUserMismatch {
                id: snapshot_id.to_string(),
                user_id: user_id.to_string(),
            }
            .into());
        }

        let restored = store.bulk_update_schedule(user_id, &snapshot.entries)?;
        self.snapshots.remove(snapshot_id);
        Ok(restored)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reschedule::{apply_rescheduling, TimeChange};
    use crate::store::TaskDb;
    use crate::task::Task;
    use chrono::TimeZone;

    fn at(h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 2, h, min, 0).unwrap()
    }

    #[test]
    fn test_snapshot_and_restore_round_trip() {
        let db = TaskDb::open_memory().unwrap();
        let task = Task::new("u1", "Review").with_schedule(at(9, 0), at(10, 0));
        db.create_task(&task).unwrap();

        let mut registry = SnapshotRegistry::new();
        let snapshot_id = registry.snapshot_day(&db, "u1", at(12, 0)).unwrap();

        apply_rescheduling(
            &db,
            "u1",
            &[TimeChange {
                id: task.id.clone(),
                new_start: at(15, 0),
                new_end: at(16, 0),
            }],
        )
        .unwrap();
        assert_eq!(
            db.get_task(&task.id).unwrap().unwrap().scheduled_date,
            Some(at(15, 0))
        );

        let restored = registry.restore_day(&db, "u1", &snapshot_id).unwrap();
        assert_eq!(restored, 1);
        assert_eq!(
            db.get_task(&task.id).unwrap().unwrap().scheduled_date,
            Some(at(9, 0))
        );
        // Consumed on success.
        assert!(registry.restore_day(&db, "u1", &snapshot_id).is_err());
    }

    #[test]
    fn test_restore_unknown_snapshot_is_rejected() {
        let db = TaskDb::open_memory().unwrap();
        let mut registry = SnapshotRegistry::new();
        assert!(registry.restore_day(&db, "u1", "no-such-id").is_err());
    }

    #[test]
    fn test_restore_checks_snapshot_owner() {
        let db = TaskDb::open_memory().unwrap();
        db.create_task(&Task::new("u1", "Mine").with_schedule(at(9, 0), at(10, 0)))
            .unwrap();

        let mut registry = SnapshotRegistry::new();
        let snapshot_id = registry.snapshot_day(&db, "u1", at(12, 0)).unwrap();

        assert!(registry.restore_day(&db, "u2", &snapshot_id).is_err());
        // The snapshot survives a rejected restore.
        assert_eq!(registry.len(), 1);
    }
}
