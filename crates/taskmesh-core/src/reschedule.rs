//! Rescheduling proposals and application.
//!
//! For each detected conflict the proposer picks one event to move and
//! prices the move; the cheapest proposals are returned for the caller to
//! choose from. This is a greedy, per-conflict local search: a proposal
//! fixes one conflict in isolation and may introduce new ones, so callers
//! re-run detection after applying.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::conflict::{detect_conflicts, Conflict, ConflictKind};
use crate::error::CoreError;
use crate::store::{ScheduleUpdate, TaskStore};
use crate::task::{Priority, Task};

/// Cost of moving an event when the other side is fixed, or when the
/// chosen mover is not high priority.
const BASE_MOVE_COST: u32 = 10;
/// Cost of moving a high-priority event when both sides were movable.
const HIGH_PRIORITY_MOVE_COST: u32 = 20;

/// A single time change within a proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeChange {
    pub id: String,
    pub new_start: DateTime<Utc>,
    pub new_end: DateTime<Utc>,
}

/// A candidate set of time changes resolving one conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub proposal_id: String,
    pub changes: Vec<TimeChange>,
    /// Lower is better.
    pub cost: u32,
    /// Human-readable summary naming the conflict type addressed.
    pub impact: String,
}

/// Proposer configuration.
#[derive(Debug, Clone)]
pub struct ProposerConfig {
    /// Maximum number of proposals to return.
    pub max_proposals: usize,
}

impl Default for ProposerConfig {
    fn default() -> Self {
        Self { max_proposals: 3 }
    }
}

/// Greedy per-conflict rescheduling proposer.
pub struct ReschedulingProposer {
    config: ProposerConfig,
}

impl ReschedulingProposer {
    /// Create a proposer with default config.
    pub fn new() -> Self {
        Self {
            config: ProposerConfig::default(),
        }
    }

    /// Create with custom config.
    pub fn with_config(config: ProposerConfig) -> Self {
        Self { config }
    }

    /// Build ranked proposals for `conflicts` among `events`.
    ///
    /// Conflicts where neither side is movable are skipped. Output is
    /// ascending by cost, truncated to `max_proposals`.
    pub fn suggest(&self, events: &[Task], conflicts: &[Conflict]) -> Vec<Proposal> {
        let by_id: HashMap<&str, &Task> = events.iter().map(|t| (t.id.as_str(), t)).collect();

        let mut proposals = Vec::new();
        for conflict in conflicts {
            let (Some(first), Some(second)) = (
                by_id.get(conflict.first_id.as_str()),
                by_id.get(conflict.second_id.as_str()),
            ) else {
                continue;
            };

            let choice = match conflict.kind {
                ConflictKind::Dependency => choose_dependent_mover(first, second),
                _ => choose_mover(first, second),
            };
            let Some((mover, stationary, cost)) = choice else {
                continue;
            };
            let Some(anchor_end) = stationary.effective_end() else {
                continue;
            };

            // Clear both sides of the gap: the stationary's after-buffer
            // and the mover's before-buffer.
            let new_start = anchor_end
                + Duration::minutes(stationary.buffer_after_min + mover.buffer_before_min);
            let new_end = new_start + Duration::minutes(mover.duration_min);

            proposals.push(Proposal {
                proposal_id: uuid::Uuid::new_v4().to_string(),
                changes: vec![TimeChange {
                    id: mover.id.clone(),
                    new_start,
                    new_end,
                }],
                cost,
                impact: format!(
                    "Resolves {} conflict between '{}' and '{}' by moving '{}' to {}",
                    conflict.kind.as_str(),
                    first.title,
                    second.title,
                    mover.title,
                    new_start.format("%H:%M"),
                ),
            });
        }

        // Stable sort keeps the scan order among equal costs.
        proposals.sort_by_key(|p| p.cost);
        proposals.truncate(self.config.max_proposals);
        proposals
    }
}

impl Default for ReschedulingProposer {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick which side of an overlap or buffer conflict moves.
///
/// A fixed event never moves. When both sides are movable the lower
/// priority one moves; on equal priority the event with the
/// lexicographically greater id moves (a guaranteed, deterministic
/// tie-break). Returns `None` when both sides are fixed.
fn choose_mover<'a>(a: &'a Task, b: &'a Task) -> Option<(&'a Task, &'a Task, u32)> {
    match (a.is_fixed, b.is_fixed) {
        (true, true) => None,
        (true, false) => Some((b, a, BASE_MOVE_COST)),
        (false, true) => Some((a, b, BASE_MOVE_COST)),
        (false, false) => {
            let (mover, stationary) = match a.priority.cmp(&b.priority) {
                std::cmp::Ordering::Less => (a, b),
                std::cmp::Ordering::Greater => (b, a),
                std::cmp::Ordering::Equal => {
                    if a.id > b.id {
                        (a, b)
                    } else {
                        (b, a)
                    }
                }
            };
            let cost = if mover.priority == Priority::High {
                HIGH_PRIORITY_MOVE_COST
            } else {
                BASE_MOVE_COST
            };
            Some((mover, stationary, cost))
        }
    }
}

/// Pick the mover for a dependency-order violation.
///
/// Only relocating the dependent past its dependency resolves the
/// violation, so the move direction is fixed: `dependent` moves,
/// `dependency` stays. Returns `None` when the dependent is fixed --
/// no movable resolution exists.
fn choose_dependent_mover<'a>(
    dependent: &'a Task,
    dependency: &'a Task,
) -> Option<(&'a Task, &'a Task, u32)> {
    if dependent.is_fixed {
        return None;
    }
    let cost = if !dependency.is_fixed && dependent.priority == Priority::High {
        HIGH_PRIORITY_MOVE_COST
    } else {
        BASE_MOVE_COST
    };
    Some((dependent, dependency, cost))
}

/// Load a user's day, detect conflicts, and return ranked proposals.
pub fn suggest_rescheduling(
    store: &dyn TaskStore,
    user_id: &str,
    date: DateTime<Utc>,
) -> Result<Vec<Proposal>, CoreError> {
    let events = store.events_for_user_on_date(user_id, date)?;
    let (conflicts, _) = detect_conflicts(&events);
    Ok(ReschedulingProposer::new().suggest(&events, &conflicts))
}

/// Commit a set of time changes for a user as a batch.
///
/// Changes naming ids the user does not own are no-ops. Returns the
/// records as stored after the update.
pub fn apply_rescheduling(
    store: &dyn TaskStore,
    user_id: &str,
    changes: &[TimeChange],
) -> Result<Vec<Task>, CoreError> {
    let updates: Vec<ScheduleUpdate> = changes
        .iter()
        .map(|c| ScheduleUpdate {
            id: c.id.clone(),
            scheduled_date: Some(c.new_start),
            scheduled_end: Some(c.new_end),
        })
        .collect();

    store.bulk_update_schedule(user_id, &updates)?;

    let mut updated = Vec::new();
    for change in changes {
        if let Some(task) = store.get_task(&change.id)? {
            if task.user_id == user_id {
                updated.push(task);
            }
        }
    }
    Ok(updated)
}
