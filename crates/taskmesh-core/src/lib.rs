//! # Taskmesh Core Library
//!
//! Scheduling and conflict-resolution engine for the Taskmesh task manager.
//! The engine is a library-style computation core: it consumes and produces
//! plain task records and leaves transport, presentation, and third-party
//! sync to its host.
//!
//! ## Architecture
//!
//! - **Recurrence**: a closed rule type evaluated by a pure, deterministic
//!   next-due-date function
//! - **Generator**: parent/instance synthesis plus the periodic sweep that
//!   advances overdue recurrences
//! - **Conflict detection**: pairwise overlap/buffer/dependency checks over
//!   a day's events, reported alongside an explicit conflict graph
//! - **Rescheduling**: greedy per-conflict move proposals ranked by cost,
//!   applied as user-scoped batch updates with day-level snapshot undo
//! - **Store**: SQLite-backed record store behind the [`TaskStore`] seam
//!
//! All operations are short-lived, stateless computations over records
//! fetched fresh per call; "now" is always an explicit parameter.
//!
//! ## Key Components
//!
//! - [`Recurrence`]: recurrence rule and next-due-date evaluation
//! - [`detect_conflicts`]: conflict scan over a day's events
//! - [`ReschedulingProposer`]: ranked move proposals
//! - [`TaskDb`]: SQLite record store

pub mod conflict;
pub mod error;
pub mod generator;
pub mod recurrence;
pub mod reschedule;
pub mod snapshot;
pub mod store;
pub mod task;

pub use conflict::{detect_conflicts, detect_conflicts_for_day, Conflict, ConflictGraph, ConflictKind};
pub use error::{CoreError, StoreError, ValidationError};
pub use generator::{create_next_instance, create_recurring_task, process_recurring_tasks, SweepReport};
pub use recurrence::{Frequency, Recurrence};
pub use reschedule::{
    apply_rescheduling, suggest_rescheduling, Proposal, ProposerConfig, ReschedulingProposer,
    TimeChange,
};
pub use snapshot::SnapshotRegistry;
pub use store::{day_bounds, ScheduleUpdate, TaskDb, TaskStore};
pub use task::{Priority, Task};
