//! Conflict detection over a day's scheduled events.

pub mod detector;
pub mod graph;

pub use detector::{detect_conflicts, detect_conflicts_for_day, Conflict, ConflictKind};
pub use graph::ConflictGraph;
