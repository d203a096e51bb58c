//! Adjacency-list conflict graph keyed by event id.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Which events conflict with which others.
///
/// Overlap and buffer conflicts insert symmetric edges; dependency-order
/// violations insert a single directed edge from the dependent event to
/// its dependency. Ordered maps keep iteration deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConflictGraph {
    adjacency: BTreeMap<String, BTreeSet<String>>,
}

impl ConflictGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a symmetric conflict between `a` and `b`.
    pub fn add_edge(&mut self, a: &str, b: &str) {
        self.adjacency
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string());
        self.adjacency
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string());
    }

    /// Record a directed conflict from `from` to `to`.
    pub fn add_directed_edge(&mut self, from: &str, to: &str) {
        self.adjacency
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
    }

    /// Ids this event conflicts with (empty when the event is clean).
    pub fn neighbors(&self, id: &str) -> impl Iterator<Item = &str> + '_ {
        self.adjacency
            .get(id)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    pub fn contains_edge(&self, from: &str, to: &str) -> bool {
        self.adjacency
            .get(from)
            .is_some_and(|set| set.contains(to))
    }

    /// Ids that appear in at least one conflict.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.adjacency.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_edge() {
        let mut graph = ConflictGraph::new();
        graph.add_edge("a", "b");

        assert!(graph.contains_edge("a", "b"));
        assert!(graph.contains_edge("b", "a"));
    }

    #[test]
    fn test_directed_edge_is_one_way() {
        let mut graph = ConflictGraph::new();
        graph.add_directed_edge("a", "b");

        assert!(graph.contains_edge("a", "b"));
        assert!(!graph.contains_edge("b", "a"));
    }

    #[test]
    fn test_neighbors_sorted_and_deduped() {
        let mut graph = ConflictGraph::new();
        graph.add_edge("a", "c");
        graph.add_edge("a", "b");
        graph.add_edge("a", "b");

        let neighbors: Vec<_> = graph.neighbors("a").collect();
        assert_eq!(neighbors, vec!["b", "c"]);
        assert!(graph.neighbors("missing").next().is_none());
    }
}
