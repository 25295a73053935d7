//! Edge types for the dependency graph.

use serde::{Deserialize, Serialize};
use super::node::NodeId;

/// Directed arc of the net, from `source` to `target`.
///
/// Implements `Ord` for deterministic ordering: (source, target).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Source node.
    pub source: NodeId,
    /// Target node.
    pub target: NodeId,
}

impl Edge {
    /// Create a new edge.
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

// Canonical ordering: source, then target
impl PartialOrd for Edge {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Edge {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.source.cmp(&other.source) {
            std::cmp::Ordering::Equal => self.target.cmp(&other.target),
            ord => ord,
        }
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}
