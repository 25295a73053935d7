//! Node types for the dependency graph.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Unique identifier for a place or transition.
///
/// Wraps the identifier text and implements `Ord` for deterministic ordering.
/// Net dumps may carry numeric identifiers; those are kept in decimal form,
/// so the integer `12` and the string `"12"` are the same id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a new NodeId.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for NodeId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s),
            RawId::Number(n) => Self::from(n),
        })
    }
}

/// A set of nodes. Ordered so every walk over it is deterministic.
pub type NodeSet = BTreeSet<NodeId>;

/// Build a [`NodeSet`] from anything that converts into node ids.
pub fn node_set<I, T>(ids: I) -> NodeSet
where
    I: IntoIterator<Item = T>,
    T: Into<NodeId>,
{
    ids.into_iter().map(Into::into).collect()
}

/// Kind of node in the bipartite net.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// State or condition. Justified by any one of its predecessors.
    Place,
    /// Event or action. Justified only by all of its predecessors together.
    Transition,
}

impl NodeKind {
    /// Quantifier describing how `count` dependencies justify a node of this kind.
    pub fn quantifier(self, count: usize) -> Quantifier {
        match self {
            Self::Place => Quantifier::AnyOf(count),
            Self::Transition => Quantifier::AllOf(count),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Place => write!(f, "place"),
            Self::Transition => write!(f, "transition"),
        }
    }
}

/// Disjunctive or conjunctive justification over a number of dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "count", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Quantifier {
    /// Any one dependency suffices.
    AnyOf(usize),
    /// All dependencies are jointly required.
    AllOf(usize),
}

impl Quantifier {
    /// Number of dependencies quantified over.
    pub fn count(&self) -> usize {
        match self {
            Self::AnyOf(k) | Self::AllOf(k) => *k,
        }
    }
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnyOf(k) => write!(f, "ANYOF({})", k),
            Self::AllOf(k) => write!(f, "ALLOF({})", k),
        }
    }
}

/// Which adjacency relation a walk follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Follow successor edges.
    #[default]
    Forward,
    /// Follow predecessor edges.
    Backward,
}
