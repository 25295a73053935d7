//! The immutable place/transition graph.
//!
//! A [`PetriGraph`] is built once from a [`NetDeclaration`] and never
//! mutated afterwards. Reductions such as [`PetriGraph::restrict`] produce
//! a new graph with freshly built adjacency tables.
//!
//! ## Construction Policy
//!
//! Construction fails fast on structurally malformed input:
//! - an id declared twice within the places or within the transitions,
//! - an id declared both as a place and as a transition,
//! - an edge whose target is declared in neither set.
//!
//! Nodes without declared successors simply have empty adjacency.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::types::{Direction, Edge, LoadError, NetDeclaration, NodeDecl, NodeId, NodeKind, NodeSet};

/// Error type for graph operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Node is not part of the graph.
    #[error("Node not found: {0}")]
    UnknownNode(NodeId),
    /// An edge points at a node that was never declared.
    #[error("Edge {from} -> {to} references an undeclared node")]
    UndeclaredNode {
        /// Declared source of the edge.
        from: NodeId,
        /// Undeclared target.
        to: NodeId,
    },
    /// The same id is declared twice with the same kind.
    #[error("Duplicate {kind} declaration: {id}")]
    DuplicateNode {
        /// Repeated id.
        id: NodeId,
        /// Kind it was declared with.
        kind: NodeKind,
    },
    /// The same id is declared as both a place and a transition.
    #[error("Node declared as both place and transition: {0}")]
    KindConflict(NodeId),
    /// A label pattern failed to compile.
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// Pattern text.
        pattern: String,
        /// Compiler message.
        reason: String,
    },
}

/// Content-derived identity of a graph.
///
/// Two graphs with the same node kinds, labels and successor lists have
/// the same fingerprint, independent of declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphFingerprint(String);

impl GraphFingerprint {
    /// Get the fingerprint as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GraphFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bipartite place/transition graph.
///
/// Uses BTreeMap for deterministic iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PetriGraph {
    /// Kind of every declared node.
    kinds: BTreeMap<NodeId, NodeKind>,
    /// Label of every declared node.
    labels: BTreeMap<NodeId, String>,
    /// Node -> successors, in declaration order.
    succ: BTreeMap<NodeId, Vec<NodeId>>,
    /// Node -> predecessors, inverse of `succ` without duplicates.
    pred: BTreeMap<NodeId, Vec<NodeId>>,
}

impl PetriGraph {
    /// Build a graph from parallel place and transition declarations.
    pub fn from_declaration(decl: &NetDeclaration) -> Result<Self, GraphError> {
        let mut kinds: BTreeMap<NodeId, NodeKind> = BTreeMap::new();
        let mut labels = BTreeMap::new();
        let mut succ = BTreeMap::new();

        let tagged = decl
            .places
            .iter()
            .map(|d| (d, NodeKind::Place))
            .chain(decl.transitions.iter().map(|d| (d, NodeKind::Transition)));

        for (node, kind) in tagged {
            if let Some(existing) = kinds.insert(node.id.clone(), kind) {
                return Err(if existing == kind {
                    GraphError::DuplicateNode { id: node.id.clone(), kind }
                } else {
                    GraphError::KindConflict(node.id.clone())
                });
            }
            labels.insert(node.id.clone(), node.label.clone());
            if !node.successors.is_empty() {
                succ.insert(node.id.clone(), node.successors.clone());
            }
        }

        for (source, targets) in &succ {
            if let Some(target) = targets.iter().find(|t| !kinds.contains_key(*t)) {
                return Err(GraphError::UndeclaredNode {
                    from: source.clone(),
                    to: target.clone(),
                });
            }
        }

        let graph = Self::from_tables(kinds, labels, succ);
        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built petri graph"
        );
        Ok(graph)
    }

    /// Assemble a graph from already validated tables, deriving predecessors.
    pub(crate) fn from_tables(
        kinds: BTreeMap<NodeId, NodeKind>,
        labels: BTreeMap<NodeId, String>,
        succ: BTreeMap<NodeId, Vec<NodeId>>,
    ) -> Self {
        let mut pred: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for (source, targets) in &succ {
            for target in targets {
                let sources = pred.entry(target.clone()).or_default();
                if !sources.contains(source) {
                    sources.push(source.clone());
                }
            }
        }

        Self { kinds, labels, succ, pred }
    }

    /// Load a graph from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        let decl = NetDeclaration::from_json_str(json)?;
        Ok(Self::from_declaration(&decl)?)
    }

    /// Load a graph from a JSON reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        let decl = NetDeclaration::from_reader(reader)?;
        Ok(Self::from_declaration(&decl)?)
    }

    /// Load a graph from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let decl = NetDeclaration::from_path(path)?;
        Ok(Self::from_declaration(&decl)?)
    }

    /// Whether the node is declared.
    pub fn contains(&self, n: &NodeId) -> bool {
        self.kinds.contains_key(n)
    }

    /// Kind of a node, if declared.
    pub fn kind(&self, n: &NodeId) -> Option<NodeKind> {
        self.kinds.get(n).copied()
    }

    /// Whether the node is a declared place.
    pub fn is_place(&self, n: &NodeId) -> bool {
        self.kind(n) == Some(NodeKind::Place)
    }

    /// Whether the node is a declared transition.
    pub fn is_transition(&self, n: &NodeId) -> bool {
        self.kind(n) == Some(NodeKind::Transition)
    }

    /// Label of a node.
    pub fn label(&self, n: &NodeId) -> Result<&str, GraphError> {
        self.labels
            .get(n)
            .map(String::as_str)
            .ok_or_else(|| GraphError::UnknownNode(n.clone()))
    }

    /// All labels by node.
    pub fn labels(&self) -> &BTreeMap<NodeId, String> {
        &self.labels
    }

    /// Declared successors of a node (empty if none).
    pub fn raw_successors(&self, n: &NodeId) -> &[NodeId] {
        self.succ.get(n).map(Vec::as_slice).unwrap_or_default()
    }

    /// Predecessors of a node (empty if none).
    pub fn raw_predecessors(&self, n: &NodeId) -> &[NodeId] {
        self.pred.get(n).map(Vec::as_slice).unwrap_or_default()
    }

    /// Raw adjacency along a direction.
    pub fn raw_neighbors(&self, n: &NodeId, direction: Direction) -> &[NodeId] {
        match direction {
            Direction::Forward => self.raw_successors(n),
            Direction::Backward => self.raw_predecessors(n),
        }
    }

    /// All node ids, in order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> + '_ {
        self.kinds.keys()
    }

    /// All node ids as a set.
    pub fn node_set(&self) -> NodeSet {
        self.kinds.keys().cloned().collect()
    }

    /// All place ids.
    pub fn places(&self) -> NodeSet {
        self.of_kind(NodeKind::Place)
    }

    /// All transition ids.
    pub fn transitions(&self) -> NodeSet {
        self.of_kind(NodeKind::Transition)
    }

    fn of_kind(&self, kind: NodeKind) -> NodeSet {
        self.kinds
            .iter()
            .filter(|(_, k)| **k == kind)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// All edges, in canonical order.
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self
            .succ
            .iter()
            .flat_map(|(source, targets)| {
                targets.iter().map(move |t| Edge::new(source.clone(), t.clone()))
            })
            .collect();
        edges.sort();
        edges
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.kinds.len()
    }

    /// Number of declared arcs.
    pub fn edge_count(&self) -> usize {
        self.succ.values().map(Vec::len).sum()
    }

    /// Convert back into the declaration shape (nodes ordered by id).
    pub fn declaration(&self) -> NetDeclaration {
        let mut decl = NetDeclaration::default();
        for (id, kind) in &self.kinds {
            let node = NodeDecl {
                id: id.clone(),
                label: self.labels.get(id).cloned().unwrap_or_default(),
                successors: self.raw_successors(id).to_vec(),
            };
            match kind {
                NodeKind::Place => decl.places.push(node),
                NodeKind::Transition => decl.transitions.push(node),
            }
        }
        decl
    }

    /// Compute the content fingerprint of this graph.
    pub fn fingerprint(&self) -> GraphFingerprint {
        GraphFingerprint(canonical_hash_hex(&(crate::SLICER_SCHEMA_VERSION, self.declaration())))
    }
}
