//! Subgraph reduction.
//!
//! [`PetriGraph::restrict`] keeps a subset of the nodes and reconnects
//! them: an edge into a removed node is pushed through it to every kept
//! node reachable along removed-only paths. The result is a new graph;
//! the original is never touched.
//!
//! Like slicing, this is a comprehension aid. Pushing edges through a
//! removed transition joins its inputs to its outputs even though the
//! removed transition may have needed other inputs too.

use std::collections::BTreeMap;

use regex_lite::Regex;

use crate::graph::{GraphError, PetriGraph};
use crate::types::{NodeId, NodeSet};

/// Memoized edge pushing for one `restrict` call.
struct EdgePusher<'a> {
    graph: &'a PetriGraph,
    keep: &'a NodeSet,
    /// Removed node -> every kept node reachable through removed nodes.
    memo: BTreeMap<NodeId, Vec<NodeId>>,
}

impl<'a> EdgePusher<'a> {
    fn new(graph: &'a PetriGraph, keep: &'a NodeSet) -> Self {
        Self { graph, keep, memo: BTreeMap::new() }
    }

    /// Successors of a kept node in the restricted graph.
    fn filtered_successors(&mut self, n: &NodeId) -> Vec<NodeId> {
        let graph = self.graph;
        let mut out = Targets::default();
        for s in graph.raw_successors(n) {
            if self.keep.contains(s) {
                out.push(s);
            } else {
                let pushed = self.pushed_through(s);
                out.extend(&pushed);
            }
        }
        out.into_vec()
    }

    /// Kept nodes reachable from the removed node `r` along removed nodes.
    ///
    /// Iterative walk with its own visited set, so cycles of removed nodes
    /// terminate. Results stored in the memo are always complete.
    fn pushed_through(&mut self, r: &NodeId) -> Vec<NodeId> {
        if let Some(done) = self.memo.get(r) {
            return done.clone();
        }

        let mut out = Targets::default();
        let mut visited = NodeSet::from([r.clone()]);
        let mut stack = vec![r.clone()];

        let graph = self.graph;
        while let Some(x) = stack.pop() {
            for s in graph.raw_successors(&x) {
                if self.keep.contains(s) {
                    out.push(s);
                } else if let Some(done) = self.memo.get(s) {
                    out.extend(done);
                } else if visited.insert(s.clone()) {
                    stack.push(s.clone());
                }
            }
        }

        tracing::trace!(node = %r, targets = out.len(), "pushed edges through removed node");
        let out = out.into_vec();
        self.memo.insert(r.clone(), out.clone());
        out
    }
}

/// Ordered, duplicate-free target list.
#[derive(Default)]
struct Targets {
    order: Vec<NodeId>,
    seen: NodeSet,
}

impl Targets {
    fn push(&mut self, n: &NodeId) {
        if self.seen.insert(n.clone()) {
            self.order.push(n.clone());
        }
    }

    fn extend(&mut self, ns: &[NodeId]) {
        for n in ns {
            self.push(n);
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn into_vec(self) -> Vec<NodeId> {
        self.order
    }
}

impl PetriGraph {
    /// New graph containing only the nodes of `keep` that exist here.
    ///
    /// Edges through removed nodes are replaced by direct edges to the kept
    /// nodes they lead to. Predecessors are rebuilt by inverting the new
    /// successor lists.
    pub fn restrict(&self, keep: &NodeSet) -> PetriGraph {
        let mut pusher = EdgePusher::new(self, keep);
        let mut kinds = BTreeMap::new();
        let mut labels = BTreeMap::new();
        let mut succ = BTreeMap::new();

        for n in keep {
            let Some(kind) = self.kind(n) else {
                continue;
            };
            kinds.insert(n.clone(), kind);
            labels.insert(n.clone(), self.labels().get(n).cloned().unwrap_or_default());

            let successors = pusher.filtered_successors(n);
            if !successors.is_empty() {
                succ.insert(n.clone(), successors);
            }
        }

        let restricted = PetriGraph::from_tables(kinds, labels, succ);
        tracing::debug!(
            kept = restricted.node_count(),
            removed = self.node_count() - restricted.node_count(),
            edges = restricted.edge_count(),
            "restricted graph"
        );
        restricted
    }

    /// Nodes whose label matches the regular expression `pattern`.
    ///
    /// The pattern may match anywhere in the label; anchor it with `^...$`
    /// for exact matches.
    pub fn nodes_matching(&self, pattern: &str) -> Result<NodeSet, GraphError> {
        let re = Regex::new(pattern).map_err(|e| GraphError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(self
            .labels()
            .iter()
            .filter(|(_, label)| re.is_match(label))
            .map(|(id, _)| id.clone())
            .collect())
    }

    /// Union of the matches of several patterns. No patterns, no nodes.
    pub fn nodes_matching_any<S: AsRef<str>>(&self, patterns: &[S]) -> Result<NodeSet, GraphError> {
        let mut nodes = NodeSet::new();
        for pattern in patterns {
            nodes.extend(self.nodes_matching(pattern.as_ref())?);
        }
        Ok(nodes)
    }

    /// All nodes of this graph not in `nodes`.
    pub fn complement(&self, nodes: &NodeSet) -> NodeSet {
        self.nodes().filter(|n| !nodes.contains(*n)).cloned().collect()
    }
}
