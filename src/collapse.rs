//! Collapsing of trivial places.
//!
//! Long chains of places with a single producer and a single consumer add
//! nothing to a causal explanation. The resolver looks through them and
//! reports the nearest significant neighbor instead.
//!
//! A node is **trivial** when it is a place with exactly one successor and
//! exactly one predecessor. Transitions are never trivial on their own,
//! but any node can be forced collapsible through
//! [`CollapseOptions::forced_trivial`], and any node can be kept visible
//! through [`CollapseOptions::retain`] (retain wins).

use std::collections::BTreeMap;

use crate::graph::PetriGraph;
use crate::types::{Direction, NodeId, NodeSet};

/// Per-call overrides of the triviality predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollapseOptions {
    /// Never collapsed.
    pub retain: NodeSet,
    /// Collapsed regardless of degree.
    pub forced_trivial: NodeSet,
}

impl CollapseOptions {
    /// Replace the retain set.
    pub fn with_retain(mut self, retain: NodeSet) -> Self {
        self.retain = retain;
        self
    }

    /// Replace the forced-trivial set.
    pub fn with_forced_trivial(mut self, forced_trivial: NodeSet) -> Self {
        self.forced_trivial = forced_trivial;
        self
    }
}

/// Resolves neighbors through trivial places.
#[derive(Debug, Clone, Copy)]
pub struct CollapseResolver<'g> {
    graph: &'g PetriGraph,
}

impl<'g> CollapseResolver<'g> {
    /// Create a resolver for a graph.
    pub fn new(graph: &'g PetriGraph) -> Self {
        Self { graph }
    }

    /// Whether `n` is a place with exactly one successor and one predecessor.
    pub fn is_trivial(&self, n: &NodeId) -> bool {
        self.graph.is_place(n)
            && self.graph.raw_successors(n).len() == 1
            && self.graph.raw_predecessors(n).len() == 1
    }

    /// The significant nodes standing in for `n` along `direction`.
    ///
    /// Returns `{n}` when `n` is retained or not collapsible, otherwise the
    /// union of the collapsed neighbors of `n`.
    pub fn collapse_neighbor(
        &self,
        n: &NodeId,
        direction: Direction,
        options: &CollapseOptions,
    ) -> NodeSet {
        CollapseWalk::new(*self, direction, options).resolve(n)
    }

    /// Adjacency of `n`, optionally looking through collapsible neighbors.
    pub fn neighbors(
        &self,
        n: &NodeId,
        direction: Direction,
        skip_trivial: bool,
        options: &CollapseOptions,
    ) -> NodeSet {
        if skip_trivial {
            CollapseWalk::new(*self, direction, options).neighbors(n)
        } else {
            self.graph.raw_neighbors(n, direction).iter().cloned().collect()
        }
    }

    /// Collapsed successors with default options.
    pub fn successors(&self, n: &NodeId) -> NodeSet {
        self.neighbors(n, Direction::Forward, true, &CollapseOptions::default())
    }

    /// Collapsed predecessors with default options.
    pub fn predecessors(&self, n: &NodeId) -> NodeSet {
        self.neighbors(n, Direction::Backward, true, &CollapseOptions::default())
    }

    fn is_collapsible(&self, n: &NodeId, options: &CollapseOptions) -> bool {
        !options.retain.contains(n) && (self.is_trivial(n) || options.forced_trivial.contains(n))
    }
}

/// One memoized collapse walk with fixed direction and options.
///
/// A walk may be reused for many lookups as long as the direction and
/// options stay the same; the trace engine keeps one per top-level trace.
///
/// ## Cycles
///
/// Collapsible nodes that reach each other form a strongly connected
/// component and share one result: the component's smallest id stands in
/// for the whole cycle, next to the significant nodes the component leads
/// to. Components are found with an iterative Tarjan pass, so a lookup
/// costs at most one visit per collapsible node and edge, and never
/// recurses.
#[derive(Debug)]
pub struct CollapseWalk<'a> {
    resolver: CollapseResolver<'a>,
    direction: Direction,
    options: &'a CollapseOptions,
    /// Stand-ins of every collapsible node resolved so far.
    memo: BTreeMap<NodeId, NodeSet>,
}

/// Bookkeeping of one Tarjan pass.
#[derive(Default)]
struct Components {
    index: BTreeMap<NodeId, usize>,
    lowlink: BTreeMap<NodeId, usize>,
    stack: Vec<NodeId>,
    on_stack: NodeSet,
    /// Explicit call stack: node and position in its neighbor list.
    calls: Vec<(NodeId, usize)>,
}

impl Components {
    fn enter(&mut self, n: &NodeId) {
        let i = self.index.len();
        self.index.insert(n.clone(), i);
        self.lowlink.insert(n.clone(), i);
        self.stack.push(n.clone());
        self.on_stack.insert(n.clone());
        self.calls.push((n.clone(), 0));
    }

    fn lower(&mut self, n: &NodeId, candidate: usize) {
        if let Some(low) = self.lowlink.get_mut(n) {
            *low = (*low).min(candidate);
        }
    }

    /// Pop the component rooted at `root` off the Tarjan stack.
    fn pop_component(&mut self, root: &NodeId) -> Vec<NodeId> {
        let mut members = Vec::new();
        while let Some(m) = self.stack.pop() {
            self.on_stack.remove(&m);
            let done = &m == root;
            members.push(m);
            if done {
                break;
            }
        }
        members
    }
}

impl<'a> CollapseWalk<'a> {
    /// Start a walk.
    pub fn new(resolver: CollapseResolver<'a>, direction: Direction, options: &'a CollapseOptions) -> Self {
        Self {
            resolver,
            direction,
            options,
            memo: BTreeMap::new(),
        }
    }

    /// Relation this walk follows.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Collapsed stand-ins for `n`.
    pub fn resolve(&mut self, n: &NodeId) -> NodeSet {
        if !self.resolver.is_collapsible(n, self.options) {
            return NodeSet::from([n.clone()]);
        }
        if !self.memo.contains_key(n) {
            self.expand(n);
        }
        self.memo.get(n).cloned().unwrap_or_default()
    }

    /// Union of the collapsed stand-ins of every raw neighbor of `n`.
    pub fn neighbors(&mut self, n: &NodeId) -> NodeSet {
        let graph = self.resolver.graph;
        let mut result = NodeSet::new();
        for m in graph.raw_neighbors(n, self.direction) {
            result.extend(self.resolve(m));
        }
        result
    }

    /// Whether `n` still needs a Tarjan visit.
    fn pending(&self, n: &NodeId) -> bool {
        self.resolver.is_collapsible(n, self.options) && !self.memo.contains_key(n)
    }

    /// Resolve every unresolved collapsible node reachable from `root`.
    ///
    /// Tarjan closes components sinks first, so every collapsible neighbor
    /// outside a component is already in the memo when it closes.
    fn expand(&mut self, root: &NodeId) {
        let graph = self.resolver.graph;
        let mut tarjan = Components::default();
        tarjan.enter(root);

        while let Some(top) = tarjan.calls.len().checked_sub(1) {
            let (v, next) = tarjan.calls[top].clone();
            let neighbors = graph.raw_neighbors(&v, self.direction);

            if let Some(w) = neighbors.get(next) {
                tarjan.calls[top].1 += 1;
                if !self.pending(w) {
                    continue;
                }
                match tarjan.index.get(w).copied() {
                    None => tarjan.enter(w),
                    Some(i) if tarjan.on_stack.contains(w) => tarjan.lower(&v, i),
                    Some(_) => {}
                }
                continue;
            }

            tarjan.calls.pop();
            let low = tarjan.lowlink.get(&v).copied().unwrap_or_default();
            if let Some((parent, _)) = tarjan.calls.last().cloned() {
                tarjan.lower(&parent, low);
            }
            if Some(low) == tarjan.index.get(&v).copied() {
                let members = tarjan.pop_component(&v);
                self.close_component(&members);
            }
        }
    }

    /// Memoize the shared result of one component.
    fn close_component(&mut self, members: &[NodeId]) {
        let graph = self.resolver.graph;
        let inside: NodeSet = members.iter().cloned().collect();
        let cyclic = members.len() > 1
            || members
                .iter()
                .any(|m| graph.raw_neighbors(m, self.direction).contains(m));

        let mut result = NodeSet::new();
        if cyclic {
            if let Some(first) = inside.iter().next() {
                tracing::trace!(node = %first, size = members.len(), "collapse cycle");
                result.insert(first.clone());
            }
        }
        for m in members {
            for x in graph.raw_neighbors(m, self.direction) {
                if inside.contains(x) {
                    continue;
                }
                if !self.resolver.is_collapsible(x, self.options) {
                    result.insert(x.clone());
                } else if let Some(done) = self.memo.get(x) {
                    result.extend(done.iter().cloned());
                }
            }
        }

        for m in members {
            self.memo.insert(m.clone(), result.clone());
        }
    }
}
