//! Causal explanation traces.
//!
//! A trace answers "why can this node happen?" (backward) or "what can
//! this node lead to?" (forward) as an indented AND/OR tree:
//!
//! ```text
//! p3: ANYOF(1) t2
//!   t2: ALLOF(1) t1
//!     t1: ALLOF(1) p1
//!       p1: ANYOF(0)
//! ```
//!
//! A place is justified by any one of its dependencies (`ANYOF`), a
//! transition only by all of them together (`ALLOF`). Dependencies are
//! looked up through the collapse resolver, so trivial places are skipped
//! unless [`TraceOptions::skip_trivial`] is off.
//!
//! Every node is expanded at most once per seed walk. A second encounter,
//! whether through a cycle, a diamond or a sibling branch, is reported as
//! `VISITED`. The walk emits [`TraceRecord`]s into a [`TraceSink`]; the
//! engine itself never prints.

use serde::{Deserialize, Serialize};

use crate::collapse::{CollapseOptions, CollapseResolver, CollapseWalk};
use crate::graph::{GraphError, PetriGraph};
use crate::types::{Direction, NodeId, NodeSet, Quantifier};

/// What was emitted for a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum TraceEntry {
    /// The node was explained here.
    Expanded {
        /// ANYOF/ALLOF over the dependencies.
        quantifier: Quantifier,
        /// Node label.
        label: String,
        /// Dependencies, each explained at the next depth.
        deps: Vec<NodeId>,
    },
    /// The node is explained elsewhere in this walk.
    Visited,
}

/// One line of a trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Indentation level, 0 for a seed.
    pub depth: usize,
    /// Node the line is about.
    pub node: NodeId,
    /// What was emitted.
    #[serde(flatten)]
    pub entry: TraceEntry,
}

impl TraceRecord {
    /// Render the record as an indented line, optionally with the label.
    pub fn line(&self, with_labels: bool) -> String {
        let indent = "  ".repeat(self.depth);
        match &self.entry {
            TraceEntry::Visited => format!("{}{}: VISITED", indent, self.node),
            TraceEntry::Expanded { quantifier, label, deps } => {
                let mut line = if with_labels {
                    format!("{}{} ({}): {}", indent, self.node, label, quantifier)
                } else {
                    format!("{}{}: {}", indent, self.node, quantifier)
                };
                for dep in deps {
                    line.push(' ');
                    line.push_str(dep.as_str());
                }
                line
            }
        }
    }
}

impl std::fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.line(false))
    }
}

/// Destination for trace records.
pub trait TraceSink {
    /// Accept the next record, in emission order.
    fn record(&mut self, record: TraceRecord);
}

impl TraceSink for Vec<TraceRecord> {
    fn record(&mut self, record: TraceRecord) {
        self.push(record);
    }
}

/// Sink that forwards every line to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn record(&mut self, record: TraceRecord) {
        tracing::info!(depth = record.depth, node = %record.node, "{}", record.line(true));
    }
}

/// Sink that accumulates rendered lines.
#[derive(Debug, Clone, Default)]
pub struct TextSink {
    lines: Vec<String>,
    with_labels: bool,
}

impl TextSink {
    /// Create a sink; `with_labels` adds each node's label to its line.
    pub fn new(with_labels: bool) -> Self {
        Self { lines: Vec::new(), with_labels }
    }

    /// Lines collected so far.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// All lines joined with newlines.
    pub fn into_text(self) -> String {
        self.lines.join("\n")
    }
}

impl TraceSink for TextSink {
    fn record(&mut self, record: TraceRecord) {
        self.lines.push(record.line(self.with_labels));
    }
}

/// Boundaries and collapse settings of a trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceOptions {
    /// Nodes marked visited but never expanded.
    pub stop: NodeSet,
    /// Nodes dropped from every dependency list.
    pub exclude: NodeSet,
    /// Look through trivial places when listing dependencies.
    pub skip_trivial: bool,
    /// Retain / forced-trivial overrides for the collapse.
    pub collapse: CollapseOptions,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            stop: NodeSet::new(),
            exclude: NodeSet::new(),
            skip_trivial: true,
            collapse: CollapseOptions::default(),
        }
    }
}

/// Walks the graph and emits explanation trees.
#[derive(Debug, Clone, Copy)]
pub struct TraceEngine<'g> {
    graph: &'g PetriGraph,
}

impl<'g> TraceEngine<'g> {
    /// Create an engine for a graph.
    pub fn new(graph: &'g PetriGraph) -> Self {
        Self { graph }
    }

    /// Explain `n` along `direction`, threading `visited` through the walk.
    ///
    /// Nodes already in `visited` are reported as `VISITED` instead of being
    /// expanded again. Nodes in the stop set are marked visited and emit
    /// nothing; their parent's line already names them.
    pub fn trace(
        &self,
        n: &NodeId,
        direction: Direction,
        options: &TraceOptions,
        visited: &mut NodeSet,
        sink: &mut dyn TraceSink,
    ) -> Result<(), GraphError> {
        let mut walk = CollapseWalk::new(CollapseResolver::new(self.graph), direction, &options.collapse);
        self.visit(n, options, &mut walk, visited, sink)
    }

    /// Backward explanation of every seed.
    ///
    /// Each seed gets its own walk in which the other seeds count as
    /// already visited, so one seed's tree never descends into another's.
    pub fn trace_bwd(
        &self,
        seeds: &NodeSet,
        options: &TraceOptions,
        sink: &mut dyn TraceSink,
    ) -> Result<(), GraphError> {
        self.trace_seeds(seeds, Direction::Backward, options, sink)
    }

    /// Forward explanation of every seed.
    pub fn trace_fwd(
        &self,
        seeds: &NodeSet,
        options: &TraceOptions,
        sink: &mut dyn TraceSink,
    ) -> Result<(), GraphError> {
        self.trace_seeds(seeds, Direction::Forward, options, sink)
    }

    fn trace_seeds(
        &self,
        seeds: &NodeSet,
        direction: Direction,
        options: &TraceOptions,
        sink: &mut dyn TraceSink,
    ) -> Result<(), GraphError> {
        for seed in seeds {
            let mut visited: NodeSet = seeds.iter().filter(|s| *s != seed).cloned().collect();
            self.trace(seed, direction, options, &mut visited, sink)?;
            tracing::debug!(seed = %seed, ?direction, visited = visited.len(), "trace walk done");
        }
        Ok(())
    }

    /// Depth-first walk from `n` on an explicit stack of `(node, depth)`
    /// frames. Dependencies are pushed in reverse so records come out in
    /// the same preorder a recursive walk would produce.
    fn visit(
        &self,
        n: &NodeId,
        options: &TraceOptions,
        walk: &mut CollapseWalk<'_>,
        visited: &mut NodeSet,
        sink: &mut dyn TraceSink,
    ) -> Result<(), GraphError> {
        let mut frames = vec![(n.clone(), 0usize)];

        while let Some((node, depth)) = frames.pop() {
            let first_visit = visited.insert(node.clone());
            if options.stop.contains(&node) {
                continue;
            }
            if !first_visit {
                sink.record(TraceRecord { depth, node, entry: TraceEntry::Visited });
                continue;
            }

            let label = self.graph.label(&node)?.to_string();
            let kind = self.graph.kind(&node).ok_or_else(|| GraphError::UnknownNode(node.clone()))?;
            let neighbors: NodeSet = if options.skip_trivial {
                walk.neighbors(&node)
            } else {
                self.graph.raw_neighbors(&node, walk.direction()).iter().cloned().collect()
            };
            let deps: Vec<NodeId> = neighbors
                .into_iter()
                .filter(|d| !options.exclude.contains(d))
                .collect();

            frames.extend(deps.iter().rev().map(|d| (d.clone(), depth + 1)));
            sink.record(TraceRecord {
                depth,
                node,
                entry: TraceEntry::Expanded {
                    quantifier: kind.quantifier(deps.len()),
                    label,
                    deps,
                },
            });
        }
        Ok(())
    }
}
