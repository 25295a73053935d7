//! Analysis queries: a serializable description of one analysis run.
//!
//! Boundary sets are given as label patterns and resolved against the
//! graph at run time, so the same query file can be applied to any dump of
//! the same system. Every pattern list defaults to empty, which resolves
//! to an empty set.
//!
//! ```json
//! {
//!   "mode": "chop",
//!   "seeds": ["^request received$"],
//!   "targets": ["^response sent$"],
//!   "exclude": ["^timeout"]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::closure::{ChopBounds, SliceBounds, Slicer};
use crate::collapse::CollapseOptions;
use crate::graph::{GraphError, GraphFingerprint, PetriGraph};
use crate::trace::{TraceEngine, TraceEntry, TraceOptions, TraceRecord};
use crate::types::{Direction, LoadError, NetDeclaration, NodeSet};
use crate::DEFAULT_QUERY_VERSION;

/// What a query computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Forward or backward slice of the seeds.
    #[default]
    Slice,
    /// Nodes between the seeds and the targets.
    Chop,
    /// Causal explanation tree of each seed.
    Trace,
    /// Subgraph restricted to the kept nodes.
    Filter,
}

/// One analysis request.
///
/// ## Parameters
///
/// - `mode`: slice, chop, trace or filter
/// - `direction`: relation for slice and trace (chop uses both)
/// - `seeds`: start nodes (forward seeds of a chop)
/// - `targets`: backward seeds of a chop, highlighted like seeds
/// - `stop` / `exclude`: walls of slices, chops and traces
/// - `retain` / `forced_trivial`: collapse overrides for traces
/// - `keep`: nodes kept by a filter
/// - `skip_trivial`: look through trivial places in traces and rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisQuery {
    /// Query format version.
    pub version: String,
    /// What to compute.
    pub mode: AnalysisMode,
    /// Relation followed by slices and traces.
    pub direction: Direction,
    /// Seed label patterns.
    pub seeds: Vec<String>,
    /// Chop target label patterns.
    pub targets: Vec<String>,
    /// Stop label patterns.
    pub stop: Vec<String>,
    /// Exclude label patterns.
    pub exclude: Vec<String>,
    /// Retain label patterns.
    pub retain: Vec<String>,
    /// Forced-trivial label patterns.
    pub forced_trivial: Vec<String>,
    /// Keep label patterns (filter mode).
    pub keep: Vec<String>,
    /// Collapse trivial places.
    pub skip_trivial: bool,
}

impl Default for AnalysisQuery {
    fn default() -> Self {
        Self {
            version: DEFAULT_QUERY_VERSION.to_string(),
            mode: AnalysisMode::Slice,
            direction: Direction::Forward,
            seeds: Vec::new(),
            targets: Vec::new(),
            stop: Vec::new(),
            exclude: Vec::new(),
            retain: Vec::new(),
            forced_trivial: Vec::new(),
            keep: Vec::new(),
            skip_trivial: true,
        }
    }
}

/// Pattern lists of a query resolved to node sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSets {
    /// Seed nodes.
    pub seeds: NodeSet,
    /// Chop targets.
    pub targets: NodeSet,
    /// Stop nodes.
    pub stop: NodeSet,
    /// Excluded nodes.
    pub exclude: NodeSet,
    /// Retained nodes.
    pub retain: NodeSet,
    /// Forced-trivial nodes.
    pub forced_trivial: NodeSet,
    /// Kept nodes.
    pub keep: NodeSet,
}

/// Result of running a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Hash of the query parameters.
    pub query_hash: String,
    /// Fingerprint of the graph the query ran on.
    pub graph_fingerprint: GraphFingerprint,
    /// Mode that produced the report.
    pub mode: AnalysisMode,
    /// Resulting nodes (slice, chop, nodes named by a trace, or kept nodes).
    pub nodes: NodeSet,
    /// Seeds and targets, for highlighting.
    pub highlight: NodeSet,
    /// Trace lines (trace mode only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<TraceRecord>,
    /// Restricted graph (filter mode only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subgraph: Option<NetDeclaration>,
}

impl AnalysisQuery {
    /// Slice query.
    pub fn slice(direction: Direction, seeds: Vec<String>) -> Self {
        Self { mode: AnalysisMode::Slice, direction, seeds, ..Self::default() }
    }

    /// Chop query between `seeds` and `targets`.
    pub fn chop(seeds: Vec<String>, targets: Vec<String>) -> Self {
        Self { mode: AnalysisMode::Chop, seeds, targets, ..Self::default() }
    }

    /// Trace query.
    pub fn trace(direction: Direction, seeds: Vec<String>) -> Self {
        Self { mode: AnalysisMode::Trace, direction, seeds, ..Self::default() }
    }

    /// Filter query.
    pub fn filter(keep: Vec<String>) -> Self {
        Self { mode: AnalysisMode::Filter, keep, ..Self::default() }
    }

    /// Parse a query from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a query from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Compute a hash of the query parameters.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(self)
    }

    /// Resolve every pattern list against `graph`.
    pub fn resolve(&self, graph: &PetriGraph) -> Result<ResolvedSets, GraphError> {
        Ok(ResolvedSets {
            seeds: graph.nodes_matching_any(&self.seeds)?,
            targets: graph.nodes_matching_any(&self.targets)?,
            stop: graph.nodes_matching_any(&self.stop)?,
            exclude: graph.nodes_matching_any(&self.exclude)?,
            retain: graph.nodes_matching_any(&self.retain)?,
            forced_trivial: graph.nodes_matching_any(&self.forced_trivial)?,
            keep: graph.nodes_matching_any(&self.keep)?,
        })
    }

    /// Run the query against `graph`.
    pub fn run(&self, graph: &PetriGraph) -> Result<AnalysisReport, GraphError> {
        let sets = self.resolve(graph)?;
        let slicer = Slicer::new(graph);
        let mut trace = Vec::new();
        let mut subgraph = None;

        let nodes = match self.mode {
            AnalysisMode::Slice => {
                let bounds = SliceBounds::new(sets.stop.clone(), sets.exclude.clone());
                slicer.slice(&sets.seeds, self.direction, &bounds)
            }
            AnalysisMode::Chop => {
                let bounds = ChopBounds {
                    fwd_stop: sets.stop.clone(),
                    bwd_stop: sets.stop.clone(),
                    exclude: sets.exclude.clone(),
                };
                slicer.chop(&sets.seeds, &sets.targets, &bounds)
            }
            AnalysisMode::Trace => {
                let options = TraceOptions {
                    stop: sets.stop.clone(),
                    exclude: sets.exclude.clone(),
                    skip_trivial: self.skip_trivial,
                    collapse: CollapseOptions {
                        retain: sets.retain.clone(),
                        forced_trivial: sets.forced_trivial.clone(),
                    },
                };
                let engine = TraceEngine::new(graph);
                match self.direction {
                    Direction::Forward => engine.trace_fwd(&sets.seeds, &options, &mut trace)?,
                    Direction::Backward => engine.trace_bwd(&sets.seeds, &options, &mut trace)?,
                }
                traced_nodes(&trace)
            }
            AnalysisMode::Filter => {
                let restricted = graph.restrict(&sets.keep);
                let kept = restricted.node_set();
                subgraph = Some(restricted.declaration());
                kept
            }
        };

        tracing::info!(
            mode = ?self.mode,
            seeds = sets.seeds.len(),
            nodes = nodes.len(),
            "query complete"
        );

        Ok(AnalysisReport {
            query_hash: self.params_hash(),
            graph_fingerprint: graph.fingerprint(),
            mode: self.mode,
            nodes,
            highlight: sets.seeds.union(&sets.targets).cloned().collect(),
            trace,
            subgraph,
        })
    }
}

/// Every node a trace mentions, including listed dependencies.
fn traced_nodes(trace: &[TraceRecord]) -> NodeSet {
    let mut nodes = NodeSet::new();
    for record in trace {
        nodes.insert(record.node.clone());
        if let TraceEntry::Expanded { deps, .. } = &record.entry {
            nodes.extend(deps.iter().cloned());
        }
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{node_set, NodeDecl, NodeId};

    fn chain() -> PetriGraph {
        let decl = NetDeclaration::new(
            vec![
                NodeDecl::new("p1", "start", ["t1"]),
                NodeDecl::new("p2", "middle", ["t2"]),
                NodeDecl::new("p3", "end", Vec::<NodeId>::new()),
            ],
            vec![
                NodeDecl::new("t1", "step one", ["p2"]),
                NodeDecl::new("t2", "step two", ["p3"]),
            ],
        );
        PetriGraph::from_declaration(&decl).unwrap()
    }

    fn patterns(ps: &[&str]) -> Vec<String> {
        ps.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_query_params_hash_determinism() {
        assert_eq!(AnalysisQuery::default().params_hash(), AnalysisQuery::default().params_hash());
    }

    #[test]
    fn test_query_params_hash_changes() {
        let q1 = AnalysisQuery::default();
        let mut q2 = AnalysisQuery::default();
        q2.skip_trivial = false;
        assert_ne!(q1.params_hash(), q2.params_hash());
    }

    #[test]
    fn test_parse_partial_query() {
        let q = AnalysisQuery::from_json_str(r#"{"mode": "trace", "direction": "backward", "seeds": ["^end$"]}"#)
            .unwrap();
        assert_eq!(q.mode, AnalysisMode::Trace);
        assert_eq!(q.direction, Direction::Backward);
        assert!(q.skip_trivial);
        assert!(q.stop.is_empty());
        assert_eq!(q.version, DEFAULT_QUERY_VERSION);
    }

    #[test]
    fn test_slice_query() {
        let g = chain();
        let report = AnalysisQuery::slice(Direction::Backward, patterns(&["^middle$"]))
            .run(&g)
            .unwrap();
        assert_eq!(report.nodes, node_set(["p1", "t1", "p2"]));
        assert_eq!(report.highlight, node_set(["p2"]));
        assert_eq!(report.graph_fingerprint, g.fingerprint());
    }

    #[test]
    fn test_chop_query() {
        let g = chain();
        let mut query = AnalysisQuery::chop(patterns(&["^step one$"]), patterns(&["^end$"]));
        query.exclude = patterns(&["^middle$"]);
        assert!(query.run(&g).unwrap().nodes.is_empty());

        query.exclude.clear();
        assert_eq!(query.run(&g).unwrap().nodes, node_set(["t1", "p2", "t2", "p3"]));
    }

    #[test]
    fn test_trace_query() {
        let g = chain();
        let report = AnalysisQuery::trace(Direction::Backward, patterns(&["^end$"]))
            .run(&g)
            .unwrap();
        assert_eq!(report.trace.len(), 4);
        assert_eq!(report.trace[0].to_string(), "p3: ANYOF(1) t2");
        // p2 is collapsed away
        assert_eq!(report.nodes, node_set(["p1", "t1", "t2", "p3"]));
    }

    #[test]
    fn test_filter_query() {
        let g = chain();
        let report = AnalysisQuery::filter(patterns(&["^start$", "^end$"])).run(&g).unwrap();
        let sub = report.subgraph.unwrap();
        assert_eq!(report.nodes, node_set(["p1", "p3"]));
        assert_eq!(sub.places[0], NodeDecl::new("p1", "start", ["p3"]));
    }

    #[test]
    fn test_empty_patterns_give_empty_results() {
        let g = chain();
        let report = AnalysisQuery::default().run(&g).unwrap();
        assert!(report.nodes.is_empty());
        assert!(report.highlight.is_empty());
    }

    #[test]
    fn test_invalid_pattern_fails() {
        let g = chain();
        let err = AnalysisQuery::slice(Direction::Forward, patterns(&["[unclosed"]))
            .run(&g)
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidPattern { .. }));
    }

    #[test]
    fn test_report_serializes() {
        let g = chain();
        let report = AnalysisQuery::trace(Direction::Forward, patterns(&["^start$"]))
            .run(&g)
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mode"], "trace");
        assert_eq!(json["trace"][0]["entry"], "expanded");
        assert_eq!(json["trace"][0]["quantifier"]["kind"], "ANY_OF");
        assert!(json.get("subgraph").is_none());
    }
}
