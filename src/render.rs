//! Graphviz DOT output.
//!
//! Renders a node subset of a graph as a `digraph`. Transitions are drawn
//! as rectangles, highlighted nodes are filled, and every node is captioned
//! `id:label`. With `skip_trivial`, trivial places are hidden (unless
//! highlighted) and edges are drawn through them.

use std::io::Write;

use crate::collapse::{CollapseOptions, CollapseResolver};
use crate::graph::PetriGraph;
use crate::types::{Direction, NodeId, NodeSet};

/// Rendering options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotOptions {
    /// Filled nodes. Highlighted nodes are never collapsed away.
    pub highlight: NodeSet,
    /// Hide trivial places and connect through them.
    pub skip_trivial: bool,
}

impl Default for DotOptions {
    fn default() -> Self {
        Self { highlight: NodeSet::new(), skip_trivial: true }
    }
}

/// Render `nodes` of `graph` as DOT text.
///
/// Ids in `nodes` that are not part of the graph are ignored.
pub fn render_dot(graph: &PetriGraph, nodes: &NodeSet, options: &DotOptions) -> String {
    let resolver = CollapseResolver::new(graph);
    let shown: NodeSet = nodes
        .iter()
        .filter(|n| graph.contains(n))
        .filter(|n| !options.skip_trivial || !resolver.is_trivial(n) || options.highlight.contains(*n))
        .cloned()
        .collect();
    let collapse = CollapseOptions::default().with_retain(options.highlight.clone());

    let mut out = String::from("digraph {\n");
    for n in &shown {
        out.push_str(&node_line(graph, n, options.highlight.contains(n)));
        out.push('\n');
        for s in resolver.neighbors(n, Direction::Forward, options.skip_trivial, &collapse) {
            if shown.contains(&s) {
                out.push_str(&format!("{} -> {}\n", quote(n.as_str()), quote(s.as_str())));
            }
        }
    }
    out.push_str("}\n");

    tracing::debug!(nodes = shown.len(), "rendered dot");
    out
}

/// Render and write DOT text.
pub fn write_dot<W: Write>(
    writer: &mut W,
    graph: &PetriGraph,
    nodes: &NodeSet,
    options: &DotOptions,
) -> std::io::Result<()> {
    writer.write_all(render_dot(graph, nodes, options).as_bytes())
}

fn node_line(graph: &PetriGraph, n: &NodeId, highlighted: bool) -> String {
    let label = graph.label(n).unwrap_or_default();
    let mut props = Vec::with_capacity(3);
    if graph.is_transition(n) {
        props.push("shape=rectangle".to_string());
    }
    if highlighted {
        props.push("style=filled".to_string());
    }
    props.push(format!("label={}", quote(&format!("{}:{}", n, label))));
    format!("{} [{}]", quote(n.as_str()), props.join(","))
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
