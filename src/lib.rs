//! # petri-slicer
//!
//! Dependency slicing for place/transition graphs.
//!
//! The slicer answers comprehension questions about a Petri-net-like
//! dependency graph:
//!
//! > What can this node lead to? What does it depend on? What lies between
//! > these two nodes, and why can this one happen at all?
//!
//! ## Core Contract
//!
//! 1. Load a graph of places and transitions from a declaration
//! 2. Compute forward/backward slices and chops bounded by stop/exclude walls
//! 3. Explain nodes with AND/OR causal traces, looking through trivial places
//! 4. Reduce the graph to a node subset, pushing edges through removed nodes
//!
//! ## Architecture
//!
//! ```text
//! NetDeclaration → PetriGraph → Slicer / CollapseResolver → TraceEngine
//!                       ↓                                        ↓
//!                  restrict()  → render_dot()               TraceSink
//! ```
//!
//! ## Approximation
//!
//! Every reduction here is a comprehension aid, not a semantics-preserving
//! transformation: a transition may have predecessors hidden by a stop or
//! exclude set. Always correlate a reduced view with the whole graph.
//!
//! ## Termination
//!
//! Cycles are normal input. Closures only grow and are bounded by the node
//! count; collapse, trace and filter walks are guarded by memo tables and
//! visited sets, so every operation terminates on cyclic graphs.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod graph;
pub mod closure;
pub mod collapse;
pub mod trace;
pub mod filter;
pub mod render;
pub mod query;
mod canonical;

// Re-exports
pub use types::{NodeId, NodeKind, NodeSet, Quantifier, Direction, Edge, node_set};
pub use types::{NodeDecl, NetDeclaration, LoadError};
pub use graph::{PetriGraph, GraphError, GraphFingerprint};
pub use closure::{Slicer, SliceBounds, ChopBounds};
pub use collapse::{CollapseResolver, CollapseWalk, CollapseOptions};
pub use trace::{TraceEngine, TraceOptions, TraceRecord, TraceEntry, TraceSink, TracingSink, TextSink};
pub use render::{render_dot, write_dot, DotOptions};
pub use query::{AnalysisQuery, AnalysisMode, AnalysisReport, ResolvedSets};

/// Schema version for graph fingerprints.
/// Increment on changes to how graphs are canonicalized.
pub const SLICER_SCHEMA_VERSION: &str = "1.0.0";

/// Default analysis query version identifier.
pub const DEFAULT_QUERY_VERSION: &str = "analysis_query_v1";
