//! Core types for the slicer.

pub mod node;
pub mod edge;
pub mod declaration;

pub use node::{NodeId, NodeKind, NodeSet, Quantifier, Direction, node_set};
pub use edge::Edge;
pub use declaration::{NodeDecl, NetDeclaration, LoadError};
