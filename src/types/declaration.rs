//! Net declarations: the input format the graph is built from.
//!
//! A net dump is a JSON object with two lists of node tuples:
//!
//! ```json
//! {
//!   "places":      [["p1", "ready", ["t1"]], ["p2", "done", 0, []]],
//!   "transitions": [["t1", "fire", ["p2"]]]
//! }
//! ```
//!
//! The first tuple element is always the id, the second the label and the
//! last the successor list. Some dumps carry one extra field before the
//! successor list (e.g. an initial marking); it is accepted and ignored.
//!
//! Ids may be strings or non-negative integers. Integers are read as their
//! decimal text, so `12` and `"12"` name the same node: an edge to `"12"`
//! reaches the node declared as `12`, and declaring both is a duplicate.

use std::io::Read;
use std::path::Path;

use serde::de::Error as _;
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::node::NodeId;
use crate::graph::GraphError;

/// Error type for loading a net declaration.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Reading the input failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The input is not a well-formed net declaration.
    #[error("Malformed net declaration: {0}")]
    Json(#[from] serde_json::Error),
    /// The declaration parsed but does not describe a valid graph.
    #[error("Invalid graph: {0}")]
    Graph(#[from] GraphError),
}

/// Declaration of one place or transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDecl {
    /// Node id.
    pub id: NodeId,
    /// Human-readable label.
    pub label: String,
    /// Successor ids in declaration order.
    pub successors: Vec<NodeId>,
}

impl NodeDecl {
    /// Create a new declaration.
    pub fn new<I, T>(id: impl Into<NodeId>, label: impl Into<String>, successors: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NodeId>,
    {
        Self {
            id: id.into(),
            label: label.into(),
            successors: successors.into_iter().map(Into::into).collect(),
        }
    }

    fn from_fields(fields: Vec<Value>) -> Result<Self, String> {
        let arity = fields.len();
        if !(3..=4).contains(&arity) {
            return Err(format!(
                "node tuple must have 3 or 4 fields, found {}",
                arity
            ));
        }

        let mut fields = fields.into_iter();
        let (Some(id), Some(label), Some(successors)) =
            (fields.next(), fields.next(), fields.last())
        else {
            return Err("node tuple is missing fields".to_string());
        };

        let id: NodeId = serde_json::from_value(id).map_err(|e| format!("bad node id: {}", e))?;
        let label = match label {
            Value::String(s) => s,
            other => return Err(format!("label of node {} must be a string, found {}", id, other)),
        };
        let successors: Vec<NodeId> = serde_json::from_value(successors)
            .map_err(|e| format!("bad successor list of node {}: {}", id, e))?;

        Ok(Self { id, label, successors })
    }
}

impl<'de> Deserialize<'de> for NodeDecl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Vec::<Value>::deserialize(deserializer)?;
        Self::from_fields(fields).map_err(D::Error::custom)
    }
}

impl Serialize for NodeDecl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(&self.id)?;
        tuple.serialize_element(&self.label)?;
        tuple.serialize_element(&self.successors)?;
        tuple.end()
    }
}

/// Parallel place and transition declarations of a whole net.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetDeclaration {
    /// Place declarations.
    #[serde(default)]
    pub places: Vec<NodeDecl>,
    /// Transition declarations.
    #[serde(default)]
    pub transitions: Vec<NodeDecl>,
}

impl NetDeclaration {
    /// Create a declaration from place and transition lists.
    pub fn new(places: Vec<NodeDecl>, transitions: Vec<NodeDecl>) -> Self {
        Self { places, transitions }
    }

    /// Parse a declaration from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a declaration from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Parse a declaration from a file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Total number of declared nodes.
    pub fn len(&self) -> usize {
        self.places.len() + self.transitions.len()
    }

    /// Whether nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.places.is_empty() && self.transitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_three_and_four_field_tuples() {
        let json = r#"{
            "places": [["p1", "ready", ["t1"]], [2, "done", 1, []]],
            "transitions": [["t1", "fire", ["2"]]]
        }"#;
        let decl = NetDeclaration::from_json_str(json).unwrap();

        assert_eq!(decl.len(), 3);
        assert_eq!(decl.places[0], NodeDecl::new("p1", "ready", ["t1"]));
        assert_eq!(decl.places[1].id, NodeId::new("2"));
        assert!(decl.places[1].successors.is_empty());
        assert_eq!(decl.transitions[0].successors, vec![NodeId::new("2")]);
    }

    #[test]
    fn test_reject_wrong_arity() {
        let json = r#"{"places": [["p1", ["t1"]]], "transitions": []}"#;
        let err = NetDeclaration::from_json_str(json).unwrap_err();
        assert!(matches!(err, LoadError::Json(_)));
        assert!(err.to_string().contains("3 or 4 fields"));
    }

    #[test]
    fn test_reject_non_string_label() {
        let json = r#"{"places": [["p1", 7, []]]}"#;
        assert!(NetDeclaration::from_json_str(json).is_err());
    }

    #[test]
    fn test_missing_lists_default_to_empty() {
        let decl = NetDeclaration::from_json_str("{}").unwrap();
        assert!(decl.is_empty());
    }

    #[test]
    fn test_serialize_as_tuples() {
        let decl = NetDeclaration::new(vec![NodeDecl::new("p1", "ready", ["t1"])], vec![]);
        let json = serde_json::to_string(&decl).unwrap();
        assert_eq!(json, r#"{"places":[["p1","ready",["t1"]]],"transitions":[]}"#);
    }
}
