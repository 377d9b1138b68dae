//! Core types for Synaptica
//!
//! Defines the fundamental types shared by the store and its collaborators:
//! - Node identifiers
//! - The concept generator payload
//! - The nested, read-only node view handed to renderers

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ulid::Ulid;

/// Unique node identifier (ULID, opaque to callers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub Ulid);

impl NodeId {
    /// Generate new node ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

/// Concept generator response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptData {
    /// One-sentence description of the requested concept
    pub description: String,
    /// Sub-concept names, in the order the generator returned them
    pub subconcepts: Vec<String>,
}

impl ConceptData {
    /// Create new payload
    #[inline]
    #[must_use]
    pub fn new<I, S>(description: impl Into<String>, subconcepts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            description: description.into(),
            subconcepts: subconcepts.into_iter().map(Into::into).collect(),
        }
    }
}

/// Nested view of one node and its loaded descendants
///
/// Built from the arena on demand; mutating it has no effect on the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptNode {
    /// Node identifier
    pub id: NodeId,
    /// Concept label
    pub name: String,
    /// Present once the node's children have been fetched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Absent until the first successful fetch; `Some(vec![])` is a fetched leaf
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ConceptNode>>,
    /// Display intent
    pub is_expanded: bool,
    /// Fetch in flight for this node
    pub is_loading: bool,
    /// Root is 0
    pub depth: u32,
}

impl ConceptNode {
    /// Find a node by id in this subtree (iterative)
    #[must_use]
    pub fn find(&self, id: NodeId) -> Option<&ConceptNode> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.id == id {
                return Some(node);
            }
            if let Some(children) = &node.children {
                stack.extend(children.iter().rev());
            }
        }
        None
    }

    /// Find the first node with this name in pre-order
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&ConceptNode> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.name == name {
                return Some(node);
            }
            if let Some(children) = &node.children {
                stack.extend(children.iter().rev());
            }
        }
        None
    }

    /// Names of direct children, if fetched
    #[must_use]
    pub fn child_names(&self) -> Option<Vec<&str>> {
        self.children
            .as_ref()
            .map(|c| c.iter().map(|n| n.name.as_str()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, depth: u32) -> ConceptNode {
        ConceptNode {
            id: NodeId::new(),
            name: name.to_string(),
            description: None,
            children: None,
            is_expanded: false,
            is_loading: false,
            depth,
        }
    }

    #[test]
    fn node_id_generation() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn node_id_round_trips_through_display() {
        let id = NodeId::new();
        let parsed: NodeId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-ulid".parse::<NodeId>().is_err());
    }

    #[test]
    fn concept_data_builder() {
        let data = ConceptData::new("Study of change.", ["Limits", "Derivatives"]);
        assert_eq!(data.subconcepts, vec!["Limits", "Derivatives"]);
    }

    #[test]
    fn concept_node_find() {
        let child = leaf("Limits", 1);
        let child_id = child.id;
        let root = ConceptNode {
            children: Some(vec![leaf("Derivatives", 1), child]),
            is_expanded: true,
            ..leaf("Calculus", 0)
        };

        assert_eq!(root.find(child_id).map(|n| n.name.as_str()), Some("Limits"));
        assert_eq!(root.find_by_name("Derivatives").map(|n| n.depth), Some(1));
        assert!(root.find(NodeId::new()).is_none());
        assert_eq!(root.child_names(), Some(vec!["Derivatives", "Limits"]));
    }

    #[test]
    fn unfetched_node_serializes_without_children() {
        let json = serde_json::to_value(leaf("Limits", 1)).unwrap();
        assert!(json.get("children").is_none());
        assert_eq!(json["isExpanded"], false);
        assert_eq!(json["depth"], 1);
    }
}
