//! Concept tree arena
//!
//! All nodes live in one flat map keyed by [`NodeId`]; ordered child lists
//! live in a second map. Both are persistent (`im`) maps, so cloning a tree
//! for a snapshot shares structure and every mutation yields a new whole.
//!
//! A node is "fetched" exactly when it has an entry in the child map, even
//! if that entry is empty.

use crate::error::TreeError;
use crate::state_machine::{validate_transition, NodeStatus};
use crate::types::{ConceptData, ConceptNode, NodeId};
use im::HashMap as PersistentMap;
use std::collections::{HashMap, HashSet, VecDeque};

/// One node as stored in the arena
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    /// Node identifier
    pub id: NodeId,
    /// Concept label, fixed at creation
    pub name: String,
    /// Filled by the fetch that produced the node's children
    pub description: Option<String>,
    /// `None` only for the root
    pub parent: Option<NodeId>,
    /// Root is 0, fixed at creation
    pub depth: u32,
    /// Display intent
    pub is_expanded: bool,
    /// Fetch in flight
    pub is_loading: bool,
}

impl NodeRecord {
    fn child(id: NodeId, name: String, parent: NodeId, depth: u32) -> Self {
        Self {
            id,
            name,
            description: None,
            parent: Some(parent),
            depth,
            is_expanded: false,
            is_loading: false,
        }
    }
}

/// What to ask the concept generator for after [`ConceptTree::begin_fetch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Node whose children are being fetched
    pub node: NodeId,
    /// Name to send to the generator
    pub concept: String,
    /// Depth the new children will get
    pub child_depth: u32,
}

/// Rooted concept tree
#[derive(Debug, Clone, PartialEq)]
pub struct ConceptTree {
    root: NodeId,
    nodes: PersistentMap<NodeId, NodeRecord>,
    children: PersistentMap<NodeId, Vec<NodeId>>,
}

impl ConceptTree {
    /// Build a tree whose root is already fetched and expanded
    #[must_use]
    pub fn with_root(name: impl Into<String>, data: ConceptData) -> Self {
        let root = NodeId::new();
        let mut tree = Self {
            root,
            nodes: PersistentMap::new(),
            children: PersistentMap::new(),
        };
        tree.nodes.insert(
            root,
            NodeRecord {
                id: root,
                name: name.into(),
                description: Some(data.description),
                parent: None,
                depth: 0,
                is_expanded: true,
                is_loading: false,
            },
        );
        tree.attach(root, 1, data.subconcepts);
        tree
    }

    /// Root node id
    #[inline]
    #[must_use]
    pub fn root_id(&self) -> NodeId {
        self.root
    }

    /// Look up a node
    #[inline]
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(&id)
    }

    /// Check if a node exists
    #[inline]
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Ordered child ids; `None` if never fetched
    #[inline]
    #[must_use]
    pub fn children(&self, id: NodeId) -> Option<&[NodeId]> {
        self.children.get(&id).map(Vec::as_slice)
    }

    /// Total number of nodes
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterate over all node records (unordered)
    pub fn records(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values()
    }

    /// Fetch status of a node
    #[must_use]
    pub fn status(&self, id: NodeId) -> Option<NodeStatus> {
        self.nodes.get(&id).map(|record| self.status_of(record))
    }

    fn status_of(&self, record: &NodeRecord) -> NodeStatus {
        if record.is_loading {
            NodeStatus::Fetching
        } else if self.children.contains_key(&record.id) {
            NodeStatus::Fetched
        } else {
            NodeStatus::Unfetched
        }
    }

    /// Move an unfetched node to `Fetching`, marking it loading and expanded
    pub fn begin_fetch(&mut self, id: NodeId) -> Result<FetchRequest, TreeError> {
        let status = self.status(id).ok_or(TreeError::NodeNotFound(id))?;
        validate_transition(id, status, NodeStatus::Fetching)?;

        let record = self.record_mut(id)?;
        record.is_loading = true;
        record.is_expanded = true;

        Ok(FetchRequest {
            node: id,
            concept: record.name.clone(),
            child_depth: record.depth + 1,
        })
    }

    /// Attach fetched children; returns how many were created
    pub fn complete_fetch(&mut self, id: NodeId, data: ConceptData) -> Result<usize, TreeError> {
        let status = self.status(id).ok_or(TreeError::NodeNotFound(id))?;
        validate_transition(id, status, NodeStatus::Fetched)?;

        let record = self.record_mut(id)?;
        record.description = Some(data.description);
        record.is_loading = false;
        record.is_expanded = true;
        let child_depth = record.depth + 1;

        Ok(self.attach(id, child_depth, data.subconcepts))
    }

    /// Revert a failed fetch: not loading, collapsed, still no children
    pub fn fail_fetch(&mut self, id: NodeId) -> Result<(), TreeError> {
        let status = self.status(id).ok_or(TreeError::NodeNotFound(id))?;
        validate_transition(id, status, NodeStatus::Unfetched)?;

        let record = self.record_mut(id)?;
        record.is_loading = false;
        record.is_expanded = false;
        Ok(())
    }

    /// Show an already fetched node's children; returns whether anything changed
    pub fn expand_fetched(&mut self, id: NodeId) -> Result<bool, TreeError> {
        match self.status(id) {
            None => Err(TreeError::NodeNotFound(id)),
            Some(NodeStatus::Fetched) => {
                let record = self.record_mut(id)?;
                let changed = !record.is_expanded;
                record.is_expanded = true;
                Ok(changed)
            }
            Some(_) => Err(TreeError::NotFetched(id)),
        }
    }

    /// Hide a node's children without discarding them.
    ///
    /// A node that is `Fetching` stays expanded; returns whether anything changed.
    pub fn collapse(&mut self, id: NodeId) -> Result<bool, TreeError> {
        match self.status(id) {
            None => Err(TreeError::NodeNotFound(id)),
            Some(NodeStatus::Fetching) => Ok(false),
            Some(_) => {
                let record = self.record_mut(id)?;
                let changed = record.is_expanded;
                record.is_expanded = false;
                Ok(changed)
            }
        }
    }

    /// Nodes a renderer would show, in display order
    #[must_use]
    pub fn visible_order(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(record) = self.nodes.get(&id) else {
                continue;
            };
            out.push(id);
            if record.is_expanded {
                if let Some(kids) = self.children.get(&id) {
                    stack.extend(kids.iter().rev().copied());
                }
            }
        }
        out
    }

    /// Build the nested view of the subtree rooted at `id`
    #[must_use]
    pub fn to_nested(&self, id: NodeId) -> Option<ConceptNode> {
        if !self.nodes.contains_key(&id) {
            return None;
        }

        let mut preorder = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            preorder.push(current);
            if let Some(kids) = self.children.get(&current) {
                stack.extend(kids.iter().copied());
            }
        }

        // Reverse pre-order visits every child before its parent.
        let mut built: HashMap<NodeId, ConceptNode> = HashMap::with_capacity(preorder.len());
        for current in preorder.into_iter().rev() {
            let Some(record) = self.nodes.get(&current) else {
                continue;
            };
            let children = self
                .children
                .get(&current)
                .map(|kids| kids.iter().filter_map(|k| built.remove(k)).collect());
            built.insert(
                current,
                ConceptNode {
                    id: record.id,
                    name: record.name.clone(),
                    description: record.description.clone(),
                    children,
                    is_expanded: record.is_expanded,
                    is_loading: record.is_loading,
                    depth: record.depth,
                },
            );
        }
        built.remove(&id)
    }

    /// Nested view of the whole tree
    #[must_use]
    pub fn to_root_node(&self) -> Option<ConceptNode> {
        self.to_nested(self.root)
    }

    /// Check every structural invariant of the tree
    pub fn validate(&self) -> Result<(), TreeError> {
        let root = self
            .nodes
            .get(&self.root)
            .ok_or(TreeError::NodeNotFound(self.root))?;
        if root.depth != 0 || root.parent.is_some() {
            return Err(violation(self.root, "root must have depth 0 and no parent"));
        }

        let mut seen: HashSet<NodeId> = HashSet::with_capacity(self.nodes.len());
        for (parent_id, kids) in self.children.iter() {
            let parent = self
                .nodes
                .get(parent_id)
                .ok_or(TreeError::NodeNotFound(*parent_id))?;
            for kid_id in kids {
                let kid = self
                    .nodes
                    .get(kid_id)
                    .ok_or(TreeError::NodeNotFound(*kid_id))?;
                if !seen.insert(*kid_id) {
                    return Err(violation(*kid_id, "listed under more than one parent"));
                }
                if kid.parent != Some(*parent_id) {
                    return Err(violation(*kid_id, "parent link does not match child list"));
                }
                if kid.depth != parent.depth + 1 {
                    return Err(violation(*kid_id, "depth is not parent depth + 1"));
                }
            }
        }

        for record in self.nodes.values() {
            if record.is_loading && !record.is_expanded {
                return Err(violation(record.id, "loading node is not expanded"));
            }
            if record.is_loading && self.children.contains_key(&record.id) {
                return Err(violation(record.id, "loading node already has children"));
            }
        }

        let mut reached = 0usize;
        let mut queue = VecDeque::from([self.root]);
        while let Some(id) = queue.pop_front() {
            reached += 1;
            if let Some(kids) = self.children.get(&id) {
                queue.extend(kids.iter().copied());
            }
        }
        if reached != self.nodes.len() {
            return Err(violation(
                self.root,
                &format!("{} of {} nodes reachable", reached, self.nodes.len()),
            ));
        }

        Ok(())
    }

    fn record_mut(&mut self, id: NodeId) -> Result<&mut NodeRecord, TreeError> {
        self.nodes.get_mut(&id).ok_or(TreeError::NodeNotFound(id))
    }

    fn mint_id(&self) -> NodeId {
        loop {
            let id = NodeId::new();
            if !self.nodes.contains_key(&id) {
                return id;
            }
        }
    }

    fn attach(&mut self, parent: NodeId, depth: u32, names: Vec<String>) -> usize {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let id = self.mint_id();
            self.nodes
                .insert(id, NodeRecord::child(id, name, parent, depth));
            ids.push(id);
        }
        let count = ids.len();
        self.children.insert(parent, ids);
        count
    }
}

fn violation(node: NodeId, reason: &str) -> TreeError {
    TreeError::InvariantViolated {
        node,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calculus() -> ConceptTree {
        ConceptTree::with_root(
            "Calculus",
            ConceptData::new("Study of change.", ["Limits", "Derivatives", "Integrals"]),
        )
    }

    fn child_named(tree: &ConceptTree, parent: NodeId, name: &str) -> NodeId {
        tree.children(parent)
            .unwrap()
            .iter()
            .copied()
            .find(|id| tree.get(*id).unwrap().name == name)
            .unwrap()
    }

    #[test]
    fn root_is_fetched_and_expanded() {
        let tree = calculus();
        let root = tree.get(tree.root_id()).unwrap();

        assert_eq!(root.depth, 0);
        assert!(root.is_expanded);
        assert_eq!(root.description.as_deref(), Some("Study of change."));
        assert_eq!(tree.status(tree.root_id()), Some(NodeStatus::Fetched));
        assert_eq!(tree.node_count(), 4);
        tree.validate().unwrap();
    }

    #[test]
    fn children_keep_generator_order() {
        let tree = calculus();
        let names: Vec<_> = tree
            .children(tree.root_id())
            .unwrap()
            .iter()
            .map(|id| tree.get(*id).unwrap().name.as_str())
            .collect();
        assert_eq!(names, ["Limits", "Derivatives", "Integrals"]);
    }

    #[test]
    fn fetch_lifecycle() {
        let mut tree = calculus();
        let limits = child_named(&tree, tree.root_id(), "Limits");
        assert_eq!(tree.status(limits), Some(NodeStatus::Unfetched));

        let request = tree.begin_fetch(limits).unwrap();
        assert_eq!(request.concept, "Limits");
        assert_eq!(request.child_depth, 2);
        let record = tree.get(limits).unwrap();
        assert!(record.is_loading && record.is_expanded);
        tree.validate().unwrap();

        let count = tree
            .complete_fetch(limits, ConceptData::new("Approach.", ["Epsilon-delta"]))
            .unwrap();
        assert_eq!(count, 1);
        let record = tree.get(limits).unwrap();
        assert!(!record.is_loading && record.is_expanded);
        assert_eq!(tree.status(limits), Some(NodeStatus::Fetched));
        let eps = tree.children(limits).unwrap()[0];
        assert_eq!(tree.get(eps).unwrap().depth, 2);
        tree.validate().unwrap();
    }

    #[test]
    fn second_begin_fetch_is_rejected() {
        let mut tree = calculus();
        let limits = child_named(&tree, tree.root_id(), "Limits");
        tree.begin_fetch(limits).unwrap();
        assert!(matches!(
            tree.begin_fetch(limits),
            Err(TreeError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn fail_fetch_reverts_display() {
        let mut tree = calculus();
        let limits = child_named(&tree, tree.root_id(), "Limits");
        tree.begin_fetch(limits).unwrap();
        tree.fail_fetch(limits).unwrap();

        let record = tree.get(limits).unwrap();
        assert!(!record.is_loading);
        assert!(!record.is_expanded);
        assert!(tree.children(limits).is_none());
        assert_eq!(tree.status(limits), Some(NodeStatus::Unfetched));
    }

    #[test]
    fn empty_subconcepts_still_mark_fetched() {
        let mut tree = calculus();
        let limits = child_named(&tree, tree.root_id(), "Limits");
        tree.begin_fetch(limits).unwrap();
        tree.complete_fetch(limits, ConceptData::new("Leaf.", Vec::<String>::new()))
            .unwrap();

        assert_eq!(tree.children(limits), Some(&[][..]));
        assert_eq!(tree.status(limits), Some(NodeStatus::Fetched));
        assert!(tree.begin_fetch(limits).is_err());
    }

    #[test]
    fn collapse_keeps_children() {
        let mut tree = calculus();
        let root = tree.root_id();
        assert!(tree.collapse(root).unwrap());
        assert!(!tree.collapse(root).unwrap());
        assert_eq!(tree.children(root).unwrap().len(), 3);
        assert!(tree.expand_fetched(root).unwrap());
        assert!(tree.get(root).unwrap().is_expanded);
    }

    #[test]
    fn collapse_while_fetching_is_ignored() {
        let mut tree = calculus();
        let limits = child_named(&tree, tree.root_id(), "Limits");
        tree.begin_fetch(limits).unwrap();
        assert!(!tree.collapse(limits).unwrap());
        assert!(tree.get(limits).unwrap().is_expanded);
    }

    #[test]
    fn expand_fetched_requires_children() {
        let mut tree = calculus();
        let limits = child_named(&tree, tree.root_id(), "Limits");
        assert_eq!(tree.expand_fetched(limits), Err(TreeError::NotFetched(limits)));
        let missing = NodeId::new();
        assert_eq!(
            tree.expand_fetched(missing),
            Err(TreeError::NodeNotFound(missing))
        );
    }

    #[test]
    fn duplicate_names_get_distinct_ids() {
        let tree = ConceptTree::with_root("Sets", ConceptData::new("Collections.", ["Union", "Union"]));
        let kids = tree.children(tree.root_id()).unwrap();
        assert_eq!(kids.len(), 2);
        assert_ne!(kids[0], kids[1]);
    }

    #[test]
    fn visible_order_skips_collapsed_subtrees() {
        let mut tree = calculus();
        let root = tree.root_id();
        let limits = child_named(&tree, root, "Limits");
        tree.begin_fetch(limits).unwrap();
        tree.complete_fetch(limits, ConceptData::new("d", ["Epsilon-delta"]))
            .unwrap();

        let names = |tree: &ConceptTree| -> Vec<String> {
            tree.visible_order()
                .into_iter()
                .map(|id| tree.get(id).unwrap().name.clone())
                .collect()
        };
        assert_eq!(
            names(&tree),
            ["Calculus", "Limits", "Epsilon-delta", "Derivatives", "Integrals"]
        );

        tree.collapse(limits).unwrap();
        assert_eq!(names(&tree), ["Calculus", "Limits", "Derivatives", "Integrals"]);

        tree.collapse(root).unwrap();
        assert_eq!(names(&tree), ["Calculus"]);
    }

    #[test]
    fn nested_view_matches_arena() {
        let mut tree = calculus();
        let limits = child_named(&tree, tree.root_id(), "Limits");
        tree.begin_fetch(limits).unwrap();
        tree.complete_fetch(limits, ConceptData::new("d", ["Epsilon-delta"]))
            .unwrap();

        let root = tree.to_root_node().unwrap();
        assert_eq!(root.child_names(), Some(vec!["Limits", "Derivatives", "Integrals"]));
        let limits_view = root.find(limits).unwrap();
        assert_eq!(limits_view.child_names(), Some(vec!["Epsilon-delta"]));
        assert!(root.find_by_name("Derivatives").unwrap().children.is_none());
        assert!(tree.to_nested(NodeId::new()).is_none());
    }

    #[test]
    fn clone_is_an_independent_snapshot() {
        let mut tree = calculus();
        let before = tree.clone();
        let limits = child_named(&tree, tree.root_id(), "Limits");
        tree.begin_fetch(limits).unwrap();

        assert!(!before.get(limits).unwrap().is_loading);
        assert!(tree.get(limits).unwrap().is_loading);
    }
}
