//! Arena-based storage for one page snapshot
//!
//! Nodes live in one `Vec` and point at each other by `u32` index. Walks over
//! the arena use explicit stacks, so a deep page cannot overflow ours.
//!
//! ```text
//! nodes:          [body][div][#text][button][#document-fragment]...
//! snapshot ids:   ordinal from the page script → index above
//! document_id:    new UUID per snapshot
//! ```
//!
//! A fresh parse means a fresh `document_id`, which is how identifiers from an
//! older snapshot are recognised as belonging to a different document.

use crate::error::{DomError, Result};
use crate::types::{DomNode, NodeId, SnapshotId, Viewport};
use ahash::AHashMap;
use uuid::Uuid;

/// Flat store of every node in one snapshot
#[derive(Debug)]
pub struct DomArena {
    /// Indexed by `NodeId`
    nodes: Vec<DomNode>,

    /// Snapshot ordinal → NodeId lookup (used to address live elements)
    snapshot_id_map: AHashMap<SnapshotId, NodeId>,

    /// Root node ID (document body)
    root_id: Option<NodeId>,

    viewport: Viewport,

    document_id: Uuid,

    /// Subtrees the parser dropped, one message each
    snapshot_errors: Vec<String>,
}

impl DomArena {
    /// Create a new empty arena
    pub fn new() -> Self {
        Self::with_capacity(1024) // Pre-allocate for typical page
    }

    /// Create arena with specific capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            snapshot_id_map: AHashMap::with_capacity(capacity),
            root_id: None,
            viewport: Viewport::default(),
            document_id: Uuid::new_v4(),
            snapshot_errors: Vec::new(),
        }
    }

    /// Add a node to the arena, returns its ID
    pub fn add_node(&mut self, mut node: DomNode) -> NodeId {
        let node_id = self.nodes.len() as NodeId;
        node.node_id = node_id;
        self.snapshot_id_map.insert(node.snapshot_id, node_id);
        self.nodes.push(node);
        node_id
    }

    /// Get node by ID (immutable)
    pub fn get(&self, node_id: NodeId) -> Result<&DomNode> {
        self.nodes
            .get(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    /// Get node by ID (mutable)
    pub fn get_mut(&mut self, node_id: NodeId) -> Result<&mut DomNode> {
        self.nodes
            .get_mut(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    /// Get node by the ordinal the snapshot script assigned
    pub fn get_by_snapshot_id(&self, snapshot_id: SnapshotId) -> Result<&DomNode> {
        let node_id = self
            .snapshot_id_map
            .get(&snapshot_id)
            .ok_or(DomError::NodeNotFound(snapshot_id))?;
        self.get(*node_id)
    }

    /// Mark `node_id` as the document body
    pub fn set_root(&mut self, node_id: NodeId) -> Result<()> {
        self.get(node_id)?;
        self.root_id = Some(node_id);
        Ok(())
    }

    /// Get root node ID
    pub fn root_id(&self) -> Option<NodeId> {
        self.root_id
    }

    /// Get root node
    pub fn root(&self) -> Result<&DomNode> {
        let root_id = self
            .root_id
            .ok_or_else(|| DomError::Snapshot("No root node set".to_string()))?;
        self.get(root_id)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Identity of the document this snapshot was taken from
    pub fn document_id(&self) -> Uuid {
        self.document_id
    }

    /// Total number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if arena is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in insertion order (parents before their children)
    pub fn iter(&self) -> impl Iterator<Item = &DomNode> {
        self.nodes.iter()
    }

    pub fn record_snapshot_error(&mut self, message: String) {
        self.snapshot_errors.push(message);
    }

    /// Subtrees dropped while parsing this snapshot
    pub fn snapshot_errors(&self) -> &[String] {
        &self.snapshot_errors
    }

    /// Element ancestors, nearest first, the way `parentElement` walks them:
    /// the chain ends at a fragment boundary or the top of the tree.
    pub fn element_ancestors(&self, node_id: NodeId) -> ElementAncestors<'_> {
        let next = self
            .nodes
            .get(node_id as usize)
            .and_then(|n| n.parent_id);
        ElementAncestors { arena: self, next }
    }

    /// Root of the tree containing `node_id`: a fragment for shadow content,
    /// otherwise the topmost node.
    pub fn tree_root(&self, node_id: NodeId) -> Result<NodeId> {
        let mut current = self.get(node_id)?;
        while !current.is_fragment() {
            match current.parent_id {
                Some(parent_id) => current = self.get(parent_id)?,
                None => break,
            }
        }
        Ok(current.node_id)
    }

    /// Traverse one tree depth-first (iterative, no recursion).
    ///
    /// `visit` returns whether to descend into the node's children. Shadow
    /// roots are separate trees and are not entered.
    pub fn traverse_df<F>(&self, start_id: NodeId, mut visit: F) -> Result<()>
    where
        F: FnMut(&DomNode) -> Result<bool>,
    {
        let mut stack = vec![start_id];

        while let Some(node_id) = stack.pop() {
            let node = self.get(node_id)?;
            if !visit(node)? {
                continue;
            }

            // Push children in reverse order (so they're visited left-to-right)
            for &child_id in node.children_ids.iter().rev() {
                stack.push(child_id);
            }
        }

        Ok(())
    }

    /// First element in document order within one tree matching `predicate`
    pub fn find_in_tree<F>(&self, tree_root: NodeId, predicate: F) -> Result<Option<NodeId>>
    where
        F: Fn(&DomNode) -> bool,
    {
        let mut found = None;
        self.traverse_df(tree_root, |node| {
            if found.is_some() {
                return Ok(false);
            }
            if node.is_element() && predicate(node) {
                found = Some(node.node_id);
                return Ok(false);
            }
            Ok(true)
        })?;
        Ok(found)
    }

    /// Find the element carrying `marker == value`, across every tree
    pub fn find_marked(&self, marker: &str, value: &str) -> Option<NodeId> {
        self.nodes.iter().find_map(|node| {
            if node.is_element() && node.attr(marker) == Some(value) {
                Some(node.node_id)
            } else {
                None
            }
        })
    }

    /// Remove `marker` from every element, returns how many were cleared
    pub fn clear_markers(&mut self, marker: &str) -> usize {
        self.nodes
            .iter_mut()
            .filter_map(|node| node.attributes.remove(marker))
            .count()
    }

    /// Clear arena (reuse allocation). The arena now represents a new document.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.snapshot_id_map.clear();
        self.root_id = None;
        self.viewport = Viewport::default();
        self.document_id = Uuid::new_v4();
        self.snapshot_errors.clear();
    }
}

impl Default for DomArena {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator returned by [`DomArena::element_ancestors`]
pub struct ElementAncestors<'a> {
    arena: &'a DomArena,
    next: Option<NodeId>,
}

impl<'a> Iterator for ElementAncestors<'a> {
    type Item = &'a DomNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.arena.get(self.next?).ok()?;
        if !node.is_element() {
            self.next = None;
            return None;
        }
        self.next = node.parent_id;
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeType;

    fn element(arena: &mut DomArena, snapshot_id: u32, name: &str, parent: Option<NodeId>) -> NodeId {
        let mut node = DomNode::new(snapshot_id, NodeType::Element, name);
        node.parent_id = parent;
        let id = arena.add_node(node);
        if let Some(parent_id) = parent {
            arena.get_mut(parent_id).unwrap().children_ids.push(id);
        }
        id
    }

    #[test]
    fn test_arena_basic() {
        let mut arena = DomArena::new();
        let id = element(&mut arena, 100, "DIV", None);
        assert_eq!(id, 0);

        let retrieved = arena.get(id).unwrap();
        assert_eq!(retrieved.node_name, "DIV");
        assert_eq!(retrieved.snapshot_id, 100);
        assert_eq!(arena.get_by_snapshot_id(100).unwrap().node_id, id);
    }

    #[test]
    fn test_traverse_df_order_and_pruning() {
        let mut arena = DomArena::new();
        let root = element(&mut arena, 1, "BODY", None);
        let a = element(&mut arena, 2, "DIV", Some(root));
        element(&mut arena, 3, "SPAN", Some(a));
        element(&mut arena, 4, "P", Some(root));

        let mut visited = Vec::new();
        arena
            .traverse_df(root, |node| {
                visited.push(node.node_name.clone());
                Ok(node.node_name != "DIV")
            })
            .unwrap();

        assert_eq!(visited, vec!["BODY", "DIV", "P"]);
    }

    #[test]
    fn test_element_ancestors_stop_at_fragment() {
        let mut arena = DomArena::new();
        let body = element(&mut arena, 1, "BODY", None);
        let host = element(&mut arena, 2, "MY-WIDGET", Some(body));

        let mut fragment = DomNode::new(3, NodeType::DocumentFragment, "#document-fragment");
        fragment.parent_id = Some(host);
        let fragment_id = arena.add_node(fragment);

        let inner = element(&mut arena, 4, "DIV", Some(fragment_id));
        let button = element(&mut arena, 5, "BUTTON", Some(inner));

        let names: Vec<_> = arena
            .element_ancestors(button)
            .map(|n| n.node_name.as_str())
            .collect();
        assert_eq!(names, vec!["DIV"]);
        assert_eq!(arena.tree_root(button).unwrap(), fragment_id);
        assert_eq!(arena.tree_root(host).unwrap(), body);
    }

    #[test]
    fn test_markers_round_trip() {
        let mut arena = DomArena::new();
        let body = element(&mut arena, 1, "BODY", None);
        let button = element(&mut arena, 2, "BUTTON", Some(body));

        arena
            .get_mut(button)
            .unwrap()
            .attributes
            .insert("data-interact-id".to_string(), "7".to_string());

        assert_eq!(arena.find_marked("data-interact-id", "7"), Some(button));
        assert_eq!(arena.clear_markers("data-interact-id"), 1);
        assert_eq!(arena.find_marked("data-interact-id", "7"), None);
    }

    #[test]
    fn test_clear_changes_document_identity() {
        let mut arena = DomArena::new();
        let before = arena.document_id();
        arena.record_snapshot_error("node 3: bad".to_string());
        arena.clear();
        assert_ne!(before, arena.document_id());
        assert!(arena.snapshot_errors().is_empty());
    }
}
