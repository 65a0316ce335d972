//! Identifier registry and per-pass seen set
//!
//! A registry belongs to exactly one extraction pass over one document. It is
//! never carried over: the next pass builds a new one, and identifiers from the
//! old one only ever resolve through the marker check in [`crate::resolver`].

use crate::types::{NodeId, SnapshotId};
use ahash::{AHashMap, AHashSet};
use uuid::Uuid;

/// Where an identifier points in the snapshot it was allocated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryEntry {
    pub node_id: NodeId,
    pub snapshot_id: SnapshotId,
}

/// Bijection between identifiers (1..=N) and captured elements
#[derive(Debug, Clone)]
pub struct IdRegistry {
    document_id: Uuid,
    pass_id: Uuid,
    /// Index `i` holds identifier `i + 1`
    entries: Vec<RegistryEntry>,
    by_node: AHashMap<NodeId, u32>,
}

impl IdRegistry {
    /// Start an empty registry for a pass over `document_id`
    pub fn new(document_id: Uuid) -> Self {
        Self {
            document_id,
            pass_id: Uuid::new_v4(),
            entries: Vec::new(),
            by_node: AHashMap::new(),
        }
    }

    /// Allocate the next identifier for `node_id`.
    ///
    /// An element already registered keeps its identifier.
    pub fn allocate(&mut self, node_id: NodeId, snapshot_id: SnapshotId) -> u32 {
        if let Some(&id) = self.by_node.get(&node_id) {
            return id;
        }
        self.entries.push(RegistryEntry {
            node_id,
            snapshot_id,
        });
        let id = self.entries.len() as u32;
        self.by_node.insert(node_id, id);
        id
    }

    pub fn get(&self, id: u32) -> Option<RegistryEntry> {
        let index = (id as usize).checked_sub(1)?;
        self.entries.get(index).copied()
    }

    pub fn id_of(&self, node_id: NodeId) -> Option<u32> {
        self.by_node.get(&node_id).copied()
    }

    pub fn document_id(&self) -> Uuid {
        self.document_id
    }

    pub fn pass_id(&self) -> Uuid {
        self.pass_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(identifier, entry)` in allocation order
    pub fn iter(&self) -> impl Iterator<Item = (u32, RegistryEntry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (idx as u32 + 1, *entry))
    }
}

/// Elements captured so far in the current pass
#[derive(Debug, Default)]
pub struct SeenSet {
    nodes: AHashSet<NodeId>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node_id: NodeId) -> bool {
        self.nodes.insert(node_id)
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains(&node_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
