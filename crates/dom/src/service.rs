//! DOM Service - builds the arena from a page snapshot
//!
//! This handles:
//! - Parsing the snapshot JSON (CDP node shape plus layout/state)
//! - Linking children and shadow roots
//! - Recording the viewport
//! - Dropping malformed subtrees without losing the rest of the page
//!
//! The page script sends a flat list in document order, root first. Each node
//! names its parent, so the JSON nesting stays fixed however deep the page
//! is. A `#document-fragment` whose parent is an element is that element's
//! shadow root.
//!
//! ```json
//! {
//!   "viewport": { "width": 1200, "height": 800 },
//!   "nodes": [
//!     { "nodeId": 0, "nodeType": 1, "nodeName": "BODY",
//!       "attributes": ["class", "app"],
//!       "layout": { "x": 0, "y": 0, "width": 1200, "height": 800,
//!                   "display": "block", "visibility": "visible",
//!                   "opacity": 1, "cursor": "auto" } },
//!     { "nodeId": 1, "parentId": 0, "nodeType": 1, "nodeName": "BUTTON", ... }
//!   ]
//! }
//! ```
//!
//! A nested `root` object with `children` / `shadowRoots` arrays is accepted
//! as well, which keeps hand-written fixtures readable.

use crate::arena::DomArena;
use crate::error::{DomError, Result};
use crate::types::*;
use ahash::AHashSet;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Configuration for DOM service
#[derive(Debug, Clone)]
pub struct DomServiceConfig {
    /// Deepest nesting accepted from the page
    pub max_depth: usize,
}

impl Default for DomServiceConfig {
    fn default() -> Self {
        Self { max_depth: 512 }
    }
}

enum SnapshotBody<'a> {
    Flat(&'a [Value]),
    Nested(&'a Value),
}

/// Main DOM service
pub struct DomService {
    config: DomServiceConfig,
    arena: DomArena,
}

impl DomService {
    /// Create new DOM service with default config
    pub fn new() -> Self {
        Self::with_config(DomServiceConfig::default())
    }

    /// Create DOM service with custom config
    pub fn with_config(config: DomServiceConfig) -> Self {
        Self {
            config,
            arena: DomArena::new(),
        }
    }

    /// Get reference to internal arena
    pub fn arena(&self) -> &DomArena {
        &self.arena
    }

    /// Get mutable reference to internal arena
    pub fn arena_mut(&mut self) -> &mut DomArena {
        &mut self.arena
    }

    /// Hand the arena over to the caller
    pub fn into_arena(self) -> DomArena {
        self.arena
    }

    /// Parse a page snapshot and rebuild the arena from it.
    ///
    /// The arena is cleared first, so it gets a new document id. Only a bad
    /// root or viewport fails the whole parse; any other malformed node is
    /// dropped with its subtree and listed in
    /// [`DomArena::snapshot_errors`].
    pub fn parse_snapshot(&mut self, snapshot: &Value) -> Result<NodeId> {
        let body = if let Some(nodes) = snapshot.get("nodes") {
            let nodes = nodes
                .as_array()
                .ok_or_else(|| DomError::Snapshot("'nodes' must be an array".to_string()))?;
            SnapshotBody::Flat(nodes)
        } else if let Some(root) = snapshot.get("root") {
            SnapshotBody::Nested(root)
        } else {
            return Err(DomError::Snapshot(
                "Missing 'nodes' or 'root' in snapshot".to_string(),
            ));
        };

        self.arena.clear();

        if let Some(viewport) = snapshot.get("viewport") {
            let width = viewport["width"].as_f64();
            let height = viewport["height"].as_f64();
            match (width, height) {
                (Some(width), Some(height)) => {
                    self.arena.set_viewport(Viewport::new(width, height))
                }
                _ => return Err(DomError::Snapshot("Malformed 'viewport'".to_string())),
            }
        }

        let root_id = match body {
            SnapshotBody::Flat(nodes) => self.parse_flat(nodes)?,
            SnapshotBody::Nested(root) => self.parse_tree(root, None, 0)?,
        };
        self.arena.set_root(root_id)?;

        tracing::debug!(
            nodes = self.arena.len(),
            dropped = self.arena.snapshot_errors().len(),
            document = %self.arena.document_id(),
            "parsed page snapshot"
        );

        Ok(root_id)
    }

    /// Build the arena from the flat list, linking each node to its parent
    fn parse_flat(&mut self, entries: &[Value]) -> Result<NodeId> {
        let (first, rest) = entries
            .split_first()
            .ok_or_else(|| DomError::Snapshot("Empty 'nodes' list".to_string()))?;
        if !first["parentId"].is_null() {
            return Err(DomError::Snapshot("First node must be the root".to_string()));
        }

        let root_id = self.arena.add_node(parse_node(first)?);

        // Indexed by NodeId, in step with the arena
        let mut depths: Vec<usize> = vec![0];
        // Snapshot ids of dropped nodes; their descendants go with them
        let mut dropped: AHashSet<u64> = AHashSet::new();
        let mut dropped_descendants = 0usize;

        for raw in rest {
            let own_id = raw["nodeId"].as_u64();

            let Some(parent_snapshot_id) = raw["parentId"].as_u64() else {
                self.record_dropped(raw, DomError::Snapshot("Missing parentId".to_string()));
                dropped.extend(own_id);
                continue;
            };

            if dropped.contains(&parent_snapshot_id) {
                dropped.extend(own_id);
                dropped_descendants += 1;
                continue;
            }

            let parent_id = SnapshotId::try_from(parent_snapshot_id)
                .ok()
                .and_then(|id| self.arena.get_by_snapshot_id(id).ok())
                .map(|parent| parent.node_id);
            let parent_id = match parent_id {
                Some(parent_id) => parent_id,
                None => {
                    let error = DomError::Snapshot(format!("Unknown parent {}", parent_snapshot_id));
                    self.record_dropped(raw, error);
                    dropped.extend(own_id);
                    continue;
                }
            };

            let depth = depths[parent_id as usize] + 1;
            if depth > self.config.max_depth {
                let error = DomError::MaxDepthExceeded {
                    current: depth,
                    max: self.config.max_depth,
                };
                self.record_dropped(raw, error);
                dropped.extend(own_id);
                continue;
            }

            let mut node = match parse_node(raw) {
                Ok(node) => node,
                Err(error) => {
                    self.record_dropped(raw, error);
                    dropped.extend(own_id);
                    continue;
                }
            };

            if self.arena.get_by_snapshot_id(node.snapshot_id).is_ok() {
                let error = DomError::Snapshot(format!("Duplicate nodeId {}", node.snapshot_id));
                self.record_dropped(raw, error);
                continue;
            }

            node.parent_id = Some(parent_id);
            let is_shadow_root = node.is_fragment();
            let node_id = self.arena.add_node(node);
            depths.push(depth);

            let parent = self.arena.get_mut(parent_id)?;
            if is_shadow_root && parent.is_element() {
                parent
                    .shadow_root_ids
                    .get_or_insert_with(SmallVec::new)
                    .push(node_id);
            } else {
                parent.children_ids.push(node_id);
            }
        }

        if dropped_descendants > 0 {
            tracing::debug!(dropped_descendants, "skipped nodes below dropped subtrees");
        }

        Ok(root_id)
    }

    /// Recursively parse a nested snapshot node. Errors on `raw` itself are
    /// returned; errors below it drop only the offending child.
    fn parse_tree(&mut self, raw: &Value, parent_id: Option<NodeId>, depth: usize) -> Result<NodeId> {
        if depth > self.config.max_depth {
            return Err(DomError::MaxDepthExceeded {
                current: depth,
                max: self.config.max_depth,
            });
        }

        let mut node = parse_node(raw)?;
        node.parent_id = parent_id;
        let current_node_id = self.arena.add_node(node);

        if let Some(children) = raw["children"].as_array() {
            let mut child_ids = SmallVec::new();
            for child in children {
                match self.parse_tree(child, Some(current_node_id), depth + 1) {
                    Ok(child_id) => child_ids.push(child_id),
                    Err(error) => self.record_dropped(child, error),
                }
            }
            self.arena.get_mut(current_node_id)?.children_ids = child_ids;
        }

        if let Some(shadow_roots) = raw["shadowRoots"].as_array() {
            let mut shadow_ids = SmallVec::new();
            for shadow in shadow_roots {
                match self.parse_tree(shadow, Some(current_node_id), depth + 1) {
                    Ok(shadow_id) => shadow_ids.push(shadow_id),
                    Err(error) => self.record_dropped(shadow, error),
                }
            }
            self.arena.get_mut(current_node_id)?.shadow_root_ids = Some(shadow_ids);
        }

        Ok(current_node_id)
    }

    fn record_dropped(&mut self, raw: &Value, error: DomError) {
        let message = format!("snapshot node {}: {}", raw["nodeId"], error);
        tracing::warn!(%message, "dropping malformed snapshot subtree");
        self.arena.record_snapshot_error(message);
    }
}

/// One node without its links
fn parse_node(raw: &Value) -> Result<DomNode> {
    let snapshot_id = raw["nodeId"]
        .as_u64()
        .and_then(|id| SnapshotId::try_from(id).ok())
        .ok_or_else(|| DomError::Snapshot("Missing or invalid nodeId".to_string()))?;

    let node_type_val = raw["nodeType"]
        .as_u64()
        .ok_or_else(|| DomError::Snapshot("Missing nodeType".to_string()))?;

    let node_type = u8::try_from(node_type_val)
        .ok()
        .and_then(NodeType::from_u8)
        .ok_or_else(|| DomError::InvalidNodeType {
            expected: "1, 3 or 11".to_string(),
            actual: format!("{}", node_type_val),
        })?;

    let node_name = raw["nodeName"].as_str().unwrap_or("");
    let mut node = DomNode::new(snapshot_id, node_type, node_name);
    node.node_value = raw["nodeValue"].as_str().unwrap_or("").to_string();
    node.attributes = parse_attributes(&raw["attributes"]);
    node.layout = raw.get("layout").and_then(parse_layout).map(Box::new);
    node.state = raw.get("state").and_then(parse_state).map(Box::new);
    Ok(node)
}

impl Default for DomService {
    fn default() -> Self {
        Self::new()
    }
}

/// Flat `[k, v, k, v]` list; a trailing key without value is dropped
fn parse_attributes(raw: &Value) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    if let Some(attrs) = raw.as_array() {
        for pair in attrs.chunks_exact(2) {
            if let (Some(key), Some(value)) = (pair[0].as_str(), pair[1].as_str()) {
                attributes.insert(key.to_string(), value.to_string());
            }
        }
    }
    attributes
}

fn parse_layout(raw: &Value) -> Option<Layout> {
    let bounds = DomRect::new(
        raw["x"].as_f64()?,
        raw["y"].as_f64()?,
        raw["width"].as_f64()?,
        raw["height"].as_f64()?,
    );

    // Computed opacity arrives as a string from getComputedStyle
    let opacity = match &raw["opacity"] {
        Value::Number(n) => n.as_f64().unwrap_or(1.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(1.0),
        _ => 1.0,
    };

    Some(Layout {
        bounds,
        display: raw["display"].as_str().unwrap_or("block").to_string(),
        visibility: raw["visibility"].as_str().unwrap_or("visible").to_string(),
        opacity,
        cursor: raw["cursor"].as_str().unwrap_or("auto").to_string(),
    })
}

fn parse_state(raw: &Value) -> Option<ControlState> {
    if !raw.is_object() {
        return None;
    }
    Some(ControlState {
        checked: raw["checked"].as_bool().unwrap_or(false),
        disabled: raw["disabled"].as_bool().unwrap_or(false),
        value: raw["value"].as_str().map(String::from),
        selected_text: raw["selectedText"].as_str().map(String::from),
        has_click_handler: raw["hasClickHandler"].as_bool().unwrap_or(false),
    })
}
