//! Action resolver: identifier → element in the *current* document
//!
//! The marker attribute is the only source of truth. A registry is a shortcut
//! at best: its entry is trusted only when the node it names, in this very
//! arena, still carries the same marker.

use crate::arena::DomArena;
use crate::error::{DomError, Result};
use crate::registry::IdRegistry;
use crate::types::NodeId;

pub struct ActionResolver<'a> {
    arena: &'a DomArena,
    marker: &'a str,
}

impl<'a> ActionResolver<'a> {
    pub fn new(arena: &'a DomArena, marker: &'a str) -> Self {
        Self { arena, marker }
    }

    /// Find the element tagged with `id`, or fail with `StaleIdentifier`
    pub fn resolve(&self, id: u32) -> Result<NodeId> {
        let value = id.to_string();
        match self.arena.find_marked(self.marker, &value) {
            Some(node_id) => Ok(node_id),
            None => {
                tracing::debug!(id, document = %self.arena.document_id(), "identifier not found");
                Err(DomError::StaleIdentifier(id))
            }
        }
    }

    /// Like [`resolve`](Self::resolve), trying the registry entry first
    pub fn resolve_with(&self, registry: &IdRegistry, id: u32) -> Result<NodeId> {
        if registry.document_id() == self.arena.document_id() {
            if let Some(entry) = registry.get(id) {
                let tagged = self
                    .arena
                    .get(entry.node_id)
                    .ok()
                    .and_then(|node| node.attr(self.marker))
                    .is_some_and(|v| v == id.to_string());
                if tagged {
                    return Ok(entry.node_id);
                }
            }
        }
        self.resolve(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::Extractor;
    use crate::service::DomService;
    use crate::types::DEFAULT_MARKER_ATTRIBUTE;
    use serde_json::{json, Value};

    fn snapshot() -> Value {
        json!({
            "viewport": { "width": 1200, "height": 800 },
            "root": {
                "nodeId": 1, "nodeType": 1, "nodeName": "BODY",
                "layout": { "x": 0, "y": 0, "width": 1200, "height": 800 },
                "children": [
                    { "nodeId": 2, "nodeType": 1, "nodeName": "BUTTON",
                      "layout": { "x": 400, "y": 300, "width": 80, "height": 30 },
                      "children": [{ "nodeId": 3, "nodeType": 3, "nodeName": "#text", "nodeValue": "Buy" }] },
                    { "nodeId": 4, "nodeType": 1, "nodeName": "BUTTON",
                      "layout": { "x": 400, "y": 400, "width": 80, "height": 30 },
                      "children": [{ "nodeId": 5, "nodeType": 3, "nodeName": "#text", "nodeValue": "Sell" }] }
                ]
            }
        })
    }

    fn load() -> DomService {
        let mut service = DomService::new();
        service.parse_snapshot(&snapshot()).unwrap();
        service
    }

    #[test]
    fn test_resolves_within_same_document() {
        let mut service = load();
        let extraction = Extractor::new().extract(service.arena_mut()).unwrap();

        let resolver = ActionResolver::new(service.arena(), DEFAULT_MARKER_ATTRIBUTE);
        let node_id = resolver.resolve_with(&extraction.registry, 2).unwrap();
        assert_eq!(service.arena().get(node_id).unwrap().snapshot_id, 4);
        assert_eq!(resolver.resolve(2).unwrap(), node_id);
    }

    #[test]
    fn test_identifier_from_before_reload_is_stale() {
        let mut before = load();
        let extraction = Extractor::new().extract(before.arena_mut()).unwrap();
        assert_eq!(extraction.descriptors.len(), 2);

        // Same page loaded again: same layout, same node positions, no markers
        let after = load();
        let resolver = ActionResolver::new(after.arena(), DEFAULT_MARKER_ATTRIBUTE);

        let err = resolver.resolve_with(&extraction.registry, 1).unwrap_err();
        assert!(err.is_stale());
        assert!(matches!(resolver.resolve(2), Err(DomError::StaleIdentifier(2))));
    }

    #[test]
    fn test_removed_element_is_stale() {
        let mut service = load();
        let extraction = Extractor::new().extract(service.arena_mut()).unwrap();

        let entry = extraction.registry.get(1).unwrap();
        service
            .arena_mut()
            .get_mut(entry.node_id)
            .unwrap()
            .attributes
            .remove(DEFAULT_MARKER_ATTRIBUTE);

        let resolver = ActionResolver::new(service.arena(), DEFAULT_MARKER_ATTRIBUTE);
        assert!(resolver.resolve_with(&extraction.registry, 1).unwrap_err().is_stale());
        assert!(resolver.resolve(3).unwrap_err().is_stale());
    }
}
