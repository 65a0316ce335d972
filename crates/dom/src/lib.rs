//! Interaction-tree extraction
//!
//! Turns a page snapshot into a short, stable list of the elements an agent
//! can act on, and maps the identifiers in that list back to live elements.
//!
//! ## Core Design
//!
//! ```text
//! snapshot JSON → DomService → DomArena ─→ Extractor ─→ Vec<ElementDescriptor>
//!                                  ↑            │
//!                                  │            ├─→ IdRegistry (per pass)
//!                                  │            └─→ marker attribute on each element
//!                                  │
//!                           ActionResolver ← identifier from the agent
//! ```
//!
//! Identifiers are only valid for the document they were allocated in. The
//! marker written on each captured element is what the resolver trusts; a
//! reloaded page carries no markers, so old identifiers fail as stale.

pub mod arena;
pub mod classify;
pub mod config;
pub mod error;
pub mod extractor;
pub mod filter;
pub mod label;
pub mod registry;
pub mod resolver;
pub mod serializer;
pub mod service;
pub mod types;
pub mod utils;
pub mod visibility;

pub use arena::DomArena;
pub use config::ExtractionConfig;
pub use error::{DomError, Result};
pub use extractor::{Extraction, ExtractionReport, Extractor};
pub use registry::{IdRegistry, RegistryEntry};
pub use resolver::ActionResolver;
pub use serializer::{DomSerializer, SerializerConfig};
pub use service::DomService;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_to_resolved_action() {
        let snapshot = json!({
            "viewport": { "width": 1280, "height": 720 },
            "root": {
                "nodeId": 1, "nodeType": 1, "nodeName": "BODY",
                "layout": { "x": 0, "y": 0, "width": 1280, "height": 720 },
                "children": [{
                    "nodeId": 2, "nodeType": 1, "nodeName": "FORM",
                    "layout": { "x": 300, "y": 200, "width": 400, "height": 200 },
                    "children": [
                        { "nodeId": 3, "nodeType": 1, "nodeName": "INPUT",
                          "attributes": ["type", "email", "placeholder", "Email"],
                          "layout": { "x": 320, "y": 220, "width": 200, "height": 24 },
                          "state": { "value": "" } },
                        { "nodeId": 4, "nodeType": 1, "nodeName": "BUTTON",
                          "layout": { "x": 320, "y": 260, "width": 80, "height": 30 },
                          "children": [{ "nodeId": 5, "nodeType": 3, "nodeName": "#text", "nodeValue": "Sign in" }] }
                    ]
                }]
            }
        });

        let mut service = DomService::new();
        service.parse_snapshot(&snapshot).unwrap();
        let extraction = Extractor::new().extract(service.arena_mut()).unwrap();

        let text = DomSerializer::new().to_text(&extraction.descriptors);
        assert_eq!(
            text,
            "[1] in \"Email\" @main type=email\n[2] btn \"Sign in\" @main\n"
        );

        let resolver = ActionResolver::new(service.arena(), DEFAULT_MARKER_ATTRIBUTE);
        let node_id = resolver.resolve_with(&extraction.registry, 2).unwrap();
        assert!(service.arena().get(node_id).unwrap().is_tag("button"));
    }
}
