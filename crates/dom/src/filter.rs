//! Candidate selection and redundancy suppression

use crate::arena::DomArena;
use crate::registry::SeenSet;
use crate::types::{DomNode, NodeId};

const INTERACTIVE_TAGS: &[&str] = &[
    "a", "button", "input", "select", "textarea", "details", "summary",
];

const INTERACTIVE_ROLES: &[&str] = &[
    "button", "link", "checkbox", "menuitem", "tab", "textbox", "combobox", "radio", "switch",
    "option",
];

/// SVG internals: never emitted, whatever their handlers say
const SVG_INTERNAL_TAGS: &[&str] = &[
    "path", "use", "g", "circle", "rect", "line", "polygon", "svg", "defs", "clippath",
];

/// Does this element want to be a descriptor at all?
pub fn is_candidate(node: &DomNode) -> bool {
    if !node.is_element() {
        return false;
    }
    if INTERACTIVE_TAGS.iter().any(|tag| node.is_tag(tag)) {
        return true;
    }
    if node
        .role()
        .is_some_and(|role| INTERACTIVE_ROLES.iter().any(|r| role.eq_ignore_ascii_case(r)))
    {
        return true;
    }
    if node.is_content_editable() {
        return true;
    }
    has_pointer_cursor(node) && node.has_click_handler()
}

fn has_pointer_cursor(node: &DomNode) -> bool {
    node.layout
        .as_ref()
        .is_some_and(|l| l.cursor.eq_ignore_ascii_case("pointer"))
}

pub fn is_svg_internal(node: &DomNode) -> bool {
    SVG_INTERNAL_TAGS.iter().any(|tag| node.is_tag(tag))
}

/// True when one of the nearest `lookback` element ancestors was already captured.
///
/// Controls nested deeper than `lookback` below a captured element are kept.
pub fn has_captured_ancestor(
    arena: &DomArena,
    seen: &SeenSet,
    node_id: NodeId,
    lookback: usize,
) -> bool {
    arena
        .element_ancestors(node_id)
        .take(lookback)
        .any(|ancestor| seen.contains(ancestor.node_id))
}
