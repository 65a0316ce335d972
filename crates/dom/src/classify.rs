//! Type and region classification
//!
//! Both classifiers are ordered rule tables: the first matching rule wins.
//! Order is the contract, so tests pin it.

use crate::arena::DomArena;
use crate::config::ExtractionConfig;
use crate::types::{DomNode, NodeId, RegionCode, TypeCode, Viewport};

type TypeRule = (fn(&DomNode) -> bool, TypeCode);

/// Tag and role predicates share a rule; table order settles conflicts
const TYPE_RULES: &[TypeRule] = &[
    (is_button, TypeCode::Button),
    (is_link, TypeCode::Link),
    (is_checkbox, TypeCode::Checkbox),
    (is_radio, TypeCode::Radio),
    (is_button_input, TypeCode::Button),
    (is_input, TypeCode::Input),
    (is_textarea, TypeCode::Input),
    (is_select, TypeCode::Select),
    (is_textbox, TypeCode::Input),
    (is_tab, TypeCode::Tab),
    (is_menu_item, TypeCode::MenuItem),
];

fn is_button(n: &DomNode) -> bool {
    n.is_tag("button") || n.has_role("button")
}

fn is_link(n: &DomNode) -> bool {
    n.is_tag("a") || n.has_role("link")
}

fn is_checkbox(n: &DomNode) -> bool {
    (n.is_tag("input") && n.input_type() == "checkbox") || n.has_role("checkbox")
}

fn is_radio(n: &DomNode) -> bool {
    (n.is_tag("input") && n.input_type() == "radio") || n.has_role("radio")
}

fn is_button_input(n: &DomNode) -> bool {
    n.is_tag("input") && matches!(n.input_type().as_str(), "submit" | "button")
}

fn is_input(n: &DomNode) -> bool {
    n.is_tag("input")
}

fn is_textarea(n: &DomNode) -> bool {
    n.is_tag("textarea")
}

fn is_select(n: &DomNode) -> bool {
    n.is_tag("select") || n.has_role("combobox")
}

fn is_textbox(n: &DomNode) -> bool {
    n.is_content_editable() || n.has_role("textbox")
}

fn is_tab(n: &DomNode) -> bool {
    n.has_role("tab")
}

fn is_menu_item(n: &DomNode) -> bool {
    n.has_role("menuitem")
}

/// Compact type code for an element
pub fn classify_type(node: &DomNode) -> TypeCode {
    TYPE_RULES
        .iter()
        .find(|(matches, _)| matches(node))
        .map(|(_, code)| *code)
        .unwrap_or(TypeCode::Generic)
}

type LandmarkRule = (fn(&DomNode) -> bool, RegionCode);

const LANDMARK_RULES: &[LandmarkRule] = &[
    (is_banner, RegionCode::Header),
    (is_navigation, RegionCode::Nav),
    (is_main, RegionCode::Main),
    (is_contentinfo, RegionCode::Footer),
    (is_complementary, RegionCode::Side),
    (is_dialog, RegionCode::Dialog),
];

fn is_banner(n: &DomNode) -> bool {
    n.is_tag("header") || n.has_role("banner")
}

fn is_navigation(n: &DomNode) -> bool {
    n.is_tag("nav") || n.has_role("navigation")
}

fn is_main(n: &DomNode) -> bool {
    n.is_tag("main") || n.has_role("main")
}

fn is_contentinfo(n: &DomNode) -> bool {
    n.is_tag("footer") || n.has_role("contentinfo")
}

fn is_complementary(n: &DomNode) -> bool {
    n.is_tag("aside") || n.has_role("complementary")
}

fn is_dialog(n: &DomNode) -> bool {
    n.is_tag("dialog")
        || n.has_role("dialog")
        || n.has_role("alertdialog")
        || n.attr("aria-modal") == Some("true")
}

fn landmark_of(node: &DomNode) -> Option<RegionCode> {
    LANDMARK_RULES
        .iter()
        .find(|(matches, _)| matches(node))
        .map(|(_, code)| *code)
}

/// Region of the closest landmark (the element itself included), else by geometry
pub fn classify_region(
    arena: &DomArena,
    node_id: NodeId,
    config: &ExtractionConfig,
) -> Option<RegionCode> {
    let node = arena.get(node_id).ok()?;

    let landmark = std::iter::once(node)
        .chain(arena.element_ancestors(node_id))
        .find_map(landmark_of);
    if landmark.is_some() {
        return landmark;
    }

    let bounds = node.bounds()?;
    Some(region_by_geometry(bounds.top(), bounds.left(), &arena.viewport(), config))
}

/// Fallback bands: header strip, left sidebar, footer strip, then main
pub fn region_by_geometry(
    top: f64,
    left: f64,
    viewport: &Viewport,
    config: &ExtractionConfig,
) -> RegionCode {
    if top < config.header_band {
        RegionCode::Header
    } else if left < config.sidebar_width {
        RegionCode::Side
    } else if top > viewport.height - config.footer_band {
        RegionCode::Footer
    } else {
        RegionCode::Main
    }
}
