//! Core type definitions for the page snapshot and the descriptors built from it
//!
//! Snapshot nodes are addressed by `u32` arena index and keep layout and
//! control state boxed, since text nodes carry neither. Descriptors serialize
//! with one- to three-letter keys: every byte ends up in a prompt.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Node identifier (index into arena)
pub type NodeId = u32;

/// Ordinal the page-side snapshot script gave the node.
/// Used to address the live element again when tagging markers.
pub type SnapshotId = u32;

/// The three `nodeType` values a snapshot may contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeType {
    Element = 1,
    Text = 3,
    /// Shadow root
    DocumentFragment = 11,
}

impl NodeType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(NodeType::Element),
            3 => Some(NodeType::Text),
            11 => Some(NodeType::DocumentFragment),
            _ => None,
        }
    }
}

/// Rectangle in viewport coordinates (what getBoundingClientRect reports)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DomRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Strictly positive width and height
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Size of the browsing context's viewport at snapshot time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

/// Computed style and geometry captured for an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub bounds: DomRect,
    pub display: String,
    pub visibility: String,
    pub opacity: f64,
    pub cursor: String,
}

impl Layout {
    pub fn new(bounds: DomRect) -> Self {
        Self {
            bounds,
            display: "block".to_string(),
            visibility: "visible".to_string(),
            opacity: 1.0,
            cursor: "auto".to_string(),
        }
    }
}

/// Live control state (properties, not attributes)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlState {
    pub checked: bool,
    pub disabled: bool,
    pub value: Option<String>,
    pub selected_text: Option<String>,
    pub has_click_handler: bool,
}

/// One node of the page snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomNode {
    pub node_id: NodeId,
    pub snapshot_id: SnapshotId,
    pub node_type: NodeType,

    pub parent_id: Option<NodeId>,
    pub children_ids: SmallVec<[NodeId; 4]>,

    pub node_name: String,
    pub node_value: String,
    pub attributes: HashMap<String, String>,

    /// Encapsulated fragments attached to this host
    pub shadow_root_ids: Option<SmallVec<[NodeId; 2]>>,

    pub layout: Option<Box<Layout>>,
    pub state: Option<Box<ControlState>>,
}

impl DomNode {
    pub fn new(snapshot_id: SnapshotId, node_type: NodeType, node_name: impl Into<String>) -> Self {
        Self {
            node_id: 0,
            snapshot_id,
            node_type,
            parent_id: None,
            children_ids: SmallVec::new(),
            node_name: node_name.into(),
            node_value: String::new(),
            attributes: HashMap::new(),
            shadow_root_ids: None,
            layout: None,
            state: None,
        }
    }

    /// Check if node is an element
    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    /// Check if node is text
    pub fn is_text(&self) -> bool {
        self.node_type == NodeType::Text
    }

    /// Check if node is the root of an encapsulated fragment
    pub fn is_fragment(&self) -> bool {
        self.node_type == NodeType::DocumentFragment
    }

    /// Case-insensitive tag comparison (HTML names arrive upper-cased, SVG names don't)
    pub fn is_tag(&self, tag: &str) -> bool {
        self.is_element() && self.node_name.eq_ignore_ascii_case(tag)
    }

    pub fn tag_lower(&self) -> String {
        self.node_name.to_ascii_lowercase()
    }

    /// Get attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    /// Attribute value, trimmed, `None` when empty
    pub fn attr_nonempty(&self, name: &str) -> Option<&str> {
        self.attr(name).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Explicit ARIA role
    pub fn role(&self) -> Option<&str> {
        self.attr_nonempty("role")
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.role().is_some_and(|r| r.eq_ignore_ascii_case(role))
    }

    /// Concrete `type` of an input, lower-cased, `text` when absent
    pub fn input_type(&self) -> String {
        self.attr_nonempty("type")
            .map(|t| t.to_ascii_lowercase())
            .unwrap_or_else(|| "text".to_string())
    }

    /// Editing host by its own attribute; inherited editability does not count
    pub fn is_content_editable(&self) -> bool {
        matches!(
            self.attr("contenteditable").map(|v| v.trim().to_ascii_lowercase()),
            Some(v) if v.is_empty() || v == "true" || v == "plaintext-only"
        )
    }

    pub fn has_click_handler(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.has_click_handler) || self.attr("onclick").is_some()
    }

    pub fn is_disabled(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.disabled)
            || self.attr("disabled").is_some()
            || self.attr("aria-disabled") == Some("true")
    }

    pub fn bounds(&self) -> Option<DomRect> {
        self.layout.as_ref().map(|l| l.bounds)
    }
}

/// Compact interaction class of a captured element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeCode {
    #[serde(rename = "btn")]
    Button,
    #[serde(rename = "link")]
    Link,
    #[serde(rename = "chk")]
    Checkbox,
    #[serde(rename = "rad")]
    Radio,
    #[serde(rename = "in")]
    Input,
    #[serde(rename = "sel")]
    Select,
    #[serde(rename = "tab")]
    Tab,
    #[serde(rename = "mnu")]
    MenuItem,
    #[serde(rename = "el")]
    Generic,
}

impl TypeCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeCode::Button => "btn",
            TypeCode::Link => "link",
            TypeCode::Checkbox => "chk",
            TypeCode::Radio => "rad",
            TypeCode::Input => "in",
            TypeCode::Select => "sel",
            TypeCode::Tab => "tab",
            TypeCode::MenuItem => "mnu",
            TypeCode::Generic => "el",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "btn" => Some(TypeCode::Button),
            "link" => Some(TypeCode::Link),
            "chk" => Some(TypeCode::Checkbox),
            "rad" => Some(TypeCode::Radio),
            "in" => Some(TypeCode::Input),
            "sel" => Some(TypeCode::Select),
            "tab" => Some(TypeCode::Tab),
            "mnu" => Some(TypeCode::MenuItem),
            "el" => Some(TypeCode::Generic),
            _ => None,
        }
    }
}

/// Coarse page area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionCode {
    #[serde(rename = "hdr")]
    Header,
    #[serde(rename = "nav")]
    Nav,
    #[serde(rename = "main")]
    Main,
    #[serde(rename = "side")]
    Side,
    #[serde(rename = "ftr")]
    Footer,
    #[serde(rename = "dlg")]
    Dialog,
}

impl RegionCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionCode::Header => "hdr",
            RegionCode::Nav => "nav",
            RegionCode::Main => "main",
            RegionCode::Side => "side",
            RegionCode::Footer => "ftr",
            RegionCode::Dialog => "dlg",
        }
    }
}

/// Compact record for one captured interactive element
///
/// Serialized as `{id, t, l, r, it?, v?, ck?, dis?, off?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    pub id: u32,
    #[serde(rename = "t")]
    pub kind: TypeCode,
    #[serde(rename = "l")]
    pub label: String,
    #[serde(rename = "r")]
    pub region: RegionCode,
    #[serde(rename = "it", default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(rename = "v", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "ck", default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(rename = "dis", default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(rename = "off", default, skip_serializing_if = "Option::is_none")]
    pub offscreen: Option<bool>,
}

/// Attribute the engine writes on captured elements
pub const DEFAULT_MARKER_ATTRIBUTE: &str = "data-interact-id";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_uses_compact_keys() {
        let descriptor = ElementDescriptor {
            id: 3,
            kind: TypeCode::Checkbox,
            label: "Accept terms".to_string(),
            region: RegionCode::Main,
            input_type: Some("checkbox".to_string()),
            value: None,
            checked: Some(false),
            disabled: None,
            offscreen: None,
        };

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 3, "t": "chk", "l": "Accept terms", "r": "main",
                "it": "checkbox", "ck": false
            })
        );
    }

    #[test]
    fn test_content_editable_attribute_forms() {
        let mut node = DomNode::new(1, NodeType::Element, "DIV");
        assert!(!node.is_content_editable());

        node.attributes
            .insert("contenteditable".to_string(), String::new());
        assert!(node.is_content_editable());

        node.attributes
            .insert("contenteditable".to_string(), "false".to_string());
        assert!(!node.is_content_editable());
    }

    #[test]
    fn test_input_type_defaults_to_text() {
        let mut node = DomNode::new(1, NodeType::Element, "INPUT");
        assert_eq!(node.input_type(), "text");

        node.attributes
            .insert("type".to_string(), "Checkbox".to_string());
        assert_eq!(node.input_type(), "checkbox");
    }
}
