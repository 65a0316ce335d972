//! Text helpers shared by the label engine and the walker

use crate::arena::DomArena;
use crate::error::Result;
use crate::types::{DomNode, NodeId};
use crate::visibility;

/// Tags whose text never reaches the rendered page
const TEXTLESS_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Form controls whose markup is excluded from a wrapping label's text
const CONTROL_TAGS: &[&str] = &["input", "select", "textarea", "button"];

/// Collapse runs of whitespace to single spaces and trim
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut to at most `max_chars` characters (never splits a code point)
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Visible text under `node_id`, whitespace-collapsed.
///
/// Approximates `innerText`: skips script-like tags and subtrees that are
/// known to be invisible. Shadow content is not included.
pub fn visible_text(arena: &DomArena, node_id: NodeId) -> Result<String> {
    collect_text(arena, node_id, |_| false)
}

/// Text of a `<label>` with nested control markup left out
pub fn label_text_without_controls(arena: &DomArena, label_id: NodeId) -> Result<String> {
    collect_text(arena, label_id, |node| {
        CONTROL_TAGS.iter().any(|tag| node.is_tag(tag))
    })
}

fn collect_text<F>(arena: &DomArena, node_id: NodeId, exclude: F) -> Result<String>
where
    F: Fn(&DomNode) -> bool,
{
    let mut text = String::new();

    arena.traverse_df(node_id, |node| {
        if node.is_text() {
            text.push_str(&node.node_value);
            text.push(' ');
            return Ok(false);
        }
        if !node.is_element() {
            return Ok(false);
        }
        if node.node_id != node_id {
            if exclude(node) || TEXTLESS_TAGS.iter().any(|tag| node.is_tag(tag)) {
                return Ok(false);
            }
            if visibility::is_visible(node).ok() == Some(false) {
                return Ok(false);
            }
        }
        Ok(true)
    })?;

    Ok(collapse_whitespace(&text))
}
