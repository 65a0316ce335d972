//! Label inference
//!
//! Sources are tried in a fixed order and the first non-empty one wins:
//!
//! ```text
//! aria-label → aria-labelledby → form control sources → link/button text
//!            → generic text / title / alt
//! ```
//!
//! `id` and `label[for]` lookups go through a [`LabelIndex`] built once per
//! pass, so labelling stays linear in the size of the page.

use crate::arena::DomArena;
use crate::config::ExtractionConfig;
use crate::error::Result;
use crate::types::{DomNode, NodeId};
use crate::utils::{collapse_whitespace, label_text_without_controls, truncate_chars, visible_text};
use ahash::AHashMap;

/// Element ids and `label[for]` targets, keyed by the tree they live in.
///
/// A tree is the light document or one shadow fragment; lookups never cross
/// from one into another. When several elements share a key the first in
/// document order wins.
#[derive(Debug, Default)]
pub struct LabelIndex {
    /// Tree root of every node, indexed by `NodeId`
    tree_roots: Vec<NodeId>,
    by_id: AHashMap<(NodeId, String), NodeId>,
    label_for: AHashMap<(NodeId, String), NodeId>,
}

impl LabelIndex {
    pub fn build(arena: &DomArena) -> Result<Self> {
        let mut index = Self {
            tree_roots: Vec::with_capacity(arena.len()),
            ..Default::default()
        };

        // Parents precede their children in the arena
        for node in arena.iter() {
            let root = match node.parent_id {
                _ if node.is_fragment() => node.node_id,
                None => node.node_id,
                Some(parent_id) => match index.tree_roots.get(parent_id as usize) {
                    Some(&root) => root,
                    None => arena.tree_root(node.node_id)?,
                },
            };
            index.tree_roots.push(root);

            if !node.is_element() {
                continue;
            }
            if let Some(id) = node.attr_nonempty("id") {
                index
                    .by_id
                    .entry((root, id.to_string()))
                    .or_insert(node.node_id);
            }
            if node.is_tag("label") {
                if let Some(target) = node.attr_nonempty("for") {
                    index
                        .label_for
                        .entry((root, target.to_string()))
                        .or_insert(node.node_id);
                }
            }
        }

        Ok(index)
    }

    /// `getElementById` within the tree of `node_id`
    pub fn element_by_id(&self, node_id: NodeId, id: &str) -> Option<NodeId> {
        let root = *self.tree_roots.get(node_id as usize)?;
        self.by_id.get(&(root, id.to_string())).copied()
    }

    /// First `<label for=id>` within the tree of `node_id`
    pub fn label_for(&self, node_id: NodeId, id: &str) -> Option<NodeId> {
        let root = *self.tree_roots.get(node_id as usize)?;
        self.label_for.get(&(root, id.to_string())).copied()
    }
}

struct LabelContext<'a> {
    arena: &'a DomArena,
    node: &'a DomNode,
    config: &'a ExtractionConfig,
    index: &'a LabelIndex,
}

type LabelRule = fn(&LabelContext<'_>) -> Result<Option<String>>;

const LABEL_RULES: &[LabelRule] = &[
    aria_label,
    aria_labelledby,
    form_control,
    link_or_button,
    generic_fallback,
];

/// Infer a label for `node_id`: collapsed, at most `label_max_chars`, never empty.
pub fn infer_label(
    arena: &DomArena,
    node_id: NodeId,
    config: &ExtractionConfig,
    index: &LabelIndex,
) -> Result<Option<String>> {
    let ctx = LabelContext {
        arena,
        node: arena.get(node_id)?,
        config,
        index,
    };

    for rule in LABEL_RULES {
        if let Some(raw) = rule(&ctx)? {
            let label = collapse_whitespace(&raw);
            if !label.is_empty() {
                return Ok(Some(truncate_chars(&label, config.label_max_chars)));
            }
        }
    }

    Ok(None)
}

fn non_empty(text: impl Into<String>) -> Option<String> {
    let text = text.into();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

fn aria_label(ctx: &LabelContext<'_>) -> Result<Option<String>> {
    Ok(ctx.node.attr_nonempty("aria-label").map(String::from))
}

fn aria_labelledby(ctx: &LabelContext<'_>) -> Result<Option<String>> {
    let Some(ids) = ctx.node.attr_nonempty("aria-labelledby") else {
        return Ok(None);
    };

    let mut parts = Vec::new();
    for id in ids.split_whitespace() {
        if let Some(target) = ctx.index.element_by_id(ctx.node.node_id, id) {
            parts.push(text_content(ctx.arena, target)?);
        }
    }
    Ok(non_empty(parts.join(" ")))
}

fn form_control(ctx: &LabelContext<'_>) -> Result<Option<String>> {
    let node = ctx.node;
    let is_input = node.is_tag("input");
    let is_select = node.is_tag("select");
    if !(is_input || is_select || node.is_tag("textarea")) {
        return Ok(None);
    }

    if is_input && matches!(node.input_type().as_str(), "submit" | "button") {
        let value = node
            .state
            .as_ref()
            .and_then(|s| s.value.clone())
            .or_else(|| node.attr("value").map(String::from));
        if let Some(value) = value.and_then(non_empty) {
            return Ok(Some(value));
        }
    }

    if let Some(id) = node.attr_nonempty("id") {
        if let Some(label_id) = ctx.index.label_for(node.node_id, id) {
            if let Some(text) = non_empty(visible_text(ctx.arena, label_id)?) {
                return Ok(Some(text));
            }
        }
    }

    let wrapping = ctx
        .arena
        .element_ancestors(node.node_id)
        .find(|a| a.is_tag("label"))
        .map(|a| a.node_id);
    if let Some(label_id) = wrapping {
        if let Some(text) = non_empty(label_text_without_controls(ctx.arena, label_id)?) {
            return Ok(Some(text));
        }
    }

    if let Some(placeholder) = node.attr_nonempty("placeholder") {
        return Ok(Some(placeholder.to_string()));
    }

    if let Some(name) = node.attr_nonempty("name") {
        return Ok(Some(name.to_string()));
    }

    if is_select {
        let selected = node.state.as_ref().and_then(|s| s.selected_text.clone());
        return Ok(selected.and_then(non_empty));
    }

    Ok(None)
}

fn link_or_button(ctx: &LabelContext<'_>) -> Result<Option<String>> {
    let node = ctx.node;
    let button_like = node.is_tag("a")
        || node.is_tag("button")
        || node.has_role("button")
        || node.has_role("link");
    if !button_like {
        return Ok(None);
    }

    if let Some(text) = short_text(ctx)? {
        return Ok(Some(text));
    }

    icon_name(ctx.arena, node.node_id)
}

fn generic_fallback(ctx: &LabelContext<'_>) -> Result<Option<String>> {
    if let Some(text) = short_text(ctx)? {
        return Ok(Some(text));
    }
    if let Some(title) = ctx.node.attr_nonempty("title") {
        return Ok(Some(title.to_string()));
    }
    if ctx.node.is_tag("img") {
        return Ok(ctx.node.attr_nonempty("alt").map(String::from));
    }
    Ok(None)
}

/// Visible text, only when shorter than `text_max_chars`
fn short_text(ctx: &LabelContext<'_>) -> Result<Option<String>> {
    let text = visible_text(ctx.arena, ctx.node.node_id)?;
    if text.is_empty() || text.chars().count() >= ctx.config.text_max_chars {
        return Ok(None);
    }
    Ok(Some(text))
}

/// `<svg><title>` of an icon, else the fragment of its `<use href="#id">`
fn icon_name(arena: &DomArena, node_id: NodeId) -> Result<Option<String>> {
    let Some(svg) = arena.find_in_tree(node_id, |n| n.is_tag("svg"))? else {
        return Ok(None);
    };

    if let Some(title) = arena.find_in_tree(svg, |n| n.is_tag("title"))? {
        if let Some(text) = non_empty(text_content(arena, title)?) {
            return Ok(Some(text));
        }
    }

    let Some(use_id) = arena.find_in_tree(svg, |n| n.is_tag("use"))? else {
        return Ok(None);
    };
    let use_node = arena.get(use_id)?;
    let href = use_node
        .attr_nonempty("href")
        .or_else(|| use_node.attr_nonempty("xlink:href"));
    Ok(href
        .and_then(|h| h.rsplit('#').next())
        .and_then(non_empty))
}

/// All descendant text, visibility ignored (`textContent`)
fn text_content(arena: &DomArena, node_id: NodeId) -> Result<String> {
    let mut text = String::new();
    arena.traverse_df(node_id, |node| {
        if node.is_text() {
            text.push_str(&node.node_value);
            text.push(' ');
        }
        Ok(true)
    })?;
    Ok(collapse_whitespace(&text))
}
