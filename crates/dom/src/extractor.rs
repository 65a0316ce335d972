//! Tree walker and identifier allocator
//!
//! One pass = one depth-first walk from the document body over an explicit
//! stack. Shadow fragments are treated as extra roots and pushed right after
//! their host, so their content appears where the host renders it.
//!
//! ```text
//! pop node ─┬─ invisible?        → prune subtree
//!           ├─ no layout?        → skip node, keep children
//!           ├─ candidate?        → filter → classify → label → allocate id → tag
//!           └─ push shadow roots, then children
//! ```
//!
//! State never outlives a pass: markers from the previous pass are cleared
//! first, and the counter, registry and seen set are created fresh.

use crate::arena::DomArena;
use crate::classify::{classify_region, classify_type};
use crate::config::ExtractionConfig;
use crate::error::{DomError, Result};
use crate::filter::{has_captured_ancestor, is_candidate, is_svg_internal};
use crate::label::{infer_label, LabelIndex};
use crate::registry::{IdRegistry, SeenSet};
use crate::types::{ElementDescriptor, NodeId, RegionCode, TypeCode};
use crate::utils::truncate_chars;
use crate::visibility::{is_offscreen, is_visible};
use serde::Serialize;

/// What happened during one pass, besides the descriptors themselves
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionReport {
    /// Elements popped off the walk stack
    pub visited: usize,
    /// Elements without style/geometry (skipped, children still walked)
    pub skipped_no_layout: usize,
    /// Candidates removed as SVG internals or nested duplicates
    pub suppressed: usize,
    /// Generic candidates with no label
    pub dropped_unlabelled: usize,
    /// Markers left over from the previous pass
    pub markers_cleared: usize,
    /// The traversal budget ran out before the walk finished
    pub truncated: bool,
    /// Subtrees abandoned because of a failure, while parsing the snapshot or
    /// during the walk; the rest of the pass went on
    pub errors: Vec<String>,
}

/// Result of one pass
#[derive(Debug, Clone)]
pub struct Extraction {
    pub descriptors: Vec<ElementDescriptor>,
    pub registry: IdRegistry,
    pub report: ExtractionReport,
}

impl Extraction {
    pub fn is_partial(&self) -> bool {
        self.report.truncated || !self.report.errors.is_empty()
    }
}

enum Outcome {
    Captured(ElementDescriptor),
    Suppressed,
    Unlabelled,
}

/// Walks a snapshot and produces the interaction list
pub struct Extractor {
    config: ExtractionConfig,
}

impl Extractor {
    pub fn new() -> Self {
        Self::with_config(ExtractionConfig::default())
    }

    pub fn with_config(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Run one extraction pass.
    ///
    /// Only fails when the arena has no root. Anything else that goes wrong is
    /// confined to the subtree it happened in and listed in the report.
    pub fn extract(&self, arena: &mut DomArena) -> Result<Extraction> {
        let root_id = arena
            .root_id()
            .ok_or_else(|| DomError::Snapshot("No root node set".to_string()))?;

        let marker = self.config.marker_attribute.as_str();
        let mut report = ExtractionReport {
            markers_cleared: arena.clear_markers(marker),
            errors: arena.snapshot_errors().to_vec(),
            ..Default::default()
        };
        let labels = LabelIndex::build(arena)?;
        let mut registry = IdRegistry::new(arena.document_id());
        let mut seen = SeenSet::new();
        let mut descriptors = Vec::new();

        let mut stack = vec![root_id];

        while let Some(node_id) = stack.pop() {
            let node = match arena.get(node_id) {
                Ok(node) => node,
                Err(e) => {
                    tracing::warn!(node_id, error = %e, "dropping unreachable subtree");
                    report.errors.push(e.to_string());
                    continue;
                }
            };

            // Roots are containers only
            let is_root = node_id == root_id || node.is_fragment();
            if !is_root {
                if !node.is_element() {
                    continue;
                }

                report.visited += 1;
                if report.visited > self.config.max_nodes {
                    tracing::warn!(
                        budget = self.config.max_nodes,
                        captured = descriptors.len(),
                        "traversal budget exhausted, returning partial result"
                    );
                    report.truncated = true;
                    break;
                }

                match is_visible(node) {
                    Ok(false) => continue,
                    Ok(true) => {
                        if is_candidate(node) {
                            match self.describe(arena, node_id, &seen, &labels) {
                                Ok(Outcome::Captured(draft)) => {
                                    let snapshot_id = node.snapshot_id;
                                    let id = registry.allocate(node_id, snapshot_id);
                                    seen.insert(node_id);
                                    descriptors.push(ElementDescriptor { id, ..draft });
                                }
                                Ok(Outcome::Suppressed) => report.suppressed += 1,
                                Ok(Outcome::Unlabelled) => report.dropped_unlabelled += 1,
                                Err(e) => {
                                    tracing::warn!(node_id, error = %e, "failed to describe element");
                                    report.errors.push(e.to_string());
                                }
                            }
                        }
                    }
                    Err(DomError::VisibilityUnavailable(_)) => {
                        tracing::debug!(node_id, "no layout captured, skipping element");
                        report.skipped_no_layout += 1;
                    }
                    Err(e) => {
                        report.errors.push(e.to_string());
                        continue;
                    }
                }
            }

            for &child_id in node.children_ids.iter().rev() {
                stack.push(child_id);
            }
            if let Some(shadow_ids) = &node.shadow_root_ids {
                for &shadow_id in shadow_ids.iter().rev() {
                    stack.push(shadow_id);
                }
            }
        }

        for (id, entry) in registry.iter() {
            let node = arena.get_mut(entry.node_id)?;
            node.attributes.insert(marker.to_string(), id.to_string());
        }

        tracing::debug!(
            captured = descriptors.len(),
            visited = report.visited,
            suppressed = report.suppressed,
            pass = %registry.pass_id(),
            "extraction pass complete"
        );

        Ok(Extraction {
            descriptors,
            registry,
            report,
        })
    }

    /// Build the descriptor for a visible candidate (identifier not yet assigned)
    fn describe(
        &self,
        arena: &DomArena,
        node_id: NodeId,
        seen: &SeenSet,
        labels: &LabelIndex,
    ) -> Result<Outcome> {
        let node = arena.get(node_id)?;
        let config = &self.config;

        if is_svg_internal(node) {
            return Ok(Outcome::Suppressed);
        }
        if config.lookback_depth > 0
            && has_captured_ancestor(arena, seen, node_id, config.lookback_depth)
        {
            return Ok(Outcome::Suppressed);
        }

        let kind = classify_type(node);
        let label = match infer_label(arena, node_id, config, labels)? {
            Some(label) => label,
            None if kind == TypeCode::Generic => return Ok(Outcome::Unlabelled),
            None => format!("[{}]", node.tag_lower()),
        };

        let region = classify_region(arena, node_id, config).unwrap_or(RegionCode::Main);

        let is_input = node.is_tag("input");
        let input_type = if is_input {
            Some(node.input_type()).filter(|t| t != "text" && t != "search")
        } else {
            None
        };

        let value = if is_input || node.is_tag("select") {
            node.state
                .as_ref()
                .and_then(|s| s.value.as_deref())
                .or_else(|| node.attr("value"))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| truncate_chars(v, config.value_max_chars))
        } else {
            None
        };

        let checked = match kind {
            TypeCode::Checkbox | TypeCode::Radio if is_input => Some(
                node.state
                    .as_ref()
                    .map(|s| s.checked)
                    .unwrap_or_else(|| node.attr("checked").is_some()),
            ),
            TypeCode::Checkbox | TypeCode::Radio => Some(node.attr("aria-checked") == Some("true")),
            _ => None,
        };

        let offscreen = node
            .bounds()
            .filter(|b| is_offscreen(b, &arena.viewport()))
            .map(|_| true);

        Ok(Outcome::Captured(ElementDescriptor {
            id: 0,
            kind,
            label,
            region,
            input_type,
            value,
            checked,
            disabled: node.is_disabled().then_some(true),
            offscreen,
        }))
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}
