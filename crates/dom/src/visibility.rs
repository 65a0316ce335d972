//! Visibility and geometry checks

use crate::error::{DomError, Result};
use crate::types::{DomNode, DomRect, Viewport};

/// Check if element is rendered according to its computed style and box.
///
/// Fails with `VisibilityUnavailable` when the snapshot carries no layout for
/// the node; callers skip that node and keep walking.
pub fn is_visible(node: &DomNode) -> Result<bool> {
    let layout = node
        .layout
        .as_ref()
        .ok_or(DomError::VisibilityUnavailable(node.node_id))?;

    if layout.display.eq_ignore_ascii_case("none")
        || layout.visibility.eq_ignore_ascii_case("hidden")
    {
        return Ok(false);
    }

    if layout.opacity <= 0.0 {
        return Ok(false);
    }

    Ok(layout.bounds.has_area())
}

/// True when the box lies wholly past one edge of the viewport
pub fn is_offscreen(bounds: &DomRect, viewport: &Viewport) -> bool {
    bounds.bottom() < 0.0
        || bounds.top() > viewport.height
        || bounds.right() < 0.0
        || bounds.left() > viewport.width
}
