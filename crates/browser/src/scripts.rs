//! Page-context scripts and the shapes of what they return
//!
//! Caller-provided strings only ever enter a script as JSON string literals.

use interact_dom::SnapshotId;
use serde::Deserialize;
use serde_json::{json, Value};

/// Serializes the body (plus open shadow roots) into the flat snapshot format
/// read by `DomService::parse_snapshot`.
///
/// Nodes are emitted in document order with a `parentId`, from an explicit
/// stack, so neither the walk nor the returned JSON nests with page depth.
/// A host's shadow root is emitted right after the host. `nodeId` is the
/// node's ordinal in `window.__interactNodes`, which the tag script uses to
/// find the live element again and then releases.
pub const SNAPSHOT_SCRIPT: &str = r#"(() => {
  const nodes = [];
  const out = [];
  const layoutOf = (el) => {
    try {
      const r = el.getBoundingClientRect();
      const s = window.getComputedStyle(el);
      return {
        x: r.left, y: r.top, width: r.width, height: r.height,
        display: s.display, visibility: s.visibility,
        opacity: parseFloat(s.opacity), cursor: s.cursor
      };
    } catch (e) {
      return undefined;
    }
  };
  const stateOf = (el) => {
    const state = {
      disabled: el.disabled === true,
      hasClickHandler: typeof el.onclick === 'function'
    };
    if (el.tagName === 'INPUT') {
      state.checked = el.checked === true;
      state.value = el.value;
    } else if (el.tagName === 'TEXTAREA') {
      state.value = el.value;
    } else if (el.tagName === 'SELECT') {
      state.value = el.value;
      const option = el.options[el.selectedIndex];
      if (option) state.selectedText = option.text;
    }
    return state;
  };
  const stack = [[document.body, null]];
  while (stack.length > 0) {
    const [node, parentId] = stack.pop();
    const entry = { nodeId: nodes.length, nodeType: node.nodeType, nodeName: node.nodeName };
    if (parentId !== null) entry.parentId = parentId;
    nodes.push(node);
    out.push(entry);
    if (node.nodeType === 3) {
      entry.nodeValue = node.nodeValue;
      continue;
    }
    if (node.nodeType === 1) {
      const attributes = [];
      for (const a of node.attributes) attributes.push(a.name, a.value);
      entry.attributes = attributes;
      const layout = layoutOf(node);
      if (layout) entry.layout = layout;
      entry.state = stateOf(node);
    }
    const children = [];
    for (const child of node.childNodes) {
      if (child.nodeType === 1 || child.nodeType === 3) children.push(child);
    }
    for (let i = children.length - 1; i >= 0; i--) stack.push([children[i], entry.nodeId]);
    if (node.nodeType === 1 && node.shadowRoot) stack.push([node.shadowRoot, entry.nodeId]);
  }
  window.__interactNodes = nodes;
  return { viewport: { width: window.innerWidth, height: window.innerHeight }, nodes: out };
})()"#;

/// Drops the live-node list kept by [`SNAPSHOT_SCRIPT`] when tagging never runs
pub const RELEASE_SCRIPT: &str = "(() => { delete window.__interactNodes; return true; })()";

const FIND_MARKED: &str = r#"
  const selector = '[' + CSS.escape(marker) + '="' + id + '"]';
  const findMarked = (root) => {
    const hit = root.querySelector(selector);
    if (hit) return hit;
    for (const host of root.querySelectorAll('*')) {
      if (host.shadowRoot) {
        const found = findMarked(host.shadowRoot);
        if (found) return found;
      }
    }
    return null;
  };
  const el = findMarked(document);
  if (!el) return { found: false };
"#;

const LOCATE_BODY: &str = r#"
  el.scrollIntoView({ block: 'center', inline: 'center' });
  const rect = el.getBoundingClientRect();
  const style = window.getComputedStyle(el);
  const hidden = rect.width === 0 || rect.height === 0 || style.display === 'none'
    || style.visibility === 'hidden' || parseFloat(style.opacity) === 0;
  return { found: true, hidden, x: rect.left + rect.width / 2, y: rect.top + rect.height / 2 };
"#;

const FOCUS_BODY: &str = r#"
  el.focus();
  return { found: true, ok: true };
"#;

const CLEAR_BODY: &str = r#"
  el.focus();
  if (el.tagName === 'INPUT' || el.tagName === 'TEXTAREA') {
    el.value = '';
  } else if (el.isContentEditable) {
    el.textContent = '';
  } else {
    return { found: true, ok: false, reason: 'not an editable element' };
  }
  el.dispatchEvent(new Event('input', { bubbles: true }));
  el.dispatchEvent(new Event('change', { bubbles: true }));
  return { found: true, ok: true };
"#;

const SELECT_BODY: &str = r#"
  if (el.tagName !== 'SELECT') return { found: true, ok: false, reason: 'not a select element' };
  const option = Array.from(el.options).find((o) => o.value === wanted || o.text.trim() === wanted);
  if (!option) return { found: true, ok: false, reason: 'no option ' + JSON.stringify(wanted) };
  el.value = option.value;
  el.dispatchEvent(new Event('input', { bubbles: true }));
  el.dispatchEvent(new Event('change', { bubbles: true }));
  return { found: true, ok: true };
"#;

fn js_string(s: &str) -> String {
    Value::from(s).to_string()
}

fn element_script(marker: &str, id: u32, prelude: &str, body: &str) -> String {
    format!(
        "(() => {{\n  const marker = {};\n  const id = {};\n{}{}{}}})()",
        js_string(marker),
        js_string(&id.to_string()),
        prelude,
        FIND_MARKED,
        body
    )
}

/// Remove every existing marker, tag the captured elements by ordinal, then
/// release the snapshot's live-node list
pub fn tag_script(marker: &str, assignments: &[(SnapshotId, u32)]) -> String {
    let pairs: Vec<[u32; 2]> = assignments.iter().map(|&(ordinal, id)| [ordinal, id]).collect();
    format!(
        r#"(() => {{
  const marker = {};
  const pairs = {};
  let cleared = 0;
  const clear = (root) => {{
    for (const el of root.querySelectorAll('[' + CSS.escape(marker) + ']')) {{
      el.removeAttribute(marker);
      cleared++;
    }}
    for (const host of root.querySelectorAll('*')) {{
      if (host.shadowRoot) clear(host.shadowRoot);
    }}
  }};
  clear(document);
  const nodes = window.__interactNodes || [];
  let tagged = 0;
  for (const [ordinal, id] of pairs) {{
    const el = nodes[ordinal];
    if (el && el.isConnected) {{
      el.setAttribute(marker, String(id));
      tagged++;
    }}
  }}
  delete window.__interactNodes;
  return {{ cleared, tagged }};
}})()"#,
        js_string(marker),
        json!(pairs)
    )
}

/// Find the element, scroll it into view, report visibility and centre point
pub fn locate_script(marker: &str, id: u32) -> String {
    element_script(marker, id, "", LOCATE_BODY)
}

pub fn focus_script(marker: &str, id: u32) -> String {
    element_script(marker, id, "", FOCUS_BODY)
}

pub fn clear_script(marker: &str, id: u32) -> String {
    element_script(marker, id, "", CLEAR_BODY)
}

/// Pick the option whose value or visible text equals `value`
pub fn select_script(marker: &str, id: u32, value: &str) -> String {
    let prelude = format!("  const wanted = {};\n", js_string(value));
    element_script(marker, id, &prelude, SELECT_BODY)
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TagOutcome {
    pub cleared: usize,
    pub tagged: usize,
}

/// Where a marked element is, if anywhere
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Located {
    pub found: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ElementOutcome {
    pub found: bool,
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub reason: Option<String>,
}
