//! Extraction configuration

use crate::error::{DomError, Result};
use crate::types::DEFAULT_MARKER_ATTRIBUTE;
use serde::{Deserialize, Serialize};

/// Knobs for one extraction pass.
///
/// Every field has a default; a host can override any subset from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Ancestor levels checked against already-captured elements.
    /// 0 disables redundancy suppression.
    pub lookback_depth: usize,
    /// Traversal budget in elements; the walk stops and reports truncation past it
    pub max_nodes: usize,
    pub label_max_chars: usize,
    pub value_max_chars: usize,
    /// Visible text at or above this length is not used as a label
    pub text_max_chars: usize,
    /// Region fallback: top < header_band is header
    pub header_band: f64,
    /// Region fallback: top > viewport height - footer_band is footer
    pub footer_band: f64,
    /// Region fallback: left < sidebar_width (below the header band) is sidebar
    pub sidebar_width: f64,
    pub marker_attribute: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            lookback_depth: 3,
            max_nodes: 50_000,
            label_max_chars: 50,
            value_max_chars: 30,
            text_max_chars: 60,
            header_band: 80.0,
            footer_band: 80.0,
            sidebar_width: 200.0,
            marker_attribute: DEFAULT_MARKER_ATTRIBUTE.to_string(),
        }
    }
}

impl ExtractionConfig {
    /// Parse a (possibly partial) JSON config and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.marker_attribute.trim().is_empty() {
            return Err(DomError::Config("marker_attribute must not be empty".to_string()));
        }
        if self.label_max_chars == 0 {
            return Err(DomError::Config("label_max_chars must be positive".to_string()));
        }
        if self.max_nodes == 0 {
            return Err(DomError::Config("max_nodes must be positive".to_string()));
        }
        Ok(())
    }
}
