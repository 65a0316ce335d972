//! Error type shared by snapshot parsing and the extraction engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DomError>;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NodeNotFound(u32),

    #[error("Invalid node type: expected {expected}, got {actual}")]
    InvalidNodeType { expected: String, actual: String },

    #[error("Malformed page snapshot: {0}")]
    Snapshot(String),

    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Style or geometry was not captured for this node
    #[error("Visibility could not be computed for node {0}")]
    VisibilityUnavailable(u32),

    /// No element in the current document carries this identifier
    #[error("Identifier {0} is stale; re-extract the interaction tree")]
    StaleIdentifier(u32),

    #[error("Maximum snapshot depth exceeded: {current} > {max}")]
    MaxDepthExceeded { current: usize, max: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl DomError {
    /// Stale identifiers must be handled by re-extracting, never retried blindly
    pub fn is_stale(&self) -> bool {
        matches!(self, DomError::StaleIdentifier(_))
    }
}
