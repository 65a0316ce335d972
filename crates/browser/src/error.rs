//! Errors surfaced to whoever issues identifier-addressed actions

use crate::cdp::CDPError;
use interact_dom::DomError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ActionError {
    /// No element carries this identifier any more. Re-extract before retrying.
    #[error("Identifier {0} is stale; re-extract the interaction tree")]
    StaleIdentifier(u32),

    #[error("Element {0} is attached but not visible")]
    Hidden(u32),

    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] CDPError),

    #[error("Snapshot error: {0}")]
    Dom(#[from] DomError),

    #[error("Unexpected script result: {0}")]
    UnexpectedResult(String),
}

impl ActionError {
    pub fn is_stale(&self) -> bool {
        match self {
            ActionError::StaleIdentifier(_) => true,
            ActionError::Dom(e) => e.is_stale(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ActionError>;
