//! The two page primitives the interaction layer needs

use crate::cdp::client::Result;
use crate::cdp::CDPSession;
use async_trait::async_trait;
use serde_json::Value;

/// A page that can run a script and receive native input
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Evaluate `script` in the page and return its JSON value
    async fn evaluate(&self, script: &str) -> Result<Value>;

    async fn click_at(&self, x: f64, y: f64) -> Result<()>;

    /// Insert text at the focused element
    async fn insert_text(&self, text: &str) -> Result<()>;
}

#[async_trait]
impl PageHandle for CDPSession {
    async fn evaluate(&self, script: &str) -> Result<Value> {
        CDPSession::evaluate(self, script).await
    }

    async fn click_at(&self, x: f64, y: f64) -> Result<()> {
        CDPSession::click_at(self, x, y).await
    }

    async fn insert_text(&self, text: &str) -> Result<()> {
        CDPSession::insert_text(self, text).await
    }
}
