//! CDP Session - Represents a connection to a specific browser target
//!
//! Lightweight wrapper around CDPClient with target-specific context.
//! All sessions share the same WebSocket.

use super::client::{CDPClient, CDPError, Result};
use super::protocol::{
    AttachToTargetResult, CreateTargetResult, EvaluateResult, SessionId, TargetId, TargetInfo,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// CDP Session bound to a specific target
#[derive(Clone)]
pub struct CDPSession {
    client: Arc<CDPClient>,

    pub target_id: TargetId,

    /// Session ID assigned by Chrome
    pub session_id: SessionId,

    /// Target info at attach time
    pub title: String,
    pub url: String,
}

impl CDPSession {
    /// Open a new tab on `url` and attach to it
    pub async fn open(client: Arc<CDPClient>, url: &str) -> Result<Self> {
        let result = client
            .send_request("Target.createTarget", Some(json!({ "url": url })), None)
            .await?;
        let created: CreateTargetResult = serde_json::from_value(result)?;
        Self::attach(client, created.target_id, None).await
    }

    /// Attach to a target and create session
    pub async fn attach(
        client: Arc<CDPClient>,
        target_id: TargetId,
        domains: Option<Vec<&str>>,
    ) -> Result<Self> {
        let result = client
            .send_request(
                "Target.attachToTarget",
                Some(json!({
                    "targetId": target_id,
                    "flatten": true,
                })),
                None,
            )
            .await?;

        let attach_result: AttachToTargetResult = serde_json::from_value(result)?;
        let session_id = attach_result.session_id;

        let domains = domains.unwrap_or_else(|| vec!["Page", "DOM", "Runtime"]);

        // Enable all domains in parallel
        let enable_futures: Vec<_> = domains
            .into_iter()
            .map(|domain| {
                let client = client.clone();
                let session_id = session_id.clone();
                async move {
                    client
                        .send_request(format!("{}.enable", domain), None, Some(session_id))
                        .await
                }
            })
            .collect();

        // Individual failures are tolerated
        let results = futures_util::future::join_all(enable_futures).await;
        let failures = results.iter().filter(|r| r.is_err()).count();
        if failures > 0 {
            tracing::warn!(
                "Some domain enables failed: {}/{}",
                failures,
                results.len()
            );
        }

        let info_result = client
            .send_request(
                "Target.getTargetInfo",
                Some(json!({ "targetId": &target_id })),
                None,
            )
            .await?;

        let target_info: TargetInfo = serde_json::from_value(info_result["targetInfo"].clone())?;

        Ok(Self {
            client,
            target_id,
            session_id,
            title: target_info.title,
            url: target_info.url,
        })
    }

    /// Send command within this session's context
    pub async fn send(&self, method: impl Into<String>, params: Option<Value>) -> Result<Value> {
        self.client
            .send_request(method, params, Some(self.session_id.clone()))
            .await
    }

    /// Navigate to URL
    pub async fn navigate(&self, url: impl Into<String>) -> Result<Value> {
        self.send("Page.navigate", Some(json!({ "url": url.into() })))
            .await
    }

    /// Evaluate an expression in the page and return its JSON value
    pub async fn evaluate(&self, expression: impl Into<String>) -> Result<Value> {
        let result = self
            .send(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression.into(),
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;

        evaluated_value(result)
    }

    /// Left click at viewport coordinates
    pub async fn click_at(&self, x: f64, y: f64) -> Result<()> {
        for kind in ["mouseMoved", "mousePressed", "mouseReleased"] {
            let mut params = json!({ "type": kind, "x": x, "y": y });
            if kind != "mouseMoved" {
                params["button"] = json!("left");
                params["clickCount"] = json!(1);
            }
            self.send("Input.dispatchMouseEvent", Some(params)).await?;
        }
        Ok(())
    }

    /// Insert text at the current focus, as an IME commit would
    pub async fn insert_text(&self, text: &str) -> Result<()> {
        self.send("Input.insertText", Some(json!({ "text": text })))
            .await?;
        Ok(())
    }
}

/// Pull the value out of a `Runtime.evaluate` result
pub(crate) fn evaluated_value(raw: Value) -> Result<Value> {
    let evaluated: EvaluateResult = serde_json::from_value(raw)?;
    if let Some(details) = evaluated.exception_details {
        return Err(CDPError::ScriptException(details.message()));
    }
    Ok(evaluated.result.value.unwrap_or(Value::Null))
}
