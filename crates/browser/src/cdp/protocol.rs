//! CDP Protocol Types
//!
//! Only the envelope types plus the few domain results this crate reads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request ID - monotonically increasing
pub type RequestId = u64;

/// Target ID from Chrome
pub type TargetId = String;

/// Session ID for attached targets
pub type SessionId = String;

/// CDP Request sent to browser
#[derive(Debug, Clone, Serialize)]
pub struct CDPRequest {
    pub id: RequestId,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

/// CDP Response from browser
#[derive(Debug, Clone, Deserialize)]
pub struct CDPResponse {
    pub id: RequestId,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<ProtocolError>,
}

/// Error object carried by a failed response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProtocolError {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// CDP Event from browser (no request ID)
#[derive(Debug, Clone, Deserialize)]
pub struct CDPEvent {
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<SessionId>,
}

/// Unified CDP Message (response or event)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CDPMessage {
    Response(CDPResponse),
    Event(CDPEvent),
}

/// Target Info from Target.getTargetInfo
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetInfo {
    #[serde(rename = "targetId")]
    pub target_id: TargetId,
    #[serde(rename = "type")]
    pub target_type: String,
    pub title: String,
    pub url: String,
    pub attached: bool,
}

/// Result of Target.attachToTarget
#[derive(Debug, Clone, Deserialize)]
pub struct AttachToTargetResult {
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,
}

/// Result of Target.createTarget
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTargetResult {
    #[serde(rename = "targetId")]
    pub target_id: TargetId,
}

/// Runtime.RemoteObject, as much of it as `returnByValue` needs
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteObject {
    #[serde(rename = "type")]
    pub object_type: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExceptionDetails {
    pub text: String,
    #[serde(default)]
    pub exception: Option<RemoteObject>,
}

impl ExceptionDetails {
    /// Best human-readable line: the thrown object's description, else the summary
    pub fn message(&self) -> String {
        self.exception
            .as_ref()
            .and_then(|e| e.description.clone())
            .unwrap_or_else(|| self.text.clone())
    }
}

/// Result of Runtime.evaluate
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateResult {
    pub result: RemoteObject,
    #[serde(rename = "exceptionDetails", default)]
    pub exception_details: Option<ExceptionDetails>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_distinguishes_response_and_event() {
        let response: CDPMessage =
            serde_json::from_value(json!({ "id": 7, "result": { "ok": true } })).unwrap();
        assert!(matches!(response, CDPMessage::Response(r) if r.id == 7));

        let failed: CDPMessage = serde_json::from_value(
            json!({ "id": 8, "error": { "code": -32000, "message": "No node" } }),
        )
        .unwrap();
        match failed {
            CDPMessage::Response(r) => assert_eq!(r.error.unwrap().message, "No node"),
            other => panic!("expected response, got {:?}", other),
        }

        let event: CDPMessage = serde_json::from_value(json!({
            "method": "Page.frameNavigated",
            "params": {},
            "sessionId": "S1"
        }))
        .unwrap();
        assert!(matches!(event, CDPMessage::Event(e) if e.session_id.as_deref() == Some("S1")));
    }

    #[test]
    fn test_evaluate_result_with_exception() {
        let result: EvaluateResult = serde_json::from_value(json!({
            "result": { "type": "object", "subtype": "error", "description": "TypeError: x is null" },
            "exceptionDetails": {
                "exceptionId": 1, "text": "Uncaught", "lineNumber": 0, "columnNumber": 5,
                "exception": { "type": "object", "description": "TypeError: x is null" }
            }
        }))
        .unwrap();

        let details = result.exception_details.unwrap();
        assert_eq!(details.message(), "TypeError: x is null");
    }

    #[test]
    fn test_request_omits_empty_fields() {
        let request = CDPRequest {
            id: 1,
            method: "Runtime.enable".to_string(),
            params: None,
            session_id: None,
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"id":1,"method":"Runtime.enable"}"#
        );
    }
}
