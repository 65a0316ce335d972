//! CDP Client - The Core Communication Layer
//!
//! Design decisions:
//! 1. Single WebSocket per browser connection, sessions multiplexed over it
//! 2. Request/response matching via ID, events broadcast to subscribers
//! 3. Every request is bounded by a timeout. No retries, no queuing.

use dashmap::DashMap;
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, RwLock};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use super::protocol::*;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum CDPError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CDP protocol error: {code} - {message}")]
    Protocol { code: i32, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Connection closed")]
    Closed,

    #[error("Invalid response for request {0}")]
    InvalidResponse(RequestId),

    #[error("Invalid DevTools endpoint {0}")]
    InvalidUrl(String),

    #[error("Script threw: {0}")]
    ScriptException(String),
}

/// Result type for CDP operations
pub type Result<T> = std::result::Result<T, CDPError>;

/// Event subscriber callback
pub type EventCallback = Arc<dyn Fn(CDPEvent) + Send + Sync>;

/// CDP Client - manages single WebSocket connection to browser
pub struct CDPClient {
    /// Monotonic request ID counter
    next_id: AtomicU64,

    router: Arc<MessageRouter>,

    ws_sink: Arc<RwLock<WsSink>>,

    request_timeout: Duration,
}

/// Hands incoming messages to the request waiting for them or to event
/// subscribers
#[derive(Default)]
struct MessageRouter {
    /// Pending requests waiting for responses
    pending: DashMap<RequestId, oneshot::Sender<Result<CDPResponse>>>,

    /// Key: method name (e.g., "Page.frameNavigated")
    subscribers: DashMap<String, Vec<EventCallback>>,
}

impl MessageRouter {
    fn register(&self, id: RequestId) -> oneshot::Receiver<Result<CDPResponse>> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        rx
    }

    fn forget(&self, id: RequestId) {
        self.pending.remove(&id);
    }

    /// Dropping the senders wakes every waiter with `Closed`
    fn close_all(&self) {
        self.pending.clear();
    }

    fn subscribe(&self, method: String, callback: EventCallback) {
        self.subscribers.entry(method).or_default().push(callback);
    }

    fn handle_message(&self, text: &str) -> Result<()> {
        let msg: CDPMessage = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(e) => {
                // A response we cannot read still belongs to someone
                if let Some(id) = leading_request_id(text) {
                    if let Some((_, tx)) = self.pending.remove(&id) {
                        let _ = tx.send(Err(CDPError::Json(e)));
                        return Err(CDPError::InvalidResponse(id));
                    }
                }
                return Err(e.into());
            }
        };

        match msg {
            CDPMessage::Response(response) => {
                if let Some((_, tx)) = self.pending.remove(&response.id) {
                    let _ = tx.send(Ok(response));
                } else {
                    tracing::warn!("Received response for unknown request: {}", response.id);
                }
            }
            CDPMessage::Event(event) => {
                if let Some(subscribers) = self.subscribers.get(&event.method) {
                    for callback in subscribers.value() {
                        callback(event.clone());
                    }
                }
            }
        }

        Ok(())
    }
}

/// Id of a response whose body failed to parse; Chrome writes `id` first
fn leading_request_id(text: &str) -> Option<RequestId> {
    let rest = text
        .trim_start()
        .strip_prefix('{')?
        .trim_start()
        .strip_prefix("\"id\"")?
        .trim_start()
        .strip_prefix(':')?
        .trim_start();
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

/// Only `ws://` and `wss://` endpoints are accepted
pub fn validate_endpoint(ws_url: &str) -> Result<Url> {
    let url = Url::parse(ws_url).map_err(|e| CDPError::InvalidUrl(format!("{ws_url}: {e}")))?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        scheme => Err(CDPError::InvalidUrl(format!(
            "{ws_url}: expected ws or wss, got {scheme}"
        ))),
    }
}

impl CDPClient {
    /// Connect to Chrome DevTools Protocol endpoint
    pub async fn connect(ws_url: &str) -> Result<Arc<Self>> {
        Self::connect_with_timeout(ws_url, DEFAULT_REQUEST_TIMEOUT).await
    }

    pub async fn connect_with_timeout(ws_url: &str, request_timeout: Duration) -> Result<Arc<Self>> {
        let url = validate_endpoint(ws_url)?;
        let (ws_stream, _) = connect_async(url.as_str()).await?;
        let (sink, mut stream) = ws_stream.split();

        let client = Arc::new(Self {
            next_id: AtomicU64::new(1),
            router: Arc::new(MessageRouter::default()),
            ws_sink: Arc::new(RwLock::new(sink)),
            request_timeout,
        });

        // Receiver task lives until the socket closes
        let router = client.router.clone();
        tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if let Err(e) = router.handle_message(&text) {
                            tracing::error!("Failed to handle message: {}", e);
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Err(e) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
            tracing::info!("WebSocket closed");
            router.close_all();
        });

        tracing::debug!(endpoint = %url, "connected to DevTools");
        Ok(client)
    }

    /// Send CDP request and wait for response
    pub async fn send_request(
        &self,
        method: impl Into<String>,
        params: Option<Value>,
        session_id: Option<SessionId>,
    ) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = CDPRequest {
            id,
            method: method.into(),
            params,
            session_id,
        };

        let json = serde_json::to_string(&request)?;
        let rx = self.router.register(id);

        let mut sink = self.ws_sink.write().await;
        if let Err(e) = sink.send(Message::Text(json)).await {
            self.router.forget(id);
            return Err(CDPError::WebSocket(e));
        }
        drop(sink);

        let response = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(Ok(response))) => response,
            Ok(Ok(Err(e))) => {
                tracing::warn!(id, method = %request.method, error = %e, "unreadable CDP response");
                return Err(e);
            }
            Ok(Err(_)) => return Err(CDPError::Closed),
            Err(_) => {
                self.router.forget(id);
                tracing::warn!(id, method = %request.method, "CDP request timed out");
                return Err(CDPError::Timeout);
            }
        };

        if response.id != id {
            return Err(CDPError::InvalidResponse(id));
        }
        if let Some(error) = response.error {
            return Err(CDPError::Protocol {
                code: error.code,
                message: error.message,
            });
        }

        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Subscribe to CDP events
    pub fn subscribe(&self, method: impl Into<String>, callback: EventCallback) {
        self.router.subscribe(method.into(), callback);
    }

    /// Close connection gracefully
    pub async fn close(self: Arc<Self>) -> Result<()> {
        let mut sink = self.ws_sink.write().await;
        sink.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_validation() {
        assert!(validate_endpoint("ws://localhost:9222/devtools/browser/abc").is_ok());
        assert!(validate_endpoint("wss://remote.example/devtools").is_ok());
        assert!(matches!(
            validate_endpoint("http://localhost:9222"),
            Err(CDPError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_endpoint("localhost:9222"),
            Err(CDPError::InvalidUrl(_))
        ));
    }

    /// `Runtime.evaluate` response carrying a page with a button `depth` levels down
    fn deep_snapshot_response(id: RequestId, depth: u32) -> String {
        let layout = r#""layout":{"x":10,"y":10,"width":100,"height":20}"#;
        let mut nodes = vec![format!(r#"{{"nodeId":0,"nodeType":1,"nodeName":"BODY",{}}}"#, layout)];
        for ordinal in 1..depth {
            nodes.push(format!(
                r#"{{"nodeId":{},"parentId":{},"nodeType":1,"nodeName":"DIV",{}}}"#,
                ordinal,
                ordinal - 1,
                layout
            ));
        }
        nodes.push(format!(
            r#"{{"nodeId":{},"parentId":{},"nodeType":1,"nodeName":"BUTTON","attributes":["aria-label","Bottom"],{}}}"#,
            depth,
            depth - 1,
            layout
        ));
        format!(
            r#"{{"id":{},"result":{{"result":{{"type":"object","value":{{"viewport":{{"width":800,"height":600}},"nodes":[{}]}}}}}}}}"#,
            id,
            nodes.join(",")
        )
    }

    #[tokio::test]
    async fn test_deep_page_snapshot_reaches_caller() {
        let router = MessageRouter::default();
        let rx = router.register(7);

        router
            .handle_message(&deep_snapshot_response(7, 100))
            .unwrap();

        let response = rx.await.unwrap().unwrap();
        let result = response.result.unwrap();
        let snapshot = &result["result"]["value"];

        let mut service = interact_dom::DomService::new();
        service.parse_snapshot(snapshot).unwrap();
        let mut arena = service.into_arena();
        let extraction = interact_dom::Extractor::new().extract(&mut arena).unwrap();

        assert_eq!(extraction.descriptors.len(), 1);
        assert_eq!(extraction.descriptors[0].label, "Bottom");
    }

    #[tokio::test]
    async fn test_unreadable_response_fails_its_request() {
        let router = MessageRouter::default();
        let rx = router.register(8);
        let other = router.register(9);

        // Nested past serde_json's recursion limit
        let text = format!(r#"{{"id": 8, "result": {}{}}}"#, "[".repeat(200), "]".repeat(200));
        assert!(matches!(
            router.handle_message(&text),
            Err(CDPError::InvalidResponse(8))
        ));

        let outcome = tokio::time::timeout(Duration::from_millis(100), rx)
            .await
            .expect("waiter should be woken immediately")
            .unwrap();
        assert!(matches!(outcome, Err(CDPError::Json(_))));
        assert!(router.pending.contains_key(&9));
        drop(other);
    }

    #[test]
    fn test_garbage_without_id_is_only_reported() {
        let router = MessageRouter::default();
        let _rx = router.register(1);

        assert!(matches!(router.handle_message("not json"), Err(CDPError::Json(_))));
        assert!(matches!(
            router.handle_message(r#"{"id": 42, "result": "#),
            Err(CDPError::Json(_))
        ));
        assert!(router.pending.contains_key(&1));
    }

    #[test]
    fn test_leading_request_id() {
        assert_eq!(leading_request_id(r#"{"id":12,"result":{}}"#), Some(12));
        assert_eq!(leading_request_id(r#" { "id" : 3 , "result""#), Some(3));
        assert_eq!(leading_request_id(r#"{"method":"Page.loadEventFired"}"#), None);
        assert_eq!(leading_request_id(r#"{"id":"x"}"#), None);
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_scheme_before_dialing() {
        let result = CDPClient::connect("http://localhost:9222/json").await;
        assert!(matches!(result, Err(CDPError::InvalidUrl(_))));
    }

    // Needs a running Chrome instance
    #[tokio::test]
    #[ignore]
    async fn test_connect() {
        let client = CDPClient::connect("ws://localhost:9222/devtools/browser")
            .await
            .unwrap();

        let result = client
            .send_request("Browser.getVersion", None, None)
            .await
            .unwrap();

        println!("Browser version: {:?}", result);
    }
}
