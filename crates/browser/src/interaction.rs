//! Interaction session: one page, one identifier registry
//!
//! Identifiers handed out by [`InteractionSession::extract`] stay valid until
//! the next extraction, a navigation (the page drops its markers) or
//! [`InteractionSession::invalidate`]. Every action re-locates its element by
//! marker in the live page, so a stale identifier fails loudly instead of
//! landing on whatever now sits at the old position.

use crate::cdp::client::{self, CDPError};
use crate::error::{ActionError, Result};
use crate::page::PageHandle;
use crate::scripts::{
    clear_script, focus_script, locate_script, select_script, tag_script, ElementOutcome, Located,
    TagOutcome, RELEASE_SCRIPT, SNAPSHOT_SCRIPT,
};
use interact_dom::{DomService, Extraction, ExtractionConfig, Extractor, IdRegistry};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upper bound on every page round trip
    pub request_timeout: Duration,
    pub extraction: ExtractionConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout: client::DEFAULT_REQUEST_TIMEOUT,
            extraction: ExtractionConfig::default(),
        }
    }
}

pub struct InteractionSession<P: PageHandle> {
    page: P,
    config: SessionConfig,
    extractor: Extractor,
    registry: Option<IdRegistry>,
}

impl<P: PageHandle> InteractionSession<P> {
    pub fn new(page: P) -> Self {
        Self::with_config(page, SessionConfig::default())
    }

    pub fn with_config(page: P, config: SessionConfig) -> Self {
        let extractor = Extractor::with_config(config.extraction.clone());
        Self {
            page,
            config,
            extractor,
            registry: None,
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    /// Registry of the last extraction, if it has not been invalidated
    pub fn registry(&self) -> Option<&IdRegistry> {
        self.registry.as_ref()
    }

    fn marker(&self) -> &str {
        &self.extractor.config().marker_attribute
    }

    /// Snapshot the page, extract the interaction list and tag the live elements.
    ///
    /// Identifiers from any earlier extraction are invalid afterwards.
    pub async fn extract(&mut self) -> Result<Extraction> {
        self.registry = None;

        let snapshot = self.bounded(self.page.evaluate(SNAPSHOT_SCRIPT)).await?;
        let extraction = match self.extract_from(&snapshot) {
            Ok(extraction) => extraction,
            Err(e) => {
                // The tag script never runs, so free the page's node list here
                if let Err(release) = self.bounded(self.page.evaluate(RELEASE_SCRIPT)).await {
                    tracing::debug!(error = %release, "could not release snapshot nodes");
                }
                return Err(e);
            }
        };

        let assignments: Vec<_> = extraction
            .registry
            .iter()
            .map(|(id, entry)| (entry.snapshot_id, id))
            .collect();
        let outcome: TagOutcome = self
            .evaluate(&tag_script(self.marker(), &assignments))
            .await?;
        if outcome.tagged < assignments.len() {
            tracing::warn!(
                expected = assignments.len(),
                tagged = outcome.tagged,
                "page changed between snapshot and tagging"
            );
        }

        tracing::info!(
            count = extraction.descriptors.len(),
            cleared = outcome.cleared,
            partial = extraction.is_partial(),
            "interaction tree extracted"
        );

        self.registry = Some(extraction.registry.clone());
        Ok(extraction)
    }

    fn extract_from(&self, snapshot: &Value) -> Result<Extraction> {
        let mut service = DomService::new();
        service.parse_snapshot(snapshot)?;
        let mut arena = service.into_arena();
        Ok(self.extractor.extract(&mut arena)?)
    }

    /// Forget the current identifiers, e.g. after the caller navigated
    pub fn invalidate(&mut self) {
        if self.registry.take().is_some() {
            tracing::debug!("interaction registry invalidated");
        }
    }

    /// Native left click at the element's centre
    pub async fn click(&self, id: u32) -> Result<()> {
        let located = self.locate(id).await?;
        if located.hidden {
            return Err(ActionError::Hidden(id));
        }
        self.bounded(self.page.click_at(located.x, located.y))
            .await?;
        tracing::debug!(id, x = located.x, y = located.y, "clicked element");
        Ok(())
    }

    /// Click the element to focus it, then insert `text`
    pub async fn type_text(&self, text: &str, id: u32) -> Result<()> {
        self.click(id).await?;
        self.bounded(self.page.insert_text(text)).await?;
        tracing::debug!(id, chars = text.chars().count(), "typed text");
        Ok(())
    }

    pub async fn focus(&self, id: u32) -> Result<()> {
        self.run_on_element(id, &focus_script(self.marker(), id))
            .await
    }

    /// Empty an input, textarea or contenteditable element
    pub async fn clear_input(&self, id: u32) -> Result<()> {
        self.run_on_element(id, &clear_script(self.marker(), id))
            .await
    }

    /// Choose the option of a select whose value or text equals `value`
    pub async fn select_option(&self, id: u32, value: &str) -> Result<()> {
        self.run_on_element(id, &select_script(self.marker(), id, value))
            .await
    }

    async fn locate(&self, id: u32) -> Result<Located> {
        self.ensure_issued(id)?;
        let located: Located = self.evaluate(&locate_script(self.marker(), id)).await?;
        if !located.found {
            tracing::debug!(id, "marker not found in page");
            return Err(ActionError::StaleIdentifier(id));
        }
        Ok(located)
    }

    async fn run_on_element(&self, id: u32, script: &str) -> Result<()> {
        self.ensure_issued(id)?;
        let outcome: ElementOutcome = self.evaluate(script).await?;
        if !outcome.found {
            return Err(ActionError::StaleIdentifier(id));
        }
        if !outcome.ok {
            return Err(ActionError::UnexpectedResult(
                outcome
                    .reason
                    .unwrap_or_else(|| format!("action on element {id} failed")),
            ));
        }
        Ok(())
    }

    /// Identifiers outside the current registry never reach the page
    fn ensure_issued(&self, id: u32) -> Result<()> {
        match &self.registry {
            Some(registry) if registry.get(id).is_some() => Ok(()),
            _ => Err(ActionError::StaleIdentifier(id)),
        }
    }

    async fn evaluate<T: DeserializeOwned>(&self, script: &str) -> Result<T> {
        let value = self.bounded(self.page.evaluate(script)).await?;
        serde_json::from_value(value).map_err(|e| ActionError::UnexpectedResult(e.to_string()))
    }

    async fn bounded<T>(&self, request: impl Future<Output = client::Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.config.request_timeout, request).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(CDPError::Timeout.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use interact_dom::{RegionCode, TypeCode};
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Answers `evaluate` from a queue and records everything it is asked to do
    #[derive(Default)]
    struct ScriptedPage {
        responses: Mutex<VecDeque<Value>>,
        scripts: Mutex<Vec<String>>,
        clicks: Mutex<Vec<(f64, f64)>>,
        typed: Mutex<Vec<String>>,
        hang: bool,
    }

    impl ScriptedPage {
        fn push(&self, value: Value) {
            self.responses.lock().unwrap().push_back(value);
        }

        fn script_count(&self) -> usize {
            self.scripts.lock().unwrap().len()
        }

        fn last_script(&self) -> String {
            self.scripts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl PageHandle for ScriptedPage {
        async fn evaluate(&self, script: &str) -> client::Result<Value> {
            self.scripts.lock().unwrap().push(script.to_string());
            if self.hang {
                std::future::pending::<()>().await;
            }
            let next = self.responses.lock().unwrap().pop_front();
            next.ok_or(CDPError::Closed)
        }

        async fn click_at(&self, x: f64, y: f64) -> client::Result<()> {
            self.clicks.lock().unwrap().push((x, y));
            Ok(())
        }

        async fn insert_text(&self, text: &str) -> client::Result<()> {
            self.typed.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    /// One element of a flat snapshot, as the snapshot script emits it
    fn element(id: u32, parent: Option<u32>, tag: &str, attrs: Value, rect: [f64; 4]) -> Value {
        let mut node = json!({
            "nodeId": id, "nodeType": 1, "nodeName": tag, "attributes": attrs,
            "layout": { "x": rect[0], "y": rect[1], "width": rect[2], "height": rect[3] }
        });
        if let Some(parent) = parent {
            node["parentId"] = json!(parent);
        }
        node
    }

    fn text(id: u32, parent: u32, value: &str) -> Value {
        json!({ "nodeId": id, "parentId": parent, "nodeType": 3, "nodeName": "#text", "nodeValue": value })
    }

    fn page_snapshot() -> Value {
        let mut email = element(5, Some(4), "INPUT", json!(["type", "email", "placeholder", "Email"]), [300.0, 200.0, 200.0, 24.0]);
        email["state"] = json!({ "value": "" });
        let mut country = element(8, Some(4), "SELECT", json!(["name", "country"]), [300.0, 320.0, 120.0, 24.0]);
        country["state"] = json!({ "value": "de", "selectedText": "Germany" });

        json!({
            "viewport": { "width": 1280, "height": 720 },
            "nodes": [
                element(0, None, "BODY", json!([]), [0.0, 0.0, 1280.0, 720.0]),
                element(1, Some(0), "HEADER", json!([]), [0.0, 0.0, 1280.0, 60.0]),
                element(2, Some(1), "A", json!(["href", "/"]), [10.0, 10.0, 60.0, 20.0]),
                text(3, 2, "Home"),
                element(4, Some(0), "MAIN", json!([]), [0.0, 60.0, 1280.0, 600.0]),
                email,
                element(6, Some(4), "BUTTON", json!([]), [300.0, 260.0, 80.0, 30.0]),
                text(7, 6, "Save"),
                country,
            ]
        })
    }

    async fn extracted() -> InteractionSession<ScriptedPage> {
        let page = ScriptedPage::default();
        page.push(page_snapshot());
        page.push(json!({ "cleared": 0, "tagged": 4 }));
        let mut session = InteractionSession::new(page);
        session.extract().await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_extract_describes_and_tags_page() {
        let page = ScriptedPage::default();
        page.push(page_snapshot());
        page.push(json!({ "cleared": 2, "tagged": 4 }));
        let mut session = InteractionSession::new(page);

        let extraction = tokio_test::assert_ok!(session.extract().await);
        let summary: Vec<_> = extraction
            .descriptors
            .iter()
            .map(|d| (d.id, d.kind, d.label.as_str(), d.region))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, TypeCode::Link, "Home", RegionCode::Header),
                (2, TypeCode::Input, "Email", RegionCode::Main),
                (3, TypeCode::Button, "Save", RegionCode::Main),
                (4, TypeCode::Select, "country", RegionCode::Main),
            ]
        );
        assert_eq!(extraction.descriptors[1].input_type.as_deref(), Some("email"));
        assert_eq!(extraction.descriptors[3].value.as_deref(), Some("de"));

        let tag = session.page().last_script();
        assert!(tag.contains("const pairs = [[2,1],[5,2],[6,3],[8,4]];"));
        assert_eq!(session.registry().map(|r| r.len()), Some(4));
    }

    #[tokio::test]
    async fn test_click_dispatches_at_centre() {
        let session = extracted().await;
        session
            .page()
            .push(json!({ "found": true, "hidden": false, "x": 340.0, "y": 275.0 }));

        tokio_test::assert_ok!(session.click(3).await);
        assert!(session.page().last_script().contains(r#"const id = "3";"#));
        assert_eq!(*session.page().clicks.lock().unwrap(), vec![(340.0, 275.0)]);
    }

    #[tokio::test]
    async fn test_missing_marker_is_stale_not_misdirected() {
        let session = extracted().await;
        // The page reloaded: same layout, no markers
        session.page().push(json!({ "found": false }));

        let err = session.click(3).await.unwrap_err();
        assert!(matches!(err, ActionError::StaleIdentifier(3)));
        assert!(err.is_stale());
        assert!(session.page().clicks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hidden_element_is_not_clicked() {
        let session = extracted().await;
        session
            .page()
            .push(json!({ "found": true, "hidden": true, "x": 0.0, "y": 0.0 }));

        let err = session.click(1).await.unwrap_err();
        assert!(matches!(err, ActionError::Hidden(1)));
        assert!(!err.is_stale());
    }

    #[tokio::test]
    async fn test_unknown_identifier_never_reaches_page() {
        let session = extracted().await;
        let before = session.page().script_count();

        assert!(matches!(session.click(99).await, Err(ActionError::StaleIdentifier(99))));
        assert!(matches!(session.focus(0).await, Err(ActionError::StaleIdentifier(0))));
        assert_eq!(session.page().script_count(), before);
    }

    #[tokio::test]
    async fn test_actions_before_extract_or_after_invalidate_are_stale() {
        let fresh = InteractionSession::new(ScriptedPage::default());
        assert!(fresh.click(1).await.unwrap_err().is_stale());

        let mut session = extracted().await;
        session.invalidate();
        assert!(session.registry().is_none());
        assert!(session.type_text("hi", 2).await.unwrap_err().is_stale());
    }

    #[tokio::test]
    async fn test_type_text_clicks_then_inserts() {
        let session = extracted().await;
        session
            .page()
            .push(json!({ "found": true, "hidden": false, "x": 400.0, "y": 212.0 }));

        tokio_test::assert_ok!(session.type_text("user@example.com", 2).await);
        assert_eq!(session.page().clicks.lock().unwrap().len(), 1);
        assert_eq!(
            *session.page().typed.lock().unwrap(),
            vec!["user@example.com".to_string()]
        );
    }

    #[tokio::test]
    async fn test_element_actions_report_script_outcome() {
        let session = extracted().await;

        session.page().push(json!({ "found": true, "ok": true }));
        tokio_test::assert_ok!(session.select_option(4, "Germany").await);
        assert!(session.page().last_script().contains(r#"const wanted = "Germany";"#));

        session
            .page()
            .push(json!({ "found": true, "ok": false, "reason": "no option \"fr\"" }));
        let err = session.select_option(4, "fr").await.unwrap_err();
        assert!(matches!(err, ActionError::UnexpectedResult(ref reason) if reason.contains("fr")));

        session.page().push(json!({ "found": true, "ok": true }));
        tokio_test::assert_ok!(session.clear_input(2).await);

        session.page().push(json!({ "found": false }));
        assert!(session.focus(2).await.unwrap_err().is_stale());
    }

    #[tokio::test]
    async fn test_malformed_snapshot_is_dom_error() {
        let page = ScriptedPage::default();
        page.push(json!({ "viewport": { "width": 800, "height": 600 } }));
        let mut session = InteractionSession::new(page);

        let err = session.extract().await.unwrap_err();
        assert!(matches!(err, ActionError::Dom(_)));
        assert!(session.registry().is_none());
        // No tag script will run, so the live-node list is released directly
        assert_eq!(session.page().script_count(), 2);
        assert_eq!(session.page().last_script(), RELEASE_SCRIPT);
    }

    #[tokio::test]
    async fn test_tagging_releases_live_nodes() {
        let session = extracted().await;
        assert!(session
            .page()
            .last_script()
            .contains("delete window.__interactNodes;"));
    }

    #[tokio::test]
    async fn test_page_round_trip_is_bounded() {
        let page = ScriptedPage {
            hang: true,
            ..Default::default()
        };
        let config = SessionConfig {
            request_timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let mut session = InteractionSession::with_config(page, config);

        let err = session.extract().await.unwrap_err();
        assert!(matches!(err, ActionError::Dispatch(CDPError::Timeout)));
    }
}
