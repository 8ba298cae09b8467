//! Minimal W3C WebDriver client over HTTP.
//!
//! Only the commands the inquiry form needs are implemented: session
//! lifecycle, navigation, CSS element lookup, frame switching, typing,
//! clicking and reading text.

use crate::error::AdapterError;
use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Key under which WebDriver returns element references.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Opaque reference to an element in the current browsing context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementId(String);

impl ElementId {
    fn reference(&self) -> Value {
        json!({ ELEMENT_KEY: self.0 })
    }
}

/// Readiness reported by `GET /status`.
#[derive(Debug, Clone, Deserialize)]
pub struct DriverStatus {
    /// Whether the server accepts new sessions.
    pub ready: bool,
    /// Human-readable status message.
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorValue {
    error: String,
    #[serde(default)]
    message: String,
}

/// HTTP client bound to one WebDriver server.
#[derive(Debug, Clone)]
pub struct WebDriverClient {
    http: reqwest::Client,
    base: Url,
}

impl WebDriverClient {
    /// Creates a client for the server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::InvalidUrl` when `base_url` does not parse, or
    /// `AdapterError::Http` if the HTTP client cannot be built.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, AdapterError> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base = Url::parse(&normalized)
            .map_err(|e| AdapterError::InvalidUrl(format!("{base_url}: {e}")))?;
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self { http, base })
    }

    /// The normalized server URL (always ends in `/`).
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// Queries server readiness.
    ///
    /// # Errors
    ///
    /// Returns an error when the server is unreachable or answers with an
    /// unexpected body.
    pub async fn status(&self) -> Result<DriverStatus, AdapterError> {
        let value = self.send(Method::GET, "status", None).await?;
        serde_json::from_value(value).map_err(|e| AdapterError::MalformedResponse(e.to_string()))
    }

    /// Opens a new browser session with the given capabilities.
    ///
    /// `profile` is kept alive for as long as the session exists.
    ///
    /// # Errors
    ///
    /// Returns an error when the server refuses to create the session.
    pub async fn new_session(
        &self,
        capabilities: Value,
        profile: Option<TempDir>,
    ) -> Result<BrowserSession, AdapterError> {
        let value = self
            .send(Method::POST, "session", Some(json!({ "capabilities": capabilities })))
            .await?;
        let id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| AdapterError::MalformedResponse(format!("no sessionId in {value}")))?
            .to_string();

        tracing::debug!(session = %id, "WebDriver session created");

        Ok(BrowserSession {
            client: self.clone(),
            id,
            created: Instant::now(),
            profile,
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, AdapterError> {
        let url = self
            .base
            .join(path)
            .map_err(|e| AdapterError::InvalidUrl(format!("{path}: {e}")))?;

        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let mut parsed: Value = serde_json::from_str(&text).map_err(|_| {
            AdapterError::MalformedResponse(format!("HTTP {status}: {}", truncate(&text, 200)))
        })?;
        let value = parsed
            .get_mut("value")
            .map(Value::take)
            .unwrap_or(Value::Null);

        if !status.is_success() {
            return Err(match serde_json::from_value::<ErrorValue>(value) {
                Ok(err) => AdapterError::WebDriver {
                    error: err.error,
                    message: err.message,
                },
                Err(_) => AdapterError::MalformedResponse(format!("HTTP {status}")),
            });
        }

        Ok(value)
    }
}

/// One live browser session.
///
/// Dropping the session does not close the browser; call [`Self::close`].
#[derive(Debug)]
pub struct BrowserSession {
    client: WebDriverClient,
    id: String,
    created: Instant,
    profile: Option<TempDir>,
}

impl BrowserSession {
    /// Session id assigned by the server.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Time since the session was created.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.created.elapsed()
    }

    /// Moves the session out of `self`, leaving a husk that owns no profile.
    pub(crate) fn detach(&mut self) -> Self {
        Self {
            client: self.client.clone(),
            id: self.id.clone(),
            created: self.created,
            profile: self.profile.take(),
        }
    }

    /// Loads `url` in the top-level browsing context.
    pub async fn navigate(&self, url: &str) -> Result<(), AdapterError> {
        self.command(Method::POST, "url", Some(json!({ "url": url })))
            .await
            .map(drop)
    }

    /// Finds the first element matching a CSS selector.
    pub async fn find(&self, selector: &str) -> Result<ElementId, AdapterError> {
        let value = self
            .command(
                Method::POST,
                "element",
                Some(json!({ "using": "css selector", "value": selector })),
            )
            .await?;
        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(|id| ElementId(id.to_string()))
            .ok_or_else(|| AdapterError::MalformedResponse(format!("no element reference in {value}")))
    }

    /// Polls for an element until it appears or `timeout` passes.
    pub async fn wait_for(
        &self,
        selector: &str,
        timeout: Duration,
        poll: Duration,
    ) -> Result<ElementId, AdapterError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.find(selector).await {
                Ok(element) => return Ok(element),
                Err(e) if e.is_missing_element() => {}
                Err(e) => return Err(e),
            }
            if tokio::time::Instant::now() + poll > deadline {
                return Err(AdapterError::ElementNotFound {
                    selector: selector.to_string(),
                    waited: timeout,
                });
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// Polls until an element is present, displayed and enabled.
    pub async fn wait_until_clickable(
        &self,
        selector: &str,
        timeout: Duration,
        poll: Duration,
    ) -> Result<ElementId, AdapterError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.find(selector).await {
                Ok(element) => {
                    if self.is_displayed(&element).await? && self.is_enabled(&element).await? {
                        return Ok(element);
                    }
                }
                Err(e) if e.is_missing_element() => {}
                Err(e) => return Err(e),
            }
            if tokio::time::Instant::now() + poll > deadline {
                return Err(AdapterError::ElementNotFound {
                    selector: selector.to_string(),
                    waited: timeout,
                });
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// Switches into the iframe referenced by `frame`.
    pub async fn switch_to_frame(&self, frame: &ElementId) -> Result<(), AdapterError> {
        self.command(Method::POST, "frame", Some(json!({ "id": frame.reference() })))
            .await
            .map(drop)
    }

    /// Switches back to the top-level browsing context.
    pub async fn switch_to_top(&self) -> Result<(), AdapterError> {
        self.command(Method::POST, "frame", Some(json!({ "id": null })))
            .await
            .map(drop)
    }

    /// Empties a text input.
    pub async fn clear(&self, element: &ElementId) -> Result<(), AdapterError> {
        self.element_command(Method::POST, element, "clear", Some(json!({})))
            .await
            .map(drop)
    }

    /// Types `text` into an element.
    pub async fn send_keys(&self, element: &ElementId, text: &str) -> Result<(), AdapterError> {
        self.element_command(Method::POST, element, "value", Some(json!({ "text": text })))
            .await
            .map(drop)
    }

    /// Clicks an element.
    pub async fn click(&self, element: &ElementId) -> Result<(), AdapterError> {
        self.element_command(Method::POST, element, "click", Some(json!({})))
            .await
            .map(drop)
    }

    /// Rendered text of an element.
    pub async fn text(&self, element: &ElementId) -> Result<String, AdapterError> {
        let value = self.element_command(Method::GET, element, "text", None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Whether a form control accepts input.
    pub async fn is_enabled(&self, element: &ElementId) -> Result<bool, AdapterError> {
        let value = self.element_command(Method::GET, element, "enabled", None).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Whether an element is rendered visibly.
    pub async fn is_displayed(&self, element: &ElementId) -> Result<bool, AdapterError> {
        let value = self
            .element_command(Method::GET, element, "displayed", None)
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Rendered text of `<body>` in the current browsing context.
    pub async fn body_text(&self) -> Result<String, AdapterError> {
        let body = self.find("body").await?;
        self.text(&body).await
    }

    /// Polls the body text until it contains one of `markers`.
    ///
    /// Returns the last text read even when no marker showed up in time;
    /// the caller decides what an unrecognized page means.
    pub async fn wait_for_text(
        &self,
        markers: &[&str],
        timeout: Duration,
        poll: Duration,
    ) -> Result<String, AdapterError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let text = match self.body_text().await {
                Ok(text) => text,
                Err(e) if e.is_missing_element() => String::new(),
                Err(e) => return Err(e),
            };
            if markers.iter().any(|m| text.contains(m)) {
                return Ok(text);
            }
            if tokio::time::Instant::now() + poll > deadline {
                tracing::debug!(session = %self.id, "result markers did not appear in {timeout:?}");
                return Ok(text);
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// Ends the session and closes the browser.
    pub async fn close(self) -> Result<(), AdapterError> {
        let path = format!("session/{}", self.id);
        self.client.send(Method::DELETE, &path, None).await?;
        tracing::debug!(session = %self.id, "WebDriver session closed");
        Ok(())
    }

    async fn command(
        &self,
        method: Method,
        suffix: &str,
        body: Option<Value>,
    ) -> Result<Value, AdapterError> {
        let path = format!("session/{}/{suffix}", self.id);
        self.client.send(method, &path, body).await
    }

    async fn element_command(
        &self,
        method: Method,
        element: &ElementId,
        suffix: &str,
        body: Option<Value>,
    ) -> Result<Value, AdapterError> {
        self.command(method, &format!("element/{}/{suffix}", element.0), body)
            .await
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
