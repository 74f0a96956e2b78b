use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::config::BrowserOptions;
use crate::engine::{BrowserEngine, ElementRef, ElementSize};
use crate::errors::HarvestError;

/// W3C web element identifier key.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
/// Legacy JSON wire protocol key, still emitted by some drivers.
const LEGACY_ELEMENT_KEY: &str = "ELEMENT";
/// Pointer travel time for a hover, matching common client libraries.
const POINTER_MOVE_MS: u64 = 250;

/// Lightweight W3C WebDriver client owning exactly one browser session.
#[derive(Debug)]
pub struct WebDriverClient {
    base_url: String,
    session_id: String,
    client: reqwest::Client,
    // Dropped (and deleted) together with the session owner.
    _profile_dir: Option<TempDir>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    value: Value,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct NewSession {
    #[serde(rename = "sessionId")]
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct Rect {
    width: f64,
    height: f64,
}

impl WebDriverClient {
    /// Check whether a WebDriver endpoint is answering
    pub async fn is_available(endpoint: &str) -> bool {
        let url = format!("{}/status", endpoint.trim_end_matches('/'));
        match reqwest::Client::new().get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Start a new Chrome session on the given WebDriver endpoint.
    pub async fn connect(endpoint: &str, options: &BrowserOptions) -> Result<Self, HarvestError> {
        let base_url = endpoint.trim_end_matches('/').to_string();
        let client = reqwest::Client::new();

        let profile_dir = match options.user_data_dir {
            Some(_) => None,
            None => Some(
                tempfile::Builder::new()
                    .prefix("flowwatch-profile-")
                    .tempdir()?,
            ),
        };
        let profile_path = match (&options.user_data_dir, &profile_dir) {
            (Some(path), _) => path.as_path(),
            (None, Some(dir)) => dir.path(),
            (None, None) => Path::new("."),
        };

        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": chrome_args(options, profile_path) }
                }
            }
        });

        let response = client
            .post(format!("{base_url}/session"))
            .json(&body)
            .send()
            .await?;
        let value = decode(response).await?;
        let session: NewSession = serde_json::from_value(value).map_err(|e| {
            HarvestError::UnexpectedResponse(format!("new session response: {e}"))
        })?;

        info!(
            session_id = %session.session_id,
            headless = options.headless,
            profile = %profile_path.display(),
            "Started browser session"
        );

        Ok(Self {
            base_url,
            session_id: session.session_id,
            client,
            _profile_dir: profile_dir,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, HarvestError> {
        let url = format!("{}/session/{}{}", self.base_url, self.session_id, path);
        debug!(%method, %url, "WebDriver command");
        let mut request = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(&body);
        } else if method == Method::POST {
            request = request.json(&json!({}));
        }
        decode(request.send().await?).await
    }
}

fn chrome_args(options: &BrowserOptions, profile: &Path) -> Vec<String> {
    let mut args = Vec::new();
    if options.headless {
        args.push("--headless".to_string());
    }
    args.push("--disable-gpu".to_string());
    let (width, height) = options.window_size;
    args.push(format!("--window-size={width},{height}"));
    args.push(format!("--user-data-dir={}", profile.display()));
    args
}

async fn decode(response: reqwest::Response) -> Result<Value, HarvestError> {
    let status = response.status();
    let body: WireResponse = response.json().await.map_err(|e| {
        HarvestError::UnexpectedResponse(format!("HTTP {status} with undecodable body: {e}"))
    })?;

    if let Some(Value::String(_)) = body.value.get("error") {
        let wire: WireError = serde_json::from_value(body.value)?;
        return Err(HarvestError::WebDriver {
            error: wire.error,
            message: wire.message,
        });
    }
    if !status.is_success() {
        return Err(HarvestError::UnexpectedResponse(format!(
            "HTTP {status}: {}",
            body.value
        )));
    }
    Ok(body.value)
}

fn element_origin(element: &ElementRef) -> Value {
    let mut origin = serde_json::Map::new();
    origin.insert(ELEMENT_KEY.to_string(), Value::String(element.id().to_string()));
    Value::Object(origin)
}

fn element_from_value(value: &Value) -> Option<ElementRef> {
    value
        .get(ELEMENT_KEY)
        .or_else(|| value.get(LEGACY_ELEMENT_KEY))
        .and_then(Value::as_str)
        .map(ElementRef::new)
}

#[async_trait::async_trait]
impl BrowserEngine for WebDriverClient {
    async fn navigate(&self, url: &str) -> Result<(), HarvestError> {
        info!(%url, "Navigating");
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    async fn find_elements(&self, xpath: &str) -> Result<Vec<ElementRef>, HarvestError> {
        let value = self
            .command(
                Method::POST,
                "/elements",
                Some(json!({ "using": "xpath", "value": xpath })),
            )
            .await?;
        let items = value.as_array().ok_or_else(|| {
            HarvestError::UnexpectedResponse(format!("expected element list, got {value}"))
        })?;
        let elements: Vec<ElementRef> = items.iter().filter_map(element_from_value).collect();
        if elements.len() != items.len() {
            warn!(
                returned = items.len(),
                parsed = elements.len(),
                "Some element references could not be parsed"
            );
        }
        debug!(count = elements.len(), %xpath, "Found elements");
        Ok(elements)
    }

    async fn attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, HarvestError> {
        let value = self
            .command(
                Method::GET,
                &format!("/element/{}/attribute/{}", element.id(), name),
                None,
            )
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn size(&self, element: &ElementRef) -> Result<ElementSize, HarvestError> {
        let value = self
            .command(Method::GET, &format!("/element/{}/rect", element.id()), None)
            .await?;
        let rect: Rect = serde_json::from_value(value)?;
        Ok(ElementSize {
            width: rect.width,
            height: rect.height,
        })
    }

    async fn text(&self, element: &ElementRef) -> Result<String, HarvestError> {
        let value = self
            .command(Method::GET, &format!("/element/{}/text", element.id()), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn click(&self, element: &ElementRef) -> Result<(), HarvestError> {
        self.command(
            Method::POST,
            &format!("/element/{}/click", element.id()),
            None,
        )
        .await
        .map(|_| ())
    }

    async fn hover(&self, element: &ElementRef, dx: i32, dy: i32) -> Result<(), HarvestError> {
        let actions = json!({
            "actions": [{
                "type": "pointer",
                "id": "mouse",
                "parameters": { "pointerType": "mouse" },
                "actions": [{
                    "type": "pointerMove",
                    "duration": POINTER_MOVE_MS,
                    "origin": element_origin(element),
                    "x": dx,
                    "y": dy
                }]
            }]
        });
        self.command(Method::POST, "/actions", Some(actions))
            .await
            .map(|_| ())
    }

    async fn quit(&self) -> Result<(), HarvestError> {
        info!(session_id = %self.session_id, "Closing browser session");
        let url = format!("{}/session/{}", self.base_url, self.session_id);
        decode(self.client.delete(&url).send().await?)
            .await
            .map(|_| ())
    }
}
