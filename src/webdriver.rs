use std::time::Duration;

use camino::Utf8Path;
use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::{Value, json};

use crate::browser::{ArchiveBrowser, Locator, PageElement};
use crate::error::CtError;

/// Key under which W3C WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// A Chrome session driven through a running chromedriver.
pub struct WebDriverSession {
    client: Client,
    session_url: String,
}

impl WebDriverSession {
    /// Starts a browser. With `download_dir`, Chrome saves downloads there
    /// without asking and keeps PDFs out of its built-in viewer.
    pub fn start(webdriver_url: &str, download_dir: Option<&Utf8Path>) -> Result<Self, CtError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("ct-fetch/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CtError::WebDriverHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|err| CtError::WebDriverHttp(err.to_string()))?;

        let mut chrome_options = json!({});
        if let Some(dir) = download_dir {
            chrome_options["prefs"] = json!({
                "download.default_directory": dir.as_str(),
                "download.prompt_for_download": false,
                "plugins.always_open_pdf_externally": true,
            });
        }
        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": chrome_options,
                }
            }
        });

        let base = webdriver_url.trim_end_matches('/');
        let value = send(&client, Method::POST, &format!("{base}/session"), Some(body))?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| CtError::SessionLost("no session id in new-session reply".to_string()))?;
        tracing::info!("browser session {session_id} started.");

        Ok(Self {
            client,
            session_url: format!("{base}/session/{session_id}"),
        })
    }

    fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, CtError> {
        send(&self.client, method, &format!("{}{path}", self.session_url), body)
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        tracing::info!("closing browser.");
        if let Err(err) = self.command(Method::DELETE, "", None) {
            tracing::warn!("failed to close browser session: {err}");
        }
    }
}

impl ArchiveBrowser for WebDriverSession {
    type Element = WebDriverElement;

    fn find_elements(&self, locator: &Locator) -> Result<Vec<WebDriverElement>, CtError> {
        let (using, value) = locator.strategy();
        let found = self.command(
            Method::POST,
            "/elements",
            Some(json!({ "using": using, "value": value })),
        )?;
        let references = found
            .as_array()
            .ok_or_else(|| CtError::WebDriverHttp("find elements reply is not a list".to_string()))?;
        references
            .iter()
            .map(|reference| {
                let id = reference
                    .get(ELEMENT_KEY)
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        CtError::WebDriverHttp("element reference without id".to_string())
                    })?;
                Ok(WebDriverElement {
                    client: self.client.clone(),
                    element_url: format!("{}/element/{id}", self.session_url),
                })
            })
            .collect()
    }

    fn navigate_to(&self, url: &str) -> Result<(), CtError> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .map(|_| ())
            .map_err(navigation_error)
    }

    fn navigate_back(&self) -> Result<(), CtError> {
        self.command(Method::POST, "/back", Some(json!({})))
            .map(|_| ())
            .map_err(navigation_error)
    }
}

#[derive(Clone)]
pub struct WebDriverElement {
    client: Client,
    element_url: String,
}

impl WebDriverElement {
    fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, CtError> {
        send(&self.client, method, &format!("{}{path}", self.element_url), body)
    }
}

impl PageElement for WebDriverElement {
    fn text(&self) -> Result<String, CtError> {
        let value = self.command(Method::GET, "/text", None)?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    fn click(&self) -> Result<(), CtError> {
        self.command(Method::POST, "/click", Some(json!({})))
            .map(|_| ())
    }

    fn is_displayed(&self) -> Result<bool, CtError> {
        let value = self.command(Method::GET, "/displayed", None)?;
        Ok(value.as_bool().unwrap_or(false))
    }

    fn send_keys(&self, text: &str) -> Result<(), CtError> {
        self.command(Method::POST, "/value", Some(json!({ "text": text })))
            .map(|_| ())
    }
}

fn send(client: &Client, method: Method, url: &str, body: Option<Value>) -> Result<Value, CtError> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request
        .send()
        .map_err(|err| CtError::WebDriverHttp(err.to_string()))?;
    let status = response.status();
    let payload: Value = response
        .json()
        .map_err(|err| CtError::WebDriverHttp(err.to_string()))?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);
    if status.is_success() {
        return Ok(value);
    }
    Err(classify_failure(status.as_u16(), &value))
}

/// Maps a W3C error reply onto the crate's error taxonomy.
pub fn classify_failure(status: u16, value: &Value) -> CtError {
    let error = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    match error.as_str() {
        "invalid session id" | "session not created" => CtError::SessionLost(message),
        "stale element reference" => CtError::StaleElement(message),
        "no such element" => CtError::ElementMissing(message),
        _ => CtError::WebDriverStatus {
            status,
            error,
            message,
        },
    }
}

fn navigation_error(err: CtError) -> CtError {
    match err {
        CtError::WebDriverStatus { error, message, .. } => {
            CtError::SessionLost(format!("navigation failed ({error}): {message}"))
        }
        other => other,
    }
}
