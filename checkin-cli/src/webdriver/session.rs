use std::time::Duration;

use checkin_core::error::CheckinResult;
use checkin_core::survey::survey_error;
use reqwest::Method;
use serde_json::{Value, json};

use super::{DriverServer, ELEMENT_KEY, protocol_error};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How to find an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Locator::XPath(expression.into())
    }

    fn to_json(&self) -> Value {
        match self {
            Locator::Css(s) => json!({ "using": "css selector", "value": s }),
            Locator::XPath(s) => json!({ "using": "xpath", "value": s }),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css `{s}`"),
            Locator::XPath(s) => write!(f, "xpath `{s}`"),
        }
    }
}

/// Reference to an element in the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element(String);

impl Element {
    fn from_json(value: &Value) -> Option<Self> {
        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(|id| Element(id.to_string()))
    }
}

/// An open browser session.
pub struct Session {
    http: reqwest::Client,
    /// `http://127.0.0.1:<port>/session/<id>`
    url: String,
    element_timeout: Duration,
}

impl Session {
    /// Open a new browser through `server`.
    pub async fn create(
        http: reqwest::Client,
        server: &DriverServer,
        headless: bool,
        binary: Option<&str>,
        element_timeout: Duration,
    ) -> CheckinResult<Self> {
        let capabilities = server
            .kind()
            .capabilities(headless, server.profile_dir(), binary);
        let url = format!("{}/session", server.base_url());

        let value = send(&http, Method::POST, &url, "new session", Some(capabilities)).await?;
        let id = value["sessionId"]
            .as_str()
            .ok_or_else(|| survey_error("WebDriver new session returned no session id"))?;

        tracing::debug!(session = id, "browser session opened");

        Ok(Session {
            http,
            url: format!("{url}/{id}"),
            element_timeout,
        })
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        name: &str,
        body: Option<Value>,
    ) -> CheckinResult<Value> {
        let url = format!("{}{}", self.url, path);
        send(&self.http, method, &url, name, body).await
    }

    pub async fn navigate(&self, url: &str) -> CheckinResult<()> {
        self.command(Method::POST, "/url", "navigate", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    /// Every element matching `locator` right now, possibly none.
    pub async fn find_all(&self, locator: &Locator) -> CheckinResult<Vec<Element>> {
        let value = self
            .command(Method::POST, "/elements", "find elements", Some(locator.to_json()))
            .await?;
        Ok(elements(&value))
    }

    /// Matches of `locator` below `parent`.
    pub async fn find_all_within(
        &self,
        parent: &Element,
        locator: &Locator,
    ) -> CheckinResult<Vec<Element>> {
        let path = format!("/element/{}/elements", parent.0);
        let value = self
            .command(Method::POST, &path, "find elements", Some(locator.to_json()))
            .await?;
        Ok(elements(&value))
    }

    /// Poll until at least one element matches, up to the element timeout.
    pub async fn wait_for_all(&self, locator: &Locator) -> CheckinResult<Vec<Element>> {
        let deadline = tokio::time::Instant::now() + self.element_timeout;

        loop {
            let found = self.find_all(locator).await?;
            if !found.is_empty() {
                return Ok(found);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(survey_error(format!(
                    "Timed out after {}s waiting for {}",
                    self.element_timeout.as_secs(),
                    locator
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// First element matching `locator`, waiting for it to appear.
    pub async fn wait_for(&self, locator: &Locator) -> CheckinResult<Element> {
        let mut found = self.wait_for_all(locator).await?;
        Ok(found.swap_remove(0))
    }

    pub async fn click(&self, element: &Element) -> CheckinResult<()> {
        let path = format!("/element/{}/click", element.0);
        self.command(Method::POST, &path, "click", Some(json!({})))
            .await?;
        Ok(())
    }

    pub async fn clear(&self, element: &Element) -> CheckinResult<()> {
        let path = format!("/element/{}/clear", element.0);
        self.command(Method::POST, &path, "clear", Some(json!({})))
            .await?;
        Ok(())
    }

    pub async fn send_keys(&self, element: &Element, text: &str) -> CheckinResult<()> {
        let path = format!("/element/{}/value", element.0);
        self.command(Method::POST, &path, "send keys", Some(json!({ "text": text })))
            .await?;
        Ok(())
    }

    /// Replace the content of a text field.
    pub async fn type_into(&self, element: &Element, text: &str) -> CheckinResult<()> {
        self.click(element).await?;
        self.clear(element).await?;
        self.send_keys(element, text).await
    }

    /// Close the browser.
    pub async fn delete(self) -> CheckinResult<()> {
        self.command(Method::DELETE, "", "delete session", None)
            .await?;
        tracing::debug!("browser session closed");
        Ok(())
    }
}

async fn send(
    http: &reqwest::Client,
    method: Method,
    url: &str,
    name: &str,
    body: Option<Value>,
) -> CheckinResult<Value> {
    let mut request = http.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request
        .send()
        .await
        .map_err(|e| survey_error(format!("WebDriver {name} request failed: {e}")))?;
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| survey_error(format!("WebDriver {name} returned invalid JSON: {e}")))?;

    parse_response(name, status.is_success(), body)
}

/// Unwrap the `value` member of a WebDriver response.
fn parse_response(name: &str, success: bool, mut body: Value) -> CheckinResult<Value> {
    let value = body
        .get_mut("value")
        .map(Value::take)
        .unwrap_or(Value::Null);

    if success && value.get("error").is_none() {
        Ok(value)
    } else {
        Err(protocol_error(name, &value))
    }
}

fn elements(value: &Value) -> Vec<Element> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(Element::from_json).collect())
        .unwrap_or_default()
}
