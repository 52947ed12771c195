//! Minimal W3C WebDriver client.
//!
//! Starts a local WebDriver server (chromedriver or geckodriver), opens one
//! session and exposes the handful of commands the survey flow needs.
//! <https://w3c.github.io/webdriver/>

mod server;
mod session;

pub use server::DriverServer;
pub use session::{Element, Locator, Session};

use checkin_core::error::CheckinError;
use serde_json::Value;

/// Key under which WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735a66c8ae";

/// Turn a WebDriver error payload into our error type.
fn protocol_error(command: &str, value: &Value) -> CheckinError {
    let error = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let first_line = message.lines().next().unwrap_or_default();

    CheckinError::Survey(format!("WebDriver {command} failed: {error}: {first_line}"))
}

/// Quote `s` as an XPath 1.0 string literal.
///
/// XPath 1.0 has no escape sequences, so text containing both quote kinds is
/// built with `concat()`.
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        return format!("'{s}'");
    }
    if !s.contains('"') {
        return format!("\"{s}\"");
    }

    let parts: Vec<String> = s
        .split('\'')
        .map(|part| format!("'{part}'"))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}
