//! Downloading the calendar feed.

use std::time::Duration;

use tokio::time::timeout;
use url::Url;

use crate::error::{CheckinError, CheckinResult};

/// Anything that can hand back the raw text of an ICS feed.
#[allow(async_fn_in_trait)]
pub trait CalendarSource {
    async fn fetch(&self, url: &str) -> CheckinResult<String>;
}

/// Fetches feeds over HTTP(S).
#[derive(Clone, Debug)]
pub struct HttpFeed {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFeed {
    pub fn new(timeout: Duration) -> CheckinResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("checkin/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout)
            .build()
            .map_err(|e| CheckinError::Calendar(format!("Could not build HTTP client: {e}")))?;

        Ok(HttpFeed { client, timeout })
    }
}

impl CalendarSource for HttpFeed {
    async fn fetch(&self, url: &str) -> CheckinResult<String> {
        let url = normalize_feed_url(url)?;
        tracing::info!(%url, "fetching calendar");

        let request = async {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| CheckinError::Calendar(format!("Request to {url} failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                return Err(CheckinError::Calendar(format!(
                    "Calendar server answered {status}"
                )));
            }

            response
                .text()
                .await
                .map_err(|e| CheckinError::Calendar(format!("Could not read calendar body: {e}")))
        };

        timeout(self.timeout, request)
            .await
            .map_err(|_| CheckinError::CalendarTimeout(self.timeout.as_secs()))?
    }
}

/// Parse a feed URL, rewriting `webcal://` subscriptions to `https://`.
pub fn normalize_feed_url(raw: &str) -> CheckinResult<Url> {
    let raw = raw.trim();
    let rewritten = match raw.strip_prefix("webcal://") {
        Some(rest) => format!("https://{rest}"),
        None => raw.to_string(),
    };

    let url = Url::parse(&rewritten)
        .map_err(|e| CheckinError::Calendar(format!("Invalid calendar URL '{raw}': {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(CheckinError::Calendar(format!(
            "Unsupported calendar URL scheme '{other}'"
        ))),
    }
}
