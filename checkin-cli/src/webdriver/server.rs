use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use checkin_core::config::BrowserConfig;
use checkin_core::error::CheckinResult;
use checkin_core::survey::survey_error;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::process::{Child, Command};

const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);
const STARTUP_POLL: Duration = Duration::from_millis(100);

/// Which browser the configured driver speaks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKind {
    Chrome,
    Firefox,
}

impl BrowserKind {
    /// Guess from the driver binary name.
    pub fn from_driver(driver: &str) -> Self {
        if driver.to_lowercase().contains("gecko") {
            BrowserKind::Firefox
        } else {
            BrowserKind::Chrome
        }
    }

    /// `capabilities` body for `POST /session`.
    pub fn capabilities(
        &self,
        headless: bool,
        profile: &std::path::Path,
        binary: Option<&str>,
    ) -> Value {
        let (key, mut options) = match self {
            BrowserKind::Chrome => {
                let mut args = vec![
                    format!("--user-data-dir={}", profile.display()),
                    "--no-first-run".to_string(),
                    "--no-default-browser-check".to_string(),
                    "--window-size=1280,1024".to_string(),
                ];
                if headless {
                    args.push("--headless=new".to_string());
                }
                ("goog:chromeOptions", json!({ "args": args }))
            }
            BrowserKind::Firefox => {
                let mut args = vec!["-profile".to_string(), profile.display().to_string()];
                if headless {
                    args.push("-headless".to_string());
                }
                ("moz:firefoxOptions", json!({ "args": args }))
            }
        };

        if let Some(binary) = binary {
            options["binary"] = json!(binary);
        }

        json!({
            "capabilities": {
                "alwaysMatch": { key: options }
            }
        })
    }
}

/// A running WebDriver server. Killed when dropped.
pub struct DriverServer {
    child: Child,
    port: u16,
    kind: BrowserKind,
    /// Throwaway browser profile, removed when dropped
    profile: TempDir,
}

impl DriverServer {
    /// Start the configured driver and wait until it reports ready.
    pub async fn start(config: &BrowserConfig, http: &reqwest::Client) -> CheckinResult<Self> {
        let binary = find_driver(&config.driver)?;
        let profile = tempfile::Builder::new()
            .prefix("checkin-browser-")
            .tempdir()?;

        tracing::debug!(driver = %binary.display(), port = config.port, "starting WebDriver server");

        let child = Command::new(&binary)
            .arg(format!("--port={}", config.port))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| survey_error(format!("Could not start {}: {}", binary.display(), e)))?;

        let server = DriverServer {
            child,
            port: config.port,
            kind: BrowserKind::from_driver(&config.driver),
            profile,
        };
        server.wait_until_ready(http).await?;
        Ok(server)
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn kind(&self) -> BrowserKind {
        self.kind
    }

    pub fn profile_dir(&self) -> &std::path::Path {
        self.profile.path()
    }

    async fn wait_until_ready(&self, http: &reqwest::Client) -> CheckinResult<()> {
        let status_url = format!("{}/status", self.base_url());
        let deadline = tokio::time::Instant::now() + STARTUP_TIMEOUT;

        loop {
            if let Ok(response) = http.get(&status_url).send().await
                && let Ok(body) = response.json::<Value>().await
                && body["value"]["ready"].as_bool() == Some(true)
            {
                return Ok(());
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(survey_error(format!(
                    "WebDriver server did not become ready on port {} within {}s",
                    self.port,
                    STARTUP_TIMEOUT.as_secs()
                )));
            }
            tokio::time::sleep(STARTUP_POLL).await;
        }
    }

    /// Stop the server now rather than on drop.
    pub async fn stop(mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::debug!(error = %e, "WebDriver server already gone");
        }
    }
}

fn find_driver(driver: &str) -> CheckinResult<PathBuf> {
    which::which(driver).map_err(|_| {
        survey_error(format!(
            "WebDriver server '{driver}' not found in PATH. \
            Install chromedriver (or geckodriver) or set browser.driver in the config."
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn kind_follows_driver_name() {
        assert_eq!(BrowserKind::from_driver("chromedriver"), BrowserKind::Chrome);
        assert_eq!(
            BrowserKind::from_driver("/usr/local/bin/geckodriver"),
            BrowserKind::Firefox
        );
    }

    #[test]
    fn chrome_capabilities_headless_with_profile() {
        let caps = BrowserKind::Chrome.capabilities(true, Path::new("/tmp/profile"), None);
        let args = caps["capabilities"]["alwaysMatch"]["goog:chromeOptions"]["args"]
            .as_array()
            .unwrap();

        assert!(args.contains(&json!("--user-data-dir=/tmp/profile")));
        assert!(args.contains(&json!("--headless=new")));
        assert!(caps["capabilities"]["alwaysMatch"]["goog:chromeOptions"]["binary"].is_null());
    }

    #[test]
    fn visible_browser_has_no_headless_flag() {
        let caps = BrowserKind::Firefox.capabilities(
            false,
            Path::new("/tmp/profile"),
            Some("/opt/firefox/firefox"),
        );
        let options = &caps["capabilities"]["alwaysMatch"]["moz:firefoxOptions"];

        assert!(!options["args"].as_array().unwrap().contains(&json!("-headless")));
        assert_eq!(options["binary"], "/opt/firefox/firefox");
    }
}
