//! Check-in configuration.
//!
//! Read once per run from `~/.config/checkin/config.toml` (or `--config`),
//! with `CHECKIN_*` environment variables layered on top. The loaded value is
//! immutable and handed to each component explicitly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use config::{ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use serde::Deserialize;

use crate::error::{CheckinError, CheckinResult};
use crate::feed::normalize_feed_url;
use crate::survey::Likert;

const FALLBACK_TIMEZONE: Tz = chrono_tz::America::Los_Angeles;

fn default_timezone() -> Tz {
    iana_time_zone::get_timezone()
        .ok()
        .and_then(|name| name.parse().ok())
        .unwrap_or(FALLBACK_TIMEZONE)
}

fn default_skip_keywords() -> Vec<String> {
    vec!["admin".to_string(), "wellness".to_string()]
}

fn default_responses() -> [Likert; 3] {
    [Likert::StronglyAgree; 3]
}

fn default_confirm_timeout() -> u64 {
    30
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_driver() -> String {
    "chromedriver".to_string()
}

fn default_port() -> u16 {
    9515
}

fn default_element_timeout() -> u64 {
    15
}

/// Settings for the WebDriver server that drives the browser.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    /// WebDriver server binary, looked up in PATH
    #[serde(default = "default_driver")]
    pub driver: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// How long to wait for any single page element
    #[serde(default = "default_element_timeout")]
    pub element_timeout_secs: u64,

    /// Browser executable, when it is not where the driver expects it
    #[serde(default)]
    pub binary: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        BrowserConfig {
            driver: default_driver(),
            port: default_port(),
            element_timeout_secs: default_element_timeout(),
            binary: None,
        }
    }
}

impl BrowserConfig {
    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Name entered on the survey
    pub name: String,

    /// ICS feed of the conference calendar
    pub calendar_url: String,

    pub survey_url: String,

    #[serde(default = "default_timezone")]
    pub timezone: Tz,

    /// Case-insensitive substrings; an event title containing one is skipped
    #[serde(default = "default_skip_keywords")]
    pub skip_keywords: Vec<String>,

    /// Answers to the three rating questions, 1 to 5
    #[serde(default = "default_responses")]
    pub default_responses: [Likert; 3],

    #[serde(default)]
    pub comment: String,

    /// Ask on the terminal before the final submission
    #[serde(default)]
    pub confirm_before_submit: bool,

    #[serde(default = "default_confirm_timeout")]
    pub confirm_timeout_secs: u64,

    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    #[serde(default)]
    pub browser: BrowserConfig,
}

impl Config {
    /// `~/.config/checkin/config.toml` or the platform equivalent.
    pub fn default_path() -> CheckinResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CheckinError::Config("Could not determine config directory".into()))?
            .join("checkin");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from `path` (tilde-expanded) or the default location.
    pub fn load(path: Option<&str>) -> CheckinResult<Self> {
        let path = match path {
            Some(p) => PathBuf::from(shellexpand::tilde(p).into_owned()),
            None => Self::default_path()?,
        };

        if !path.exists() {
            return Err(CheckinError::Config(missing_config_message(&path)));
        }

        tracing::debug!(path = %path.display(), "loading config");
        Self::load_layered(&path, environment())
    }

    /// Read `path`, then apply `env` on top.
    fn load_layered(path: &Path, env: Environment) -> CheckinResult<Self> {
        let builder = config::Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml))
            .add_source(env);

        Self::build(builder)
            .map_err(|e| CheckinError::Config(format!("{} ({})", e, path.display())))
    }

    /// Load from TOML text, without environment overrides.
    pub fn from_toml_str(content: &str) -> CheckinResult<Self> {
        let builder =
            config::Config::builder().add_source(File::from_str(content, FileFormat::Toml));
        Self::build(builder).map_err(|e| CheckinError::Config(e.to_string()))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, String> {
        let config: Config = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("'name' must not be empty".into());
        }

        normalize_feed_url(&self.calendar_url).map_err(|e| e.to_string())?;

        let survey = url::Url::parse(self.survey_url.trim())
            .map_err(|e| format!("Invalid survey URL '{}': {}", self.survey_url, e))?;
        if !matches!(survey.scheme(), "http" | "https") {
            return Err(format!("Survey URL must be http(s): {}", self.survey_url));
        }

        if self.confirm_timeout_secs == 0 {
            return Err("'confirm_timeout_secs' must be greater than zero".into());
        }
        if self.fetch_timeout_secs == 0 {
            return Err("'fetch_timeout_secs' must be greater than zero".into());
        }
        if self.browser.element_timeout_secs == 0 {
            return Err("'browser.element_timeout_secs' must be greater than zero".into());
        }

        Ok(())
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// The comment, if it has any content.
    pub fn comment(&self) -> Option<&str> {
        let comment = self.comment.trim();
        (!comment.is_empty()).then_some(comment)
    }
}

/// `CHECKIN_NAME`, `CHECKIN_SKIP_KEYWORDS=a,b`, `CHECKIN_BROWSER__PORT`, ...
fn environment() -> Environment {
    Environment::with_prefix("CHECKIN")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("skip_keywords")
        .with_list_parse_key("default_responses")
}

fn missing_config_message(path: &Path) -> String {
    format!(
        "Config file not found at {}\n\n\
        Create it with at least:\n\n\
        name = \"Your Name\"\n\
        calendar_url = \"https://calendar.google.com/calendar/ical/.../public/basic.ics\"\n\
        survey_url = \"https://example.qualtrics.com/jfe/form/SV_...\"\n\
        timezone = \"America/Los_Angeles\"\n\
        skip_keywords = [\"admin\", \"wellness\"]\n\
        default_responses = [5, 5, 5]",
        path.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
name = "Dr. Test"
calendar_url = "webcal://calendar.example.com/basic.ics"
survey_url = "https://example.qualtrics.com/jfe/form/SV_123"
"#;

    #[test]
    fn defaults_fill_missing_keys() {
        let config = Config::from_toml_str(MINIMAL).expect("Should load");

        assert_eq!(config.name, "Dr. Test");
        assert_eq!(config.skip_keywords, vec!["admin", "wellness"]);
        assert_eq!(config.default_responses, [Likert::StronglyAgree; 3]);
        assert_eq!(config.comment(), None);
        assert!(!config.confirm_before_submit);
        assert_eq!(config.confirm_timeout(), Duration::from_secs(30));
        assert_eq!(config.browser.driver, "chromedriver");
        assert_eq!(config.browser.port, 9515);
    }

    #[test]
    fn reads_every_field() {
        let toml = r#"
name = "Dr. Test"
calendar_url = "https://calendar.example.com/basic.ics"
survey_url = "https://example.qualtrics.com/jfe/form/SV_123"
timezone = "America/New_York"
skip_keywords = ["Journal Club"]
default_responses = [4, 3, 5]
comment = "  Great talk  "
confirm_before_submit = true
confirm_timeout_secs = 10

[browser]
driver = "geckodriver"
port = 4444
"#;
        let config = Config::from_toml_str(toml).expect("Should load");

        assert_eq!(config.timezone, chrono_tz::America::New_York);
        assert_eq!(config.skip_keywords, vec!["Journal Club"]);
        assert_eq!(
            config.default_responses,
            [Likert::Agree, Likert::Neutral, Likert::StronglyAgree]
        );
        assert_eq!(config.comment(), Some("Great talk"));
        assert!(config.confirm_before_submit);
        assert_eq!(config.confirm_timeout_secs, 10);
        assert_eq!(config.browser.driver, "geckodriver");
        assert_eq!(config.browser.port, 4444);
        assert_eq!(config.browser.element_timeout_secs, 15);
    }

    #[test]
    fn likert_out_of_range_is_rejected() {
        for bad in ["[0, 5, 5]", "[5, 6, 5]"] {
            let toml = format!("{MINIMAL}default_responses = {bad}\n");
            let err = Config::from_toml_str(&toml).unwrap_err();
            assert!(matches!(err, CheckinError::Config(_)), "{bad}");
        }
    }

    #[test]
    fn wrong_number_of_responses_is_rejected() {
        let toml = format!("{MINIMAL}default_responses = [5, 5]\n");
        assert!(Config::from_toml_str(&toml).is_err());
    }

    #[test]
    fn invalid_timezone_is_rejected() {
        let toml = format!("{MINIMAL}timezone = \"Mars/Olympus_Mons\"\n");
        assert!(Config::from_toml_str(&toml).is_err());
    }

    #[test]
    fn required_fields_are_enforced() {
        assert!(Config::from_toml_str("name = \"x\"").is_err());

        let blank_name = MINIMAL.replace("Dr. Test", "  ");
        assert!(Config::from_toml_str(&blank_name).is_err());

        let bad_survey = MINIMAL.replace("https://example.qualtrics.com", "mailto:me");
        assert!(Config::from_toml_str(&bad_survey).is_err());
    }

    #[test]
    fn load_reports_missing_file_with_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let err = Config::load(Some(path.to_str().unwrap())).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Config file not found"));
        assert!(message.contains("calendar_url"));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.conf");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = Config::load(Some(path.to_str().unwrap())).expect("Should load");
        assert_eq!(config.name, "Dr. Test");
    }

    #[test]
    fn environment_overrides_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, MINIMAL).unwrap();

        let vars: config::Map<String, String> = [
            ("CHECKIN_NAME", "Env Name"),
            ("CHECKIN_SKIP_KEYWORDS", "journal,grand rounds"),
            ("CHECKIN_DEFAULT_RESPONSES", "3,4,2"),
            ("CHECKIN_BROWSER__PORT", "4444"),
            ("UNRELATED_NAME", "ignored"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config =
            Config::load_layered(&path, environment().source(Some(vars))).expect("Should load");

        assert_eq!(config.name, "Env Name");
        assert_eq!(config.skip_keywords, vec!["journal", "grand rounds"]);
        assert_eq!(
            config.default_responses,
            [Likert::Neutral, Likert::Agree, Likert::Disagree]
        );
        assert_eq!(config.browser.port, 4444);
        assert_eq!(config.browser.driver, "chromedriver");
        assert_eq!(config.survey_url, "https://example.qualtrics.com/jfe/form/SV_123");
    }

    #[test]
    fn environment_values_are_validated_too() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, MINIMAL).unwrap();

        let vars: config::Map<String, String> =
            [("CHECKIN_DEFAULT_RESPONSES".to_string(), "5,9,5".to_string())]
                .into_iter()
                .collect();

        let err = Config::load_layered(&path, environment().source(Some(vars))).unwrap_err();
        assert!(matches!(err, CheckinError::Config(_)));
    }
}
