use std::io::IsTerminal;

use checkin_core::error::CheckinResult;
use checkin_core::feed::CalendarSource;
use indicatif::{ProgressBar, ProgressStyle};

pub fn create_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["-", "\\", "|", "/"])
            .template("{msg} {spinner}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

/// Shows a spinner on an interactive terminal while the feed downloads.
pub struct SpinnerSource<S> {
    inner: S,
}

impl<S> SpinnerSource<S> {
    pub fn new(inner: S) -> Self {
        SpinnerSource { inner }
    }
}

impl<S: CalendarSource> CalendarSource for SpinnerSource<S> {
    async fn fetch(&self, url: &str) -> CheckinResult<String> {
        if !std::io::stderr().is_terminal() {
            return self.inner.fetch(url).await;
        }

        let spinner = create_spinner("Checking the conference calendar...".to_string());
        let result = self.inner.fetch(url).await;
        spinner.finish_and_clear();
        result
    }
}
