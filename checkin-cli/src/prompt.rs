use std::io::{BufRead, IsTerminal, Write};
use std::time::Duration;

use checkin_core::prompt::{Confirmation, Prompter};
use dialoguer::theme::{ColorfulTheme, Theme};
use owo_colors::OwoColorize;
use tokio::sync::oneshot;

/// Asks on the controlling terminal.
///
/// Answers are read as whole lines in the terminal's normal mode on a detached
/// thread, so a prompt left unanswered never keeps the runtime from shutting
/// down and never leaves the terminal in raw mode.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    async fn confirm(&self, question: &str, timeout: Duration) -> Confirmation {
        if !std::io::stdin().is_terminal() {
            return Confirmation::Unavailable;
        }

        let question = format!(
            "{} {}",
            question,
            format!("(submits in {})", humantime::format_duration(timeout)).dimmed()
        );
        let mut prompt = String::new();
        if ColorfulTheme::default()
            .format_confirm_prompt(&mut prompt, &question, Some(true))
            .is_err()
        {
            prompt = format!("{question} [Y/n]");
        }
        print!("{prompt} ");
        let _ = std::io::stdout().flush();

        let rx = read_line_detached();
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Some(line))) => {
                if answers_yes(&line) {
                    Confirmation::Confirmed
                } else {
                    Confirmation::Declined
                }
            }
            Ok(Ok(None)) | Ok(Err(_)) => Confirmation::Unavailable,
            Err(_) => {
                println!();
                Confirmation::TimedOut
            }
        }
    }

    async fn pause(&self, message: &str) {
        println!("{}", message.cyan());
        if !std::io::stdin().is_terminal() {
            return;
        }

        let _ = read_line_detached().await;
    }
}

/// One line from stdin, or `None` on end of input or a read error.
fn read_line_detached() -> oneshot::Receiver<Option<String>> {
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        let read = match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line),
            Err(e) => {
                tracing::warn!(error = %e, "could not read from the terminal");
                None
            }
        };
        let _ = tx.send(read);
    });
    rx
}

/// Only an explicit "n" or "no" declines; Enter alone accepts.
fn answers_yes(line: &str) -> bool {
    !matches!(line.trim().to_lowercase().as_str(), "n" | "no")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_and_yes_accept() {
        assert!(answers_yes("\n"));
        assert!(answers_yes("y\n"));
        assert!(answers_yes("  Yes \n"));
    }

    #[test]
    fn no_declines_in_any_case() {
        assert!(!answers_yes("n\n"));
        assert!(!answers_yes("NO\n"));
        assert!(!answers_yes(" No "));
    }
}
