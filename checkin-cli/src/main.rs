mod desktop;
mod prompt;
mod qualtrics;
mod render;
mod utils;
mod webdriver;

use std::process::ExitCode;

use anyhow::{Context, Result};
use checkin_core::feed::HttpFeed;
use checkin_core::notify::notify_outcome;
use checkin_core::run::{CheckIn, RunOptions};
use checkin_core::{Config, RunOutcome, Slot};
use clap::{ArgAction, Parser};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use crate::desktop::DesktopNotifier;
use crate::prompt::TerminalPrompter;
use crate::qualtrics::QualtricsDriver;
use crate::render::Render;
use crate::utils::tui::SpinnerSource;

#[derive(Parser, Debug)]
#[command(name = "checkin")]
#[command(version)]
#[command(about = "Check the conference calendar and fill the attendance survey")]
struct Cli {
    /// Lecture time to check in for: 8AM or 12PM
    #[arg(long = "time", value_name = "SLOT")]
    slot: Slot,

    /// Fill the survey in a visible browser without submitting
    #[arg(long)]
    dry_run: bool,

    /// Submit even when the calendar shows no conference
    #[arg(long)]
    force: bool,

    /// Config file (defaults to ~/.config/checkin/config.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,checkin={level},checkin_core={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    println!("{}", format!("=== Conference Check-in ({}) ===", cli.slot).bold());

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            let outcome = RunOutcome::failed(&e);
            println!("{}", outcome.render());
            if !cli.dry_run {
                notify_outcome(&DesktopNotifier, &outcome);
            }
            return Ok(ExitCode::from(outcome.exit_code()));
        }
    };

    let now = chrono::Utc::now().with_timezone(&config.timezone);
    println!(
        "{}",
        format!("{} ({})", now.format("%A, %B %-d, %Y %H:%M"), config.timezone).dimmed()
    );
    if cli.dry_run {
        println!("{}", "Dry run: the survey will be filled but not submitted".cyan());
    }
    if cli.force {
        println!("{}", "Forced: skipping the calendar check".yellow());
    }

    let feed = HttpFeed::new(config.fetch_timeout()).context("Failed to set up the HTTP client")?;
    let source = SpinnerSource::new(feed);
    let mut driver = QualtricsDriver::new(config.browser.clone(), cli.dry_run);

    let options = RunOptions {
        slot: cli.slot,
        rehearsal: cli.dry_run,
        force: cli.force,
        now,
    };
    let report = CheckIn {
        config: &config,
        source: &source,
        driver: &mut driver,
        notifier: &DesktopNotifier,
        prompter: &TerminalPrompter,
    }
    .run(&options)
    .await;

    println!("{}", report.render());
    Ok(ExitCode::from(report.outcome.exit_code()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_slot_and_flags() {
        let cli = Cli::try_parse_from(["checkin", "--time", "12PM", "--dry-run", "-vv"]).unwrap();
        assert_eq!(cli.slot, Slot::Midday);
        assert!(cli.dry_run);
        assert!(!cli.force);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn slot_is_case_insensitive() {
        let cli = Cli::try_parse_from(["checkin", "--time", "8am", "--force"]).unwrap();
        assert_eq!(cli.slot, Slot::Morning);
        assert!(cli.force);
    }

    #[test]
    fn time_is_required() {
        assert!(Cli::try_parse_from(["checkin"]).is_err());
    }

    #[test]
    fn unknown_slot_is_rejected() {
        assert!(Cli::try_parse_from(["checkin", "--time", "3PM"]).is_err());
    }
}
