//! Core of conference check-in.
//!
//! Decides from an ICS feed whether today's conference in a time slot is on,
//! and describes the attendance survey to fill when it is. The browser,
//! notifications and prompts sit behind traits so the binary can plug in the
//! real ones and tests can plug in stubs:
//! - [`feed::CalendarSource`] for the calendar download
//! - [`survey::SurveyDriver`] for the survey page flow
//! - [`notify::Notifier`] for the outcome notification
//! - [`prompt::Prompter`] for confirmation and rehearsal pauses

pub mod checker;
pub mod config;
pub mod error;
pub mod event;
pub mod feed;
pub mod ics;
pub mod notify;
pub mod outcome;
pub mod prompt;
pub mod recurrence;
pub mod run;
pub mod slot;
pub mod survey;

pub use checker::Decision;
pub use config::Config;
pub use error::{CheckinError, CheckinResult};
pub use outcome::{OutcomeKind, RunOutcome};
pub use slot::Slot;
