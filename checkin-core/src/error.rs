//! Error types for conference check-in.

use thiserror::Error;

/// Errors that can occur while checking in.
#[derive(Error, Debug)]
pub enum CheckinError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Calendar error: {0}")]
    Calendar(String),

    #[error("Calendar request timed out after {0}s")]
    CalendarTimeout(u64),

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("Survey error: {0}")]
    Survey(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for check-in operations.
pub type CheckinResult<T> = Result<T, CheckinError>;
