//! What a run ended with.

use std::fmt;

use crate::checker::Decision;
use crate::error::CheckinError;
use crate::slot::Slot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// The survey was submitted.
    Submitted,
    /// Every field was filled but nothing was submitted (rehearsal mode).
    Rehearsed,
    /// The user said no at the confirmation prompt.
    Declined,
    /// No event in the slot window today.
    SkippedNoConference,
    /// The slot's event matched a skip keyword.
    SkippedByKeyword,
    Failed,
}

/// Result of one invocation, with a message for logs and the notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub kind: OutcomeKind,
    pub message: String,
}

impl RunOutcome {
    pub fn new(kind: OutcomeKind, message: impl Into<String>) -> Self {
        RunOutcome {
            kind,
            message: message.into(),
        }
    }

    pub fn submitted(slot: Slot, date: &str) -> Self {
        Self::new(
            OutcomeKind::Submitted,
            format!("Checked in for the {} conference on {}", slot, date),
        )
    }

    pub fn failed(error: &CheckinError) -> Self {
        Self::new(OutcomeKind::Failed, error.to_string())
    }

    /// Outcome for a decision that does not lead to the survey.
    pub fn skipped(slot: Slot, decision: &Decision) -> Option<Self> {
        match decision {
            Decision::NoEvent => Some(Self::new(
                OutcomeKind::SkippedNoConference,
                format!("No {} conference today", slot),
            )),
            Decision::SkipByKeyword { keyword, title } => Some(Self::new(
                OutcomeKind::SkippedByKeyword,
                format!("Skipped {} check-in: '{}' matches '{}'", slot, title, keyword),
            )),
            Decision::Attend { .. } => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.kind == OutcomeKind::Failed
    }

    /// Process exit status: intentional skips are successes.
    pub fn exit_code(&self) -> u8 {
        if self.is_failure() { 1 } else { 0 }
    }

    /// Short notification title.
    pub fn title(&self) -> &'static str {
        match self.kind {
            OutcomeKind::Submitted => "Check-in submitted",
            OutcomeKind::Rehearsed => "Check-in rehearsed",
            OutcomeKind::Declined => "Check-in cancelled",
            OutcomeKind::SkippedNoConference | OutcomeKind::SkippedByKeyword => "Check-in skipped",
            OutcomeKind::Failed => "Check-in failed",
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title(), self.message)
    }
}
