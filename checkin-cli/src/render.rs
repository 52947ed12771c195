//! Colored terminal rendering for check-in types.

use checkin_core::checker::Decision;
use checkin_core::event::ConferenceEvent;
use checkin_core::outcome::{OutcomeKind, RunOutcome};
use checkin_core::run::RunReport;
use owo_colors::OwoColorize;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for ConferenceEvent {
    fn render(&self) -> String {
        let time = format!(
            "{}–{}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        );
        format!("   • {} {}", self.title, time.dimmed())
    }
}

impl Render for Decision {
    fn render(&self) -> String {
        match self {
            Decision::NoEvent => self.to_string().dimmed().to_string(),
            Decision::SkipByKeyword { .. } => self.to_string().yellow().to_string(),
            Decision::Attend { .. } => self.to_string().green().to_string(),
        }
    }
}

impl Render for RunOutcome {
    fn render(&self) -> String {
        match self.kind {
            OutcomeKind::Submitted => format!("{} {}", "✓".green(), self.message.green()),
            OutcomeKind::Rehearsed => format!("{} {}", "✓".cyan(), self.message.cyan()),
            OutcomeKind::Declined => format!("{} {}", "-".yellow(), self.message.yellow()),
            OutcomeKind::SkippedNoConference | OutcomeKind::SkippedByKeyword => {
                format!("{} {}", "↷".yellow(), self.message)
            }
            OutcomeKind::Failed => format!("{} {}", "✗".red(), self.message.red()),
        }
    }
}

impl Render for RunReport {
    fn render(&self) -> String {
        let mut lines = Vec::new();

        if let Some(decision) = &self.decision {
            for event in &self.events {
                lines.push(event.render());
            }
            lines.push(decision.render());
        }

        lines.push(self.outcome.render());
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_render_keeps_message() {
        let outcome = RunOutcome::new(OutcomeKind::Failed, "Calendar error: boom");
        assert!(outcome.render().contains("Calendar error: boom"));
    }

    #[test]
    fn report_without_decision_shows_only_outcome() {
        let report = RunReport {
            events: Vec::new(),
            decision: None,
            outcome: RunOutcome::new(OutcomeKind::Submitted, "Checked in"),
            notified: true,
        };
        assert_eq!(report.render().lines().count(), 1);
    }

    #[test]
    fn report_lists_decision_before_outcome() {
        let report = RunReport {
            events: Vec::new(),
            decision: Some(Decision::NoEvent),
            outcome: RunOutcome::new(OutcomeKind::SkippedNoConference, "No 8AM conference today"),
            notified: true,
        };
        let rendered = report.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("No events found for today"));
        assert!(lines[1].contains("No 8AM conference today"));
    }
}
