//! One check-in run: calendar → decision → survey → notification.

use chrono::DateTime;
use chrono_tz::Tz;

use crate::checker::{CalendarChecker, Decision};
use crate::config::Config;
use crate::error::CheckinResult;
use crate::event::ConferenceEvent;
use crate::feed::CalendarSource;
use crate::notify::{Notifier, notify_outcome};
use crate::outcome::{OutcomeKind, RunOutcome};
use crate::prompt::{Confirmation, Prompter};
use crate::slot::Slot;
use crate::survey::{SurveyDriver, SurveyForm};

/// Command-line inputs of a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub slot: Slot,
    /// Fill everything, submit nothing, notify nobody.
    pub rehearsal: bool,
    /// Treat today as a conference day without asking the calendar.
    pub force: bool,
    /// Current time in the configured timezone.
    pub now: DateTime<Tz>,
}

/// What happened, for the caller to render.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Events in the slot window, empty when the calendar was not consulted.
    pub events: Vec<ConferenceEvent>,
    /// `None` when forced or when the calendar check failed.
    pub decision: Option<Decision>,
    pub outcome: RunOutcome,
    pub notified: bool,
}

/// The collaborators of a run, injected so each can be stubbed.
pub struct CheckIn<'a, S, D, N, P> {
    pub config: &'a Config,
    pub source: &'a S,
    pub driver: &'a mut D,
    pub notifier: &'a N,
    pub prompter: &'a P,
}

impl<S, D, N, P> CheckIn<'_, S, D, N, P>
where
    S: CalendarSource,
    D: SurveyDriver,
    N: Notifier,
    P: Prompter,
{
    pub async fn run(&mut self, options: &RunOptions) -> RunReport {
        let mut report = RunReport {
            events: Vec::new(),
            decision: None,
            outcome: RunOutcome::new(OutcomeKind::Failed, "run did not finish"),
            notified: false,
        };

        let outcome = self.decide_and_submit(options, &mut report).await;
        report.outcome = outcome;

        match report.outcome.kind {
            OutcomeKind::Failed => {
                tracing::error!(message = %report.outcome.message, "check-in failed")
            }
            _ => tracing::info!(outcome = %report.outcome, "check-in finished"),
        }

        if !options.rehearsal {
            report.notified = notify_outcome(self.notifier, &report.outcome);
        }

        report
    }

    async fn decide_and_submit(
        &mut self,
        options: &RunOptions,
        report: &mut RunReport,
    ) -> RunOutcome {
        let slot = options.slot;

        if options.force {
            tracing::info!(%slot, "force: skipping the calendar check");
        } else {
            let checker = CalendarChecker::new(
                self.source,
                &self.config.calendar_url,
                &self.config.skip_keywords,
            );

            match checker.check(slot, options.now).await {
                Ok((events, decision)) => {
                    tracing::info!(%slot, %decision, "calendar checked");
                    report.events = events;
                    let skipped = RunOutcome::skipped(slot, &decision);
                    report.decision = Some(decision);
                    if let Some(outcome) = skipped {
                        return outcome;
                    }
                }
                Err(e) => return RunOutcome::failed(&e),
            }
        }

        let form = SurveyForm::from_config(self.config, slot, options.now.date_naive());
        let outcome = self.fill_and_submit(&form, options).await;

        if let Err(e) = self.driver.close().await {
            tracing::warn!(error = %e, "could not close the browser cleanly");
        }

        outcome
    }

    async fn fill_and_submit(&mut self, form: &SurveyForm, options: &RunOptions) -> RunOutcome {
        let slot = options.slot;

        if let Err(e) = self.fill(form, options.rehearsal).await {
            if options.rehearsal {
                let message =
                    format!("Filling failed: {e}. Inspect the browser, then press Enter to close it.");
                self.prompter.pause(&message).await;
            }
            return RunOutcome::failed(&e);
        }

        if options.rehearsal {
            self.prompter
                .pause("Every field is filled. Check the browser, then press Enter to close it.")
                .await;
            return RunOutcome::new(
                OutcomeKind::Rehearsed,
                format!("Filled the {} survey for {} without submitting", slot, form.date),
            );
        }

        if self.config.confirm_before_submit {
            let timeout = self.config.confirm_timeout();
            let question = format!("Submit the {} check-in for {}?", slot, form.date);

            let answer = self.prompter.confirm(&question, timeout).await;
            match answer {
                Confirmation::TimedOut => tracing::info!(
                    waited = %humantime::format_duration(timeout),
                    "no answer, submitting"
                ),
                Confirmation::Unavailable => tracing::info!("no terminal to confirm on, submitting"),
                Confirmation::Confirmed | Confirmation::Declined => {}
            }

            if !answer.proceeds() {
                return RunOutcome::new(
                    OutcomeKind::Declined,
                    format!("{} check-in for {} not submitted", slot, form.date),
                );
            }
        }

        match self.driver.submit().await {
            Ok(()) => RunOutcome::submitted(slot, &form.date),
            Err(e) => RunOutcome::failed(&e),
        }
    }

    /// Enter both pages; in rehearsal, hold on the first page before leaving it.
    async fn fill(&mut self, form: &SurveyForm, rehearsal: bool) -> CheckinResult<()> {
        self.driver.fill_first_page(form).await?;

        if rehearsal {
            self.prompter
                .pause("Page one is filled. Check the browser, then press Enter to continue.")
                .await;
        }

        self.driver.fill_second_page(form).await
    }
}
