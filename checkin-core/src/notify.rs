//! Telling the user how the run went.

use crate::error::CheckinResult;
use crate::outcome::RunOutcome;

/// Shows a single short notification.
pub trait Notifier {
    fn notify(&self, title: &str, message: &str) -> CheckinResult<()>;
}

/// Notify about `outcome`, logging and swallowing any failure.
///
/// Returns whether the notification went out.
pub fn notify_outcome<N: Notifier + ?Sized>(notifier: &N, outcome: &RunOutcome) -> bool {
    match notifier.notify(outcome.title(), &outcome.message) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "could not show notification");
            false
        }
    }
}
