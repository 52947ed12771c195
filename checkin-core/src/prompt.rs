//! Asking the person at the keyboard.

use std::time::Duration;

/// Answer to the pre-submission confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
    /// Nobody answered in time.
    TimedOut,
    /// No terminal to ask on (e.g. started by the OS scheduler).
    Unavailable,
}

impl Confirmation {
    /// Only an explicit "no" stops the submission; silence proceeds.
    pub fn proceeds(&self) -> bool {
        !matches!(self, Confirmation::Declined)
    }
}

#[allow(async_fn_in_trait)]
pub trait Prompter {
    /// Ask a yes/no question, giving up after `timeout`.
    async fn confirm(&self, question: &str, timeout: Duration) -> Confirmation;

    /// Hold the run until the user is done looking (rehearsal mode).
    async fn pause(&self, message: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_proceeds_and_no_stops() {
        assert!(Confirmation::Confirmed.proceeds());
        assert!(Confirmation::TimedOut.proceeds());
        assert!(Confirmation::Unavailable.proceeds());
        assert!(!Confirmation::Declined.proceeds());
    }
}
