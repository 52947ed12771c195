//! The attendance survey: what gets entered, and the seam that enters it.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{CheckinError, CheckinResult};
use crate::slot::Slot;

/// Choice selected on the first page.
pub const CATEGORY: &str = "General Conference";

/// The three rating questions on the second page, in order.
pub const QUESTIONS: [&str; 3] = [
    "The content of the lecture was relevant and helpful",
    "The lecture format was effective for my learning",
    "The lecturer was competent and taught effectively",
];

/// Date format the survey's date field expects.
pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// A five-point agreement rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Likert {
    StronglyDisagree = 1,
    Disagree = 2,
    Neutral = 3,
    Agree = 4,
    StronglyAgree = 5,
}

impl Likert {
    /// Answer text as the survey shows it.
    pub fn label(&self) -> &'static str {
        match self {
            Likert::StronglyDisagree => "Strongly disagree",
            Likert::Disagree => "Disagree",
            Likert::Neutral => "Neutral",
            Likert::Agree => "Agree",
            Likert::StronglyAgree => "Strongly Agree",
        }
    }
}

impl TryFrom<u8> for Likert {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Likert::StronglyDisagree),
            2 => Ok(Likert::Disagree),
            3 => Ok(Likert::Neutral),
            4 => Ok(Likert::Agree),
            5 => Ok(Likert::StronglyAgree),
            other => Err(format!("Likert answer must be between 1 and 5, got {other}")),
        }
    }
}

impl From<Likert> for u8 {
    fn from(value: Likert) -> Self {
        value as u8
    }
}

impl fmt::Display for Likert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One rating question with its chosen answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub question: &'static str,
    pub response: Likert,
}

/// Everything entered into the survey for one check-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyForm {
    pub url: String,
    pub name: String,
    pub category: &'static str,
    /// Already in [`DATE_FORMAT`]
    pub date: String,
    pub slot_label: &'static str,
    pub answers: [Answer; 3],
    /// Only present when there is something to say
    pub comment: Option<String>,
}

impl SurveyForm {
    /// Build the form from configuration for `slot` on `date`.
    pub fn from_config(config: &Config, slot: Slot, date: NaiveDate) -> Self {
        let answers = [0, 1, 2].map(|i| Answer {
            question: QUESTIONS[i],
            response: config.default_responses[i],
        });

        SurveyForm {
            url: config.survey_url.trim().to_string(),
            name: config.name.trim().to_string(),
            category: CATEGORY,
            date: date.format(DATE_FORMAT).to_string(),
            slot_label: slot.label(),
            answers,
            comment: config.comment().map(str::to_string),
        }
    }
}

/// Drives a survey page flow.
///
/// The two `fill_*` steps enter every field but never commit; `submit`
/// performs the final, irreversible submission. `close` releases the browser
/// and is called whatever happened before it.
#[allow(async_fn_in_trait)]
pub trait SurveyDriver {
    /// Open the survey and enter the first page's fields, staying on it.
    async fn fill_first_page(&mut self, form: &SurveyForm) -> CheckinResult<()>;

    /// Move past the first page and enter the second page's fields.
    async fn fill_second_page(&mut self, form: &SurveyForm) -> CheckinResult<()>;

    async fn submit(&mut self) -> CheckinResult<()>;

    async fn close(&mut self) -> CheckinResult<()>;
}

/// Shorthand for a survey failure.
pub fn survey_error(message: impl Into<String>) -> CheckinError {
    CheckinError::Survey(message.into())
}
