//! The attendance survey's two-page flow, driven through WebDriver.
//!
//! Page one asks for the name and the conference category. Page two asks for
//! the date, the lecture time, three ratings and an optional comment.

use std::time::Duration;

use checkin_core::config::BrowserConfig;
use checkin_core::error::CheckinResult;
use checkin_core::survey::{Answer, SurveyDriver, SurveyForm, survey_error};

use crate::webdriver::{DriverServer, Element, Locator, Session, xpath_literal};

/// Time for the survey's scripts to render a page after navigation.
const PAGE_SETTLE: Duration = Duration::from_secs(1);
/// Time for the submission to reach the server before the browser closes.
const SUBMIT_SETTLE: Duration = Duration::from_secs(2);

const NEXT_BUTTON: &str = "button[aria-label='Next'], #NextButton, .NextButton";
const TEXT_INPUT: &str = "input[type='text']";

const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";

struct Browser {
    server: DriverServer,
    session: Session,
}

/// Fills the survey in Chrome or Firefox. The browser starts with the first
/// page and is gone after `close`.
pub struct QualtricsDriver {
    config: BrowserConfig,
    /// Show the browser window instead of running headless
    visible: bool,
    http: reqwest::Client,
    browser: Option<Browser>,
}

impl QualtricsDriver {
    pub fn new(config: BrowserConfig, visible: bool) -> Self {
        QualtricsDriver {
            config,
            visible,
            http: reqwest::Client::new(),
            browser: None,
        }
    }

    async fn session(&mut self) -> CheckinResult<&Session> {
        if self.browser.is_none() {
            let server = DriverServer::start(&self.config, &self.http).await?;
            let session = Session::create(
                self.http.clone(),
                &server,
                !self.visible,
                self.config.binary.as_deref(),
                self.config.element_timeout(),
            )
            .await?;
            self.browser = Some(Browser { server, session });
        }

        self.browser
            .as_ref()
            .map(|b| &b.session)
            .ok_or_else(|| survey_error("Browser is not running"))
    }
}

impl SurveyDriver for QualtricsDriver {
    async fn fill_first_page(&mut self, form: &SurveyForm) -> CheckinResult<()> {
        let session = self.session().await?;

        tracing::info!(url = %form.url, "opening survey");
        session.navigate(&form.url).await?;
        tokio::time::sleep(PAGE_SETTLE).await;

        fill_identity(session, form).await
    }

    async fn fill_second_page(&mut self, form: &SurveyForm) -> CheckinResult<()> {
        let session = self.session().await?;

        click_next(session).await?;
        tokio::time::sleep(PAGE_SETTLE).await;

        fill_ratings(session, form).await?;
        tracing::info!("survey filled");
        Ok(())
    }

    async fn submit(&mut self) -> CheckinResult<()> {
        let session = self.session().await?;
        click_next(session).await?;
        tokio::time::sleep(SUBMIT_SETTLE).await;
        tracing::info!("survey submitted");
        Ok(())
    }

    async fn close(&mut self) -> CheckinResult<()> {
        let Some(browser) = self.browser.take() else {
            return Ok(());
        };

        let result = browser.session.delete().await;
        browser.server.stop().await;
        result
    }
}

async fn fill_identity(session: &Session, form: &SurveyForm) -> CheckinResult<()> {
    let name_field = session.wait_for(&Locator::css("textarea")).await?;
    session.type_into(&name_field, &form.name).await?;
    tracing::debug!(name = %form.name, "name entered");

    click_choice(session, form.category).await?;
    tracing::debug!(category = form.category, "category selected");
    Ok(())
}

async fn fill_ratings(session: &Session, form: &SurveyForm) -> CheckinResult<()> {
    let date_field = session.wait_for(&Locator::css(TEXT_INPUT)).await?;
    session.type_into(&date_field, &form.date).await?;
    tracing::debug!(date = %form.date, "date entered");

    click_choice(session, form.slot_label).await?;
    tracing::debug!(slot = form.slot_label, "lecture time selected");

    for (index, answer) in form.answers.iter().enumerate() {
        answer_question(session, index, answer).await?;
        tracing::debug!(question = answer.question, response = %answer.response, "rated");
    }

    if let Some(comment) = &form.comment {
        let textareas = session.find_all(&Locator::css("textarea")).await?;
        if let Some(field) = textareas.last() {
            session.type_into(field, comment).await?;
            tracing::debug!("comment entered");
        } else {
            tracing::warn!("no comment field on the page, comment left out");
        }
    }

    Ok(())
}

async fn click_next(session: &Session) -> CheckinResult<()> {
    let next = session.wait_for(&Locator::css(NEXT_BUTTON)).await?;
    session.click(&next).await
}

/// Click the choice whose text contains `text`.
async fn click_choice(session: &Session, text: &str) -> CheckinResult<()> {
    let choice = session.wait_for(&choice_containing(text)).await?;
    session.click(&choice).await
}

/// Click the answer for one rating question.
///
/// The answer is looked up inside the question's block first. When the block
/// cannot be narrowed down, the `index`-th matching answer on the page is used.
async fn answer_question(session: &Session, index: usize, answer: &Answer) -> CheckinResult<()> {
    let label = answer.response.label();
    let within_question = match session.find_all(&question_block(answer.question)).await?.first() {
        Some(block) => first(session.find_all_within(block, &answer_exact(label, true)).await?),
        None => None,
    };

    let target = match within_question {
        Some(element) => element,
        None => {
            tracing::debug!(question = answer.question, "question block not found, using answer order");
            let all = session.wait_for_all(&answer_exact(label, false)).await?;
            all.into_iter().nth(index).ok_or_else(|| {
                survey_error(format!(
                    "Could not find answer '{}' for question {}",
                    label,
                    index + 1
                ))
            })?
        }
    };

    session.click(&target).await
}

fn first(mut elements: Vec<Element>) -> Option<Element> {
    (!elements.is_empty()).then(|| elements.swap_remove(0))
}

/// A clickable choice (label, span or button) whose text contains `text`.
fn choice_containing(text: &str) -> Locator {
    Locator::xpath(format!(
        "//*[self::label or self::span or self::button][contains(normalize-space(.), {})]",
        xpath_literal(text)
    ))
}

/// The block holding a question: two levels above the element carrying its text.
fn question_block(question: &str) -> Locator {
    Locator::xpath(format!(
        "(//*[contains(normalize-space(text()), {})])[1]/../..",
        xpath_literal(question)
    ))
}

/// An answer whose whole text equals `label`, ignoring case.
fn answer_exact(label: &str, relative: bool) -> Locator {
    let prefix = if relative { "." } else { "" };
    Locator::xpath(format!(
        "{prefix}//*[self::label or self::span][translate(normalize-space(.), '{UPPER}', '{LOWER}') = {}]",
        xpath_literal(&label.to_lowercase())
    ))
}
