//! Deciding whether today is a conference day for a slot.

use std::fmt;

use chrono::DateTime;
use chrono_tz::Tz;

use crate::error::CheckinResult;
use crate::event::{ConferenceEvent, FeedEvent};
use crate::feed::CalendarSource;
use crate::ics::parse_feed;
use crate::recurrence::expand_around;
use crate::slot::Slot;

/// Outcome of the calendar check for one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Nothing in the slot window today.
    NoEvent,
    /// An event in the window matched a skip keyword.
    SkipByKeyword { keyword: String, title: String },
    /// A conference is on; titles of the matching events.
    Attend { titles: Vec<String> },
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::NoEvent => write!(f, "No events found for today"),
            Decision::SkipByKeyword { keyword, title } => {
                write!(f, "Found skip keyword '{}' in event: {}", keyword, title)
            }
            Decision::Attend { titles } => {
                write!(f, "Conference day detected. Events: {}", titles.join(", "))
            }
        }
    }
}

/// Timed events of the day `now` falls on whose local start is inside `slot`.
///
/// Cancelled events are dropped and recurring masters are expanded first.
/// All-day events have no start time and never match a slot.
pub fn todays_events(events: &[FeedEvent], slot: Slot, now: DateTime<Tz>) -> Vec<ConferenceEvent> {
    let tz = now.timezone();
    let today = now.date_naive();

    let mut found: Vec<ConferenceEvent> = expand_around(events, today, tz)
        .into_iter()
        .filter(|e| !e.cancelled)
        .filter_map(|e| {
            let start = e.start.in_zone(tz)?;
            let end = e.end.in_zone(tz).unwrap_or(start);
            Some(ConferenceEvent {
                title: e.summary,
                start,
                end,
            })
        })
        .filter(|e| e.start.date_naive() == today && slot.contains(&e.start))
        .collect();

    found.sort_by_key(|e| e.start);
    found
}

/// The skip keyword contained in `title`, if any.
///
/// Matching is case-insensitive substring containment; a title that equals a
/// keyword is the degenerate case. Blank keywords never match.
pub fn matching_keyword<'k>(title: &str, keywords: &'k [String]) -> Option<&'k str> {
    let title = title.to_lowercase();
    keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .find(|k| title.contains(&k.to_lowercase()))
}

/// Decide from the slot's events: any keyword hit skips the whole slot.
pub fn decide(events: &[ConferenceEvent], keywords: &[String]) -> Decision {
    if events.is_empty() {
        return Decision::NoEvent;
    }

    for event in events {
        if let Some(keyword) = matching_keyword(&event.title, keywords) {
            return Decision::SkipByKeyword {
                keyword: keyword.to_string(),
                title: event.title.clone(),
            };
        }
    }

    Decision::Attend {
        titles: events.iter().map(|e| e.title.clone()).collect(),
    }
}

/// Fetches, parses and decides in one go.
pub struct CalendarChecker<'a, S> {
    source: &'a S,
    url: &'a str,
    keywords: &'a [String],
}

impl<'a, S: CalendarSource> CalendarChecker<'a, S> {
    pub fn new(source: &'a S, url: &'a str, keywords: &'a [String]) -> Self {
        CalendarChecker {
            source,
            url,
            keywords,
        }
    }

    /// Check the feed for `slot` on the day of `now`.
    ///
    /// Returns the slot's events with the decision so callers can report them.
    pub async fn check(
        &self,
        slot: Slot,
        now: DateTime<Tz>,
    ) -> CheckinResult<(Vec<ConferenceEvent>, Decision)> {
        let content = self.source.fetch(self.url).await?;
        let events = parse_feed(&content)?;
        let todays = todays_events(&events, slot, now);

        for event in &todays {
            tracing::debug!(%event, "event in slot window");
        }

        let decision = decide(&todays, self.keywords);
        Ok((todays, decision))
    }
}
