//! Calendar event types read from the feed.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Start or end of an event, in whichever form the feed wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventTime {
    /// All-day event (`VALUE=DATE`)
    Date(NaiveDate),
    /// Absolute instant (`...Z`)
    DateTimeUtc(DateTime<Utc>),
    /// Wall-clock time with no zone attached
    DateTimeFloating(NaiveDateTime),
    /// Wall-clock time in a named zone (`TZID=...`)
    DateTimeZoned { datetime: NaiveDateTime, tzid: String },
}

impl EventTime {
    /// Resolve to an instant in `tz`.
    ///
    /// All-day dates have no instant and return `None`. Floating times and
    /// zones chrono-tz does not know are read as wall-clock time in `tz`.
    pub fn in_zone(&self, tz: Tz) -> Option<DateTime<Tz>> {
        match self {
            EventTime::Date(_) => None,
            EventTime::DateTimeUtc(dt) => Some(dt.with_timezone(&tz)),
            EventTime::DateTimeFloating(naive) => tz.from_local_datetime(naive).earliest(),
            EventTime::DateTimeZoned { datetime, tzid } => match tzid.parse::<Tz>() {
                Ok(event_tz) => event_tz
                    .from_local_datetime(datetime)
                    .earliest()
                    .map(|dt| dt.with_timezone(&tz)),
                Err(_) => {
                    tracing::debug!(tzid, "unknown TZID, reading as local time");
                    tz.from_local_datetime(datetime).earliest()
                }
            },
        }
    }

    /// The calendar date this time falls on, as seen from `tz`.
    pub fn date_in(&self, tz: Tz) -> Option<NaiveDate> {
        match self {
            EventTime::Date(d) => Some(*d),
            other => other.in_zone(tz).map(|dt| dt.date_naive()),
        }
    }

    /// Canonical ICS value, used to match RECURRENCE-ID overrides to instances.
    pub fn to_ics_string(&self) -> String {
        match self {
            EventTime::Date(d) => d.format("%Y%m%d").to_string(),
            EventTime::DateTimeUtc(dt) => dt.format("%Y%m%dT%H%M%SZ").to_string(),
            EventTime::DateTimeFloating(dt) => dt.format("%Y%m%dT%H%M%S").to_string(),
            EventTime::DateTimeZoned { datetime, .. } => {
                datetime.format("%Y%m%dT%H%M%S").to_string()
            }
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            EventTime::DateTimeUtc(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M UTC")),
            EventTime::DateTimeFloating(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M")),
            EventTime::DateTimeZoned { datetime, tzid } => {
                write!(f, "{} ({})", datetime.format("%Y-%m-%d %H:%M"), tzid)
            }
        }
    }
}

/// Recurrence rule of a master event.
#[derive(Debug, Clone, PartialEq)]
pub struct Recurrence {
    pub rrule: String,
    pub exdates: Vec<EventTime>,
}

/// A VEVENT as it appears in the feed, before any time-slot filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEvent {
    pub uid: String,
    pub summary: String,
    pub start: EventTime,
    pub end: EventTime,
    pub cancelled: bool,
    pub recurrence: Option<Recurrence>,
    /// Set on instance overrides of a recurring event
    pub recurrence_id: Option<EventTime>,
}

/// A timed event resolved to the configured timezone.
#[derive(Debug, Clone, PartialEq)]
pub struct ConferenceEvent {
    pub title: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl fmt::Display for ConferenceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}–{})",
            self.title,
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use chrono_tz::America::Los_Angeles;

    fn naive(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S").unwrap()
    }

    #[test]
    fn utc_converts_to_local_wall_clock() {
        let t = EventTime::DateTimeUtc(naive("20250320T150000").and_utc());
        let local = t.in_zone(Los_Angeles).unwrap();
        assert_eq!(local.hour(), 8);
    }

    #[test]
    fn floating_is_read_in_configured_zone() {
        let t = EventTime::DateTimeFloating(naive("20250320T080000"));
        let local = t.in_zone(Los_Angeles).unwrap();
        assert_eq!(local.hour(), 8);
    }

    #[test]
    fn zoned_converts_between_zones() {
        let t = EventTime::DateTimeZoned {
            datetime: naive("20250320T110000"),
            tzid: "America/New_York".to_string(),
        };
        let local = t.in_zone(Los_Angeles).unwrap();
        assert_eq!(local.hour(), 8);
    }

    #[test]
    fn unknown_tzid_falls_back_to_local() {
        let t = EventTime::DateTimeZoned {
            datetime: naive("20250320T080000"),
            tzid: "Pacific Standard Time".to_string(),
        };
        assert_eq!(t.in_zone(Los_Angeles).unwrap().hour(), 8);
    }

    #[test]
    fn all_day_has_date_but_no_instant() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
        let t = EventTime::Date(d);
        assert!(t.in_zone(Los_Angeles).is_none());
        assert_eq!(t.date_in(Los_Angeles), Some(d));
    }
}
