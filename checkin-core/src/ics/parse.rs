//! ICS feed parsing using the icalendar crate's parser.

use icalendar::{
    DatePerhapsTime,
    parser::{Component, Property, read_calendar, unfold},
};

use crate::error::{CheckinError, CheckinResult};
use crate::event::{EventTime, FeedEvent, Recurrence};

/// Parse a whole calendar feed into its events.
///
/// Events without a usable DTSTART are skipped. A missing DTEND means the
/// event ends when it starts.
pub fn parse_feed(content: &str) -> CheckinResult<Vec<FeedEvent>> {
    let content = content.trim_start_matches('\u{feff}');
    if !content.trim_start().starts_with("BEGIN:VCALENDAR") {
        return Err(CheckinError::IcsParse(
            "Feed does not start with BEGIN:VCALENDAR".into(),
        ));
    }

    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(CheckinError::IcsParse)?;

    let events: Vec<FeedEvent> = calendar
        .components
        .iter()
        .filter(|c| c.name == "VEVENT")
        .filter_map(parse_vevent)
        .collect();

    tracing::debug!(count = events.len(), "parsed feed events");
    Ok(events)
}

fn parse_vevent(vevent: &Component) -> Option<FeedEvent> {
    let start = to_event_time(DatePerhapsTime::try_from(vevent.find_prop("DTSTART")?).ok()?);
    let end = vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_event_time)
        .unwrap_or_else(|| start.clone());

    let uid = vevent
        .find_prop("UID")
        .map(|p| p.val.to_string())
        .unwrap_or_default();
    let summary = vevent
        .find_prop("SUMMARY")
        .map(|p| unescape_text(p.val.as_ref()))
        .unwrap_or_default();

    let cancelled = vevent
        .find_prop("STATUS")
        .is_some_and(|p| p.val.as_ref().eq_ignore_ascii_case("CANCELLED"));

    let exdates: Vec<EventTime> = vevent
        .properties
        .iter()
        .filter(|p| p.name == "EXDATE")
        .flat_map(parse_exdate_property)
        .collect();
    let recurrence = vevent
        .find_prop("RRULE")
        .map(|p| p.val.to_string())
        .map(|rrule| Recurrence { rrule, exdates });

    let recurrence_id = vevent
        .find_prop("RECURRENCE-ID")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_event_time);

    Some(FeedEvent {
        uid,
        summary,
        start,
        end,
        cancelled,
        recurrence,
        recurrence_id,
    })
}

/// Convert icalendar's DatePerhapsTime to our EventTime, preserving timezone info
fn to_event_time(dpt: DatePerhapsTime) -> EventTime {
    match dpt {
        DatePerhapsTime::Date(d) => EventTime::Date(d),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            icalendar::CalendarDateTime::Utc(dt) => EventTime::DateTimeUtc(dt),
            icalendar::CalendarDateTime::Floating(naive) => EventTime::DateTimeFloating(naive),
            icalendar::CalendarDateTime::WithTimezone { date_time, tzid } => {
                EventTime::DateTimeZoned {
                    datetime: date_time,
                    tzid,
                }
            }
        },
    }
}

/// Parse an EXDATE property, which may carry several comma-separated values.
fn parse_exdate_property(prop: &Property) -> Vec<EventTime> {
    let tzid = prop
        .params
        .iter()
        .find(|p| p.key == "TZID")
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()));

    let is_date = prop
        .params
        .iter()
        .any(|p| p.key == "VALUE" && p.val.as_ref().map(|v| v.as_ref()) == Some("DATE"));

    prop.val
        .as_ref()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            if is_date {
                chrono::NaiveDate::parse_from_str(s, "%Y%m%d")
                    .ok()
                    .map(EventTime::Date)
            } else if let Some(ref tz) = tzid {
                chrono::NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| EventTime::DateTimeZoned {
                        datetime: dt,
                        tzid: tz.clone(),
                    })
            } else if let Some(s) = s.strip_suffix('Z') {
                chrono::NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| EventTime::DateTimeUtc(dt.and_utc()))
            } else {
                chrono::NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(EventTime::DateTimeFloating)
            }
        })
        .collect()
}

/// Undo RFC 5545 TEXT escaping (`\,` `\;` `\n` `\\`).
fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push(' '),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Google Inc//Google Calendar 70.9054//EN\r\n\
BEGIN:VEVENT\r\n\
UID:grand-rounds@google.com\r\n\
SUMMARY:Grand Rounds\\, Neuro\r\n\
DTSTART;TZID=America/Los_Angeles:20250320T080000\r\n\
DTEND;TZID=America/Los_Angeles:20250320T090000\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:holiday@google.com\r\n\
SUMMARY:Holiday\r\n\
DTSTART;VALUE=DATE:20250321\r\n\
DTEND;VALUE=DATE:20250322\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:no-end@google.com\r\n\
SUMMARY:Case Review\r\n\
DTSTART:20250320T190000Z\r\n\
STATUS:CANCELLED\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn parses_every_vevent() {
        let events = parse_feed(FEED).expect("Should parse");
        assert_eq!(events.len(), 3);

        assert_eq!(events[0].summary, "Grand Rounds, Neuro");
        match &events[0].start {
            EventTime::DateTimeZoned { tzid, .. } => assert_eq!(tzid, "America/Los_Angeles"),
            other => panic!("Expected DateTimeZoned, got {:?}", other),
        }

        assert!(matches!(events[1].start, EventTime::Date(_)));
    }

    #[test]
    fn missing_dtend_ends_at_start_and_status_is_read() {
        let events = parse_feed(FEED).expect("Should parse");
        let review = &events[2];
        assert_eq!(review.end, review.start);
        assert!(review.cancelled);
        assert!(!events[0].cancelled);
    }

    #[test]
    fn reads_recurrence_and_overrides() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VEVENT\r\n\
UID:daily@test\r\n\
SUMMARY:Morning Conference\r\n\
DTSTART;TZID=America/Los_Angeles:20250303T080000\r\n\
DTEND;TZID=America/Los_Angeles:20250303T090000\r\n\
RRULE:FREQ=DAILY;BYDAY=MO,TU,WE,TH,FR\r\n\
EXDATE;TZID=America/Los_Angeles:20250310T080000,20250311T080000\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:daily@test\r\n\
SUMMARY:Wellness Session\r\n\
RECURRENCE-ID;TZID=America/Los_Angeles:20250312T080000\r\n\
DTSTART;TZID=America/Los_Angeles:20250312T080000\r\n\
DTEND;TZID=America/Los_Angeles:20250312T090000\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let events = parse_feed(ics).expect("Should parse");
        let recurrence = events[0].recurrence.as_ref().expect("Should have recurrence");
        assert_eq!(recurrence.rrule, "FREQ=DAILY;BYDAY=MO,TU,WE,TH,FR");
        assert_eq!(recurrence.exdates.len(), 2);
        assert!(events[1].recurrence_id.is_some());
    }

    #[test]
    fn rejects_non_calendar_content() {
        let err = parse_feed("<html><body>Sign in</body></html>").unwrap_err();
        assert!(matches!(err, CheckinError::IcsParse(_)));
    }

    #[test]
    fn unescapes_text_values() {
        assert_eq!(unescape_text("a\\, b\\; c\\nd\\\\e"), "a, b; c d\\e");
    }

    #[test]
    fn leading_byte_order_mark_is_ignored() {
        let with_bom = format!("\u{feff}{FEED}");
        let events = parse_feed(&with_bom).expect("Should parse");
        assert_eq!(events.len(), 3);
    }
}
