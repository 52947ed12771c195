//! RRULE expansion for recurring events.
//!
//! Conference feeds usually publish one master event with a daily RRULE
//! rather than one VEVENT per day, so the master has to be expanded to see
//! whether an instance lands on a given day.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;

use crate::error::{CheckinError, CheckinResult};
use crate::event::{EventTime, FeedEvent, Recurrence};

/// Upper bound on instances generated per master for a few-day window.
const MAX_INSTANCES: u16 = 64;

/// Flatten a feed into concrete events around `day`.
///
/// Non-recurring events pass through unchanged. Masters are replaced by their
/// instances in a window of one day either side of `day` (the caller filters
/// by local date), with RECURRENCE-ID overrides replacing generated instances.
/// A master whose rule cannot be parsed is logged and dropped.
pub fn expand_around(events: &[FeedEvent], day: NaiveDate, tz: Tz) -> Vec<FeedEvent> {
    let overrides: HashMap<(String, String), &FeedEvent> = events
        .iter()
        .filter_map(|e| {
            let rid = e.recurrence_id.as_ref()?;
            Some(((e.uid.clone(), rid.to_ics_string()), e))
        })
        .collect();

    let (range_start, range_end) = day_window(day, tz);

    let mut flattened = Vec::new();
    for event in events {
        if event.recurrence.is_none() {
            flattened.push(event.clone());
            continue;
        }

        match expand_recurring_event(event, range_start, range_end) {
            Ok(instances) => {
                let instances = instances.into_iter().filter(|instance| {
                    let key = instance
                        .recurrence_id
                        .as_ref()
                        .map(|rid| (instance.uid.clone(), rid.to_ics_string()));
                    !key.is_some_and(|k| overrides.contains_key(&k))
                });
                flattened.extend(instances);
            }
            Err(e) => tracing::warn!(uid = %event.uid, error = %e, "skipping recurring event"),
        }
    }

    flattened
}

/// UTC bounds covering `day` in `tz`, widened by a day on each side.
fn day_window(day: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let from = (day - Duration::days(1)).and_time(chrono::NaiveTime::MIN);
    let to = (day + Duration::days(2)).and_time(chrono::NaiveTime::MIN);
    let resolve = |naive: chrono::NaiveDateTime| {
        EventTime::DateTimeFloating(naive)
            .in_zone(tz)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| naive.and_utc())
    };
    (resolve(from), resolve(to))
}

/// Whether chrono-tz (and therefore the rrule crate) knows this TZID.
fn known_tzid(tzid: &str) -> bool {
    tzid.parse::<Tz>().is_ok()
}

/// Build an iCalendar-format RRULE string for the rrule crate parser.
fn build_rrule_string(start: &EventTime, recurrence: &Recurrence) -> String {
    let mut lines = Vec::new();

    // the rrule crate needs a datetime, so all-day dates become midnight UTC
    lines.push(format!("DTSTART{}", ics_time_suffix(start)));
    lines.push(format!("RRULE:{}", recurrence.rrule));

    for exdate in &recurrence.exdates {
        lines.push(format!("EXDATE{}", ics_time_suffix(exdate)));
    }

    lines.join("\n")
}

fn ics_time_suffix(time: &EventTime) -> String {
    match time {
        EventTime::Date(d) => format!(":{}T000000Z", d.format("%Y%m%d")),
        EventTime::DateTimeUtc(dt) => format!(":{}", dt.format("%Y%m%dT%H%M%SZ")),
        EventTime::DateTimeFloating(dt) => format!(":{}Z", dt.format("%Y%m%dT%H%M%S")),
        EventTime::DateTimeZoned { datetime, tzid } if known_tzid(tzid) => {
            format!(";TZID={}:{}", tzid, datetime.format("%Y%m%dT%H%M%S"))
        }
        EventTime::DateTimeZoned { datetime, .. } => {
            format!(":{}Z", datetime.format("%Y%m%dT%H%M%S"))
        }
    }
}

/// Convert an rrule occurrence back to an EventTime matching the master's variant.
fn occurrence_to_event_time(dt: &DateTime<rrule::Tz>, master_start: &EventTime) -> EventTime {
    match master_start {
        EventTime::Date(_) => EventTime::Date(dt.date_naive()),
        EventTime::DateTimeUtc(_) => EventTime::DateTimeUtc(dt.with_timezone(&Utc)),
        EventTime::DateTimeFloating(_) => EventTime::DateTimeFloating(dt.naive_utc()),
        EventTime::DateTimeZoned { tzid, .. } => EventTime::DateTimeZoned {
            datetime: dt.naive_local(),
            tzid: tzid.clone(),
        },
    }
}

/// Shift an instance start by the master's length, keeping the variant.
fn instance_end(master: &FeedEvent, start: &EventTime) -> EventTime {
    match (&master.start, &master.end, start) {
        (EventTime::Date(s), EventTime::Date(e), EventTime::Date(occ)) => {
            EventTime::Date(*occ + (*e - *s))
        }
        (_, _, EventTime::DateTimeUtc(occ)) => {
            EventTime::DateTimeUtc(*occ + naive_length(master))
        }
        (_, _, EventTime::DateTimeFloating(occ)) => {
            EventTime::DateTimeFloating(*occ + naive_length(master))
        }
        (_, _, EventTime::DateTimeZoned { datetime, tzid }) => EventTime::DateTimeZoned {
            datetime: *datetime + naive_length(master),
            tzid: tzid.clone(),
        },
        _ => start.clone(),
    }
}

/// Length of the master event in wall-clock terms.
fn naive_length(master: &FeedEvent) -> Duration {
    let wall = |t: &EventTime| match t {
        EventTime::Date(d) => Some(d.and_time(chrono::NaiveTime::MIN)),
        EventTime::DateTimeUtc(dt) => Some(dt.naive_utc()),
        EventTime::DateTimeFloating(dt) => Some(*dt),
        EventTime::DateTimeZoned { datetime, .. } => Some(*datetime),
    };
    match (wall(&master.start), wall(&master.end)) {
        (Some(s), Some(e)) if e >= s => e - s,
        _ => Duration::zero(),
    }
}

/// Expand a recurring master event into instances within [range_start, range_end].
///
/// The master itself is not included; every instance has `recurrence_id` set.
pub fn expand_recurring_event(
    master: &FeedEvent,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
) -> CheckinResult<Vec<FeedEvent>> {
    let Some(recurrence) = &master.recurrence else {
        return Ok(Vec::new());
    };

    let rrule_str = build_rrule_string(&master.start, recurrence);

    let rrule_set: RRuleSet = rrule_str.parse().map_err(|e| {
        CheckinError::IcsParse(format!(
            "Failed to parse RRULE for event '{}': {}",
            master.uid, e
        ))
    })?;

    // after/before are exclusive, so widen by a second
    let tz: rrule::Tz = Utc.into();
    let after = (range_start - Duration::seconds(1)).with_timezone(&tz);
    let before = (range_end + Duration::seconds(1)).with_timezone(&tz);

    let result = rrule_set.after(after).before(before).all(MAX_INSTANCES);

    let instances = result
        .dates
        .iter()
        .map(|occ| {
            let start = occurrence_to_event_time(occ, &master.start);
            FeedEvent {
                uid: master.uid.clone(),
                summary: master.summary.clone(),
                end: instance_end(master, &start),
                start: start.clone(),
                cancelled: master.cancelled,
                recurrence: None,
                recurrence_id: Some(start),
            }
        })
        .collect();

    Ok(instances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ics::parse_feed;
    use chrono_tz::America::Los_Angeles;

    const DAILY: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VEVENT\r\n\
UID:daily@test\r\n\
SUMMARY:Morning Conference\r\n\
DTSTART;TZID=America/Los_Angeles:20250303T080000\r\n\
DTEND;TZID=America/Los_Angeles:20250303T090000\r\n\
RRULE:FREQ=DAILY;BYDAY=MO,TU,WE,TH,FR\r\n\
EXDATE;TZID=America/Los_Angeles:20250311T080000\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:daily@test\r\n\
SUMMARY:Wellness Session\r\n\
RECURRENCE-ID;TZID=America/Los_Angeles:20250312T080000\r\n\
DTSTART;TZID=America/Los_Angeles:20250312T080000\r\n\
DTEND;TZID=America/Los_Angeles:20250312T090000\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    fn on_day(events: &[FeedEvent], day: NaiveDate) -> Vec<FeedEvent> {
        expand_around(events, day, Los_Angeles)
            .into_iter()
            .filter(|e| e.start.date_in(Los_Angeles) == Some(day))
            .collect()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn daily_master_has_instance_on_later_weekday() {
        let events = parse_feed(DAILY).unwrap();
        let found = on_day(&events, day(20));

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].summary, "Morning Conference");
        let start = found[0].start.in_zone(Los_Angeles).unwrap();
        assert_eq!(start.format("%H:%M").to_string(), "08:00");
        let end = found[0].end.in_zone(Los_Angeles).unwrap();
        assert_eq!(end.format("%H:%M").to_string(), "09:00");
    }

    #[test]
    fn weekend_and_exdate_have_no_instance() {
        let events = parse_feed(DAILY).unwrap();
        assert!(on_day(&events, day(15)).is_empty(), "Saturday");
        assert!(on_day(&events, day(11)).is_empty(), "EXDATE");
    }

    #[test]
    fn override_replaces_generated_instance() {
        let events = parse_feed(DAILY).unwrap();
        let found = on_day(&events, day(12));

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].summary, "Wellness Session");
    }

    #[test]
    fn bad_rule_drops_only_that_master() {
        let mut events = parse_feed(DAILY).unwrap();
        events[0].recurrence.as_mut().unwrap().rrule = "FREQ=SOMETIMES".to_string();

        let found = expand_around(&events, day(12), Los_Angeles);
        assert_eq!(found.len(), 1, "override survives, master is dropped");
    }
}
