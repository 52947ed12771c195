//! The two daily time slots a conference can occupy.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

/// A fixed daily time window, checked independently of the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    /// The 8AM lecture, 07:00–10:00 local time.
    Morning,
    /// The 12PM lecture, 11:00–14:00 local time.
    Midday,
}

impl Slot {
    /// Label the survey uses for this slot.
    pub fn label(&self) -> &'static str {
        match self {
            Slot::Morning => "8AM",
            Slot::Midday => "12PM",
        }
    }

    /// Local start and end hour, half-open: `start <= hour < end`.
    pub fn hours(&self) -> (u32, u32) {
        match self {
            Slot::Morning => (7, 10),
            Slot::Midday => (11, 14),
        }
    }

    /// Whether a local start time falls inside this slot's window.
    pub fn contains<Tz: TimeZone>(&self, start: &DateTime<Tz>) -> bool {
        let (from, to) = self.hours();
        (from..to).contains(&start.hour())
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Slot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "8am" | "morning" => Ok(Slot::Morning),
            "12pm" | "midday" | "noon" => Ok(Slot::Midday),
            other => Err(format!(
                "Unknown time slot '{}'. Expected 8AM or 12PM",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::Los_Angeles;

    #[test]
    fn parses_labels_and_aliases() {
        assert_eq!("8AM".parse::<Slot>().unwrap(), Slot::Morning);
        assert_eq!("8am".parse::<Slot>().unwrap(), Slot::Morning);
        assert_eq!("morning".parse::<Slot>().unwrap(), Slot::Morning);
        assert_eq!("12PM".parse::<Slot>().unwrap(), Slot::Midday);
        assert_eq!(" midday ".parse::<Slot>().unwrap(), Slot::Midday);
        assert!("3PM".parse::<Slot>().is_err());
    }

    #[test]
    fn window_is_half_open() {
        let at = |h, m| Los_Angeles.with_ymd_and_hms(2025, 3, 20, h, m, 0).unwrap();

        assert!(!Slot::Morning.contains(&at(6, 59)));
        assert!(Slot::Morning.contains(&at(7, 0)));
        assert!(Slot::Morning.contains(&at(9, 59)));
        assert!(!Slot::Morning.contains(&at(10, 0)));

        assert!(!Slot::Midday.contains(&at(10, 59)));
        assert!(Slot::Midday.contains(&at(11, 0)));
        assert!(Slot::Midday.contains(&at(13, 30)));
        assert!(!Slot::Midday.contains(&at(14, 0)));
    }

    #[test]
    fn display_matches_survey_label() {
        assert_eq!(Slot::Morning.to_string(), "8AM");
        assert_eq!(Slot::Midday.to_string(), "12PM");
    }
}
