//! Date conditions and timestamp/elapsed formatting.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DateCondition {
    Equals,
    NotEquals,
    Before,
    After,
    Between,
    NotBetween,
    Unknown,
}

impl DateCondition {
    pub fn parse(label: &str) -> Self {
        match label {
            "Equals" => DateCondition::Equals,
            "Not equals" => DateCondition::NotEquals,
            "Before" => DateCondition::Before,
            "After" => DateCondition::After,
            "Between" => DateCondition::Between,
            "Not between" => DateCondition::NotBetween,
            _ => DateCondition::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DateCondition::Equals => "Equals",
            DateCondition::NotEquals => "Not equals",
            DateCondition::Before => "Before",
            DateCondition::After => "After",
            DateCondition::Between => "Between",
            DateCondition::NotBetween => "Not between",
            DateCondition::Unknown => "Unknown",
        }
    }
}

impl From<String> for DateCondition {
    fn from(label: String) -> Self {
        DateCondition::parse(&label)
    }
}

impl From<DateCondition> for String {
    fn from(condition: DateCondition) -> Self {
        condition.as_str().to_string()
    }
}

impl fmt::Display for DateCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn matches_date(
    timestamp: DateTime<Local>,
    condition: DateCondition,
    value1: DateTime<Local>,
    value2: DateTime<Local>,
) -> bool {
    match condition {
        DateCondition::Equals => timestamp == value1,
        DateCondition::NotEquals => timestamp != value1,
        DateCondition::Before => timestamp < value1,
        DateCondition::After => timestamp > value1,
        DateCondition::Between => timestamp >= value1 && timestamp <= value2,
        DateCondition::NotBetween => timestamp < value1 || timestamp > value2,
        DateCondition::Unknown => false,
    }
}

/// `hh:mm:ss`, hours are not wrapped at a day.
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

pub fn format_timestamp(timestamp: &DateTime<Local>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 11, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_simple_conditions() {
        assert!(matches_date(at(10), DateCondition::Equals, at(10), at(1)));
        assert!(matches_date(at(10), DateCondition::NotEquals, at(11), at(1)));
        assert!(matches_date(at(9), DateCondition::Before, at(10), at(1)));
        assert!(!matches_date(at(10), DateCondition::Before, at(10), at(1)));
        assert!(matches_date(at(11), DateCondition::After, at(10), at(1)));
    }

    #[test]
    fn test_between_inclusive_and_complement() {
        for day in 1..=20 {
            let inside = matches_date(at(day), DateCondition::Between, at(5), at(15));
            let outside = matches_date(at(day), DateCondition::NotBetween, at(5), at(15));
            assert_ne!(inside, outside, "day {day}");
            assert_eq!(inside, (5..=15).contains(&day));
        }
    }

    #[test]
    fn test_unknown_condition() {
        let condition = DateCondition::parse("Less than");
        assert_eq!(condition, DateCondition::Unknown);
        assert!(!matches_date(at(1), condition, at(1), at(2)));
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(0)), "00:00:00");
        assert_eq!(format_elapsed(Duration::from_millis(61_999)), "00:01:01");
        assert_eq!(format_elapsed(Duration::from_secs(26 * 3600 + 5)), "26:00:05");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(&at(3)), "2024-11-03 12:00:00");
    }
}
