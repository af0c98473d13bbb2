//! Time types for calendar queries and event normalization.
//!
//! This module provides [`TimeWindow`] for the query range supplied on the
//! command line, and [`CalTime`] for the raw fields of an iCalendar DATE or
//! DATE-TIME value. A `CalTime` is turned into a Unix timestamp with
//! [`CalTime::to_unix`], which is where all-day and timed values diverge.

use std::fmt;

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Earliest year accepted by [`CalTime::to_unix`].
pub const MIN_YEAR: i32 = 1970;

/// Latest year accepted by [`CalTime::to_unix`].
pub const MAX_YEAR: i32 = 2100;

/// Errors raised while building time values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// The Unix timestamp cannot be represented as a datetime.
    #[error("timestamp {0} is out of range")]
    OutOfRange(i64),
}

/// A time window for querying calendar events.
///
/// Represents a half-open interval `[start, end)` in UTC. Unlike a strict
/// interval type, an inverted window (`start > end`) is accepted and simply
/// matches nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Creates a time window from two Unix timestamps (seconds).
    pub fn from_unix(start: i64, end: i64) -> Result<Self, TimeError> {
        let start = DateTime::from_timestamp(start, 0).ok_or(TimeError::OutOfRange(start))?;
        let end = DateTime::from_timestamp(end, 0).ok_or(TimeError::OutOfRange(end))?;
        Ok(Self::new(start, end))
    }

    /// Start of the window as a Unix timestamp.
    pub fn start_unix(&self) -> i64 {
        self.start.timestamp()
    }

    /// End of the window as a Unix timestamp.
    pub fn end_unix(&self) -> i64 {
        self.end.timestamp()
    }

    /// Returns true if the window cannot contain anything.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Checks whether the span `[start, end)` (Unix seconds) overlaps the window.
    ///
    /// A span with `end <= start` is treated as an instant at `start`.
    pub fn overlaps(&self, start: i64, end: i64) -> bool {
        let (window_start, window_end) = (self.start_unix(), self.end_unix());
        if end > start {
            start < window_end && end > window_start
        } else {
            window_start <= start && start < window_end
        }
    }
}

/// Formats a UTC datetime in iCalendar basic format (`20250205T143000Z`).
pub fn format_icalendar_utc(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// The raw fields of an iCalendar DATE or DATE-TIME value.
///
/// Fields are stored as found and validated only when converted, so a value
/// such as `20250230` parses but never yields a timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    /// Date-only value (all-day event).
    pub is_date: bool,
    /// The value carried a trailing `Z`. Informational: wall-clock fields
    /// are read as UTC either way.
    pub is_utc: bool,
}

impl CalTime {
    /// Creates a date-only value.
    pub fn date(year: i32, month: u32, day: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour: 0,
            minute: 0,
            second: 0,
            is_date: true,
            is_utc: false,
        }
    }

    /// Creates a date-time value.
    pub fn date_time(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            is_date: false,
            is_utc: false,
        }
    }

    /// Marks the value as UTC.
    pub fn with_utc(mut self) -> Self {
        self.is_utc = true;
        self
    }

    /// Parses an iCalendar basic-format value.
    ///
    /// Handles:
    /// - `20250205` (date)
    /// - `20250205T100000` (floating or TZID-qualified)
    /// - `20250205T100000Z` (UTC)
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if !value.is_ascii() {
            return None;
        }

        let (date_part, time_part) = match value.split_once('T') {
            Some((date, time)) => (date, Some(time)),
            None => (value, None),
        };

        if date_part.len() != 8 || !date_part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let year = date_part[0..4].parse().ok()?;
        let month = date_part[4..6].parse().ok()?;
        let day = date_part[6..8].parse().ok()?;

        let Some(time_part) = time_part else {
            return Some(Self::date(year, month, day));
        };

        let (digits, is_utc) = match time_part.strip_suffix('Z') {
            Some(digits) => (digits, true),
            None => (time_part, false),
        };
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let mut time = Self::date_time(
            year,
            month,
            day,
            digits[0..2].parse().ok()?,
            digits[2..4].parse().ok()?,
            digits[4..6].parse().ok()?,
        );
        time.is_utc = is_utc;
        Some(time)
    }

    /// Returns true if year, month, and day fall within the accepted ranges.
    pub fn is_in_range(&self) -> bool {
        (MIN_YEAR..=MAX_YEAR).contains(&self.year)
            && (1..=12).contains(&self.month)
            && (1..=31).contains(&self.day)
    }

    /// Converts to a Unix timestamp.
    ///
    /// - out-of-range year/month/day yields `None`
    /// - a date-only value yields local midnight of that date
    /// - anything else is read as a UTC wall-clock time
    ///
    /// Fields that pass the range check but still do not form a valid
    /// datetime (February 30, hour 25) are logged and yield `None`.
    pub fn to_unix(&self) -> Option<i64> {
        if !self.is_in_range() {
            return None;
        }

        let Some(date) = NaiveDate::from_ymd_opt(self.year, self.month, self.day) else {
            warn!(time = %self, "Error parsing time: invalid calendar date");
            return None;
        };

        if self.is_date {
            return match midnight_in(date, &Local) {
                Some(dt) => Some(dt.timestamp()),
                None => {
                    warn!(time = %self, "Error parsing time: no local midnight");
                    None
                }
            };
        }

        let Some(time) = NaiveTime::from_hms_opt(self.hour, self.minute, self.second) else {
            warn!(time = %self, "Error parsing time: invalid time of day");
            return None;
        };

        Some(date.and_time(time).and_utc().timestamp())
    }
}

impl fmt::Display for CalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}{:02}", self.year, self.month, self.day)?;
        if !self.is_date {
            write!(f, "T{:02}{:02}{:02}", self.hour, self.minute, self.second)?;
            if self.is_utc {
                f.write_str("Z")?;
            }
        }
        Ok(())
    }
}

/// Returns midnight of `date` in `tz`.
///
/// An ambiguous midnight resolves to the earlier instant. When midnight falls
/// into a DST gap, the first valid half-hour after it is used.
pub fn midnight_in<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Option<DateTime<Tz>> {
    let naive = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => (1..=48).find_map(|step| {
            tz.from_local_datetime(&(naive + Duration::minutes(30 * step)))
                .earliest()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn window_from_unix() {
        let window = TimeWindow::from_unix(1_700_000_000, 1_700_003_600).unwrap();
        assert_eq!(window.start_unix(), 1_700_000_000);
        assert_eq!(window.end_unix(), 1_700_003_600);
        assert!(!window.is_empty());
        assert_eq!(
            format_icalendar_utc(window.start),
            "20231114T221320Z".to_string()
        );
    }

    #[test]
    fn window_from_unix_out_of_range() {
        assert_eq!(
            TimeWindow::from_unix(i64::MAX, 0),
            Err(TimeError::OutOfRange(i64::MAX))
        );
    }

    #[test]
    fn inverted_window_is_empty() {
        let window = TimeWindow::from_unix(2_000, 1_000).unwrap();
        assert!(window.is_empty());
        assert!(!window.overlaps(1_000, 2_000));
        assert!(!window.overlaps(1_500, 1_500));
    }

    #[test]
    fn window_overlap_semantics() {
        let window = TimeWindow::from_unix(1_000, 2_000).unwrap();

        assert!(window.overlaps(500, 1_500));
        assert!(window.overlaps(1_500, 2_500));
        assert!(window.overlaps(500, 2_500));
        assert!(!window.overlaps(500, 1_000));
        assert!(!window.overlaps(2_000, 2_500));

        // Instants
        assert!(window.overlaps(1_000, 1_000));
        assert!(!window.overlaps(2_000, 2_000));
    }

    #[test]
    fn parse_date_value() {
        let time = CalTime::parse("20250210").unwrap();
        assert_eq!(time, CalTime::date(2025, 2, 10));
        assert_eq!(time.to_string(), "20250210");
    }

    #[test]
    fn parse_utc_value() {
        let time = CalTime::parse("20250205T143000Z").unwrap();
        assert_eq!(time, CalTime::date_time(2025, 2, 5, 14, 30, 0).with_utc());
        assert_eq!(time.to_string(), "20250205T143000Z");
    }

    #[test]
    fn parse_floating_value() {
        let time = CalTime::parse(" 20250205T143000 ").unwrap();
        assert!(!time.is_date);
        assert!(!time.is_utc);
        assert_eq!(time.hour, 14);
    }

    #[test]
    fn parse_rejects_malformed_values() {
        assert!(CalTime::parse("").is_none());
        assert!(CalTime::parse("2025-02-05").is_none());
        assert!(CalTime::parse("20250205T1430").is_none());
        assert!(CalTime::parse("20250205T14300Z0").is_none());
        assert!(CalTime::parse("2025020é").is_none());
    }

    #[test]
    fn parse_keeps_invalid_day_fields() {
        let time = CalTime::parse("20250230").unwrap();
        assert_eq!(time.day, 30);
        assert!(time.is_in_range());
        assert_eq!(time.to_unix(), None);
    }

    #[test]
    fn timed_value_is_read_as_utc() {
        let time = CalTime::date_time(2023, 11, 14, 22, 13, 20);
        assert_eq!(time.to_unix(), Some(1_700_000_000));
        assert_eq!(time.with_utc().to_unix(), Some(1_700_000_000));
    }

    #[test]
    fn date_value_is_local_midnight() {
        let time = CalTime::date(2023, 11, 14);
        let expected = Local
            .with_ymd_and_hms(2023, 11, 14, 0, 0, 0)
            .earliest()
            .unwrap()
            .timestamp();
        assert_eq!(time.to_unix(), Some(expected));
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        assert_eq!(CalTime::date(1969, 12, 31).to_unix(), None);
        assert_eq!(CalTime::date(2101, 1, 1).to_unix(), None);
        assert_eq!(CalTime::date(2025, 0, 1).to_unix(), None);
        assert_eq!(CalTime::date(2025, 13, 1).to_unix(), None);
        assert_eq!(CalTime::date(2025, 1, 0).to_unix(), None);
        assert_eq!(CalTime::date(2025, 1, 32).to_unix(), None);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        assert_eq!(
            CalTime::date_time(1970, 1, 1, 0, 0, 0).to_unix(),
            Some(0)
        );
        assert!(CalTime::date_time(2100, 12, 31, 23, 59, 59).to_unix().is_some());
    }

    #[test]
    fn invalid_time_of_day_is_rejected() {
        assert_eq!(CalTime::date_time(2025, 1, 1, 25, 0, 0).to_unix(), None);
        assert_eq!(CalTime::date_time(2025, 1, 1, 10, 60, 0).to_unix(), None);
    }

    #[test]
    fn midnight_in_fixed_offset() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let date = NaiveDate::from_ymd_opt(2023, 11, 14).unwrap();
        let midnight = midnight_in(date, &tz).unwrap();
        assert_eq!(midnight.timestamp(), 1_699_912_800);
    }
}
