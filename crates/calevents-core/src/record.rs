//! The event record emitted on standard output.
//!
//! An [`EventRecord`] is the flat, JSON-facing shape of one calendar event:
//! every time is a Unix timestamp and every text field is present (defaults
//! are filled in when the calendar left them out).

use serde::{Deserialize, Serialize};

/// Title used when an event has no (or a blank) summary.
pub const DEFAULT_SUMMARY: &str = "(No title)";

/// Duration assumed when an event has no usable end, in seconds.
pub const DEFAULT_DURATION_SECS: i64 = 3600;

/// One calendar event, normalized for output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// The event title.
    pub summary: String,
    /// Start time, Unix seconds.
    pub start: i64,
    /// End time, Unix seconds.
    pub end: i64,
    /// The event location, empty if none.
    pub location: String,
    /// The event description, empty if none.
    pub description: String,
    /// Display name of the calendar source the event came from.
    pub calendar: String,
}

impl EventRecord {
    /// Builds a record, applying the summary and end defaults.
    ///
    /// `end` falls back to `start + 3600` when it is `None` or equal to
    /// `start`. An end before the start is kept as-is.
    pub fn new(
        summary: Option<&str>,
        start: i64,
        end: Option<i64>,
        calendar: impl Into<String>,
    ) -> Self {
        Self {
            summary: effective_summary(summary).to_string(),
            start,
            end: effective_end(start, end),
            location: String::new(),
            description: String::new(),
            calendar: calendar.into(),
        }
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: Option<&str>) -> Self {
        self.location = location.unwrap_or_default().to_string();
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: Option<&str>) -> Self {
        self.description = description.unwrap_or_default().to_string();
        self
    }

    /// Duration in seconds. Negative when the calendar stored an end before the start.
    pub fn duration_secs(&self) -> i64 {
        self.end - self.start
    }
}

/// Returns the summary to display, falling back to [`DEFAULT_SUMMARY`].
pub fn effective_summary(summary: Option<&str>) -> &str {
    summary
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SUMMARY)
}

/// Returns the end timestamp to emit for an event starting at `start`.
pub fn effective_end(start: i64, end: Option<i64>) -> i64 {
    match end {
        Some(end) if end != start => end,
        _ => start + DEFAULT_DURATION_SECS,
    }
}

/// Sorts records by start time.
///
/// The sort is stable: records sharing a start keep their discovery order.
pub fn sort_by_start(records: &mut [EventRecord]) {
    records.sort_by_key(|record| record.start);
}

/// Serializes records as a single JSON array.
pub fn to_json(records: &[EventRecord], pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(records)
    } else {
        serde_json::to_string(records)
    }
}
