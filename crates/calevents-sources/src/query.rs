//! Time-range query expressions.
//!
//! The data service filters objects with s-expressions such as
//!
//! ```text
//! (occur-in-time-range? (make-time "20231114T221320Z") (make-time "20231114T231320Z"))
//! ```
//!
//! [`TimeRangeQuery`] renders that expression for logging and remote use, and
//! evaluates it locally for backends that hand back a whole calendar.

use std::fmt;

use calevents_core::{CalTime, TimeWindow, format_icalendar_utc};
use chrono::TimeZone;
use rrule::{RRuleSet, Tz};
use tracing::debug;

/// Length of an all-day event without an explicit end.
const ALL_DAY_SECS: i64 = 86_400;

/// The time span of one event as far as query matching is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub start: CalTime,
    pub end: Option<CalTime>,
    /// Value of `RRULE`, if any.
    pub rrule: Option<String>,
    /// Extra instance starts from `RDATE`.
    pub rdates: Vec<CalTime>,
    /// Instance starts removed by `EXDATE`.
    pub exdates: Vec<CalTime>,
}

impl Occurrence {
    /// Creates a single, non-recurring span.
    pub fn new(start: CalTime, end: Option<CalTime>) -> Self {
        Self {
            start,
            end,
            rrule: None,
            rdates: Vec::new(),
            exdates: Vec::new(),
        }
    }

    /// Sets the recurrence rule.
    pub fn with_rrule(mut self, rrule: impl Into<String>) -> Self {
        self.rrule = Some(rrule.into());
        self
    }

    /// Adds `RDATE` instances.
    pub fn with_rdates(mut self, rdates: Vec<CalTime>) -> Self {
        self.rdates = rdates;
        self
    }

    /// Adds `EXDATE` exclusions.
    pub fn with_exdates(mut self, exdates: Vec<CalTime>) -> Self {
        self.exdates = exdates;
        self
    }

    /// Returns true if the event defines a recurrence.
    pub fn is_recurring(&self) -> bool {
        self.rrule.is_some() || !self.rdates.is_empty()
    }

    /// Length of each instance in seconds.
    fn duration(&self, start: i64) -> i64 {
        match self.end.as_ref().and_then(CalTime::to_unix) {
            Some(end) => (end - start).max(0),
            None if self.start.is_date => ALL_DAY_SECS,
            None => 0,
        }
    }
}

/// An `occur-in-time-range?` query over a [`TimeWindow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRangeQuery {
    window: TimeWindow,
}

impl TimeRangeQuery {
    /// Creates a query for the given window.
    pub fn new(window: TimeWindow) -> Self {
        Self { window }
    }

    /// The queried window.
    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    /// Renders the s-expression form.
    pub fn to_sexp(&self) -> String {
        format!(
            "(occur-in-time-range? (make-time \"{}\") (make-time \"{}\"))",
            format_icalendar_utc(self.window.start),
            format_icalendar_utc(self.window.end)
        )
    }

    /// Evaluates the query against one event.
    ///
    /// Without an end, a timed event is an instant and an all-day event spans
    /// one day. A recurring event matches when any of its instances (rule
    /// instances and `RDATE`s minus `EXDATE`s) overlaps the window.
    pub fn matches(&self, occurrence: &Occurrence) -> bool {
        let Some(start) = occurrence.start.to_unix() else {
            return false;
        };
        if self.window.is_empty() {
            return false;
        }

        let duration = occurrence.duration(start);
        if !occurrence.is_recurring() {
            return self.window.overlaps(start, start + duration);
        }

        let excluded: Vec<i64> = occurrence
            .exdates
            .iter()
            .filter_map(CalTime::to_unix)
            .collect();
        let hits = |instance: i64| {
            !excluded.contains(&instance) && self.window.overlaps(instance, instance + duration)
        };

        if occurrence
            .rdates
            .iter()
            .filter_map(CalTime::to_unix)
            .any(hits)
        {
            return true;
        }

        match &occurrence.rrule {
            Some(rule) => self.rule_matches(start, duration, rule, hits),
            // RDATE-only events still occur at DTSTART.
            None => hits(start),
        }
    }

    /// Walks the rule's instances up to the window end.
    ///
    /// A rule that cannot be evaluated falls back to the first instance.
    fn rule_matches(
        &self,
        start: i64,
        duration: i64,
        rule: &str,
        hits: impl Fn(i64) -> bool,
    ) -> bool {
        let set = match rule_set(start, rule) {
            Ok(set) => set,
            Err(e) => {
                debug!(rule, error = %e, "Cannot evaluate recurrence rule");
                return hits(start);
            }
        };

        // Instances starting before this point cannot reach the window.
        let earliest = self.window.start_unix() - duration - 1;
        let set = match Tz::UTC.timestamp_opt(earliest, 0).single() {
            Some(after) if earliest > start => set.after(after),
            _ => set,
        };

        let end = self.window.end_unix();
        for instance in &set {
            let instance = instance.timestamp();
            if instance >= end {
                break;
            }
            if hits(instance) {
                return true;
            }
        }
        false
    }
}

/// Builds an evaluable rule set anchored at `start` (Unix seconds, UTC).
fn rule_set(start: i64, rule: &str) -> Result<RRuleSet, String> {
    let dtstart = chrono::DateTime::from_timestamp(start, 0)
        .map(format_icalendar_utc)
        .ok_or_else(|| format!("start {} out of range", start))?;
    format!("DTSTART:{}\nRRULE:{}", dtstart, utc_until(rule))
        .parse::<RRuleSet>()
        .map_err(|e| e.to_string())
}

/// Rewrites a date-only or floating `UNTIL` as UTC, since the rule is
/// anchored at a UTC start.
fn utc_until(rule: &str) -> String {
    rule.split(';')
        .map(|part| match part.split_once('=') {
            Some((key, value)) if key.eq_ignore_ascii_case("UNTIL") => {
                if value.len() == 8 {
                    format!("UNTIL={}T235959Z", value)
                } else if !value.ends_with('Z') {
                    format!("UNTIL={}Z", value)
                } else {
                    part.to_string()
                }
            }
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

impl fmt::Display for TimeRangeQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sexp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(start: i64, end: i64) -> TimeRangeQuery {
        TimeRangeQuery::new(TimeWindow::from_unix(start, end).unwrap())
    }

    // 2023-11-14 22:13:20 to 23:13:20 UTC, a Tuesday
    fn evening() -> TimeRangeQuery {
        query(1_700_000_000, 1_700_003_600)
    }

    fn weekly(start: CalTime, end: CalTime, rule: &str) -> Occurrence {
        Occurrence::new(start, Some(end)).with_rrule(rule)
    }

    #[test]
    fn sexp_rendering() {
        let q = evening();
        assert_eq!(
            q.to_sexp(),
            r#"(occur-in-time-range? (make-time "20231114T221320Z") (make-time "20231114T231320Z"))"#
        );
        assert_eq!(q.to_string(), q.to_sexp());
    }

    #[test]
    fn overlapping_timed_event_matches() {
        let event = Occurrence::new(
            CalTime::date_time(2023, 11, 14, 22, 0, 0).with_utc(),
            Some(CalTime::date_time(2023, 11, 14, 23, 0, 0).with_utc()),
        );
        assert!(evening().matches(&event));
    }

    #[test]
    fn event_before_window_does_not_match() {
        let event = Occurrence::new(
            CalTime::date_time(2023, 11, 14, 20, 0, 0),
            Some(CalTime::date_time(2023, 11, 14, 21, 0, 0)),
        );
        assert!(!evening().matches(&event));
    }

    #[test]
    fn instant_matches_only_inside_window() {
        let inside = Occurrence::new(CalTime::date_time(2023, 11, 14, 22, 30, 0), None);
        let at_end = Occurrence::new(CalTime::date_time(2023, 11, 14, 23, 13, 20), None);
        assert!(evening().matches(&inside));
        assert!(!evening().matches(&at_end));
    }

    #[test]
    fn unresolvable_start_never_matches() {
        let q = query(0, i64::from(u32::MAX));
        let event = Occurrence::new(CalTime::date(1969, 1, 1), None);
        assert!(!q.matches(&event));
    }

    #[test]
    fn open_weekly_series_matches_later_instance() {
        // Tuesdays 22:00-23:00 since January.
        let series = weekly(
            CalTime::date_time(2023, 1, 3, 22, 0, 0),
            CalTime::date_time(2023, 1, 3, 23, 0, 0),
            "FREQ=WEEKLY",
        );
        assert!(evening().matches(&series));

        let mondays = weekly(
            CalTime::date_time(2023, 1, 2, 22, 0, 0),
            CalTime::date_time(2023, 1, 2, 23, 0, 0),
            "FREQ=WEEKLY",
        );
        assert!(!evening().matches(&mondays));
    }

    #[test]
    fn series_ended_by_until_does_not_match() {
        let ended = weekly(
            CalTime::date_time(2020, 1, 6, 9, 0, 0).with_utc(),
            CalTime::date_time(2020, 1, 6, 10, 0, 0).with_utc(),
            "FREQ=WEEKLY;UNTIL=20200301T000000Z",
        );
        assert!(!evening().matches(&ended));

        // Same series, queried while it was still running.
        let january = query(1_578_301_200, 1_578_304_800);
        assert!(january.matches(&ended));
    }

    #[test]
    fn date_only_until_is_accepted() {
        let ended = weekly(
            CalTime::date_time(2023, 1, 3, 22, 0, 0),
            CalTime::date_time(2023, 1, 3, 23, 0, 0),
            "FREQ=WEEKLY;UNTIL=20230301",
        );
        assert!(!evening().matches(&ended));

        let running = weekly(
            CalTime::date_time(2023, 1, 3, 22, 0, 0),
            CalTime::date_time(2023, 1, 3, 23, 0, 0),
            "FREQ=WEEKLY;UNTIL=20231231",
        );
        assert!(evening().matches(&running));
    }

    #[test]
    fn series_ended_by_count_does_not_match() {
        let short = weekly(
            CalTime::date_time(2023, 1, 3, 22, 0, 0),
            CalTime::date_time(2023, 1, 3, 23, 0, 0),
            "FREQ=WEEKLY;COUNT=5",
        );
        assert!(!evening().matches(&short));

        // 2023-01-03 to 2023-11-14 is 45 weeks; the 46th instance is the one.
        let long = weekly(
            CalTime::date_time(2023, 1, 3, 22, 0, 0),
            CalTime::date_time(2023, 1, 3, 23, 0, 0),
            "FREQ=WEEKLY;COUNT=46",
        );
        assert!(evening().matches(&long));
    }

    #[test]
    fn excluded_instance_does_not_match() {
        let series = weekly(
            CalTime::date_time(2023, 1, 3, 22, 0, 0),
            CalTime::date_time(2023, 1, 3, 23, 0, 0),
            "FREQ=WEEKLY",
        )
        .with_exdates(vec![CalTime::date_time(2023, 11, 14, 22, 0, 0).with_utc()]);
        assert!(!evening().matches(&series));
    }

    #[test]
    fn rdate_adds_an_instance() {
        let moved = Occurrence::new(
            CalTime::date_time(2023, 1, 3, 9, 0, 0),
            Some(CalTime::date_time(2023, 1, 3, 10, 0, 0)),
        )
        .with_rdates(vec![CalTime::date_time(2023, 11, 14, 22, 30, 0)]);
        assert!(moved.is_recurring());
        assert!(evening().matches(&moved));
    }

    #[test]
    fn future_series_does_not_match() {
        let future = Occurrence::new(CalTime::date_time(2024, 1, 2, 9, 0, 0), None)
            .with_rrule("FREQ=WEEKLY");
        assert!(!evening().matches(&future));
    }

    #[test]
    fn until_is_rewritten_as_utc() {
        assert_eq!(
            utc_until("FREQ=WEEKLY;UNTIL=20230301"),
            "FREQ=WEEKLY;UNTIL=20230301T235959Z"
        );
        assert_eq!(
            utc_until("FREQ=DAILY;UNTIL=20230301T100000;INTERVAL=2"),
            "FREQ=DAILY;UNTIL=20230301T100000Z;INTERVAL=2"
        );
        assert_eq!(utc_until("FREQ=DAILY;COUNT=3"), "FREQ=DAILY;COUNT=3");
    }
}
