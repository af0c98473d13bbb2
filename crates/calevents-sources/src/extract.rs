//! Event extraction: iCalendar component to [`EventRecord`].

use calevents_core::EventRecord;
use icalendar::{Component, Event, EventLike};
use thiserror::Error;

use crate::component::{dtend, dtstart};

/// Why a component did not produce a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// DTSTART is missing or does not normalize to a timestamp.
    #[error("event has no usable start time")]
    MissingStart,
}

/// Extracts one record from an event component.
///
/// The start is required. The end is optional and defaults to one hour
/// after the start when absent, unreadable, or equal to the start.
pub fn extract_event(event: &Event, calendar: &str) -> Result<EventRecord, ExtractError> {
    let start = dtstart(event)
        .and_then(|time| time.to_unix())
        .ok_or(ExtractError::MissingStart)?;
    let end = dtend(event).and_then(|time| time.to_unix());

    Ok(EventRecord::new(event.get_summary(), start, end, calendar)
        .with_location(event.get_location())
        .with_description(event.get_description()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::parse_components;

    fn single(body: &str) -> Event {
        let ics = format!(
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:t@example.com\r\n{}END:VEVENT\r\nEND:VCALENDAR\r\n",
            body
        );
        parse_components(&ics).unwrap().remove(0)
    }

    #[test]
    fn full_event() {
        let event = single(
            "DTSTART:20231114T221320Z\r\n\
             DTEND:20231114T231320Z\r\n\
             SUMMARY:Planning\r\n\
             LOCATION:Room 4\r\n\
             DESCRIPTION:Quarterly planning\r\n",
        );

        let record = extract_event(&event, "Work").unwrap();
        assert_eq!(record.summary, "Planning");
        assert_eq!(record.start, 1_700_000_000);
        assert_eq!(record.end, 1_700_003_600);
        assert_eq!(record.location, "Room 4");
        assert_eq!(record.description, "Quarterly planning");
        assert_eq!(record.calendar, "Work");
    }

    #[test]
    fn defaults_for_missing_fields() {
        let event = single("DTSTART:20231114T221320Z\r\n");

        let record = extract_event(&event, "Personal").unwrap();
        assert_eq!(record.summary, "(No title)");
        assert_eq!(record.end, 1_700_003_600);
        assert_eq!(record.location, "");
        assert_eq!(record.description, "");
    }

    #[test]
    fn end_equal_to_start_is_replaced() {
        let event = single("DTSTART:20231114T221320Z\r\nDTEND:20231114T221320Z\r\n");
        let record = extract_event(&event, "Personal").unwrap();
        assert_eq!(record.end, record.start + 3600);
    }

    #[test]
    fn unreadable_end_is_replaced() {
        let event = single("DTSTART:20231114T221320Z\r\nDTEND:20230230T100000Z\r\n");
        let record = extract_event(&event, "Personal").unwrap();
        assert_eq!(record.end, record.start + 3600);
    }

    #[test]
    fn all_day_event_without_end() {
        let event = single("DTSTART;VALUE=DATE:20231114\r\nSUMMARY:Holiday\r\n");

        let record = extract_event(&event, "Personal").unwrap();
        let midnight = calevents_core::CalTime::date(2023, 11, 14).to_unix().unwrap();
        assert_eq!(record.start, midnight);
        assert_eq!(record.end, midnight + 3600);
    }

    #[test]
    fn missing_start_is_an_error() {
        let event = single("SUMMARY:Floating idea\r\n");
        assert_eq!(
            extract_event(&event, "Personal"),
            Err(ExtractError::MissingStart)
        );
    }

    #[test]
    fn out_of_range_start_is_an_error() {
        let event = single("DTSTART:19650101T100000Z\r\n");
        assert_eq!(
            extract_event(&event, "Personal"),
            Err(ExtractError::MissingStart)
        );
    }
}
