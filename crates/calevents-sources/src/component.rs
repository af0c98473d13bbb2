//! Calendar components as returned by backends.
//!
//! Backends hand back either structured iCalendar events or the string form
//! of one or more events ([`RawObject`]). This module resolves both into
//! [`icalendar::Event`] values and reads their DTSTART/DTEND as [`CalTime`].

use calevents_core::CalTime;
use icalendar::{Calendar, CalendarComponent, Component, Event};
use tracing::debug;

use crate::error::{SourceError, SourceResult};
use crate::query::Occurrence;

/// One object returned by a backend query.
#[derive(Debug, Clone)]
pub enum RawObject {
    /// An already-structured event.
    Component(Box<Event>),
    /// iCalendar text: a `VCALENDAR`, or a bare `VEVENT`.
    Text(String),
}

impl RawObject {
    /// Resolves this object into structured events.
    ///
    /// Text is parsed; a parse failure is returned as an error so the caller
    /// can skip the object. Text without any `VEVENT` resolves to nothing.
    pub fn resolve(self) -> SourceResult<Vec<Event>> {
        match self {
            Self::Component(event) => Ok(vec![*event]),
            Self::Text(text) => parse_components(&text),
        }
    }
}

impl From<Event> for RawObject {
    fn from(event: Event) -> Self {
        Self::Component(Box::new(event))
    }
}

/// Parses iCalendar text into its `VEVENT` components.
pub fn parse_components(ics: &str) -> SourceResult<Vec<Event>> {
    let wrapped;
    let ics = if ics.contains("BEGIN:VCALENDAR") {
        ics
    } else {
        wrapped = format!(
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\n{}\r\nEND:VCALENDAR\r\n",
            ics.trim()
        );
        &wrapped
    };

    let calendar = ics
        .parse::<Calendar>()
        .map_err(|e| SourceError::parse(format!("invalid iCalendar data: {}", e)))?;

    Ok(calendar
        .iter()
        .filter_map(|component| match component {
            CalendarComponent::Event(event) => Some(event.clone()),
            _ => None,
        })
        .collect())
}

/// Reads `DTSTART`.
pub fn dtstart(event: &Event) -> Option<CalTime> {
    read_time(event, "DTSTART")
}

/// Reads `DTEND`.
pub fn dtend(event: &Event) -> Option<CalTime> {
    read_time(event, "DTEND")
}

/// Returns true if the event defines a recurrence.
pub fn is_recurring(event: &Event) -> bool {
    event.property_value("RRULE").is_some() || event.multi_properties().contains_key("RDATE")
}

/// Builds the query-matching view of an event, if it has a readable start.
pub fn occurrence(event: &Event) -> Option<Occurrence> {
    let mut occurrence = Occurrence::new(dtstart(event)?, dtend(event))
        .with_rdates(read_times(event, "RDATE"))
        .with_exdates(read_times(event, "EXDATE"));
    if let Some(rule) = event.property_value("RRULE") {
        occurrence = occurrence.with_rrule(rule);
    }
    Some(occurrence)
}

/// Reads every value of a repeatable date list property.
///
/// `PERIOD` values contribute their start.
fn read_times(event: &Event, property: &str) -> Vec<CalTime> {
    event
        .multi_properties()
        .get(property)
        .into_iter()
        .flatten()
        .flat_map(|p| p.value().split(','))
        .filter_map(|value| {
            let start = value.split('/').next().unwrap_or(value);
            CalTime::parse(start)
        })
        .collect()
}

fn read_time(event: &Event, property: &str) -> Option<CalTime> {
    let value = event.property_value(property)?;
    let parsed = CalTime::parse(value);
    if parsed.is_none() {
        debug!(
            uid = ?event.get_uid(),
            property,
            value,
            "Unreadable date-time value"
        );
    }
    parsed
}
