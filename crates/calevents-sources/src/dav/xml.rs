//! WebDAV XML: the `calendar-query` REPORT body and its multistatus reply.

use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};

use calevents_core::format_icalendar_utc;

use crate::error::{SourceError, SourceResult};
use crate::query::TimeRangeQuery;

/// DAV namespace
pub const DAV_NS: &str = "DAV:";
/// CalDAV namespace
pub const CALDAV_NS: &str = "urn:ietf:params:xml:ns:caldav";

/// One `<response>` of a REPORT reply carrying calendar data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportItem {
    pub href: String,
    pub etag: Option<String>,
    /// The iCalendar text of `<C:calendar-data>`.
    pub calendar_data: String,
}

/// Builds a `calendar-query` REPORT body selecting the `VEVENT`s that
/// overlap the query window.
pub fn calendar_query_body(query: &TimeRangeQuery) -> SourceResult<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    write_calendar_query(&mut writer, query)
        .map_err(|e| SourceError::internal(format!("failed to build REPORT body: {}", e)))?;

    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|e| SourceError::internal(format!("REPORT body is not UTF-8: {}", e)))
}

fn write_calendar_query(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    query: &TimeRangeQuery,
) -> Result<(), quick_xml::Error> {
    let mut root = BytesStart::new("c:calendar-query");
    root.push_attribute(("xmlns:d", DAV_NS));
    root.push_attribute(("xmlns:c", CALDAV_NS));
    writer.write_event(Event::Start(root))?;

    writer.write_event(Event::Start(BytesStart::new("d:prop")))?;
    writer.write_event(Event::Empty(BytesStart::new("d:getetag")))?;
    writer.write_event(Event::Empty(BytesStart::new("c:calendar-data")))?;
    writer.write_event(Event::End(BytesEnd::new("d:prop")))?;

    writer.write_event(Event::Start(BytesStart::new("c:filter")))?;
    for component in ["VCALENDAR", "VEVENT"] {
        let mut filter = BytesStart::new("c:comp-filter");
        filter.push_attribute(("name", component));
        writer.write_event(Event::Start(filter))?;
    }

    let window = query.window();
    let mut time_range = BytesStart::new("c:time-range");
    time_range.push_attribute(("start", format_icalendar_utc(window.start).as_str()));
    time_range.push_attribute(("end", format_icalendar_utc(window.end).as_str()));
    writer.write_event(Event::Empty(time_range))?;

    for _ in 0..2 {
        writer.write_event(Event::End(BytesEnd::new("c:comp-filter")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("c:filter")))?;
    writer.write_event(Event::End(BytesEnd::new("c:calendar-query")))?;
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Href,
    Etag,
    CalendarData,
}

impl Field {
    fn from_local_name(local: &str) -> Option<Self> {
        match local {
            "href" => Some(Self::Href),
            "getetag" => Some(Self::Etag),
            "calendar-data" => Some(Self::CalendarData),
            _ => None,
        }
    }
}

#[derive(Default)]
struct PendingItem {
    href: String,
    etag: String,
    calendar_data: String,
}

impl PendingItem {
    fn push(&mut self, field: Field, text: &str) {
        match field {
            Field::Href => self.href.push_str(text),
            Field::Etag => self.etag.push_str(text),
            Field::CalendarData => self.calendar_data.push_str(text),
        }
    }

    fn finish(self) -> Option<ReportItem> {
        if self.href.is_empty() || self.calendar_data.trim().is_empty() {
            return None;
        }
        let etag = self.etag.trim().trim_matches('"');
        Some(ReportItem {
            href: self.href,
            etag: (!etag.is_empty()).then(|| etag.to_string()),
            calendar_data: self.calendar_data,
        })
    }
}

/// Reads the `<response>` elements of a multistatus reply.
///
/// Responses without calendar data (e.g. a `404` propstat) are dropped.
pub fn parse_report_response(xml: &str) -> SourceResult<Vec<ReportItem>> {
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut pending: Option<PendingItem> = None;
    let mut field: Option<Field> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            SourceError::invalid_response(format!(
                "malformed multistatus at byte {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(e) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"response" {
                    pending = Some(PendingItem::default());
                } else {
                    field = std::str::from_utf8(local)
                        .ok()
                        .and_then(Field::from_local_name);
                }
            }
            Event::End(e) => {
                if local_name(e.name().as_ref()) == b"response"
                    && let Some(item) = pending.take().and_then(PendingItem::finish)
                {
                    items.push(item);
                }
                field = None;
            }
            Event::Text(e) => {
                if let (Some(item), Some(f)) = (pending.as_mut(), field) {
                    let text = e.unescape().map_err(|err| {
                        SourceError::invalid_response(format!("bad text in multistatus: {}", err))
                    })?;
                    item.push(f, &text);
                }
            }
            Event::CData(e) => {
                if let (Some(item), Some(f)) = (pending.as_mut(), field) {
                    item.push(f, &String::from_utf8_lossy(&e));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(items)
}

/// Strips a namespace prefix from an element name.
fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|b| *b == b':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calevents_core::TimeWindow;

    #[test]
    fn query_body_carries_the_window() {
        let query =
            TimeRangeQuery::new(TimeWindow::from_unix(1_700_000_000, 1_700_003_600).unwrap());
        let body = calendar_query_body(&query).unwrap();

        assert!(body.starts_with("<c:calendar-query"));
        assert!(body.contains(r#"xmlns:c="urn:ietf:params:xml:ns:caldav""#));
        assert!(body.contains(r#"<c:comp-filter name="VCALENDAR"><c:comp-filter name="VEVENT">"#));
        assert!(body.contains(r#"<c:time-range start="20231114T221320Z" end="20231114T231320Z"/>"#));
        assert!(body.ends_with("</c:filter></c:calendar-query>"));
    }

    #[test]
    fn parses_report_items() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<d:multistatus xmlns:d="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <d:response>
    <d:href>/cal/work/standup.ics</d:href>
    <d:propstat>
      <d:prop>
        <d:getetag>"abc123"</d:getetag>
        <C:calendar-data>BEGIN:VCALENDAR
VERSION:2.0
BEGIN:VEVENT
UID:standup@example.com
DTSTART:20231114T220000Z
SUMMARY:Standup &amp; coffee
END:VEVENT
END:VCALENDAR</C:calendar-data>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
  <d:response>
    <d:href>/cal/work/gone.ics</d:href>
    <d:propstat>
      <d:prop><d:getetag/><C:calendar-data/></d:prop>
      <d:status>HTTP/1.1 404 Not Found</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;

        let items = parse_report_response(xml).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].href, "/cal/work/standup.ics");
        assert_eq!(items[0].etag.as_deref(), Some("abc123"));
        assert!(items[0].calendar_data.contains("SUMMARY:Standup & coffee"));
    }

    #[test]
    fn cdata_calendar_data() {
        let xml = "<multistatus xmlns=\"DAV:\"><response><href>/a.ics</href><propstat><prop>\
                   <calendar-data><![CDATA[BEGIN:VEVENT\nSUMMARY:A\nEND:VEVENT]]></calendar-data>\
                   </prop></propstat></response></multistatus>";

        let items = parse_report_response(xml).unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].etag.is_none());
        assert!(items[0].calendar_data.contains("SUMMARY:A"));
    }

    #[test]
    fn empty_multistatus() {
        let xml = r#"<d:multistatus xmlns:d="DAV:"></d:multistatus>"#;
        assert!(parse_report_response(xml).unwrap().is_empty());
    }

    #[test]
    fn malformed_reply_is_an_error() {
        let xml = "<d:multistatus><d:response></d:multistatus>";
        assert!(parse_report_response(xml).is_err());
    }

    #[test]
    fn local_names() {
        assert_eq!(local_name(b"d:href"), b"href");
        assert_eq!(local_name(b"href"), b"href");
    }
}
