//! The per-source collection loop.

use calevents_core::{EventRecord, TimeWindow, sort_by_start};
use icalendar::Component;
use tracing::{debug, info, warn};

use crate::client::Connector;
use crate::error::SourceResult;
use crate::extract::extract_event;
use crate::query::TimeRangeQuery;
use crate::registry::SourceRegistry;
use crate::source::{EXTENSION_CALENDAR, Source};

/// How often per-source progress is logged, in processed events.
const PROGRESS_INTERVAL: usize = 10;

/// Queries every enabled calendar source for events in `window`.
///
/// Sources are processed one after another. A source that fails to connect
/// or answer is logged and skipped, as is any event without a usable start.
/// The result is sorted by start time; ties keep discovery order.
pub async fn collect_events(
    registry: &SourceRegistry,
    window: &TimeWindow,
    connector: &dyn Connector,
) -> Vec<EventRecord> {
    let sources = registry.list_sources(EXTENSION_CALENDAR);
    info!(count = sources.len(), "Found calendar sources");

    let query = TimeRangeQuery::new(window.clone());
    let mut records = Vec::new();

    for source in sources {
        let calendar = source.display_name();
        if !source.is_enabled() {
            info!(calendar, "Skipping disabled calendar");
            continue;
        }

        info!(calendar, uid = %source.uid(), "Processing calendar");
        match collect_source(source, &query, connector, &mut records).await {
            Ok(found) => info!(calendar, count = found, "Finished processing calendar"),
            Err(e) => warn!(calendar, error = %e, "Calendar failed"),
        }
    }

    info!(total = records.len(), "Sorting events");
    sort_by_start(&mut records);
    records
}

/// Appends the events of one source to `records`, returning how many were
/// added.
async fn collect_source(
    source: &Source,
    query: &TimeRangeQuery,
    connector: &dyn Connector,
    records: &mut Vec<EventRecord>,
) -> SourceResult<usize> {
    let calendar = source.display_name();

    debug!(calendar, "Connecting");
    let client = connector.connect(source).await?;
    info!(calendar, backend = client.name(), "Connected");

    debug!(calendar, query = %query, "Getting object list");
    let objects = client
        .get_object_list(query)
        .await
        .map_err(|e| e.with_source_uid(source.uid()))?;
    debug!(calendar, count = objects.len(), "Got object list");

    if objects.is_empty() {
        info!(calendar, "No events found");
        return Ok(0);
    }

    let before = records.len();
    let mut processed = 0usize;
    for (index, object) in objects.into_iter().enumerate() {
        let events = match object.resolve() {
            Ok(events) => events,
            Err(e) => {
                warn!(calendar, index, error = %e, "Error processing object");
                continue;
            }
        };

        for event in &events {
            match extract_event(event, calendar) {
                Ok(record) => records.push(record),
                Err(e) => debug!(calendar, index, uid = ?event.get_uid(), error = %e, "Skipping event"),
            }

            processed += 1;
            if processed % PROGRESS_INTERVAL == 0 {
                debug!(calendar, processed, "Processed events");
            }
        }
    }

    Ok(records.len() - before)
}
