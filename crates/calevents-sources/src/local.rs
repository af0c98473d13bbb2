//! The `local` backend: an on-disk `calendar.ics` per source.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::client::{BoxFuture, CalendarClient};
use crate::component::{RawObject, occurrence, parse_components};
use crate::error::{SourceError, SourceResult};
use crate::query::TimeRangeQuery;

/// A calendar stored as a single iCalendar file.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    path: PathBuf,
}

impl LocalBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the calendar file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CalendarClient for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    fn get_object_list<'a>(
        &'a self,
        query: &'a TimeRangeQuery,
    ) -> BoxFuture<'a, SourceResult<Vec<RawObject>>> {
        Box::pin(async move {
            let content = match tokio::fs::read_to_string(&self.path).await {
                Ok(content) => content,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(path = %self.path.display(), "Calendar file does not exist");
                    return Ok(Vec::new());
                }
                Err(e) => {
                    return Err(SourceError::connection(format!(
                        "cannot read {}",
                        self.path.display()
                    ))
                    .with_cause(e));
                }
            };

            select_events(&content, query)
        })
    }
}

/// Parses a whole calendar and keeps the events the query matches.
///
/// Events without a readable start never match.
pub(crate) fn select_events(ics: &str, query: &TimeRangeQuery) -> SourceResult<Vec<RawObject>> {
    if ics.trim().is_empty() {
        return Ok(Vec::new());
    }

    let events = parse_components(ics)?;
    let total = events.len();
    let selected: Vec<RawObject> = events
        .into_iter()
        .filter(|event| occurrence(event).is_some_and(|o| query.matches(&o)))
        .map(RawObject::from)
        .collect();

    debug!(total, selected = selected.len(), "Evaluated query locally");
    Ok(selected)
}
