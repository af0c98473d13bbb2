//! The `caldav` backend.

use tokio::sync::Mutex;
use tracing::debug;

use crate::client::{BoxFuture, CalendarClient};
use crate::component::RawObject;
use crate::error::SourceResult;
use crate::query::TimeRangeQuery;

use super::client::DavHttpClient;
use super::config::DavConfig;
use super::xml::{calendar_query_body, parse_report_response};

/// A CalDAV calendar collection.
///
/// The server evaluates the time range; each returned `calendar-data` is
/// passed on as text.
pub struct CalDavBackend {
    http: Mutex<DavHttpClient>,
}

impl CalDavBackend {
    pub fn new(config: DavConfig) -> SourceResult<Self> {
        Ok(Self {
            http: Mutex::new(DavHttpClient::new(config)?),
        })
    }
}

impl CalendarClient for CalDavBackend {
    fn name(&self) -> &str {
        "caldav"
    }

    fn get_object_list<'a>(
        &'a self,
        query: &'a TimeRangeQuery,
    ) -> BoxFuture<'a, SourceResult<Vec<RawObject>>> {
        Box::pin(async move {
            let body = calendar_query_body(query)?;
            let response = {
                let mut http = self.http.lock().await;
                debug!(url = %http.url(), "Sending calendar-query REPORT");
                http.report(&body).await?
            };

            let items = parse_report_response(&response)?;
            debug!(count = items.len(), "Received calendar objects");

            Ok(items
                .into_iter()
                .map(|item| RawObject::Text(item.calendar_data))
                .collect())
        })
    }
}
