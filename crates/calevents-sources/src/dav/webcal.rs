//! The `webcal` backend: a published `.ics` feed.

use tokio::sync::Mutex;
use tracing::debug;

use crate::client::{BoxFuture, CalendarClient};
use crate::component::RawObject;
use crate::error::SourceResult;
use crate::local::select_events;
use crate::query::TimeRangeQuery;

use super::client::DavHttpClient;
use super::config::DavConfig;

/// A subscribed calendar feed. The whole feed is downloaded on every query
/// and filtered locally.
pub struct WebcalBackend {
    http: Mutex<DavHttpClient>,
}

impl WebcalBackend {
    pub fn new(config: DavConfig) -> SourceResult<Self> {
        Ok(Self {
            http: Mutex::new(DavHttpClient::new(config)?),
        })
    }
}

impl CalendarClient for WebcalBackend {
    fn name(&self) -> &str {
        "webcal"
    }

    fn get_object_list<'a>(
        &'a self,
        query: &'a TimeRangeQuery,
    ) -> BoxFuture<'a, SourceResult<Vec<RawObject>>> {
        Box::pin(async move {
            let feed = {
                let mut http = self.http.lock().await;
                debug!(url = %http.url(), "Downloading calendar feed");
                http.get().await?
            };
            debug!(bytes = feed.len(), "Downloaded calendar feed");

            select_events(&feed, query)
        })
    }
}
