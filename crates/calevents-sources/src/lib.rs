//! Calendar sources: registry, backends and event collection.
//!
//! - [`SourceRegistry`] - the `*.source` key files of the data service
//! - [`Connector`] / [`CalendarClient`] - opening a source and querying it
//! - [`collect_events`] - the sequential per-source loop producing records
//! - [`SourceError`] - per-source failures
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  SourceRegistry  │  list_sources("Calendar")
//! └────────┬─────────┘
//!          │ Source
//!          ▼
//! ┌──────────────────┐   local / caldav / webcal
//! │ BackendConnector │──────────────────────────┐
//! └────────┬─────────┘                          │
//!          │ Box<dyn CalendarClient>            │
//!          ▼                                    │
//! ┌──────────────────┐                          │
//! │  get_object_list │  TimeRangeQuery ◄────────┘
//! └────────┬─────────┘
//!          │ RawObject
//!          ▼ extract_event()
//!   ┌─────────────┐
//!   │ EventRecord │
//!   └─────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use calevents_sources::{BackendConnector, SourceRegistry, collect_events};
//!
//! let registry = SourceRegistry::load(&dirs)?;
//! let records = collect_events(&registry, &window, &BackendConnector::new()).await;
//! ```

pub mod client;
pub mod collect;
pub mod component;
#[cfg(feature = "dav")]
pub mod dav;
pub mod error;
pub mod extract;
pub mod keyfile;
pub mod local;
pub mod query;
pub mod registry;
pub mod source;

pub use client::{
    Account, BackendConnector, BoxFuture, CalendarClient, Connector, DEFAULT_CONNECT_TIMEOUT,
    SYSTEM_CALENDAR_UID,
};
pub use collect::collect_events;
pub use component::RawObject;
pub use error::{SourceError, SourceErrorCode, SourceResult};
pub use extract::{ExtractError, extract_event};
pub use keyfile::{KeyFile, KeyFileError};
pub use local::LocalBackend;
pub use query::{Occurrence, TimeRangeQuery};
pub use registry::{SourceRegistry, default_calendar_data_dir, default_sources_dir};
pub use source::{EXTENSION_CALENDAR, RemoteLocation, Source};
