//! Core types: event records, calendar time normalization, tracing

pub mod record;
pub mod time;
pub mod tracing;

pub use record::{
    DEFAULT_DURATION_SECS, DEFAULT_SUMMARY, EventRecord, effective_end, effective_summary,
    sort_by_start, to_json,
};
pub use time::{CalTime, TimeError, TimeWindow, format_icalendar_utc, midnight_in};
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
