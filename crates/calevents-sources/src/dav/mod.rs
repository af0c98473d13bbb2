//! HTTP backends: CalDAV collections and webcal feeds.
//!
//! Both share one transport ([`DavConfig`] plus a small reqwest client with
//! Basic/Digest authentication). CalDAV lets the server filter with a
//! `calendar-query` REPORT; webcal downloads the feed and filters locally.

mod auth;
mod caldav;
mod client;
mod config;
mod webcal;
mod xml;

pub use caldav::CalDavBackend;
pub use config::{DavConfig, webcal_to_https};
pub use webcal::WebcalBackend;
