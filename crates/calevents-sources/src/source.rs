//! Calendar source definitions.
//!
//! A [`Source`] is one entry of the data service registry, loaded from a
//! `<uid>.source` key file. Only the groups this tool needs are interpreted;
//! the full key file stays available through [`Source::keyfile`].

use crate::keyfile::{KeyFile, KeyFileError};

/// Extension group marking a source as a calendar.
pub const EXTENSION_CALENDAR: &str = "Calendar";

const GROUP_DATA_SOURCE: &str = "Data Source";
const GROUP_AUTHENTICATION: &str = "Authentication";
const GROUP_SECURITY: &str = "Security";
const GROUP_WEBDAV: &str = "WebDAV Backend";

/// One registered source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    uid: String,
    display_name: String,
    enabled: bool,
    parent: Option<String>,
    keyfile: KeyFile,
}

impl Source {
    /// Builds a source from an already parsed key file.
    ///
    /// A missing `DisplayName` falls back to the UID and a missing `Enabled`
    /// key means enabled.
    pub fn from_keyfile(uid: impl Into<String>, keyfile: KeyFile) -> Self {
        let uid = uid.into();
        let display_name = keyfile
            .get_non_empty(GROUP_DATA_SOURCE, "DisplayName")
            .map(str::to_string)
            .unwrap_or_else(|| uid.clone());
        let enabled = keyfile
            .get_bool(GROUP_DATA_SOURCE, "Enabled")
            .unwrap_or(true);
        let parent = keyfile
            .get_non_empty(GROUP_DATA_SOURCE, "Parent")
            .map(str::to_string);

        Self {
            uid,
            display_name,
            enabled,
            parent,
            keyfile,
        }
    }

    /// Parses a source from key file content.
    pub fn parse(uid: impl Into<String>, content: &str) -> Result<Self, KeyFileError> {
        Ok(Self::from_keyfile(uid, KeyFile::parse(content)?))
    }

    /// The unique identifier (the file stem of the `.source` file).
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Human-readable name, used as the `calendar` field of emitted events.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Whether the source itself is enabled. Parents are not consulted.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// UID of the parent (collection) source, if any.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// The underlying key file.
    pub fn keyfile(&self) -> &KeyFile {
        &self.keyfile
    }

    /// Returns true if the source carries the given extension group.
    pub fn has_extension(&self, extension: &str) -> bool {
        self.keyfile.has_group(extension)
    }

    /// The calendar backend (`local`, `caldav`, `webcal`, ...).
    pub fn backend_name(&self) -> Option<&str> {
        self.keyfile
            .get_non_empty(EXTENSION_CALENDAR, "BackendName")
            .map(str::trim)
    }

    /// Network location of a remote calendar, as stored in the source.
    pub fn remote_location(&self) -> RemoteLocation {
        let kf = &self.keyfile;
        let owned = |group: &str, key: &str| kf.get_non_empty(group, key).map(|v| v.trim().to_string());

        RemoteLocation {
            secure: kf
                .get(GROUP_SECURITY, "Method")
                .is_none_or(|method| method.trim() != "none"),
            host: owned(GROUP_AUTHENTICATION, "Host"),
            port: kf.get_u16(GROUP_AUTHENTICATION, "Port").filter(|p| *p != 0),
            user: owned(GROUP_AUTHENTICATION, "User"),
            resource_path: owned(GROUP_WEBDAV, "ResourcePath"),
            resource_query: owned(GROUP_WEBDAV, "ResourceQuery"),
        }
    }
}

/// Where a remote calendar lives, split the way the registry stores it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteLocation {
    /// TLS unless `[Security] Method=none`.
    pub secure: bool,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub resource_path: Option<String>,
    pub resource_query: Option<String>,
}

impl RemoteLocation {
    /// Assembles the collection URL, or `None` without a host.
    pub fn url(&self) -> Option<String> {
        let host = self.host.as_deref()?;
        let scheme = if self.secure { "https" } else { "http" };
        let default_port = if self.secure { 443 } else { 80 };

        let mut url = format!("{}://{}", scheme, host);
        if let Some(port) = self.port.filter(|p| *p != default_port) {
            url.push_str(&format!(":{}", port));
        }

        match self.resource_path.as_deref() {
            Some(path) if path.starts_with('/') => url.push_str(path),
            Some(path) => {
                url.push('/');
                url.push_str(path);
            }
            None => url.push('/'),
        }

        if let Some(query) = self.resource_query.as_deref() {
            url.push('?');
            url.push_str(query.trim_start_matches('?'));
        }

        Some(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL: &str = "\
[Data Source]
DisplayName=Personal
Enabled=true
Parent=local-stub

[Calendar]
BackendName=local
";

    const CALDAV: &str = "\
[Data Source]
DisplayName=Work
Enabled=false
Parent=a1b2c3

[Calendar]
BackendName=caldav

[Authentication]
Host=dav.example.com
Port=443
User=alice

[Security]
Method=tls

[WebDAV Backend]
ResourcePath=/calendars/alice/work/
ResourceQuery=
";

    #[test]
    fn local_source_fields() {
        let source = Source::parse("system-calendar", LOCAL).unwrap();

        assert_eq!(source.uid(), "system-calendar");
        assert_eq!(source.display_name(), "Personal");
        assert!(source.is_enabled());
        assert_eq!(source.parent(), Some("local-stub"));
        assert!(source.has_extension(EXTENSION_CALENDAR));
        assert!(!source.has_extension("Address Book"));
        assert_eq!(source.backend_name(), Some("local"));
    }

    #[test]
    fn defaults_for_missing_keys() {
        let source = Source::parse("bare", "[Calendar]\n").unwrap();

        assert_eq!(source.display_name(), "bare");
        assert!(source.is_enabled());
        assert!(source.parent().is_none());
        assert!(source.backend_name().is_none());
    }

    #[test]
    fn caldav_remote_location() {
        let source = Source::parse("work", CALDAV).unwrap();
        assert!(!source.is_enabled());

        let remote = source.remote_location();
        assert!(remote.secure);
        assert_eq!(remote.host.as_deref(), Some("dav.example.com"));
        assert_eq!(remote.user.as_deref(), Some("alice"));
        assert!(remote.resource_query.is_none());
        assert_eq!(
            remote.url().as_deref(),
            Some("https://dav.example.com/calendars/alice/work/")
        );
    }

    #[test]
    fn url_with_plain_http_port_and_query() {
        let remote = RemoteLocation {
            secure: false,
            host: Some("cal.local".to_string()),
            port: Some(8080),
            user: None,
            resource_path: Some("feeds/holidays.ics".to_string()),
            resource_query: Some("?lang=fi".to_string()),
        };
        assert_eq!(
            remote.url().as_deref(),
            Some("http://cal.local:8080/feeds/holidays.ics?lang=fi")
        );
    }

    #[test]
    fn url_requires_host() {
        let source = Source::parse("system-calendar", LOCAL).unwrap();
        assert!(source.remote_location().url().is_none());
    }
}
