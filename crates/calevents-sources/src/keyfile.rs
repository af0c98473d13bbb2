//! GLib key file parsing.
//!
//! Registry entries are stored as GLib key files:
//!
//! ```text
//! # comment
//! [Data Source]
//! DisplayName=Personal
//! DisplayName[de]=Persönlich
//! Enabled=true
//!
//! [Calendar]
//! BackendName=local
//! ```
//!
//! Localized keys are skipped; only the untranslated value is kept.

use std::collections::BTreeMap;

use thiserror::Error;

/// Errors produced while parsing a key file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyFileError {
    /// A key/value line appeared before any `[Group]` header.
    #[error("line {line}: key outside of any group")]
    KeyOutsideGroup { line: usize },

    /// A group header is not terminated by `]` or is empty.
    #[error("line {line}: malformed group header")]
    MalformedGroup { line: usize },

    /// A line is neither a comment, a group header, nor `key=value`.
    #[error("line {line}: expected `key=value`")]
    MalformedEntry { line: usize },

    /// A value used an escape sequence GLib does not define.
    #[error("line {line}: invalid escape sequence `\\{escape}`")]
    InvalidEscape { line: usize, escape: char },
}

/// A parsed key file: groups of `key=value` entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyFile {
    groups: BTreeMap<String, BTreeMap<String, String>>,
}

impl KeyFile {
    /// Parses key file content.
    pub fn parse(content: &str) -> Result<Self, KeyFileError> {
        let mut groups: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        let mut current: Option<String> = None;

        for (idx, raw_line) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim_start();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let name = header
                    .trim_end()
                    .strip_suffix(']')
                    .filter(|name| !name.is_empty())
                    .ok_or(KeyFileError::MalformedGroup { line: line_no })?;
                groups.entry(name.to_string()).or_default();
                current = Some(name.to_string());
                continue;
            }

            let (key, value) = line
                .split_once('=')
                .ok_or(KeyFileError::MalformedEntry { line: line_no })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(KeyFileError::MalformedEntry { line: line_no });
            }

            let group = current
                .as_ref()
                .ok_or(KeyFileError::KeyOutsideGroup { line: line_no })?;

            // Translations such as `DisplayName[de]`
            if key.ends_with(']') && key.contains('[') {
                continue;
            }

            let value = unescape(value.trim_start(), line_no)?;
            groups
                .entry(group.clone())
                .or_default()
                .insert(key.to_string(), value);
        }

        Ok(Self { groups })
    }

    /// Returns true if the group exists (even when empty).
    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    /// Returns the group names in sorted order.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Returns a raw string value.
    pub fn get(&self, group: &str, key: &str) -> Option<&str> {
        self.groups.get(group)?.get(key).map(String::as_str)
    }

    /// Returns a string value, treating an empty value as absent.
    pub fn get_non_empty(&self, group: &str, key: &str) -> Option<&str> {
        self.get(group, key).filter(|v| !v.trim().is_empty())
    }

    /// Returns a boolean value. Anything other than `true`/`false` is absent.
    pub fn get_bool(&self, group: &str, key: &str) -> Option<bool> {
        match self.get(group, key)?.trim() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    /// Returns an unsigned integer value.
    pub fn get_u16(&self, group: &str, key: &str) -> Option<u16> {
        self.get(group, key)?.trim().parse().ok()
    }
}

fn unescape(value: &str, line: usize) -> Result<String, KeyFileError> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('s') => out.push(' '),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            // A trailing backslash is kept literally.
            None => out.push('\\'),
            Some(other) => return Err(KeyFileError::InvalidEscape { line, escape: other }),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "\
# Written by evolution-source-registry
[Data Source]
DisplayName=Team\\sCalendar
DisplayName[fi]=Tiimin kalenteri
Enabled=false
Parent=caldav-stub

[Calendar]
BackendName=caldav
Color=#62a0ea

[Authentication]
Port=8443
";

    #[test]
    fn parses_groups_and_values() {
        let kf = KeyFile::parse(SOURCE).unwrap();

        assert!(kf.has_group("Data Source"));
        assert!(kf.has_group("Calendar"));
        assert!(!kf.has_group("Address Book"));
        assert_eq!(kf.get("Data Source", "DisplayName"), Some("Team Calendar"));
        assert_eq!(kf.get("Calendar", "BackendName"), Some("caldav"));
        assert_eq!(kf.get("Calendar", "Color"), Some("#62a0ea"));
        assert_eq!(kf.get("Data Source", "Missing"), None);
    }

    #[test]
    fn localized_keys_are_ignored() {
        let kf = KeyFile::parse(SOURCE).unwrap();
        assert_eq!(kf.get("Data Source", "DisplayName[fi]"), None);
        assert_eq!(kf.get("Data Source", "DisplayName"), Some("Team Calendar"));
    }

    #[test]
    fn typed_getters() {
        let kf = KeyFile::parse(SOURCE).unwrap();
        assert_eq!(kf.get_bool("Data Source", "Enabled"), Some(false));
        assert_eq!(kf.get_bool("Calendar", "Color"), None);
        assert_eq!(kf.get_u16("Authentication", "Port"), Some(8443));
    }

    #[test]
    fn empty_groups_are_kept() {
        let kf = KeyFile::parse("[Calendar]\n").unwrap();
        assert!(kf.has_group("Calendar"));
        assert_eq!(kf.groups().collect::<Vec<_>>(), ["Calendar"]);
    }

    #[test]
    fn empty_values_are_absent_for_get_non_empty() {
        let kf = KeyFile::parse("[WebDAV Backend]\nResourceQuery=\n").unwrap();
        assert_eq!(kf.get("WebDAV Backend", "ResourceQuery"), Some(""));
        assert_eq!(kf.get_non_empty("WebDAV Backend", "ResourceQuery"), None);
    }

    #[test]
    fn escapes() {
        let kf = KeyFile::parse("[G]\nA=one\\ttwo\\nthree\\\\\n").unwrap();
        assert_eq!(kf.get("G", "A"), Some("one\ttwo\nthree\\"));
    }

    #[test]
    fn invalid_escape_is_an_error() {
        let err = KeyFile::parse("[G]\nA=\\q\n").unwrap_err();
        assert_eq!(err, KeyFileError::InvalidEscape { line: 2, escape: 'q' });
    }

    #[test]
    fn key_outside_group_is_an_error() {
        let err = KeyFile::parse("Enabled=true\n").unwrap_err();
        assert_eq!(err, KeyFileError::KeyOutsideGroup { line: 1 });
    }

    #[test]
    fn malformed_lines_are_errors() {
        assert_eq!(
            KeyFile::parse("[Data Source\n").unwrap_err(),
            KeyFileError::MalformedGroup { line: 1 }
        );
        assert_eq!(
            KeyFile::parse("[G]\njust text\n").unwrap_err(),
            KeyFileError::MalformedEntry { line: 2 }
        );
    }
}
