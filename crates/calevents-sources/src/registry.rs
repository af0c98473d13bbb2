//! The source registry.
//!
//! The data service persists its registry as one `<uid>.source` key file per
//! source under `$XDG_CONFIG_HOME/evolution/sources`. [`SourceRegistry`]
//! loads those files and answers "which sources carry this extension".

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{SourceError, SourceResult};
use crate::source::Source;

/// File extension of registry entries.
pub const SOURCE_FILE_EXTENSION: &str = "source";

/// Returns the per-user registry directory.
pub fn default_sources_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("evolution").join("sources"))
}

/// Returns the per-user calendar data directory used by the local backend.
pub fn default_calendar_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("evolution").join("calendar"))
}

/// All sources known to the registry, ordered by UID.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Source>,
}

impl SourceRegistry {
    /// Creates a registry from already loaded sources.
    pub fn from_sources(mut sources: Vec<Source>) -> Self {
        sources.sort_by(|a, b| a.uid().cmp(b.uid()));
        sources.dedup_by(|b, a| a.uid() == b.uid());
        Self { sources }
    }

    /// Loads every `*.source` file from the given directories.
    ///
    /// Directories are read in order and the first definition of a UID wins.
    /// A missing directory is skipped; an unreadable or malformed file is
    /// logged and skipped. Only a directory that exists but cannot be listed
    /// is an error.
    pub fn load(directories: &[PathBuf]) -> SourceResult<Self> {
        let mut sources: Vec<Source> = Vec::new();

        for dir in directories {
            for source in load_dir(dir)? {
                if sources.iter().any(|s| s.uid() == source.uid()) {
                    debug!(uid = %source.uid(), dir = %dir.display(), "Ignoring shadowed source");
                    continue;
                }
                sources.push(source);
            }
        }

        Ok(Self::from_sources(sources))
    }

    /// Returns every source carrying `extension`, enabled or not.
    pub fn list_sources(&self, extension: &str) -> Vec<&Source> {
        self.sources
            .iter()
            .filter(|source| source.has_extension(extension))
            .collect()
    }

    /// Looks up a source by UID.
    pub fn get(&self, uid: &str) -> Option<&Source> {
        self.sources.iter().find(|source| source.uid() == uid)
    }

    /// Number of sources in the registry.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns true if the registry holds no sources.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

fn load_dir(dir: &Path) -> SourceResult<Vec<Source>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "Registry directory does not exist");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(SourceError::registry(format!(
                "cannot list {}: {}",
                dir.display(),
                e
            ))
            .with_cause(e));
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == SOURCE_FILE_EXTENSION))
        .collect();
    paths.sort();

    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(uid) = path.file_stem().and_then(|stem| stem.to_str()) else {
            warn!(path = %path.display(), "Skipping source file with non UTF-8 name");
            continue;
        };

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read source file");
                continue;
            }
        };

        match Source::parse(uid, &content) {
            Ok(source) => sources.push(source),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to parse source file"),
        }
    }

    debug!(dir = %dir.display(), count = sources.len(), "Loaded registry directory");
    Ok(sources)
}
