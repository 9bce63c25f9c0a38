//! Optional external documents: the free-text knowledge base and the
//! structured JSON profile record.
//!
//! Both are re-read once per render cycle. A missing file is not an error.
//! A file that exists but cannot be used yields a [`DocumentError`] that the
//! caller reports as a warning while substituting empty content.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Default knowledge-base ceiling, in characters.
pub const DEFAULT_KNOWLEDGE_BASE_MAX_CHARS: usize = 15_000;

/// A document exists but could not be used.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The file could not be read (permissions, invalid UTF-8, ...).
    #[error("could not read {}: {source}", path.display())]
    Read {
        /// Offending file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The structured profile is not valid JSON.
    #[error("could not parse {}: {source}", path.display())]
    Parse {
        /// Offending file.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// The structured profile is valid JSON but not an object.
    #[error("{} must contain a JSON object", path.display())]
    NotAnObject {
        /// Offending file.
        path: PathBuf,
    },
}

/// Truncate `text` to at most `max_chars` characters.
///
/// Shorter text is returned unchanged, so re-truncation is idempotent.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Load the knowledge base, truncated to `max_chars`.
///
/// Returns `Ok(None)` when the file does not exist or is blank.
///
/// # Errors
///
/// Returns [`DocumentError::Read`] when the file exists but cannot be read.
pub fn load_knowledge_base(path: &Path, max_chars: usize) -> Result<Option<String>, DocumentError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no knowledge base file");
            return Ok(None);
        }
        Err(source) => {
            return Err(DocumentError::Read {
                path: path.to_owned(),
                source,
            })
        }
    };

    if text.trim().is_empty() {
        return Ok(None);
    }

    let truncated = truncate_chars(&text, max_chars);
    if truncated.len() < text.len() {
        debug!(path = %path.display(), max_chars, "knowledge base truncated");
    }
    Ok(Some(truncated.to_owned()))
}

/// Load the structured profile record.
///
/// Returns `Ok(None)` when the file does not exist.
///
/// # Errors
///
/// Returns a [`DocumentError`] when the file exists but is unreadable, is not
/// JSON, or is not a JSON object.
pub fn load_structured_profile(path: &Path) -> Result<Option<Map<String, Value>>, DocumentError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no structured profile file");
            return Ok(None);
        }
        Err(source) => {
            return Err(DocumentError::Read {
                path: path.to_owned(),
                source,
            })
        }
    };

    let value: Value = serde_json::from_str(&text).map_err(|source| DocumentError::Parse {
        path: path.to_owned(),
        source,
    })?;

    match value {
        Value::Object(map) => Ok(Some(map)),
        _ => Err(DocumentError::NotAnObject {
            path: path.to_owned(),
        }),
    }
}

/// Where the optional documents live, and how much knowledge base to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSources {
    /// Knowledge-base text file (e.g. `kb.md`).
    pub knowledge_base: Option<PathBuf>,
    /// Structured profile JSON file (e.g. `profile.json`).
    pub structured_profile: Option<PathBuf>,
    /// Knowledge-base ceiling in characters.
    pub knowledge_base_max_chars: usize,
}

impl Default for DocumentSources {
    fn default() -> Self {
        Self {
            knowledge_base: None,
            structured_profile: None,
            knowledge_base_max_chars: DEFAULT_KNOWLEDGE_BASE_MAX_CHARS,
        }
    }
}

/// Result of one load pass over [`DocumentSources`].
#[derive(Debug, Default)]
pub struct LoadedDocuments {
    /// Truncated knowledge-base text, if any.
    pub knowledge_base: Option<String>,
    /// Structured record; an empty map when the document was malformed.
    pub record: Option<Map<String, Value>>,
    /// Non-fatal problems encountered while loading.
    pub warnings: Vec<DocumentError>,
}

impl DocumentSources {
    /// Read every configured document, downgrading failures to warnings.
    pub fn load(&self) -> LoadedDocuments {
        let mut loaded = LoadedDocuments::default();

        if let Some(path) = &self.knowledge_base {
            match load_knowledge_base(path, self.knowledge_base_max_chars) {
                Ok(kb) => loaded.knowledge_base = kb,
                Err(e) => {
                    warn!(error = %e, "knowledge base unavailable");
                    loaded.warnings.push(e);
                }
            }
        }

        if let Some(path) = &self.structured_profile {
            match load_structured_profile(path) {
                Ok(record) => loaded.record = record,
                Err(e) => {
                    warn!(error = %e, "structured profile malformed, using an empty record");
                    loaded.record = Some(Map::new());
                    loaded.warnings.push(e);
                }
            }
        }

        loaded
    }
}
