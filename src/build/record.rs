//! The value that flows through the build graph.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

/// Extension given to documents once they have been rendered to HTML.
pub const HTML_EXTENSION: &str = "html";

/// Key under which an aggregate record exposes its batch to templates.
pub const INPUTS_KEY: &str = "inputs";

// =============================================================================
// Content
// =============================================================================

/// The payload of a record.
///
/// Readers produce `Bytes`; stages that interpret the payload as text produce
/// `Text`. Writers accept either.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Content {
    /// Nothing loaded yet (freshly discovered, or a synthetic aggregate)
    #[default]
    Empty,
    /// Raw bytes as read from disk
    Bytes(Vec<u8>),
    /// Rendered or decoded text
    Text(String),
}

impl Content {
    /// The payload as bytes, whatever its representation.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Content::Empty => &[],
            Content::Bytes(bytes) => bytes,
            Content::Text(text) => text.as_bytes(),
        }
    }

    /// The payload as UTF-8 text.
    ///
    /// Returns `None` if the payload is raw bytes that are not valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Empty => Some(""),
            Content::Bytes(bytes) => std::str::from_utf8(bytes).ok(),
            Content::Text(text) => Some(text),
        }
    }
}

impl Serialize for Content {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Content::Empty => serializer.serialize_str(""),
            Content::Bytes(bytes) => serializer.serialize_str(&String::from_utf8_lossy(bytes)),
            Content::Text(text) => serializer.serialize_str(text),
        }
    }
}

// =============================================================================
// Metadata
// =============================================================================

/// Structured facts accumulated about a record.
///
/// Every key maps to a list of strings, in the order the keys were first
/// inserted. Aggregate records additionally carry their batch of child
/// records, which templates see under `metadata.inputs` (an empty list for
/// records that are not aggregates).
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    entries: IndexMap<String, Vec<String>>,
    inputs: Vec<FileRecord>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the values for `key`, replacing any previous values but keeping
    /// the key's original position.
    pub fn insert(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.entries.insert(key.into(), values);
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// The first value for `key`, if any.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    #[cfg(test)]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Child records of an aggregate, in their final order.
    #[cfg(test)]
    pub fn inputs(&self) -> &[FileRecord] {
        &self.inputs
    }

    pub fn set_inputs(&mut self, inputs: Vec<FileRecord>) {
        self.inputs = inputs;
    }

    /// Write the entries back out as a `- key: a, b` preamble, one line per
    /// key, skipping `except` (typically the synthesized title).
    #[cfg(test)]
    pub fn to_preamble(&self, except: &[&str]) -> String {
        self.entries
            .iter()
            .filter(|(key, _)| !except.contains(&key.as_str()))
            .map(|(key, values)| format!("- {}: {}\n", key, values.join(", ")))
            .collect()
    }
}

impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let own_entries = self.entries.len() - usize::from(self.entries.contains_key(INPUTS_KEY));
        let mut map = serializer.serialize_map(Some(own_entries + 1))?;
        for (key, values) in &self.entries {
            if key != INPUTS_KEY {
                map.serialize_entry(key, values)?;
            }
        }
        // `inputs` is always present so templates can loop over it; a
        // document's own `inputs` entry shows through only when there is no
        // batch.
        match self.entries.get(INPUTS_KEY) {
            Some(values) if self.inputs.is_empty() => map.serialize_entry(INPUTS_KEY, values)?,
            _ => map.serialize_entry(INPUTS_KEY, &self.inputs)?,
        }
        map.end()
    }
}

// =============================================================================
// FileRecord
// =============================================================================

/// One logical file moving through the graph.
///
/// Path components are decomposed once, at construction. Only the extension
/// may change afterwards, when a stage changes the logical file type.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Root the relative path is joined onto. Owned by whichever boundary
    /// stage currently holds the record (input root for readers, output root
    /// for writers).
    pub root_directory: PathBuf,
    relative_directory: PathBuf,
    base_name: String,
    extension: String,
    pub content: Content,
    pub metadata: Metadata,
}

impl FileRecord {
    /// Create a record for `relative_path` under `root_directory`.
    pub fn new(root_directory: impl Into<PathBuf>, relative_path: impl AsRef<Path>) -> Self {
        let relative_path = relative_path.as_ref();
        let relative_directory = relative_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let base_name = relative_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = relative_path
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            root_directory: root_directory.into(),
            relative_directory,
            base_name,
            extension,
            content: Content::Empty,
            metadata: Metadata::new(),
        }
    }

    #[cfg(test)]
    pub fn relative_directory(&self) -> &Path {
        &self.relative_directory
    }

    #[cfg(test)]
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    #[cfg(test)]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Change the logical file type (e.g. `md` to `html`).
    pub fn set_extension(&mut self, extension: impl Into<String>) {
        self.extension = extension.into();
    }

    /// File name including the extension, if there is one.
    pub fn file_name(&self) -> String {
        if self.extension.is_empty() {
            self.base_name.clone()
        } else {
            format!("{}.{}", self.base_name, self.extension)
        }
    }

    /// Path relative to whichever root currently owns the record.
    pub fn relative_path(&self) -> PathBuf {
        self.relative_directory.join(self.file_name())
    }

    /// Full path: the current root joined with the relative path.
    pub fn path(&self) -> PathBuf {
        self.root_directory.join(self.relative_path())
    }

    /// Site-relative URL, always `/`-separated and rooted.
    pub fn url(&self) -> String {
        let mut url = String::from("/");
        for component in self.relative_directory.components() {
            url.push_str(&component.as_os_str().to_string_lossy());
            url.push('/');
        }
        url.push_str(&self.file_name());
        url
    }

    /// The document title, if a parser has set one.
    pub fn title(&self) -> Option<&str> {
        self.metadata.first("title")
    }
}

/// Shape exposed to templates.
#[derive(Serialize)]
struct RecordContext<'a> {
    root_directory: String,
    relative_directory: String,
    base_name: &'a str,
    extension: &'a str,
    path: String,
    url: String,
    content: &'a Content,
    metadata: &'a Metadata,
}

impl Serialize for FileRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let url = self.url();
        RecordContext {
            root_directory: self.root_directory.to_string_lossy().into_owned(),
            relative_directory: self
                .relative_directory
                .to_string_lossy()
                .replace('\\', "/"),
            base_name: &self.base_name,
            extension: &self.extension,
            path: url.trim_start_matches('/').to_string(),
            url,
            content: &self.content,
            metadata: &self.metadata,
        }
        .serialize(serializer)
    }
}
