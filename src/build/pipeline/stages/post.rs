//! Post parsing stage.
//!
//! A post is a metadata preamble, a title line and a markdown body:
//!
//! ```markdown
//! - date: 2020-12-10
//! - tags: rust, async
//!
//! # Hello World
//!
//! Body text...
//! ```

use async_trait::async_trait;

use crate::build::markdown::render_markdown;
use crate::build::pipeline::{Pipe, PipelineError};
use crate::build::record::{Content, FileRecord, HTML_EXTENSION, Metadata};
use crate::config::MarkdownConfig;

/// Metadata key the title line is stored under.
pub const TITLE_KEY: &str = "title";

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PostError {
    #[error("line {line_number} is neither '- key: values' nor '# Title': {line:?}")]
    Malformed { line_number: usize, line: String },

    #[error("no '# Title' line found")]
    MissingTitle,
}

/// A post split into its parts.
#[derive(Debug)]
pub struct ParsedPost<'a> {
    /// Preamble entries followed by the synthesized title
    pub metadata: Metadata,
    /// Markdown from the title line (inclusive) to the end
    pub body: &'a str,
}

/// Split a post into metadata and body.
///
/// Blank lines in the preamble are skipped. The title line ends the preamble
/// and is kept as the first line of the body.
pub fn parse_post(text: &str) -> Result<ParsedPost<'_>, PostError> {
    let mut metadata = Metadata::new();
    let mut offset = 0;

    for (index, line) in text.split_inclusive('\n').enumerate() {
        let line_start = offset;
        offset += line.len();

        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.trim().is_empty() {
            continue;
        }

        if let Some(title) = trimmed.strip_prefix("# ") {
            metadata.insert(TITLE_KEY, vec![title.trim().to_string()]);
            return Ok(ParsedPost {
                metadata,
                body: &text[line_start..],
            });
        }

        match parse_metadata_line(trimmed) {
            Some((key, values)) => metadata.insert(key, values),
            None => {
                return Err(PostError::Malformed {
                    line_number: index + 1,
                    line: trimmed.to_string(),
                });
            }
        }
    }

    Err(PostError::MissingTitle)
}

/// Parse `- key: v1, v2` into the key and its trimmed values.
fn parse_metadata_line(line: &str) -> Option<(&str, Vec<String>)> {
    let entry = line.strip_prefix("- ")?;
    let (key, values) = entry.split_once(':')?;
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }

    let values = values.split(',').map(|v| v.trim().to_string()).collect();
    Some((key, values))
}

/// Stage that turns a raw post into an HTML fragment plus metadata.
///
/// After this stage, `record.content` holds the rendered body (starting with
/// the title heading), `record.metadata` holds the preamble and title, and
/// the extension is `html`.
pub struct PostParser {
    markdown: MarkdownConfig,
}

impl PostParser {
    pub fn new(markdown: MarkdownConfig) -> Self {
        Self { markdown }
    }
}

#[async_trait]
impl Pipe for PostParser {
    type Input = FileRecord;
    type Output = FileRecord;

    fn name(&self) -> &'static str {
        "post"
    }

    async fn operate(&self, mut record: FileRecord) -> Result<Option<FileRecord>, PipelineError> {
        let text = record
            .content
            .as_text()
            .ok_or_else(|| PipelineError::NotUtf8 {
                path: record.path(),
            })?;

        let parsed = parse_post(text).map_err(|source| PipelineError::Post {
            path: record.path(),
            source,
        })?;
        let html = render_markdown(parsed.body, &self.markdown)?;

        for (key, values) in parsed.metadata.iter() {
            record.metadata.insert(key, values.to_vec());
        }
        record.content = Content::Text(html);
        record.set_extension(HTML_EXTENSION);

        tracing::debug!(
            path = %record.relative_path().display(),
            title = record.title().unwrap_or_default(),
            "parsed post"
        );
        Ok(Some(record))
    }
}
