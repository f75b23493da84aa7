//! File writing stage.
//!
//! Writes record content to the output directory.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::build::pipeline::{Pipe, PipelineError};
use crate::build::record::FileRecord;

/// Terminal stage that writes each record below the output root.
///
/// The record's `root_directory` is switched to the output root and its
/// content is written verbatim to the resulting path, creating any missing
/// parent directories. Emits nothing.
pub struct FileWriter {
    output_root: PathBuf,
}

impl FileWriter {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }
}

#[async_trait]
impl Pipe for FileWriter {
    type Input = FileRecord;
    type Output = FileRecord;

    fn name(&self) -> &'static str {
        "write"
    }

    async fn operate(&self, mut record: FileRecord) -> Result<Option<FileRecord>, PipelineError> {
        record.root_directory = self.output_root.clone();
        let output_path = record.path();

        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| PipelineError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let bytes = record.content.as_bytes();
        tokio::fs::write(&output_path, bytes)
            .await
            .map_err(|source| PipelineError::Write {
                path: output_path.clone(),
                source,
            })?;
        tracing::debug!(path = %output_path.display(), bytes = bytes.len(), "wrote file");

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::record::Content;

    #[tokio::test]
    async fn test_writes_below_output_root() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out");

        let mut record = FileRecord::new("/somewhere/else", "posts/2020/hello.html");
        record.content = Content::Text("<p>hi</p>".to_string());

        let writer = FileWriter::new(&output);
        let emitted = writer.operate(record).await.unwrap();

        assert!(emitted.is_none());
        assert_eq!(
            std::fs::read_to_string(output.join("posts/2020/hello.html")).unwrap(),
            "<p>hi</p>"
        );
    }

    #[tokio::test]
    async fn test_existing_directory_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("static")).unwrap();

        let mut record = FileRecord::new("/in", "static/a.bin");
        record.content = Content::Bytes(vec![1, 2, 3]);

        FileWriter::new(dir.path()).operate(record).await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("static/a.bin")).unwrap(), [1, 2, 3]);
    }

    #[tokio::test]
    async fn test_unwritable_destination_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the writer needs a directory
        std::fs::write(dir.path().join("posts"), "not a dir").unwrap();

        let record = FileRecord::new("/in", "posts/a.html");
        let result = FileWriter::new(dir.path()).operate(record).await;

        assert!(matches!(result, Err(PipelineError::Write { .. })));
    }
}
