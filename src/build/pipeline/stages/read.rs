//! File reading stage and source directory enumeration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::build::pipeline::{Node, Pipe, PipelineError};
use crate::build::record::{Content, FileRecord};

/// Source stage that loads one file from disk.
///
/// Takes no input; when triggered it reads the file its record points at and
/// emits the record with `Content::Bytes`.
pub struct FileReader {
    record: FileRecord,
}

impl FileReader {
    pub fn new(root: impl Into<PathBuf>, relative_path: impl AsRef<Path>) -> Self {
        Self {
            record: FileRecord::new(root, relative_path),
        }
    }

    /// The record this reader will emit (without content).
    #[cfg(test)]
    pub fn record(&self) -> &FileRecord {
        &self.record
    }
}

#[async_trait]
impl Pipe for FileReader {
    type Input = ();
    type Output = FileRecord;

    fn name(&self) -> &'static str {
        "read"
    }

    async fn operate(&self, _: ()) -> Result<Option<FileRecord>, PipelineError> {
        let mut record = self.record.clone();
        let path = record.path();

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| PipelineError::Read {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "read file");

        record.content = Content::Bytes(bytes);
        Ok(Some(record))
    }
}

/// List every file below `root/subdir`, recursively.
///
/// Hidden entries (names starting with `.`) are skipped, along with
/// everything below a hidden directory.
///
/// Paths are returned relative to `root` (so they start with `subdir`) and
/// sorted, so graphs are always wired in the same order.
pub async fn list_files(root: &Path, subdir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files = Vec::new();
    let mut pending = vec![subdir.to_path_buf()];

    while let Some(relative_dir) = pending.pop() {
        let dir = root.join(&relative_dir);
        let list_error = |source| PipelineError::ListDir {
            path: dir.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&dir).await.map_err(list_error)?;
        while let Some(entry) = entries.next_entry().await.map_err(list_error)? {
            let file_name = entry.file_name();

            // Skip hidden files and directories
            if file_name.to_string_lossy().starts_with('.') {
                tracing::trace!(
                    dir = %dir.display(),
                    name = %file_name.to_string_lossy(),
                    "skipping hidden entry"
                );
                continue;
            }

            let relative_path = relative_dir.join(&file_name);
            let file_type = entry.file_type().await.map_err(list_error)?;
            if file_type.is_dir() {
                pending.push(relative_path);
            } else {
                files.push(relative_path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Create one reader node per file below `root/subdir`.
///
/// An empty directory yields no readers.
pub async fn read_directory(
    root: &Path,
    subdir: &Path,
) -> Result<Vec<Arc<Node<FileReader>>>, PipelineError> {
    let files = list_files(root, subdir).await?;
    tracing::debug!(dir = %root.join(subdir).display(), files = files.len(), "discovered files");

    Ok(files
        .into_iter()
        .map(|relative_path| Node::new(FileReader::new(root, relative_path)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reader_loads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("static")).unwrap();
        std::fs::write(dir.path().join("static/logo.bin"), [0u8, 159, 146, 150]).unwrap();

        let reader = FileReader::new(dir.path(), "static/logo.bin");
        let record = reader.operate(()).await.unwrap().unwrap();

        assert_eq!(record.content, Content::Bytes(vec![0, 159, 146, 150]));
        assert_eq!(record.base_name(), "logo");
        assert_eq!(record.root_directory, dir.path());
    }

    #[tokio::test]
    async fn test_missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();

        let reader = FileReader::new(dir.path(), "posts/gone.md");
        let result = reader.operate(()).await;

        assert!(matches!(result, Err(PipelineError::Read { .. })));
    }

    #[tokio::test]
    async fn test_read_directory_is_recursive_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        std::fs::create_dir_all(images.join("2020")).unwrap();
        std::fs::write(images.join("b.png"), "b").unwrap();
        std::fs::write(images.join("a.png"), "a").unwrap();
        std::fs::write(images.join("2020/c.png"), "c").unwrap();

        let readers = read_directory(dir.path(), Path::new("images")).await.unwrap();
        let paths: Vec<_> = readers
            .iter()
            .map(|node| node.pipe().record().relative_path())
            .collect();

        assert_eq!(
            paths,
            vec![
                PathBuf::from("images/2020/c.png"),
                PathBuf::from("images/a.png"),
                PathBuf::from("images/b.png"),
            ]
        );
    }

    #[tokio::test]
    async fn test_hidden_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let posts = dir.path().join("posts");
        std::fs::create_dir_all(posts.join(".drafts")).unwrap();
        std::fs::write(posts.join("a.md"), "# A").unwrap();
        std::fs::write(posts.join(".DS_Store"), [0u8, 0xff]).unwrap();
        std::fs::write(posts.join(".drafts/b.md"), "# B").unwrap();

        let files = list_files(dir.path(), Path::new("posts")).await.unwrap();

        assert_eq!(files, vec![PathBuf::from("posts/a.md")]);
    }

    #[tokio::test]
    async fn test_empty_directory_yields_no_readers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("posts")).unwrap();

        let readers = read_directory(dir.path(), Path::new("posts")).await.unwrap();
        assert!(readers.is_empty());
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();

        let result = read_directory(dir.path(), Path::new("posts")).await;
        assert!(matches!(result, Err(PipelineError::ListDir { .. })));
    }
}
