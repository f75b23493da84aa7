//! Pipeline error types.

use std::path::PathBuf;
use std::time::Duration;

use crate::build::markdown::MarkdownError;
use crate::build::pipeline::stages::PostError;

/// Errors that can occur while a stage operates on a record.
///
/// None of these are recovered from: the branch that raised it stops, and the
/// run driver reports it.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to list directory {path}: {source}")]
    ListDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8")]
    NotUtf8 { path: PathBuf },

    #[error("malformed post {path}: {source}")]
    Post { path: PathBuf, source: PostError },

    #[error("markdown rendering error: {0}")]
    Markdown(#[from] MarkdownError),

    #[error("failed to compile template '{name}': {source}")]
    TemplateCompile { name: String, source: tera::Error },

    #[error("failed to render {path} with template '{name}': {source}")]
    TemplateRender {
        name: String,
        path: PathBuf,
        source: tera::Error,
    },

    #[error("stage '{stage}' waited {waited:?} for its template while holding {path}")]
    TemplateTimeout {
        stage: String,
        path: PathBuf,
        waited: Duration,
    },

    #[error("stage '{stage}' has no usable template for {path}: {reason}")]
    TemplateUnavailable {
        stage: String,
        path: PathBuf,
        reason: String,
    },

    #[error("stage '{stage}' panicked: {message}")]
    Panicked { stage: String, message: String },
}
