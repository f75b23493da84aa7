//! Template rendering stage.
//!
//! Each stage instance owns one logical template (e.g. the post page or the
//! listing page). Records can reach the stage before its template has been
//! read; they wait until it is compiled instead of being dropped.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tera::{Context, Tera};
use tokio::sync::watch;

use crate::build::pipeline::{Pipe, PipelineError};
use crate::build::record::{Content, FileRecord};

/// What a template stage receives.
#[derive(Debug, Clone)]
pub enum TemplateInput {
    /// Template source to compile (replaces any previous one)
    Template(FileRecord),
    /// A record to render with the template
    Data(FileRecord),
}

/// A compiled template, ready to render records.
pub struct CompiledTemplate {
    name: String,
    tera: Tera,
}

impl CompiledTemplate {
    /// Compile `source` under `name`.
    ///
    /// Names ending in `.html` get tera's HTML autoescaping, so pre-rendered
    /// markup must be output with `| safe`.
    pub fn compile(name: &str, source: &str) -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_template(name, source)?;
        Ok(Self {
            name: name.to_string(),
            tera,
        })
    }

    /// Render with the record itself as the context, so templates can use
    /// `metadata`, `content`, `url` and the other record fields by name.
    pub fn render(&self, record: &FileRecord) -> Result<String, tera::Error> {
        let context = Context::from_serialize(record)?;
        self.tera.render(&self.name, &context)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Where a template stage is in its lifecycle.
#[derive(Clone, Default)]
enum Readiness {
    /// No template source has been received yet
    #[default]
    Awaiting,
    Ready(Arc<CompiledTemplate>),
    /// The latest template source could not be used
    Failed(String),
}

/// Stage that renders data records with a template that arrives separately.
///
/// Starts out awaiting its template. A `Template` input compiles and stores
/// the template and emits nothing; from then on the stage is ready. A `Data`
/// input waits until the stage is ready (bounded by the optional timeout),
/// then renders the record, stores the result as its content and emits it.
///
/// The latest template input always wins. If it fails to compile, the stage
/// is marked failed and data records waiting on it (or arriving later) fail
/// straight away instead of waiting for a template that is not coming. A
/// later template that compiles makes the stage ready again.
pub struct TemplateStage {
    label: String,
    readiness: watch::Sender<Readiness>,
    timeout: Option<Duration>,
}

impl TemplateStage {
    pub fn new(label: impl Into<String>, timeout: Option<Duration>) -> Self {
        let (readiness, _) = watch::channel(Readiness::Awaiting);
        Self {
            label: label.into(),
            readiness,
            timeout,
        }
    }

    /// The logical template this stage renders with (e.g. `post`).
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.readiness.borrow(), Readiness::Ready(_))
    }

    fn install(&self, record: &FileRecord) -> Result<(), PipelineError> {
        let name = record.file_name();
        let compiled = match record.content.as_text() {
            Some(source) => CompiledTemplate::compile(&name, source).map_err(|source| {
                PipelineError::TemplateCompile {
                    name: name.clone(),
                    source,
                }
            }),
            None => Err(PipelineError::NotUtf8 {
                path: record.path(),
            }),
        };

        let template = match compiled {
            Ok(template) => template,
            Err(error) => {
                self.readiness.send_replace(Readiness::Failed(error.to_string()));
                return Err(error);
            }
        };

        let previous = self
            .readiness
            .send_replace(Readiness::Ready(Arc::new(template)));
        if matches!(previous, Readiness::Awaiting) {
            tracing::debug!(template = %self.label, %name, "template ready");
        } else {
            tracing::warn!(template = %self.label, %name, "template replaced");
        }
        Ok(())
    }

    async fn ready_template(&self, path: PathBuf) -> Result<Arc<CompiledTemplate>, PipelineError> {
        let mut readiness = self.readiness.subscribe();
        let wait = async move {
            readiness
                .wait_for(|state| !matches!(state, Readiness::Awaiting))
                .await
                .map(|state| (*state).clone())
                .unwrap_or_default()
        };

        let state = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, wait).await.map_err(|_| {
                PipelineError::TemplateTimeout {
                    stage: self.label.clone(),
                    path: path.clone(),
                    waited: limit,
                }
            })?,
            None => wait.await,
        };

        match state {
            Readiness::Ready(template) => Ok(template),
            Readiness::Failed(reason) => Err(PipelineError::TemplateUnavailable {
                stage: self.label.clone(),
                path,
                reason,
            }),
            // The sender lives as long as the stage, so the wait only ends
            // while still awaiting if the channel is gone.
            Readiness::Awaiting => Err(PipelineError::TemplateUnavailable {
                stage: self.label.clone(),
                path,
                reason: "template stage shut down".to_string(),
            }),
        }
    }
}

#[async_trait]
impl Pipe for TemplateStage {
    type Input = TemplateInput;
    type Output = FileRecord;

    fn name(&self) -> &'static str {
        "template"
    }

    async fn operate(&self, input: TemplateInput) -> Result<Option<FileRecord>, PipelineError> {
        let mut record = match input {
            TemplateInput::Template(record) => {
                self.install(&record)?;
                return Ok(None);
            }
            TemplateInput::Data(record) => record,
        };

        if !self.is_ready() {
            tracing::debug!(
                template = %self.label,
                path = %record.relative_path().display(),
                "waiting for template"
            );
        }
        let template = self.ready_template(record.path()).await?;

        let html = template
            .render(&record)
            .map_err(|source| PipelineError::TemplateRender {
                name: template.name().to_string(),
                path: record.path(),
                source,
            })?;
        record.content = Content::Text(html);

        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POST_TEMPLATE: &str =
        "<title>{{ metadata.title.0 }}</title><main>{{ content | safe }}</main>";

    fn template_record(source: &str) -> FileRecord {
        let mut record = FileRecord::new("/in", "templates/post.html");
        record.content = Content::Bytes(source.as_bytes().to_vec());
        record
    }

    fn data_record() -> FileRecord {
        let mut record = FileRecord::new("/in", "posts/hello.html");
        record.metadata.insert("title", vec!["Hello <World>".to_string()]);
        record.content = Content::Text("<h1>Hello</h1>".to_string());
        record
    }

    #[tokio::test]
    async fn test_template_input_emits_nothing() {
        let stage = TemplateStage::new("post", None);
        assert!(!stage.is_ready());

        let out = stage
            .operate(TemplateInput::Template(template_record(POST_TEMPLATE)))
            .await
            .unwrap();

        assert!(out.is_none());
        assert!(stage.is_ready());
    }

    #[tokio::test]
    async fn test_renders_record_fields_when_ready() {
        let stage = TemplateStage::new("post", None);
        stage
            .operate(TemplateInput::Template(template_record(POST_TEMPLATE)))
            .await
            .unwrap();

        let record = stage
            .operate(TemplateInput::Data(data_record()))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            record.content.as_text().unwrap(),
            "<title>Hello &lt;World&gt;</title><main><h1>Hello</h1></main>"
        );
    }

    #[tokio::test]
    async fn test_data_before_template_is_rendered_once_ready() {
        let expected = {
            let stage = TemplateStage::new("post", None);
            stage
                .operate(TemplateInput::Template(template_record(POST_TEMPLATE)))
                .await
                .unwrap();
            stage
                .operate(TemplateInput::Data(data_record()))
                .await
                .unwrap()
                .unwrap()
                .content
        };

        let stage = Arc::new(TemplateStage::new("post", None));
        let early = tokio::spawn({
            let stage = stage.clone();
            async move { stage.operate(TemplateInput::Data(data_record())).await }
        });

        // Let the data record start waiting.
        tokio::task::yield_now().await;
        assert!(!early.is_finished());
        assert!(!stage.is_ready());

        stage
            .operate(TemplateInput::Template(template_record(POST_TEMPLATE)))
            .await
            .unwrap();
        let record = early.await.unwrap().unwrap().unwrap();

        assert_eq!(record.content, expected);
    }

    #[tokio::test]
    async fn test_later_template_replaces_earlier() {
        let stage = TemplateStage::new("post", None);
        stage
            .operate(TemplateInput::Template(template_record("old")))
            .await
            .unwrap();
        stage
            .operate(TemplateInput::Template(template_record("new {{ base_name }}")))
            .await
            .unwrap();

        let record = stage
            .operate(TemplateInput::Data(data_record()))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.content.as_text(), Some("new hello"));
    }

    #[tokio::test]
    async fn test_waiting_without_template_times_out() {
        let stage = TemplateStage::new("index", Some(Duration::from_millis(20)));

        let result = stage.operate(TemplateInput::Data(data_record())).await;

        assert!(matches!(
            result,
            Err(PipelineError::TemplateTimeout { ref stage, .. }) if stage == "index"
        ));
    }

    #[tokio::test]
    async fn test_invalid_template_fails_to_compile() {
        let stage = TemplateStage::new("post", None);

        let result = stage
            .operate(TemplateInput::Template(template_record("{% if %}")))
            .await;

        assert!(matches!(result, Err(PipelineError::TemplateCompile { .. })));
        assert!(!stage.is_ready());
    }

    #[tokio::test]
    async fn test_waiting_record_fails_when_template_does_not_compile() {
        let stage = Arc::new(TemplateStage::new("post", None));
        let early = tokio::spawn({
            let stage = stage.clone();
            async move { stage.operate(TemplateInput::Data(data_record())).await }
        });
        tokio::task::yield_now().await;

        let compile = stage
            .operate(TemplateInput::Template(template_record("{% if %}")))
            .await;
        assert!(matches!(compile, Err(PipelineError::TemplateCompile { .. })));

        let result = early.await.unwrap();
        assert!(matches!(
            result,
            Err(PipelineError::TemplateUnavailable { ref stage, .. }) if stage == "post"
        ));

        let late = stage.operate(TemplateInput::Data(data_record())).await;
        assert!(matches!(late, Err(PipelineError::TemplateUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_valid_template_after_failed_one_makes_stage_ready() {
        let stage = TemplateStage::new("post", None);
        let _ = stage
            .operate(TemplateInput::Template(template_record("{% if %}")))
            .await;
        stage
            .operate(TemplateInput::Template(template_record("ok {{ base_name }}")))
            .await
            .unwrap();

        assert!(stage.is_ready());
        let record = stage
            .operate(TemplateInput::Data(data_record()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.content.as_text(), Some("ok hello"));
    }
}
