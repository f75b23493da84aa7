use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::SiteConfig;

use super::pipeline::stages::{
    Aggregator, FileReader, FileWriter, PostParser, Seed, TemplateInput, TemplateStage,
    by_date_descending, list_files, read_directory,
};
use super::pipeline::{Adapter, Graph, Node, PipelineError, RunReport};
use super::record::FileRecord;

#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("no '{name}' template found in {dir}")]
    MissingTemplate { name: String, dir: PathBuf },
}

pub struct BuildResult {
    pub output_dir: PathBuf,
    pub posts: usize,
    pub static_files: usize,
    /// What happened to every branch of the run
    pub report: RunReport,
}

/// A fully wired site graph, not yet run.
struct SiteGraph {
    graph: Graph,
    posts: usize,
    static_files: usize,
}

pub struct Builder {
    config: SiteConfig,
}

impl Builder {
    pub fn new(config: SiteConfig) -> Self {
        Self { config }
    }

    pub async fn build(&self) -> Result<BuildResult, BuildError> {
        // Build graph:
        //
        //   static/*, images/* ──read──────────────────────────────────┐
        //   templates/post.*   ──read──> [post template] ──────────────┤
        //   posts/*  ──read──> parse ──┬──> [post template] ───────────┼──> write
        //                              └──> aggregate ──> [index tpl] ─┘
        //   templates/index.*  ──read──> [index template]
        //
        // Everything is wired before any source is triggered.
        let site = self.wire().await?;
        tracing::info!(
            posts = site.posts,
            static_files = site.static_files,
            sources = site.graph.source_count(),
            "graph wired"
        );

        let report = site.graph.run().await;
        tracing::info!(
            executed = report.executed,
            failed = report.failures.len(),
            output = %self.config.output.display(),
            "build finished"
        );

        Ok(BuildResult {
            output_dir: self.config.output.clone(),
            posts: site.posts,
            static_files: site.static_files,
            report,
        })
    }

    async fn wire(&self) -> Result<SiteGraph, BuildError> {
        let input = &self.config.input;
        let layout = &self.config.layout;
        let templates = &self.config.templates;

        let mut graph = Graph::new();
        let writer = Node::new(FileWriter::new(&self.config.output));

        // Static assets are copied as-is
        let mut static_files = 0;
        for dir in &layout.static_dirs {
            if !input.join(dir).is_dir() {
                tracing::warn!(dir = %input.join(dir).display(), "static directory not found, skipping");
                continue;
            }
            for reader in read_directory(input, dir).await? {
                reader.link(&writer);
                graph.add_source(&reader);
                static_files += 1;
            }
        }

        // One template stage per logical template
        let timeout = templates.timeout();
        let post_template = Node::new(TemplateStage::new(&templates.post, timeout));
        let index_template = Node::new(TemplateStage::new(&templates.index, timeout));
        self.wire_templates(&mut graph, &[&post_template, &index_template])
            .await?;
        post_template.link(&writer);
        index_template.link(&writer);

        // Posts fan out to their own page and to the listing
        let post_readers = read_directory(input, &layout.posts).await?;
        let posts = post_readers.len();

        let parser = Node::new(PostParser::new(self.config.markdown.clone()));
        let listing = Node::new(
            Aggregator::new(posts, FileRecord::new(input, &templates.index_output))
                .with_order(by_date_descending),
        );
        tracing::debug!(
            expected = listing.pipe().expected(),
            output = %templates.index_output.display(),
            "listing waits for every post"
        );
        parser.link(&Adapter::new(&post_template, TemplateInput::Data));
        parser.link(&listing);
        for reader in &post_readers {
            reader.link(&parser);
            graph.add_source(reader);
        }

        let index_data = Adapter::new(&index_template, TemplateInput::Data);
        listing.link(&index_data);
        if posts == 0 {
            // No post can ever complete the batch, so emit the empty listing
            // as soon as the run starts.
            let seed = Node::new(Seed::new(listing.pipe().empty_batch()));
            seed.link(&index_data);
            graph.add_source(&seed);
        }

        Ok(SiteGraph {
            graph,
            posts,
            static_files,
        })
    }

    /// Route each template file to the stage whose label matches its file
    /// stem. Files without a matching stage are not read.
    async fn wire_templates(
        &self,
        graph: &mut Graph,
        stages: &[&Arc<Node<TemplateStage>>],
    ) -> Result<(), BuildError> {
        let input = &self.config.input;
        let templates_dir = &self.config.layout.templates;
        let files = list_files(input, templates_dir).await?;

        for stage in stages {
            let label = stage.pipe().label();
            let mut matching = files
                .iter()
                .filter(|path| path.parent() == Some(templates_dir.as_path()))
                .filter(|path| file_stem(path) == Some(label));

            let Some(path) = matching.next() else {
                return Err(BuildError::MissingTemplate {
                    name: label.to_string(),
                    dir: input.join(templates_dir),
                });
            };
            if let Some(ignored) = matching.next() {
                tracing::warn!(
                    template = label,
                    using = %path.display(),
                    ignored = %ignored.display(),
                    "more than one template with this name"
                );
            }

            let reader = Node::new(FileReader::new(input, path));
            reader.link(&Adapter::new(*stage, TemplateInput::Template));
            graph.add_source(&reader);
        }

        for path in &files {
            let used = stages
                .iter()
                .any(|stage| file_stem(path) == Some(stage.pipe().label()));
            if !used {
                tracing::debug!(path = %path.display(), "template not used by any stage");
            }
        }

        Ok(())
    }
}

fn file_stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}
