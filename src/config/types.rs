//! Configuration type definitions.
//!
//! This module contains the data structures used in `sitepipe.yaml`.
//! These types are pure data - no I/O or complex logic.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// =============================================================================
// Site configuration
// =============================================================================

/// The whole site configuration.
///
/// Every field has a default, so an empty (or missing) config file describes
/// the conventional layout:
///
/// ```yaml
/// input: .
/// output: _site
/// layout:
///   posts: posts
///   templates: templates
///   static_dirs: [static, images]
/// templates:
///   post: post
///   index: index
///   index_output: index.html
///   timeout_secs: 30
/// markdown:
///   extensions: [tables, autolink, strikethrough, footnotes, tasklists]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Directory holding the site sources
    #[serde(default = "default_input")]
    pub input: PathBuf,
    /// Directory the rendered site is written to
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub markdown: MarkdownConfig,
}

fn default_input() -> PathBuf {
    PathBuf::from(".")
}

fn default_output() -> PathBuf {
    PathBuf::from("_site")
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            output: default_output(),
            layout: LayoutConfig::default(),
            templates: TemplatesConfig::default(),
            markdown: MarkdownConfig::default(),
        }
    }
}

// =============================================================================
// Input layout
// =============================================================================

/// Names of the subdirectories of `input`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// One markdown document per post
    #[serde(default = "default_posts_dir")]
    pub posts: PathBuf,
    /// Template sources
    #[serde(default = "default_templates_dir")]
    pub templates: PathBuf,
    /// Directories copied byte-for-byte to the output. Missing ones are skipped.
    #[serde(default = "default_static_dirs")]
    pub static_dirs: Vec<PathBuf>,
}

fn default_posts_dir() -> PathBuf {
    PathBuf::from("posts")
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_static_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("static"), PathBuf::from("images")]
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            posts: default_posts_dir(),
            templates: default_templates_dir(),
            static_dirs: default_static_dirs(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// File stem of the template each post is rendered with
    #[serde(default = "default_post_template")]
    pub post: String,
    /// File stem of the template the post listing is rendered with
    #[serde(default = "default_index_template")]
    pub index: String,
    /// Output path of the post listing, relative to `output`
    #[serde(default = "default_index_output")]
    pub index_output: PathBuf,
    /// How long a record may wait for its template before the branch fails.
    /// `0` waits forever.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_post_template() -> String {
    "post".to_string()
}

fn default_index_template() -> String {
    "index".to_string()
}

fn default_index_output() -> PathBuf {
    PathBuf::from("index.html")
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            post: default_post_template(),
            index: default_index_template(),
            index_output: default_index_output(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl TemplatesConfig {
    /// The template wait bound, if any.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

// =============================================================================
// Markdown configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkdownConfig {
    /// Extensions to enable for markdown processing
    #[serde(default = "default_markdown_extensions")]
    pub extensions: Vec<String>,
}

fn default_markdown_extensions() -> Vec<String> {
    vec![
        "autolink".to_string(),
        "footnotes".to_string(),
        "strikethrough".to_string(),
        "tables".to_string(),
        "tasklists".to_string(),
    ]
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            extensions: default_markdown_extensions(),
        }
    }
}
