mod builder;
mod markdown;
pub mod pipeline;
pub mod record;

pub use builder::Builder;
pub use markdown::{MarkdownError, validate_config as validate_markdown_config};
