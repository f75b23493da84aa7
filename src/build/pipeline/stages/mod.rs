//! Build graph stages.
//!
//! The site graph is made of:
//!
//! 1. **FileReader** - Source: load one file from the input directory
//! 2. **PostParser** - Split a post into metadata and rendered HTML
//! 3. **TemplateStage** - Render records with a template that may arrive late
//! 4. **Aggregator** - Collect all posts into one sorted listing record
//! 5. **FileWriter** - Sink: write a record to the output directory

mod aggregate;
mod post;
mod read;
mod template;
mod write;

pub use aggregate::{Aggregator, Seed, by_date_descending};
pub use post::{PostError, PostParser};
pub use read::{FileReader, list_files, read_directory};
pub use template::{TemplateInput, TemplateStage};
pub use write::FileWriter;
