//! Content module - fetches fragments and parses front-matter

mod frontmatter;
pub mod loader;
mod markdown;

pub use frontmatter::{Frontmatter, FrontmatterValue, ParsedDocument, Record};
pub use loader::{ContentError, ContentLoader, ContentSource, RenderedPage};
pub use markdown::MarkdownRenderer;
