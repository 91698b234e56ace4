//! Parse a local content file

use anyhow::{Context, Result};
use serde_json::json;
use std::fs;
use std::path::Path;

use crate::content::{MarkdownRenderer, ParsedDocument};

/// Parse `path` and describe it as JSON; with `html` the body is rendered
pub fn describe(path: &Path, html: bool) -> Result<serde_json::Value> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let doc = ParsedDocument::parse(&text);

    if html {
        let rendered = MarkdownRenderer::new().render(&doc.body);
        Ok(json!({ "frontmatter": doc.frontmatter, "html": rendered }))
    } else {
        Ok(serde_json::to_value(&doc)?)
    }
}

/// Print the parsed document
pub fn run(path: &Path, html: bool) -> Result<()> {
    let value = describe(path, html)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
