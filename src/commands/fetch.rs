//! Fetch a content fragment through the configured source

use anyhow::{anyhow, Result};

use crate::Site;

/// Fetch `path` and print it as JSON. Markdown documents are printed with
/// their front-matter split off unless `json` is set.
pub async fn run(site: &Site, path: &str, json: bool) -> Result<()> {
    let loader = site.content_loader()?;

    let value = if json {
        loader.fetch_json::<serde_json::Value>(path).await?
    } else {
        let doc = loader
            .load_page(path)
            .await
            .ok_or_else(|| anyhow!("Could not load {}", path))?;
        serde_json::to_value(doc)?
    };

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
