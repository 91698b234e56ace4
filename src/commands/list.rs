//! List site content

use anyhow::Result;

use crate::Site;

/// List content documents with their titles
pub async fn run(site: &Site) -> Result<()> {
    let loader = site.content_loader()?;
    let documents = loader.list_documents()?;

    println!("Documents ({}):", documents.len());
    for path in documents {
        if path.ends_with(".json") {
            println!("  {} [json]", path);
            continue;
        }

        let title = loader
            .load_markdown(&path)
            .await
            .and_then(|doc| doc.title().map(str::to_string))
            .unwrap_or_else(|| "Untitled".to_string());
        println!("  {} [{}]", title, path);
    }

    Ok(())
}
