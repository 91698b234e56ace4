//! Content loader - fetches JSON and Markdown fragments for page rendering

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use walkdir::WalkDir;

use super::{Frontmatter, MarkdownRenderer, ParsedDocument};
use crate::Site;

/// Errors raised while fetching content
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("HTTP error fetching {path}: {source}")]
    Http {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Fetching {path} returned HTTP {status}")]
    Status { path: String, status: u16 },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid content path: {0}")]
    InvalidPath(String),

    #[error("Content source is not a local directory")]
    NotLocal,
}

/// Where content is read from
#[derive(Debug, Clone)]
pub enum ContentSource {
    /// Fetched over HTTP relative to a base URL
    Remote { client: reqwest::Client, base: String },
    /// Read from a directory on disk
    Local(PathBuf),
}

impl ContentSource {
    /// HTTP source rooted at `base`
    pub fn remote(base: &str) -> Result<Self, ContentError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("siteops/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ContentError::Client)?;

        Ok(ContentSource::Remote {
            client,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    /// Directory source rooted at `root`
    pub fn local<P: AsRef<Path>>(root: P) -> Self {
        ContentSource::Local(root.as_ref().to_path_buf())
    }

    async fn read(&self, path: &str) -> Result<String, ContentError> {
        match self {
            ContentSource::Remote { client, base } => {
                let url = format!("{}/{}", base, path);
                let response = client.get(&url).send().await.map_err(|source| {
                    ContentError::Http {
                        path: path.to_string(),
                        source,
                    }
                })?;

                let status = response.status();
                if !status.is_success() {
                    return Err(ContentError::Status {
                        path: path.to_string(),
                        status: status.as_u16(),
                    });
                }

                response.text().await.map_err(|source| ContentError::Http {
                    path: path.to_string(),
                    source,
                })
            }
            ContentSource::Local(root) => tokio::fs::read_to_string(root.join(path))
                .await
                .map_err(|source| ContentError::Io {
                    path: path.to_string(),
                    source,
                }),
        }
    }
}

/// A Markdown fragment with its body rendered to HTML
#[derive(Debug, Clone, Serialize)]
pub struct RenderedPage {
    pub frontmatter: Frontmatter,
    pub html: String,
}

/// Loads content fragments from a [`ContentSource`]
pub struct ContentLoader {
    source: ContentSource,
    renderer: MarkdownRenderer,
    cache: Option<Mutex<HashMap<String, String>>>,
}

impl ContentLoader {
    /// Create a loader from the site's content configuration
    pub fn new(site: &Site) -> Result<Self, ContentError> {
        let config = &site.config.content;
        let source = if config.is_remote() {
            ContentSource::remote(&config.base)?
        } else {
            ContentSource::local(site.base_dir.join(&config.base))
        };

        Ok(Self::with_source(source).with_cache(config.cache))
    }

    /// Create a loader for an explicit source, with caching enabled
    pub fn with_source(source: ContentSource) -> Self {
        Self {
            source,
            renderer: MarkdownRenderer::new(),
            cache: Some(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache = enabled.then(|| Mutex::new(HashMap::new()));
        self
    }

    pub fn source(&self) -> &ContentSource {
        &self.source
    }

    /// Fetch the raw text at `path`
    pub async fn fetch_text(&self, path: &str) -> Result<String, ContentError> {
        let path = normalize_path(path)?;

        if let Some(text) = self.cached(&path) {
            tracing::debug!("Cache hit: {}", path);
            return Ok(text);
        }

        let text = self.source.read(&path).await?;
        tracing::debug!("Fetched {} ({} bytes)", path, text.len());

        if let Some(cache) = &self.cache {
            if let Ok(mut cache) = cache.lock() {
                cache.insert(path, text.clone());
            }
        }

        Ok(text)
    }

    /// Fetch and decode the JSON document at `path`
    pub async fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ContentError> {
        let text = self.fetch_text(path).await?;
        serde_json::from_str(&text).map_err(|source| ContentError::Json {
            path: path.to_string(),
            source,
        })
    }

    /// Load a Markdown document and split off its front-matter.
    /// Failures are logged and yield `None`.
    pub async fn load_markdown(&self, path: &str) -> Option<ParsedDocument> {
        match self.fetch_text(path).await {
            Ok(text) => Some(ParsedDocument::parse(&text)),
            Err(e) => {
                tracing::warn!("Failed to load markdown {}: {}", path, e);
                None
            }
        }
    }

    /// Load a JSON document. Failures are logged and yield `None`.
    pub async fn load_json(&self, path: &str) -> Option<serde_json::Value> {
        match self.fetch_json(path).await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Failed to load JSON {}: {}", path, e);
                None
            }
        }
    }

    /// Load a Markdown document and render its body
    pub async fn load_page(&self, path: &str) -> Option<RenderedPage> {
        let doc = self.load_markdown(path).await?;
        let html = self.renderer.render(&doc.body);
        Some(RenderedPage {
            frontmatter: doc.frontmatter,
            html,
        })
    }

    /// Forget all cached text
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            if let Ok(mut cache) = cache.lock() {
                cache.clear();
            }
        }
    }

    /// List content documents of a local source, relative to its root
    pub fn list_documents(&self) -> Result<Vec<String>, ContentError> {
        let ContentSource::Local(root) = &self.source else {
            return Err(ContentError::NotLocal);
        };

        let mut documents: Vec<String> = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_content_file(e.path()))
            .filter_map(|e| {
                e.path()
                    .strip_prefix(root)
                    .ok()
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
            })
            .collect();

        documents.sort();
        Ok(documents)
    }

    fn cached(&self, path: &str) -> Option<String> {
        let cache = self.cache.as_ref()?.lock().ok()?;
        cache.get(path).cloned()
    }
}

/// Normalize a content path, rejecting anything that escapes the root
fn normalize_path(path: &str) -> Result<String, ContentError> {
    let trimmed = path.trim().trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(ContentError::InvalidPath(path.to_string()));
    }

    let escapes = Path::new(trimmed)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || trimmed.contains('\\') {
        return Err(ContentError::InvalidPath(path.to_string()));
    }

    Ok(trimmed.to_string())
}

/// Check if a file is a content document
fn is_content_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "md" || e == "markdown" || e == "json")
        .unwrap_or(false)
}
