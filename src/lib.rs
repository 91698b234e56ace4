//! siteops: content loading and deploy monitoring for a marketing website
//!
//! The crate loads JSON and Markdown content fragments (splitting off their
//! front-matter) and watches the remote deploy that a content save kicks off
//! until it goes live, fails, or runs out of time.

pub mod commands;
pub mod config;
pub mod content;
pub mod deploy;

use anyhow::Result;
use std::path::Path;

/// Configuration file name, relative to the base directory
pub const CONFIG_FILE: &str = "site.yml";

/// The site being operated on
#[derive(Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: std::path::PathBuf,
}

impl Site {
    /// Create a new Site instance from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            tracing::debug!("No {} in {:?}, using defaults", CONFIG_FILE, base_dir);
            config::SiteConfig::default()
        };

        Ok(Self { config, base_dir })
    }

    /// Content loader for the configured source
    pub fn content_loader(&self) -> Result<content::ContentLoader> {
        Ok(content::ContentLoader::new(self)?)
    }

    /// Deploy monitor for the configured status endpoint
    pub fn deploy_monitor(&self) -> Result<deploy::DeployMonitor> {
        let source = deploy::HttpStatusSource::from_config(&self.config.deploy)?;
        Ok(deploy::DeployMonitor::new(std::sync::Arc::new(source)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_defaults_without_config() {
        let dir = tempfile::tempdir().unwrap();
        let site = Site::new(dir.path()).unwrap();
        assert_eq!(site.config.content.base, "content");
        assert!(site.deploy_monitor().is_err());
    }

    #[test]
    fn test_site_reads_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "content:\n  base: pages\ndeploy:\n  status_url: https://example.org/status\n",
        )
        .unwrap();

        let site = Site::new(dir.path()).unwrap();
        assert_eq!(site.config.content.base, "pages");
        assert!(site.deploy_monitor().is_ok());
        assert!(site.content_loader().is_ok());
    }
}
