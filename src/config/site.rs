//! Site configuration (site.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub title: String,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub deploy: DeployConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Website".to_string(),
            content: ContentConfig::default(),
            deploy: DeployConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

/// Where content fragments are fetched from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Directory relative to the site root, or an http(s) base URL
    pub base: String,
    /// Keep fetched text in memory for repeat loads
    pub cache: bool,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            base: "content".to_string(),
            cache: true,
        }
    }
}

impl ContentConfig {
    pub fn is_remote(&self) -> bool {
        self.base.starts_with("http://") || self.base.starts_with("https://")
    }
}

/// Deploy status endpoint and monitor timings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Endpoint returning the latest deploy records
    pub status_url: Option<String>,
    /// Environment variable holding the bearer token for `status_url`
    pub token_env: String,
    /// Number of records requested per poll
    pub per_page: u32,
    pub poll_interval_secs: u64,
    /// How much older than the start time a deploy may be and still count
    pub tolerance_secs: u64,
    pub timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            status_url: None,
            token_env: "DEPLOY_STATUS_TOKEN".to_string(),
            per_page: 5,
            poll_interval_secs: 5,
            tolerance_secs: 12,
            timeout_secs: 300,
            request_timeout_secs: 15,
        }
    }
}

impl DeployConfig {
    /// Read the bearer token from the configured environment variable
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|token| !token.is_empty())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn tolerance(&self) -> Duration {
        Duration::from_secs(self.tolerance_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.content.base, "content");
        assert!(!config.content.is_remote());
        assert_eq!(config.deploy.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.deploy.tolerance(), Duration::from_secs(12));
        assert_eq!(config.deploy.timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: Robotics Society
content:
  base: https://example.org/content
deploy:
  status_url: https://example.org/.netlify/functions/deploy-status
  tolerance_secs: 20
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "Robotics Society");
        assert!(config.content.is_remote());
        assert!(config.content.cache);
        assert_eq!(
            config.deploy.status_url.as_deref(),
            Some("https://example.org/.netlify/functions/deploy-status")
        );
        assert_eq!(config.deploy.tolerance_secs, 20);
        assert_eq!(config.deploy.poll_interval_secs, 5);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.yml");
        fs::write(&path, "title: Club\ndeploy:\n  timeout_secs: 60\n").unwrap();

        let config = SiteConfig::load(&path).unwrap();
        assert_eq!(config.title, "Club");
        assert_eq!(config.deploy.timeout(), Duration::from_secs(60));
    }
}
