//! Deploy status collaborators

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use super::DeployRecord;
use crate::config::DeployConfig;

/// Errors raised while fetching deploy status
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Deploy status endpoint is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Deploy status endpoint returned HTTP {0}")]
    Status(u16),

    #[error("Invalid deploy status response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Something that reports the most recent deploys, newest first
#[async_trait]
pub trait DeployStatusSource: Send + Sync {
    /// Fetch the latest deploys. `after` is a hint; sources may ignore it
    /// and return older records too.
    async fn latest_deploys(
        &self,
        after: Option<DateTime<Utc>>,
    ) -> Result<Vec<DeployRecord>, DeployError>;
}

/// Response body of the status endpoint
#[derive(Deserialize)]
#[serde(untagged)]
enum StatusResponse {
    List(Vec<DeployRecord>),
    Wrapped { deploys: Vec<DeployRecord> },
}

impl From<StatusResponse> for Vec<DeployRecord> {
    fn from(response: StatusResponse) -> Self {
        match response {
            StatusResponse::List(deploys) | StatusResponse::Wrapped { deploys } => deploys,
        }
    }
}

/// Decode a status endpoint body
pub fn parse_status_response(body: &str) -> Result<Vec<DeployRecord>, DeployError> {
    let response: StatusResponse = serde_json::from_str(body)?;
    Ok(response.into())
}

/// Status endpoint reached over HTTP
pub struct HttpStatusSource {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    per_page: u32,
}

impl HttpStatusSource {
    /// Create a source for `url`
    pub fn new(url: &str, request_timeout: Duration) -> Result<Self, DeployError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("siteops/", env!("CARGO_PKG_VERSION")))
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            url: url.to_string(),
            token: None,
            per_page: 5,
        })
    }

    /// Create a source from the deploy configuration
    pub fn from_config(config: &DeployConfig) -> Result<Self, DeployError> {
        let url = config
            .status_url
            .as_deref()
            .ok_or(DeployError::NotConfigured)?;

        let mut source = Self::new(url, config.request_timeout())?.with_per_page(config.per_page);
        if let Some(token) = config.token() {
            source = source.with_token(&token);
        }
        Ok(source)
    }

    /// Set authentication token
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.max(1);
        self
    }
}

#[async_trait]
impl DeployStatusSource for HttpStatusSource {
    async fn latest_deploys(
        &self,
        after: Option<DateTime<Utc>>,
    ) -> Result<Vec<DeployRecord>, DeployError> {
        let mut request = self
            .client
            .get(&self.url)
            .query(&[("per_page", self.per_page.to_string())]);

        if let Some(after) = after {
            request = request.query(&[("after", after.to_rfc3339_opts(SecondsFormat::Millis, true))]);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeployError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_status_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::DeployState;

    #[test]
    fn test_parse_bare_list() {
        let body = r#"[
            {"id": "b", "state": "ready", "created_at": "2024-05-01T10:01:00Z"},
            {"id": "a", "state": "error", "created_at": "2024-05-01T10:00:00Z"}
        ]"#;
        let deploys = parse_status_response(body).unwrap();
        assert_eq!(deploys.len(), 2);
        assert_eq!(deploys[0].id, "b");
        assert_eq!(deploys[1].state, DeployState::Error);
    }

    #[test]
    fn test_parse_wrapped_list() {
        let body = r#"{"deploys": [{"id": "x", "state": "enqueued", "createdAt": "2024-05-01T10:00:00Z"}]}"#;
        let deploys = parse_status_response(body).unwrap();
        assert_eq!(deploys[0].state, DeployState::Enqueued);
    }

    #[test]
    fn test_parse_malformed_body() {
        assert!(matches!(
            parse_status_response("{\"error\": \"Unauthorized\"}"),
            Err(DeployError::Decode(_))
        ));
        assert!(parse_status_response("<html>").is_err());
    }

    #[test]
    fn test_from_config_requires_url() {
        let config = DeployConfig::default();
        assert!(matches!(
            HttpStatusSource::from_config(&config),
            Err(DeployError::NotConfigured)
        ));

        let config = DeployConfig {
            status_url: Some("https://example.org/status".to_string()),
            per_page: 0,
            ..Default::default()
        };
        let source = HttpStatusSource::from_config(&config).unwrap();
        assert_eq!(source.per_page, 1);
    }
}
