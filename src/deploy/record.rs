//! Deploy records as reported by the hosting provider

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Build/publish state of a deploy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeployState {
    New,
    Enqueued,
    Building,
    Uploading,
    Processing,
    Prepared,
    Ready,
    Error,
    /// Any state the provider reports that is not listed above
    Other(String),
}

impl DeployState {
    /// `ready` and `error` are final
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeployState::Ready | DeployState::Error)
    }

    pub fn as_str(&self) -> &str {
        match self {
            DeployState::New => "new",
            DeployState::Enqueued => "enqueued",
            DeployState::Building => "building",
            DeployState::Uploading => "uploading",
            DeployState::Processing => "processing",
            DeployState::Prepared => "prepared",
            DeployState::Ready => "ready",
            DeployState::Error => "error",
            DeployState::Other(state) => state,
        }
    }
}

impl From<String> for DeployState {
    fn from(state: String) -> Self {
        match state.as_str() {
            "new" => DeployState::New,
            "enqueued" => DeployState::Enqueued,
            "building" => DeployState::Building,
            "uploading" => DeployState::Uploading,
            "processing" => DeployState::Processing,
            "prepared" => DeployState::Prepared,
            "ready" => DeployState::Ready,
            "error" => DeployState::Error,
            _ => DeployState::Other(state),
        }
    }
}

impl From<DeployState> for String {
    fn from(state: DeployState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for DeployState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One build/publish attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployRecord {
    pub id: String,
    pub state: DeployState,
    #[serde(alias = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(default, alias = "errorMessage")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub branch: String,
}
