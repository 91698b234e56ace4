//! Deploy monitor
//!
//! After a content save triggers a remote build, the monitor polls the
//! deploy status source until the deploy caused by that save reaches a
//! terminal state or the session runs out of time. The provider may have
//! created the deploy slightly before the local start time was captured, so
//! records up to `tolerance` older than the start time are still accepted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::{DeployRecord, DeployState, DeployStatusSource};
use crate::config::DeployConfig;

/// Shortest poll interval the driver will use
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Monitor timings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub tolerance: Duration,
    pub timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            tolerance: Duration::from_secs(12),
            timeout: Duration::from_secs(300),
        }
    }
}

impl From<&DeployConfig> for MonitorConfig {
    fn from(config: &DeployConfig) -> Self {
        Self {
            poll_interval: config.poll_interval().max(MIN_POLL_INTERVAL),
            tolerance: config.tolerance(),
            timeout: config.timeout(),
        }
    }
}

/// How a monitor session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum Outcome {
    /// The tracked deploy is live
    Success { deploy_id: String },
    /// The tracked deploy failed
    Error {
        deploy_id: String,
        message: Option<String>,
    },
    /// A deploy was found but did not finish in time
    Timeout { deploy_id: String },
    /// No deploy caused by the triggering action was seen
    NoDeploy,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success { deploy_id } => write!(f, "deploy {} is live", deploy_id),
            Outcome::Error {
                deploy_id,
                message: Some(message),
            } => write!(f, "deploy {} failed: {}", deploy_id, message),
            Outcome::Error { deploy_id, .. } => write!(f, "deploy {} failed", deploy_id),
            Outcome::Timeout { deploy_id } => {
                write!(f, "deploy {} did not finish in time", deploy_id)
            }
            Outcome::NoDeploy => f.write_str("no deploy was started"),
        }
    }
}

/// What a build-progress view should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// No matching deploy seen yet
    Waiting,
    Tracking { deploy_id: String, state: DeployState },
    Resolved(Outcome),
}

/// State of one monitoring run
#[derive(Debug, Clone)]
pub struct MonitorSession {
    start_time: DateTime<Utc>,
    config: MonitorConfig,
    target: Option<String>,
    last_state: Option<DeployState>,
    outcome: Option<Outcome>,
}

impl MonitorSession {
    /// Start a session now
    pub fn new(config: MonitorConfig) -> Self {
        Self::starting_at(Utc::now(), config)
    }

    pub fn starting_at(start_time: DateTime<Utc>, config: MonitorConfig) -> Self {
        Self {
            start_time,
            config,
            target: None,
            last_state: None,
            outcome: None,
        }
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Id of the deploy being tracked
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn found_target(&self) -> bool {
        self.target.is_some()
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome.is_some()
    }

    /// Time budget left at `now`, measured from the start time
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        let elapsed = (now - self.start_time).to_std().unwrap_or(Duration::ZERO);
        self.config.timeout.saturating_sub(elapsed)
    }

    /// Whether `record` may have been caused by the action that started
    /// this session
    pub fn accepts(&self, record: &DeployRecord) -> bool {
        match (self.start_time - record.created_at).to_std() {
            Ok(age) => age < self.config.tolerance,
            // created after the start time
            Err(_) => true,
        }
    }

    /// Apply one poll response. Returns the outcome when this response
    /// resolves the session; a resolved session ignores further responses.
    pub fn observe(&mut self, records: &[DeployRecord]) -> Option<Outcome> {
        if self.is_resolved() {
            return None;
        }

        let record = match self.target.clone() {
            Some(id) => records.iter().find(|r| r.id == id),
            None => {
                let accepted = records.iter().find(|r| self.accepts(r));
                match accepted {
                    Some(record) => {
                        tracing::info!(
                            "Tracking deploy {} ({}, created {})",
                            record.id,
                            record.state,
                            record.created_at
                        );
                        self.target = Some(record.id.clone());
                    }
                    None => tracing::debug!(
                        "No deploy since {} among {} records",
                        self.start_time,
                        records.len()
                    ),
                }
                accepted
            }
        }?;

        if self.last_state.as_ref() != Some(&record.state) {
            tracing::debug!("Deploy {} is {}", record.id, record.state);
        }
        self.last_state = Some(record.state.clone());

        if !record.state.is_terminal() {
            return None;
        }

        let outcome = if record.state == DeployState::Ready {
            Outcome::Success {
                deploy_id: record.id.clone(),
            }
        } else {
            Outcome::Error {
                deploy_id: record.id.clone(),
                message: record.error_message.clone(),
            }
        };

        self.outcome = Some(outcome.clone());
        Some(outcome)
    }

    /// Resolve the session because its time budget ran out. An already
    /// resolved session keeps its outcome.
    pub fn expire(&mut self) -> Outcome {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }

        let outcome = match &self.target {
            Some(id) => Outcome::Timeout {
                deploy_id: id.clone(),
            },
            None => Outcome::NoDeploy,
        };
        self.outcome = Some(outcome.clone());
        outcome
    }

    pub fn progress(&self) -> Progress {
        if let Some(outcome) = &self.outcome {
            return Progress::Resolved(outcome.clone());
        }
        match (&self.target, &self.last_state) {
            (Some(id), Some(state)) => Progress::Tracking {
                deploy_id: id.clone(),
                state: state.clone(),
            },
            _ => Progress::Waiting,
        }
    }
}

/// Polls a [`DeployStatusSource`] until a session resolves
#[derive(Clone)]
pub struct DeployMonitor {
    source: Arc<dyn DeployStatusSource>,
}

impl DeployMonitor {
    pub fn new(source: Arc<dyn DeployStatusSource>) -> Self {
        Self { source }
    }

    /// Poll until `session` resolves
    pub async fn run(&self, session: MonitorSession) -> Outcome {
        let (progress, _) = watch::channel(session.progress());
        drive(self.source.as_ref(), session, &progress).await
    }

    /// Start a session now and poll it in the background
    pub fn start(&self, config: MonitorConfig) -> MonitorHandle {
        self.spawn(MonitorSession::new(config))
    }

    /// Poll `session` in the background
    pub fn spawn(&self, session: MonitorSession) -> MonitorHandle {
        let (progress_tx, progress_rx) = watch::channel(session.progress());
        let source = Arc::clone(&self.source);
        let task =
            tokio::spawn(async move { drive(source.as_ref(), session, &progress_tx).await });

        MonitorHandle {
            task,
            progress: progress_rx,
        }
    }
}

/// A monitor running in the background. Dropping the handle cancels it.
pub struct MonitorHandle {
    task: JoinHandle<Outcome>,
    progress: watch::Receiver<Progress>,
}

impl MonitorHandle {
    /// Subscribe to progress updates
    pub fn progress(&self) -> watch::Receiver<Progress> {
        self.progress.clone()
    }

    /// Stop polling. No outcome is delivered after this.
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Wait for the outcome; `None` if the monitor was cancelled. A panic
    /// inside the monitor task is resumed here.
    pub async fn wait(mut self) -> Option<Outcome> {
        match (&mut self.task).await {
            Ok(outcome) => Some(outcome),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => None,
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn drive(
    source: &dyn DeployStatusSource,
    mut session: MonitorSession,
    progress: &watch::Sender<Progress>,
) -> Outcome {
    let config = *session.config();
    let remaining = session.remaining(Utc::now());
    let deadline = time::sleep(remaining);
    tokio::pin!(deadline);

    let poll_interval = config.poll_interval.max(MIN_POLL_INTERVAL);
    let mut ticker = time::interval_at(Instant::now() + poll_interval, poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        "Monitoring deploys started after {} ({}s of {}s left)",
        session.start_time(),
        remaining.as_secs(),
        config.timeout.as_secs()
    );

    let outcome = loop {
        tokio::select! {
            biased;
            _ = &mut deadline => break session.expire(),
            _ = ticker.tick() => {}
        }

        let polled = tokio::select! {
            biased;
            _ = &mut deadline => break session.expire(),
            polled = source.latest_deploys(Some(session.start_time())) => polled,
        };

        match polled {
            Ok(records) => {
                if let Some(outcome) = session.observe(&records) {
                    break outcome;
                }
                progress.send_replace(session.progress());
            }
            Err(e) => tracing::warn!("Deploy status poll failed: {}", e),
        }
    };

    tracing::info!("Deploy monitor finished: {}", outcome);
    progress.send_replace(Progress::Resolved(outcome.clone()));
    outcome
}
