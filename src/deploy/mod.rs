//! Deploy module - tracks remote builds triggered by content saves

mod monitor;
mod record;
mod source;

pub use monitor::{DeployMonitor, MonitorConfig, MonitorHandle, MonitorSession, Outcome, Progress};
pub use record::{DeployRecord, DeployState};
pub use source::{parse_status_response, DeployError, DeployStatusSource, HttpStatusSource};
