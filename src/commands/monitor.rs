//! Watch the deploy triggered by a content save

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

use crate::deploy::{MonitorConfig, MonitorSession, Outcome, Progress};
use crate::Site;

/// Monitor deploys started at `since` (default: now) and return the outcome
pub async fn run(site: &Site, since: Option<DateTime<Utc>>) -> Result<Outcome> {
    let monitor = site.deploy_monitor()?;
    let config = MonitorConfig::from(&site.config.deploy);
    let session = match since {
        Some(start) => MonitorSession::starting_at(start, config),
        None => MonitorSession::new(config),
    };

    println!("Waiting for deploys started after {}", session.start_time());
    let handle = monitor.spawn(session);
    let mut progress = handle.progress();

    let report = async {
        let mut last = Progress::Waiting;
        while progress.changed().await.is_ok() {
            let current = progress.borrow_and_update().clone();
            if current == last {
                continue;
            }
            match &current {
                Progress::Tracking { deploy_id, state } => {
                    println!("Deploy {}: {}", deploy_id, state)
                }
                Progress::Resolved(_) => break,
                Progress::Waiting => {}
            }
            last = current;
        }
    };

    tokio::select! {
        _ = report => {}
        _ = tokio::signal::ctrl_c() => {
            handle.cancel();
            return Err(anyhow!("Deploy monitor cancelled"));
        }
    }

    let outcome = handle
        .wait()
        .await
        .ok_or_else(|| anyhow!("Deploy monitor cancelled"))?;
    println!("{}", outcome);
    Ok(outcome)
}
