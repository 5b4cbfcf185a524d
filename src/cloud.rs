// src/cloud.rs
//
// Gate that holds a cycle until the cloud-sync daemon has flushed the
// previous cycle's pictures. Convergence is read off the daemon's status
// output; a timeout is soft, a daemon that cannot even be started is not.

use std::time::Duration;

use log::{info, warn};
use thiserror::Error;

use crate::shell::{CommandRunner, ShellError};

const POLL_INTERVAL: Duration = Duration::from_secs(5);
const STATUS_UP_TO_DATE: &str = "Up to date";
const STATUS_NOT_RUNNING: &str = "Dropbox isn't running!";

#[derive(Debug, Error)]
pub enum CloudError {
    #[error("the cloud sync daemon is not installed")]
    DaemonNotInstalled,
    #[error(transparent)]
    Shell(#[from] ShellError),
}

/// What the sync daemon reports when asked for its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonStatus {
    NotRunning,
    Reported(Vec<String>),
}

/// Seam over the sync daemon's control interface.
pub trait SyncClient {
    fn status(&self) -> Result<DaemonStatus, ShellError>;
    fn start_daemon(&self) -> Result<bool, ShellError>;
}

/// Talks to the Dropbox CLI. A nonzero exit or the canonical "isn't
/// running" line both mean the daemon is down.
pub struct DropboxCli<R> {
    runner: R,
}

impl<R: CommandRunner> DropboxCli<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> SyncClient for DropboxCli<R> {
    fn status(&self) -> Result<DaemonStatus, ShellError> {
        let out = self.runner.run("dropbox status")?;
        if !out.success() {
            return Ok(DaemonStatus::NotRunning);
        }
        let lines = out.lines();
        if lines.first().map(String::as_str) == Some(STATUS_NOT_RUNNING) {
            return Ok(DaemonStatus::NotRunning);
        }
        Ok(DaemonStatus::Reported(lines))
    }

    fn start_daemon(&self) -> Result<bool, ShellError> {
        let out = self.runner.run("dropbox start")?;
        Ok(out.success())
    }
}

pub struct SyncGate<C> {
    client: C,
    poll_interval: Duration,
}

impl<C: SyncClient> SyncGate<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Poll until the daemon reports "Up to date" or `timeout` elapses.
    /// A daemon that is down is started at most once per call; a timeout
    /// is logged and swallowed.
    pub fn wait_for_sync(&self, timeout: Duration) -> Result<(), CloudError> {
        info!(
            "[cloud] waiting up to {}s for cloud sync",
            timeout.as_secs()
        );

        let mut start_attempted = false;
        let mut last_status: Vec<String> = Vec::new();
        let mut waited = Duration::ZERO;

        loop {
            match self.client.status()? {
                DaemonStatus::NotRunning if !start_attempted => {
                    start_attempted = true;
                    info!("[cloud] sync daemon not running, starting it");
                    if !self.client.start_daemon()? {
                        return Err(CloudError::DaemonNotInstalled);
                    }
                }
                DaemonStatus::NotRunning => {}
                DaemonStatus::Reported(lines) => {
                    if lines.first().map(String::as_str) == Some(STATUS_UP_TO_DATE) {
                        info!("[cloud] sync converged");
                        return Ok(());
                    }
                    last_status = lines;
                }
            }

            if waited >= timeout {
                warn!(
                    "[cloud] sync did not converge within {}s, last status: {}",
                    timeout.as_secs(),
                    if last_status.is_empty() {
                        "(none)".to_string()
                    } else {
                        last_status.join(" | ")
                    }
                );
                return Ok(());
            }

            std::thread::sleep(self.poll_interval);
            waited += self.poll_interval;
        }
    }
}
