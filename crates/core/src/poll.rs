//! Poll cadence and the decision taken on each status snapshot.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Error;
use crate::model::{CommandExecutionStatus, ExecutionStatus};

/// Interval between polls when nothing else is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How often to poll and whether to give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait between consecutive polls. Must be nonzero.
    pub interval: Duration,
    /// Upper bound on status polls. `None` polls until the remote side
    /// reports a terminal status.
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
        }
    }
}

impl PollPolicy {
    /// Sets the wait between polls.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the poll bound; `None` removes it.
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Rejects a zero interval and a zero poll bound.
    pub fn validate(&self) -> Result<(), Error> {
        if self.interval.is_zero() {
            return Err(Error::Config("poll interval must be greater than zero".into()));
        }
        if self.max_attempts == Some(0) {
            return Err(Error::Config("max poll attempts must be at least 1".into()));
        }
        Ok(())
    }

    /// True once `attempts` polls have been made and the bound is hit.
    pub fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

/// What to do after a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollDecision {
    /// Not terminal yet; wait and poll again.
    Continue,
    /// COMPLETE.
    Succeeded,
    /// Any other terminal status.
    Failed,
}

impl PollDecision {
    /// Maps a snapshot onto the next step of the poll loop.
    pub fn for_status(status: &ExecutionStatus) -> Self {
        if !status.status.is_terminal() {
            Self::Continue
        } else if status.status == CommandExecutionStatus::Complete {
            Self::Succeeded
        } else {
            Self::Failed
        }
    }
}

/// Suspends the poll loop between polls.
#[async_trait]
pub trait Delay: Send + Sync {
    /// Returns once `interval` has passed.
    async fn wait(&self, interval: Duration);
}

/// Real delay backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, interval: Duration) {
        tokio::time::sleep(interval).await;
    }
}
