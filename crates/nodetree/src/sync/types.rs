//! Sync options, poll policy and constants.

use std::time::Duration;

use backon::{BackoffBuilder, ConstantBuilder};

/// Delay between two status polls of a running job.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Delay between two polls of a job that is waiting or has not published
/// content progress yet.
pub const DEFAULT_WAITING_BACKOFF_SECS: u64 = 10;

/// How many waiting polls a repository gets before it times out.
pub const DEFAULT_WAITING_RETRIES: usize = 3;

/// Buffered progress events between node tasks and the subscriber.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 256;

/// Timing of the per-repository poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Sleep after each poll that reported content progress.
    pub poll_interval: Duration,
    /// Sleep after each poll that reported waiting, or running without content.
    pub waiting_backoff: Duration,
    /// Number of such polls tolerated before a timeout error.
    pub waiting_retries: usize,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            waiting_backoff: Duration::from_secs(DEFAULT_WAITING_BACKOFF_SECS),
            waiting_retries: DEFAULT_WAITING_RETRIES,
        }
    }
}

impl PollPolicy {
    /// Builder describing the bounded waiting delays.
    #[must_use]
    pub fn into_backoff(self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.waiting_backoff)
            .with_max_times(self.waiting_retries)
    }

    /// Delays for a single repository; `None` once the budget is spent.
    #[must_use]
    pub fn waiting_delays(self) -> impl Iterator<Item = Duration> + Send {
        self.into_backoff().build()
    }
}

/// Which repositories to sync on every node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositorySelection {
    /// These names, in this order.
    Named(Vec<String>),
    /// Whatever each node lists.
    All,
}

impl RepositorySelection {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Named(names) if names.is_empty())
    }
}

/// Options for a stage sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub repositories: RepositorySelection,
    pub policy: PollPolicy,
    /// Verify that feeds point at the parent node before triggering.
    pub check_feeds: bool,
}

impl SyncOptions {
    /// Sync the given repositories on every node.
    pub fn named<I, S>(repositories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            repositories: RepositorySelection::Named(
                repositories.into_iter().map(Into::into).collect(),
            ),
            policy: PollPolicy::default(),
            check_feeds: true,
        }
    }

    /// Sync every repository each node lists.
    #[must_use]
    pub fn all_repositories() -> Self {
        Self {
            repositories: RepositorySelection::All,
            policy: PollPolicy::default(),
            check_feeds: true,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_check_feeds(mut self, check_feeds: bool) -> Self {
        self.check_feeds = check_feeds;
        self
    }
}
