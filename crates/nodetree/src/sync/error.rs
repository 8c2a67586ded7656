//! Errors recorded on nodes and repositories during a sync run.

use std::fmt;

use thiserror::Error;

/// Where a job was stuck when the waiting budget ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutPhase {
    /// The job never left the waiting state.
    Waiting,
    /// The job reported running but never published content progress.
    RunningWithoutContent,
}

impl fmt::Display for TimeoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => f.write_str("waiting state"),
            Self::RunningWithoutContent => {
                f.write_str("running state with missing task content object")
            }
        }
    }
}

/// A failure recorded on a node, or on one of its repositories.
///
/// Cloneable so one failure can be stored at node level and repository level
/// and still be sent along with a progress event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    /// The node did not answer the repository listing.
    #[error("could not list repositories on node {fqdn}: {message}")]
    Unreachable { fqdn: String, message: String },

    /// The requested repository is not present on the node.
    #[error("repository '{repository}' does not exist on node {fqdn}")]
    RepositoryMissing { repository: String, fqdn: String },

    /// The repository's feed does not point at the parent node.
    #[error("repository '{repository}' has invalid feed '{feed}', expected a feed on parent '{parent}'")]
    InvalidFeed {
        repository: String,
        feed: String,
        parent: String,
    },

    /// The feed points at the parent, but the parent lacks that repository.
    #[error("feed of repository '{repository}' points to '{feed_repository}' which does not exist on parent '{parent}'")]
    FeedRepositoryMissing {
        repository: String,
        feed_repository: String,
        parent: String,
    },

    /// The node refused to start a sync job.
    #[error("could not trigger sync of repository '{repository}': {message}")]
    Trigger { repository: String, message: String },

    /// The sync job ended in an error state.
    #[error("sync of repository '{repository}' failed: {detail}")]
    Job { repository: String, detail: String },

    /// The job exhausted its waiting budget.
    #[error("sync task '{job}' has reached timeout in {phase}")]
    Timeout {
        repository: String,
        job: String,
        phase: TimeoutPhase,
    },

    /// Polling the job failed.
    #[error("could not get status of sync task '{job}': {message}")]
    Status {
        repository: String,
        job: String,
        message: String,
    },

    /// The node's task panicked.
    #[error("node task panicked: {message}")]
    TaskPanicked { message: String },
}

impl SyncError {
    /// The repository the error belongs to, if it is repository-scoped.
    #[must_use]
    pub fn repository(&self) -> Option<&str> {
        match self {
            Self::RepositoryMissing { repository, .. }
            | Self::InvalidFeed { repository, .. }
            | Self::FeedRepositoryMissing { repository, .. }
            | Self::Trigger { repository, .. }
            | Self::Job { repository, .. }
            | Self::Timeout { repository, .. }
            | Self::Status { repository, .. } => Some(repository),
            Self::Unreachable { .. } | Self::TaskPanicked { .. } => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
