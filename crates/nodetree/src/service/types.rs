use std::fmt;

use async_trait::async_trait;

use super::errors::Result;
use crate::tree::Node;

/// Basic-auth credentials for a node's API.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub passwd: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, passwd: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            passwd: passwd.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("passwd", &"***")
            .finish()
    }
}

/// A repository as listed by a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepository {
    pub name: String,
    /// Upstream URL the repository syncs from, if it has one.
    pub feed: Option<String>,
}

impl RemoteRepository {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            feed: None,
        }
    }

    #[must_use]
    pub fn with_feed(mut self, feed: impl Into<String>) -> Self {
        self.feed = Some(feed.into());
        self
    }
}

/// Opaque handle of a triggered sync job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle {
    pub id: String,
}

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Lifecycle state of a remote sync job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Waiting,
    Running,
    Finished,
    Error,
}

impl JobState {
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Error)
    }
}

/// Content counters reported by a running job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentProgress {
    pub size_total: u64,
    pub size_left: u64,
    pub items_total: u64,
    pub items_left: u64,
}

impl ContentProgress {
    #[inline]
    #[must_use]
    pub fn items_done(&self) -> u64 {
        self.items_total.saturating_sub(self.items_left)
    }

    #[inline]
    #[must_use]
    pub fn size_done(&self) -> u64 {
        self.size_total.saturating_sub(self.size_left)
    }
}

/// One observation of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub state: JobState,
    /// Absent while the job has not started transferring content.
    pub content: Option<ContentProgress>,
    /// Human-readable failure detail, set when `state` is `Error`.
    pub error_detail: Option<String>,
}

impl JobStatus {
    #[must_use]
    pub fn waiting() -> Self {
        Self {
            state: JobState::Waiting,
            content: None,
            error_detail: None,
        }
    }

    #[must_use]
    pub fn running(content: Option<ContentProgress>) -> Self {
        Self {
            state: JobState::Running,
            content,
            error_detail: None,
        }
    }

    #[must_use]
    pub fn finished() -> Self {
        Self {
            state: JobState::Finished,
            content: None,
            error_detail: None,
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            state: JobState::Error,
            content: None,
            error_detail: Some(detail.into()),
        }
    }
}

/// Remote operations the sync engine needs from a node.
///
/// Implementations must be safe to call concurrently for different nodes.
#[async_trait]
pub trait RepositorySyncService: Send + Sync {
    /// List every repository on `node`, including its feed.
    async fn list_repositories(&self, node: &Node) -> Result<Vec<RemoteRepository>>;

    /// Start a sync job for `repository` on `node`.
    async fn trigger_sync(&self, node: &Node, repository: &str) -> Result<JobHandle>;

    /// Observe the current state of a job started on `node`.
    async fn job_status(&self, node: &Node, job: &JobHandle) -> Result<JobStatus>;
}
