//! Per-node repository sync state machine.
//!
//! For every selected repository a node goes through: skip check against
//! its ancestors, existence and feed checks against the node's own listing,
//! trigger, then a poll loop until the job finishes, fails or times out.
//! Repositories on one node are handled one after another.

use url::Url;

use super::error::{SyncError, TimeoutPhase};
use super::progress::{NodeRef, ProgressSender, SyncProgress, SyncState};
use super::types::{RepositorySelection, SyncOptions};
use crate::service::{
    ContentProgress, JobHandle, JobState, RemoteRepository, RepositorySyncService,
    short_error_message,
};
use crate::tree::{Node, NodeId, Stage};

/// Sync the selected repositories on one node.
///
/// The root is the content origin and does nothing. Repository failures are
/// recorded on the node (node level and repository level) and reported as
/// error events; they do not stop the remaining repositories. The returned
/// error is the node-level failure to list repositories, which the caller
/// records.
pub async fn sync_node(
    stage: &Stage,
    id: NodeId,
    service: &dyn RepositorySyncService,
    options: &SyncOptions,
    progress: &ProgressSender,
) -> Result<(), SyncError> {
    let node = stage.node(id);
    if node.is_root() {
        tracing::debug!("Root node is the content origin, nothing to sync");
        return Ok(());
    }

    let mut sync = NodeSync {
        stage,
        node,
        node_ref: NodeRef::new(id, node),
        service,
        options,
        progress,
        listing: Listing::Pending,
    };

    match &options.repositories {
        RepositorySelection::Named(names) => {
            for repository in names {
                sync.sync_repository(repository).await;
            }
        }
        RepositorySelection::All => {
            let names: Vec<String> = sync
                .ensure_listing()
                .await?
                .into_iter()
                .map(|r| r.name)
                .collect();
            for repository in &names {
                sync.sync_repository(repository).await;
            }
        }
    }

    sync.into_result()
}

#[derive(Debug)]
enum Listing {
    Pending,
    Fetched,
    Failed(SyncError),
}

struct NodeSync<'a> {
    stage: &'a Stage,
    node: &'a Node,
    node_ref: NodeRef,
    service: &'a dyn RepositorySyncService,
    options: &'a SyncOptions,
    progress: &'a ProgressSender,
    listing: Listing,
}

impl NodeSync<'_> {
    fn into_result(self) -> Result<(), SyncError> {
        match self.listing {
            Listing::Failed(e) => Err(e),
            Listing::Pending | Listing::Fetched => Ok(()),
        }
    }

    /// List the node's repositories once and keep them on the node, where
    /// children read them for their feed checks.
    async fn ensure_listing(&mut self) -> Result<Vec<RemoteRepository>, SyncError> {
        match &self.listing {
            Listing::Fetched => return Ok(self.node.state().repositories().unwrap_or_default()),
            Listing::Failed(e) => return Err(e.clone()),
            Listing::Pending => {}
        }

        match self.service.list_repositories(self.node).await {
            Ok(repositories) => {
                tracing::debug!(count = repositories.len(), "Listed repositories");
                self.node.state().set_repositories(repositories.clone());
                self.listing = Listing::Fetched;
                Ok(repositories)
            }
            Err(e) => {
                let error = SyncError::Unreachable {
                    fqdn: self.node.fqdn.clone(),
                    message: short_error_message(&e),
                };
                tracing::warn!(error = %error, "Could not list repositories");
                self.listing = Listing::Failed(error.clone());
                Err(error)
            }
        }
    }

    async fn sync_repository(&mut self, repository: &str) {
        if self.skip_if_ancestor_failed(repository).await {
            return;
        }

        let listing = match self.ensure_listing().await {
            Ok(listing) => listing,
            Err(e) => {
                // The node-level error is returned once by `sync_node`.
                self.record_repository_error(repository, e).await;
                return;
            }
        };

        if let Err(e) = self.check_repository(repository, &listing) {
            self.fail(repository, e).await;
            return;
        }

        let job = match self.service.trigger_sync(self.node, repository).await {
            Ok(job) => job,
            Err(e) => {
                self.fail(
                    repository,
                    SyncError::Trigger {
                        repository: repository.to_string(),
                        message: short_error_message(&e),
                    },
                )
                .await;
                return;
            }
        };

        tracing::info!(repository, job = %job, "Triggered sync");
        self.emit(
            SyncProgress::new(self.node_ref.clone(), repository, SyncState::Init)
                .with_message(format!("sync task '{job}' started")),
        )
        .await;

        self.poll(repository, &job).await;
    }

    async fn poll(&self, repository: &str, job: &JobHandle) {
        let mut waiting = self.options.policy.waiting_delays();
        let mut attempt = 0usize;

        loop {
            if self.skip_if_ancestor_failed(repository).await {
                return;
            }

            let status = match self.service.job_status(self.node, job).await {
                Ok(status) => status,
                Err(e) => {
                    self.fail(
                        repository,
                        SyncError::Status {
                            repository: repository.to_string(),
                            job: job.id.clone(),
                            message: short_error_message(&e),
                        },
                    )
                    .await;
                    return;
                }
            };

            match (status.state, status.content) {
                (JobState::Finished, content) => {
                    tracing::info!(repository, job = %job, "Sync finished");
                    let event = SyncProgress::new(self.node_ref.clone(), repository, SyncState::Finished);
                    self.emit(with_optional_content(event, content)).await;
                    return;
                }
                (JobState::Error, _) => {
                    let detail = status
                        .error_detail
                        .unwrap_or_else(|| format!("sync task '{job}' failed"));
                    self.fail(
                        repository,
                        SyncError::Job {
                            repository: repository.to_string(),
                            detail,
                        },
                    )
                    .await;
                    return;
                }
                (JobState::Running, Some(content)) => {
                    self.emit(
                        SyncProgress::new(self.node_ref.clone(), repository, SyncState::Running)
                            .with_content(content),
                    )
                    .await;
                    tokio::time::sleep(self.options.policy.poll_interval).await;
                }
                (state, _) => {
                    let phase = if state == JobState::Waiting {
                        TimeoutPhase::Waiting
                    } else {
                        TimeoutPhase::RunningWithoutContent
                    };
                    let Some(delay) = waiting.next() else {
                        self.fail(
                            repository,
                            SyncError::Timeout {
                                repository: repository.to_string(),
                                job: job.id.clone(),
                                phase,
                            },
                        )
                        .await;
                        return;
                    };

                    attempt += 1;
                    tracing::debug!(repository, job = %job, attempt, ?delay, "Job has no progress yet");
                    self.emit(
                        SyncProgress::new(self.node_ref.clone(), repository, SyncState::Waiting)
                            .with_message(format!(
                                "{phase}, retry {attempt}/{}",
                                self.options.policy.waiting_retries
                            )),
                    )
                    .await;
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn check_repository(
        &self,
        repository: &str,
        listing: &[RemoteRepository],
    ) -> Result<(), SyncError> {
        let Some(remote) = listing.iter().find(|r| r.name == repository) else {
            return Err(SyncError::RepositoryMissing {
                repository: repository.to_string(),
                fqdn: self.node.fqdn.clone(),
            });
        };

        if self.options.check_feeds {
            self.check_feed(remote)?;
        }
        Ok(())
    }

    /// The feed must point at the parent's host, and when the parent listed
    /// its repositories this run, at a repository the parent has.
    fn check_feed(&self, remote: &RemoteRepository) -> Result<(), SyncError> {
        let Some(parent_id) = self.node.parent() else {
            return Ok(());
        };
        let parent = self.stage.node(parent_id);
        let feed = remote.feed.clone().unwrap_or_default();
        let invalid = || SyncError::InvalidFeed {
            repository: remote.name.clone(),
            feed: feed.clone(),
            parent: parent.fqdn.clone(),
        };

        let url = Url::parse(&feed).map_err(|_| invalid())?;
        if !url
            .host_str()
            .is_some_and(|host| host.eq_ignore_ascii_case(&parent.fqdn))
        {
            return Err(invalid());
        }
        let feed_repository = feed_repository_name(&url).ok_or_else(invalid)?;

        if let Some(parent_repositories) = parent.state().repositories()
            && !parent_repositories.iter().any(|r| r.name == feed_repository)
        {
            return Err(SyncError::FeedRepositoryMissing {
                repository: remote.name.clone(),
                feed_repository,
                parent: parent.fqdn.clone(),
            });
        }
        Ok(())
    }

    /// Emit a skipped event if an ancestor failed `repository` or was unreachable.
    async fn skip_if_ancestor_failed(&self, repository: &str) -> bool {
        let Some(ancestor) = self.stage.failed_ancestor(self.node_ref.id, repository) else {
            return false;
        };
        let ancestor = self.stage.node(ancestor);
        let message = if ancestor.state().has_repository_error(repository) {
            format!(
                "skipping sync due to errors on ancestor repository {repository} on node {}",
                ancestor.fqdn
            )
        } else {
            format!("skipping sync due to unreachable ancestor node {}", ancestor.fqdn)
        };
        tracing::info!(repository, "{}", message);
        self.emit(
            SyncProgress::new(self.node_ref.clone(), repository, SyncState::Skipped)
                .with_message(message),
        )
        .await;
        true
    }

    /// Record a repository failure at node level and repository level.
    async fn fail(&self, repository: &str, error: SyncError) {
        self.node.state().push_error(error.clone());
        self.record_repository_error(repository, error).await;
    }

    async fn record_repository_error(&self, repository: &str, error: SyncError) {
        tracing::warn!(repository, error = %error, "Repository sync failed");
        let message = error.to_string();
        self.node.state().set_repository_error(repository, error);
        self.emit(
            SyncProgress::new(self.node_ref.clone(), repository, SyncState::Error)
                .with_message(message),
        )
        .await;
    }

    async fn emit(&self, event: SyncProgress) {
        self.progress.send(event).await;
    }
}

fn with_optional_content(event: SyncProgress, content: Option<ContentProgress>) -> SyncProgress {
    match content {
        Some(content) => event.with_content(content),
        None => event,
    }
}

/// Repository name a feed URL points at: its last non-empty path segment.
fn feed_repository_name(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|s| !s.is_empty())
        .next_back()
        .map(str::to_string)
}
