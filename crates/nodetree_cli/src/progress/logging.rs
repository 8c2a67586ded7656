use nodetree::sync::{SyncProgress, SyncState};

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: SyncProgress) {
        let fqdn = event.node.fqdn.as_str();
        let repository = event.repository.as_str();
        let message = event.message.as_deref().unwrap_or_default();

        match event.state {
            SyncState::Init => {
                tracing::info!(fqdn, repository, message, "Sync started");
            }
            SyncState::Running => {
                tracing::debug!(
                    fqdn,
                    repository,
                    items_done = event.items_done(),
                    items_total = event.items_total,
                    size_percent = event.size_percent(),
                    "Sync running"
                );
            }
            SyncState::Waiting => {
                tracing::info!(fqdn, repository, message, "Sync waiting");
            }
            SyncState::Finished => {
                tracing::info!(fqdn, repository, items = event.items_total, "Sync finished");
            }
            SyncState::Error => {
                tracing::error!(fqdn, repository, error = message, "Sync failed");
            }
            SyncState::Skipped => {
                tracing::warn!(fqdn, repository, reason = message, "Sync skipped");
            }
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
