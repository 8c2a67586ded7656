//! Progress events for stage sync runs.
//!
//! Node tasks push [`SyncProgress`] events into a bounded channel; a single
//! subscriber task drains it and hands each event to the caller's
//! [`ProgressCallback`] in arrival order.

use std::fmt;

use tokio::sync::mpsc;

use crate::service::ContentProgress;
use crate::tree::{Node, NodeId};

/// State of one repository on one node, as last reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncState {
    /// A job was triggered and has not reported yet.
    Init,
    Running,
    Waiting,
    Finished,
    Error,
    /// An ancestor failed this repository; nothing was done.
    Skipped,
}

impl SyncState {
    /// Finished, error and skipped end a repository's sync.
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Error | Self::Skipped)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Running => "running",
            Self::Waiting => "waiting",
            Self::Finished => "finished",
            Self::Error => "error",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the node an event belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef {
    pub id: NodeId,
    pub fqdn: String,
    pub depth: usize,
    pub tree_position: usize,
}

impl NodeRef {
    pub(crate) fn new(id: NodeId, node: &Node) -> Self {
        Self {
            id,
            fqdn: node.fqdn.clone(),
            depth: node.depth(),
            tree_position: node.tree_position(),
        }
    }
}

/// A state change or progress observation for one repository on one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncProgress {
    pub node: NodeRef,
    pub repository: String,
    pub state: SyncState,
    pub size_total: u64,
    pub size_left: u64,
    pub items_total: u64,
    pub items_left: u64,
    /// Error or skip reason, and other human-readable context.
    pub message: Option<String>,
}

impl SyncProgress {
    pub fn new(node: NodeRef, repository: impl Into<String>, state: SyncState) -> Self {
        Self {
            node,
            repository: repository.into(),
            state,
            size_total: 0,
            size_left: 0,
            items_total: 0,
            items_left: 0,
            message: None,
        }
    }

    #[must_use]
    pub fn with_content(mut self, content: ContentProgress) -> Self {
        self.size_total = content.size_total;
        self.size_left = content.size_left;
        self.items_total = content.items_total;
        self.items_left = content.items_left;
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn items_done(&self) -> u64 {
        self.items_total.saturating_sub(self.items_left)
    }

    /// Percentage of items transferred; 100 when there is nothing to transfer.
    #[must_use]
    pub fn items_percent(&self) -> u64 {
        percent(self.items_done(), self.items_total)
    }

    /// Percentage of bytes transferred; 100 when there is nothing to transfer.
    #[must_use]
    pub fn size_percent(&self) -> u64 {
        percent(self.size_total.saturating_sub(self.size_left), self.size_total)
    }
}

fn percent(done: u64, total: u64) -> u64 {
    if total == 0 {
        return 100;
    }
    done.saturating_mul(100) / total
}

/// Callback for progress updates during sync operations.
pub type ProgressCallback = Box<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}

/// Producer side of the progress channel, cloned into every node task.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: mpsc::Sender<SyncProgress>,
}

impl ProgressSender {
    pub fn new(tx: mpsc::Sender<SyncProgress>) -> Self {
        Self { tx }
    }

    /// Queue an event, waiting for room if the subscriber is behind.
    pub async fn send(&self, event: SyncProgress) {
        if self.tx.send(event).await.is_err() {
            tracing::debug!("Progress subscriber is gone, dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn node_ref() -> NodeRef {
        NodeRef {
            id: NodeId(1),
            fqdn: "a.example.com".to_string(),
            depth: 1,
            tree_position: 2,
        }
    }

    #[test]
    fn percentages_use_done_over_total() {
        let event = SyncProgress::new(node_ref(), "rpm-base", SyncState::Running).with_content(
            ContentProgress {
                size_total: 400,
                size_left: 100,
                items_total: 8,
                items_left: 6,
            },
        );
        assert_eq!(event.items_done(), 2);
        assert_eq!(event.items_percent(), 25);
        assert_eq!(event.size_percent(), 75);
    }

    #[test]
    fn percentages_are_complete_when_nothing_to_transfer() {
        let event = SyncProgress::new(node_ref(), "rpm-base", SyncState::Running);
        assert_eq!(event.items_percent(), 100);
        assert_eq!(event.size_percent(), 100);
    }

    #[test]
    fn states_render_lowercase_and_know_terminality() {
        assert_eq!(SyncState::Skipped.to_string(), "skipped");
        assert_eq!(SyncState::Init.to_string(), "init");
        assert!(SyncState::Error.is_terminal());
        assert!(!SyncState::Waiting.is_terminal());
    }

    #[test]
    fn emit_invokes_callback_when_present() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ProgressCallback = Box::new(move |event| {
            sink.lock().expect("lock").push(event.state);
        });

        emit(Some(&callback), SyncProgress::new(node_ref(), "r", SyncState::Finished));
        emit(None, SyncProgress::new(node_ref(), "r", SyncState::Error));

        assert_eq!(*seen.lock().expect("lock"), vec![SyncState::Finished]);
    }

    #[tokio::test]
    async fn sender_tolerates_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        ProgressSender::new(tx)
            .send(SyncProgress::new(node_ref(), "r", SyncState::Init))
            .await;
    }
}
