//! Stage sync entrypoint: scheduler, state machine and progress fan-in.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::machine::sync_node;
use super::progress::{ProgressCallback, ProgressSender, emit};
use super::report::SyncErrors;
use super::scheduler::run_ordered;
use super::types::{PROGRESS_CHANNEL_CAPACITY, SyncOptions};
use crate::service::RepositorySyncService;
use crate::tree::Stage;

/// Sync the selected repositories on every node of `stage`, parents first.
///
/// Errors from a previous run are cleared first. Progress events reach
/// `on_progress` from a single subscriber task, in the order node tasks
/// produced them; every event has been delivered when this returns.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use nodetree::sync::{SyncOptions, sync_stage};
///
/// let stage = Arc::new(tree.stage("prod")?.filter(&fqdns, &tags));
/// let errors = sync_stage(&stage, service, SyncOptions::named(["rpm-base"]), None).await;
/// if errors.any() {
///     eprintln!("{errors}");
/// }
/// ```
pub async fn sync_stage(
    stage: &Arc<Stage>,
    service: Arc<dyn RepositorySyncService>,
    options: SyncOptions,
    on_progress: Option<ProgressCallback>,
) -> SyncErrors {
    stage.reset_sync_state();

    let (tx, mut rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
    let subscriber = tokio::spawn(async move {
        let mut delivered = 0usize;
        while let Some(event) = rx.recv().await {
            emit(on_progress.as_ref(), event);
            delivered += 1;
        }
        delivered
    });

    tracing::info!(stage = stage.name(), nodes = stage.len(), "Starting stage sync");

    let options = Arc::new(options);
    let progress = ProgressSender::new(tx);
    run_ordered(Arc::clone(stage), move |stage, id| {
        let service = Arc::clone(&service);
        let options = Arc::clone(&options);
        let progress = progress.clone();
        async move { sync_node(&stage, id, service.as_ref(), &options, &progress).await }
    })
    .await;

    // The last sender went away with the scheduler's task closure.
    match subscriber.await {
        Ok(delivered) => tracing::debug!(delivered, "Progress subscriber drained"),
        Err(e) => tracing::error!("Progress subscriber panic: {}", e),
    }

    let errors = stage.sync_errors();
    tracing::info!(
        stage = stage.name(),
        failed_nodes = errors.nodes.len(),
        failed_repositories = errors.failed_repositories(),
        "Stage sync complete"
    );
    errors
}
