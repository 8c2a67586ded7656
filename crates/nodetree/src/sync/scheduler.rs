//! Dependency-ordered execution of one task per node.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::Instrument;

use super::error::SyncError;
use crate::tree::{NodeId, Stage};

/// Run `task` once for every node of `stage`, each node after its parent.
///
/// Every node gets its own tokio task, gated on a oneshot released by the
/// parent's task when the parent's work returns. The root's gate starts open.
/// Siblings and unrelated subtrees run concurrently.
///
/// A returned error is appended to the node's errors; children are released
/// either way and decide per repository what to skip. A panicking task is
/// recorded as [`SyncError::TaskPanicked`] on its node, and its children are
/// released when its senders are dropped.
///
/// Returns after every node task has finished.
pub async fn run_ordered<F, Fut>(stage: Arc<Stage>, task: F)
where
    F: Fn(Arc<Stage>, NodeId) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), SyncError>> + Send + 'static,
{
    let task = Arc::new(task);

    let mut gates: HashMap<NodeId, oneshot::Receiver<()>> = HashMap::with_capacity(stage.len());
    let mut releases: HashMap<NodeId, oneshot::Sender<()>> = HashMap::with_capacity(stage.len());
    for &id in stage.nodes() {
        let (tx, rx) = oneshot::channel();
        gates.insert(id, rx);
        releases.insert(id, tx);
    }
    if let Some(root) = releases.remove(&stage.root()) {
        let _ = root.send(());
    }

    let mut handles = Vec::with_capacity(stage.len());
    for &id in stage.nodes() {
        let Some(gate) = gates.remove(&id) else {
            continue;
        };
        let children: Vec<oneshot::Sender<()>> = stage
            .node(id)
            .children()
            .iter()
            .filter_map(|child| releases.remove(child))
            .collect();

        let stage = Arc::clone(&stage);
        let task = Arc::clone(&task);
        let span = tracing::info_span!("node", fqdn = %stage.node(id).fqdn);

        let handle = tokio::spawn(
            async move {
                // Err means the parent's task died before releasing; proceed anyway.
                let _ = gate.await;

                tracing::debug!("Node released");
                if let Err(e) = task(Arc::clone(&stage), id).await {
                    tracing::warn!(error = %e, "Node sync failed");
                    stage.node(id).state().push_error(e);
                }

                for child in children {
                    let _ = child.send(());
                }
            }
            .instrument(span),
        );
        handles.push((id, handle));
    }

    for (id, handle) in handles {
        if let Err(e) = handle.await {
            tracing::error!(fqdn = %stage.node(id).fqdn, "Task panic: {}", e);
            stage.node(id).state().push_error(SyncError::TaskPanicked {
                message: e.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::tree::NodeConfig;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Start(NodeId),
        End(NodeId),
    }

    /// ```text
    /// root
    /// ├─ a
    /// │  ├─ a1
    /// │  └─ a2
    /// │     └─ a2x
    /// ├─ b
    /// │  └─ b1
    /// └─ c
    /// ```
    fn sample() -> Arc<Stage> {
        let root = NodeConfig::new("root")
            .with_child(
                NodeConfig::new("a")
                    .with_child(NodeConfig::new("a1"))
                    .with_child(NodeConfig::new("a2").with_child(NodeConfig::new("a2x"))),
            )
            .with_child(NodeConfig::new("b").with_child(NodeConfig::new("b1")))
            .with_child(NodeConfig::new("c"));
        Arc::new(Stage::from_config("prod", &root))
    }

    /// Deterministic pseudo-random delay per node and round.
    fn jitter(id: NodeId, round: u64) -> Duration {
        let mut x = (id.index() as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ round;
        x ^= x >> 29;
        x = x.wrapping_mul(0xBF58_476D_1CE4_E5B9);
        x ^= x >> 32;
        Duration::from_millis(x % 50)
    }

    fn position(marks: &[Mark], mark: Mark) -> usize {
        marks
            .iter()
            .position(|m| *m == mark)
            .unwrap_or_else(|| panic!("missing mark {mark:?}"))
    }

    #[tokio::test(start_paused = true)]
    async fn parents_finish_before_children_start() {
        for round in 0..20 {
            let stage = sample();
            let marks = Arc::new(Mutex::new(Vec::new()));
            let recorder = Arc::clone(&marks);

            tokio::time::timeout(
                Duration::from_secs(10),
                run_ordered(Arc::clone(&stage), move |_stage, id| {
                    let marks = Arc::clone(&recorder);
                    async move {
                        marks.lock().expect("lock").push(Mark::Start(id));
                        tokio::time::sleep(jitter(id, round)).await;
                        marks.lock().expect("lock").push(Mark::End(id));
                        Ok(())
                    }
                }),
            )
            .await
            .expect("run should finish");

            let marks = marks.lock().expect("lock").clone();
            assert_eq!(marks.len(), stage.len() * 2);
            for &id in stage.nodes() {
                if let Some(parent) = stage.node(id).parent() {
                    assert!(
                        position(&marks, Mark::End(parent)) < position(&marks, Mark::Start(id)),
                        "round {round}: {} started before its parent ended",
                        stage.node(id).fqdn
                    );
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn siblings_run_concurrently() {
        let stage = sample();
        let started = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&started);

        run_ordered(Arc::clone(&stage), move |_stage, id| {
            let started = Arc::clone(&recorder);
            async move {
                started
                    .lock()
                    .expect("lock")
                    .push((id, tokio::time::Instant::now()));
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(())
            }
        })
        .await;

        let started = started.lock().expect("lock").clone();
        let at = |fqdn: &str| {
            let id = stage.node_by_fqdn(fqdn).expect("node exists");
            started
                .iter()
                .find(|(n, _)| *n == id)
                .map(|(_, t)| *t)
                .expect("node started")
        };
        assert_eq!(at("a"), at("b"));
        assert_eq!(at("a"), at("c"));
        assert_eq!(at("a1"), at("a2"));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_node_records_error_and_still_releases_children() {
        let stage = sample();
        let ran = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&ran);

        run_ordered(Arc::clone(&stage), move |stage, id| {
            let ran = Arc::clone(&recorder);
            async move {
                ran.lock().expect("lock").push(id);
                if stage.node(id).fqdn == "a" {
                    return Err(SyncError::Unreachable {
                        fqdn: "a".to_string(),
                        message: "refused".to_string(),
                    });
                }
                Ok(())
            }
        })
        .await;

        assert_eq!(ran.lock().expect("lock").len(), stage.len());
        let a = stage.node_by_fqdn("a").expect("a exists");
        assert!(matches!(
            stage.node(a).state().errors().as_slice(),
            [SyncError::Unreachable { .. }]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_node_is_recorded_and_children_still_run() {
        let stage = sample();
        let ran = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&ran);

        run_ordered(Arc::clone(&stage), move |stage, id| {
            let ran = Arc::clone(&recorder);
            async move {
                if stage.node(id).fqdn == "b" {
                    panic!("node task exploded");
                }
                ran.lock().expect("lock").push(stage.node(id).fqdn.clone());
                Ok(())
            }
        })
        .await;

        let b = stage.node_by_fqdn("b").expect("b exists");
        assert!(matches!(
            stage.node(b).state().errors().as_slice(),
            [SyncError::TaskPanicked { .. }]
        ));
        assert!(ran.lock().expect("lock").contains(&"b1".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn single_node_stage_runs_once() {
        let stage = Arc::new(Stage::from_config("solo", &NodeConfig::new("only")));
        let count = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&count);

        run_ordered(stage, move |_stage, _id| {
            let count = Arc::clone(&counter);
            async move {
                *count.lock().expect("lock") += 1;
                Ok(())
            }
        })
        .await;

        assert_eq!(*count.lock().expect("lock"), 1);
    }
}
