//! Aggregated errors of a finished sync run.

use std::collections::BTreeMap;
use std::fmt;

use super::error::SyncError;
use crate::tree::Stage;

/// Errors recorded on one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeErrorReport {
    pub fqdn: String,
    pub depth: usize,
    pub errors: Vec<SyncError>,
    pub repository_errors: BTreeMap<String, SyncError>,
}

/// Every node that recorded an error, in pre-order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncErrors {
    pub nodes: Vec<NodeErrorReport>,
}

impl SyncErrors {
    /// Collect the current error state of every node in `stage`.
    #[must_use]
    pub fn from_stage(stage: &Stage) -> Self {
        let nodes = stage
            .nodes()
            .iter()
            .map(|&id| stage.node(id))
            .filter(|node| node.state().has_error())
            .map(|node| NodeErrorReport {
                fqdn: node.fqdn.clone(),
                depth: node.depth(),
                errors: node.state().errors(),
                repository_errors: node.state().repository_errors(),
            })
            .collect();
        Self { nodes }
    }

    /// True if any node recorded a node-level or repository-level error.
    #[must_use]
    pub fn any(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// Number of failed (node, repository) pairs.
    #[must_use]
    pub fn failed_repositories(&self) -> usize {
        self.nodes.iter().map(|n| n.repository_errors.len()).sum()
    }

    #[must_use]
    pub fn node(&self, fqdn: &str) -> Option<&NodeErrorReport> {
        self.nodes.iter().find(|n| n.fqdn == fqdn)
    }
}

impl fmt::Display for SyncErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}:", node.fqdn)?;
            // Repository failures are also kept at node level; print them once.
            for error in node
                .errors
                .iter()
                .filter(|e| !node.repository_errors.values().any(|r| r == *e))
            {
                writeln!(f, "  - {error}")?;
            }
            for (repository, error) in &node.repository_errors {
                writeln!(f, "  - {repository}: {error}")?;
            }
        }
        Ok(())
    }
}

impl Stage {
    /// Errors recorded during the last sync run.
    #[must_use]
    pub fn sync_errors(&self) -> SyncErrors {
        SyncErrors::from_stage(self)
    }
}
