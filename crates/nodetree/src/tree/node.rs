//! Mirror nodes and the error state they accumulate during a sync run.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Deserialize;

use crate::service::{Credentials, RemoteRepository};
use crate::sync::SyncError;

/// Index of a node inside the arena of the [`Stage`](super::Stage) that owns it.
///
/// Ids are only meaningful for the stage that produced them. A filtered copy
/// of a stage assigns fresh ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of the node in its stage's arena.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node as written in the stage tree file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub fqdn: String,
    pub api_user: Option<String>,
    pub api_passwd: Option<String>,
    pub tags: Vec<String>,
    pub children: Vec<NodeConfig>,
}

impl NodeConfig {
    /// Create a node config with the given fqdn and no children.
    pub fn new(fqdn: impl Into<String>) -> Self {
        Self {
            fqdn: fqdn.into(),
            ..Self::default()
        }
    }

    /// Builder: add tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Builder: append a child.
    #[must_use]
    pub fn with_child(mut self, child: NodeConfig) -> Self {
        self.children.push(child);
        self
    }

    /// Builder: set credentials for this node only.
    #[must_use]
    pub fn with_credentials(mut self, user: impl Into<String>, passwd: impl Into<String>) -> Self {
        self.api_user = Some(user.into());
        self.api_passwd = Some(passwd.into());
        self
    }
}

#[derive(Debug, Default)]
struct NodeStateInner {
    errors: Vec<SyncError>,
    repository_errors: BTreeMap<String, SyncError>,
    repositories: Option<Vec<RemoteRepository>>,
}

/// Mutable per-run state of a node.
///
/// Written by the node's own sync task and read by its descendants, so every
/// accessor clones out of the lock instead of handing out guards.
#[derive(Debug, Default)]
pub struct NodeState {
    inner: RwLock<NodeStateInner>,
}

impl NodeState {
    fn read(&self) -> RwLockReadGuard<'_, NodeStateInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, NodeStateInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Node-level errors in the order they were recorded.
    #[must_use]
    pub fn errors(&self) -> Vec<SyncError> {
        self.read().errors.clone()
    }

    /// Errors keyed by repository name.
    #[must_use]
    pub fn repository_errors(&self) -> BTreeMap<String, SyncError> {
        self.read().repository_errors.clone()
    }

    #[must_use]
    pub fn repository_error(&self, repository: &str) -> Option<SyncError> {
        self.read().repository_errors.get(repository).cloned()
    }

    #[must_use]
    pub fn has_repository_error(&self, repository: &str) -> bool {
        self.read().repository_errors.contains_key(repository)
    }

    /// True if any node-level or repository-level error was recorded.
    #[must_use]
    pub fn has_error(&self) -> bool {
        let inner = self.read();
        !inner.errors.is_empty() || !inner.repository_errors.is_empty()
    }

    /// True if listing the node's repositories failed, which fails every
    /// repository on it.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        self.read()
            .errors
            .iter()
            .any(|e| matches!(e, SyncError::Unreachable { .. }))
    }

    pub fn push_error(&self, error: SyncError) {
        self.write().errors.push(error);
    }

    /// Record an error for a repository. The first error recorded wins.
    pub fn set_repository_error(&self, repository: impl Into<String>, error: SyncError) {
        self.write()
            .repository_errors
            .entry(repository.into())
            .or_insert(error);
    }

    /// Repositories the node reported during this run, if it was asked.
    #[must_use]
    pub fn repositories(&self) -> Option<Vec<RemoteRepository>> {
        self.read().repositories.clone()
    }

    pub fn set_repositories(&self, repositories: Vec<RemoteRepository>) {
        self.write().repositories = Some(repositories);
    }

    /// Forget everything recorded by a previous run.
    pub fn reset(&self) {
        *self.write() = NodeStateInner::default();
    }
}

/// A mirror host in a stage tree.
#[derive(Debug)]
pub struct Node {
    pub fqdn: String,
    pub api_user: Option<String>,
    pub api_passwd: Option<String>,
    pub tags: Vec<String>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) depth: usize,
    pub(crate) tree_position: usize,
    pub(crate) state: NodeState,
}

impl Node {
    pub(crate) fn from_config(config: &NodeConfig) -> Self {
        Self {
            fqdn: config.fqdn.clone(),
            api_user: config.api_user.clone(),
            api_passwd: config.api_passwd.clone(),
            tags: config.tags.clone(),
            parent: None,
            children: Vec::new(),
            depth: 0,
            tree_position: 0,
            state: NodeState::default(),
        }
    }

    /// Copy identity and configuration with empty links and fresh state.
    pub(crate) fn detached(&self) -> Self {
        Self {
            fqdn: self.fqdn.clone(),
            api_user: self.api_user.clone(),
            api_passwd: self.api_passwd.clone(),
            tags: self.tags.clone(),
            parent: None,
            children: Vec::new(),
            depth: 0,
            tree_position: 0,
            state: NodeState::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Distance from the root; the root has depth 0.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// 1-based pre-order position within the stage.
    #[inline]
    #[must_use]
    pub fn tree_position(&self) -> usize {
        self.tree_position
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> &NodeState {
        &self.state
    }

    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    #[inline]
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Node-specific credentials. Both halves must be set.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.api_user, &self.api_passwd) {
            (Some(user), Some(passwd)) => Some(Credentials::new(user, passwd)),
            _ => None,
        }
    }

    /// True if the fqdn equals any of `fqdns`.
    #[must_use]
    pub fn matches_fqdns(&self, fqdns: &[String]) -> bool {
        fqdns.iter().any(|f| *f == self.fqdn)
    }

    /// True if any of the node's tags equals any of `tags`.
    #[must_use]
    pub fn contains_tags(&self, tags: &[String]) -> bool {
        self.tags.iter().any(|t| tags.contains(t))
    }

    /// True if the node matches either filter list directly.
    #[must_use]
    pub fn matches(&self, fqdns: &[String], tags: &[String]) -> bool {
        self.matches_fqdns(fqdns) || self.contains_tags(tags)
    }
}
