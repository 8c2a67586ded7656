//! A named tree of mirror nodes.

use super::node::{Node, NodeConfig, NodeId};

/// A rooted tree of nodes with its pre-order index.
///
/// Nodes live in an arena and reference each other by [`NodeId`]. The index
/// (`depth`, `tree_position`, parent links, leaf list, pre-order list) is
/// built by [`Stage::init`] and is always consistent after construction.
#[derive(Debug)]
pub struct Stage {
    name: String,
    arena: Vec<Node>,
    root: NodeId,
    leafs: Vec<NodeId>,
    nodes: Vec<NodeId>,
}

impl Stage {
    /// Build and index a stage from its configured root.
    pub fn from_config(name: impl Into<String>, root: &NodeConfig) -> Self {
        let mut arena = Vec::new();
        let root = push_config(&mut arena, root);
        Self::from_arena(name.into(), arena, root)
    }

    pub(crate) fn from_arena(name: String, arena: Vec<Node>, root: NodeId) -> Self {
        let mut stage = Self {
            name,
            arena,
            root,
            leafs: Vec::new(),
            nodes: Vec::new(),
        };
        stage.init();
        stage
    }

    /// Recompute parent links, depths, pre-order positions and the leaf list.
    ///
    /// Idempotent: running it twice produces the same index.
    pub fn init(&mut self) {
        self.leafs.clear();
        self.nodes.clear();

        let mut position = 0;
        let mut stack = vec![(self.root, None, 0usize)];
        while let Some((id, parent, depth)) = stack.pop() {
            position += 1;
            let node = &mut self.arena[id.0];
            node.parent = parent;
            node.depth = depth;
            node.tree_position = position;

            self.nodes.push(id);
            if node.children.is_empty() {
                self.leafs.push(id);
            }
            for &child in node.children.iter().rev() {
                stack.push((child, Some(id), depth + 1));
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Look up a node by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this stage.
    #[inline]
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.arena[id.0]
    }

    /// All nodes in pre-order, root first.
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Nodes without children, in pre-order.
    #[inline]
    #[must_use]
    pub fn leafs(&self) -> &[NodeId] {
        &self.leafs
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn node_by_fqdn(&self, fqdn: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .copied()
            .find(|&id| self.node(id).fqdn == fqdn)
    }

    /// Ancestors of `id`, nearest first, ending with the root.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            stage: self,
            next: self.node(id).parent,
        }
    }

    /// The ancestor of `id` (or `id` itself) sitting at `depth`.
    #[must_use]
    pub fn ancestor_at_depth(&self, id: NodeId, depth: usize) -> Option<NodeId> {
        let node = self.node(id);
        if depth > node.depth {
            return None;
        }
        if depth == node.depth {
            return Some(id);
        }
        self.ancestors(id).find(|&a| self.node(a).depth == depth)
    }

    /// All nodes below `id` in pre-order, excluding `id`.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.node(id).children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.node(next).children.iter().rev().copied());
        }
        out
    }

    /// Nearest ancestor that recorded an error for `repository`, or that
    /// could not be reached at all.
    #[must_use]
    pub fn failed_ancestor(&self, id: NodeId, repository: &str) -> Option<NodeId> {
        self.ancestors(id).find(|&a| {
            let state = &self.node(a).state;
            state.has_repository_error(repository) || state.is_unreachable()
        })
    }

    /// True if `id` is the last child of its parent. The root counts as last.
    #[must_use]
    pub fn is_last_sibling(&self, id: NodeId) -> bool {
        match self.node(id).parent {
            Some(parent) => self.node(parent).children.last() == Some(&id),
            None => true,
        }
    }

    /// Clear errors and listings from a previous run.
    pub fn reset_sync_state(&self) {
        for node in &self.arena {
            node.state.reset();
        }
    }
}

fn push_config(arena: &mut Vec<Node>, config: &NodeConfig) -> NodeId {
    let id = NodeId(arena.len());
    arena.push(Node::from_config(config));
    let children = config
        .children
        .iter()
        .map(|child| push_config(arena, child))
        .collect();
    arena[id.0].children = children;
    id
}

/// Iterator over a node's ancestors, see [`Stage::ancestors`].
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    stage: &'a Stage,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.stage.node(current).parent;
        Some(current)
    }
}
