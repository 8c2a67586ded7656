//! Text rendering of a stage as a box-drawing tree.

use super::node::{Node, NodeId};
use super::stage::Stage;

const BRANCH: &str = "├─ ";
const LAST_BRANCH: &str = "└─ ";
const PIPE: &str = "│  ";
const GAP: &str = "   ";

impl Stage {
    /// Connector prefix drawn in front of a node's label.
    #[must_use]
    pub fn tree_prefix(&self, id: NodeId) -> String {
        let depth = self.node(id).depth();
        if depth == 0 {
            return String::new();
        }

        let mut prefix = String::new();
        for level in 1..depth {
            let last = self
                .ancestor_at_depth(id, level)
                .is_none_or(|ancestor| self.is_last_sibling(ancestor));
            prefix.push_str(if last { GAP } else { PIPE });
        }
        prefix.push_str(if self.is_last_sibling(id) {
            LAST_BRANCH
        } else {
            BRANCH
        });
        prefix
    }

    /// One line per node in pre-order, labelled by `label`.
    pub fn tree_lines_with<F>(&self, mut label: F) -> Vec<String>
    where
        F: FnMut(&Node) -> String,
    {
        self.nodes()
            .iter()
            .map(|&id| format!("{}{}", self.tree_prefix(id), label(self.node(id))))
            .collect()
    }

    /// The tree with fqdns and tags, one node per line.
    #[must_use]
    pub fn render_tree(&self) -> String {
        self.tree_lines_with(|node| {
            if node.tags.is_empty() {
                node.fqdn.clone()
            } else {
                format!("{} [{}]", node.fqdn, node.tags.join(", "))
            }
        })
        .join("\n")
    }
}
