//! Pruning a stage down to the subtree relevant to a selection.

use super::node::{Node, NodeId};
use super::stage::Stage;

impl Stage {
    /// Return a re-indexed copy keeping only what the selection needs.
    ///
    /// A non-root node is kept iff it, or any node below it in the original
    /// tree, matches one of `fqdns` or carries one of `tags`. The root is
    /// always kept. Kept nodes retain their full ancestor chain, so a sync
    /// of the copy still flows from the root down. Empty `fqdns` and `tags`
    /// keep the root alone.
    ///
    /// The copy shares no state with `self`.
    #[must_use]
    pub fn filter(&self, fqdns: &[String], tags: &[String]) -> Stage {
        let mut arena = Vec::with_capacity(self.len());
        let root = self.copy_relevant(self.root(), fqdns, tags, &mut arena);
        Stage::from_arena(self.name().to_string(), arena, root)
    }

    /// True if `id` or any of its descendants matches the selection.
    #[must_use]
    pub fn is_relevant(&self, id: NodeId, fqdns: &[String], tags: &[String]) -> bool {
        self.node(id).matches(fqdns, tags)
            || self
                .descendants(id)
                .into_iter()
                .any(|d| self.node(d).matches(fqdns, tags))
    }

    fn copy_relevant(
        &self,
        id: NodeId,
        fqdns: &[String],
        tags: &[String],
        arena: &mut Vec<Node>,
    ) -> NodeId {
        let copy = NodeId(arena.len());
        arena.push(self.node(id).detached());

        let children = self
            .node(id)
            .children()
            .iter()
            .copied()
            .filter(|&child| self.is_relevant(child, fqdns, tags))
            .map(|child| self.copy_relevant(child, fqdns, tags, arena))
            .collect();
        arena[copy.0].children = children;
        copy
    }
}

#[cfg(test)]
mod tests {
    use crate::tree::NodeConfig;

    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn fqdns(stage: &Stage) -> Vec<String> {
        stage
            .nodes()
            .iter()
            .map(|&id| stage.node(id).fqdn.clone())
            .collect()
    }

    /// ```text
    /// R
    /// ├─ A [eu]
    /// │  ├─ A1 [prod]
    /// │  └─ A2
    /// └─ B
    ///    └─ B1 [prod]
    /// ```
    fn sample() -> Stage {
        let root = NodeConfig::new("R")
            .with_child(
                NodeConfig::new("A")
                    .with_tags(["eu"])
                    .with_child(NodeConfig::new("A1").with_tags(["prod"]))
                    .with_child(NodeConfig::new("A2")),
            )
            .with_child(NodeConfig::new("B").with_child(NodeConfig::new("B1").with_tags(["prod"])));
        Stage::from_config("prod", &root)
    }

    #[test]
    fn tag_filter_keeps_matches_and_their_ancestors() {
        let stage = sample();
        let filtered = stage.filter(&[], &strings(&["prod"]));

        assert_eq!(fqdns(&filtered), vec!["R", "A", "A1", "B", "B1"]);
        let leafs: Vec<_> = filtered
            .leafs()
            .iter()
            .map(|&l| filtered.node(l).fqdn.clone())
            .collect();
        assert_eq!(leafs, vec!["A1", "B1"]);
    }

    #[test]
    fn fqdn_filter_keeps_single_path() {
        let stage = sample();
        let filtered = stage.filter(&strings(&["A2"]), &[]);
        assert_eq!(fqdns(&filtered), vec!["R", "A", "A2"]);
    }

    #[test]
    fn matching_inner_node_keeps_it_without_its_unmatched_children() {
        let stage = sample();
        let filtered = stage.filter(&[], &strings(&["eu"]));
        assert_eq!(fqdns(&filtered), vec!["R", "A"]);
        let a = filtered.node_by_fqdn("A").expect("A kept");
        assert!(filtered.node(a).is_leaf());
    }

    #[test]
    fn fqdn_and_tag_filters_are_combined() {
        let stage = sample();
        let filtered = stage.filter(&strings(&["A2"]), &strings(&["eu"]));
        assert_eq!(fqdns(&filtered), vec!["R", "A", "A2"]);
    }

    #[test]
    fn empty_filters_keep_only_the_root() {
        let stage = sample();
        let filtered = stage.filter(&[], &[]);
        assert_eq!(fqdns(&filtered), vec!["R"]);
        assert_eq!(filtered.leafs(), &[filtered.root()]);
    }

    #[test]
    fn filtered_copy_is_reindexed() {
        let stage = sample();
        let filtered = stage.filter(&strings(&["B1"]), &[]);
        let b1 = filtered.node_by_fqdn("B1").expect("B1 kept");
        assert_eq!(filtered.node(b1).depth(), 2);
        assert_eq!(filtered.node(b1).tree_position(), 3);
    }

    #[test]
    fn every_kept_node_is_relevant_and_every_relevant_node_is_kept() {
        let stage = sample();
        let fq = strings(&["A2"]);
        let tags = strings(&["prod"]);
        let filtered = stage.filter(&fq, &tags);
        let kept = fqdns(&filtered);

        for &id in stage.nodes().iter().skip(1) {
            let fqdn = &stage.node(id).fqdn;
            assert_eq!(
                kept.contains(fqdn),
                stage.is_relevant(id, &fq, &tags),
                "mismatch for {fqdn}"
            );
        }
    }

    #[test]
    fn filtered_copy_does_not_share_state() {
        let stage = sample();
        let filtered = stage.filter(&[], &strings(&["prod"]));
        let a1 = filtered.node_by_fqdn("A1").expect("A1 kept");
        filtered.node(a1).state().push_error(crate::sync::SyncError::TaskPanicked {
            message: "boom".to_string(),
        });

        let original = stage.node_by_fqdn("A1").expect("A1 exists");
        assert!(!stage.node(original).state().has_error());
    }
}
