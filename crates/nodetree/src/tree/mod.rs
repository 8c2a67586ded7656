//! Stage trees: nodes, indexing, filtering and rendering.
//!
//! - [`node`] - `Node`, `NodeId`, per-run `NodeState`
//! - [`stage`] - `Stage`, the indexed arena-backed tree
//! - [`filter`] - `Stage::filter`, pruning to a selection
//! - [`render`] - box-drawing text output
//! - [`stage_tree`] - the deserializable stage tree file

mod filter;
pub mod node;
mod render;
pub mod stage;
pub mod stage_tree;

pub use node::{Node, NodeConfig, NodeId, NodeState};
pub use stage::{Ancestors, Stage};
pub use stage_tree::{StageConfig, StageTree, StageTreeError};
