//! Configuration node trees.
//!
//! [`NodeHandler`] is the read-only view the path engine works against,
//! [`NodeTree`] the arena that stores a configuration, and [`TreeNode`] the
//! owned form nodes take while they are outside of a tree.

pub mod arena;
pub mod json;
pub mod node;
pub mod walker;

pub use arena::{NodeId, NodeTree, StaleNodeError};
pub use node::{NodeHandler, TreeNode};
pub use walker::{FnVisitor, NodeVisitor, WalkControl, is_subtree_defined, walk_bfs, walk_dfs};
