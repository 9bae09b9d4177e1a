//! Diff artifacts returned by mutating model operations.
use arbor_tree::{NodeId, TreeNode};
use serde_json::Value;

/// Something a mutation took out of the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum RemovedItem {
    /// A detached subtree.
    Node(TreeNode),
    /// An attribute deleted from a node that stays in the tree.
    Attribute { owner: NodeId, name: String, value: Value },
    /// The value of a node that stays in the tree.
    Value { node: NodeId, value: Value },
}

/// What a model operation did to the tree.
///
/// `added` handles are valid right after the operation, until the next
/// structural change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeChange {
    pub key: String,
    pub added: Vec<NodeId>,
    pub changed: usize,
    pub removed: Vec<RemovedItem>,
}

impl TreeChange {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed == 0 && self.removed.is_empty()
    }

    /// The subtrees that were detached, skipping attribute and value removals.
    pub fn removed_nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.removed.iter().filter_map(|item| match item {
            RemovedItem::Node(node) => Some(node),
            _ => None,
        })
    }
}
