//! Defines the core abstraction for a navigable, read-only configuration tree.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use std::hash::Hash;

/// The universal contract for reading a hierarchical configuration tree.
///
/// The expression engine and the tree walker are written exclusively against
/// this trait, so they work on any node representation that can answer these
/// questions. Nodes are addressed through a lightweight `Node` handle; the
/// handler owns (or borrows) the storage behind it.
pub trait NodeHandler {
    /// A cheap, copyable handle identifying one node of the tree.
    type Node: Debug + Clone + Copy + PartialEq + Eq + Hash;

    /// The root of the tree this handler reads.
    fn root(&self) -> Self::Node;

    /// The name of the node. The root of a tree may have an empty name.
    fn name(&self, node: Self::Node) -> &str;

    /// The value of the node, if it carries one.
    fn value(&self, node: Self::Node) -> Option<&Value>;

    /// A reference to the parent node. Returns `None` for the root.
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// An iterator over the child nodes of this node, in document order.
    fn children<'s>(&'s self, node: Self::Node) -> Box<dyn Iterator<Item = Self::Node> + 's>;

    /// The names of all attributes defined on this node, in insertion order.
    fn attribute_names<'s>(&'s self, node: Self::Node) -> Box<dyn Iterator<Item = &'s str> + 's>;

    /// The value of the named attribute, if it exists.
    fn attribute_value(&self, node: Self::Node, name: &str) -> Option<&Value>;

    /// The children of this node carrying the given name, in document order.
    fn children_named<'s>(
        &'s self,
        node: Self::Node,
        name: &'s str,
    ) -> Box<dyn Iterator<Item = Self::Node> + 's> {
        Box::new(
            self.children(node)
                .filter(move |&child| self.name(child) == name),
        )
    }

    fn child_count(&self, node: Self::Node) -> usize {
        self.children(node).count()
    }

    fn matching_children_count(&self, node: Self::Node, name: &str) -> usize {
        self.children_named(node, name).count()
    }

    /// The `index`-th (0-based) child with the given name.
    fn child_at(&self, node: Self::Node, name: &str, index: usize) -> Option<Self::Node> {
        self.children_named(node, name).nth(index)
    }

    fn has_attributes(&self, node: Self::Node) -> bool {
        self.attribute_names(node).next().is_some()
    }

    /// A node is defined when it carries a non-null value or at least one attribute.
    fn is_defined(&self, node: Self::Node) -> bool {
        self.value(node).is_some_and(|v| !v.is_null()) || self.has_attributes(node)
    }
}

/// An owned node that is not part of any tree.
///
/// This is the only way content moves into or out of a [`NodeTree`](crate::NodeTree):
/// inserting copies it into the arena, exporting copies it out. A node can
/// therefore never be attached to two trees at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<(String, Value)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the value; `null` leaves the node without one.
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into()).filter(|v| !v.is_null());
        self
    }

    /// Sets an attribute, replacing an existing one of the same name.
    /// A `null` value removes the attribute instead.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        if value.is_null() {
            self.attributes.retain(|(n, _)| *n != name);
            return self;
        }
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
        self
    }

    pub fn with_child(mut self, child: TreeNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = TreeNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Finds the first direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&TreeNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Counts this node and all of its descendants.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::node_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_replaces_existing_attribute() {
        let node = TreeNode::new("field")
            .with_attribute("type", "int")
            .with_attribute("type", "long");
        assert_eq!(node.attributes.len(), 1);
        assert_eq!(node.attribute("type"), Some(&json!("long")));
    }

    #[test]
    fn node_count_includes_descendants() {
        let node = TreeNode::new("a")
            .with_child(TreeNode::new("b").with_child(TreeNode::new("c")))
            .with_child(TreeNode::new("d"));
        assert_eq!(node.node_count(), 4);
        assert_eq!(node.child("d").map(|d| d.name.as_str()), Some("d"));
    }

    #[test]
    fn null_builders_leave_nothing_behind() {
        let node = TreeNode::new("a")
            .with_value(Value::Null)
            .with_attribute("x", 1)
            .with_attribute("x", Value::Null)
            .with_attribute("y", Value::Null);
        assert_eq!(node.value, None);
        assert!(node.attributes.is_empty());
    }
}
