//! The arena-backed tree that configurations are stored in.
//!
//! Nodes live in a flat slot vector and refer to each other by [`NodeId`].
//! A node is owned by exactly one parent; the parent link is just an index,
//! so detaching or re-attaching a node is an index update.

use crate::node::{NodeHandler, TreeNode};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// A stable handle to a node slot in a [`NodeTree`].
///
/// Handles are only meaningful for the tree that produced them and become
/// stale once the node is removed (its slot may be reused later).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A handle used with a tree that does not (or no longer) hold its node.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Node {0} is not part of this tree")]
pub struct StaleNodeError(pub NodeId);

#[derive(Debug, Clone)]
struct NodeData {
    name: String,
    value: Option<Value>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: Vec<(String, Value)>,
}

impl NodeData {
    fn new(name: String, value: Option<Value>, parent: Option<NodeId>) -> Self {
        Self {
            name,
            value,
            parent,
            children: Vec::new(),
            attributes: Vec::new(),
        }
    }
}

/// A single-rooted tree of configuration nodes.
///
/// `Clone` produces a deep, fully independent copy.
#[derive(Debug, Clone)]
pub struct NodeTree {
    slots: Vec<Option<NodeData>>,
    free: Vec<usize>,
    root: NodeId,
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new("")
    }
}

impl NodeTree {
    /// Creates a tree holding only an empty root with the given name.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            slots: vec![Some(NodeData::new(root_name.into(), None, None))],
            free: Vec::new(),
            root: NodeId(0),
        }
    }

    /// Builds a tree by copying an owned node hierarchy; `root` becomes the root.
    pub fn from_node(root: &TreeNode) -> Self {
        let mut tree = Self::new(root.name.clone());
        let root_id = tree.root;
        tree.copy_content(root_id, root);
        tree
    }

    /// The number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        let root = self.data(self.root);
        root.value.is_none() && root.children.is_empty() && root.attributes.is_empty()
    }

    /// Returns true if `id` refers to a live node of this tree.
    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.slots.get(id.0), Some(Some(_)))
    }

    // Reads through `NodeHandler` take handles the caller got from this
    // tree; a stale one there is a caller bug.
    fn data(&self, id: NodeId) -> &NodeData {
        match self.slots.get(id.0) {
            Some(Some(data)) => data,
            _ => panic!("stale node handle {id}"),
        }
    }

    fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        match self.slots.get_mut(id.0) {
            Some(Some(data)) => data,
            _ => panic!("stale node handle {id}"),
        }
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(data);
                NodeId(slot)
            }
            None => {
                self.slots.push(Some(data));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    // --- Mutation ---
    //
    // Mutators check their handles and report stale ones as errors. A
    // `null` value is stored as "no value", a `null` attribute is removed.

    fn check(&self, id: NodeId) -> Result<(), StaleNodeError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(StaleNodeError(id))
        }
    }

    /// Appends a new child to `parent` and returns its handle.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        value: Option<Value>,
    ) -> Result<NodeId, StaleNodeError> {
        self.check(parent)?;
        let id = self.alloc(NodeData::new(name.into(), non_null(value), Some(parent)));
        self.data_mut(parent).children.push(id);
        Ok(id)
    }

    /// Replaces the value of a node, returning the previous one.
    pub fn set_value(&mut self, id: NodeId, value: Option<Value>) -> Result<Option<Value>, StaleNodeError> {
        self.check(id)?;
        Ok(std::mem::replace(&mut self.data_mut(id).value, non_null(value)))
    }

    /// Sets an attribute, overwriting an existing slot of the same name.
    /// Returns the previous value.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        value: Value,
    ) -> Result<Option<Value>, StaleNodeError> {
        let name = name.into();
        if value.is_null() {
            return self.remove_attribute(id, &name);
        }
        self.check(id)?;
        let attributes = &mut self.data_mut(id).attributes;
        Ok(match attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => Some(std::mem::replace(&mut slot.1, value)),
            None => {
                attributes.push((name, value));
                None
            }
        })
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<Option<Value>, StaleNodeError> {
        self.check(id)?;
        let attributes = &mut self.data_mut(id).attributes;
        Ok(attributes
            .iter()
            .position(|(n, _)| n == name)
            .map(|pos| attributes.remove(pos).1))
    }

    /// Detaches `id` from its parent and frees the whole subtree.
    ///
    /// Returns an owned snapshot of what was removed, or `None` when `id` is
    /// the root (the root can only be emptied, see [`NodeTree::clear_node`]).
    pub fn remove_node(&mut self, id: NodeId) -> Result<Option<TreeNode>, StaleNodeError> {
        self.check(id)?;
        let Some(parent) = self.data(id).parent else {
            return Ok(None);
        };
        let snapshot = self.subtree(id)?;
        self.data_mut(parent).children.retain(|&c| c != id);
        self.free_subtree(id);
        log::trace!("removed node {} '{}' from {}", id, snapshot.name, parent);
        Ok(Some(snapshot))
    }

    /// Drops the value, attributes and children of a node but keeps the node.
    pub fn clear_node(&mut self, id: NodeId) -> Result<TreeNode, StaleNodeError> {
        let snapshot = self.subtree(id)?;
        let children = std::mem::take(&mut self.data_mut(id).children);
        for child in children {
            self.free_subtree(child);
        }
        let data = self.data_mut(id);
        data.value = None;
        data.attributes.clear();
        Ok(snapshot)
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(data) = self.slots[current.0].take() {
                stack.extend(data.children);
                self.free.push(current.0);
            }
        }
    }

    /// Copies an owned node hierarchy into the tree as a new child of `parent`.
    pub fn insert_subtree(&mut self, parent: NodeId, node: &TreeNode) -> Result<NodeId, StaleNodeError> {
        let id = self.add_child(parent, node.name.clone(), None)?;
        self.copy_content(id, node);
        Ok(id)
    }

    /// `target` must be live.
    fn copy_content(&mut self, target: NodeId, node: &TreeNode) {
        {
            let data = self.data_mut(target);
            data.value = non_null(node.value.clone());
            data.attributes = node
                .attributes
                .iter()
                .filter(|(_, value)| !value.is_null())
                .cloned()
                .collect();
        }
        for child in &node.children {
            let id = self.alloc(NodeData::new(child.name.clone(), None, Some(target)));
            self.data_mut(target).children.push(id);
            self.copy_content(id, child);
        }
    }

    /// Exports a deep, owned copy of the subtree rooted at `id`.
    pub fn subtree(&self, id: NodeId) -> Result<TreeNode, StaleNodeError> {
        self.check(id)?;
        Ok(self.export(id))
    }

    fn export(&self, id: NodeId) -> TreeNode {
        let data = self.data(id);
        TreeNode {
            name: data.name.clone(),
            value: data.value.clone(),
            attributes: data.attributes.clone(),
            children: data.children.iter().map(|&c| self.export(c)).collect(),
        }
    }

    /// Exports the whole tree.
    pub fn to_node(&self) -> TreeNode {
        self.export(self.root)
    }
}

fn non_null(value: Option<Value>) -> Option<Value> {
    value.filter(|v| !v.is_null())
}

impl NodeHandler for NodeTree {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        self.root
    }

    fn name(&self, node: NodeId) -> &str {
        &self.data(node).name
    }

    fn value(&self, node: NodeId) -> Option<&Value> {
        self.data(node).value.as_ref()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.data(node).parent
    }

    fn children<'s>(&'s self, node: NodeId) -> Box<dyn Iterator<Item = NodeId> + 's> {
        Box::new(self.data(node).children.iter().copied())
    }

    fn attribute_names<'s>(&'s self, node: NodeId) -> Box<dyn Iterator<Item = &'s str> + 's> {
        Box::new(self.data(node).attributes.iter().map(|(n, _)| n.as_str()))
    }

    fn attribute_value(&self, node: NodeId, name: &str) -> Option<&Value> {
        self.data(node)
            .attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    fn child_count(&self, node: NodeId) -> usize {
        self.data(node).children.len()
    }

    fn has_attributes(&self, node: NodeId) -> bool {
        !self.data(node).attributes.is_empty()
    }
}
