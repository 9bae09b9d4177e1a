//! The node model: the single owner of a configuration tree.
//!
//! All mutation of a configuration funnels through [`NodeModel`]. Keys are
//! resolved by a [`NodeKeyResolver`]; the model only applies the results.

use crate::change::{RemovedItem, TreeChange};
use crate::error::ModelError;
use crate::resolver::NodeKeyResolver;
use arbor_expr::{NodeAddData, QueryResult};
use arbor_tree::{NodeHandler, NodeId, NodeTree, TreeNode};
use serde_json::Value;

/// The value(s) a key resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Single(Value),
    /// Several positions carried a value; in document order.
    List(Vec<Value>),
}

impl PropertyValue {
    pub fn into_values(self) -> Vec<Value> {
        match self {
            PropertyValue::Single(value) => vec![value],
            PropertyValue::List(values) => values,
        }
    }

    /// The value, or the first one of a list.
    pub fn first(&self) -> Option<&Value> {
        match self {
            PropertyValue::Single(value) => Some(value),
            PropertyValue::List(values) => values.first(),
        }
    }

    /// Collapses into a single JSON value; lists become arrays.
    pub fn into_value(self) -> Value {
        match self {
            PropertyValue::Single(value) => value,
            PropertyValue::List(values) => Value::Array(values),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NodeModel {
    tree: NodeTree,
}

impl NodeModel {
    pub fn new(tree: NodeTree) -> Self {
        Self { tree }
    }

    pub fn from_root(root: &TreeNode) -> Self {
        Self::new(NodeTree::from_node(root))
    }

    /// Read access to the tree, which doubles as its node handler.
    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub fn root_node(&self) -> NodeId {
        self.tree.root()
    }

    /// Replaces the whole tree with a copy of `root`.
    ///
    /// Every name below the root must be expressible as a key; the root's
    /// own name never appears in one.
    pub fn set_root_node<R>(&mut self, root: &TreeNode, resolver: &R) -> Result<(), ModelError>
    where
        R: NodeKeyResolver<NodeTree> + ?Sized,
    {
        resolver.validate_subtree(root, false)?;
        self.tree = NodeTree::from_node(root);
        Ok(())
    }

    /// Swaps in a new tree, handing back the old one.
    pub fn replace_tree(&mut self, tree: NodeTree) -> NodeTree {
        std::mem::replace(&mut self.tree, tree)
    }

    // --- Reading ---

    /// Collects the values `key` resolves to. Positions without a value are skipped.
    pub fn get_property<R>(&self, key: &str, resolver: &R) -> Result<Option<PropertyValue>, ModelError>
    where
        R: NodeKeyResolver<NodeTree> + ?Sized,
    {
        let results = resolver.resolve_key(self.tree.root(), key, &self.tree)?;
        let mut values: Vec<Value> = results
            .iter()
            .filter_map(|result| result.value(&self.tree))
            .filter(|value| !value.is_null())
            .cloned()
            .collect();
        Ok(match values.len() {
            0 => None,
            1 => values.pop().map(PropertyValue::Single),
            _ => Some(PropertyValue::List(values)),
        })
    }

    // --- Writing ---

    /// Assigns `value` to `key`, overwriting existing positions in place.
    ///
    /// The value is split into a list first. Surplus values are added as new
    /// nodes, surplus positions are removed.
    pub fn set_property<R>(&mut self, key: &str, value: &Value, resolver: &R) -> Result<TreeChange, ModelError>
    where
        R: NodeKeyResolver<NodeTree> + ?Sized,
    {
        let update = resolver.resolve_update_key(self.tree.root(), key, value, &self.tree)?;
        log::debug!(
            "set '{}': {} changed, {} added, {} removed",
            key,
            update.changed.len(),
            update.additional.len(),
            update.removed.len()
        );

        let mut change = TreeChange::new(key);
        for (result, new_value) in update.changed {
            match result {
                QueryResult::Node(node) => {
                    self.tree.set_value(node, Some(new_value))?;
                }
                QueryResult::Attribute { node, name } => {
                    self.tree.set_attribute(node, name, new_value)?;
                }
            }
            change.changed += 1;
        }
        for new_value in update.additional {
            let data = resolver.resolve_add_key(self.tree.root(), key, &self.tree)?;
            self.materialize(data, new_value, &mut change)?;
        }
        for result in update.removed {
            self.remove_value(result, &mut change)?;
        }
        Ok(change)
    }

    /// Adds `value` below `key`, always creating new nodes.
    ///
    /// Each element of the split value becomes its own node. For an attribute
    /// key all elements are stored in the one attribute, as an array if there
    /// is more than one.
    pub fn add_property<R>(&mut self, key: &str, value: &Value, resolver: &R) -> Result<TreeChange, ModelError>
    where
        R: NodeKeyResolver<NodeTree> + ?Sized,
    {
        let mut change = TreeChange::new(key);
        let mut values = resolver.split_values(value);
        if values.is_empty() {
            return Ok(change);
        }

        let data = resolver.resolve_add_key(self.tree.root(), key, &self.tree)?;
        if data.is_attribute() {
            let attribute_value = if values.len() == 1 {
                values.remove(0)
            } else {
                Value::Array(values)
            };
            self.materialize(data, attribute_value, &mut change)?;
            return Ok(change);
        }

        let mut values = values.into_iter();
        if let Some(first) = values.next() {
            self.materialize(data, first, &mut change)?;
        }
        for next in values {
            let data = resolver.resolve_add_key(self.tree.root(), key, &self.tree)?;
            self.materialize(data, next, &mut change)?;
        }
        log::debug!("added {} node(s) for '{}'", change.added.len(), key);
        Ok(change)
    }

    /// Copies `nodes` into the tree below `key`.
    ///
    /// If `key` selects exactly one node, the copies become its children;
    /// otherwise a new node is created for `key` to hold them. Nothing is
    /// added if any name in `nodes` cannot be expressed as a key.
    pub fn add_nodes<R>(&mut self, key: &str, nodes: &[TreeNode], resolver: &R) -> Result<TreeChange, ModelError>
    where
        R: NodeKeyResolver<NodeTree> + ?Sized,
    {
        let mut change = TreeChange::new(key);
        if nodes.is_empty() {
            return Ok(change);
        }
        for node in nodes {
            resolver.validate_subtree(node, true)?;
        }

        let results = resolver.resolve_key(self.tree.root(), key, &self.tree)?;
        let target = match results.as_slice() {
            [QueryResult::Node(node)] => *node,
            [QueryResult::Attribute { .. }] => {
                return Err(ModelError::invalid(key, "nodes cannot be added to an attribute"));
            }
            _ => {
                let data = resolver.resolve_add_key(self.tree.root(), key, &self.tree)?;
                if data.is_attribute() {
                    return Err(ModelError::invalid(key, "nodes cannot be added to an attribute key"));
                }
                let parent = self.create_path(&data, &mut change)?;
                let holder = self.tree.add_child(parent, data.new_node_name, None)?;
                change.added.push(holder);
                holder
            }
        };

        for node in nodes {
            let id = self.tree.insert_subtree(target, node)?;
            change.added.push(id);
        }
        log::debug!("added {} subtree(s) below '{}'", nodes.len(), key);
        Ok(change)
    }

    // --- Removing ---

    /// Removes everything `key` selects, including all descendants.
    ///
    /// Ancestors left without any content are removed as well; the root is
    /// emptied instead of removed.
    pub fn clear_tree<R>(&mut self, key: &str, resolver: &R) -> Result<TreeChange, ModelError>
    where
        R: NodeKeyResolver<NodeTree> + ?Sized,
    {
        let results = resolver.resolve_key(self.tree.root(), key, &self.tree)?;
        let mut change = TreeChange::new(key);
        for result in results {
            match result {
                QueryResult::Attribute { node, name } => self.remove_attribute(node, &name, &mut change)?,
                QueryResult::Node(node) if node == self.tree.root() => {
                    let snapshot = self.tree.clear_node(node)?;
                    change.removed.push(RemovedItem::Node(snapshot));
                }
                QueryResult::Node(node) => {
                    if !self.tree.contains(node) {
                        continue;
                    }
                    let parent = self.tree.parent(node);
                    if let Some(snapshot) = self.tree.remove_node(node)? {
                        change.removed.push(RemovedItem::Node(snapshot));
                    }
                    if let Some(parent) = parent {
                        self.prune_empty(parent, &mut change)?;
                    }
                }
            }
        }
        log::debug!("cleared tree '{}': {} item(s) removed", key, change.removed.len());
        Ok(change)
    }

    /// Removes the values `key` selects.
    ///
    /// Attributes are deleted. A node loses its value and is only removed if
    /// it has neither children nor attributes left.
    pub fn clear_property<R>(&mut self, key: &str, resolver: &R) -> Result<TreeChange, ModelError>
    where
        R: NodeKeyResolver<NodeTree> + ?Sized,
    {
        let results = resolver.resolve_key(self.tree.root(), key, &self.tree)?;
        let mut change = TreeChange::new(key);
        for result in results {
            self.remove_value(result, &mut change)?;
        }
        Ok(change)
    }

    /// Resets the tree to an empty root; the root keeps its name.
    pub fn clear(&mut self) -> TreeChange {
        let mut change = TreeChange::new("");
        let root = self.tree.root();
        if let Ok(snapshot) = self.tree.clear_node(root)
            && (snapshot.value.is_some() || !snapshot.attributes.is_empty() || !snapshot.children.is_empty())
        {
            change.removed.push(RemovedItem::Node(snapshot));
        }
        change
    }

    // --- Helpers ---

    fn create_path(&mut self, data: &NodeAddData<NodeId>, change: &mut TreeChange) -> Result<NodeId, ModelError> {
        let mut parent = data.parent;
        for name in &data.path_nodes {
            parent = self.tree.add_child(parent, name.clone(), None)?;
            change.added.push(parent);
        }
        Ok(parent)
    }

    fn materialize(&mut self, data: NodeAddData<NodeId>, value: Value, change: &mut TreeChange) -> Result<(), ModelError> {
        let parent = self.create_path(&data, change)?;
        if data.is_attribute() {
            self.tree.set_attribute(parent, data.new_node_name, value)?;
            change.changed += 1;
        } else {
            let id = self.tree.add_child(parent, data.new_node_name, Some(value))?;
            change.added.push(id);
        }
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str, change: &mut TreeChange) -> Result<(), ModelError> {
        if !self.tree.contains(node) {
            return Ok(());
        }
        if let Some(value) = self.tree.remove_attribute(node, name)? {
            change.removed.push(RemovedItem::Attribute {
                owner: node,
                name: name.to_string(),
                value,
            });
            self.prune_empty(node, change)?;
        }
        Ok(())
    }

    fn remove_value(&mut self, result: QueryResult<NodeId>, change: &mut TreeChange) -> Result<(), ModelError> {
        let node = match result {
            QueryResult::Attribute { node, name } => return self.remove_attribute(node, &name, change),
            QueryResult::Node(node) => node,
        };
        if !self.tree.contains(node) {
            return Ok(());
        }
        let old = self.tree.set_value(node, None)?;
        if self.is_prunable(node) {
            let parent = self.tree.parent(node);
            if let Some(mut snapshot) = self.tree.remove_node(node)? {
                snapshot.value = old;
                change.removed.push(RemovedItem::Node(snapshot));
            }
            if let Some(parent) = parent {
                self.prune_empty(parent, change)?;
            }
        } else if let Some(value) = old {
            change.removed.push(RemovedItem::Value { node, value });
        }
        Ok(())
    }

    fn is_prunable(&self, node: NodeId) -> bool {
        node != self.tree.root()
            && self.tree.value(node).is_none()
            && !self.tree.has_attributes(node)
            && self.tree.child_count(node) == 0
    }

    /// Removes `start` and its ancestors for as long as they are left empty.
    fn prune_empty(&mut self, start: NodeId, change: &mut TreeChange) -> Result<(), ModelError> {
        let mut current = Some(start);
        while let Some(node) = current {
            if !self.tree.contains(node) || !self.is_prunable(node) {
                break;
            }
            current = self.tree.parent(node);
            if let Some(snapshot) = self.tree.remove_node(node)? {
                change.removed.push(RemovedItem::Node(snapshot));
            }
        }
        Ok(())
    }
}
