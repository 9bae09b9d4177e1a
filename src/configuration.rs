// src/configuration.rs
//! The public configuration facade.
//!
//! [`HierarchicalConfiguration`] puts a [`NodeModel`] behind a reader/writer
//! lock and turns model results into plain values. Reads share the lock,
//! mutations hold it exclusively for the duration of the structural change.

use crate::builder::ConfigurationBuilder;
use crate::error::ConfigurationError;
use crate::events::{ConfigurationErrorListener, ConfigurationListener, EventKind, EventSource, EventValue};
use arbor_expr::{DefaultExpressionEngine, ExpressionEngine, QueryResult};
use arbor_model::{
    DefaultKeyResolver, DisabledListDelimiterHandler, ListDelimiterHandler, ModelError, NodeKeyResolver, NodeModel,
    PropertyValue, RemovedItem,
};
use arbor_tree::{FnVisitor, NodeHandler, NodeId, NodeTree, NodeVisitor, TreeNode, WalkControl, json, walk_dfs};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A configuration stored as a tree and addressed by path keys.
///
/// All methods take `&self`; the configuration can be shared between threads
/// behind an `Arc`. The only lock-free access is [`node_model_mut`], which
/// needs exclusive ownership.
///
/// [`node_model_mut`]: HierarchicalConfiguration::node_model_mut
#[derive(Debug)]
pub struct HierarchicalConfiguration<E: ExpressionEngine = DefaultExpressionEngine> {
    model: RwLock<NodeModel>,
    engine: Arc<E>,
    delimiter: Arc<dyn ListDelimiterHandler>,
    events: EventSource,
}

impl HierarchicalConfiguration<DefaultExpressionEngine> {
    /// An empty configuration with an unnamed root.
    pub fn new() -> Self {
        Self::assemble(
            NodeModel::default(),
            DefaultExpressionEngine::shared(),
            Arc::new(DisabledListDelimiterHandler),
        )
    }

    /// Fails if a name below `root` cannot be written as a key.
    pub fn with_root(root: TreeNode) -> Result<Self, ConfigurationError> {
        Self::from_parts(
            &root,
            DefaultExpressionEngine::shared(),
            Arc::new(DisabledListDelimiterHandler),
        )
    }

    /// Builds a configuration from a JSON document; see [`arbor_tree::json`].
    pub fn from_json(root_name: &str, document: &Value) -> Result<Self, ConfigurationError> {
        Self::with_root(json::from_json(root_name, document))
    }

    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::new()
    }
}

impl Default for HierarchicalConfiguration<DefaultExpressionEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ExpressionEngine> HierarchicalConfiguration<E> {
    /// Creates a configuration holding a copy of `root`.
    ///
    /// Every name below the root is checked with `engine`, so that each node
    /// has a key that resolves back to it.
    pub fn from_parts(
        root: &TreeNode,
        engine: Arc<E>,
        delimiter: Arc<dyn ListDelimiterHandler>,
    ) -> Result<Self, ConfigurationError> {
        let mut model = NodeModel::default();
        model.set_root_node(root, &DefaultKeyResolver::new(engine.as_ref(), delimiter.as_ref()))?;
        Ok(Self::assemble(model, engine, delimiter))
    }

    fn assemble(model: NodeModel, engine: Arc<E>, delimiter: Arc<dyn ListDelimiterHandler>) -> Self {
        Self {
            model: RwLock::new(model),
            engine,
            delimiter,
            events: EventSource::default(),
        }
    }

    // --- Locking ---

    fn read(&self) -> RwLockReadGuard<'_, NodeModel> {
        self.model.read().unwrap_or_else(|poisoned| {
            log::warn!("Configuration lock was poisoned by a panicking writer; continuing with its state.");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, NodeModel> {
        self.model.write().unwrap_or_else(|poisoned| {
            log::warn!("Configuration lock was poisoned by a panicking writer; continuing with its state.");
            poisoned.into_inner()
        })
    }

    fn resolver(&self) -> DefaultKeyResolver<'_, E> {
        DefaultKeyResolver::new(self.engine.as_ref(), self.delimiter.as_ref())
    }

    // --- Reading ---

    /// The value of `key`. Several values are returned as a JSON array.
    ///
    /// A single position holding an array looks the same here; use
    /// [`get_property_value`](Self::get_property_value) to tell them apart.
    pub fn get_property(&self, key: &str) -> Result<Option<Value>, ConfigurationError> {
        Ok(self.get_property_value(key)?.map(PropertyValue::into_value))
    }

    /// The value(s) of `key`, keeping one value apart from several.
    pub fn get_property_value(&self, key: &str) -> Result<Option<PropertyValue>, ConfigurationError> {
        let model = self.read();
        Ok(model.get_property(key, &self.resolver())?)
    }

    /// The first value of `key` as a string. Non-string values are rendered as JSON.
    pub fn get_string(&self, key: &str) -> Result<Option<String>, ConfigurationError> {
        let model = self.read();
        let property = model.get_property(key, &self.resolver())?;
        Ok(property.as_ref().and_then(PropertyValue::first).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }

    /// Every value of `key`; array values are flattened.
    pub fn get_list(&self, key: &str) -> Result<Vec<Value>, ConfigurationError> {
        let model = self.read();
        let values = model
            .get_property(key, &self.resolver())?
            .map(PropertyValue::into_values)
            .unwrap_or_default();
        Ok(values
            .into_iter()
            .flat_map(|value| match value {
                Value::Array(items) => items,
                other => vec![other],
            })
            .collect())
    }

    pub fn contains_key(&self, key: &str) -> Result<bool, ConfigurationError> {
        Ok(self.get_property(key)?.is_some())
    }

    /// True if no node in the tree carries a value or an attribute.
    pub fn is_empty(&self) -> bool {
        let model = self.read();
        let tree = model.tree();
        !arbor_tree::is_subtree_defined(tree.root(), tree)
    }

    /// Every key that has a value, in document order and without duplicates.
    ///
    /// Keys never carry indices: same-named siblings share one key.
    pub fn get_keys(&self) -> Vec<String> {
        let model = self.read();
        let tree = model.tree();
        let mut visitor = DefinedKeysVisitor::new(self.engine.as_ref(), None);
        walk_dfs(tree.root(), &mut visitor, tree);
        visitor.into_keys()
    }

    /// The defined keys starting with `prefix`.
    ///
    /// `prefix` itself comes first if it has a value, followed by the
    /// attributes of the selected nodes and the keys below them.
    pub fn get_keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, ConfigurationError> {
        let model = self.read();
        let tree = model.tree();
        let results = self.resolver().resolve_key(tree.root(), prefix, tree)?;

        let mut visitor = DefinedKeysVisitor::new(self.engine.as_ref(), Some(prefix));
        if results
            .iter()
            .any(|result| result.value(tree).is_some_and(|value| !value.is_null()))
        {
            visitor.add_key(prefix.to_string());
        }
        for result in &results {
            if let QueryResult::Node(node) = result {
                visitor.add_attribute_keys(*node, prefix, tree);
                for child in tree.children(*node) {
                    walk_dfs(child, &mut visitor, tree);
                }
            }
        }
        Ok(visitor.into_keys())
    }

    /// The highest index `key` can be combined with, or `None` if it selects no node.
    pub fn get_max_index(&self, key: &str) -> Result<Option<usize>, ConfigurationError> {
        let model = self.read();
        let tree = model.tree();
        let nodes = self.resolver().resolve_node_key(tree.root(), key, tree)?;
        Ok(nodes.len().checked_sub(1))
    }

    pub fn root_element_name(&self) -> String {
        let model = self.read();
        model.tree().name(model.root_node()).to_string()
    }

    /// A copy of the whole tree, taken under the read lock.
    pub fn root_node(&self) -> TreeNode {
        self.read().tree().to_node()
    }

    /// The tree rendered as JSON, without the root's name.
    pub fn to_json(&self) -> Value {
        json::to_json(&self.root_node())
    }

    /// Direct access to the model, bypassing the lock.
    ///
    /// Requires `&mut self`, so no other thread can hold the configuration.
    pub fn node_model_mut(&mut self) -> &mut NodeModel {
        self.model.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    /// A new configuration holding a copy of the one node `key` selects.
    ///
    /// The copy shares engine and list splitting with `self`, but no listeners.
    pub fn configuration_at(&self, key: &str) -> Result<Self, ConfigurationError> {
        let model = self.read();
        let tree = model.tree();
        let nodes = self.resolver().resolve_node_key(tree.root(), key, tree)?;
        match nodes.as_slice() {
            [node] => Ok(Self::assemble(
                NodeModel::from_root(&tree.subtree(*node).map_err(ModelError::from)?),
                Arc::clone(&self.engine),
                Arc::clone(&self.delimiter),
            )),
            _ => Err(ConfigurationError::invalid(
                key,
                format!("Key selects {} nodes; exactly one is required.", nodes.len()),
            )),
        }
    }

    /// The canonical key of every node, root first, in document order.
    ///
    /// Unlike [`get_keys`](Self::get_keys), each key selects exactly one node.
    pub fn canonical_keys(&self) -> Vec<String> {
        let model = self.read();
        let tree = model.tree();
        let resolver = self.resolver();
        let mut cache = HashMap::new();
        let mut keys = Vec::new();
        walk_dfs(
            tree.root(),
            &mut FnVisitor(|node: NodeId, t: &NodeTree| {
                keys.push(resolver.node_key(node, &mut cache, t));
                WalkControl::Continue
            }),
            tree,
        );
        keys
    }

    // --- Writing ---

    /// Replaces the whole tree; the old one is kept if a name in `root` cannot be keyed.
    pub fn set_root_node(&self, root: TreeNode) -> Result<(), ConfigurationError> {
        Ok(self.write().set_root_node(&root, &self.resolver())?)
    }

    /// Assigns `value` to `key`, see [`NodeModel::set_property`].
    pub fn set_property(&self, key: &str, value: impl Into<Value>) -> Result<(), ConfigurationError> {
        let value = value.into();
        self.fire(EventKind::SetProperty, Some(key), Some(EventValue::Property(value.clone())), true);
        let result = self.write().set_property(key, &value, &self.resolver());
        let change = result.map_err(|err| {
            self.failed(EventKind::SetProperty, Some(key), Some(EventValue::Property(value.clone())), err)
        })?;
        log::debug!("Set '{}': {} changed, {} added, {} removed.", key, change.changed, change.added.len(), change.removed.len());
        self.fire(EventKind::SetProperty, Some(key), Some(EventValue::Property(value)), false);
        Ok(())
    }

    /// Adds `value` below `key` as new node(s), see [`NodeModel::add_property`].
    pub fn add_property(&self, key: &str, value: impl Into<Value>) -> Result<(), ConfigurationError> {
        let value = value.into();
        self.fire(EventKind::AddProperty, Some(key), Some(EventValue::Property(value.clone())), true);
        let result = self.write().add_property(key, &value, &self.resolver());
        result.map_err(|err| {
            self.failed(EventKind::AddProperty, Some(key), Some(EventValue::Property(value.clone())), err)
        })?;
        self.fire(EventKind::AddProperty, Some(key), Some(EventValue::Property(value)), false);
        Ok(())
    }

    /// Copies `nodes` into the tree below `key`. Does nothing for an empty list.
    pub fn add_nodes(&self, key: &str, nodes: Vec<TreeNode>) -> Result<(), ConfigurationError> {
        if nodes.is_empty() {
            return Ok(());
        }
        self.fire(EventKind::AddNodes, Some(key), Some(EventValue::Nodes(nodes.clone())), true);
        let result = self.write().add_nodes(key, &nodes, &self.resolver());
        result.map_err(|err| self.failed(EventKind::AddNodes, Some(key), Some(EventValue::Nodes(nodes.clone())), err))?;
        self.fire(EventKind::AddNodes, Some(key), Some(EventValue::Nodes(nodes)), false);
        Ok(())
    }

    /// Removes the value(s) of `key`; nodes with other content are kept.
    pub fn clear_property(&self, key: &str) -> Result<(), ConfigurationError> {
        self.fire(EventKind::ClearProperty, Some(key), None, true);
        let result = self.write().clear_property(key, &self.resolver());
        result.map_err(|err| self.failed(EventKind::ClearProperty, Some(key), None, err))?;
        self.fire(EventKind::ClearProperty, Some(key), None, false);
        Ok(())
    }

    /// Removes everything below `key`. The after-event carries the removed subtrees.
    pub fn clear_tree(&self, key: &str) -> Result<(), ConfigurationError> {
        self.fire(EventKind::ClearTree, Some(key), None, true);
        let result = self.write().clear_tree(key, &self.resolver());
        let change = result.map_err(|err| self.failed(EventKind::ClearTree, Some(key), None, err))?;
        let removed = change
            .removed
            .into_iter()
            .filter_map(|item| match item {
                RemovedItem::Node(node) => Some(node),
                _ => None,
            })
            .collect();
        self.fire(EventKind::ClearTree, Some(key), Some(EventValue::Nodes(removed)), false);
        Ok(())
    }

    /// Empties the configuration; the root keeps its name.
    pub fn clear(&self) {
        self.fire(EventKind::Clear, None, None, true);
        self.write().clear();
        self.fire(EventKind::Clear, None, None, false);
    }

    // --- Collaborators ---

    pub fn expression_engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn set_expression_engine(&mut self, engine: Arc<E>) {
        self.engine = engine;
    }

    pub fn list_delimiter_handler(&self) -> &Arc<dyn ListDelimiterHandler> {
        &self.delimiter
    }

    pub fn set_list_delimiter_handler(&mut self, delimiter: Arc<dyn ListDelimiterHandler>) {
        self.delimiter = delimiter;
    }

    pub fn add_listener(&self, listener: Arc<dyn ConfigurationListener>) {
        self.events.add(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn ConfigurationListener>) -> bool {
        self.events.remove(listener)
    }

    pub fn clear_listeners(&self) {
        self.events.clear();
    }

    /// The registered listeners at the time of the call.
    pub fn listeners(&self) -> Vec<Arc<dyn ConfigurationListener>> {
        self.events.listeners()
    }

    pub fn listener_count(&self) -> usize {
        self.events.len()
    }

    /// Registers a listener for mutations that fail.
    pub fn add_error_listener(&self, listener: Arc<dyn ConfigurationErrorListener>) {
        self.events.add_error(listener);
    }

    pub fn remove_error_listener(&self, listener: &Arc<dyn ConfigurationErrorListener>) -> bool {
        self.events.remove_error(listener)
    }

    pub fn clear_error_listeners(&self) {
        self.events.clear_errors();
    }

    pub fn error_listener_count(&self) -> usize {
        self.events.error_len()
    }

    fn fire(&self, kind: EventKind, key: Option<&str>, value: Option<EventValue>, before_update: bool) {
        self.events.fire(kind, key, value, before_update);
    }

    /// Reports a failed mutation to the error listeners and hands the error back.
    ///
    /// Must be called after the write lock is released.
    fn failed(
        &self,
        kind: EventKind,
        key: Option<&str>,
        value: Option<EventValue>,
        error: ModelError,
    ) -> ConfigurationError {
        let error = ConfigurationError::from(error);
        log::debug!("{:?} on {:?} failed: {}", kind, key, error);
        self.events.fire_error(kind, key, value, &error);
        error
    }
}

impl<E: ExpressionEngine> Clone for HierarchicalConfiguration<E> {
    /// Deep-copies the tree under the read lock. The clone has its own lock
    /// and starts without listeners.
    fn clone(&self) -> Self {
        let tree = self.read().tree().clone();
        Self {
            model: RwLock::new(NodeModel::new(tree)),
            engine: Arc::clone(&self.engine),
            delimiter: Arc::clone(&self.delimiter),
            events: EventSource::default(),
        }
    }
}

/// Collects the keys of all nodes carrying a value or attributes.
///
/// Keys are built top-down from a stack of parent keys, so every node's key
/// is computed once.
struct DefinedKeysVisitor<'a, E> {
    engine: &'a E,
    parent_keys: Vec<String>,
    keys: Vec<String>,
    seen: HashSet<String>,
}

impl<'a, E: ExpressionEngine> DefinedKeysVisitor<'a, E> {
    fn new(engine: &'a E, prefix: Option<&str>) -> Self {
        Self {
            engine,
            parent_keys: prefix.map(|p| vec![p.to_string()]).unwrap_or_default(),
            keys: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn add_key(&mut self, key: String) {
        if !key.is_empty() && self.seen.insert(key.clone()) {
            self.keys.push(key);
        }
    }

    fn add_attribute_keys<H: NodeHandler + ?Sized>(&mut self, node: H::Node, key: &str, handler: &H) {
        for name in handler.attribute_names(node) {
            let attribute_key = self.engine.attribute_key(Some(key), name);
            self.add_key(attribute_key);
        }
    }

    fn into_keys(self) -> Vec<String> {
        self.keys
    }
}

impl<E: ExpressionEngine, H: NodeHandler + ?Sized> NodeVisitor<H> for DefinedKeysVisitor<'_, E> {
    fn visit_before_children(&mut self, node: H::Node, handler: &H) -> WalkControl {
        let key = self
            .engine
            .node_key(node, self.parent_keys.last().map(String::as_str), handler);
        if handler.value(node).is_some_and(|value| !value.is_null()) {
            self.add_key(key.clone());
        }
        self.add_attribute_keys(node, &key, handler);
        self.parent_keys.push(key);
        WalkControl::Continue
    }

    fn visit_after_children(&mut self, _node: H::Node, _handler: &H) -> WalkControl {
        self.parent_keys.pop();
        WalkControl::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> HierarchicalConfiguration {
        HierarchicalConfiguration::with_root(
            TreeNode::new("config")
                .with_attribute("version", 2)
                .with_child(
                    TreeNode::new("x")
                        .with_value(1)
                        .with_child(TreeNode::new("keep").with_value("me")),
                )
                .with_child(TreeNode::new("x").with_value(2))
                .with_child(TreeNode::new("x").with_child(TreeNode::new("y")))
                .with_child(
                    TreeNode::new("server")
                        .with_attribute("secure", true)
                        .with_child(TreeNode::new("host").with_value("localhost"))
                        .with_child(TreeNode::new("port").with_value(8080)),
                ),
        )
        .unwrap()
    }

    #[test]
    fn keys_are_unindexed_and_unique() {
        let keys = config().get_keys();
        assert_eq!(
            keys,
            vec!["[@version]", "x", "x.keep", "server[@secure]", "server.host", "server.port"]
        );
    }

    #[test]
    fn keys_with_prefix() {
        let config = config();
        assert_eq!(
            config.get_keys_with_prefix("server").unwrap(),
            vec!["server[@secure]", "server.host", "server.port"]
        );
        assert_eq!(config.get_keys_with_prefix("x").unwrap(), vec!["x", "x.keep"]);
        assert!(config.get_keys_with_prefix("missing").unwrap().is_empty());
    }

    #[test]
    fn canonical_keys_select_single_nodes() {
        let config = config();
        let keys = config.canonical_keys();
        assert_eq!(keys[0], "");
        assert!(keys.contains(&"x(2).y".to_string()));
        assert!(keys.contains(&"server.port".to_string()));
        for key in keys.iter().skip(1) {
            assert_eq!(config.get_max_index(key).unwrap(), Some(0), "key {key}");
        }
    }

    #[test]
    fn max_index_and_typed_reads() {
        let config = config();
        assert_eq!(config.get_max_index("x").unwrap(), Some(2));
        assert_eq!(config.get_max_index("nope").unwrap(), None);
        assert_eq!(config.get_string("server.port").unwrap().as_deref(), Some("8080"));
        assert_eq!(config.get_string("server.host").unwrap().as_deref(), Some("localhost"));
        assert_eq!(config.get_list("x").unwrap(), vec![json!(1), json!(2)]);
        assert_eq!(config.get_property("x").unwrap(), Some(json!([1, 2])));
    }

    #[test]
    fn emptiness_follows_defined_content() {
        let config = config();
        assert!(!config.is_empty());
        config.clear();
        assert!(config.is_empty());
        assert_eq!(config.root_element_name(), "config");

        let structure_only = HierarchicalConfiguration::with_root(
            TreeNode::new("r").with_child(TreeNode::new("a").with_child(TreeNode::new("b"))),
        )
        .unwrap();
        assert!(structure_only.is_empty());
    }

    #[test]
    fn node_model_mut_bypasses_the_lock() {
        let mut config = config();
        config.node_model_mut().clear();
        assert!(config.is_empty());
    }
}
