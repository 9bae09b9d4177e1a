//! Key resolution as seen by the node model.
use crate::delimiter::ListDelimiterHandler;
use crate::error::ModelError;
use arbor_expr::{ExpressionEngine, NodeAddData, QueryResult};
use arbor_tree::{NodeHandler, TreeNode};
use itertools::{EitherOrBoth, Itertools};
use serde_json::Value;
use std::collections::HashMap;

/// The positional diff between the positions a key currently resolves to
/// and a new list of values for it.
///
/// The first position gets the first value, and so on. Values left over go
/// to `additional`, positions left over go to `removed`; only one of the two
/// can be non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeUpdateData<N> {
    pub key: String,
    pub changed: Vec<(QueryResult<N>, Value)>,
    pub additional: Vec<Value>,
    pub removed: Vec<QueryResult<N>>,
}

impl<N> NodeUpdateData<N> {
    /// Pairs existing positions with new values.
    pub fn pair(
        key: impl Into<String>,
        existing: impl IntoIterator<Item = QueryResult<N>>,
        values: impl IntoIterator<Item = Value>,
    ) -> Self {
        let mut data = NodeUpdateData {
            key: key.into(),
            changed: Vec::new(),
            additional: Vec::new(),
            removed: Vec::new(),
        };
        for pair in existing.into_iter().zip_longest(values) {
            match pair {
                EitherOrBoth::Both(result, value) => data.changed.push((result, value)),
                EitherOrBoth::Left(result) => data.removed.push(result),
                EitherOrBoth::Right(value) => data.additional.push(value),
            }
        }
        data
    }
}

/// Resolves keys on behalf of the node model.
///
/// This is the seam between the model, which mutates nodes, and the
/// expression engine and value splitting, which it knows nothing about.
pub trait NodeKeyResolver<H: NodeHandler + ?Sized> {
    fn resolve_key(
        &self,
        root: H::Node,
        key: &str,
        handler: &H,
    ) -> Result<Vec<QueryResult<H::Node>>, ModelError>;

    /// Like [`resolve_key`](NodeKeyResolver::resolve_key), keeping only node results.
    fn resolve_node_key(&self, root: H::Node, key: &str, handler: &H) -> Result<Vec<H::Node>, ModelError> {
        Ok(self
            .resolve_key(root, key, handler)?
            .into_iter()
            .filter_map(|result| match result {
                QueryResult::Node(node) => Some(node),
                QueryResult::Attribute { .. } => None,
            })
            .collect())
    }

    fn resolve_add_key(
        &self,
        root: H::Node,
        key: &str,
        handler: &H,
    ) -> Result<NodeAddData<H::Node>, ModelError>;

    /// Computes the diff for assigning `new_value` to `key`.
    fn resolve_update_key(
        &self,
        root: H::Node,
        key: &str,
        new_value: &Value,
        handler: &H,
    ) -> Result<NodeUpdateData<H::Node>, ModelError> {
        let existing = self.resolve_key(root, key, handler)?;
        Ok(NodeUpdateData::pair(key, existing, self.split_values(new_value)))
    }

    /// Splits a value into the individual values it stands for.
    fn split_values(&self, value: &Value) -> Vec<Value>;

    /// The canonical key of `node`, memoising the keys of all nodes on the
    /// way up in `cache`.
    fn node_key(&self, node: H::Node, cache: &mut HashMap<H::Node, String>, handler: &H) -> String;

    fn validate_node_name(&self, name: &str) -> Result<(), ModelError>;

    fn validate_attribute_name(&self, name: &str) -> Result<(), ModelError>;

    /// Checks every name in `node` and below it. `check_name` is false for a
    /// root, whose name is not part of any key.
    fn validate_subtree(&self, node: &TreeNode, check_name: bool) -> Result<(), ModelError> {
        if check_name {
            self.validate_node_name(&node.name)?;
        }
        for (name, _) in &node.attributes {
            self.validate_attribute_name(name)?;
        }
        node.children
            .iter()
            .try_for_each(|child| self.validate_subtree(child, true))
    }
}

/// Resolves keys with an [`ExpressionEngine`] and splits values with a
/// [`ListDelimiterHandler`].
#[derive(Debug)]
pub struct DefaultKeyResolver<'a, E> {
    engine: &'a E,
    delimiter: &'a dyn ListDelimiterHandler,
}

impl<'a, E: ExpressionEngine> DefaultKeyResolver<'a, E> {
    pub fn new(engine: &'a E, delimiter: &'a dyn ListDelimiterHandler) -> Self {
        Self { engine, delimiter }
    }

    pub fn engine(&self) -> &'a E {
        self.engine
    }
}

impl<H, E> NodeKeyResolver<H> for DefaultKeyResolver<'_, E>
where
    H: NodeHandler + ?Sized,
    E: ExpressionEngine,
{
    fn resolve_key(
        &self,
        root: H::Node,
        key: &str,
        handler: &H,
    ) -> Result<Vec<QueryResult<H::Node>>, ModelError> {
        Ok(self.engine.query(root, key, handler)?)
    }

    fn resolve_add_key(
        &self,
        root: H::Node,
        key: &str,
        handler: &H,
    ) -> Result<NodeAddData<H::Node>, ModelError> {
        Ok(self.engine.prepare_add(root, key, handler)?)
    }

    fn split_values(&self, value: &Value) -> Vec<Value> {
        self.delimiter.split(value)
    }

    fn node_key(&self, node: H::Node, cache: &mut HashMap<H::Node, String>, handler: &H) -> String {
        let mut path = Vec::new();
        let mut current = Some(node);
        let mut key = None;
        while let Some(n) = current {
            if let Some(cached) = cache.get(&n) {
                key = Some(cached.clone());
                break;
            }
            path.push(n);
            current = handler.parent(n);
        }
        for n in path.into_iter().rev() {
            let current_key = self.engine.canonical_key(n, key.as_deref(), handler);
            cache.insert(n, current_key.clone());
            key = Some(current_key);
        }
        key.unwrap_or_default()
    }

    fn validate_node_name(&self, name: &str) -> Result<(), ModelError> {
        Ok(self.engine.validate_node_name(name)?)
    }

    fn validate_attribute_name(&self, name: &str) -> Result<(), ModelError> {
        Ok(self.engine.validate_attribute_name(name)?)
    }
}
