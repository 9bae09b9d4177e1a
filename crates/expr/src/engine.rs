//! The evaluation engine resolving configuration keys against a generic [`NodeHandler`].

use crate::ast::{KeySegment, ParsedKey};
use crate::error::ExpressionError;
use crate::parser::parse_key;
use crate::results::{NodeAddData, QueryResult};
use crate::symbols::ExpressionSymbols;
use arbor_tree::NodeHandler;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;

/// Resolves keys to tree positions and back.
///
/// Every operation is a pure function of its arguments; implementations hold
/// configuration only and can be shared between threads.
pub trait ExpressionEngine: fmt::Debug + Send + Sync {
    /// Finds every position `key` addresses below `root`, in document order.
    fn query<H>(
        &self,
        root: H::Node,
        key: &str,
        handler: &H,
    ) -> Result<Vec<QueryResult<H::Node>>, ExpressionError>
    where
        H: NodeHandler + ?Sized;

    /// Plans how to create `key`, reusing the longest existing prefix.
    fn prepare_add<H>(
        &self,
        root: H::Node,
        key: &str,
        handler: &H,
    ) -> Result<NodeAddData<H::Node>, ExpressionError>
    where
        H: NodeHandler + ?Sized;

    /// The key of `node` given the key of its parent; `None` marks the root.
    fn node_key<H>(&self, node: H::Node, parent_key: Option<&str>, handler: &H) -> String
    where
        H: NodeHandler + ?Sized;

    /// The key of an attribute below the given parent key.
    fn attribute_key(&self, parent_key: Option<&str>, attribute_name: &str) -> String;

    /// Like [`node_key`](ExpressionEngine::node_key), but the result resolves
    /// to exactly this node.
    fn canonical_key<H>(&self, node: H::Node, parent_key: Option<&str>, handler: &H) -> String
    where
        H: NodeHandler + ?Sized;

    /// Checks that a node name survives the trip into a key and back.
    fn validate_node_name(&self, name: &str) -> Result<(), ExpressionError>;

    /// Checks that an attribute name fits between the attribute brackets.
    fn validate_attribute_name(&self, name: &str) -> Result<(), ExpressionError>;
}

static SHARED_ENGINE: Lazy<Arc<DefaultExpressionEngine>> =
    Lazy::new(|| Arc::new(DefaultExpressionEngine::default()));

/// The engine for dotted keys such as `tables.table(1).fields.field(0)[@type]`.
///
/// - a plain name selects all children of that name, so one key can resolve
///   to many positions
/// - `name(i)` selects only the i-th (0-based) child of that name
/// - `[@attr]` selects an attribute of the current node and must come last
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultExpressionEngine {
    symbols: ExpressionSymbols,
}

impl DefaultExpressionEngine {
    pub fn new(symbols: ExpressionSymbols) -> Result<Self, ExpressionError> {
        symbols.validate().map_err(ExpressionError::InvalidSymbols)?;
        Ok(Self { symbols })
    }

    /// The process-wide instance using the default symbols.
    pub fn shared() -> Arc<DefaultExpressionEngine> {
        Arc::clone(&SHARED_ENGINE)
    }

    pub fn symbols(&self) -> &ExpressionSymbols {
        &self.symbols
    }

    pub fn parse(&self, key: &str) -> Result<ParsedKey, ExpressionError> {
        parse_key(key, &self.symbols)
    }

    /// Escapes delimiters contained in a node name.
    pub fn escape_name(&self, name: &str) -> String {
        name.replace(
            self.symbols.property_delimiter.as_str(),
            self.symbols.escaped_delimiter.as_str(),
        )
    }

    /// Appends a child name to `parent_key`, escaping delimiters in the name.
    pub fn child_key(&self, parent_key: &str, name: &str) -> String {
        self.join(parent_key, &self.escape_name(name))
    }

    fn join(&self, parent_key: &str, part: &str) -> String {
        if parent_key.is_empty() {
            part.to_string()
        } else {
            format!("{}{}{}", parent_key, self.symbols.property_delimiter, part)
        }
    }
}

impl ExpressionEngine for DefaultExpressionEngine {
    fn query<H>(
        &self,
        root: H::Node,
        key: &str,
        handler: &H,
    ) -> Result<Vec<QueryResult<H::Node>>, ExpressionError>
    where
        H: NodeHandler + ?Sized,
    {
        let parsed = self.parse(key)?;
        let mut current_nodes = vec![root];

        for (pos, segment) in parsed.segments.iter().enumerate() {
            match segment {
                KeySegment::Child { name, index } => {
                    current_nodes = collect_children(&current_nodes, name, *index, handler);
                }
                KeySegment::Attribute(name) => {
                    // An attribute has no children, so nothing can follow it.
                    if pos + 1 != parsed.len() {
                        return Ok(Vec::new());
                    }
                    return Ok(current_nodes
                        .into_iter()
                        .filter(|&node| handler.attribute_value(node, name).is_some())
                        .map(|node| QueryResult::Attribute {
                            node,
                            name: name.clone(),
                        })
                        .collect());
                }
            }
            if current_nodes.is_empty() {
                break;
            }
        }

        log::trace!("key '{}' resolved to {} node(s)", key, current_nodes.len());
        Ok(current_nodes.into_iter().map(QueryResult::Node).collect())
    }

    fn prepare_add<H>(
        &self,
        root: H::Node,
        key: &str,
        handler: &H,
    ) -> Result<NodeAddData<H::Node>, ExpressionError>
    where
        H: NodeHandler + ?Sized,
    {
        let parsed = self.parse(key)?;
        let Some((last, prefix)) = parsed.segments.split_last() else {
            return Err(ExpressionError::invalid(
                key,
                "key for add operation must be defined",
            ));
        };

        // Follow the existing prefix. Without an index the last same-named
        // child is the one extended.
        let mut parent = root;
        let mut matched = 0;
        for segment in prefix {
            let KeySegment::Child { name, index } = segment else {
                return Err(ExpressionError::conflict(
                    key,
                    "attribute key in the middle of the path",
                ));
            };
            let count = handler.matching_children_count(parent, name);
            let idx = match index {
                Some(i) => *i,
                None if count > 0 => count - 1,
                None => break,
            };
            match handler.child_at(parent, name, idx) {
                Some(child) => {
                    parent = child;
                    matched += 1;
                }
                None => break,
            }
        }

        let mut path_nodes = Vec::with_capacity(prefix.len() - matched);
        for segment in &prefix[matched..] {
            match segment {
                KeySegment::Child { name, .. } => path_nodes.push(name.clone()),
                KeySegment::Attribute(_) => {
                    return Err(ExpressionError::conflict(
                        key,
                        "attribute key in the middle of the path",
                    ));
                }
            }
        }

        Ok(NodeAddData {
            parent,
            path_nodes,
            new_node_name: last.name().to_string(),
            attribute: last.is_attribute(),
        })
    }

    fn node_key<H>(&self, node: H::Node, parent_key: Option<&str>, handler: &H) -> String
    where
        H: NodeHandler + ?Sized,
    {
        match parent_key {
            None => String::new(),
            Some(parent) => self.join(parent, &self.escape_name(handler.name(node))),
        }
    }

    fn attribute_key(&self, parent_key: Option<&str>, attribute_name: &str) -> String {
        format!(
            "{}{}{}{}",
            parent_key.unwrap_or_default(),
            self.symbols.attribute_start,
            attribute_name,
            self.symbols.attribute_end
        )
    }

    fn canonical_key<H>(&self, node: H::Node, parent_key: Option<&str>, handler: &H) -> String
    where
        H: NodeHandler + ?Sized,
    {
        let Some(parent) = handler.parent(node) else {
            return parent_key.unwrap_or_default().to_string();
        };
        let name = handler.name(node);
        let mut key = self.join(parent_key.unwrap_or_default(), &self.escape_name(name));
        if handler.matching_children_count(parent, name) > 1 {
            let index = handler
                .children_named(parent, name)
                .position(|sibling| sibling == node)
                .unwrap_or_default();
            key.push_str(&self.symbols.index_start);
            key.push_str(&index.to_string());
            key.push_str(&self.symbols.index_end);
        }
        key
    }

    /// Empty names, names starting with the delimiter and names containing an
    /// index or attribute opener cannot be expressed in a key.
    fn validate_node_name(&self, name: &str) -> Result<(), ExpressionError> {
        let sym = &self.symbols;
        if name.is_empty() {
            return Err(ExpressionError::invalid(name, "node names must not be empty"));
        }
        // An escaped delimiter right after a real one reads as "a." + "b".
        if name.starts_with(sym.property_delimiter.as_str()) {
            return Err(ExpressionError::invalid(
                name,
                format!("node names must not start with '{}'", sym.property_delimiter),
            ));
        }
        match [&sym.index_start, &sym.attribute_start]
            .into_iter()
            .find(|symbol| name.contains(symbol.as_str()))
        {
            Some(symbol) => Err(ExpressionError::invalid(
                name,
                format!("node names must not contain '{symbol}'"),
            )),
            None => Ok(()),
        }
    }

    fn validate_attribute_name(&self, name: &str) -> Result<(), ExpressionError> {
        if name.is_empty() {
            return Err(ExpressionError::invalid(name, "attribute names must not be empty"));
        }
        if name.contains(self.symbols.attribute_end.as_str()) {
            return Err(ExpressionError::invalid(
                name,
                format!("attribute names must not contain '{}'", self.symbols.attribute_end),
            ));
        }
        Ok(())
    }
}

/// Collects the matching children of every context node, preserving document order.
fn collect_children<H>(context_nodes: &[H::Node], name: &str, index: Option<usize>, handler: &H) -> Vec<H::Node>
where
    H: NodeHandler + ?Sized,
{
    let mut result_nodes = Vec::new();
    for &node in context_nodes {
        match index {
            Some(i) => result_nodes.extend(handler.child_at(node, name, i)),
            None => result_nodes.extend(handler.children_named(node, name)),
        }
    }
    result_nodes
}
