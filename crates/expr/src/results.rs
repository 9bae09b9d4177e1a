//! Values produced by the expression engine.
use arbor_tree::NodeHandler;
use serde_json::Value;

/// One position a key resolved to.
///
/// A result is a snapshot: adding or removing nodes invalidates it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryResult<N> {
    /// The key addresses the value of this node.
    Node(N),
    /// The key addresses the named attribute of this node.
    Attribute { node: N, name: String },
}

impl<N: Copy> QueryResult<N> {
    /// The node of the result; for attribute results the node owning the attribute.
    pub fn node(&self) -> N {
        match self {
            QueryResult::Node(node) | QueryResult::Attribute { node, .. } => *node,
        }
    }

    pub fn is_attribute(&self) -> bool {
        matches!(self, QueryResult::Attribute { .. })
    }

    pub fn attribute_name(&self) -> Option<&str> {
        match self {
            QueryResult::Attribute { name, .. } => Some(name),
            QueryResult::Node(_) => None,
        }
    }

    /// Reads the value the result points at.
    pub fn value<'h, H>(&self, handler: &'h H) -> Option<&'h Value>
    where
        H: NodeHandler<Node = N> + ?Sized,
    {
        match self {
            QueryResult::Node(node) => handler.value(*node),
            QueryResult::Attribute { node, name } => handler.attribute_value(*node, name),
        }
    }
}

/// The plan for materializing a key that does not fully exist yet.
///
/// Starting at `parent`, one node per entry of `path_nodes` is created, each
/// below the previous one; then `new_node_name` is created below the last,
/// either as a node or as an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAddData<N> {
    pub parent: N,
    pub path_nodes: Vec<String>,
    pub new_node_name: String,
    pub attribute: bool,
}

impl<N> NodeAddData<N> {
    pub fn is_attribute(&self) -> bool {
        self.attribute
    }

    /// Every segment to create, paired with its create-as-attribute flag.
    pub fn segments(&self) -> impl Iterator<Item = (&str, bool)> + '_ {
        self.path_nodes
            .iter()
            .map(|name| (name.as_str(), false))
            .chain(std::iter::once((self.new_node_name.as_str(), self.attribute)))
    }

    /// Attributes are written into an existing slot of the target node; nodes
    /// are always created as a new sibling.
    pub fn merges_into_existing(&self) -> bool {
        self.attribute
    }
}
