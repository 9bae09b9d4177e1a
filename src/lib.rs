//! Hierarchical configurations addressed by path keys.
//!
//! ```
//! use arbor::HierarchicalConfiguration;
//! use serde_json::json;
//!
//! let config = HierarchicalConfiguration::from_json(
//!     "config",
//!     &json!({"tables": {"table": [{"name": "users"}, {"name": "orders"}]}}),
//! )
//! .unwrap();
//! assert_eq!(config.get_property("tables.table(1).name").unwrap(), Some(json!("orders")));
//! assert_eq!(config.get_max_index("tables.table").unwrap(), Some(1));
//! ```

pub mod builder;
pub mod configuration;
pub mod converter;
pub mod error;
pub mod events;

// --- Public API ---
pub use builder::ConfigurationBuilder;
pub use configuration::HierarchicalConfiguration;
pub use converter::{ElementHandler, process};
pub use error::ConfigurationError;
pub use events::{
    ConfigurationErrorEvent, ConfigurationErrorListener, ConfigurationEvent, ConfigurationListener, EventKind, EventValue,
};

// --- Building blocks ---
pub use arbor_expr::{DefaultExpressionEngine, ExpressionEngine, ExpressionSymbols};
pub use arbor_model::{
    DefaultListDelimiterHandler, DisabledListDelimiterHandler, ListDelimiterHandler, NodeModel, PropertyValue,
};
pub use arbor_tree::{NodeHandler, NodeId, NodeTree, TreeNode};
pub use arbor_expr as expr;
pub use arbor_model as model;
pub use arbor_tree as tree;
