//! Path expressions for hierarchical configurations.
//!
//! A key such as `tables.table(1).fields.field(0)[@type]` is parsed into
//! segments and resolved against any tree exposed through
//! [`arbor_tree::NodeHandler`]. The engine also works in the other direction,
//! producing the key of a given node.

pub mod ast;
pub mod engine;
pub mod error;
mod parser;
pub mod results;
pub mod symbols;

// --- Public API ---
pub use ast::{KeySegment, ParsedKey};
pub use engine::{DefaultExpressionEngine, ExpressionEngine};
pub use error::ExpressionError;
pub use parser::parse_key;
pub use results::{NodeAddData, QueryResult};
pub use symbols::ExpressionSymbols;
