//! The mutable side of a hierarchical configuration.
//!
//! [`NodeModel`] owns the tree and applies updates; a [`NodeKeyResolver`]
//! turns keys into the positions those updates touch.

pub mod change;
pub mod delimiter;
pub mod error;
pub mod model;
pub mod resolver;

pub use change::{RemovedItem, TreeChange};
pub use delimiter::{DefaultListDelimiterHandler, DisabledListDelimiterHandler, ListDelimiterHandler};
pub use error::ModelError;
pub use model::{NodeModel, PropertyValue};
pub use resolver::{DefaultKeyResolver, NodeKeyResolver, NodeUpdateData};
