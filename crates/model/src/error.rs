use arbor_expr::ExpressionError;
use arbor_tree::StaleNodeError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid argument for key '{key}': {message}")]
    InvalidArgument { key: String, message: String },

    #[error("Structural conflict for key '{key}': {message}")]
    StructuralConflict { key: String, message: String },

    #[error("Key resolution failed: {0}")]
    Expression(#[from] ExpressionError),

    #[error(transparent)]
    StaleNode(#[from] StaleNodeError),
}

impl ModelError {
    pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
        ModelError::InvalidArgument {
            key: key.to_string(),
            message: message.into(),
        }
    }
}
