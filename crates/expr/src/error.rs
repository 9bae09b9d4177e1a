use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("Invalid key '{key}': {message}")]
    InvalidArgument { key: String, message: String },

    #[error("Cannot add key '{key}': {message}")]
    StructuralConflict { key: String, message: String },

    #[error("Invalid expression symbols: {0}")]
    InvalidSymbols(String),
}

impl ExpressionError {
    pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
        ExpressionError::InvalidArgument {
            key: key.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn conflict(key: &str, message: impl Into<String>) -> Self {
        ExpressionError::StructuralConflict {
            key: key.to_string(),
            message: message.into(),
        }
    }
}
