// src/error.rs
use arbor_expr::ExpressionError;
use arbor_model::ModelError;
use thiserror::Error;

/// The error type of every fallible configuration operation.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Invalid argument for key '{key}': {message}")]
    InvalidArgument { key: String, message: String },

    #[error("Structural conflict for key '{key}': {message}")]
    StructuralConflict { key: String, message: String },

    /// An internal invariant did not hold. Never caused by user input.
    #[error("Internal failure: {0}")]
    RuntimeFailure(String),

    #[error("Model operation failed: {0}")]
    Model(#[from] ModelError),

    #[error("Key expression error: {0}")]
    Expression(#[from] ExpressionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigurationError {
    pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigurationError::InvalidArgument {
            key: key.to_string(),
            message: message.into(),
        }
    }

    /// True for errors caused by a malformed key or an unsupported target.
    pub fn is_invalid_argument(&self) -> bool {
        match self {
            ConfigurationError::InvalidArgument { .. } => true,
            ConfigurationError::Model(ModelError::InvalidArgument { .. })
            | ConfigurationError::Model(ModelError::Expression(ExpressionError::InvalidArgument { .. }))
            | ConfigurationError::Expression(ExpressionError::InvalidArgument { .. }) => true,
            _ => false,
        }
    }

    /// True for errors caused by a key that tries to grow below an attribute.
    pub fn is_structural_conflict(&self) -> bool {
        match self {
            ConfigurationError::StructuralConflict { .. } => true,
            ConfigurationError::Model(ModelError::StructuralConflict { .. })
            | ConfigurationError::Model(ModelError::Expression(ExpressionError::StructuralConflict { .. }))
            | ConfigurationError::Expression(ExpressionError::StructuralConflict { .. }) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_expr::{DefaultExpressionEngine, ExpressionEngine};

    #[test]
    fn expression_errors_are_classified_at_every_level() {
        let engine = DefaultExpressionEngine::default();
        let parse = ConfigurationError::from(engine.parse("a(").unwrap_err());
        assert!(parse.is_invalid_argument());
        assert!(parse.to_string().starts_with("Key expression error"));

        let name = ConfigurationError::from(ModelError::from(engine.validate_node_name("").unwrap_err()));
        assert!(name.is_invalid_argument());
        assert!(!name.is_structural_conflict());

        let conflict = ConfigurationError::Expression(ExpressionError::StructuralConflict {
            key: "a[@b].c".to_string(),
            message: "attribute key in the middle of the path".to_string(),
        });
        assert!(conflict.is_structural_conflict());
        assert!(!conflict.is_invalid_argument());
    }
}
