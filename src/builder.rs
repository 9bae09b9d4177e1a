// src/builder.rs
use crate::configuration::HierarchicalConfiguration;
use crate::error::ConfigurationError;
use arbor_expr::{DefaultExpressionEngine, ExpressionSymbols};
use arbor_model::{DefaultListDelimiterHandler, DisabledListDelimiterHandler, ListDelimiterHandler};
use arbor_tree::{TreeNode, json};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

/// A builder for creating a [`HierarchicalConfiguration`].
#[derive(Debug, Default)]
pub struct ConfigurationBuilder {
    root: TreeNode,
    symbols: Option<ExpressionSymbols>,
    engine: Option<Arc<DefaultExpressionEngine>>,
    delimiter: Option<Arc<dyn ListDelimiterHandler>>,
}

impl ConfigurationBuilder {
    /// Creates a builder for an empty configuration with default symbols and no list splitting.
    pub fn new() -> Self {
        Default::default()
    }

    /// Starts from a copy of `root`.
    pub fn with_root(mut self, root: TreeNode) -> Self {
        self.root = root;
        self
    }

    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root.name = name.into();
        self
    }

    /// Starts from a JSON document, see [`arbor_tree::json`].
    pub fn with_json(mut self, root_name: &str, document: &Value) -> Self {
        self.root = json::from_json(root_name, document);
        self
    }

    /// Loads a JSON document from a file. The root is named after the file stem.
    pub fn with_json_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigurationError> {
        let path_ref = path.as_ref();
        let source = fs::read_to_string(path_ref).map_err(|e| {
            ConfigurationError::Io(io::Error::new(
                e.kind(),
                format!("Failed to read configuration from '{}': {}", path_ref.display(), e),
            ))
        })?;
        let document: Value = serde_json::from_str(&source)?;
        let root_name = path_ref.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        log::debug!("Loaded configuration '{}' from {}", root_name, path_ref.display());
        Ok(self.with_json(root_name, &document))
    }

    /// Uses a default engine with custom key symbols. Validated in [`build`](Self::build).
    pub fn with_symbols(mut self, symbols: ExpressionSymbols) -> Self {
        self.symbols = Some(symbols);
        self
    }

    /// Shares an existing engine; takes precedence over [`with_symbols`](Self::with_symbols).
    pub fn with_engine(mut self, engine: Arc<DefaultExpressionEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Splits string values at `delimiter` when properties are set or added.
    pub fn with_list_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(Arc::new(DefaultListDelimiterHandler::new(delimiter)));
        self
    }

    pub fn with_list_delimiter_handler(mut self, handler: Arc<dyn ListDelimiterHandler>) -> Self {
        self.delimiter = Some(handler);
        self
    }

    /// Consumes the builder and creates the configuration.
    ///
    /// Fails if the symbols are invalid or a name in the tree cannot be keyed with them.
    pub fn build(self) -> Result<HierarchicalConfiguration, ConfigurationError> {
        let engine = match (self.engine, self.symbols) {
            (Some(engine), _) => engine,
            (None, Some(symbols)) => Arc::new(DefaultExpressionEngine::new(symbols)?),
            (None, None) => DefaultExpressionEngine::shared(),
        };
        let delimiter = self
            .delimiter
            .unwrap_or_else(|| Arc::new(DisabledListDelimiterHandler));
        HierarchicalConfiguration::from_parts(&self.root, engine, delimiter)
    }
}
