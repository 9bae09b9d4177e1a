//! Defines the parsed form of a configuration key.
use std::fmt;

/// One component of a parsed key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySegment {
    /// Selects children by name (e.g., `field`), optionally only the n-th
    /// same-named child (e.g., `field(2)`).
    Child { name: String, index: Option<usize> },
    /// Selects an attribute of the current node (e.g., `[@type]`).
    Attribute(String),
}

impl KeySegment {
    pub fn child(name: impl Into<String>) -> Self {
        KeySegment::Child {
            name: name.into(),
            index: None,
        }
    }

    pub fn indexed(name: impl Into<String>, index: usize) -> Self {
        KeySegment::Child {
            name: name.into(),
            index: Some(index),
        }
    }

    pub fn attribute(name: impl Into<String>) -> Self {
        KeySegment::Attribute(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            KeySegment::Child { name, .. } | KeySegment::Attribute(name) => name,
        }
    }

    pub fn is_attribute(&self) -> bool {
        matches!(self, KeySegment::Attribute(_))
    }
}

/// A key broken into segments. The empty key addresses the root node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedKey {
    pub segments: Vec<KeySegment>,
}

impl ParsedKey {
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True if an attribute marker appears anywhere but in the last position.
    pub fn has_inner_attribute(&self) -> bool {
        self.segments
            .iter()
            .rev()
            .skip(1)
            .any(KeySegment::is_attribute)
    }
}

impl fmt::Display for KeySegment {
    /// Renders the segment with the default symbols.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySegment::Child { name, index: None } => write!(f, "{name}"),
            KeySegment::Child {
                name,
                index: Some(i),
            } => write!(f, "{name}({i})"),
            KeySegment::Attribute(name) => write!(f, "[@{name}]"),
        }
    }
}
