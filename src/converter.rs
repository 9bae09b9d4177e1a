// src/converter.rs
//! Replays a configuration as a stream of nested element callbacks.
//!
//! The configuration is read through its defined keys only, the way an
//! exporter for a flat key/value store would see it. Same-named siblings
//! therefore collapse into repeated elements under one parent.

use crate::configuration::HierarchicalConfiguration;
use crate::error::ConfigurationError;
use arbor_expr::{DefaultExpressionEngine, KeySegment};
use serde_json::Value;
use std::collections::HashSet;

/// Receives the elements produced by [`process`].
pub trait ElementHandler {
    fn element_start(&mut self, name: &str, value: Option<&Value>);

    fn element_end(&mut self, name: &str);

    /// An attribute of the innermost open element, or of the root if none is open.
    fn attribute(&mut self, _name: &str, _value: &Value) {}
}

/// Walks the defined keys of `config` and reports them as nested elements.
///
/// A key with several values fires one element per value. Every
/// `element_start` is matched by an `element_end`.
pub fn process<H>(config: &HierarchicalConfiguration, handler: &mut H) -> Result<(), ConfigurationError>
where
    H: ElementHandler + ?Sized,
{
    let engine = config.expression_engine().as_ref();
    let entries = config
        .get_keys()
        .into_iter()
        .map(|key| KeyEntry::parse(engine, key))
        .collect::<Result<Vec<_>, _>>()?;

    let mut open = ElementStack::default();
    let mut emitted = HashSet::new();
    for (i, entry) in entries.iter().enumerate() {
        if emitted.contains(&entry.key) {
            continue;
        }

        if let Some(attribute) = &entry.attribute {
            open.sync(&entry.path, config, handler, &mut emitted)?;
            for value in spread(config.get_property(&entry.key)?) {
                handler.attribute(attribute, &value);
            }
            continue;
        }

        let Some((leaf, parents)) = entry.path.split_last() else {
            continue;
        };
        open.sync(parents, config, handler, &mut emitted)?;
        let mut values = spread(config.get_property(&entry.key)?);
        let has_children = entries.get(i + 1).is_some_and(|next| next.is_below(entry));

        if has_children {
            let last = values.pop();
            for value in &values {
                fire_value(handler, leaf, Some(value));
            }
            handler.element_start(leaf, last.as_ref());
            open.push(leaf, &entry.key);
        } else if values.is_empty() {
            fire_value(handler, leaf, None);
        } else {
            for value in &values {
                fire_value(handler, leaf, Some(value));
            }
        }
    }
    open.close_all(handler);
    Ok(())
}

fn fire_value<H: ElementHandler + ?Sized>(handler: &mut H, name: &str, value: Option<&Value>) {
    handler.element_start(name, value);
    handler.element_end(name);
}

fn spread(value: Option<Value>) -> Vec<Value> {
    match value {
        None => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => vec![other],
    }
}

/// A defined key split into element names and an optional trailing attribute.
#[derive(Debug)]
struct KeyEntry {
    key: String,
    path: Vec<String>,
    attribute: Option<String>,
}

impl KeyEntry {
    fn parse(engine: &DefaultExpressionEngine, key: String) -> Result<Self, ConfigurationError> {
        let parsed = engine.parse(&key)?;
        let mut path = Vec::with_capacity(parsed.len());
        let mut attribute = None;
        for segment in parsed.segments {
            match segment {
                KeySegment::Child { name, .. } => path.push(name),
                KeySegment::Attribute(name) => attribute = Some(name),
            }
        }
        Ok(Self { key, path, attribute })
    }

    /// True if `self` addresses something inside the element `other` names.
    fn is_below(&self, other: &KeyEntry) -> bool {
        other.attribute.is_none()
            && self.path.starts_with(&other.path)
            && (self.path.len() > other.path.len() || self.attribute.is_some())
    }
}

/// The currently open elements, outermost first, with the keys they stand for.
#[derive(Debug, Default)]
struct ElementStack {
    names: Vec<String>,
    keys: Vec<String>,
}

impl ElementStack {
    fn push(&mut self, name: &str, key: &str) {
        self.names.push(name.to_string());
        self.keys.push(key.to_string());
    }

    /// Closes and opens elements until exactly `target` is open.
    fn sync<H: ElementHandler + ?Sized>(
        &mut self,
        target: &[String],
        config: &HierarchicalConfiguration,
        handler: &mut H,
        emitted: &mut HashSet<String>,
    ) -> Result<(), ConfigurationError> {
        let common = self
            .names
            .iter()
            .zip(target)
            .take_while(|(open, wanted)| open == wanted)
            .count();
        while self.names.len() > common {
            self.pop(handler);
        }

        let engine = config.expression_engine();
        for name in &target[common..] {
            let key = engine.child_key(self.keys.last().map(String::as_str).unwrap_or_default(), name);
            let value = config.get_property(&key)?;
            handler.element_start(name, value.as_ref());
            emitted.insert(key.clone());
            self.push(name, &key);
        }
        Ok(())
    }

    fn pop<H: ElementHandler + ?Sized>(&mut self, handler: &mut H) {
        self.keys.pop();
        if let Some(name) = self.names.pop() {
            handler.element_end(&name);
        }
    }

    fn close_all<H: ElementHandler + ?Sized>(&mut self, handler: &mut H) {
        while !self.names.is_empty() {
            self.pop(handler);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_tree::TreeNode;

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl ElementHandler for Recorder {
        fn element_start(&mut self, name: &str, value: Option<&Value>) {
            match value {
                Some(value) => self.0.push(format!("<{name}={value}>")),
                None => self.0.push(format!("<{name}>")),
            }
        }

        fn element_end(&mut self, name: &str) {
            self.0.push(format!("</{name}>"));
        }

        fn attribute(&mut self, name: &str, value: &Value) {
            self.0.push(format!("@{name}={value}"));
        }
    }

    #[test]
    fn nested_elements_follow_key_structure() {
        let config = HierarchicalConfiguration::with_root(
            TreeNode::new("config")
                .with_attribute("version", 2)
                .with_child(
                    TreeNode::new("db")
                        .with_value("main")
                        .with_child(TreeNode::new("host").with_value("localhost"))
                        .with_child(TreeNode::new("port").with_value(5432)),
                )
                .with_child(
                    TreeNode::new("cache")
                        .with_attribute("enabled", true)
                        .with_child(TreeNode::new("ttl").with_value(60)),
                ),
        )
        .unwrap();
        let mut recorder = Recorder::default();
        process(&config, &mut recorder).unwrap();
        assert_eq!(
            recorder.0,
            vec![
                "@version=2",
                "<db=\"main\">",
                "<host=\"localhost\">",
                "</host>",
                "<port=5432>",
                "</port>",
                "</db>",
                "<cache>",
                "@enabled=true",
                "<ttl=60>",
                "</ttl>",
                "</cache>",
            ]
        );
    }

    #[test]
    fn list_values_fire_one_element_each() {
        let config = HierarchicalConfiguration::with_root(
            TreeNode::new("config").with_child(
                TreeNode::new("servers")
                    .with_child(TreeNode::new("name").with_value("a"))
                    .with_child(TreeNode::new("name").with_value("b")),
            ),
        )
        .unwrap();
        let mut recorder = Recorder::default();
        process(&config, &mut recorder).unwrap();
        assert_eq!(
            recorder.0,
            vec!["<servers>", "<name=\"a\">", "</name>", "<name=\"b\">", "</name>", "</servers>"]
        );
    }

    #[test]
    fn empty_configuration_fires_nothing() {
        let mut recorder = Recorder::default();
        process(&HierarchicalConfiguration::new(), &mut recorder).unwrap();
        assert!(recorder.0.is_empty());
    }
}
