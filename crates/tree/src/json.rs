//! Conversion between JSON documents and configuration nodes.
//!
//! - objects become children, one per member
//! - arrays become repeated siblings sharing the member name
//! - members starting with `@` become attributes
//! - a `#value` member carries the element's own value next to children
//! - scalars become node values; `null` means "no value" (or "no attribute")
//!
//! Members keep their document order.

use crate::node::TreeNode;
use serde_json::{Map, Value};

const ATTRIBUTE_PREFIX: char = '@';
const VALUE_MEMBER: &str = "#value";

/// Builds a node named `name` from a JSON value.
pub fn from_json(name: &str, json: &Value) -> TreeNode {
    let mut node = TreeNode::new(name);
    fill_node(&mut node, json);
    node
}

fn fill_node(node: &mut TreeNode, json: &Value) {
    match json {
        Value::Null => {}
        Value::Object(members) => {
            for (key, member) in members {
                if key == VALUE_MEMBER {
                    if !member.is_null() {
                        node.value = Some(member.clone());
                    }
                } else if let Some(attr) = key.strip_prefix(ATTRIBUTE_PREFIX) {
                    if !member.is_null() {
                        node.attributes.push((attr.to_string(), member.clone()));
                    }
                } else if let Value::Array(items) = member {
                    for item in items {
                        node.children.push(from_json(key, item));
                    }
                } else {
                    node.children.push(from_json(key, member));
                }
            }
        }
        // A bare array below a named node has no member names to spread over.
        Value::Array(items) => {
            let name = node.name.clone();
            for item in items {
                node.children.push(from_json(&name, item));
            }
        }
        scalar => node.value = Some(scalar.clone()),
    }
}

/// Renders a node (without its own name) as JSON, the inverse of [`from_json`].
pub fn to_json(node: &TreeNode) -> Value {
    if node.children.is_empty() && node.attributes.is_empty() {
        return node.value.clone().unwrap_or(Value::Null);
    }
    let mut members = Map::new();
    if let Some(value) = &node.value {
        members.insert(VALUE_MEMBER.to_string(), value.clone());
    }
    for (name, value) in &node.attributes {
        members.insert(format!("{ATTRIBUTE_PREFIX}{name}"), value.clone());
    }
    for child in &node.children {
        let rendered = to_json(child);
        match members.get_mut(&child.name) {
            Some(Value::Array(items)) => items.push(rendered),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, rendered]);
            }
            None => {
                members.insert(child.name.clone(), rendered);
            }
        }
    }
    Value::Object(members)
}
