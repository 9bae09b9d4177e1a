//! Splitting of property values into the individual values they stand for.
use serde_json::Value;
use std::fmt;

/// Turns one value passed to a property operation into a sequence of values.
pub trait ListDelimiterHandler: fmt::Debug + Send + Sync {
    fn split(&self, value: &Value) -> Vec<Value>;
}

/// Arrays are flattened; strings are taken as they are; `null` yields nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledListDelimiterHandler;

impl ListDelimiterHandler for DisabledListDelimiterHandler {
    fn split(&self, value: &Value) -> Vec<Value> {
        let mut out = Vec::new();
        flatten(value, &mut out, &|v, out| out.push(v.clone()));
        out
    }
}

/// Like [`DisabledListDelimiterHandler`], but strings are additionally split
/// at a delimiter character. A backslash escapes the delimiter.
#[derive(Debug, Clone, Copy)]
pub struct DefaultListDelimiterHandler {
    delimiter: char,
}

impl DefaultListDelimiterHandler {
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    fn split_string(&self, s: &str, out: &mut Vec<Value>) {
        let mut current = String::new();
        let mut chars = s.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\\' && chars.peek() == Some(&self.delimiter) {
                current.push(self.delimiter);
                chars.next();
            } else if c == self.delimiter {
                out.push(Value::String(current.trim().to_string()));
                current.clear();
            } else {
                current.push(c);
            }
        }
        out.push(Value::String(current.trim().to_string()));
    }
}

impl ListDelimiterHandler for DefaultListDelimiterHandler {
    fn split(&self, value: &Value) -> Vec<Value> {
        let mut out = Vec::new();
        flatten(value, &mut out, &|v, out| match v {
            Value::String(s) => self.split_string(s, out),
            other => out.push(other.clone()),
        });
        out
    }
}

fn flatten(value: &Value, out: &mut Vec<Value>, scalar: &dyn Fn(&Value, &mut Vec<Value>)) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                flatten(item, out, scalar);
            }
        }
        other => scalar(other, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn disabled_handler_flattens_arrays_only() {
        let handler = DisabledListDelimiterHandler;
        assert_eq!(handler.split(&json!("a,b")), vec![json!("a,b")]);
        assert_eq!(handler.split(&json!([1, [2, 3], null])), vec![json!(1), json!(2), json!(3)]);
        assert!(handler.split(&Value::Null).is_empty());
    }

    #[test]
    fn default_handler_splits_strings() {
        let handler = DefaultListDelimiterHandler::new(',');
        assert_eq!(
            handler.split(&json!("a, b ,c")),
            vec![json!("a"), json!("b"), json!("c")]
        );
        assert_eq!(handler.split(&json!(r"a\,b,c")), vec![json!("a,b"), json!("c")]);
        assert_eq!(handler.split(&json!(["x,y", 7])), vec![json!("x"), json!("y"), json!(7)]);
    }
}
