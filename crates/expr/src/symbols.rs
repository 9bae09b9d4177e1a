use serde::{Deserialize, Serialize};

/// The reserved character sequences of the key syntax.
///
/// Defaults produce keys like `tables.table(1).fields.field(0)[@type]`.
/// A delimiter that is part of a node name is written as the escaped
/// delimiter (`a..b` addresses a single node named `a.b`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExpressionSymbols {
    pub property_delimiter: String,
    pub escaped_delimiter: String,
    pub index_start: String,
    pub index_end: String,
    pub attribute_start: String,
    pub attribute_end: String,
}

impl Default for ExpressionSymbols {
    fn default() -> Self {
        Self {
            property_delimiter: ".".to_string(),
            escaped_delimiter: "..".to_string(),
            index_start: "(".to_string(),
            index_end: ")".to_string(),
            attribute_start: "[@".to_string(),
            attribute_end: "]".to_string(),
        }
    }
}

impl ExpressionSymbols {
    pub fn with_property_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.property_delimiter = delimiter.into();
        self
    }

    pub fn with_escaped_delimiter(mut self, escaped: impl Into<String>) -> Self {
        self.escaped_delimiter = escaped.into();
        self
    }

    pub fn with_index_brackets(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.index_start = start.into();
        self.index_end = end.into();
        self
    }

    pub fn with_attribute_brackets(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.attribute_start = start.into();
        self.attribute_end = end.into();
        self
    }

    /// Checks that every symbol is set and that the delimiter does not
    /// collide with the bracket symbols.
    pub fn validate(&self) -> Result<(), String> {
        let all = [
            ("property delimiter", &self.property_delimiter),
            ("escaped delimiter", &self.escaped_delimiter),
            ("index start", &self.index_start),
            ("index end", &self.index_end),
            ("attribute start", &self.attribute_start),
            ("attribute end", &self.attribute_end),
        ];
        if let Some((label, _)) = all.iter().find(|(_, s)| s.is_empty()) {
            return Err(format!("{label} must not be empty"));
        }
        if self.escaped_delimiter == self.property_delimiter {
            return Err("escaped delimiter must differ from the property delimiter".to_string());
        }
        for (label, symbol) in &all[2..] {
            if symbol.starts_with(self.property_delimiter.as_str()) {
                return Err(format!("{label} must not start with the property delimiter"));
            }
        }
        Ok(())
    }
}
