//! Tagged-variant configuration tree.
//!
//! Every node is explicitly a scalar, a list or a nested tree, so shape
//! compatibility during merging is a structural comparison.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Structural shape of a configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// Unset placeholder; compatible with every shape.
    Null,
    Scalar,
    List,
    Tree,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Null => write!(f, "null"),
            Shape::Scalar => write!(f, "scalar"),
            Shape::List => write!(f, "list"),
            Shape::Tree => write!(f, "tree"),
        }
    }
}

/// A single configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<ConfigValue>),
    Tree(ConfigTree),
}

impl ConfigValue {
    pub fn shape(&self) -> Shape {
        match self {
            ConfigValue::Null => Shape::Null,
            ConfigValue::Bool(_) | ConfigValue::Number(_) | ConfigValue::String(_) => Shape::Scalar,
            ConfigValue::List(_) => Shape::List,
            ConfigValue::Tree(_) => Shape::Tree,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_tree(&self) -> Option<&ConfigTree> {
        match self {
            ConfigValue::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    /// String items of a list value; non-string items are skipped.
    pub fn string_items(&self) -> Vec<&str> {
        self.as_list()
            .map(|items| items.iter().filter_map(ConfigValue::as_str).collect())
            .unwrap_or_default()
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Number(value.into())
    }
}

impl From<ConfigTree> for ConfigValue {
    fn from(value: ConfigTree) -> Self {
        ConfigValue::Tree(value)
    }
}

impl<T: Into<ConfigValue>> From<Vec<T>> for ConfigValue {
    fn from(values: Vec<T>) -> Self {
        ConfigValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<Value> for ConfigValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ConfigValue::Null,
            Value::Bool(b) => ConfigValue::Bool(b),
            Value::Number(n) => ConfigValue::Number(n),
            Value::String(s) => ConfigValue::String(s),
            Value::Array(items) => ConfigValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => ConfigValue::Tree(ConfigTree(
                map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            )),
        }
    }
}

impl From<&ConfigValue> for Value {
    fn from(value: &ConfigValue) -> Self {
        match value {
            ConfigValue::Null => Value::Null,
            ConfigValue::Bool(b) => Value::Bool(*b),
            ConfigValue::Number(n) => Value::Number(n.clone()),
            ConfigValue::String(s) => Value::String(s.clone()),
            ConfigValue::List(items) => Value::Array(items.iter().map(Value::from).collect()),
            ConfigValue::Tree(tree) => tree.to_json(),
        }
    }
}

/// A node of nested configuration keyed by unique strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigTree(BTreeMap<String, ConfigValue>);

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a tree from YAML text. The document root must be a mapping.
    pub fn from_yaml_str(origin: &str, text: &str) -> Result<Self, crate::error::ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        serde_yaml::from_str(text).map_err(|e| crate::error::ConfigError::parse(origin, e))
    }

    /// Parse a tree from JSON text. The document root must be an object.
    pub fn from_json_str(origin: &str, text: &str) -> Result<Self, crate::error::ConfigError> {
        serde_json::from_str(text).map_err(|e| crate::error::ConfigError::parse(origin, e))
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v)))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.0.get(key)
    }

    /// Look up a value by dotted path, e.g. `HTML-CSS.tooltip.delayPost`.
    ///
    /// Keys containing dots (such as `mml2jax.js`) are matched whole before
    /// the path is split.
    pub fn get_path(&self, path: &str) -> Option<&ConfigValue> {
        if let Some(value) = self.0.get(path) {
            return Some(value);
        }
        let mut split_at = path.find('.');
        while let Some(idx) = split_at {
            let (head, rest) = (&path[..idx], &path[idx + 1..]);
            if let Some(found) = self
                .0
                .get(head)
                .and_then(ConfigValue::as_tree)
                .and_then(|sub| sub.get_path(rest))
            {
                return Some(found);
            }
            split_at = path[idx + 1..].find('.').map(|next| idx + 1 + next);
        }
        None
    }

    pub fn subtree(&self, key: &str) -> Option<&ConfigTree> {
        self.get(key).and_then(ConfigValue::as_tree)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Option<ConfigValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<ConfigValue> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for ConfigTree {
    type Item = (String, ConfigValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, ConfigValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(String, ConfigValue)> for ConfigTree {
    fn from_iter<I: IntoIterator<Item = (String, ConfigValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_yaml_parses_into_tagged_variants() {
        let tree = ConfigTree::from_yaml_str(
            "inline",
            "jax: [input/MathML]\nscale: 100\nshow: true\nimageFont: null\nHTML-CSS:\n  webFont: TeX\n",
        )
        .unwrap();
        assert_eq!(tree.get("jax").unwrap().shape(), Shape::List);
        assert_eq!(tree.get("scale").unwrap().as_i64(), Some(100));
        assert_eq!(tree.get("show").unwrap().as_bool(), Some(true));
        assert!(tree.get("imageFont").unwrap().is_null());
        assert_eq!(tree.get("HTML-CSS").unwrap().shape(), Shape::Tree);
    }

    #[test]
    fn test_non_mapping_root_is_rejected() {
        assert!(ConfigTree::from_yaml_str("inline", "- a\n- b\n").is_err());
        assert!(ConfigTree::from_json_str("inline", "[1, 2]").is_err());
    }

    #[test]
    fn test_empty_yaml_is_empty_tree() {
        assert!(ConfigTree::from_yaml_str("inline", "  \n").unwrap().is_empty());
    }

    #[test]
    fn test_get_path() {
        let tree: ConfigTree = serde_json::from_value(json!({
            "HTML-CSS": { "tooltip": { "delayPost": 600 } },
            "mml2jax.js": { "preview": "alttext" }
        }))
        .unwrap();
        assert_eq!(
            tree.get_path("HTML-CSS.tooltip.delayPost").and_then(ConfigValue::as_i64),
            Some(600)
        );
        assert_eq!(
            tree.get_path("mml2jax.js.preview").and_then(ConfigValue::as_str),
            Some("alttext")
        );
        assert!(tree.get_path("HTML-CSS.missing").is_none());
    }

    #[test]
    fn test_json_conversion_is_lossless() {
        let value = json!({"a": [1, "two", null, {"b": false}], "c": 1.5});
        let tree = match ConfigValue::from(value.clone()) {
            ConfigValue::Tree(tree) => tree,
            other => panic!("expected tree, got {:?}", other),
        };
        assert_eq!(tree.to_json(), value);
    }
}
