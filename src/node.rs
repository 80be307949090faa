//! Format-neutral parse tree
//!
//! JSON and YAML input both become the same [`ParseNode`] shape before any
//! typed loading happens:
//! - maps keep their key order
//! - scalars keep their original JSON type next to a string rendering
//! - `$ref` detection is a single call on [`MapNode`]

use indexmap::IndexMap;
use serde_json::{Number, Value};

/// A node of the generic tree
#[derive(Debug, Clone, PartialEq)]
pub enum ParseNode {
    Map(MapNode),
    List(ListNode),
    Scalar(ScalarNode),
    Null,
}

/// Ordered key/value node
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MapNode {
    entries: IndexMap<String, ParseNode>,
}

/// Ordered list node
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListNode {
    items: Vec<ParseNode>,
}

/// Scalar with its string rendering
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarNode {
    text: String,
    value: Value,
}

impl ParseNode {
    /// Parse JSON text into a tree
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from(value))
    }

    /// Parse YAML text into a tree
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        let value: serde_yaml::Value = serde_yaml::from_str(text)?;
        Ok(Self::from(value))
    }

    pub fn as_map(&self) -> Option<&MapNode> {
        match self {
            ParseNode::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListNode> {
        match self {
            ParseNode::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarNode> {
        match self {
            ParseNode::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// String value of a scalar node
    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().map(ScalarNode::as_str)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParseNode::Null)
    }

    /// Short shape name used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            ParseNode::Map(_) => "map",
            ParseNode::List(_) => "list",
            ParseNode::Scalar(_) => "scalar",
            ParseNode::Null => "null",
        }
    }

    /// Follow a JSON pointer (`/a/b/0`) from this node
    pub fn find(&self, pointer: &str) -> Option<&ParseNode> {
        let pointer = pointer.strip_prefix('#').unwrap_or(pointer);
        if pointer.is_empty() || pointer == "/" {
            return Some(self);
        }
        let mut current = self;
        for raw in pointer.trim_start_matches('/').split('/') {
            let segment = crate::location::unescape_segment(raw);
            current = match current {
                ParseNode::Map(map) => map.get(&segment)?,
                ParseNode::List(list) => list.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Convert back into a JSON value
    pub fn to_value(&self) -> Value {
        match self {
            ParseNode::Map(map) => Value::Object(
                map.entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_value()))
                    .collect(),
            ),
            ParseNode::List(list) => {
                Value::Array(list.items.iter().map(ParseNode::to_value).collect())
            }
            ParseNode::Scalar(scalar) => scalar.value.clone(),
            ParseNode::Null => Value::Null,
        }
    }
}

impl MapNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, node: ParseNode) {
        self.entries.insert(key.into(), node);
    }

    pub fn get(&self, key: &str) -> Option<&ParseNode> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Entries in document order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParseNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pointer string of a `$ref` member, if this map is a reference
    pub fn reference_pointer(&self) -> Option<&str> {
        self.get("$ref").and_then(ParseNode::as_str)
    }

    /// String value of a scalar member
    pub fn scalar(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ParseNode::as_str)
    }
}

impl ListNode {
    pub fn iter(&self) -> impl Iterator<Item = &ParseNode> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&ParseNode> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<ParseNode> for ListNode {
    fn from_iter<I: IntoIterator<Item = ParseNode>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl ScalarNode {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The scalar with its original JSON type
    pub fn value(&self) -> &Value {
        &self.value
    }

    fn from_value(value: Value) -> Self {
        let text = match &value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self { text, value }
    }
}

impl From<Value> for ParseNode {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ParseNode::Null,
            Value::Object(object) => ParseNode::Map(MapNode {
                entries: object.into_iter().map(|(k, v)| (k, ParseNode::from(v))).collect(),
            }),
            Value::Array(items) => {
                ParseNode::List(items.into_iter().map(ParseNode::from).collect())
            }
            scalar => ParseNode::Scalar(ScalarNode::from_value(scalar)),
        }
    }
}

impl From<serde_yaml::Value> for ParseNode {
    fn from(value: serde_yaml::Value) -> Self {
        use serde_yaml::Value as Yaml;

        match value {
            Yaml::Null => ParseNode::Null,
            Yaml::Bool(b) => ParseNode::Scalar(ScalarNode::from_value(Value::Bool(b))),
            Yaml::Number(n) => ParseNode::Scalar(ScalarNode::from_value(yaml_number(&n))),
            Yaml::String(s) => ParseNode::Scalar(ScalarNode::from_value(Value::String(s))),
            Yaml::Sequence(items) => {
                ParseNode::List(items.into_iter().map(ParseNode::from).collect())
            }
            Yaml::Mapping(mapping) => ParseNode::Map(MapNode {
                entries: mapping
                    .into_iter()
                    .map(|(k, v)| (yaml_key(k), ParseNode::from(v)))
                    .collect(),
            }),
            Yaml::Tagged(tagged) => ParseNode::from(tagged.value),
        }
    }
}

fn yaml_number(number: &serde_yaml::Number) -> Value {
    if let Some(i) = number.as_i64() {
        Value::from(i)
    } else if let Some(u) = number.as_u64() {
        Value::from(u)
    } else {
        number
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

// YAML allows non-string keys (`200:`, `true:`); the tree only has string keys.
fn yaml_key(key: serde_yaml::Value) -> String {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => s,
        Yaml::Bool(b) => b.to_string(),
        Yaml::Number(n) => n.to_string(),
        Yaml::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
