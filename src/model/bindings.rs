//! Protocol bindings
//!
//! Binding payloads are protocol specific and out of scope for the typed
//! model; a [`Binding`] keeps `bindingVersion` plus the raw fields.

use anyhow::{anyhow, Result};
use indexmap::IndexMap;
use serde_json::Map;

use super::{AsyncApiAny, Extensions};
use crate::node::ParseNode;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    /// Protocol name to binding, in document order
    pub entries: IndexMap<String, Binding>,
    pub extensions: Extensions,
}

impl Bindings {
    pub fn get(&self, protocol: &str) -> Option<&Binding> {
        self.entries.get(protocol)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.extensions.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Binding {
    pub binding_version: Option<String>,
    pub fields: Map<String, AsyncApiAny>,
}

impl Binding {
    /// Generic loader used for every catalogued protocol
    pub fn from_node(node: &ParseNode) -> Result<Binding> {
        let map = node
            .as_map()
            .ok_or_else(|| anyhow!("expected a map, found {}", node.kind_name()))?;
        let mut binding = Binding::default();
        for (key, value) in map.iter() {
            if key == "bindingVersion" {
                let version = value
                    .as_str()
                    .ok_or_else(|| anyhow!("bindingVersion must be a scalar"))?;
                binding.binding_version = Some(version.to_string());
            } else {
                binding.fields.insert(key.to_string(), value.to_value());
            }
        }
        Ok(binding)
    }

    /// `bindingVersion` first, then the fields
    pub fn to_value(&self) -> AsyncApiAny {
        let mut out = Map::new();
        if let Some(version) = &self.binding_version {
            out.insert("bindingVersion".to_string(), AsyncApiAny::String(version.clone()));
        }
        out.extend(self.fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        AsyncApiAny::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_binding_from_node() {
        let node = ParseNode::from(json!({
            "bindingVersion": "0.4.0",
            "clientId": {"type": "string"}
        }));
        let binding = Binding::from_node(&node).unwrap();
        assert_eq!(binding.binding_version.as_deref(), Some("0.4.0"));
        assert_eq!(binding.fields["clientId"], json!({"type": "string"}));
        assert_eq!(binding.to_value(), node.to_value());
    }

    #[test]
    fn test_binding_rejects_scalar() {
        let err = Binding::from_node(&ParseNode::from(json!("kafka"))).unwrap_err();
        assert!(err.to_string().contains("expected a map"));
    }
}
