//! Channels and channel parameters

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{Bindings, Extensions, ExternalDocumentation, Message, ModelRef, Server, Tag};

static ADDRESS_PARAMETER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^}]+)\}").expect("valid address parameter regex"));

/// An addressable component messages flow through
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Channel {
    /// May contain `{parameter}` expressions; `None` means the address is
    /// dynamic or unknown
    pub address: Option<String>,
    pub messages: IndexMap<String, ModelRef<Message>>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub servers: Vec<ModelRef<Server>>,
    pub parameters: IndexMap<String, ModelRef<Parameter>>,
    pub tags: Vec<ModelRef<Tag>>,
    pub external_docs: Option<ModelRef<ExternalDocumentation>>,
    pub bindings: Option<ModelRef<Bindings>>,
    pub extensions: Extensions,
}

impl Channel {
    /// Names of the `{parameter}` expressions in the address, in order
    pub fn address_parameters(&self) -> Vec<String> {
        self.address
            .as_deref()
            .map(|address| {
                ADDRESS_PARAMETER
                    .captures_iter(address)
                    .map(|c| c[1].to_string())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Value description for one address parameter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameter {
    pub enum_values: Vec<String>,
    pub default: Option<String>,
    pub description: Option<String>,
    pub examples: Vec<String>,
    /// Runtime expression (`$message.payload#/user/id`)
    pub location: Option<String>,
    pub extensions: Extensions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parameters() {
        let channel = Channel {
            address: Some("smartylighting/{streetlightId}/lighting/{phase}".into()),
            ..Default::default()
        };
        assert_eq!(channel.address_parameters(), vec!["streetlightId", "phase"]);
        assert!(Channel::default().address_parameters().is_empty());
    }
}
