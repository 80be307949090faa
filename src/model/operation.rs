//! Operations, operation traits and replies

use std::fmt;
use std::str::FromStr;

use super::{
    Bindings, Channel, Extensions, ExternalDocumentation, Message, ModelRef, SecurityScheme, Tag,
};
use crate::workspace::Workspace;

/// What the application does on the channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Action {
    #[default]
    Send,
    Receive,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Send => "send",
            Action::Receive => "receive",
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "send" => Ok(Action::Send),
            "receive" => Ok(Action::Receive),
            other => Err(format!("unknown operation action '{}'", other)),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Operation {
    pub action: Action,
    /// Exactly one channel; `None` only when the source omitted it
    pub channel: Option<ModelRef<Channel>>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub security: Vec<ModelRef<SecurityScheme>>,
    pub tags: Vec<ModelRef<Tag>>,
    pub external_docs: Option<ModelRef<ExternalDocumentation>>,
    pub bindings: Option<ModelRef<Bindings>>,
    pub traits: Vec<ModelRef<OperationTrait>>,
    /// Subset of the channel's messages
    pub messages: Vec<ModelRef<Message>>,
    pub reply: Option<ModelRef<OperationReply>>,
    pub extensions: Extensions,
}

impl Operation {
    /// Copy of this operation with its traits folded in
    ///
    /// Traits apply in declaration order, so a later trait overrides an earlier
    /// one; fields set on the operation itself always win.
    pub fn with_traits_applied(&self, workspace: &Workspace) -> Operation {
        let mut base = OperationTrait::default();
        for operation_trait in &self.traits {
            operation_trait.read(workspace, |t| base.overlay(t));
        }

        let mut merged = self.clone();
        merged.traits.clear();
        inherit(&mut merged.title, &base.title);
        inherit(&mut merged.summary, &base.summary);
        inherit(&mut merged.description, &base.description);
        inherit(&mut merged.external_docs, &base.external_docs);
        inherit(&mut merged.bindings, &base.bindings);
        if merged.security.is_empty() {
            merged.security = base.security;
        }
        if merged.tags.is_empty() {
            merged.tags = base.tags;
        }
        for (key, value) in base.extensions {
            merged.extensions.entry(key).or_insert(value);
        }
        merged
    }
}

/// Reusable partial operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationTrait {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub security: Vec<ModelRef<SecurityScheme>>,
    pub tags: Vec<ModelRef<Tag>>,
    pub external_docs: Option<ModelRef<ExternalDocumentation>>,
    pub bindings: Option<ModelRef<Bindings>>,
    pub extensions: Extensions,
}

impl OperationTrait {
    fn overlay(&mut self, other: &OperationTrait) {
        overlay(&mut self.title, &other.title);
        overlay(&mut self.summary, &other.summary);
        overlay(&mut self.description, &other.description);
        overlay(&mut self.external_docs, &other.external_docs);
        overlay(&mut self.bindings, &other.bindings);
        if !other.security.is_empty() {
            self.security = other.security.clone();
        }
        if !other.tags.is_empty() {
            self.tags = other.tags.clone();
        }
        self.extensions
            .extend(other.extensions.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

/// Response to a request/reply operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationReply {
    pub address: Option<ModelRef<OperationReplyAddress>>,
    pub channel: Option<ModelRef<Channel>>,
    pub messages: Vec<ModelRef<Message>>,
    pub extensions: Extensions,
}

/// Runtime expression locating the reply address
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationReplyAddress {
    pub description: Option<String>,
    /// Required
    pub location: String,
    pub extensions: Extensions,
}

/// Later value replaces earlier
pub(crate) fn overlay<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
    if value.is_some() {
        slot.clone_from(value);
    }
}

/// Fill only what is still unset
pub(crate) fn inherit<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
    if slot.is_none() {
        slot.clone_from(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parse() {
        assert_eq!("send".parse::<Action>().unwrap(), Action::Send);
        assert_eq!("receive".parse::<Action>().unwrap(), Action::Receive);
        assert!("publish".parse::<Action>().is_err());
    }

    #[test]
    fn test_traits_apply_in_order_and_operation_wins() {
        let workspace = Workspace::new();
        let first = ModelRef::inline(OperationTrait {
            summary: Some("from first".into()),
            description: Some("first description".into()),
            ..Default::default()
        });
        let second = ModelRef::inline(OperationTrait {
            description: Some("second description".into()),
            title: Some("trait title".into()),
            ..Default::default()
        });
        let operation = Operation {
            title: Some("own title".into()),
            traits: vec![first, second],
            ..Default::default()
        };

        let merged = operation.with_traits_applied(&workspace);
        assert_eq!(merged.title.as_deref(), Some("own title"));
        assert_eq!(merged.summary.as_deref(), Some("from first"));
        assert_eq!(merged.description.as_deref(), Some("second description"));
        assert!(merged.traits.is_empty());
    }
}
