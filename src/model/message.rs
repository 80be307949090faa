//! Messages, message traits, examples and correlation ids

use super::operation::{inherit, overlay};
use super::{
    AsyncApiAny, Bindings, Extensions, ExternalDocumentation, ModelRef, MultiFormatSchema, Tag,
};
use crate::workspace::Workspace;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub headers: Option<MultiFormatSchema>,
    pub payload: Option<MultiFormatSchema>,
    pub correlation_id: Option<ModelRef<CorrelationId>>,
    pub content_type: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<ModelRef<Tag>>,
    pub external_docs: Option<ModelRef<ExternalDocumentation>>,
    pub bindings: Option<ModelRef<Bindings>>,
    pub examples: Vec<MessageExample>,
    pub traits: Vec<ModelRef<MessageTrait>>,
    pub extensions: Extensions,
}

impl Message {
    /// Copy of this message with its traits folded in
    ///
    /// Traits apply in declaration order, so a later trait overrides an earlier
    /// one; fields set on the message itself always win.
    pub fn with_traits_applied(&self, workspace: &Workspace) -> Message {
        let mut base = MessageTrait::default();
        for message_trait in &self.traits {
            message_trait.read(workspace, |t| base.overlay(t));
        }

        let mut merged = self.clone();
        merged.traits.clear();
        inherit(&mut merged.headers, &base.headers);
        inherit(&mut merged.correlation_id, &base.correlation_id);
        inherit(&mut merged.content_type, &base.content_type);
        inherit(&mut merged.name, &base.name);
        inherit(&mut merged.title, &base.title);
        inherit(&mut merged.summary, &base.summary);
        inherit(&mut merged.description, &base.description);
        inherit(&mut merged.external_docs, &base.external_docs);
        inherit(&mut merged.bindings, &base.bindings);
        if merged.tags.is_empty() {
            merged.tags = base.tags;
        }
        if merged.examples.is_empty() {
            merged.examples = base.examples;
        }
        for (key, value) in base.extensions {
            merged.extensions.entry(key).or_insert(value);
        }
        merged
    }
}

/// Reusable partial message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageTrait {
    pub headers: Option<MultiFormatSchema>,
    pub correlation_id: Option<ModelRef<CorrelationId>>,
    pub content_type: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<ModelRef<Tag>>,
    pub external_docs: Option<ModelRef<ExternalDocumentation>>,
    pub bindings: Option<ModelRef<Bindings>>,
    pub examples: Vec<MessageExample>,
    pub extensions: Extensions,
}

impl MessageTrait {
    fn overlay(&mut self, other: &MessageTrait) {
        overlay(&mut self.headers, &other.headers);
        overlay(&mut self.correlation_id, &other.correlation_id);
        overlay(&mut self.content_type, &other.content_type);
        overlay(&mut self.name, &other.name);
        overlay(&mut self.title, &other.title);
        overlay(&mut self.summary, &other.summary);
        overlay(&mut self.description, &other.description);
        overlay(&mut self.external_docs, &other.external_docs);
        overlay(&mut self.bindings, &other.bindings);
        if !other.tags.is_empty() {
            self.tags = other.tags.clone();
        }
        if !other.examples.is_empty() {
            self.examples = other.examples.clone();
        }
        self.extensions
            .extend(other.extensions.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageExample {
    pub headers: Option<AsyncApiAny>,
    pub payload: Option<AsyncApiAny>,
    pub name: Option<String>,
    pub summary: Option<String>,
    pub extensions: Extensions,
}

/// Runtime expression identifying a message for correlation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrelationId {
    pub description: Option<String>,
    pub location: String,
    pub extensions: Extensions,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_traits_merge() {
        let workspace = Workspace::new();
        let common = ModelRef::inline(MessageTrait {
            content_type: Some("application/json".into()),
            name: Some("trait-name".into()),
            extensions: [("x-origin".to_string(), json!("trait"))].into_iter().collect(),
            ..Default::default()
        });
        let message = Message {
            name: Some("lightMeasured".into()),
            traits: vec![common],
            extensions: [("x-origin".to_string(), json!("message"))].into_iter().collect(),
            ..Default::default()
        };

        let merged = message.with_traits_applied(&workspace);
        assert_eq!(merged.name.as_deref(), Some("lightMeasured"));
        assert_eq!(merged.content_type.as_deref(), Some("application/json"));
        assert_eq!(merged.extensions["x-origin"], json!("message"));
    }

    #[test]
    fn test_unresolved_trait_is_skipped() {
        let workspace = Workspace::new();
        let message = Message {
            traits: vec![ModelRef::pointer("#/components/messageTraits/missing")],
            ..Default::default()
        };
        let merged = message.with_traits_applied(&workspace);
        assert_eq!(merged, Message::default());
    }
}
