//! Reader and writer settings
//!
//! Settings are plain structs with defaults and `with_*` builders. The policy
//! enums derive serde so hosts can keep them in their own config files.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dispatch::UnmappedMemberPolicy;
use crate::model::bindings::Binding;
use crate::model::reference::Reference;
use crate::model::AsyncApiAny;
use crate::node::ParseNode;
use crate::validation::{default_rules, ValidationRule};
use crate::version::AsyncApiVersion;

/// Loads one protocol entry of a bindings map
pub type BindingLoader = Arc<dyn Fn(&ParseNode) -> anyhow::Result<Binding> + Send + Sync>;

/// Transforms the raw value of an `x-` extension
pub type ExtensionParser = Arc<dyn Fn(&AsyncApiAny) -> anyhow::Result<AsyncApiAny> + Send + Sync>;

/// Decides per reference whether the writer inlines the target
pub type InlinePredicate = Arc<dyn Fn(&Reference) -> bool + Send + Sync>;

/// Protocol names with a standard AsyncAPI binding definition
pub const KNOWN_PROTOCOLS: &[&str] = &[
    "http",
    "ws",
    "kafka",
    "anypointmq",
    "amqp",
    "amqp1",
    "mqtt",
    "mqtt5",
    "nats",
    "jms",
    "sns",
    "solace",
    "sqs",
    "stomp",
    "redis",
    "mercure",
    "ibmmq",
    "googlepubsub",
    "pulsar",
];

/// Where a bindings map sits in the document
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindingCategory {
    Server,
    Channel,
    Operation,
    Message,
}

impl BindingCategory {
    pub const ALL: [BindingCategory; 4] = [
        BindingCategory::Server,
        BindingCategory::Channel,
        BindingCategory::Operation,
        BindingCategory::Message,
    ];
}

/// Protocol name to loader table, one per binding category
#[derive(Clone, Default)]
pub struct BindingCatalog {
    loaders: HashMap<(BindingCategory, String), BindingLoader>,
}

impl BindingCatalog {
    /// Catalog without any protocol; every binding yields a diagnostic
    pub fn empty() -> Self {
        Self::default()
    }

    /// Catalog knowing every standard protocol in all categories
    pub fn with_known_protocols() -> Self {
        let mut catalog = Self::empty();
        let generic: BindingLoader = Arc::new(Binding::from_node);
        for category in BindingCategory::ALL {
            for protocol in KNOWN_PROTOCOLS {
                catalog.register(category, *protocol, Arc::clone(&generic));
            }
        }
        catalog
    }

    /// Add or replace the loader for a protocol
    pub fn register(
        &mut self,
        category: BindingCategory,
        protocol: impl Into<String>,
        loader: BindingLoader,
    ) -> &mut Self {
        self.loaders.insert((category, protocol.into()), loader);
        self
    }

    pub fn get(&self, category: BindingCategory, protocol: &str) -> Option<&BindingLoader> {
        self.loaders.get(&(category, protocol.to_string()))
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

impl fmt::Debug for BindingCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingCatalog")
            .field("loaders", &self.loaders.len())
            .finish()
    }
}

/// Settings for [`crate::reader::AsyncApiReader`]
#[derive(Clone)]
pub struct ReaderSettings {
    /// What to do with keys no field table knows
    pub unmapped_member_policy: UnmappedMemberPolicy,
    /// Version used when the document has no `asyncapi` field
    pub version_hint: Option<AsyncApiVersion>,
    pub bindings: BindingCatalog,
    /// Rules run after a document has been read
    pub rules: Vec<ValidationRule>,
    extension_parsers: HashMap<String, ExtensionParser>,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            unmapped_member_policy: UnmappedMemberPolicy::default(),
            version_hint: None,
            bindings: BindingCatalog::with_known_protocols(),
            rules: default_rules(),
            extension_parsers: HashMap::new(),
        }
    }
}

impl ReaderSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unmapped_member_policy(mut self, policy: UnmappedMemberPolicy) -> Self {
        self.unmapped_member_policy = policy;
        self
    }

    pub fn with_version_hint(mut self, hint: Option<AsyncApiVersion>) -> Self {
        self.version_hint = hint;
        self
    }

    pub fn with_bindings(mut self, bindings: BindingCatalog) -> Self {
        self.bindings = bindings;
        self
    }

    /// Drop every validation rule
    pub fn without_rules(mut self) -> Self {
        self.rules.clear();
        self
    }

    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Register a parser for one extension key (e.g. `x-rate-limit`)
    pub fn with_extension_parser(
        mut self,
        key: impl Into<String>,
        parser: ExtensionParser,
    ) -> Self {
        self.extension_parsers.insert(key.into(), parser);
        self
    }

    pub fn extension_parser(&self, key: &str) -> Option<&ExtensionParser> {
        self.extension_parsers.get(key)
    }
}

impl fmt::Debug for ReaderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderSettings")
            .field("unmapped_member_policy", &self.unmapped_member_policy)
            .field("version_hint", &self.version_hint)
            .field("bindings", &self.bindings)
            .field("rules", &self.rules.len())
            .field("extension_parsers", &self.extension_parsers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Which references the writer replaces by their target
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InlinePolicy {
    /// Always write `$ref`
    #[default]
    Never,
    /// Inline references into the current document
    Local,
    /// Inline every reference that resolves
    All,
}

/// Settings for [`crate::writer::AsyncApiWriter`]
#[derive(Clone, Default)]
pub struct WriterSettings {
    pub inline_policy: InlinePolicy,
    /// Fail serialization instead of dropping constructs 2.x cannot carry
    pub strict_v2: bool,
    inline_predicate: Option<InlinePredicate>,
}

impl WriterSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inline_policy(mut self, policy: InlinePolicy) -> Self {
        self.inline_policy = policy;
        self
    }

    pub fn with_strict_v2(mut self, strict: bool) -> Self {
        self.strict_v2 = strict;
        self
    }

    /// Custom inlining decision; overrides `inline_policy`
    pub fn with_inline_predicate(mut self, predicate: InlinePredicate) -> Self {
        self.inline_predicate = Some(predicate);
        self
    }

    pub fn should_inline(&self, reference: &Reference) -> bool {
        if let Some(predicate) = &self.inline_predicate {
            return predicate(reference);
        }
        match self.inline_policy {
            InlinePolicy::Never => false,
            InlinePolicy::Local => reference.is_local(),
            InlinePolicy::All => true,
        }
    }
}

impl fmt::Debug for WriterSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterSettings")
            .field("inline_policy", &self.inline_policy)
            .field("strict_v2", &self.strict_v2)
            .field("inline_predicate", &self.inline_predicate.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::reference::ReferenceKind;

    #[test]
    fn test_known_protocols_in_every_category() {
        let catalog = BindingCatalog::with_known_protocols();
        assert_eq!(catalog.len(), KNOWN_PROTOCOLS.len() * 4);
        assert!(catalog.get(BindingCategory::Message, "kafka").is_some());
        assert!(catalog.get(BindingCategory::Server, "carrier-pigeon").is_none());
    }

    #[test]
    fn test_inline_policy() {
        let local = Reference::new("#/components/schemas/A", ReferenceKind::Schema);
        let external = Reference::new("other.yaml#/components/schemas/A", ReferenceKind::Schema);

        let never = WriterSettings::default();
        assert!(!never.should_inline(&local));

        let policy = WriterSettings::new().with_inline_policy(InlinePolicy::Local);
        assert!(policy.should_inline(&local));
        assert!(!policy.should_inline(&external));

        let custom =
            policy.with_inline_predicate(Arc::new(|r: &Reference| r.location().ends_with("/B")));
        assert!(!custom.should_inline(&local));
    }
}
