//! Canonical-location registry
//!
//! The workspace owns the mapping from canonical location (`#/channels/a`,
//! `#/components/messages/b`, ...) to concrete objects. Registration is first
//! wins. A location registered with a pointer becomes an alias that forwards
//! to the pointer's target, so chains such as
//! `#/channels/a/messages/m` → `#/components/messages/m` resolve transparently.
//!
//! The workspace also keeps raw byte artifacts. The reader stores the whole
//! source document under [`SOURCE_DOCUMENT`]; schema pointers that reach below
//! any registered component are loaded from it on demand.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use crate::location::escape_segment;
use crate::model::reference::{ModelRef, ReferenceKind, Referenceable};
use crate::model::{
    Bindings, Channel, CorrelationId, Document, ExternalDocumentation, JsonSchema, Message,
    MessageTrait, Operation, OperationReply, OperationReplyAddress, OperationTrait, OtherSchema,
    Parameter, Schema, SecurityScheme, Server, ServerVariable, Tag,
};
use crate::node::ParseNode;

/// Artifact location of the entire source document
pub const SOURCE_DOCUMENT: &str = "";

const MAX_ALIAS_HOPS: usize = 64;

/// A concrete registered object
#[derive(Debug, Clone)]
pub enum Component {
    Channel(Rc<RefCell<Channel>>),
    Operation(Rc<RefCell<Operation>>),
    Message(Rc<RefCell<Message>>),
    JsonSchema(Rc<RefCell<JsonSchema>>),
    OtherSchema(Rc<RefCell<OtherSchema>>),
    Server(Rc<RefCell<Server>>),
    ServerVariable(Rc<RefCell<ServerVariable>>),
    SecurityScheme(Rc<RefCell<SecurityScheme>>),
    Parameter(Rc<RefCell<Parameter>>),
    CorrelationId(Rc<RefCell<CorrelationId>>),
    OperationTrait(Rc<RefCell<OperationTrait>>),
    MessageTrait(Rc<RefCell<MessageTrait>>),
    OperationReply(Rc<RefCell<OperationReply>>),
    OperationReplyAddress(Rc<RefCell<OperationReplyAddress>>),
    Bindings(Rc<RefCell<Bindings>>),
    Tag(Rc<RefCell<Tag>>),
    ExternalDocs(Rc<RefCell<ExternalDocumentation>>),
}

impl Component {
    /// Address of the object, for identity lookups
    fn identity(&self) -> *const () {
        match self {
            Component::Channel(v) => Rc::as_ptr(v) as *const (),
            Component::Operation(v) => Rc::as_ptr(v) as *const (),
            Component::Message(v) => Rc::as_ptr(v) as *const (),
            Component::JsonSchema(v) => Rc::as_ptr(v) as *const (),
            Component::OtherSchema(v) => Rc::as_ptr(v) as *const (),
            Component::Server(v) => Rc::as_ptr(v) as *const (),
            Component::ServerVariable(v) => Rc::as_ptr(v) as *const (),
            Component::SecurityScheme(v) => Rc::as_ptr(v) as *const (),
            Component::Parameter(v) => Rc::as_ptr(v) as *const (),
            Component::CorrelationId(v) => Rc::as_ptr(v) as *const (),
            Component::OperationTrait(v) => Rc::as_ptr(v) as *const (),
            Component::MessageTrait(v) => Rc::as_ptr(v) as *const (),
            Component::OperationReply(v) => Rc::as_ptr(v) as *const (),
            Component::OperationReplyAddress(v) => Rc::as_ptr(v) as *const (),
            Component::Bindings(v) => Rc::as_ptr(v) as *const (),
            Component::Tag(v) => Rc::as_ptr(v) as *const (),
            Component::ExternalDocs(v) => Rc::as_ptr(v) as *const (),
        }
    }
}

macro_rules! referenceable {
    ($($ty:ident => $variant:ident, $kind:ident;)*) => {
        $(
            impl Referenceable for $ty {
                const KIND: ReferenceKind = ReferenceKind::$kind;

                fn into_component(value: Rc<RefCell<Self>>) -> Component {
                    Component::$variant(value)
                }

                fn from_component(component: &Component) -> Option<Rc<RefCell<Self>>> {
                    match component {
                        Component::$variant(value) => Some(Rc::clone(value)),
                        _ => None,
                    }
                }
            }
        )*
    };
}

referenceable! {
    Channel => Channel, Channel;
    Operation => Operation, Operation;
    Message => Message, Message;
    OtherSchema => OtherSchema, Schema;
    Server => Server, Server;
    ServerVariable => ServerVariable, ServerVariable;
    SecurityScheme => SecurityScheme, SecurityScheme;
    Parameter => Parameter, Parameter;
    CorrelationId => CorrelationId, CorrelationId;
    OperationTrait => OperationTrait, OperationTrait;
    MessageTrait => MessageTrait, MessageTrait;
    OperationReply => OperationReply, OperationReply;
    OperationReplyAddress => OperationReplyAddress, OperationReplyAddress;
    Bindings => Bindings, Bindings;
    Tag => Tag, Tag;
    ExternalDocumentation => ExternalDocs, ExternalDocs;
}

impl Referenceable for JsonSchema {
    const KIND: ReferenceKind = ReferenceKind::Schema;

    fn into_component(value: Rc<RefCell<Self>>) -> Component {
        Component::JsonSchema(value)
    }

    fn from_component(component: &Component) -> Option<Rc<RefCell<Self>>> {
        match component {
            Component::JsonSchema(value) => Some(Rc::clone(value)),
            _ => None,
        }
    }

    fn load_from_source(location: &str, workspace: &Workspace) -> Option<ModelRef<Self>> {
        let value = workspace.source_value(location)?;
        let node = ParseNode::from(value);
        debug!(location, "loading schema from source document");
        Some(crate::reader::load_source_schema(&node))
    }
}

enum Entry {
    Component(Component),
    Alias(String),
}

/// Per-document registry of canonical locations
#[derive(Default)]
pub struct Workspace {
    /// Location to object or alias, first registration wins
    entries: RefCell<IndexMap<String, Entry>>,
    /// Raw byte artifacts, first registration wins
    artifacts: RefCell<IndexMap<String, Rc<[u8]>>>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `component` at `location`
    ///
    /// Returns false when the location is already taken. Registering a pointer
    /// makes the location an alias of the pointer's target.
    pub fn register_component<T: Referenceable>(
        &self,
        location: impl Into<String>,
        component: &ModelRef<T>,
    ) -> bool {
        let location = location.into();
        let entry = match component {
            ModelRef::Inline(value) => Entry::Component(T::into_component(Rc::clone(value))),
            ModelRef::Pointer(pointer) => {
                let target = pointer.reference().location();
                if target == location {
                    return false;
                }
                Entry::Alias(target.to_string())
            }
        };
        let mut entries = self.entries.borrow_mut();
        if entries.contains_key(&location) {
            return false;
        }
        entries.insert(location, entry);
        true
    }

    /// Register a raw byte buffer, first wins
    pub fn register_artifact(
        &self,
        location: impl Into<String>,
        bytes: impl Into<Rc<[u8]>>,
    ) -> bool {
        let location = location.into();
        let mut artifacts = self.artifacts.borrow_mut();
        if artifacts.contains_key(&location) {
            return false;
        }
        artifacts.insert(location, bytes.into());
        true
    }

    pub fn artifact(&self, location: &str) -> Option<Rc<[u8]>> {
        self.artifacts.borrow().get(location).cloned()
    }

    pub fn contains(&self, location: &str) -> bool {
        self.entries.borrow().contains_key(location)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Registered object at `location`, following aliases
    ///
    /// An object of another type at the location counts as missing. Schema
    /// locations with no registration fall back to the source document.
    pub fn resolve<T: Referenceable>(&self, location: &str) -> Option<Rc<RefCell<T>>> {
        let canonical = self.canonical_location(location);
        {
            let entries = self.entries.borrow();
            match entries.get(&canonical) {
                Some(Entry::Component(component)) => return T::from_component(component),
                Some(Entry::Alias(_)) => return None,
                None => {}
            }
        }

        let loaded = T::load_from_source(&canonical, self)?;
        self.register_component(canonical.clone(), &loaded);
        match loaded {
            ModelRef::Inline(value) => Some(value),
            ModelRef::Pointer(_) => {
                let entries = self.entries.borrow();
                match entries.get(&self.canonical_location(&canonical)) {
                    Some(Entry::Component(component)) => T::from_component(component),
                    _ => None,
                }
            }
        }
    }

    /// Final location after following aliases
    ///
    /// A location below an aliased prefix is rewritten through that alias
    /// (`#/channels/a/messages/m` with `#/channels/a` → `#/components/channels/c`
    /// becomes `#/components/channels/c/messages/m`). Alias cycles stop at the
    /// first repeated location.
    pub fn canonical_location(&self, location: &str) -> String {
        let entries = self.entries.borrow();
        let mut current = location.to_string();
        let mut seen = HashSet::new();

        for _ in 0..MAX_ALIAS_HOPS {
            if !seen.insert(current.clone()) {
                break;
            }
            match entries.get(&current) {
                Some(Entry::Alias(target)) => current = target.clone(),
                Some(Entry::Component(_)) => break,
                None => match Self::rewrite_through_prefix(&entries, &current) {
                    Some(rewritten) => current = rewritten,
                    None => break,
                },
            }
        }
        current
    }

    fn rewrite_through_prefix(entries: &IndexMap<String, Entry>, location: &str) -> Option<String> {
        let mut end = location.len();
        while let Some(slash) = location[..end].rfind('/') {
            let prefix = &location[..slash];
            if let Some(Entry::Alias(target)) = entries.get(prefix) {
                return Some(format!("{}{}", target, &location[slash..]));
            }
            end = slash;
        }
        None
    }

    /// Location an object was registered under
    pub fn location_of<T: Referenceable>(&self, value: &Rc<RefCell<T>>) -> Option<String> {
        let wanted = Rc::as_ptr(value) as *const ();
        self.entries
            .borrow()
            .iter()
            .find_map(|(location, entry)| match entry {
                Entry::Component(component) if component.identity() == wanted => {
                    Some(location.clone())
                }
                _ => None,
            })
    }

    /// JSON value at `location` inside the source document artifact
    pub fn source_value(&self, location: &str) -> Option<serde_json::Value> {
        let (document, fragment) = location.split_once('#')?;
        if !document.is_empty() {
            return None;
        }
        let bytes = self.artifact(SOURCE_DOCUMENT)?;
        let root: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
        root.pointer(fragment).cloned()
    }

    /// Register every addressable element of `document`, first wins
    pub fn register_components(&self, document: &Document) {
        for (key, server) in &document.servers {
            self.register_component(format!("#/servers/{}", escape_segment(key)), server);
        }
        for (key, channel) in &document.channels {
            let base = format!("#/channels/{}", escape_segment(key));
            self.register_channel(&base, channel);
        }
        for (key, operation) in &document.operations {
            self.register_component(format!("#/operations/{}", escape_segment(key)), operation);
        }

        let components = &document.components;
        for (key, schema) in &components.schemas {
            let location = component_location("schemas", key);
            match &schema.schema {
                Schema::Json(json) => self.register_component(location, json),
                Schema::Other(other) => self.register_component(location, other),
            };
        }
        self.register_map("servers", &components.servers);
        for (key, channel) in &components.channels {
            self.register_channel(&component_location("channels", key), channel);
        }
        self.register_map("operations", &components.operations);
        self.register_map("messages", &components.messages);
        self.register_map("securitySchemes", &components.security_schemes);
        self.register_map("serverVariables", &components.server_variables);
        self.register_map("parameters", &components.parameters);
        self.register_map("correlationIds", &components.correlation_ids);
        self.register_map("replies", &components.replies);
        self.register_map("replyAddresses", &components.reply_addresses);
        self.register_map("externalDocs", &components.external_docs);
        self.register_map("tags", &components.tags);
        self.register_map("operationTraits", &components.operation_traits);
        self.register_map("messageTraits", &components.message_traits);
        self.register_map("serverBindings", &components.server_bindings);
        self.register_map("channelBindings", &components.channel_bindings);
        self.register_map("operationBindings", &components.operation_bindings);
        self.register_map("messageBindings", &components.message_bindings);
    }

    fn register_channel(&self, base: &str, channel: &ModelRef<Channel>) {
        self.register_component(base, channel);
        if let Some(channel) = channel.borrow_inline() {
            for (key, message) in &channel.messages {
                let location = format!("{}/messages/{}", base, escape_segment(key));
                self.register_component(location, message);
            }
        }
    }

    fn register_map<T: Referenceable>(&self, category: &str, map: &IndexMap<String, ModelRef<T>>) {
        for (key, value) in map {
            self.register_component(component_location(category, key), value);
        }
    }
}

fn component_location(category: &str, key: &str) -> String {
    format!("#/components/{}/{}", category, escape_segment(key))
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.borrow();
        let locations: Vec<&str> = entries.keys().map(String::as_str).collect();
        f.debug_struct("Workspace")
            .field("locations", &locations)
            .field("artifacts", &self.artifacts.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Components;
    use serde_json::json;

    #[test]
    fn test_first_registration_wins() {
        let workspace = Workspace::new();
        let first = ModelRef::inline(Message {
            name: Some("first".into()),
            ..Default::default()
        });
        let second = ModelRef::inline(Message {
            name: Some("second".into()),
            ..Default::default()
        });
        assert!(workspace.register_component("#/components/messages/m", &first));
        assert!(!workspace.register_component("#/components/messages/m", &second));

        let resolved = workspace.resolve::<Message>("#/components/messages/m").unwrap();
        assert_eq!(resolved.borrow().name.as_deref(), Some("first"));
    }

    #[test]
    fn test_artifacts_are_independent_of_components() {
        let workspace = Workspace::new();
        assert!(workspace.register_artifact("", b"{}".to_vec()));
        assert!(!workspace.register_artifact("", b"[]".to_vec()));
        assert_eq!(&*workspace.artifact("").unwrap(), b"{}");
        assert!(!workspace.contains(""));
    }

    #[test]
    fn test_wrong_type_is_missing() {
        let workspace = Workspace::new();
        workspace.register_component("#/channels/a", &ModelRef::inline(Channel::default()));
        assert!(workspace.resolve::<Message>("#/channels/a").is_none());
        assert!(workspace.resolve::<Channel>("#/channels/a").is_some());
    }

    #[test]
    fn test_alias_chain_and_prefix_rewrite() {
        let workspace = Workspace::new();
        let message = ModelRef::inline(Message::default());
        let mut channel = Channel::default();
        channel
            .messages
            .insert("m".into(), ModelRef::pointer("#/components/messages/m"));

        let mut document = Document::default();
        document
            .channels
            .insert("a".into(), ModelRef::pointer("#/components/channels/c"));
        document.components = Components::default();
        document.components.channels.insert("c".into(), ModelRef::inline(channel));
        document.components.messages.insert("m".into(), message.clone());
        workspace.register_components(&document);

        assert_eq!(
            workspace.canonical_location("#/channels/a/messages/m"),
            "#/components/messages/m"
        );
        let resolved = workspace.resolve::<Message>("#/channels/a/messages/m").unwrap();
        assert!(Rc::ptr_eq(&resolved, message.as_inline().unwrap()));
    }

    #[test]
    fn test_alias_cycle_terminates() {
        let workspace = Workspace::new();
        workspace.register_component("#/a", &ModelRef::<Channel>::pointer("#/b"));
        workspace.register_component("#/b", &ModelRef::<Channel>::pointer("#/a"));
        assert!(workspace.resolve::<Channel>("#/a").is_none());
    }

    #[test]
    fn test_schema_loaded_from_source_document() {
        let workspace = Workspace::new();
        let source = json!({
            "components": {"schemas": {"A": {
                "type": "object",
                "properties": {"b": {"type": "string"}}
            }}}
        });
        workspace.register_artifact(SOURCE_DOCUMENT, serde_json::to_vec(&source).unwrap());

        let schema = workspace
            .resolve::<JsonSchema>("#/components/schemas/A/properties/b")
            .unwrap();
        assert_eq!(schema.borrow().schema_type, vec!["string".to_string()]);
        assert!(workspace.contains("#/components/schemas/A/properties/b"));
    }

    #[test]
    fn test_location_of_finds_registration() {
        let workspace = Workspace::new();
        let scheme = ModelRef::inline(SecurityScheme::default());
        workspace.register_component("#/components/securitySchemes/user", &scheme);
        assert_eq!(
            workspace.location_of(scheme.as_inline().unwrap()).as_deref(),
            Some("#/components/securitySchemes/user")
        );
    }
}
