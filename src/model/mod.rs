//! Typed AsyncAPI object graph
//!
//! The model is v3-shaped: v2 input is upgraded into it by the reader and the
//! v2 writer derives the v2 wire shape back from it. Referenceable elements are
//! held through [`ModelRef`].

pub mod bindings;
pub mod channel;
pub mod components;
pub mod document;
pub mod info;
pub mod message;
pub mod operation;
pub mod reference;
pub mod schema;
pub mod security;
pub mod server;
pub mod tag;

use indexmap::IndexMap;

/// Any JSON value (examples, defaults, extension payloads)
pub type AsyncApiAny = serde_json::Value;

/// `x-` members of an element, in document order
pub type Extensions = IndexMap<String, AsyncApiAny>;

// Re-export commonly used types
pub use bindings::{Binding, Bindings};
pub use channel::{Channel, Parameter};
pub use components::Components;
pub use document::Document;
pub use info::{Contact, Info, License};
pub use message::{CorrelationId, Message, MessageExample, MessageTrait};
pub use operation::{Action, Operation, OperationReply, OperationReplyAddress, OperationTrait};
pub use reference::{ModelRef, Reference, ReferenceKind, Referenceable};
pub use schema::{
    AdditionalProperties, JsonSchema, MultiFormatSchema, OtherSchema, Schema, SchemaItems,
};
pub use security::{
    OAuthFlow, OAuthFlows, SecurityScheme, SecuritySchemeLocation, SecuritySchemeType,
};
pub use server::{Server, ServerVariable};
pub use tag::{ExternalDocumentation, Tag};

macro_rules! extensible {
    ($($ty:ty),* $(,)?) => {
        $(
            impl crate::dispatch::Extensible for $ty {
                fn extensions_mut(&mut self) -> &mut Extensions {
                    &mut self.extensions
                }
            }
        )*
    };
}

extensible!(
    Document,
    Info,
    Contact,
    License,
    Server,
    ServerVariable,
    Channel,
    Parameter,
    Operation,
    OperationTrait,
    OperationReply,
    OperationReplyAddress,
    Message,
    MessageTrait,
    MessageExample,
    CorrelationId,
    JsonSchema,
    SecurityScheme,
    OAuthFlows,
    OAuthFlow,
    Tag,
    ExternalDocumentation,
    Bindings,
    Components,
);
