use indexmap::IndexMap;

use super::{
    Bindings, Channel, CorrelationId, Extensions, ExternalDocumentation, Message, MessageTrait,
    ModelRef, MultiFormatSchema, Operation, OperationReply, OperationReplyAddress, OperationTrait,
    Parameter, SecurityScheme, Server, ServerVariable, Tag,
};

/// Reusable objects addressed as `#/components/<category>/<key>`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Components {
    pub schemas: IndexMap<String, MultiFormatSchema>,
    pub servers: IndexMap<String, ModelRef<Server>>,
    pub channels: IndexMap<String, ModelRef<Channel>>,
    pub operations: IndexMap<String, ModelRef<Operation>>,
    pub messages: IndexMap<String, ModelRef<Message>>,
    pub security_schemes: IndexMap<String, ModelRef<SecurityScheme>>,
    pub server_variables: IndexMap<String, ModelRef<ServerVariable>>,
    pub parameters: IndexMap<String, ModelRef<Parameter>>,
    pub correlation_ids: IndexMap<String, ModelRef<CorrelationId>>,
    pub replies: IndexMap<String, ModelRef<OperationReply>>,
    pub reply_addresses: IndexMap<String, ModelRef<OperationReplyAddress>>,
    pub external_docs: IndexMap<String, ModelRef<ExternalDocumentation>>,
    pub tags: IndexMap<String, ModelRef<Tag>>,
    pub operation_traits: IndexMap<String, ModelRef<OperationTrait>>,
    pub message_traits: IndexMap<String, ModelRef<MessageTrait>>,
    pub server_bindings: IndexMap<String, ModelRef<Bindings>>,
    pub channel_bindings: IndexMap<String, ModelRef<Bindings>>,
    pub operation_bindings: IndexMap<String, ModelRef<Bindings>>,
    pub message_bindings: IndexMap<String, ModelRef<Bindings>>,
    pub extensions: Extensions,
}

impl Components {
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
            && self.servers.is_empty()
            && self.channels.is_empty()
            && self.operations.is_empty()
            && self.messages.is_empty()
            && self.security_schemes.is_empty()
            && self.server_variables.is_empty()
            && self.parameters.is_empty()
            && self.correlation_ids.is_empty()
            && self.replies.is_empty()
            && self.reply_addresses.is_empty()
            && self.external_docs.is_empty()
            && self.tags.is_empty()
            && self.operation_traits.is_empty()
            && self.message_traits.is_empty()
            && self.server_bindings.is_empty()
            && self.channel_bindings.is_empty()
            && self.operation_bindings.is_empty()
            && self.message_bindings.is_empty()
            && self.extensions.is_empty()
    }

    /// Every key per category, for rules that check key shape
    pub fn keys_by_category(&self) -> Vec<(&'static str, Vec<&str>)> {
        fn keys<V>(map: &IndexMap<String, V>) -> Vec<&str> {
            map.keys().map(String::as_str).collect()
        }
        vec![
            ("schemas", keys(&self.schemas)),
            ("servers", keys(&self.servers)),
            ("channels", keys(&self.channels)),
            ("operations", keys(&self.operations)),
            ("messages", keys(&self.messages)),
            ("securitySchemes", keys(&self.security_schemes)),
            ("serverVariables", keys(&self.server_variables)),
            ("parameters", keys(&self.parameters)),
            ("correlationIds", keys(&self.correlation_ids)),
            ("replies", keys(&self.replies)),
            ("replyAddresses", keys(&self.reply_addresses)),
            ("externalDocs", keys(&self.external_docs)),
            ("tags", keys(&self.tags)),
            ("operationTraits", keys(&self.operation_traits)),
            ("messageTraits", keys(&self.message_traits)),
            ("serverBindings", keys(&self.server_bindings)),
            ("channelBindings", keys(&self.channel_bindings)),
            ("operationBindings", keys(&self.operation_bindings)),
            ("messageBindings", keys(&self.message_bindings)),
        ]
    }
}
