//! Loading single elements outside a document

use crate::context::ParsingContext;
use crate::model::{
    Channel, Components, CorrelationId, ExternalDocumentation, Info, JsonSchema, Message,
    MessageTrait, ModelRef, MultiFormatSchema, Operation, OperationReply, OperationReplyAddress,
    OperationTrait, Parameter, SecurityScheme, Server, ServerVariable, Tag,
};
use crate::node::ParseNode;

use super::{common, v2, v3};

/// Element type that can be read on its own with a version's loader
pub trait Fragment: Sized {
    fn load_v2(node: &ParseNode, ctx: &mut ParsingContext<'_>) -> Self;

    fn load_v3(node: &ParseNode, ctx: &mut ParsingContext<'_>) -> Self;
}

macro_rules! fragment {
    ($ty:ty, $v2:expr, $v3:expr) => {
        impl Fragment for $ty {
            fn load_v2(node: &ParseNode, ctx: &mut ParsingContext<'_>) -> Self {
                $v2(node, ctx)
            }

            fn load_v3(node: &ParseNode, ctx: &mut ParsingContext<'_>) -> Self {
                $v3(node, ctx)
            }
        }
    };
}

fragment!(Info, common::load_info, common::load_info);
fragment!(Components, v2::load_components, v3::load_components);
fragment!(ModelRef<Server>, v2::load_server, v3::load_server);
fragment!(ModelRef<ServerVariable>, common::load_server_variable, common::load_server_variable);
fragment!(ModelRef<Channel>, v2::load_channel, v3::load_channel);
fragment!(ModelRef<Parameter>, v2::load_parameter, v3::load_parameter);
fragment!(ModelRef<Operation>, v2::load_operation, v3::load_operation);
fragment!(ModelRef<OperationTrait>, v2::load_operation_trait, v3::load_operation_trait);
fragment!(ModelRef<Message>, v2::load_message, v3::load_message);
fragment!(ModelRef<MessageTrait>, v2::load_message_trait, v3::load_message_trait);
fragment!(ModelRef<CorrelationId>, common::load_correlation_id, common::load_correlation_id);
fragment!(ModelRef<SecurityScheme>, v2::load_security_scheme, v3::load_security_scheme);
fragment!(ModelRef<JsonSchema>, common::load_json_schema, common::load_json_schema);
fragment!(ModelRef<Tag>, common::load_tag, common::load_tag);
fragment!(ModelRef<ExternalDocumentation>, common::load_external_docs, common::load_external_docs);

// Replies only exist in v3; a v2 caller gets the v3 shape
fragment!(ModelRef<OperationReply>, v3::load_reply, v3::load_reply);
fragment!(ModelRef<OperationReplyAddress>, v3::load_reply_address, v3::load_reply_address);

// v2 headers and payloads are always JSON schemas
fragment!(
    MultiFormatSchema,
    |node: &ParseNode, ctx: &mut ParsingContext<'_>| {
        MultiFormatSchema::json(common::load_json_schema(node, ctx))
    },
    v3::load_multi_format_schema
);

