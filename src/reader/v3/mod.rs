//! AsyncAPI 3.x loaders

mod channel;
mod message;
mod operation;
mod server;

use once_cell::sync::Lazy;

use crate::context::ParsingContext;
use crate::dispatch::{extension_patterns, require_fields, FixedFieldMap, NodeExt, PatternFieldMap};
use crate::model::{Components, Document};
use crate::node::ParseNode;
use crate::reader::common::{
    load_bindings, load_correlation_id, load_external_docs, load_info, load_object,
    load_security_scheme_v3, load_server_variable, load_tag,
};
use crate::settings::BindingCategory;

pub(crate) use channel::{load_channel, load_parameter};
pub(crate) use message::{load_message, load_message_trait, load_multi_format_schema};
pub(crate) use operation::{load_operation, load_operation_trait, load_reply, load_reply_address};
pub(crate) use server::load_server;

pub(crate) use crate::reader::common::load_security_scheme_v3 as load_security_scheme;

static DOCUMENT_FIELDS: Lazy<FixedFieldMap<Document>> = Lazy::new(|| {
    FixedFieldMap::<Document>::new()
        .field("asyncapi", |_, _, _| {})
        .field("id", |d, n, ctx| d.id = n.scalar(ctx))
        .field("info", |d, n, ctx| d.info = load_info(n, ctx))
        .field("servers", |d, n, ctx| d.servers = n.create_map("servers", ctx, load_server))
        .field("defaultContentType", |d, n, ctx| d.default_content_type = n.scalar(ctx))
        .field("channels", |d, n, ctx| d.channels = n.create_map("channels", ctx, load_channel))
        .field("operations", |d, n, ctx| {
            d.operations = n.create_map("operations", ctx, load_operation)
        })
        .field("components", |d, n, ctx| d.components = load_components(n, ctx))
});

static DOCUMENT_PATTERNS: Lazy<PatternFieldMap<Document>> = Lazy::new(extension_patterns);

pub(crate) fn load_document(root: &ParseNode, ctx: &mut ParsingContext<'_>) -> Document {
    let Some(map) = root.expect_map("document", ctx) else {
        return Document::default();
    };
    require_fields(map, &["info"], "an AsyncAPI 3.x document", ctx);
    load_object(map, &DOCUMENT_FIELDS, &DOCUMENT_PATTERNS, ctx)
}

static COMPONENTS_FIELDS: Lazy<FixedFieldMap<Components>> = Lazy::new(|| {
    FixedFieldMap::<Components>::new()
        .field("schemas", |c, n, ctx| {
            c.schemas = n.create_map("schemas", ctx, load_multi_format_schema)
        })
        .field("servers", |c, n, ctx| c.servers = n.create_map("servers", ctx, load_server))
        .field("channels", |c, n, ctx| c.channels = n.create_map("channels", ctx, load_channel))
        .field("operations", |c, n, ctx| {
            c.operations = n.create_map("operations", ctx, load_operation)
        })
        .field("messages", |c, n, ctx| c.messages = n.create_map("messages", ctx, load_message))
        .field("securitySchemes", |c, n, ctx| {
            c.security_schemes = n.create_map("securitySchemes", ctx, load_security_scheme_v3)
        })
        .field("serverVariables", |c, n, ctx| {
            c.server_variables = n.create_map("serverVariables", ctx, load_server_variable)
        })
        .field("parameters", |c, n, ctx| {
            c.parameters = n.create_map("parameters", ctx, load_parameter)
        })
        .field("correlationIds", |c, n, ctx| {
            c.correlation_ids = n.create_map("correlationIds", ctx, load_correlation_id)
        })
        .field("replies", |c, n, ctx| c.replies = n.create_map("replies", ctx, load_reply))
        .field("replyAddresses", |c, n, ctx| {
            c.reply_addresses = n.create_map("replyAddresses", ctx, load_reply_address)
        })
        .field("externalDocs", |c, n, ctx| {
            c.external_docs = n.create_map("externalDocs", ctx, load_external_docs)
        })
        .field("tags", |c, n, ctx| c.tags = n.create_map("tags", ctx, load_tag))
        .field("operationTraits", |c, n, ctx| {
            c.operation_traits = n.create_map("operationTraits", ctx, load_operation_trait)
        })
        .field("messageTraits", |c, n, ctx| {
            c.message_traits = n.create_map("messageTraits", ctx, load_message_trait)
        })
        .field("serverBindings", |c, n, ctx| {
            c.server_bindings = n.create_map("serverBindings", ctx, |n, ctx| {
                load_bindings(n, BindingCategory::Server, ctx)
            })
        })
        .field("channelBindings", |c, n, ctx| {
            c.channel_bindings = n.create_map("channelBindings", ctx, |n, ctx| {
                load_bindings(n, BindingCategory::Channel, ctx)
            })
        })
        .field("operationBindings", |c, n, ctx| {
            c.operation_bindings = n.create_map("operationBindings", ctx, |n, ctx| {
                load_bindings(n, BindingCategory::Operation, ctx)
            })
        })
        .field("messageBindings", |c, n, ctx| {
            c.message_bindings = n.create_map("messageBindings", ctx, |n, ctx| {
                load_bindings(n, BindingCategory::Message, ctx)
            })
        })
});

static COMPONENTS_PATTERNS: Lazy<PatternFieldMap<Components>> = Lazy::new(extension_patterns);

pub(crate) fn load_components(node: &ParseNode, ctx: &mut ParsingContext<'_>) -> Components {
    match node.expect_map("components", ctx) {
        Some(map) => load_object(map, &COMPONENTS_FIELDS, &COMPONENTS_PATTERNS, ctx),
        None => Components::default(),
    }
}
