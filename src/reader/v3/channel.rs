use once_cell::sync::Lazy;

use crate::context::ParsingContext;
use crate::dispatch::{extension_patterns, FixedFieldMap, NodeExt, PatternFieldMap};
use crate::model::{Channel, ModelRef, Parameter};
use crate::node::ParseNode;
use crate::reader::common::{
    load_bindings, load_external_docs, load_object, load_ref, load_reference_only, load_tags,
};
use crate::settings::BindingCategory;

use super::message::load_message;

static CHANNEL_FIELDS: Lazy<FixedFieldMap<Channel>> = Lazy::new(|| {
    FixedFieldMap::<Channel>::new()
        // null marks a dynamic address
        .field("address", |c, n, ctx| c.address = n.scalar(ctx))
        .field("messages", |c, n, ctx| c.messages = n.create_map("messages", ctx, load_message))
        .field("title", |c, n, ctx| c.title = n.scalar(ctx))
        .field("summary", |c, n, ctx| c.summary = n.scalar(ctx))
        .field("description", |c, n, ctx| c.description = n.scalar(ctx))
        .field("servers", |c, n, ctx| {
            c.servers = n
                .create_list("servers", ctx, |n, ctx| {
                    load_reference_only(n, "a channel server", ctx)
                })
                .into_iter()
                .flatten()
                .collect()
        })
        .field("parameters", |c, n, ctx| {
            c.parameters = n.create_map("parameters", ctx, load_parameter)
        })
        .field("tags", |c, n, ctx| c.tags = load_tags(n, ctx))
        .field("externalDocs", |c, n, ctx| {
            c.external_docs = Some(load_external_docs(n, ctx))
        })
        .field("bindings", |c, n, ctx| {
            c.bindings = Some(load_bindings(n, BindingCategory::Channel, ctx))
        })
});

static CHANNEL_PATTERNS: Lazy<PatternFieldMap<Channel>> = Lazy::new(extension_patterns);

pub(crate) fn load_channel(node: &ParseNode, ctx: &mut ParsingContext<'_>) -> ModelRef<Channel> {
    load_ref(node, "channel", ctx, |map, ctx| {
        load_object(map, &CHANNEL_FIELDS, &CHANNEL_PATTERNS, ctx)
    })
}

static PARAMETER_FIELDS: Lazy<FixedFieldMap<Parameter>> = Lazy::new(|| {
    FixedFieldMap::<Parameter>::new()
        .field("enum", |p, n, ctx| p.enum_values = n.create_simple_list("enum", ctx))
        .field("default", |p, n, ctx| p.default = n.scalar(ctx))
        .field("description", |p, n, ctx| p.description = n.scalar(ctx))
        .field("examples", |p, n, ctx| p.examples = n.create_simple_list("examples", ctx))
        .field("location", |p, n, ctx| p.location = n.scalar(ctx))
});

static PARAMETER_PATTERNS: Lazy<PatternFieldMap<Parameter>> = Lazy::new(extension_patterns);

pub(crate) fn load_parameter(
    node: &ParseNode,
    ctx: &mut ParsingContext<'_>,
) -> ModelRef<Parameter> {
    load_ref(node, "parameter", ctx, |map, ctx| {
        load_object(map, &PARAMETER_FIELDS, &PARAMETER_PATTERNS, ctx)
    })
}
