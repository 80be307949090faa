//! v3 operations, operation traits and replies

use once_cell::sync::Lazy;

use crate::context::ParsingContext;
use crate::diagnostics::DiagnosticCode;
use crate::dispatch::{extension_patterns, require_fields, FixedFieldMap, NodeExt, PatternFieldMap};
use crate::model::{
    Action, Message, ModelRef, Operation, OperationReply, OperationReplyAddress, OperationTrait,
};
use crate::node::ParseNode;
use crate::reader::common::{
    load_bindings, load_external_docs, load_object, load_ref, load_reference_only, load_tags,
};
use crate::settings::BindingCategory;

use super::server::load_security;

fn load_message_references(
    node: &ParseNode,
    ctx: &mut ParsingContext<'_>,
) -> Vec<ModelRef<Message>> {
    node.create_list("messages", ctx, |n, ctx| load_reference_only(n, "an operation message", ctx))
        .into_iter()
        .flatten()
        .collect()
}

static OPERATION_FIELDS: Lazy<FixedFieldMap<Operation>> = Lazy::new(|| {
    FixedFieldMap::<Operation>::new()
        .field("action", |o, n, ctx| {
            if let Some(text) = n.scalar(ctx) {
                match text.parse::<Action>() {
                    Ok(action) => o.action = action,
                    Err(message) => ctx.error(DiagnosticCode::InvalidValue, message),
                }
            }
        })
        .field("channel", |o, n, ctx| {
            o.channel = load_reference_only(n, "an operation channel", ctx)
        })
        .field("title", |o, n, ctx| o.title = n.scalar(ctx))
        .field("summary", |o, n, ctx| o.summary = n.scalar(ctx))
        .field("description", |o, n, ctx| o.description = n.scalar(ctx))
        .field("security", |o, n, ctx| o.security = load_security(n, ctx))
        .field("tags", |o, n, ctx| o.tags = load_tags(n, ctx))
        .field("externalDocs", |o, n, ctx| {
            o.external_docs = Some(load_external_docs(n, ctx))
        })
        .field("bindings", |o, n, ctx| {
            o.bindings = Some(load_bindings(n, BindingCategory::Operation, ctx))
        })
        .field("traits", |o, n, ctx| o.traits = n.create_list("traits", ctx, load_operation_trait))
        .field("messages", |o, n, ctx| o.messages = load_message_references(n, ctx))
        .field("reply", |o, n, ctx| o.reply = Some(load_reply(n, ctx)))
});

static OPERATION_PATTERNS: Lazy<PatternFieldMap<Operation>> = Lazy::new(extension_patterns);

pub(crate) fn load_operation(
    node: &ParseNode,
    ctx: &mut ParsingContext<'_>,
) -> ModelRef<Operation> {
    load_ref(node, "operation", ctx, |map, ctx| {
        require_fields(map, &["action", "channel"], "an operation", ctx);
        load_object(map, &OPERATION_FIELDS, &OPERATION_PATTERNS, ctx)
    })
}

static OPERATION_TRAIT_FIELDS: Lazy<FixedFieldMap<OperationTrait>> = Lazy::new(|| {
    FixedFieldMap::<OperationTrait>::new()
        .field("title", |t, n, ctx| t.title = n.scalar(ctx))
        .field("summary", |t, n, ctx| t.summary = n.scalar(ctx))
        .field("description", |t, n, ctx| t.description = n.scalar(ctx))
        .field("security", |t, n, ctx| t.security = load_security(n, ctx))
        .field("tags", |t, n, ctx| t.tags = load_tags(n, ctx))
        .field("externalDocs", |t, n, ctx| {
            t.external_docs = Some(load_external_docs(n, ctx))
        })
        .field("bindings", |t, n, ctx| {
            t.bindings = Some(load_bindings(n, BindingCategory::Operation, ctx))
        })
});

static OPERATION_TRAIT_PATTERNS: Lazy<PatternFieldMap<OperationTrait>> =
    Lazy::new(extension_patterns);

pub(crate) fn load_operation_trait(
    node: &ParseNode,
    ctx: &mut ParsingContext<'_>,
) -> ModelRef<OperationTrait> {
    load_ref(node, "operation trait", ctx, |map, ctx| {
        load_object(map, &OPERATION_TRAIT_FIELDS, &OPERATION_TRAIT_PATTERNS, ctx)
    })
}

static REPLY_FIELDS: Lazy<FixedFieldMap<OperationReply>> = Lazy::new(|| {
    FixedFieldMap::<OperationReply>::new()
        .field("address", |r, n, ctx| r.address = Some(load_reply_address(n, ctx)))
        .field("channel", |r, n, ctx| r.channel = load_reference_only(n, "a reply channel", ctx))
        .field("messages", |r, n, ctx| r.messages = load_message_references(n, ctx))
});

static REPLY_PATTERNS: Lazy<PatternFieldMap<OperationReply>> = Lazy::new(extension_patterns);

pub(crate) fn load_reply(
    node: &ParseNode,
    ctx: &mut ParsingContext<'_>,
) -> ModelRef<OperationReply> {
    load_ref(node, "reply", ctx, |map, ctx| {
        load_object(map, &REPLY_FIELDS, &REPLY_PATTERNS, ctx)
    })
}

static REPLY_ADDRESS_FIELDS: Lazy<FixedFieldMap<OperationReplyAddress>> = Lazy::new(|| {
    FixedFieldMap::<OperationReplyAddress>::new()
        .field("description", |a, n, ctx| a.description = n.scalar(ctx))
        .field("location", |a, n, ctx| a.location = n.scalar(ctx).unwrap_or_default())
});

static REPLY_ADDRESS_PATTERNS: Lazy<PatternFieldMap<OperationReplyAddress>> =
    Lazy::new(extension_patterns);

pub(crate) fn load_reply_address(
    node: &ParseNode,
    ctx: &mut ParsingContext<'_>,
) -> ModelRef<OperationReplyAddress> {
    load_ref(node, "reply address", ctx, |map, ctx| {
        require_fields(map, &["location"], "a reply address", ctx);
        load_object(map, &REPLY_ADDRESS_FIELDS, &REPLY_ADDRESS_PATTERNS, ctx)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ReaderSettings;
    use crate::version::AsyncApiVersion;
    use serde_json::json;

    #[test]
    fn test_operation_requires_action_and_channel() {
        let settings = ReaderSettings::default();
        let mut ctx = ParsingContext::new(&settings, AsyncApiVersion::V3);
        let node = ParseNode::from(json!({"summary": "Dims a light"}));

        ctx.with_segment("operations", |ctx| {
            ctx.with_segment("dimLight", |ctx| load_operation(&node, ctx))
        });

        let missing: Vec<_> = ctx
            .diagnostics()
            .with_code(&DiagnosticCode::MissingField)
            .map(|d| d.message.clone())
            .collect();
        assert_eq!(missing.len(), 2);
        assert!(missing[0].contains("`action`"));
        assert!(missing[1].contains("`channel`"));
    }

    #[test]
    fn test_invalid_action_is_reported() {
        let settings = ReaderSettings::default();
        let mut ctx = ParsingContext::new(&settings, AsyncApiVersion::V3);
        let node = ParseNode::from(json!({
            "action": "publish",
            "channel": {"$ref": "#/channels/lightingMeasured"}
        }));

        let operation = load_operation(&node, &mut ctx).into_inline().unwrap();

        assert_eq!(
            operation.channel.unwrap().reference().unwrap().location(),
            "#/channels/lightingMeasured"
        );
        let diagnostic = ctx.diagnostics().iter().next().unwrap();
        assert_eq!(diagnostic.code, DiagnosticCode::InvalidValue);
        assert_eq!(diagnostic.pointer, "#/action");
    }

    #[test]
    fn test_reply_address_requires_location() {
        let settings = ReaderSettings::default();
        let mut ctx = ParsingContext::new(&settings, AsyncApiVersion::V3);
        let node = ParseNode::from(json!({
            "address": {"description": "Reply topic"},
            "messages": [{"$ref": "#/channels/pong/messages/pong"}]
        }));

        let reply = load_reply(&node, &mut ctx).into_inline().unwrap();

        assert_eq!(reply.messages.len(), 1);
        let diagnostic = ctx.diagnostics().iter().next().unwrap();
        assert_eq!(diagnostic.code, DiagnosticCode::MissingField);
        assert_eq!(diagnostic.pointer, "#/address");
    }

    #[test]
    fn test_inline_operation_message_is_rejected() {
        let settings = ReaderSettings::default();
        let mut ctx = ParsingContext::new(&settings, AsyncApiVersion::V3);
        let node = ParseNode::from(json!({
            "action": "send",
            "channel": {"$ref": "#/channels/lights"},
            "messages": [{"payload": {"type": "string"}}]
        }));

        let operation = load_operation(&node, &mut ctx).into_inline().unwrap();

        assert!(operation.messages.is_empty());
        assert_eq!(ctx.diagnostics().iter().next().unwrap().pointer, "#/messages/0");
    }
}
