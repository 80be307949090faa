//! v2 messages and message traits
//!
//! v2 puts `schemaFormat` next to `payload` on the message. The payload is
//! held back until the whole message is read so the format is known whatever
//! the key order.

use once_cell::sync::Lazy;

use crate::context::ParsingContext;
use crate::dispatch::{extension_patterns, Extensible, FixedFieldMap, NodeExt, PatternFieldMap};
use crate::model::schema::DEFAULT_SCHEMA_FORMAT;
use crate::model::{Extensions, Message, MessageTrait, ModelRef, MultiFormatSchema};
use crate::node::ParseNode;
use crate::reader::common::{
    load_bindings, load_correlation_id, load_external_docs, load_json_schema, load_message_example,
    load_object, load_ref, load_schema_for_format, load_tags,
};
use crate::settings::BindingCategory;

#[derive(Debug, Default)]
struct V2Message {
    message: Message,
    schema_format: Option<String>,
    payload: Option<ParseNode>,
}

impl Extensible for V2Message {
    fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.message.extensions
    }
}

static MESSAGE_FIELDS: Lazy<FixedFieldMap<V2Message>> = Lazy::new(|| {
    FixedFieldMap::<V2Message>::new()
        .field("messageId", |_, _, _| {})
        .field("headers", |m, n, ctx| {
            m.message.headers = Some(MultiFormatSchema::json(load_json_schema(n, ctx)))
        })
        .field("payload", |m, n, _| m.payload = Some(n.clone()))
        .field("schemaFormat", |m, n, ctx| m.schema_format = n.scalar(ctx))
        .field("correlationId", |m, n, ctx| {
            m.message.correlation_id = Some(load_correlation_id(n, ctx))
        })
        .field("contentType", |m, n, ctx| m.message.content_type = n.scalar(ctx))
        .field("name", |m, n, ctx| m.message.name = n.scalar(ctx))
        .field("title", |m, n, ctx| m.message.title = n.scalar(ctx))
        .field("summary", |m, n, ctx| m.message.summary = n.scalar(ctx))
        .field("description", |m, n, ctx| m.message.description = n.scalar(ctx))
        .field("tags", |m, n, ctx| m.message.tags = load_tags(n, ctx))
        .field("externalDocs", |m, n, ctx| {
            m.message.external_docs = Some(load_external_docs(n, ctx))
        })
        .field("bindings", |m, n, ctx| {
            m.message.bindings = Some(load_bindings(n, BindingCategory::Message, ctx))
        })
        .field("examples", |m, n, ctx| {
            m.message.examples = n.create_list("examples", ctx, load_message_example)
        })
        .field("traits", |m, n, ctx| {
            m.message.traits = n.create_list("traits", ctx, load_message_trait)
        })
});

static MESSAGE_PATTERNS: Lazy<PatternFieldMap<V2Message>> = Lazy::new(extension_patterns);

pub(crate) fn load_message(node: &ParseNode, ctx: &mut ParsingContext<'_>) -> ModelRef<Message> {
    load_ref(node, "message", ctx, |map, ctx| {
        let parsed = load_object(map, &MESSAGE_FIELDS, &MESSAGE_PATTERNS, ctx);
        let mut message = parsed.message;
        if let Some(payload) = parsed.payload {
            let format = parsed
                .schema_format
                .unwrap_or_else(|| DEFAULT_SCHEMA_FORMAT.to_string());
            let schema = ctx.with_segment("payload", |ctx| {
                load_schema_for_format(&payload, &format, ctx)
            });
            message.payload = Some(MultiFormatSchema {
                schema_format: format,
                schema,
            });
        }
        message
    })
}

static MESSAGE_TRAIT_FIELDS: Lazy<FixedFieldMap<MessageTrait>> = Lazy::new(|| {
    FixedFieldMap::<MessageTrait>::new()
        .field("messageId", |_, _, _| {})
        .field("schemaFormat", |_, _, _| {})
        .field("headers", |t, n, ctx| {
            t.headers = Some(MultiFormatSchema::json(load_json_schema(n, ctx)))
        })
        .field("correlationId", |t, n, ctx| {
            t.correlation_id = Some(load_correlation_id(n, ctx))
        })
        .field("contentType", |t, n, ctx| t.content_type = n.scalar(ctx))
        .field("name", |t, n, ctx| t.name = n.scalar(ctx))
        .field("title", |t, n, ctx| t.title = n.scalar(ctx))
        .field("summary", |t, n, ctx| t.summary = n.scalar(ctx))
        .field("description", |t, n, ctx| t.description = n.scalar(ctx))
        .field("tags", |t, n, ctx| t.tags = load_tags(n, ctx))
        .field("externalDocs", |t, n, ctx| {
            t.external_docs = Some(load_external_docs(n, ctx))
        })
        .field("bindings", |t, n, ctx| {
            t.bindings = Some(load_bindings(n, BindingCategory::Message, ctx))
        })
        .field("examples", |t, n, ctx| {
            t.examples = n.create_list("examples", ctx, load_message_example)
        })
});

static MESSAGE_TRAIT_PATTERNS: Lazy<PatternFieldMap<MessageTrait>> = Lazy::new(extension_patterns);

pub(crate) fn load_message_trait(
    node: &ParseNode,
    ctx: &mut ParsingContext<'_>,
) -> ModelRef<MessageTrait> {
    load_ref(node, "message trait", ctx, |map, ctx| {
        load_object(map, &MESSAGE_TRAIT_FIELDS, &MESSAGE_TRAIT_PATTERNS, ctx)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Schema;
    use crate::settings::ReaderSettings;
    use crate::version::AsyncApiVersion;
    use serde_json::json;

    #[test]
    fn test_schema_format_after_payload() {
        let settings = ReaderSettings::default();
        let mut ctx = ParsingContext::new(&settings, AsyncApiVersion::V2);
        let node = ParseNode::from(json!({
            "payload": {"type": "record", "name": "LightMeasured", "fields": []},
            "schemaFormat": "application/vnd.apache.avro;version=1.9.0",
            "contentType": "avro/binary"
        }));

        let message = load_message(&node, &mut ctx).into_inline().unwrap();
        let payload = message.payload.unwrap();

        assert_eq!(payload.schema_format, "application/vnd.apache.avro;version=1.9.0");
        assert!(matches!(payload.schema, Schema::Other(_)));
        assert_eq!(message.content_type.as_deref(), Some("avro/binary"));
    }

    #[test]
    fn test_payload_defaults_to_json_schema() {
        let settings = ReaderSettings::default();
        let mut ctx = ParsingContext::new(&settings, AsyncApiVersion::V2);
        let node = ParseNode::from(json!({"payload": {"type": "object"}}));

        let message = load_message(&node, &mut ctx).into_inline().unwrap();
        let payload = message.payload.unwrap();

        assert!(payload.is_default_format());
        assert!(payload.json_schema().is_some());
    }
}
