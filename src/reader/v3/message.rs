//! v3 messages, message traits and multi-format schemas

use once_cell::sync::Lazy;

use crate::context::ParsingContext;
use crate::diagnostics::DiagnosticCode;
use crate::dispatch::{extension_patterns, FixedFieldMap, NodeExt, PatternFieldMap};
use crate::model::schema::DEFAULT_SCHEMA_FORMAT;
use crate::model::{Message, MessageTrait, ModelRef, MultiFormatSchema};
use crate::node::{MapNode, ParseNode};
use crate::reader::common::{
    load_bindings, load_correlation_id, load_external_docs, load_json_schema, load_message_example,
    load_object, load_ref, load_schema_for_format, load_tags,
};
use crate::settings::BindingCategory;

static MESSAGE_FIELDS: Lazy<FixedFieldMap<Message>> = Lazy::new(|| {
    FixedFieldMap::<Message>::new()
        .field("headers", |m, n, ctx| m.headers = Some(load_multi_format_schema(n, ctx)))
        .field("payload", |m, n, ctx| m.payload = Some(load_multi_format_schema(n, ctx)))
        .field("correlationId", |m, n, ctx| {
            m.correlation_id = Some(load_correlation_id(n, ctx))
        })
        .field("contentType", |m, n, ctx| m.content_type = n.scalar(ctx))
        .field("name", |m, n, ctx| m.name = n.scalar(ctx))
        .field("title", |m, n, ctx| m.title = n.scalar(ctx))
        .field("summary", |m, n, ctx| m.summary = n.scalar(ctx))
        .field("description", |m, n, ctx| m.description = n.scalar(ctx))
        .field("tags", |m, n, ctx| m.tags = load_tags(n, ctx))
        .field("externalDocs", |m, n, ctx| {
            m.external_docs = Some(load_external_docs(n, ctx))
        })
        .field("bindings", |m, n, ctx| {
            m.bindings = Some(load_bindings(n, BindingCategory::Message, ctx))
        })
        .field("examples", |m, n, ctx| {
            m.examples = n.create_list("examples", ctx, load_message_example)
        })
        .field("traits", |m, n, ctx| m.traits = n.create_list("traits", ctx, load_message_trait))
});

static MESSAGE_PATTERNS: Lazy<PatternFieldMap<Message>> = Lazy::new(extension_patterns);

pub(crate) fn load_message(node: &ParseNode, ctx: &mut ParsingContext<'_>) -> ModelRef<Message> {
    load_ref(node, "message", ctx, |map, ctx| {
        load_object(map, &MESSAGE_FIELDS, &MESSAGE_PATTERNS, ctx)
    })
}

static MESSAGE_TRAIT_FIELDS: Lazy<FixedFieldMap<MessageTrait>> = Lazy::new(|| {
    FixedFieldMap::<MessageTrait>::new()
        .field("headers", |t, n, ctx| t.headers = Some(load_multi_format_schema(n, ctx)))
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

/// `{schemaFormat, schema}`, or a bare schema in the default format
pub(crate) fn load_multi_format_schema(
    node: &ParseNode,
    ctx: &mut ParsingContext<'_>,
) -> MultiFormatSchema {
    match node.as_map().filter(|map| is_multi_format(map)) {
        Some(map) => {
            let format = map
                .get("schemaFormat")
                .and_then(|n| ctx.with_segment("schemaFormat", |ctx| n.scalar(ctx)))
                .unwrap_or_else(|| DEFAULT_SCHEMA_FORMAT.to_string());
            let Some(schema_node) = map.get("schema") else {
                ctx.error(
                    DiagnosticCode::MissingField,
                    "`schema` is a required field of a multi-format schema",
                );
                return MultiFormatSchema {
                    schema_format: format,
                    ..Default::default()
                };
            };
            let schema = ctx.with_segment("schema", |ctx| {
                load_schema_for_format(schema_node, &format, ctx)
            });
            MultiFormatSchema {
                schema_format: format,
                schema,
            }
        }
        None => MultiFormatSchema::json(load_json_schema(node, ctx)),
    }
}

// `schemaFormat` marks the wrapper; `schema` alone is a legal JSON schema property name
fn is_multi_format(map: &MapNode) -> bool {
    map.reference_pointer().is_none() && map.contains_key("schemaFormat")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Schema;
    use crate::settings::ReaderSettings;
    use crate::version::AsyncApiVersion;
    use serde_json::json;

    #[test]
    fn test_multi_format_wrapper() {
        let settings = ReaderSettings::default();
        let mut ctx = ParsingContext::new(&settings, AsyncApiVersion::V3);
        let node = ParseNode::from(json!({
            "schemaFormat": "application/vnd.aai.asyncapi+json;version=3.0.0",
            "schema": {"type": "object", "properties": {"lumens": {"type": "integer"}}}
        }));

        let schema = load_multi_format_schema(&node, &mut ctx);

        let json_schema = schema.json_schema().unwrap().borrow_inline().unwrap().clone();
        assert!(json_schema.properties.contains_key("lumens"));
        assert!(schema.is_default_format());
    }

    #[test]
    fn test_bare_schema_uses_default_format() {
        let settings = ReaderSettings::default();
        let mut ctx = ParsingContext::new(&settings, AsyncApiVersion::V3);
        let node = ParseNode::from(json!({"$ref": "#/components/schemas/lightMeasuredPayload"}));

        let schema = load_multi_format_schema(&node, &mut ctx);

        assert!(schema.is_default_format());
        match &schema.schema {
            Schema::Json(json) => assert!(json.is_reference()),
            Schema::Other(_) => panic!("expected a JSON schema reference"),
        }
    }

    #[test]
    fn test_wrapper_without_schema_is_reported() {
        let settings = ReaderSettings::default();
        let mut ctx = ParsingContext::new(&settings, AsyncApiVersion::V3);
        let node = ParseNode::from(json!({
            "schemaFormat": "application/vnd.apache.avro;version=1.9.0"
        }));

        let schema = load_multi_format_schema(&node, &mut ctx);

        assert_eq!(schema.schema_format, "application/vnd.apache.avro;version=1.9.0");
        assert_eq!(ctx.diagnostics().errors().count(), 1);
    }
}
