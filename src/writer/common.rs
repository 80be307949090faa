//! Elements whose wire shape is the same in 2.x and 3.x

use serde_json::{Map, Value};

use super::{write_list, write_map, write_ref, ObjectBuilder, WriteContext, WriteV2, WriteV3};
use crate::model::{
    AdditionalProperties, Bindings, Contact, CorrelationId, ExternalDocumentation, JsonSchema,
    License, MessageExample, ModelRef, OAuthFlow, OperationReplyAddress, OtherSchema, SchemaItems,
    ServerVariable, Tag,
};

macro_rules! same_in_both_versions {
    ($($ty:ty => $write:ident),* $(,)?) => {
        $(
            impl WriteV2 for $ty {
                fn write_v2(&self, ctx: &mut WriteContext<'_>) -> Value {
                    $write(self, ctx)
                }
            }

            impl WriteV3 for $ty {
                fn write_v3(&self, ctx: &mut WriteContext<'_>) -> Value {
                    $write(self, ctx)
                }
            }
        )*
    };
}

same_in_both_versions!(
    Contact => write_contact,
    License => write_license,
    Tag => write_tag,
    ExternalDocumentation => write_external_docs,
    ServerVariable => write_server_variable,
    CorrelationId => write_correlation_id,
    JsonSchema => write_json_schema,
    OtherSchema => write_other_schema,
    Bindings => write_bindings,
    MessageExample => write_message_example,
    OperationReplyAddress => write_reply_address,
);

pub(crate) fn write_contact(contact: &Contact, _: &mut WriteContext<'_>) -> Value {
    ObjectBuilder::new()
        .string("name", &contact.name)
        .string("url", &contact.url)
        .string("email", &contact.email)
        .extensions(&contact.extensions)
        .build()
}

pub(crate) fn write_license(license: &License, _: &mut WriteContext<'_>) -> Value {
    ObjectBuilder::new()
        .value("name", Value::String(license.name.clone()))
        .string("url", &license.url)
        .extensions(&license.extensions)
        .build()
}

pub(crate) fn write_tag(tag: &Tag, ctx: &mut WriteContext<'_>) -> Value {
    let external_docs = tag
        .external_docs
        .as_ref()
        .map(|docs| write_ref(docs, ctx, write_external_docs));
    ObjectBuilder::new()
        .value("name", Value::String(tag.name.clone()))
        .string("description", &tag.description)
        .optional("externalDocs", external_docs)
        .extensions(&tag.extensions)
        .build()
}

pub(crate) fn write_tags(tags: &[ModelRef<Tag>], ctx: &mut WriteContext<'_>) -> Vec<Value> {
    write_list(tags, ctx, |tag, ctx| write_ref(tag, ctx, write_tag))
}

pub(crate) fn write_external_docs(docs: &ExternalDocumentation, _: &mut WriteContext<'_>) -> Value {
    ObjectBuilder::new()
        .string("description", &docs.description)
        .value("url", Value::String(docs.url.clone()))
        .extensions(&docs.extensions)
        .build()
}

pub(crate) fn write_optional_docs(
    docs: &Option<ModelRef<ExternalDocumentation>>,
    ctx: &mut WriteContext<'_>,
) -> Option<Value> {
    docs.as_ref().map(|docs| write_ref(docs, ctx, write_external_docs))
}

pub(crate) fn write_server_variable(variable: &ServerVariable, _: &mut WriteContext<'_>) -> Value {
    ObjectBuilder::new()
        .strings("enum", &variable.enum_values)
        .string("default", &variable.default)
        .string("description", &variable.description)
        .strings("examples", &variable.examples)
        .extensions(&variable.extensions)
        .build()
}

pub(crate) fn write_correlation_id(
    correlation_id: &CorrelationId,
    _: &mut WriteContext<'_>,
) -> Value {
    ObjectBuilder::new()
        .string("description", &correlation_id.description)
        .value("location", Value::String(correlation_id.location.clone()))
        .extensions(&correlation_id.extensions)
        .build()
}

pub(crate) fn write_reply_address(
    address: &OperationReplyAddress,
    _: &mut WriteContext<'_>,
) -> Value {
    ObjectBuilder::new()
        .string("description", &address.description)
        .value("location", Value::String(address.location.clone()))
        .extensions(&address.extensions)
        .build()
}

pub(crate) fn write_message_example(example: &MessageExample, _: &mut WriteContext<'_>) -> Value {
    ObjectBuilder::new()
        .optional("headers", example.headers.clone())
        .optional("payload", example.payload.clone())
        .string("name", &example.name)
        .string("summary", &example.summary)
        .extensions(&example.extensions)
        .build()
}

pub(crate) fn write_bindings(bindings: &Bindings, _: &mut WriteContext<'_>) -> Value {
    let mut out = ObjectBuilder::new();
    for (protocol, binding) in &bindings.entries {
        out.value(protocol, binding.to_value());
    }
    out.extensions(&bindings.extensions).build()
}

pub(crate) fn write_optional_bindings(
    bindings: &Option<ModelRef<Bindings>>,
    ctx: &mut WriteContext<'_>,
) -> Option<Value> {
    bindings.as_ref().map(|bindings| write_ref(bindings, ctx, write_bindings))
}

pub(crate) fn write_other_schema(schema: &OtherSchema, _: &mut WriteContext<'_>) -> Value {
    schema.value.clone()
}

/// OAuth flow; the scope map is `scopes` in 2.x and `availableScopes` in 3.x
pub(crate) fn write_oauth_flow(flow: &OAuthFlow, scopes_key: &str) -> Value {
    let scopes: Map<String, Value> = flow
        .available_scopes
        .iter()
        .map(|(name, description)| (name.clone(), Value::String(description.clone())))
        .collect();
    let mut out = ObjectBuilder::new();
    out.string("authorizationUrl", &flow.authorization_url)
        .string("tokenUrl", &flow.token_url)
        .string("refreshUrl", &flow.refresh_url);
    // required even when empty
    out.value(scopes_key, Value::Object(scopes));
    out.extensions(&flow.extensions).build()
}

fn schema(schema: &ModelRef<JsonSchema>, ctx: &mut WriteContext<'_>) -> Value {
    write_ref(schema, ctx, write_json_schema)
}

fn schemas(items: &[ModelRef<JsonSchema>], ctx: &mut WriteContext<'_>) -> Vec<Value> {
    write_list(items, ctx, schema)
}

pub(crate) fn write_json_schema(s: &JsonSchema, ctx: &mut WriteContext<'_>) -> Value {
    let schema_type = match s.schema_type.as_slice() {
        [] => None,
        [single] => Some(Value::String(single.clone())),
        many => Some(Value::Array(many.iter().cloned().map(Value::String).collect())),
    };
    let properties = write_map(&s.properties, ctx, schema);
    let pattern_properties = write_map(&s.pattern_properties, ctx, schema);
    let additional_properties = s.additional_properties.as_ref().map(|additional| match additional {
        AdditionalProperties::Allowed(allowed) => Value::Bool(*allowed),
        AdditionalProperties::Schema(nested) => schema(nested, ctx),
    });
    let items = s.items.as_ref().map(|items| match items {
        SchemaItems::Single(nested) => schema(nested, ctx),
        SchemaItems::Tuple(tuple) => Value::Array(schemas(tuple, ctx)),
    });
    let all_of = schemas(&s.all_of, ctx);
    let any_of = schemas(&s.any_of, ctx);
    let one_of = schemas(&s.one_of, ctx);
    let not = s.not.as_ref().map(|nested| schema(nested, ctx));
    let external_docs = write_optional_docs(&s.external_docs, ctx);

    let number = |n: &Option<serde_json::Number>| n.clone().map(Value::Number);
    let count = |n: Option<u64>| n.map(Value::from);

    let mut out = ObjectBuilder::new();
    out.string("title", &s.title)
        .string("description", &s.description)
        .optional("type", schema_type)
        .string("format", &s.format)
        .list("enum", s.enum_values.clone())
        .optional("const", s.const_value.clone())
        .optional("default", s.default.clone())
        .list("examples", s.examples.clone())
        .optional("multipleOf", number(&s.multiple_of))
        .optional("maximum", number(&s.maximum))
        .optional("exclusiveMaximum", number(&s.exclusive_maximum))
        .optional("minimum", number(&s.minimum))
        .optional("exclusiveMinimum", number(&s.exclusive_minimum))
        .optional("maxLength", count(s.max_length))
        .optional("minLength", count(s.min_length))
        .string("pattern", &s.pattern)
        .optional("maxItems", count(s.max_items))
        .optional("minItems", count(s.min_items))
        .bool("uniqueItems", s.unique_items)
        .optional("maxProperties", count(s.max_properties))
        .optional("minProperties", count(s.min_properties))
        .strings("required", &s.required)
        .object("properties", properties)
        .object("patternProperties", pattern_properties)
        .optional("additionalProperties", additional_properties)
        .optional("items", items)
        .list("allOf", all_of)
        .list("anyOf", any_of)
        .list("oneOf", one_of)
        .optional("not", not)
        .string("discriminator", &s.discriminator)
        .bool("readOnly", s.read_only)
        .bool("writeOnly", s.write_only)
        .bool("deprecated", s.deprecated)
        .optional("externalDocs", external_docs);
    for (keyword, value) in &s.keywords {
        out.value(keyword, value.clone());
    }
    out.extensions(&s.extensions).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::WriterSettings;
    use crate::workspace::Workspace;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_json_schema_keeps_keywords_and_order() {
        let workspace = Workspace::new();
        let settings = WriterSettings::default();
        let mut ctx = WriteContext::new(&settings, &workspace);
        let mut schema = JsonSchema {
            schema_type: vec!["object".into()],
            required: vec!["lumens".into()],
            additional_properties: Some(AdditionalProperties::Allowed(false)),
            ..Default::default()
        };
        schema.properties.insert(
            "lumens".into(),
            ModelRef::inline(JsonSchema {
                schema_type: vec!["integer".into()],
                minimum: Some(0.into()),
                ..Default::default()
            }),
        );
        schema.properties.insert(
            "sentAt".into(),
            ModelRef::pointer("#/components/schemas/sentAt"),
        );
        schema.keywords.insert("if".into(), json!({"required": ["lumens"]}));

        let value = write_json_schema(&schema, &mut ctx);

        assert_eq!(
            value,
            json!({
                "type": "object",
                "required": ["lumens"],
                "properties": {
                    "lumens": {"type": "integer", "minimum": 0},
                    "sentAt": {"$ref": "#/components/schemas/sentAt"}
                },
                "additionalProperties": false,
                "if": {"required": ["lumens"]}
            })
        );
    }

    #[test]
    fn test_oauth_flow_scope_key() {
        let mut flow = OAuthFlow {
            token_url: Some("https://example.com/token".into()),
            ..Default::default()
        };
        flow.available_scopes.insert("streetlights:on".into(), "Turn lights on".into());

        assert_eq!(
            write_oauth_flow(&flow, "availableScopes"),
            json!({
                "tokenUrl": "https://example.com/token",
                "availableScopes": {"streetlights:on": "Turn lights on"}
            })
        );
        assert!(write_oauth_flow(&flow, "scopes").get("scopes").is_some());
    }
}
