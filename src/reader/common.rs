//! Loaders shared by both versions
//!
//! Tags, external docs, info, server variables, correlation ids, examples,
//! JSON schemas and bindings have the same wire shape in v2 and v3.

use once_cell::sync::Lazy;

use crate::context::ParsingContext;
use crate::diagnostics::DiagnosticCode;
use crate::dispatch::{
    extension_patterns, is_extension, load_extension, parse_map, require_fields, FixedFieldMap,
    NodeExt, PatternFieldMap,
};
use crate::model::schema::{is_json_schema_format, is_known_schema_format};
use crate::model::{
    AdditionalProperties, AsyncApiAny, Bindings, Contact, CorrelationId, ExternalDocumentation,
    Info, JsonSchema, License, MessageExample, ModelRef, OAuthFlow, OAuthFlows, OtherSchema,
    Referenceable, Schema, SchemaItems, SecurityScheme, SecuritySchemeLocation, SecuritySchemeType,
    ServerVariable, Tag,
};
use crate::node::{MapNode, ParseNode};
use crate::settings::BindingCategory;

// =============================================================================
// Generic helpers
// =============================================================================

/// Run the dispatch engine over `map` into a fresh `T`
pub(crate) fn load_object<T: Default>(
    map: &MapNode,
    fixed: &FixedFieldMap<T>,
    patterns: &PatternFieldMap<T>,
    ctx: &mut ParsingContext<'_>,
) -> T {
    let mut target = T::default();
    parse_map(map, &mut target, fixed, patterns, ctx);
    target
}

/// `$ref` maps become pointers, other maps go through `load`
pub(crate) fn load_ref<T: Referenceable + Default>(
    node: &ParseNode,
    what: &str,
    ctx: &mut ParsingContext<'_>,
    load: impl FnOnce(&MapNode, &mut ParsingContext<'_>) -> T,
) -> ModelRef<T> {
    let Some(map) = node.expect_map(what, ctx) else {
        return ModelRef::inline(T::default());
    };
    if let Some(pointer) = map.reference_pointer() {
        return ModelRef::pointer(pointer);
    }
    ModelRef::inline(load(map, ctx))
}

/// Element that must be written as a `$ref`
pub(crate) fn load_reference_only<T: Referenceable>(
    node: &ParseNode,
    what: &str,
    ctx: &mut ParsingContext<'_>,
) -> Option<ModelRef<T>> {
    match node.as_map().and_then(MapNode::reference_pointer) {
        Some(pointer) => Some(ModelRef::pointer(pointer)),
        None => {
            ctx.error(
                DiagnosticCode::UnexpectedShape,
                format!("expected {} to be a reference object with `$ref`", what),
            );
            None
        }
    }
}

/// Raw values of a list node
pub(crate) fn load_any_list(
    node: &ParseNode,
    what: &str,
    ctx: &mut ParsingContext<'_>,
) -> Vec<AsyncApiAny> {
    node.create_list(what, ctx, |n, _| n.to_value())
}

/// Scalar values of a list rendered as strings, whatever their JSON type
pub(crate) fn load_string_values(
    node: &ParseNode,
    what: &str,
    ctx: &mut ParsingContext<'_>,
) -> Vec<String> {
    node.create_list(what, ctx, |n, ctx| n.scalar(ctx))
        .into_iter()
        .flatten()
        .collect()
}

// =============================================================================
// Tags and external docs
// =============================================================================

static TAG_FIELDS: Lazy<FixedFieldMap<Tag>> = Lazy::new(|| {
    FixedFieldMap::<Tag>::new()
        .field("name", |t, n, ctx| t.name = n.scalar(ctx).unwrap_or_default())
        .field("description", |t, n, ctx| t.description = n.scalar(ctx))
        .field("externalDocs", |t, n, ctx| {
            t.external_docs = Some(load_external_docs(n, ctx))
        })
});

static TAG_PATTERNS: Lazy<PatternFieldMap<Tag>> = Lazy::new(extension_patterns);

pub(crate) fn load_tag(node: &ParseNode, ctx: &mut ParsingContext<'_>) -> ModelRef<Tag> {
    load_ref(node, "tag", ctx, |map, ctx| {
        require_fields(map, &["name"], "a tag", ctx);
        load_object(map, &TAG_FIELDS, &TAG_PATTERNS, ctx)
    })
}

pub(crate) fn load_tags(node: &ParseNode, ctx: &mut ParsingContext<'_>) -> Vec<ModelRef<Tag>> {
    node.create_list("tags", ctx, load_tag)
}

static EXTERNAL_DOCS_FIELDS: Lazy<FixedFieldMap<ExternalDocumentation>> = Lazy::new(|| {
    FixedFieldMap::<ExternalDocumentation>::new()
        .field("description", |d, n, ctx| d.description = n.scalar(ctx))
        .field("url", |d, n, ctx| d.url = n.scalar(ctx).unwrap_or_default())
});

static EXTERNAL_DOCS_PATTERNS: Lazy<PatternFieldMap<ExternalDocumentation>> =
    Lazy::new(extension_patterns);

pub(crate) fn load_external_docs(
    node: &ParseNode,
    ctx: &mut ParsingContext<'_>,
) -> ModelRef<ExternalDocumentation> {
    load_ref(node, "externalDocs", ctx, |map, ctx| {
        require_fields(map, &["url"], "external documentation", ctx);
        load_object(map, &EXTERNAL_DOCS_FIELDS, &EXTERNAL_DOCS_PATTERNS, ctx)
    })
}

// =============================================================================
// Info
// =============================================================================

static CONTACT_FIELDS: Lazy<FixedFieldMap<Contact>> = Lazy::new(|| {
    FixedFieldMap::<Contact>::new()
        .field("name", |c, n, ctx| c.name = n.scalar(ctx))
        .field("url", |c, n, ctx| c.url = n.scalar(ctx))
        .field("email", |c, n, ctx| c.email = n.scalar(ctx))
});

static CONTACT_PATTERNS: Lazy<PatternFieldMap<Contact>> = Lazy::new(extension_patterns);

static LICENSE_FIELDS: Lazy<FixedFieldMap<License>> = Lazy::new(|| {
    FixedFieldMap::<License>::new()
        .field("name", |l, n, ctx| l.name = n.scalar(ctx).unwrap_or_default())
        .field("url", |l, n, ctx| l.url = n.scalar(ctx))
});

static LICENSE_PATTERNS: Lazy<PatternFieldMap<License>> = Lazy::new(extension_patterns);

static INFO_FIELDS: Lazy<FixedFieldMap<Info>> = Lazy::new(|| {
    FixedFieldMap::<Info>::new()
        .field("title", |i, n, ctx| i.title = n.scalar(ctx).unwrap_or_default())
        .field("version", |i, n, ctx| i.version = n.scalar(ctx).unwrap_or_default())
        .field("description", |i, n, ctx| i.description = n.scalar(ctx))
        .field("termsOfService", |i, n, ctx| i.terms_of_service = n.scalar(ctx))
        .field("contact", |i, n, ctx| {
            i.contact = n
                .expect_map("contact", ctx)
                .map(|map| load_object(map, &CONTACT_FIELDS, &CONTACT_PATTERNS, ctx))
        })
        .field("license", |i, n, ctx| {
            i.license = n.expect_map("license", ctx).map(|map| {
                require_fields(map, &["name"], "a license", ctx);
                load_object(map, &LICENSE_FIELDS, &LICENSE_PATTERNS, ctx)
            })
        })
        .field("tags", |i, n, ctx| i.tags = load_tags(n, ctx))
        .field("externalDocs", |i, n, ctx| {
            i.external_docs = Some(load_external_docs(n, ctx))
        })
});

static INFO_PATTERNS: Lazy<PatternFieldMap<Info>> = Lazy::new(extension_patterns);

pub(crate) fn load_info(node: &ParseNode, ctx: &mut ParsingContext<'_>) -> Info {
    let Some(map) = node.expect_map("info", ctx) else {
        return Info::default();
    };
    require_fields(map, &["title", "version"], "info", ctx);
    load_object(map, &INFO_FIELDS, &INFO_PATTERNS, ctx)
}

// =============================================================================
// Server variables, correlation ids, examples
// =============================================================================

static SERVER_VARIABLE_FIELDS: Lazy<FixedFieldMap<ServerVariable>> = Lazy::new(|| {
    FixedFieldMap::<ServerVariable>::new()
        .field("enum", |v, n, ctx| v.enum_values = load_string_values(n, "enum", ctx))
        .field("default", |v, n, ctx| v.default = n.scalar(ctx))
        .field("description", |v, n, ctx| v.description = n.scalar(ctx))
        .field("examples", |v, n, ctx| v.examples = load_string_values(n, "examples", ctx))
});

static SERVER_VARIABLE_PATTERNS: Lazy<PatternFieldMap<ServerVariable>> =
    Lazy::new(extension_patterns);

pub(crate) fn load_server_variable(
    node: &ParseNode,
    ctx: &mut ParsingContext<'_>,
) -> ModelRef<ServerVariable> {
    load_ref(node, "server variable", ctx, |map, ctx| {
        load_object(map, &SERVER_VARIABLE_FIELDS, &SERVER_VARIABLE_PATTERNS, ctx)
    })
}

static CORRELATION_ID_FIELDS: Lazy<FixedFieldMap<CorrelationId>> = Lazy::new(|| {
    FixedFieldMap::<CorrelationId>::new()
        .field("description", |c, n, ctx| c.description = n.scalar(ctx))
        .field("location", |c, n, ctx| c.location = n.scalar(ctx).unwrap_or_default())
});

static CORRELATION_ID_PATTERNS: Lazy<PatternFieldMap<CorrelationId>> =
    Lazy::new(extension_patterns);

pub(crate) fn load_correlation_id(
    node: &ParseNode,
    ctx: &mut ParsingContext<'_>,
) -> ModelRef<CorrelationId> {
    load_ref(node, "correlationId", ctx, |map, ctx| {
        require_fields(map, &["location"], "a correlation id", ctx);
        load_object(map, &CORRELATION_ID_FIELDS, &CORRELATION_ID_PATTERNS, ctx)
    })
}

static EXAMPLE_FIELDS: Lazy<FixedFieldMap<MessageExample>> = Lazy::new(|| {
    FixedFieldMap::<MessageExample>::new()
        .field("headers", |e, n, _| e.headers = Some(n.to_value()))
        .field("payload", |e, n, _| e.payload = Some(n.to_value()))
        .field("name", |e, n, ctx| e.name = n.scalar(ctx))
        .field("summary", |e, n, ctx| e.summary = n.scalar(ctx))
});

static EXAMPLE_PATTERNS: Lazy<PatternFieldMap<MessageExample>> = Lazy::new(extension_patterns);

pub(crate) fn load_message_example(
    node: &ParseNode,
    ctx: &mut ParsingContext<'_>,
) -> MessageExample {
    match node.expect_map("message example", ctx) {
        Some(map) => load_object(map, &EXAMPLE_FIELDS, &EXAMPLE_PATTERNS, ctx),
        None => MessageExample::default(),
    }
}

// =============================================================================
// Security schemes
// =============================================================================

fn security_scheme_fields() -> FixedFieldMap<SecurityScheme> {
    FixedFieldMap::<SecurityScheme>::new()
        .field("type", |s, n, ctx| {
            s.scheme_type = n.scalar(ctx).and_then(|text| match text.parse::<SecuritySchemeType>() {
                Ok(kind) => Some(kind),
                Err(message) => {
                    ctx.error(DiagnosticCode::InvalidValue, message);
                    None
                }
            })
        })
        .field("description", |s, n, ctx| s.description = n.scalar(ctx))
        .field("name", |s, n, ctx| s.name = n.scalar(ctx))
        .field("in", |s, n, ctx| {
            s.location = n
                .scalar(ctx)
                .and_then(|text| match text.parse::<SecuritySchemeLocation>() {
                    Ok(location) => Some(location),
                    Err(message) => {
                        ctx.error(DiagnosticCode::InvalidValue, message);
                        None
                    }
                })
        })
        .field("scheme", |s, n, ctx| s.scheme = n.scalar(ctx))
        .field("bearerFormat", |s, n, ctx| s.bearer_format = n.scalar(ctx))
        .field("openIdConnectUrl", |s, n, ctx| s.open_id_connect_url = n.scalar(ctx))
}

/// v2 shape: flows list their scopes under `scopes`
static SECURITY_SCHEME_V2_FIELDS: Lazy<FixedFieldMap<SecurityScheme>> = Lazy::new(|| {
    security_scheme_fields().field("flows", |s, n, ctx| {
        s.flows = n
            .expect_map("flows", ctx)
            .map(|map| load_object(map, &OAUTH_FLOWS_V2_FIELDS, &OAUTH_FLOWS_PATTERNS, ctx))
    })
});

/// v3 shape: flows use `availableScopes` and the scheme lists required `scopes`
static SECURITY_SCHEME_V3_FIELDS: Lazy<FixedFieldMap<SecurityScheme>> = Lazy::new(|| {
    security_scheme_fields()
        .field("flows", |s, n, ctx| {
            s.flows = n
                .expect_map("flows", ctx)
                .map(|map| load_object(map, &OAUTH_FLOWS_V3_FIELDS, &OAUTH_FLOWS_PATTERNS, ctx))
        })
        .field("scopes", |s, n, ctx| {
            s.scopes = n.create_simple_list("scopes", ctx).into_iter().collect()
        })
});

static SECURITY_SCHEME_PATTERNS: Lazy<PatternFieldMap<SecurityScheme>> =
    Lazy::new(extension_patterns);

pub(crate) fn load_security_scheme_v2(
    node: &ParseNode,
    ctx: &mut ParsingContext<'_>,
) -> ModelRef<SecurityScheme> {
    load_ref(node, "security scheme", ctx, |map, ctx| {
        require_fields(map, &["type"], "a security scheme", ctx);
        load_object(map, &SECURITY_SCHEME_V2_FIELDS, &SECURITY_SCHEME_PATTERNS, ctx)
    })
}

pub(crate) fn load_security_scheme_v3(
    node: &ParseNode,
    ctx: &mut ParsingContext<'_>,
) -> ModelRef<SecurityScheme> {
    load_ref(node, "security scheme", ctx, |map, ctx| {
        require_fields(map, &["type"], "a security scheme", ctx);
        load_object(map, &SECURITY_SCHEME_V3_FIELDS, &SECURITY_SCHEME_PATTERNS, ctx)
    })
}

macro_rules! oauth_flows_table {
    ($flow_fields:ident) => {
        FixedFieldMap::<OAuthFlows>::new()
            .field("implicit", |f, n, ctx| {
                f.implicit = load_oauth_flow(n, &$flow_fields, ctx)
            })
            .field("password", |f, n, ctx| {
                f.password = load_oauth_flow(n, &$flow_fields, ctx)
            })
            .field("clientCredentials", |f, n, ctx| {
                f.client_credentials = load_oauth_flow(n, &$flow_fields, ctx)
            })
            .field("authorizationCode", |f, n, ctx| {
                f.authorization_code = load_oauth_flow(n, &$flow_fields, ctx)
            })
    };
}

static OAUTH_FLOWS_V2_FIELDS: Lazy<FixedFieldMap<OAuthFlows>> =
    Lazy::new(|| oauth_flows_table!(OAUTH_FLOW_V2_FIELDS));

static OAUTH_FLOWS_V3_FIELDS: Lazy<FixedFieldMap<OAuthFlows>> =
    Lazy::new(|| oauth_flows_table!(OAUTH_FLOW_V3_FIELDS));

static OAUTH_FLOWS_PATTERNS: Lazy<PatternFieldMap<OAuthFlows>> = Lazy::new(extension_patterns);

fn oauth_flow_fields() -> FixedFieldMap<OAuthFlow> {
    FixedFieldMap::<OAuthFlow>::new()
        .field("authorizationUrl", |f, n, ctx| f.authorization_url = n.scalar(ctx))
        .field("tokenUrl", |f, n, ctx| f.token_url = n.scalar(ctx))
        .field("refreshUrl", |f, n, ctx| f.refresh_url = n.scalar(ctx))
}

static OAUTH_FLOW_V2_FIELDS: Lazy<FixedFieldMap<OAuthFlow>> = Lazy::new(|| {
    oauth_flow_fields().field("scopes", |f, n, ctx| f.available_scopes = load_scope_map(n, ctx))
});

static OAUTH_FLOW_V3_FIELDS: Lazy<FixedFieldMap<OAuthFlow>> = Lazy::new(|| {
    oauth_flow_fields().field("availableScopes", |f, n, ctx| {
        f.available_scopes = load_scope_map(n, ctx)
    })
});

static OAUTH_FLOW_PATTERNS: Lazy<PatternFieldMap<OAuthFlow>> = Lazy::new(extension_patterns);

fn load_oauth_flow(
    node: &ParseNode,
    fields: &FixedFieldMap<OAuthFlow>,
    ctx: &mut ParsingContext<'_>,
) -> Option<OAuthFlow> {
    node.expect_map("OAuth flow", ctx)
        .map(|map| load_object(map, fields, &OAUTH_FLOW_PATTERNS, ctx))
}

fn load_scope_map(
    node: &ParseNode,
    ctx: &mut ParsingContext<'_>,
) -> indexmap::IndexMap<String, String> {
    node.create_map("scopes", ctx, |n, ctx| n.scalar(ctx).unwrap_or_default())
}

// =============================================================================
// JSON schema
// =============================================================================

fn set_number(
    slot: &mut Option<serde_json::Number>,
    node: &ParseNode,
    ctx: &mut ParsingContext<'_>,
) {
    *slot = node.scalar_number(ctx);
}

fn schema_list(
    node: &ParseNode,
    what: &str,
    ctx: &mut ParsingContext<'_>,
) -> Vec<ModelRef<JsonSchema>> {
    node.create_list(what, ctx, load_json_schema)
}

// draft-04 documents use booleans for the exclusive bounds; keep those verbatim
fn exclusive_bound(
    slot: &mut Option<serde_json::Number>,
    schema_keywords: &mut indexmap::IndexMap<String, AsyncApiAny>,
    key: &str,
    node: &ParseNode,
    ctx: &mut ParsingContext<'_>,
) {
    match node.as_scalar().map(|s| s.value()) {
        Some(AsyncApiAny::Bool(_)) => {
            schema_keywords.insert(key.to_string(), node.to_value());
        }
        _ => set_number(slot, node, ctx),
    }
}

static SCHEMA_FIELDS: Lazy<FixedFieldMap<JsonSchema>> = Lazy::new(|| {
    FixedFieldMap::<JsonSchema>::new()
        .field("title", |s, n, ctx| s.title = n.scalar(ctx))
        .field("description", |s, n, ctx| s.description = n.scalar(ctx))
        .field("type", |s, n, ctx| {
            s.schema_type = match n {
                ParseNode::List(_) => n.create_simple_list("type", ctx),
                _ => n.scalar(ctx).into_iter().collect(),
            }
        })
        .field("format", |s, n, ctx| s.format = n.scalar(ctx))
        .field("enum", |s, n, ctx| s.enum_values = load_any_list(n, "enum", ctx))
        .field("const", |s, n, _| s.const_value = Some(n.to_value()))
        .field("default", |s, n, _| s.default = Some(n.to_value()))
        .field("examples", |s, n, ctx| s.examples = load_any_list(n, "examples", ctx))
        .field("multipleOf", |s, n, ctx| set_number(&mut s.multiple_of, n, ctx))
        .field("maximum", |s, n, ctx| set_number(&mut s.maximum, n, ctx))
        .field("exclusiveMaximum", |s, n, ctx| {
            exclusive_bound(&mut s.exclusive_maximum, &mut s.keywords, "exclusiveMaximum", n, ctx)
        })
        .field("minimum", |s, n, ctx| set_number(&mut s.minimum, n, ctx))
        .field("exclusiveMinimum", |s, n, ctx| {
            exclusive_bound(&mut s.exclusive_minimum, &mut s.keywords, "exclusiveMinimum", n, ctx)
        })
        .field("maxLength", |s, n, ctx| s.max_length = n.scalar_u64(ctx))
        .field("minLength", |s, n, ctx| s.min_length = n.scalar_u64(ctx))
        .field("pattern", |s, n, ctx| s.pattern = n.scalar(ctx))
        .field("maxItems", |s, n, ctx| s.max_items = n.scalar_u64(ctx))
        .field("minItems", |s, n, ctx| s.min_items = n.scalar_u64(ctx))
        .field("uniqueItems", |s, n, ctx| s.unique_items = n.scalar_bool(ctx))
        .field("maxProperties", |s, n, ctx| s.max_properties = n.scalar_u64(ctx))
        .field("minProperties", |s, n, ctx| s.min_properties = n.scalar_u64(ctx))
        .field("required", |s, n, ctx| s.required = n.create_simple_list("required", ctx))
        .field("properties", |s, n, ctx| {
            s.properties = n.create_map("properties", ctx, load_json_schema)
        })
        .field("patternProperties", |s, n, ctx| {
            s.pattern_properties = n.create_map("patternProperties", ctx, load_json_schema)
        })
        .field("additionalProperties", |s, n, ctx| {
            s.additional_properties = match n {
                ParseNode::Scalar(_) => n.scalar_bool(ctx).map(AdditionalProperties::Allowed),
                _ => Some(AdditionalProperties::Schema(load_json_schema(n, ctx))),
            }
        })
        .field("items", |s, n, ctx| {
            s.items = Some(match n {
                ParseNode::List(_) => SchemaItems::Tuple(schema_list(n, "items", ctx)),
                _ => SchemaItems::Single(load_json_schema(n, ctx)),
            })
        })
        .field("allOf", |s, n, ctx| s.all_of = schema_list(n, "allOf", ctx))
        .field("anyOf", |s, n, ctx| s.any_of = schema_list(n, "anyOf", ctx))
        .field("oneOf", |s, n, ctx| s.one_of = schema_list(n, "oneOf", ctx))
        .field("not", |s, n, ctx| s.not = Some(load_json_schema(n, ctx)))
        .field("discriminator", |s, n, ctx| s.discriminator = n.scalar(ctx))
        .field("readOnly", |s, n, ctx| s.read_only = n.scalar_bool(ctx))
        .field("writeOnly", |s, n, ctx| s.write_only = n.scalar_bool(ctx))
        .field("deprecated", |s, n, ctx| s.deprecated = n.scalar_bool(ctx))
        .field("externalDocs", |s, n, ctx| {
            s.external_docs = Some(load_external_docs(n, ctx))
        })
});

static SCHEMA_PATTERNS: Lazy<PatternFieldMap<JsonSchema>> = Lazy::new(|| {
    extension_patterns::<JsonSchema>().pattern(
        |_| true,
        |s, key, n, _| {
            s.keywords.insert(key.to_string(), n.to_value());
        },
    )
});

/// JSON schema, `$ref`, or a boolean schema
pub(crate) fn load_json_schema(
    node: &ParseNode,
    ctx: &mut ParsingContext<'_>,
) -> ModelRef<JsonSchema> {
    if let ParseNode::Scalar(_) = node {
        return match node.scalar_bool(ctx) {
            Some(false) => ModelRef::inline(JsonSchema {
                not: Some(ModelRef::inline(JsonSchema::default())),
                ..Default::default()
            }),
            _ => ModelRef::inline(JsonSchema::default()),
        };
    }
    load_ref(node, "schema", ctx, |map, ctx| {
        load_object(map, &SCHEMA_FIELDS, &SCHEMA_PATTERNS, ctx)
    })
}

/// Schema read according to its `schemaFormat`
pub(crate) fn load_schema_for_format(
    node: &ParseNode,
    format: &str,
    ctx: &mut ParsingContext<'_>,
) -> Schema {
    if is_json_schema_format(format) {
        return Schema::Json(load_json_schema(node, ctx));
    }
    if !is_known_schema_format(format) {
        ctx.warning(
            DiagnosticCode::UnsupportedSchemaFormat,
            format!(
                "schema format '{}' is not a registered format; keeping the raw schema",
                format
            ),
        );
    }
    match node.as_map().and_then(MapNode::reference_pointer) {
        Some(pointer) => Schema::Other(ModelRef::pointer(pointer)),
        None => Schema::Other(ModelRef::inline(OtherSchema {
            value: node.to_value(),
        })),
    }
}

// =============================================================================
// Bindings
// =============================================================================

/// Bindings map; each protocol goes through the catalog loader for `category`
pub(crate) fn load_bindings(
    node: &ParseNode,
    category: BindingCategory,
    ctx: &mut ParsingContext<'_>,
) -> ModelRef<Bindings> {
    let Some(map) = node.expect_map("bindings", ctx) else {
        return ModelRef::inline(Bindings::default());
    };
    if let Some(pointer) = map.reference_pointer() {
        return ModelRef::pointer(pointer);
    }

    let mut bindings = Bindings::default();
    for (protocol, value) in map.iter() {
        ctx.with_segment(protocol, |ctx| {
            if is_extension(protocol) {
                let extension = load_extension(protocol, value, ctx);
                bindings.extensions.insert(protocol.to_string(), extension);
                return;
            }
            let Some(loader) = ctx.settings().bindings.get(category, protocol) else {
                ctx.warning(
                    DiagnosticCode::UnknownBinding,
                    format!("binding `{}` not found", protocol),
                );
                return;
            };
            match loader(value) {
                Ok(binding) => {
                    bindings.entries.insert(protocol.to_string(), binding);
                }
                Err(err) => ctx.error(
                    DiagnosticCode::BindingFailed,
                    format!("binding `{}` could not be loaded: {:#}", protocol, err),
                ),
            }
        });
    }
    ModelRef::inline(bindings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{BindingCatalog, ReaderSettings};
    use crate::version::AsyncApiVersion;
    use serde_json::json;

    fn context(settings: &ReaderSettings) -> ParsingContext<'_> {
        ParsingContext::new(settings, AsyncApiVersion::V3)
    }

    #[test]
    fn test_schema_keeps_unknown_keywords() {
        let settings = ReaderSettings::default();
        let mut ctx = context(&settings);
        let node = ParseNode::from(json!({
            "type": ["string", "null"],
            "minimum": 0,
            "if": {"type": "string"},
            "x-internal": true
        }));
        let schema = load_json_schema(&node, &mut ctx).into_inline().unwrap();
        assert_eq!(schema.schema_type, vec!["string", "null"]);
        assert_eq!(schema.minimum, Some(serde_json::Number::from(0)));
        assert_eq!(schema.keywords["if"], json!({"type": "string"}));
        assert_eq!(schema.extensions["x-internal"], json!(true));
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn test_schema_ref_becomes_pointer() {
        let settings = ReaderSettings::default();
        let mut ctx = context(&settings);
        let node = ParseNode::from(json!({"$ref": "#/components/schemas/lightMeasuredPayload"}));
        let schema = load_json_schema(&node, &mut ctx);
        assert_eq!(
            schema.reference().map(|r| r.location().to_string()),
            Some("#/components/schemas/lightMeasuredPayload".to_string())
        );
    }

    #[test]
    fn test_unknown_binding_is_reported() {
        let settings = ReaderSettings::default();
        let mut ctx = context(&settings);
        let node = ParseNode::from(json!({"kafka": {"bindingVersion": "0.4.0"}, "pigeon": {}}));
        let bindings = ctx.with_segment("bindings", |ctx| {
            load_bindings(&node, BindingCategory::Message, ctx)
        });
        let bindings = bindings.into_inline().unwrap();
        assert!(bindings.get("kafka").is_some());
        assert!(bindings.get("pigeon").is_none());

        let diagnostic = ctx.diagnostics().iter().next().unwrap();
        assert_eq!(diagnostic.message, "binding `pigeon` not found");
        assert_eq!(diagnostic.pointer, "#/bindings/pigeon");
    }

    #[test]
    fn test_failing_binding_loader_is_reported() {
        let mut catalog = BindingCatalog::empty();
        catalog.register(
            BindingCategory::Server,
            "mqtt",
            std::sync::Arc::new(|_: &ParseNode| -> anyhow::Result<crate::model::Binding> {
                anyhow::bail!("clientId is required")
            }),
        );
        let settings = ReaderSettings::default().with_bindings(catalog);
        let mut ctx = context(&settings);
        let node = ParseNode::from(json!({"mqtt": {}}));
        load_bindings(&node, BindingCategory::Server, &mut ctx);

        let diagnostic = ctx.diagnostics().iter().next().unwrap();
        assert_eq!(diagnostic.code, DiagnosticCode::BindingFailed);
        assert!(diagnostic.message.contains("clientId is required"));
    }

    #[test]
    fn test_avro_payload_kept_raw() {
        let settings = ReaderSettings::default();
        let mut ctx = context(&settings);
        let node = ParseNode::from(json!({"type": "record", "name": "User", "fields": []}));
        let schema =
            load_schema_for_format(&node, "application/vnd.apache.avro;version=1.9.0", &mut ctx);
        match schema {
            Schema::Other(other) => {
                assert_eq!(other.borrow_inline().unwrap().value["name"], json!("User"))
            }
            Schema::Json(_) => panic!("avro schema must not be read as JSON schema"),
        }
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn test_missing_info_fields() {
        let settings = ReaderSettings::default();
        let mut ctx = context(&settings);
        let info = ctx.with_segment("info", |ctx| {
            load_info(&ParseNode::from(json!({"title": "Streetlights"})), ctx)
        });
        assert_eq!(info.title, "Streetlights");
        let diagnostic = ctx.diagnostics().iter().next().unwrap();
        assert_eq!(diagnostic.code, DiagnosticCode::MissingField);
        assert_eq!(diagnostic.pointer, "#/info");
    }

    #[test]
    fn test_oauth_flows_by_version() {
        let settings = ReaderSettings::default();
        let mut ctx = context(&settings);
        let v2 = ParseNode::from(json!({
            "type": "oauth2",
            "flows": {
                "clientCredentials": {
                    "tokenUrl": "https://auth.example.com/token",
                    "scopes": {"lights:write": "Switch lights"}
                },
                "x-issuer": "auth"
            }
        }));
        let scheme = load_security_scheme_v2(&v2, &mut ctx).into_inline().unwrap();
        let flows = scheme.flows.unwrap();
        let credentials = flows.client_credentials.unwrap();
        assert_eq!(credentials.token_url.as_deref(), Some("https://auth.example.com/token"));
        assert_eq!(credentials.available_scopes["lights:write"], "Switch lights");
        assert!(flows.implicit.is_none());
        assert_eq!(flows.extensions["x-issuer"], json!("auth"));

        let v3 = ParseNode::from(json!({
            "type": "oauth2",
            "flows": {
                "implicit": {
                    "authorizationUrl": "https://auth.example.com/authorize",
                    "availableScopes": {"lights:read": "Read lights"}
                }
            },
            "scopes": ["lights:read"]
        }));
        let scheme = load_security_scheme_v3(&v3, &mut ctx).into_inline().unwrap();
        let implicit = scheme.flows.unwrap().implicit.unwrap();
        assert_eq!(implicit.available_scopes["lights:read"], "Read lights");
        assert_eq!(
            scheme.scopes.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["lights:read"]
        );
        assert!(ctx.diagnostics().is_empty());
    }
}
