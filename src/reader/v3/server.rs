use once_cell::sync::Lazy;

use crate::context::ParsingContext;
use crate::dispatch::{extension_patterns, require_fields, FixedFieldMap, NodeExt, PatternFieldMap};
use crate::model::{ModelRef, SecurityScheme, Server};
use crate::node::ParseNode;
use crate::reader::common::{
    load_bindings, load_external_docs, load_object, load_ref, load_security_scheme_v3,
    load_server_variable, load_tags,
};
use crate::settings::BindingCategory;

static SERVER_FIELDS: Lazy<FixedFieldMap<Server>> = Lazy::new(|| {
    FixedFieldMap::<Server>::new()
        .field("host", |s, n, ctx| s.host = n.scalar(ctx).unwrap_or_default())
        .field("protocol", |s, n, ctx| s.protocol = n.scalar(ctx).unwrap_or_default())
        .field("protocolVersion", |s, n, ctx| s.protocol_version = n.scalar(ctx))
        .field("pathname", |s, n, ctx| s.pathname = n.scalar(ctx))
        .field("description", |s, n, ctx| s.description = n.scalar(ctx))
        .field("title", |s, n, ctx| s.title = n.scalar(ctx))
        .field("summary", |s, n, ctx| s.summary = n.scalar(ctx))
        .field("variables", |s, n, ctx| {
            s.variables = n.create_map("variables", ctx, load_server_variable)
        })
        .field("security", |s, n, ctx| s.security = load_security(n, ctx))
        .field("tags", |s, n, ctx| s.tags = load_tags(n, ctx))
        .field("externalDocs", |s, n, ctx| {
            s.external_docs = Some(load_external_docs(n, ctx))
        })
        .field("bindings", |s, n, ctx| {
            s.bindings = Some(load_bindings(n, BindingCategory::Server, ctx))
        })
});

static SERVER_PATTERNS: Lazy<PatternFieldMap<Server>> = Lazy::new(extension_patterns);

pub(crate) fn load_server(node: &ParseNode, ctx: &mut ParsingContext<'_>) -> ModelRef<Server> {
    load_ref(node, "server", ctx, |map, ctx| {
        require_fields(map, &["host", "protocol"], "a server", ctx);
        load_object(map, &SERVER_FIELDS, &SERVER_PATTERNS, ctx)
    })
}

/// v3 `security`: a list of schemes, each inline or a `$ref`
pub(crate) fn load_security(
    node: &ParseNode,
    ctx: &mut ParsingContext<'_>,
) -> Vec<ModelRef<SecurityScheme>> {
    node.create_list("security", ctx, load_security_scheme_v3)
}
