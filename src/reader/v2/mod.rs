//! AsyncAPI 2.x loaders
//!
//! The v2 loaders read straight into the v3-shaped model. What cannot be
//! placed while walking (embedded operations, security requirement scopes)
//! is collected and finished by the reader once the document is complete:
//! - operations go through [`crate::reader::upgrade::Upgrader`]
//! - scopes go through [`apply_security_scopes`]

mod channel;
mod message;
mod operation;
mod server;

use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;

use crate::context::{temp_keys, ParsingContext, TempScope};
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::dispatch::{
    extension_patterns, require_fields, Extensible, FixedFieldMap, NodeExt, PatternFieldMap,
};
use crate::model::{
    Components, Document, Extensions, ExternalDocumentation, ModelRef, MultiFormatSchema, Tag,
};
use crate::node::ParseNode;
use crate::reader::common::{
    load_bindings, load_correlation_id, load_external_docs, load_info, load_json_schema,
    load_object, load_security_scheme_v2, load_server_variable, load_tags,
};
use crate::reader::upgrade::PendingUpgrade;
use crate::settings::BindingCategory;
use crate::workspace::Workspace;

pub(crate) use channel::{load_channel, load_parameter};
pub(crate) use message::{load_message, load_message_trait};
pub(crate) use operation::{load_operation, load_operation_trait};
pub(crate) use server::load_server;

pub(crate) use crate::reader::common::load_security_scheme_v2 as load_security_scheme;

#[derive(Debug, Default)]
struct V2Document {
    document: Document,
    pending: PendingUpgrade,
    root_tags: Vec<ModelRef<Tag>>,
    root_external_docs: Option<ModelRef<ExternalDocumentation>>,
}

impl Extensible for V2Document {
    fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.document.extensions
    }
}

static DOCUMENT_FIELDS: Lazy<FixedFieldMap<V2Document>> = Lazy::new(|| {
    FixedFieldMap::<V2Document>::new()
        .field("asyncapi", |_, _, _| {})
        .field("id", |d, n, ctx| d.document.id = n.scalar(ctx))
        .field("info", |d, n, ctx| d.document.info = load_info(n, ctx))
        .field("servers", |d, n, ctx| {
            d.document.servers = n.create_map("servers", ctx, load_server)
        })
        .field("defaultContentType", |d, n, ctx| {
            d.document.default_content_type = n.scalar(ctx)
        })
        .field("channels", load_channels)
        .field("components", |d, n, ctx| d.document.components = load_components(n, ctx))
        .field("tags", |d, n, ctx| d.root_tags = load_tags(n, ctx))
        .field("externalDocs", |d, n, ctx| {
            d.root_external_docs = Some(load_external_docs(n, ctx))
        })
});

static DOCUMENT_PATTERNS: Lazy<PatternFieldMap<V2Document>> = Lazy::new(extension_patterns);

/// Read a v2 root into the unified model plus the operations still to lift
pub(crate) fn load_document(
    root: &ParseNode,
    ctx: &mut ParsingContext<'_>,
) -> (Document, PendingUpgrade) {
    let Some(map) = root.expect_map("document", ctx) else {
        return (Document::default(), PendingUpgrade::default());
    };
    require_fields(map, &["info", "channels"], "an AsyncAPI 2.x document", ctx);

    let parsed = load_object(map, &DOCUMENT_FIELDS, &DOCUMENT_PATTERNS, ctx);
    let mut document = parsed.document;
    // v2 keeps tags and externalDocs at the root; v3 moved them under info
    document.info.tags.extend(parsed.root_tags);
    if document.info.external_docs.is_none() {
        document.info.external_docs = parsed.root_external_docs;
    }
    (document, parsed.pending)
}

/// Channels keyed by normalized address, collecting `publish` / `subscribe`
fn load_channels(target: &mut V2Document, node: &ParseNode, ctx: &mut ParsingContext<'_>) {
    let Some(map) = node.expect_map("channels", ctx) else {
        return;
    };
    for (address, channel_node) in map.iter() {
        ctx.with_segment(address, |ctx| {
            let key = unique_channel_key(&target.document.channels, address, ctx);
            let channel = load_channel(channel_node, ctx);
            if let Some(inline) = channel.as_inline() {
                inline.borrow_mut().address = Some(address.to_string());
            }
            let channel_map = channel_node
                .as_map()
                .filter(|m| m.reference_pointer().is_none());
            if let Some(channel_map) = channel_map {
                let operations = channel::load_channel_operations(channel_map, &key, ctx);
                target.pending.operations.extend(operations);
            }
            target.document.channels.insert(key, channel);
        });
    }
}

fn unique_channel_key(
    channels: &IndexMap<String, ModelRef<crate::model::Channel>>,
    address: &str,
    ctx: &mut ParsingContext<'_>,
) -> String {
    let base = channel::normalize_channel_key(address);
    if !channels.contains_key(&base) {
        return base;
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{}-{}", base, suffix);
        if !channels.contains_key(&candidate) {
            ctx.warning(
                DiagnosticCode::DuplicateKey,
                format!(
                    "channel `{}` normalizes to an existing key; stored as `{}`",
                    address, candidate
                ),
            );
            return candidate;
        }
        suffix += 1;
    }
}

static COMPONENTS_FIELDS: Lazy<FixedFieldMap<Components>> = Lazy::new(|| {
    FixedFieldMap::<Components>::new()
        .field("schemas", |c, n, ctx| {
            c.schemas = n.create_map("schemas", ctx, |n, ctx| {
                MultiFormatSchema::json(load_json_schema(n, ctx))
            })
        })
        .field("servers", |c, n, ctx| c.servers = n.create_map("servers", ctx, load_server))
        .field("channels", |c, n, ctx| c.channels = n.create_map("channels", ctx, load_channel))
        .field("messages", |c, n, ctx| c.messages = n.create_map("messages", ctx, load_message))
        .field("securitySchemes", |c, n, ctx| {
            c.security_schemes = n.create_map("securitySchemes", ctx, load_security_scheme_v2)
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

/// Copy the scopes named by v2 security requirements onto their schemes
///
/// Every requirement naming a scheme missing from `components.securitySchemes`
/// is reported; processing continues. Side-storage entries are removed.
pub(crate) fn apply_security_scopes(
    document: &Document,
    workspace: &Workspace,
    ctx: &mut ParsingContext<'_>,
) {
    for (name, scheme) in &document.components.security_schemes {
        let scope = TempScope::SecurityScheme(name.clone());
        let Some(scopes) = ctx
            .get_temp::<IndexSet<String>>(temp_keys::SECURITY_SCHEME_SCOPES, Some(&scope))
            .cloned()
        else {
            continue;
        };
        scheme.write(workspace, |s| s.scopes.extend(scopes));
    }

    let usages = ctx
        .get_temp::<Vec<(String, String)>>(temp_keys::SECURITY_SCHEME_USAGES, None)
        .cloned()
        .unwrap_or_default();
    for (name, location) in usages {
        if !document.components.security_schemes.contains_key(&name) {
            ctx.report(
                Diagnostic::error(
                    DiagnosticCode::UnknownSecurityScheme,
                    format!(
                        "security scheme `{}` is not defined in components.securitySchemes",
                        name
                    ),
                )
                .with_pointer(location),
            );
        }
    }

    for scope in ctx.temp().scopes(temp_keys::SECURITY_SCHEME_SCOPES) {
        ctx.set_temp::<IndexSet<String>>(temp_keys::SECURITY_SCHEME_SCOPES, None, Some(scope));
    }
    ctx.set_temp::<Vec<(String, String)>>(temp_keys::SECURITY_SCHEME_USAGES, None, None);
}
