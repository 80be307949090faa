//! v2 `publish` / `subscribe` operations, operation traits and security requirements

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexSet;
use once_cell::sync::Lazy;

use crate::context::{temp_keys, ParsingContext, TempScope};
use crate::dispatch::{extension_patterns, Extensible, FixedFieldMap, NodeExt, PatternFieldMap};
use crate::location::escape_segment;
use crate::model::{Action, Extensions, ModelRef, Operation, OperationTrait, SecurityScheme};
use crate::node::ParseNode;
use crate::reader::common::{load_bindings, load_external_docs, load_object, load_ref, load_tags};
use crate::reader::upgrade::{PendingMessage, PendingOperation};
use crate::settings::BindingCategory;

use super::message::load_message;

/// Operation as it appears inside a v2 channel
#[derive(Debug, Default)]
struct EmbeddedOperation {
    operation: Operation,
    operation_id: Option<String>,
    messages: Vec<PendingMessage>,
}

impl Extensible for EmbeddedOperation {
    fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.operation.extensions
    }
}

static OPERATION_FIELDS: Lazy<FixedFieldMap<EmbeddedOperation>> = Lazy::new(|| {
    FixedFieldMap::<EmbeddedOperation>::new()
        .field("operationId", |o, n, ctx| o.operation_id = n.scalar(ctx))
        .field("summary", |o, n, ctx| o.operation.summary = n.scalar(ctx))
        .field("description", |o, n, ctx| o.operation.description = n.scalar(ctx))
        .field("security", |o, n, ctx| {
            o.operation.security = load_security_requirements(n, ctx)
        })
        .field("tags", |o, n, ctx| o.operation.tags = load_tags(n, ctx))
        .field("externalDocs", |o, n, ctx| {
            o.operation.external_docs = Some(load_external_docs(n, ctx))
        })
        .field("bindings", |o, n, ctx| {
            o.operation.bindings = Some(load_bindings(n, BindingCategory::Operation, ctx))
        })
        .field("traits", |o, n, ctx| {
            o.operation.traits = n.create_list("traits", ctx, load_operation_trait)
        })
        .field("message", |o, n, ctx| o.messages = load_operation_messages(n, ctx))
});

static OPERATION_PATTERNS: Lazy<PatternFieldMap<EmbeddedOperation>> = Lazy::new(extension_patterns);

/// Read the operation under `publish` / `subscribe` of channel `channel_key`
///
/// Returns `None` (with a diagnostic) when the node is not a map.
pub(crate) fn load_pending_operation(
    node: &ParseNode,
    channel_key: &str,
    action: Action,
    ctx: &mut ParsingContext<'_>,
) -> Option<PendingOperation> {
    let map = node.expect_map("operation", ctx)?;
    let location = ctx.location();
    let embedded = load_object(map, &OPERATION_FIELDS, &OPERATION_PATTERNS, ctx);
    Some(PendingOperation {
        channel_key: channel_key.to_string(),
        action,
        operation_id: embedded.operation_id,
        operation: Rc::new(RefCell::new(embedded.operation)),
        messages: embedded.messages,
        location,
    })
}

/// Stand-alone v2 operation, messages kept as written
pub(crate) fn load_operation(
    node: &ParseNode,
    ctx: &mut ParsingContext<'_>,
) -> ModelRef<Operation> {
    load_ref(node, "operation", ctx, |map, ctx| {
        let embedded = load_object(map, &OPERATION_FIELDS, &OPERATION_PATTERNS, ctx);
        let mut operation = embedded.operation;
        operation.messages = embedded.messages.into_iter().map(|m| m.message).collect();
        operation
    })
}

/// `message` is either one message or `{oneOf: [...]}`
fn load_operation_messages(node: &ParseNode, ctx: &mut ParsingContext<'_>) -> Vec<PendingMessage> {
    match node.as_map().and_then(|map| map.get("oneOf")) {
        Some(one_of) => ctx.with_segment("oneOf", |ctx| {
            one_of.create_list("oneOf", ctx, load_pending_message)
        }),
        None => vec![load_pending_message(node, ctx)],
    }
}

fn load_pending_message(node: &ParseNode, ctx: &mut ParsingContext<'_>) -> PendingMessage {
    let message_id = node
        .as_map()
        .filter(|map| map.reference_pointer().is_none())
        .and_then(|map| map.scalar("messageId"))
        .map(str::to_string);
    PendingMessage {
        message_id,
        message: load_message(node, ctx),
    }
}

static OPERATION_TRAIT_FIELDS: Lazy<FixedFieldMap<OperationTrait>> = Lazy::new(|| {
    FixedFieldMap::<OperationTrait>::new()
        .field("operationId", |_, _, _| {})
        .field("summary", |t, n, ctx| t.summary = n.scalar(ctx))
        .field("description", |t, n, ctx| t.description = n.scalar(ctx))
        .field("security", |t, n, ctx| t.security = load_security_requirements(n, ctx))
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

// =============================================================================
// Security requirements
// =============================================================================

/// `[{schemeName: [scopes]}]` as references to `#/components/securitySchemes/<name>`
///
/// The alternatives of the list and the members of each requirement are
/// flattened into one list. Scopes and usages go to side-storage; the scopes
/// are copied onto the schemes once the whole document is read.
pub(crate) fn load_security_requirements(
    node: &ParseNode,
    ctx: &mut ParsingContext<'_>,
) -> Vec<ModelRef<SecurityScheme>> {
    let mut schemes = Vec::new();
    let Some(list) = node.expect_list("security", ctx) else {
        return schemes;
    };
    for (index, requirement) in list.iter().enumerate() {
        ctx.with_segment(index.to_string(), |ctx| {
            let Some(map) = requirement.expect_map("security requirement", ctx) else {
                return;
            };
            for (name, scope_node) in map.iter() {
                ctx.with_segment(name, |ctx| {
                    let scopes = if scope_node.is_null() {
                        Vec::new()
                    } else {
                        scope_node.create_simple_list("scopes", ctx)
                    };
                    record_requirement(name, scopes, ctx);
                    schemes.push(ModelRef::pointer(format!(
                        "#/components/securitySchemes/{}",
                        escape_segment(name)
                    )));
                });
            }
        });
    }
    schemes
}

fn record_requirement(name: &str, scopes: Vec<String>, ctx: &mut ParsingContext<'_>) {
    let location = ctx.location();
    ctx.temp_mut()
        .entry::<Vec<(String, String)>>(temp_keys::SECURITY_SCHEME_USAGES, None)
        .push((name.to_string(), location));
    ctx.temp_mut()
        .entry::<IndexSet<String>>(
            temp_keys::SECURITY_SCHEME_SCOPES,
            Some(TempScope::SecurityScheme(name.to_string())),
        )
        .extend(scopes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ReaderSettings;
    use crate::version::AsyncApiVersion;
    use serde_json::json;

    #[test]
    fn test_one_of_messages_are_collected() {
        let settings = ReaderSettings::default();
        let mut ctx = ParsingContext::new(&settings, AsyncApiVersion::V2);
        let node = ParseNode::from(json!({
            "operationId": "onLightMeasured",
            "message": {"oneOf": [
                {"$ref": "#/components/messages/lightMeasured"},
                {"messageId": "dimLight", "payload": {"type": "object"}}
            ]}
        }));

        let pending =
            load_pending_operation(&node, "lightmeasured", Action::Send, &mut ctx).unwrap();

        assert_eq!(pending.operation_id.as_deref(), Some("onLightMeasured"));
        assert_eq!(pending.messages.len(), 2);
        assert!(pending.messages[0].message.is_reference());
        assert_eq!(pending.messages[1].message_id.as_deref(), Some("dimLight"));
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn test_malformed_operation_is_skipped() {
        let settings = ReaderSettings::default();
        let mut ctx = ParsingContext::new(&settings, AsyncApiVersion::V2);
        let pending = ctx.with_segment("publish", |ctx| {
            load_pending_operation(&ParseNode::from(json!("oops")), "c", Action::Send, ctx)
        });
        assert!(pending.is_none());
        assert_eq!(ctx.diagnostics().iter().next().unwrap().pointer, "#/publish");
    }

    #[test]
    fn test_security_requirements_stash_scopes() {
        let settings = ReaderSettings::default();
        let mut ctx = ParsingContext::new(&settings, AsyncApiVersion::V2);
        let node = ParseNode::from(json!([
            {"oauth": ["streetlights:read"]},
            {"oauth": ["streetlights:write", "streetlights:read"], "apiKey": []}
        ]));

        let schemes = load_security_requirements(&node, &mut ctx);

        assert_eq!(schemes.len(), 3);
        assert_eq!(
            schemes[2].reference().unwrap().location(),
            "#/components/securitySchemes/apiKey"
        );
        let scope = TempScope::SecurityScheme("oauth".into());
        let scopes = ctx
            .get_temp::<IndexSet<String>>(temp_keys::SECURITY_SCHEME_SCOPES, Some(&scope))
            .unwrap();
        assert_eq!(
            scopes.iter().collect::<Vec<_>>(),
            vec!["streetlights:read", "streetlights:write"]
        );
        let usages = ctx
            .get_temp::<Vec<(String, String)>>(temp_keys::SECURITY_SCHEME_USAGES, None)
            .unwrap();
        assert_eq!(usages[2], ("apiKey".to_string(), "#/1/apiKey".to_string()));
    }
}
