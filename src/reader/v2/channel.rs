//! v2 channels and parameters

use once_cell::sync::Lazy;

use crate::context::ParsingContext;
use crate::diagnostics::DiagnosticCode;
use crate::dispatch::{extension_patterns, FixedFieldMap, NodeExt, PatternFieldMap};
use crate::location::escape_segment;
use crate::model::{Action, Channel, ModelRef, Parameter};
use crate::node::{MapNode, ParseNode};
use crate::reader::common::{load_bindings, load_object, load_ref, load_string_values};
use crate::reader::upgrade::PendingOperation;
use crate::settings::BindingCategory;

use super::operation::load_pending_operation;

static CHANNEL_FIELDS: Lazy<FixedFieldMap<Channel>> = Lazy::new(|| {
    FixedFieldMap::<Channel>::new()
        .field("description", |c, n, ctx| c.description = n.scalar(ctx))
        .field("servers", |c, n, ctx| {
            c.servers = n
                .create_simple_list("servers", ctx)
                .iter()
                .map(|name| ModelRef::pointer(format!("#/servers/{}", escape_segment(name))))
                .collect()
        })
        // lifted by `load_channel_operations`
        .field("publish", |_, _, _| {})
        .field("subscribe", |_, _, _| {})
        .field("parameters", |c, n, ctx| {
            c.parameters = n.create_map("parameters", ctx, load_parameter)
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

/// `publish` then `subscribe` of one inline channel
pub(crate) fn load_channel_operations(
    map: &MapNode,
    channel_key: &str,
    ctx: &mut ParsingContext<'_>,
) -> Vec<PendingOperation> {
    let mut operations = Vec::new();
    for (field, action) in [("publish", Action::Send), ("subscribe", Action::Receive)] {
        let Some(node) = map.get(field) else {
            continue;
        };
        let pending = ctx.with_segment(field, |ctx| {
            load_pending_operation(node, channel_key, action, ctx)
        });
        operations.extend(pending);
    }
    operations
}

/// Channel key derived from a v2 address: its letters and digits
pub(crate) fn normalize_channel_key(address: &str) -> String {
    let key: String = address.chars().filter(|c| c.is_alphanumeric()).collect();
    if key.is_empty() {
        "channel".to_string()
    } else {
        key
    }
}

static PARAMETER_FIELDS: Lazy<FixedFieldMap<Parameter>> = Lazy::new(|| {
    FixedFieldMap::<Parameter>::new()
        .field("description", |p, n, ctx| p.description = n.scalar(ctx))
        .field("location", |p, n, ctx| p.location = n.scalar(ctx))
        .field("schema", flatten_parameter_schema)
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

/// v3 parameters have no schema; `enum`, `default` and `examples` move up
fn flatten_parameter_schema(
    parameter: &mut Parameter,
    node: &ParseNode,
    ctx: &mut ParsingContext<'_>,
) {
    let Some(map) = node.expect_map("schema", ctx) else {
        return;
    };
    if map.reference_pointer().is_some() {
        ctx.warning(
            DiagnosticCode::InvalidValue,
            "parameter schema references are not followed; enum, default and examples are dropped",
        );
        return;
    }
    if let Some(values) = map.get("enum") {
        parameter.enum_values =
            ctx.with_segment("enum", |ctx| load_string_values(values, "enum", ctx));
    }
    if let Some(default) = map.get("default") {
        parameter.default = ctx.with_segment("default", |ctx| default.scalar(ctx));
    }
    if let Some(examples) = map.get("examples") {
        parameter.examples = ctx.with_segment("examples", |ctx| {
            load_string_values(examples, "examples", ctx)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ReaderSettings;
    use crate::version::AsyncApiVersion;
    use serde_json::json;

    #[test]
    fn test_normalize_channel_key() {
        assert_eq!(
            normalize_channel_key(
                "smartylighting/streetlights/1/0/event/{streetlightId}/lighting/measured"
            ),
            "smartylightingstreetlights10eventstreetlightIdlightingmeasured"
        );
        assert_eq!(normalize_channel_key("/"), "channel");
    }

    #[test]
    fn test_normalize_channel_key_keeps_non_ascii_letters() {
        assert_eq!(normalize_channel_key("café/münchen/{straße}"), "cafémünchenstraße");
        assert_eq!(normalize_channel_key("東京/1"), "東京1");
    }

    #[test]
    fn test_parameter_schema_is_flattened() {
        let settings = ReaderSettings::default();
        let mut ctx = ParsingContext::new(&settings, AsyncApiVersion::V2);
        let node = ParseNode::from(json!({
            "description": "The ID of the streetlight.",
            "schema": {"type": "integer", "enum": [1, 2], "default": 1, "examples": [2]}
        }));

        let parameter = load_parameter(&node, &mut ctx).into_inline().unwrap();

        assert_eq!(parameter.enum_values, vec!["1", "2"]);
        assert_eq!(parameter.default.as_deref(), Some("1"));
        assert_eq!(parameter.examples, vec!["2"]);
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn test_operations_lifted_in_fixed_order() {
        let settings = ReaderSettings::default();
        let mut ctx = ParsingContext::new(&settings, AsyncApiVersion::V2);
        let node = ParseNode::from(json!({
            "subscribe": {"operationId": "turnOff"},
            "publish": {"operationId": "turnOn"}
        }));

        let operations = load_channel_operations(node.as_map().unwrap(), "lights", &mut ctx);

        let ids: Vec<_> = operations.iter().map(|o| o.operation_id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["turnOn", "turnOff"]);
        assert_eq!(operations[0].action, Action::Send);
        assert_eq!(operations[1].action, Action::Receive);
        assert_eq!(operations[1].location, "#/subscribe");
    }
}
