//! v2 servers
//!
//! v2 servers carry one `url`; it is split into `host` and `pathname`.

use once_cell::sync::Lazy;

use crate::context::ParsingContext;
use crate::dispatch::{extension_patterns, require_fields, FixedFieldMap, NodeExt, PatternFieldMap};
use crate::model::{ModelRef, Server};
use crate::node::ParseNode;
use crate::reader::common::{load_bindings, load_object, load_ref, load_server_variable, load_tags};
use crate::settings::BindingCategory;

use super::operation::load_security_requirements;

static SERVER_FIELDS: Lazy<FixedFieldMap<Server>> = Lazy::new(|| {
    FixedFieldMap::<Server>::new()
        .field("url", |s, n, ctx| {
            let (host, pathname) = split_url(&n.scalar(ctx).unwrap_or_default());
            s.host = host;
            s.pathname = pathname;
        })
        .field("protocol", |s, n, ctx| s.protocol = n.scalar(ctx).unwrap_or_default())
        .field("protocolVersion", |s, n, ctx| s.protocol_version = n.scalar(ctx))
        .field("description", |s, n, ctx| s.description = n.scalar(ctx))
        .field("variables", |s, n, ctx| {
            s.variables = n.create_map("variables", ctx, load_server_variable)
        })
        .field("security", |s, n, ctx| s.security = load_security_requirements(n, ctx))
        .field("tags", |s, n, ctx| s.tags = load_tags(n, ctx))
        .field("bindings", |s, n, ctx| {
            s.bindings = Some(load_bindings(n, BindingCategory::Server, ctx))
        })
});

static SERVER_PATTERNS: Lazy<PatternFieldMap<Server>> = Lazy::new(extension_patterns);

pub(crate) fn load_server(node: &ParseNode, ctx: &mut ParsingContext<'_>) -> ModelRef<Server> {
    load_ref(node, "server", ctx, |map, ctx| {
        require_fields(map, &["url", "protocol"], "a server", ctx);
        load_object(map, &SERVER_FIELDS, &SERVER_PATTERNS, ctx)
    })
}

/// `scheme://host:port/path` into (`host:port`, `Some("/path")`)
///
/// A scheme prefix is dropped since the protocol is carried separately. A
/// bare `/` path is not kept.
pub(crate) fn split_url(url: &str) -> (String, Option<String>) {
    let rest = match url.find("://") {
        Some(index) => &url[index + 3..],
        None => url,
    };
    match rest.find('/') {
        Some(index) if index + 1 < rest.len() => {
            (rest[..index].to_string(), Some(rest[index..].to_string()))
        }
        Some(index) => (rest[..index].to_string(), None),
        None => (rest.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ReaderSettings;
    use crate::version::AsyncApiVersion;
    use serde_json::json;

    #[test]
    fn test_split_url() {
        assert_eq!(
            split_url("mqtt://api.streetlights.smartylighting.com:{port}/v1"),
            ("api.streetlights.smartylighting.com:{port}".to_string(), Some("/v1".to_string()))
        );
        assert_eq!(
            split_url("broker.example.com:9092"),
            ("broker.example.com:9092".to_string(), None)
        );
        assert_eq!(split_url("ws://example.com/"), ("example.com".to_string(), None));
    }

    #[test]
    fn test_server_url_round_trips_through_host_and_pathname() {
        let settings = ReaderSettings::default();
        let mut ctx = ParsingContext::new(&settings, AsyncApiVersion::V2);
        let node = ParseNode::from(json!({
            "url": "test.mosquitto.org:{port}/lights",
            "protocol": "mqtt",
            "variables": {"port": {"enum": ["1883", "8883"], "default": "1883"}}
        }));

        let server = load_server(&node, &mut ctx).into_inline().unwrap();

        assert_eq!(server.host, "test.mosquitto.org:{port}");
        assert_eq!(server.pathname.as_deref(), Some("/lights"));
        assert_eq!(server.url(), "test.mosquitto.org:{port}/lights");
        assert!(ctx.diagnostics().is_empty());
    }
}
