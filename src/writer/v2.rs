//! AsyncAPI 2.x wire shape
//!
//! 2.x nests operations inside channels, so the document writer rebuilds
//! `publish` (send) and `subscribe` (receive) from the operations pointing at
//! each channel. Constructs 2.x cannot carry go through
//! [`WriteContext::drop_construct`].

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Map, Value};
use tracing::warn;

use super::common::{
    write_bindings, write_correlation_id, write_oauth_flow, write_optional_bindings,
    write_optional_docs, write_tags,
};
use super::{
    ref_value, write_list, write_map, write_ref, ObjectBuilder, WriteContext, WriteV2, WriteV3,
};
use crate::location::{last_segment, pointer};
use crate::model::{
    Action, Channel, Components, Document, Info, Message, MessageTrait, ModelRef,
    MultiFormatSchema, OAuthFlow, OAuthFlows, Operation, OperationReply, OperationTrait, Parameter,
    Reference, ReferenceKind, Referenceable, Schema, SecurityScheme, Server,
};
use crate::version::AsyncApiVersion;

const SECURITY_SCHEMES: &str = "#/components/securitySchemes/";
const COMPONENT_MESSAGES: &str = "#/components/messages/";
const SERVERS: &str = "#/servers/";

impl WriteV2 for Document {
    fn write_v2(&self, ctx: &mut WriteContext<'_>) -> Value {
        let info = self.info.write_v2(ctx);
        let mut servers = Map::new();
        for (key, server) in &self.servers {
            let location = pointer(["servers", key.as_str()]);
            let written = write_ref(server, ctx, |s, ctx| write_server(s, &location, ctx));
            servers.insert(key.clone(), written);
        }
        let channels = write_channels(self, ctx);
        let components = self.components.write_v2(ctx);
        let tags = write_tags(&self.info.tags, ctx);
        let external_docs = write_optional_docs(&self.info.external_docs, ctx);

        let mut out = ObjectBuilder::new();
        out.value("asyncapi", Value::String(AsyncApiVersion::V2.wire_version().to_string()))
            .string("id", &self.id)
            .value("info", info)
            .object("servers", servers)
            .string("defaultContentType", &self.default_content_type)
            .value("channels", Value::Object(channels));
        if components.as_object().is_some_and(|c| !c.is_empty()) {
            out.value("components", components);
        }
        out.list("tags", tags)
            .optional("externalDocs", external_docs)
            .extensions(&self.extensions)
            .build()
    }
}

/// Channels keyed by address, with their operations nested back in
fn write_channels(document: &Document, ctx: &mut WriteContext<'_>) -> Map<String, Value> {
    let workspace = ctx.workspace();
    let mut out = Map::new();

    for (key, channel_ref) in &document.channels {
        let location = pointer(["channels", key.as_str()]);
        let Some(channel) = channel_ref.resolve(workspace) else {
            let target = channel_ref.reference().map(Reference::location).unwrap_or_default();
            out.insert(key.clone(), ref_value(target));
            continue;
        };
        let channel = channel.borrow();
        let address = channel.address.clone().unwrap_or_else(|| key.clone());

        let mut item = channel_item(&channel, &location, ctx);
        let mut has_operations = false;
        for (action, field) in [(Action::Send, "publish"), (Action::Receive, "subscribe")] {
            let operations = operations_on(document, channel_ref, action, ctx);
            for (ignored, _) in operations.iter().skip(1) {
                ctx.drop_construct(
                    format!("second {} operation on channel `{}`", field, key),
                    pointer(["operations", ignored.as_str()]),
                );
            }
            if let Some((operation_id, operation)) = operations.first() {
                has_operations = true;
                let operation_location = pointer(["operations", operation_id.as_str()]);
                let written = write_operation(
                    &operation.borrow(),
                    Some(operation_id.as_str()),
                    &operation_location,
                    ctx,
                );
                item.value(field, written);
            }
        }
        if !has_operations && !channel.messages.is_empty() {
            ctx.drop_construct(
                "channel messages without an operation",
                format!("{}/messages", location),
            );
        }

        if out.contains_key(&address) {
            ctx.drop_construct(format!("second channel with address `{}`", address), location);
            continue;
        }
        out.insert(address, item.build());
    }
    out
}

/// Operations with `action` whose channel is `channel`, in document order
fn operations_on(
    document: &Document,
    channel: &ModelRef<Channel>,
    action: Action,
    ctx: &WriteContext<'_>,
) -> Vec<(String, Rc<RefCell<Operation>>)> {
    let workspace = ctx.workspace();
    document
        .operations
        .iter()
        .filter_map(|(id, operation)| {
            let operation = operation.resolve(workspace)?;
            let matches = {
                let op = operation.borrow();
                op.action == action
                    && op
                        .channel
                        .as_ref()
                        .is_some_and(|c| c.same_target(channel, workspace))
            };
            matches.then(|| (id.clone(), operation))
        })
        .collect()
}

/// Channel members 2.x knows, without operations
fn channel_item(channel: &Channel, location: &str, ctx: &mut WriteContext<'_>) -> ObjectBuilder {
    for (construct, present) in [
        ("title", channel.title.is_some()),
        ("summary", channel.summary.is_some()),
        ("tags", !channel.tags.is_empty()),
        ("externalDocs", channel.external_docs.is_some()),
    ] {
        if present {
            ctx.drop_construct(
                format!("channel {}", construct),
                format!("{}/{}", location, construct),
            );
        }
    }
    let mut servers = Vec::new();
    for (index, server) in channel.servers.iter().enumerate() {
        let server_location = format!("{}/servers/{}", location, index);
        if let Some(name) = component_name(server, SERVERS, &server_location, ctx) {
            servers.push(Value::String(name));
        }
    }
    let parameters = write_map(&channel.parameters, ctx, |p, ctx| p.write_v2(ctx));
    let bindings = write_optional_bindings(&channel.bindings, ctx);

    let mut out = ObjectBuilder::new();
    out.string("description", &channel.description)
        .list("servers", servers)
        .object("parameters", parameters)
        .optional("bindings", bindings)
        .extensions(&channel.extensions);
    out
}

impl WriteV2 for Channel {
    fn write_v2(&self, ctx: &mut WriteContext<'_>) -> Value {
        let location = self
            .address
            .as_deref()
            .map(|a| pointer(["channels", a]))
            .unwrap_or_default();
        channel_item(self, &location, ctx).build()
    }
}

/// Key of a component under `prefix`, from the pointer or the registration
fn component_name<T: Referenceable>(
    reference: &ModelRef<T>,
    prefix: &str,
    location: &str,
    ctx: &mut WriteContext<'_>,
) -> Option<String> {
    let target = match reference {
        ModelRef::Pointer(pointer) => Some(pointer.reference().location().to_string()),
        ModelRef::Inline(value) => ctx.workspace().location_of(value),
    };
    match target {
        Some(target) if target.starts_with(prefix) => Some(last_segment(&target)),
        _ => {
            ctx.drop_construct(format!("{:?} without a name under {}", T::KIND, prefix), location);
            None
        }
    }
}

/// `{name: [scopes]}` per scheme
fn write_security_requirements(
    security: &[ModelRef<SecurityScheme>],
    location: &str,
    ctx: &mut WriteContext<'_>,
) -> Vec<Value> {
    let workspace = ctx.workspace();
    let mut requirements = Vec::new();
    for (index, scheme) in security.iter().enumerate() {
        let scheme_location = format!("{}/security/{}", location, index);
        let Some(name) = component_name(scheme, SECURITY_SCHEMES, &scheme_location, ctx) else {
            continue;
        };
        let scopes: Vec<Value> = scheme.read(workspace, |s| {
            s.scopes.iter().cloned().map(Value::String).collect()
        });
        let mut requirement = Map::new();
        requirement.insert(name, Value::Array(scopes));
        requirements.push(Value::Object(requirement));
    }
    requirements
}

/// A component message becomes a `$ref` to it unless the inline policy
/// expands it; anything else is written in place
fn write_operation_message(message: &ModelRef<Message>, ctx: &mut WriteContext<'_>) -> Value {
    let workspace = ctx.workspace();
    let Some(target) = message.resolve(workspace) else {
        let location = message.reference().map(Reference::location).unwrap_or_default();
        return ref_value(location);
    };
    let location = workspace
        .location_of(&target)
        .filter(|location| location.starts_with(COMPONENT_MESSAGES));
    if let Some(location) = location {
        let reference = Reference::new(location.as_str(), ReferenceKind::Message);
        if !ctx.settings().should_inline(&reference) {
            return ref_value(&location);
        }
    }
    // binding ends the borrow before `target` drops
    let written = target.borrow().write_v2(ctx);
    written
}

fn write_operation(
    operation: &Operation,
    operation_id: Option<&str>,
    location: &str,
    ctx: &mut WriteContext<'_>,
) -> Value {
    if operation.title.is_some() {
        ctx.drop_construct("operation title", format!("{}/title", location));
    }
    if operation.reply.is_some() {
        ctx.drop_construct("operation reply", format!("{}/reply", location));
    }
    let security = write_security_requirements(&operation.security, location, ctx);
    let tags = write_tags(&operation.tags, ctx);
    let external_docs = write_optional_docs(&operation.external_docs, ctx);
    let bindings = write_optional_bindings(&operation.bindings, ctx);
    let traits = write_list(&operation.traits, ctx, |t, ctx| t.write_v2(ctx));
    let mut messages: Vec<Value> = operation
        .messages
        .iter()
        .map(|message| write_operation_message(message, ctx))
        .collect();
    let message = match messages.len() {
        0 => None,
        1 => messages.pop(),
        _ => {
            let mut one_of = Map::new();
            one_of.insert("oneOf".to_string(), Value::Array(messages));
            Some(Value::Object(one_of))
        }
    };

    ObjectBuilder::new()
        .optional("operationId", operation_id.map(|id| Value::String(id.to_string())))
        .string("summary", &operation.summary)
        .string("description", &operation.description)
        .list("security", security)
        .list("tags", tags)
        .optional("externalDocs", external_docs)
        .optional("bindings", bindings)
        .list("traits", traits)
        .optional("message", message)
        .extensions(&operation.extensions)
        .build()
}

impl WriteV2 for Operation {
    fn write_v2(&self, ctx: &mut WriteContext<'_>) -> Value {
        write_operation(self, None, "#/operations", ctx)
    }
}

impl WriteV2 for OperationTrait {
    fn write_v2(&self, ctx: &mut WriteContext<'_>) -> Value {
        let location = "#/components/operationTraits";
        if self.title.is_some() {
            ctx.drop_construct("operation trait title", location);
        }
        let security = write_security_requirements(&self.security, location, ctx);
        let tags = write_tags(&self.tags, ctx);
        let external_docs = write_optional_docs(&self.external_docs, ctx);
        let bindings = write_optional_bindings(&self.bindings, ctx);
        ObjectBuilder::new()
            .string("summary", &self.summary)
            .string("description", &self.description)
            .list("security", security)
            .list("tags", tags)
            .optional("externalDocs", external_docs)
            .optional("bindings", bindings)
            .extensions(&self.extensions)
            .build()
    }
}

impl WriteV2 for OperationReply {
    /// Replies only exist in 3.x; a fragment gets the 3.x shape
    fn write_v2(&self, ctx: &mut WriteContext<'_>) -> Value {
        warn!("operation replies have no 2.x form; writing the 3.x shape");
        self.write_v3(ctx)
    }
}

impl WriteV2 for Info {
    /// `tags` and `externalDocs` go to the document root in 2.x
    fn write_v2(&self, ctx: &mut WriteContext<'_>) -> Value {
        let contact = self.contact.as_ref().map(|c| c.write_v2(ctx));
        let license = self.license.as_ref().map(|l| l.write_v2(ctx));
        ObjectBuilder::new()
            .value("title", Value::String(self.title.clone()))
            .value("version", Value::String(self.version.clone()))
            .string("description", &self.description)
            .string("termsOfService", &self.terms_of_service)
            .optional("contact", contact)
            .optional("license", license)
            .extensions(&self.extensions)
            .build()
    }
}

fn write_server(server: &Server, location: &str, ctx: &mut WriteContext<'_>) -> Value {
    for (construct, present) in [
        ("title", server.title.is_some()),
        ("summary", server.summary.is_some()),
        ("externalDocs", server.external_docs.is_some()),
    ] {
        if present {
            ctx.drop_construct(
                format!("server {}", construct),
                format!("{}/{}", location, construct),
            );
        }
    }
    let variables = write_map(&server.variables, ctx, |v, ctx| v.write_v2(ctx));
    let security = write_security_requirements(&server.security, location, ctx);
    let tags = write_tags(&server.tags, ctx);
    let bindings = write_optional_bindings(&server.bindings, ctx);
    ObjectBuilder::new()
        .value("url", Value::String(server.url()))
        .value("protocol", Value::String(server.protocol.clone()))
        .string("protocolVersion", &server.protocol_version)
        .string("description", &server.description)
        .object("variables", variables)
        .list("security", security)
        .list("tags", tags)
        .optional("bindings", bindings)
        .extensions(&server.extensions)
        .build()
}

impl WriteV2 for Server {
    fn write_v2(&self, ctx: &mut WriteContext<'_>) -> Value {
        write_server(self, "#/servers", ctx)
    }
}

impl WriteV2 for Parameter {
    /// `enum`, `default` and `examples` go back under a string `schema`
    fn write_v2(&self, _: &mut WriteContext<'_>) -> Value {
        let has_schema =
            !self.enum_values.is_empty() || self.default.is_some() || !self.examples.is_empty();
        let schema = has_schema.then(|| {
            ObjectBuilder::new()
                .value("type", Value::String("string".to_string()))
                .strings("enum", &self.enum_values)
                .string("default", &self.default)
                .strings("examples", &self.examples)
                .build()
        });
        ObjectBuilder::new()
            .string("description", &self.description)
            .optional("schema", schema)
            .string("location", &self.location)
            .extensions(&self.extensions)
            .build()
    }
}

/// Schema half only; a non-default format goes on the message as `schemaFormat`
impl WriteV2 for MultiFormatSchema {
    fn write_v2(&self, ctx: &mut WriteContext<'_>) -> Value {
        match &self.schema {
            Schema::Json(json) => json.write_v2(ctx),
            Schema::Other(other) => other.write_v2(ctx),
        }
    }
}

fn write_headers(headers: &Option<MultiFormatSchema>, ctx: &mut WriteContext<'_>) -> Option<Value> {
    let headers = headers.as_ref()?;
    if !matches!(headers.schema, Schema::Json(_)) {
        warn!(
            format = %headers.schema_format,
            "2.x headers must be JSON schemas; writing the raw schema"
        );
    }
    Some(headers.write_v2(ctx))
}

impl WriteV2 for Message {
    fn write_v2(&self, ctx: &mut WriteContext<'_>) -> Value {
        let headers = write_headers(&self.headers, ctx);
        let payload = self.payload.as_ref().map(|p| p.write_v2(ctx));
        let schema_format = self
            .payload
            .as_ref()
            .filter(|p| !p.is_default_format())
            .map(|p| Value::String(p.schema_format.clone()));
        let correlation_id = self
            .correlation_id
            .as_ref()
            .map(|c| write_ref(c, ctx, write_correlation_id));
        let tags = write_tags(&self.tags, ctx);
        let external_docs = write_optional_docs(&self.external_docs, ctx);
        let bindings = write_optional_bindings(&self.bindings, ctx);
        let examples = write_list(&self.examples, ctx, |e, ctx| e.write_v2(ctx));
        let traits = write_list(&self.traits, ctx, |t, ctx| t.write_v2(ctx));
        ObjectBuilder::new()
            .optional("headers", headers)
            .optional("payload", payload)
            .optional("schemaFormat", schema_format)
            .optional("correlationId", correlation_id)
            .string("contentType", &self.content_type)
            .string("name", &self.name)
            .string("title", &self.title)
            .string("summary", &self.summary)
            .string("description", &self.description)
            .list("tags", tags)
            .optional("externalDocs", external_docs)
            .optional("bindings", bindings)
            .list("examples", examples)
            .list("traits", traits)
            .extensions(&self.extensions)
            .build()
    }
}

impl WriteV2 for MessageTrait {
    fn write_v2(&self, ctx: &mut WriteContext<'_>) -> Value {
        let headers = write_headers(&self.headers, ctx);
        let correlation_id = self
            .correlation_id
            .as_ref()
            .map(|c| write_ref(c, ctx, write_correlation_id));
        let tags = write_tags(&self.tags, ctx);
        let external_docs = write_optional_docs(&self.external_docs, ctx);
        let bindings = write_optional_bindings(&self.bindings, ctx);
        let examples = write_list(&self.examples, ctx, |e, ctx| e.write_v2(ctx));
        ObjectBuilder::new()
            .optional("headers", headers)
            .optional("correlationId", correlation_id)
            .string("contentType", &self.content_type)
            .string("name", &self.name)
            .string("title", &self.title)
            .string("summary", &self.summary)
            .string("description", &self.description)
            .list("tags", tags)
            .optional("externalDocs", external_docs)
            .optional("bindings", bindings)
            .list("examples", examples)
            .extensions(&self.extensions)
            .build()
    }
}

impl WriteV2 for SecurityScheme {
    /// Scopes travel on the requirements in 2.x
    fn write_v2(&self, ctx: &mut WriteContext<'_>) -> Value {
        let flows = self.flows.as_ref().map(|f| f.write_v2(ctx));
        ObjectBuilder::new()
            .optional("type", self.scheme_type.map(|t| Value::String(t.as_str().to_string())))
            .string("description", &self.description)
            .string("name", &self.name)
            .optional("in", self.location.map(|l| Value::String(l.as_str().to_string())))
            .string("scheme", &self.scheme)
            .string("bearerFormat", &self.bearer_format)
            .optional("flows", flows)
            .string("openIdConnectUrl", &self.open_id_connect_url)
            .extensions(&self.extensions)
            .build()
    }
}

impl WriteV2 for OAuthFlows {
    fn write_v2(&self, _: &mut WriteContext<'_>) -> Value {
        let flow = |f: &Option<OAuthFlow>| f.as_ref().map(|f| write_oauth_flow(f, "scopes"));
        ObjectBuilder::new()
            .optional("implicit", flow(&self.implicit))
            .optional("password", flow(&self.password))
            .optional("clientCredentials", flow(&self.client_credentials))
            .optional("authorizationCode", flow(&self.authorization_code))
            .extensions(&self.extensions)
            .build()
    }
}

impl WriteV2 for Components {
    fn write_v2(&self, ctx: &mut WriteContext<'_>) -> Value {
        for (category, keys) in [
            ("operations", self.operations.keys().collect::<Vec<_>>()),
            ("replies", self.replies.keys().collect()),
            ("replyAddresses", self.reply_addresses.keys().collect()),
            ("externalDocs", self.external_docs.keys().collect()),
            ("tags", self.tags.keys().collect()),
        ] {
            for key in keys {
                ctx.drop_construct(
                    format!("{} component", category),
                    pointer(["components", category, key.as_str()]),
                );
            }
        }

        let mut out = ObjectBuilder::new();
        let schemas = write_map(&self.schemas, ctx, |s, ctx| s.write_v2(ctx));
        out.object("schemas", schemas);
        let servers = write_map(&self.servers, ctx, |s, ctx| s.write_v2(ctx));
        out.object("servers", servers);
        let channels = write_map(&self.channels, ctx, |c, ctx| c.write_v2(ctx));
        out.object("channels", channels);
        let messages = write_map(&self.messages, ctx, |m, ctx| m.write_v2(ctx));
        out.object("messages", messages);
        let security_schemes = write_map(&self.security_schemes, ctx, |s, ctx| s.write_v2(ctx));
        out.object("securitySchemes", security_schemes);
        let server_variables = write_map(&self.server_variables, ctx, |v, ctx| v.write_v2(ctx));
        out.object("serverVariables", server_variables);
        let parameters = write_map(&self.parameters, ctx, |p, ctx| p.write_v2(ctx));
        out.object("parameters", parameters);
        let correlation_ids = write_map(&self.correlation_ids, ctx, |c, ctx| c.write_v2(ctx));
        out.object("correlationIds", correlation_ids);
        let operation_traits = write_map(&self.operation_traits, ctx, |t, ctx| t.write_v2(ctx));
        out.object("operationTraits", operation_traits);
        let message_traits = write_map(&self.message_traits, ctx, |t, ctx| t.write_v2(ctx));
        out.object("messageTraits", message_traits);
        for (key, bindings) in [
            ("serverBindings", &self.server_bindings),
            ("channelBindings", &self.channel_bindings),
            ("operationBindings", &self.operation_bindings),
            ("messageBindings", &self.message_bindings),
        ] {
            let written = write_map(bindings, ctx, |b, ctx| write_ref(b, ctx, write_bindings));
            out.object(key, written);
        }
        out.extensions(&self.extensions).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WriteError;
    use crate::model::{JsonSchema, SecuritySchemeType};
    use crate::settings::WriterSettings;
    use crate::writer::{AsyncApiWriter, OutputFormat};
    use crate::workspace::Workspace;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn write<T: WriteV2>(value: &T, workspace: &Workspace) -> Value {
        let settings = WriterSettings::default();
        let mut ctx = WriteContext::new(&settings, workspace);
        value.write_v2(&mut ctx)
    }

    fn lights_document() -> Document {
        let mut channel = Channel {
            address: Some("smartylighting/{streetlightId}".into()),
            ..Default::default()
        };
        channel
            .messages
            .insert("turnOn".into(), ModelRef::pointer("#/components/messages/turnOn"));
        channel
            .messages
            .insert("dim".into(), ModelRef::pointer("#/components/messages/dim"));

        let mut document = Document::default();
        document.info.title = "Streetlights".into();
        document.info.version = "1.0.0".into();
        document.channels.insert("lights".into(), ModelRef::inline(channel));
        document.components.messages.insert(
            "turnOn".into(),
            ModelRef::inline(Message {
                payload: Some(MultiFormatSchema::json(ModelRef::inline(JsonSchema {
                    schema_type: vec!["object".into()],
                    ..Default::default()
                }))),
                ..Default::default()
            }),
        );
        document
            .components
            .messages
            .insert("dim".into(), ModelRef::inline(Message::default()));
        document.components.security_schemes.insert(
            "token".into(),
            ModelRef::inline(SecurityScheme {
                scheme_type: Some(SecuritySchemeType::Http),
                scheme: Some("bearer".into()),
                scopes: ["lights:write".to_string()].into_iter().collect(),
                ..Default::default()
            }),
        );
        document.operations.insert(
            "turnOn".into(),
            ModelRef::inline(Operation {
                action: Action::Send,
                channel: Some(ModelRef::pointer("#/channels/lights")),
                security: vec![ModelRef::pointer("#/components/securitySchemes/token")],
                messages: vec![ModelRef::pointer("#/channels/lights/messages/turnOn")],
                ..Default::default()
            }),
        );
        document.operations.insert(
            "lightEvents".into(),
            ModelRef::inline(Operation {
                action: Action::Receive,
                channel: Some(ModelRef::pointer("#/channels/lights")),
                messages: vec![
                    ModelRef::pointer("#/channels/lights/messages/turnOn"),
                    ModelRef::pointer("#/channels/lights/messages/dim"),
                ],
                ..Default::default()
            }),
        );
        document
    }

    #[test]
    fn test_operations_nested_under_channel_address() {
        let document = lights_document();
        let workspace = Workspace::new();
        workspace.register_components(&document);

        let value = write(&document, &workspace);

        assert_eq!(value["asyncapi"], json!("2.6.0"));
        assert_eq!(
            value["channels"],
            json!({
                "smartylighting/{streetlightId}": {
                    "publish": {
                        "operationId": "turnOn",
                        "security": [{"token": ["lights:write"]}],
                        "message": {"$ref": "#/components/messages/turnOn"}
                    },
                    "subscribe": {
                        "operationId": "lightEvents",
                        "message": {"oneOf": [
                            {"$ref": "#/components/messages/turnOn"},
                            {"$ref": "#/components/messages/dim"}
                        ]}
                    }
                }
            })
        );
        assert_eq!(
            value["components"]["securitySchemes"]["token"],
            json!({"type": "http", "scheme": "bearer"})
        );
    }

    #[test]
    fn test_unregistered_operation_message_written_inline() {
        let mut document = Document::default();
        document.channels.insert(
            "status".into(),
            ModelRef::inline(Channel {
                address: Some("lights/status".into()),
                ..Default::default()
            }),
        );
        document.operations.insert(
            "reportStatus".into(),
            ModelRef::inline(Operation {
                action: Action::Send,
                channel: Some(ModelRef::pointer("#/channels/status")),
                messages: vec![ModelRef::inline(Message {
                    name: Some("status".into()),
                    ..Default::default()
                })],
                ..Default::default()
            }),
        );
        let workspace = Workspace::new();
        workspace.register_components(&document);

        let value = write(&document, &workspace);

        let message = &value["channels"]["lights/status"]["publish"]["message"];
        assert_eq!(message["name"], json!("status"));
        assert!(message.get("$ref").is_none());
    }

    #[test]
    fn test_server_url_composed() {
        let workspace = Workspace::new();
        let server = Server {
            host: "broker.example.com:8883".into(),
            protocol: "mqtt".into(),
            pathname: Some("/v1".into()),
            ..Default::default()
        };
        assert_eq!(
            write(&server, &workspace),
            json!({"url": "broker.example.com:8883/v1", "protocol": "mqtt"})
        );
    }

    #[test]
    fn test_parameter_schema_rebuilt() {
        let workspace = Workspace::new();
        let parameter = Parameter {
            description: Some("Light id".into()),
            enum_values: vec!["1".into(), "2".into()],
            ..Default::default()
        };
        assert_eq!(
            write(&parameter, &workspace),
            json!({"description": "Light id", "schema": {"type": "string", "enum": ["1", "2"]}})
        );
        assert_eq!(write(&Parameter::default(), &workspace), json!({}));
    }

    #[test]
    fn test_non_default_payload_format_written_on_message() {
        let workspace = Workspace::new();
        let message = Message {
            payload: Some(MultiFormatSchema {
                schema_format: "application/vnd.apache.avro;version=1.9.0".into(),
                schema: Schema::Other(ModelRef::inline(crate::model::OtherSchema {
                    value: json!({"type": "record"}),
                })),
            }),
            ..Default::default()
        };
        assert_eq!(
            write(&message, &workspace),
            json!({
                "payload": {"type": "record"},
                "schemaFormat": "application/vnd.apache.avro;version=1.9.0"
            })
        );
    }

    #[test]
    fn test_v3_only_constructs_dropped_and_recorded() {
        let mut document = lights_document();
        document.components.operations.insert(
            "shared".into(),
            ModelRef::inline(Operation::default()),
        );
        if let Some(ModelRef::Inline(channel)) = document.channels.get("lights") {
            channel.borrow_mut().title = Some("Lights".into());
        }
        let workspace = Workspace::new();
        workspace.register_components(&document);
        let settings = WriterSettings::default();
        let mut ctx = WriteContext::new(&settings, &workspace);

        let value = document.write_v2(&mut ctx);

        assert!(value["channels"]["smartylighting/{streetlightId}"].get("title").is_none());
        assert!(value["components"].get("operations").is_none());
        let dropped: Vec<&str> = ctx.dropped().iter().map(|d| d.location.as_str()).collect();
        assert_eq!(dropped, vec!["#/channels/lights/title", "#/components/operations/shared"]);
    }

    #[test]
    fn test_strict_writer_refuses_lossy_output() {
        let mut document = lights_document();
        document.servers.insert(
            "production".into(),
            ModelRef::inline(Server {
                host: "broker.example.com".into(),
                protocol: "mqtt".into(),
                title: Some("Production".into()),
                ..Default::default()
            }),
        );
        let strict = AsyncApiWriter::new(WriterSettings::new().with_strict_v2(true));

        let err = strict
            .serialize(&document, &Workspace::new(), AsyncApiVersion::V2, OutputFormat::Json)
            .unwrap_err();
        assert!(matches!(
            err,
            WriteError::UnsupportedInV2 { ref location, .. }
                if location == "#/servers/production/title"
        ));

        let lenient = AsyncApiWriter::default();
        let value = lenient.write(&document, &Workspace::new(), AsyncApiVersion::V2);
        assert_eq!(
            value["servers"]["production"],
            json!({"url": "broker.example.com", "protocol": "mqtt"})
        );
    }
}
