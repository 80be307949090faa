//! AsyncAPI 3.x wire shape
//!
//! The model is already v3-shaped, so this is a direct walk. Operation
//! `channel` and `messages` (and the same members of replies) are always
//! written as references.

use serde_json::Value;

use super::common::{
    write_bindings, write_correlation_id, write_external_docs, write_oauth_flow,
    write_optional_bindings, write_optional_docs, write_tags,
};
use super::{
    write_list, write_map, write_ref, write_reference_only, ObjectBuilder, WriteContext, WriteV3,
};
use crate::model::{
    Channel, Components, Document, Info, Message, MessageTrait, ModelRef, MultiFormatSchema,
    OAuthFlows, Operation, OperationReply, OperationTrait, Parameter, Schema, SecurityScheme,
    Server,
};
use crate::version::AsyncApiVersion;

impl WriteV3 for Document {
    fn write_v3(&self, ctx: &mut WriteContext<'_>) -> Value {
        let info = self.info.write_v3(ctx);
        let servers = write_map(&self.servers, ctx, |s, ctx| s.write_v3(ctx));
        let channels = write_map(&self.channels, ctx, |c, ctx| c.write_v3(ctx));
        let operations = write_map(&self.operations, ctx, |o, ctx| o.write_v3(ctx));
        let components = self.components.write_v3(ctx);

        let mut out = ObjectBuilder::new();
        out.value("asyncapi", Value::String(AsyncApiVersion::V3.wire_version().to_string()))
            .string("id", &self.id)
            .value("info", info)
            .object("servers", servers)
            .string("defaultContentType", &self.default_content_type)
            .object("channels", channels)
            .object("operations", operations);
        if !self.components.is_empty() {
            out.value("components", components);
        }
        out.extensions(&self.extensions).build()
    }
}

impl WriteV3 for Info {
    fn write_v3(&self, ctx: &mut WriteContext<'_>) -> Value {
        let contact = self.contact.as_ref().map(|c| c.write_v3(ctx));
        let license = self.license.as_ref().map(|l| l.write_v3(ctx));
        let tags = write_tags(&self.tags, ctx);
        let external_docs = write_optional_docs(&self.external_docs, ctx);
        ObjectBuilder::new()
            .value("title", Value::String(self.title.clone()))
            .value("version", Value::String(self.version.clone()))
            .string("description", &self.description)
            .string("termsOfService", &self.terms_of_service)
            .optional("contact", contact)
            .optional("license", license)
            .list("tags", tags)
            .optional("externalDocs", external_docs)
            .extensions(&self.extensions)
            .build()
    }
}

/// Inline schemes or references, as 3.x lists security
fn write_security(security: &[ModelRef<SecurityScheme>], ctx: &mut WriteContext<'_>) -> Vec<Value> {
    write_list(security, ctx, |scheme, ctx| scheme.write_v3(ctx))
}

impl WriteV3 for Server {
    fn write_v3(&self, ctx: &mut WriteContext<'_>) -> Value {
        let variables = write_map(&self.variables, ctx, |v, ctx| v.write_v3(ctx));
        let security = write_security(&self.security, ctx);
        let tags = write_tags(&self.tags, ctx);
        let external_docs = write_optional_docs(&self.external_docs, ctx);
        let bindings = write_optional_bindings(&self.bindings, ctx);
        ObjectBuilder::new()
            .value("host", Value::String(self.host.clone()))
            .value("protocol", Value::String(self.protocol.clone()))
            .string("protocolVersion", &self.protocol_version)
            .string("pathname", &self.pathname)
            .string("description", &self.description)
            .string("title", &self.title)
            .string("summary", &self.summary)
            .object("variables", variables)
            .list("security", security)
            .list("tags", tags)
            .optional("externalDocs", external_docs)
            .optional("bindings", bindings)
            .extensions(&self.extensions)
            .build()
    }
}

impl WriteV3 for Channel {
    fn write_v3(&self, ctx: &mut WriteContext<'_>) -> Value {
        let messages = write_map(&self.messages, ctx, |m, ctx| m.write_v3(ctx));
        let servers = write_list(&self.servers, ctx, |s, ctx| {
            write_reference_only(s, ctx, |server, ctx| server.write_v3(ctx))
        });
        let parameters = write_map(&self.parameters, ctx, |p, ctx| p.write_v3(ctx));
        let tags = write_tags(&self.tags, ctx);
        let external_docs = write_optional_docs(&self.external_docs, ctx);
        let bindings = write_optional_bindings(&self.bindings, ctx);
        ObjectBuilder::new()
            .string("address", &self.address)
            .object("messages", messages)
            .string("title", &self.title)
            .string("summary", &self.summary)
            .string("description", &self.description)
            .list("servers", servers)
            .object("parameters", parameters)
            .list("tags", tags)
            .optional("externalDocs", external_docs)
            .optional("bindings", bindings)
            .extensions(&self.extensions)
            .build()
    }
}

impl WriteV3 for Parameter {
    fn write_v3(&self, _: &mut WriteContext<'_>) -> Value {
        ObjectBuilder::new()
            .strings("enum", &self.enum_values)
            .string("default", &self.default)
            .string("description", &self.description)
            .strings("examples", &self.examples)
            .string("location", &self.location)
            .extensions(&self.extensions)
            .build()
    }
}

fn message_references(messages: &[ModelRef<Message>], ctx: &mut WriteContext<'_>) -> Vec<Value> {
    write_list(messages, ctx, |m, ctx| {
        write_reference_only(m, ctx, |message, ctx| message.write_v3(ctx))
    })
}

impl WriteV3 for Operation {
    fn write_v3(&self, ctx: &mut WriteContext<'_>) -> Value {
        let channel = self
            .channel
            .as_ref()
            .map(|c| write_reference_only(c, ctx, |channel, ctx| channel.write_v3(ctx)));
        let security = write_security(&self.security, ctx);
        let tags = write_tags(&self.tags, ctx);
        let external_docs = write_optional_docs(&self.external_docs, ctx);
        let bindings = write_optional_bindings(&self.bindings, ctx);
        let traits = write_list(&self.traits, ctx, |t, ctx| t.write_v3(ctx));
        let messages = message_references(&self.messages, ctx);
        let reply = self.reply.as_ref().map(|r| r.write_v3(ctx));
        ObjectBuilder::new()
            .value("action", Value::String(self.action.as_str().to_string()))
            .optional("channel", channel)
            .string("title", &self.title)
            .string("summary", &self.summary)
            .string("description", &self.description)
            .list("security", security)
            .list("tags", tags)
            .optional("externalDocs", external_docs)
            .optional("bindings", bindings)
            .list("traits", traits)
            .list("messages", messages)
            .optional("reply", reply)
            .extensions(&self.extensions)
            .build()
    }
}

impl WriteV3 for OperationTrait {
    fn write_v3(&self, ctx: &mut WriteContext<'_>) -> Value {
        let security = write_security(&self.security, ctx);
        let tags = write_tags(&self.tags, ctx);
        let external_docs = write_optional_docs(&self.external_docs, ctx);
        let bindings = write_optional_bindings(&self.bindings, ctx);
        ObjectBuilder::new()
            .string("title", &self.title)
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

impl WriteV3 for OperationReply {
    fn write_v3(&self, ctx: &mut WriteContext<'_>) -> Value {
        let address = self.address.as_ref().map(|a| a.write_v3(ctx));
        let channel = self
            .channel
            .as_ref()
            .map(|c| write_reference_only(c, ctx, |channel, ctx| channel.write_v3(ctx)));
        let messages = message_references(&self.messages, ctx);
        ObjectBuilder::new()
            .optional("address", address)
            .optional("channel", channel)
            .list("messages", messages)
            .extensions(&self.extensions)
            .build()
    }
}

impl WriteV3 for MultiFormatSchema {
    /// Bare schema in the default format, `{schemaFormat, schema}` otherwise
    fn write_v3(&self, ctx: &mut WriteContext<'_>) -> Value {
        let schema = match &self.schema {
            Schema::Json(json) => json.write_v3(ctx),
            Schema::Other(other) => other.write_v3(ctx),
        };
        if self.is_default_format() && matches!(self.schema, Schema::Json(_)) {
            return schema;
        }
        ObjectBuilder::new()
            .value("schemaFormat", Value::String(self.schema_format.clone()))
            .value("schema", schema)
            .build()
    }
}

impl WriteV3 for Message {
    fn write_v3(&self, ctx: &mut WriteContext<'_>) -> Value {
        let headers = self.headers.as_ref().map(|h| h.write_v3(ctx));
        let payload = self.payload.as_ref().map(|p| p.write_v3(ctx));
        let correlation_id = self
            .correlation_id
            .as_ref()
            .map(|c| write_ref(c, ctx, write_correlation_id));
        let tags = write_tags(&self.tags, ctx);
        let external_docs = write_optional_docs(&self.external_docs, ctx);
        let bindings = write_optional_bindings(&self.bindings, ctx);
        let examples = write_list(&self.examples, ctx, |e, ctx| e.write_v3(ctx));
        let traits = write_list(&self.traits, ctx, |t, ctx| t.write_v3(ctx));
        ObjectBuilder::new()
            .optional("headers", headers)
            .optional("payload", payload)
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

impl WriteV3 for MessageTrait {
    fn write_v3(&self, ctx: &mut WriteContext<'_>) -> Value {
        let headers = self.headers.as_ref().map(|h| h.write_v3(ctx));
        let correlation_id = self
            .correlation_id
            .as_ref()
            .map(|c| write_ref(c, ctx, write_correlation_id));
        let tags = write_tags(&self.tags, ctx);
        let external_docs = write_optional_docs(&self.external_docs, ctx);
        let bindings = write_optional_bindings(&self.bindings, ctx);
        let examples = write_list(&self.examples, ctx, |e, ctx| e.write_v3(ctx));
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

impl WriteV3 for SecurityScheme {
    fn write_v3(&self, ctx: &mut WriteContext<'_>) -> Value {
        let flows = self.flows.as_ref().map(|f| f.write_v3(ctx));
        let scopes: Vec<String> = self.scopes.iter().cloned().collect();
        ObjectBuilder::new()
            .optional("type", self.scheme_type.map(|t| Value::String(t.as_str().to_string())))
            .string("description", &self.description)
            .string("name", &self.name)
            .optional("in", self.location.map(|l| Value::String(l.as_str().to_string())))
            .string("scheme", &self.scheme)
            .string("bearerFormat", &self.bearer_format)
            .optional("flows", flows)
            .string("openIdConnectUrl", &self.open_id_connect_url)
            .strings("scopes", &scopes)
            .extensions(&self.extensions)
            .build()
    }
}

impl WriteV3 for OAuthFlows {
    fn write_v3(&self, _: &mut WriteContext<'_>) -> Value {
        let flow = |f: &Option<crate::model::OAuthFlow>| {
            f.as_ref().map(|f| write_oauth_flow(f, "availableScopes"))
        };
        ObjectBuilder::new()
            .optional("implicit", flow(&self.implicit))
            .optional("password", flow(&self.password))
            .optional("clientCredentials", flow(&self.client_credentials))
            .optional("authorizationCode", flow(&self.authorization_code))
            .extensions(&self.extensions)
            .build()
    }
}

impl WriteV3 for Components {
    fn write_v3(&self, ctx: &mut WriteContext<'_>) -> Value {
        let mut out = ObjectBuilder::new();
        let schemas = write_map(&self.schemas, ctx, |s, ctx| s.write_v3(ctx));
        out.object("schemas", schemas);
        let servers = write_map(&self.servers, ctx, |s, ctx| s.write_v3(ctx));
        out.object("servers", servers);
        let channels = write_map(&self.channels, ctx, |c, ctx| c.write_v3(ctx));
        out.object("channels", channels);
        let operations = write_map(&self.operations, ctx, |o, ctx| o.write_v3(ctx));
        out.object("operations", operations);
        let messages = write_map(&self.messages, ctx, |m, ctx| m.write_v3(ctx));
        out.object("messages", messages);
        let security_schemes = write_map(&self.security_schemes, ctx, |s, ctx| s.write_v3(ctx));
        out.object("securitySchemes", security_schemes);
        let server_variables = write_map(&self.server_variables, ctx, |v, ctx| v.write_v3(ctx));
        out.object("serverVariables", server_variables);
        let parameters = write_map(&self.parameters, ctx, |p, ctx| p.write_v3(ctx));
        out.object("parameters", parameters);
        let correlation_ids = write_map(&self.correlation_ids, ctx, |c, ctx| c.write_v3(ctx));
        out.object("correlationIds", correlation_ids);
        let replies = write_map(&self.replies, ctx, |r, ctx| r.write_v3(ctx));
        out.object("replies", replies);
        let reply_addresses = write_map(&self.reply_addresses, ctx, |a, ctx| a.write_v3(ctx));
        out.object("replyAddresses", reply_addresses);
        let external_docs = write_map(&self.external_docs, ctx, |d, ctx| {
            write_ref(d, ctx, write_external_docs)
        });
        out.object("externalDocs", external_docs);
        let tags = write_map(&self.tags, ctx, |t, ctx| t.write_v3(ctx));
        out.object("tags", tags);
        let operation_traits = write_map(&self.operation_traits, ctx, |t, ctx| t.write_v3(ctx));
        out.object("operationTraits", operation_traits);
        let message_traits = write_map(&self.message_traits, ctx, |t, ctx| t.write_v3(ctx));
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
    use crate::model::{Action, JsonSchema, OtherSchema};
    use crate::settings::WriterSettings;
    use crate::workspace::Workspace;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn write<T: WriteV3>(value: &T, workspace: &Workspace) -> Value {
        let settings = WriterSettings::default();
        let mut ctx = WriteContext::new(&settings, workspace);
        value.write_v3(&mut ctx)
    }

    #[test]
    fn test_multi_format_schema_bare_for_default_format() {
        let workspace = Workspace::new();
        let json_schema = MultiFormatSchema::json(ModelRef::inline(JsonSchema {
            schema_type: vec!["string".into()],
            ..Default::default()
        }));
        assert_eq!(write(&json_schema, &workspace), json!({"type": "string"}));

        let avro = MultiFormatSchema {
            schema_format: "application/vnd.apache.avro;version=1.9.0".into(),
            schema: Schema::Other(ModelRef::inline(OtherSchema {
                value: json!({"type": "record", "name": "User"}),
            })),
        };
        assert_eq!(
            write(&avro, &workspace),
            json!({
                "schemaFormat": "application/vnd.apache.avro;version=1.9.0",
                "schema": {"type": "record", "name": "User"}
            })
        );
    }

    #[test]
    fn test_operation_channel_and_messages_stay_references() {
        let workspace = Workspace::new();
        let channel = ModelRef::inline(Channel {
            address: Some("lights".into()),
            ..Default::default()
        });
        workspace.register_component("#/channels/lights", &channel);
        let operation = Operation {
            action: Action::Receive,
            channel: Some(channel),
            messages: vec![ModelRef::pointer("#/channels/lights/messages/on")],
            ..Default::default()
        };

        assert_eq!(
            write(&operation, &workspace),
            json!({
                "action": "receive",
                "channel": {"$ref": "#/channels/lights"},
                "messages": [{"$ref": "#/channels/lights/messages/on"}]
            })
        );
    }

    #[test]
    fn test_empty_document_shape() {
        let workspace = Workspace::new();
        let document = Document {
            info: Info {
                title: "Streetlights".into(),
                version: "1.0.0".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            write(&document, &workspace),
            json!({"asyncapi": "3.0.0", "info": {"title": "Streetlights", "version": "1.0.0"}})
        );
    }
}
