//! Built-in validation rules

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{ValidationContext, ValidationRule};
use crate::diagnostics::DiagnosticCode;
use crate::model::{
    Channel, Document, ModelRef, Operation, OperationReply, OperationReplyAddress, Referenceable,
    SecurityScheme, SecuritySchemeType, Server,
};
use crate::workspace::Workspace;

static COMPONENT_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9\.\-_]+$").expect("valid component key regex"));

/// Every rule a default reader runs, in order
pub fn default_rules() -> Vec<ValidationRule> {
    vec![
        ValidationRule::new("info-required-fields", info_required_fields),
        ValidationRule::new("key-format", key_format),
        ValidationRule::new("operation-channel", operation_channel),
        ValidationRule::new("operation-messages-subset", operation_messages_subset),
        ValidationRule::new("channel-address-parameters", channel_address_parameters),
        ValidationRule::new("reply-address-location", reply_address_location),
        ValidationRule::new("security-scheme-fields", security_scheme_fields),
        ValidationRule::new("local-references", local_references),
    ]
}

fn info_required_fields(document: &Document, _: &Workspace, ctx: &mut ValidationContext) {
    ctx.with_segment("info", |ctx| {
        if document.info.title.trim().is_empty() {
            ctx.with_segment("title", |ctx| ctx.error("info title must not be empty"));
        }
        if document.info.version.trim().is_empty() {
            ctx.with_segment("version", |ctx| ctx.error("info version must not be empty"));
        }
    });
}

fn key_format(document: &Document, _: &Workspace, ctx: &mut ValidationContext) {
    fn check<'a>(
        ctx: &mut ValidationContext,
        section: &str,
        keys: impl IntoIterator<Item = &'a str>,
    ) {
        ctx.with_segment(section, |ctx| {
            for key in keys {
                if !COMPONENT_KEY.is_match(key) {
                    ctx.with_segment(key, |ctx| {
                        ctx.error(format!("key `{}` must match {}", key, COMPONENT_KEY.as_str()))
                    });
                }
            }
        });
    }

    check(ctx, "servers", document.servers.keys().map(String::as_str));
    check(ctx, "channels", document.channels.keys().map(String::as_str));
    check(ctx, "operations", document.operations.keys().map(String::as_str));
    ctx.with_segment("components", |ctx| {
        for (category, keys) in document.components.keys_by_category() {
            check(ctx, category, keys);
        }
    });
}

/// Channel object of the document's `channels` that `channel` resolves to
fn document_channel(
    channel: &ModelRef<Channel>,
    document: &Document,
    workspace: &Workspace,
) -> Option<Rc<RefCell<Channel>>> {
    let target = channel.resolve(workspace)?;
    document
        .channels
        .values()
        .filter_map(|candidate| candidate.resolve(workspace))
        .any(|candidate| Rc::ptr_eq(&candidate, &target))
        .then_some(target)
}

fn reference_location<T>(reference: &ModelRef<T>) -> String {
    reference
        .reference()
        .map(|r| r.location().to_string())
        .unwrap_or_default()
}

fn operation_channel(document: &Document, workspace: &Workspace, ctx: &mut ValidationContext) {
    ctx.with_segment("operations", |ctx| {
        for (key, operation) in &document.operations {
            let Some(operation) = operation.resolve(workspace) else {
                continue;
            };
            let operation = operation.borrow();
            ctx.with_segment(key, |ctx| match &operation.channel {
                None => ctx.error(format!("operation `{}` has no channel", key)),
                Some(channel) => {
                    if document_channel(channel, document, workspace).is_none() {
                        let message = format!(
                            "operation `{}` must point at a channel of the document, found `{}`",
                            key,
                            reference_location(channel)
                        );
                        ctx.with_segment("channel", |ctx| ctx.error(message));
                    }
                }
            });
        }
    });
}

fn operation_messages_subset(
    document: &Document,
    workspace: &Workspace,
    ctx: &mut ValidationContext,
) {
    ctx.with_segment("operations", |ctx| {
        for (key, operation) in &document.operations {
            let Some(operation) = operation.resolve(workspace) else {
                continue;
            };
            let operation = operation.borrow();
            let Some(channel) = operation
                .channel
                .as_ref()
                .and_then(|channel| channel.resolve(workspace))
            else {
                continue;
            };
            let channel_messages: Vec<_> = channel
                .borrow()
                .messages
                .values()
                .filter_map(|message| message.resolve(workspace))
                .collect();

            ctx.with_segment(key, |ctx| {
                ctx.with_segment("messages", |ctx| {
                    for (index, message) in operation.messages.iter().enumerate() {
                        let location = reference_location(message);
                        let finding = match message.resolve(workspace) {
                            None => Some(format!("message `{}` does not resolve", location)),
                            Some(target) => {
                                let listed =
                                    channel_messages.iter().any(|m| Rc::ptr_eq(m, &target));
                                (!listed).then(|| {
                                    format!(
                                        "message `{}` is not one of the messages of the channel",
                                        location
                                    )
                                })
                            }
                        };
                        if let Some(finding) = finding {
                            ctx.with_segment(&index.to_string(), |ctx| ctx.error(finding));
                        }
                    }
                });
            });
        }
    });
}

fn channel_address_parameters(
    document: &Document,
    workspace: &Workspace,
    ctx: &mut ValidationContext,
) {
    ctx.with_segment("channels", |ctx| {
        for (key, channel) in &document.channels {
            let Some(channel) = channel.resolve(workspace) else {
                continue;
            };
            let channel = channel.borrow();
            ctx.with_segment(key, |ctx| {
                for name in channel.address_parameters() {
                    if !channel.parameters.contains_key(&name) {
                        let message =
                            format!("address parameter `{}` has no matching parameter", name);
                        ctx.with_segment("address", |ctx| ctx.error(message));
                    }
                }
            });
        }
    });
}

fn reply_address_location(document: &Document, workspace: &Workspace, ctx: &mut ValidationContext) {
    fn check_address(
        address: &ModelRef<OperationReplyAddress>,
        workspace: &Workspace,
        ctx: &mut ValidationContext,
    ) {
        let missing = address.read(workspace, |a| a.location.trim().is_empty());
        if missing && !address.is_unresolved(workspace) {
            ctx.with_segment("location", |ctx| {
                ctx.error("reply address location must not be empty")
            });
        }
    }

    fn check_reply(
        reply: &ModelRef<OperationReply>,
        workspace: &Workspace,
        ctx: &mut ValidationContext,
    ) {
        let address = reply.read(workspace, |r| r.address.clone());
        if let Some(address) = address {
            ctx.with_segment("address", |ctx| check_address(&address, workspace, ctx));
        }
    }

    let operations =
        |ctx: &mut ValidationContext, operations: &IndexMap<String, ModelRef<Operation>>| {
            for (key, operation) in operations {
                if let Some(reply) = operation.read(workspace, |o| o.reply.clone()) {
                    ctx.with_segment(key, |ctx| {
                        ctx.with_segment("reply", |ctx| check_reply(&reply, workspace, ctx))
                    });
                }
            }
        };

    ctx.with_segment("operations", |ctx| operations(ctx, &document.operations));
    ctx.with_segment("components", |ctx| {
        ctx.with_segment("operations", |ctx| operations(ctx, &document.components.operations));
        ctx.with_segment("replies", |ctx| {
            for (key, reply) in &document.components.replies {
                ctx.with_segment(key, |ctx| check_reply(reply, workspace, ctx));
            }
        });
        ctx.with_segment("replyAddresses", |ctx| {
            for (key, address) in &document.components.reply_addresses {
                ctx.with_segment(key, |ctx| check_address(address, workspace, ctx));
            }
        });
    });
}

fn security_scheme_fields(document: &Document, workspace: &Workspace, ctx: &mut ValidationContext) {
    ctx.with_segment("components", |ctx| {
        ctx.with_segment("securitySchemes", |ctx| {
            for (key, scheme) in &document.components.security_schemes {
                let Some(scheme) = scheme.resolve(workspace) else {
                    continue;
                };
                let scheme = scheme.borrow();
                ctx.with_segment(key, |ctx| check_scheme(key, &scheme, ctx));
            }
        });
    });
}

fn check_scheme(key: &str, scheme: &SecurityScheme, ctx: &mut ValidationContext) {
    let Some(scheme_type) = scheme.scheme_type else {
        ctx.with_segment("type", |ctx| ctx.error(format!("security scheme `{}` has no type", key)));
        return;
    };
    let mut missing = Vec::new();
    match scheme_type {
        SecuritySchemeType::HttpApiKey => {
            if scheme.name.is_none() {
                missing.push("name");
            }
            if scheme.location.is_none() {
                missing.push("in");
            }
        }
        SecuritySchemeType::ApiKey if scheme.location.is_none() => missing.push("in"),
        SecuritySchemeType::Http if scheme.scheme.is_none() => missing.push("scheme"),
        SecuritySchemeType::OAuth2 if scheme.flows.is_none() => missing.push("flows"),
        SecuritySchemeType::OpenIdConnect if scheme.open_id_connect_url.is_none() => {
            missing.push("openIdConnectUrl")
        }
        _ => {}
    }
    for field in missing {
        ctx.error(format!("`{}` is required for {} security schemes", field, scheme_type));
    }
}

/// Unresolved local pointer in `reference`, reported under `segment`
fn check_reference<T: Referenceable>(
    reference: &ModelRef<T>,
    segment: &str,
    workspace: &Workspace,
    ctx: &mut ValidationContext,
) {
    let Some(pointer) = reference.reference() else {
        return;
    };
    if pointer.is_local() && reference.is_unresolved(workspace) {
        ctx.with_segment(segment, |ctx| {
            ctx.error_with_code(
                DiagnosticCode::UnresolvedReference,
                format!("reference `{}` does not resolve", pointer.location()),
            )
        });
    }
}

fn check_references<'a, T: Referenceable + 'a>(
    references: impl IntoIterator<Item = (String, &'a ModelRef<T>)>,
    section: &str,
    workspace: &Workspace,
    ctx: &mut ValidationContext,
) {
    ctx.with_segment(section, |ctx| {
        for (segment, reference) in references {
            check_reference(reference, &segment, workspace, ctx);
        }
    });
}

fn indexed<T>(items: &[ModelRef<T>]) -> impl Iterator<Item = (String, &ModelRef<T>)> {
    items.iter().enumerate().map(|(index, item)| (index.to_string(), item))
}

fn keyed<T>(items: &IndexMap<String, ModelRef<T>>) -> impl Iterator<Item = (String, &ModelRef<T>)> {
    items.iter().map(|(key, item)| (key.clone(), item))
}

fn local_references(document: &Document, workspace: &Workspace, ctx: &mut ValidationContext) {
    ctx.with_segment("servers", |ctx| {
        for (key, server) in &document.servers {
            check_reference(server, key, workspace, ctx);
            if let Some(server) = server.resolve(workspace) {
                ctx.with_segment(key, |ctx| server_references(&server.borrow(), workspace, ctx));
            }
        }
    });

    ctx.with_segment("channels", |ctx| {
        for (key, channel) in &document.channels {
            check_reference(channel, key, workspace, ctx);
            if let Some(channel) = channel.resolve(workspace) {
                let channel = channel.borrow();
                ctx.with_segment(key, |ctx| {
                    check_references(indexed(&channel.servers), "servers", workspace, ctx);
                    check_references(keyed(&channel.messages), "messages", workspace, ctx);
                    check_references(keyed(&channel.parameters), "parameters", workspace, ctx);
                    check_references(indexed(&channel.tags), "tags", workspace, ctx);
                    if let Some(docs) = &channel.external_docs {
                        check_reference(docs, "externalDocs", workspace, ctx);
                    }
                    if let Some(bindings) = &channel.bindings {
                        check_reference(bindings, "bindings", workspace, ctx);
                    }
                });
            }
        }
    });

    // `channel` and `messages` are covered by the operation rules
    ctx.with_segment("operations", |ctx| {
        for (key, operation) in &document.operations {
            check_reference(operation, key, workspace, ctx);
            if let Some(operation) = operation.resolve(workspace) {
                let operation = operation.borrow();
                ctx.with_segment(key, |ctx| operation_references(&operation, workspace, ctx));
            }
        }
    });
}

fn server_references(server: &Server, workspace: &Workspace, ctx: &mut ValidationContext) {
    check_references(keyed(&server.variables), "variables", workspace, ctx);
    check_references(indexed(&server.security), "security", workspace, ctx);
    check_references(indexed(&server.tags), "tags", workspace, ctx);
    if let Some(docs) = &server.external_docs {
        check_reference(docs, "externalDocs", workspace, ctx);
    }
    if let Some(bindings) = &server.bindings {
        check_reference(bindings, "bindings", workspace, ctx);
    }
}

fn operation_references(operation: &Operation, workspace: &Workspace, ctx: &mut ValidationContext) {
    check_references(indexed(&operation.traits), "traits", workspace, ctx);
    check_references(indexed(&operation.security), "security", workspace, ctx);
    check_references(indexed(&operation.tags), "tags", workspace, ctx);
    if let Some(docs) = &operation.external_docs {
        check_reference(docs, "externalDocs", workspace, ctx);
    }
    if let Some(bindings) = &operation.bindings {
        check_reference(bindings, "bindings", workspace, ctx);
    }
    let Some(reply) = &operation.reply else {
        return;
    };
    check_reference(reply, "reply", workspace, ctx);
    if let Some(reply) = reply.resolve(workspace) {
        let reply = reply.borrow();
        ctx.with_segment("reply", |ctx| {
            if let Some(channel) = &reply.channel {
                check_reference(channel, "channel", workspace, ctx);
            }
            if let Some(address) = &reply.address {
                check_reference(address, "address", workspace, ctx);
            }
            check_references(indexed(&reply.messages), "messages", workspace, ctx);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostic;
    use crate::model::{Message, OAuthFlows, Parameter};
    use crate::validation::run;

    fn rule(name: &str) -> ValidationRule {
        default_rules()
            .into_iter()
            .find(|r| r.name() == name)
            .unwrap()
    }

    fn check(name: &str, document: &Document) -> Vec<Diagnostic> {
        let workspace = Workspace::new();
        workspace.register_components(document);
        run(&[rule(name)], document, &workspace)
    }

    fn valid_info(document: &mut Document) {
        document.info.title = "Streetlights".into();
        document.info.version = "1.0.0".into();
    }

    #[test]
    fn test_default_catalog_names() {
        let names: Vec<_> = default_rules().iter().map(|r| r.name().to_string()).collect();
        assert_eq!(
            names,
            vec![
                "info-required-fields",
                "key-format",
                "operation-channel",
                "operation-messages-subset",
                "channel-address-parameters",
                "reply-address-location",
                "security-scheme-fields",
                "local-references",
            ]
        );
    }

    #[test]
    fn test_info_fields_required() {
        let findings = check("info-required-fields", &Document::default());
        let pointers: Vec<_> = findings.iter().map(|d| d.pointer.as_str()).collect();
        assert_eq!(pointers, vec!["#/info/title", "#/info/version"]);
    }

    #[test]
    fn test_key_format() {
        let mut document = Document::default();
        document.channels.insert("user/signedup".into(), ModelRef::inline(Channel::default()));
        document.channels.insert("userSignedUp".into(), ModelRef::inline(Channel::default()));
        document
            .components
            .messages
            .insert("bad key".into(), ModelRef::inline(Message::default()));

        let findings = check("key-format", &document);

        let pointers: Vec<_> = findings.iter().map(|d| d.pointer.as_str()).collect();
        assert_eq!(pointers, vec!["#/channels/user~1signedup", "#/components/messages/bad key"]);
    }

    #[test]
    fn test_operation_channel_must_be_document_channel() {
        let mut document = Document::default();
        valid_info(&mut document);
        document.channels.insert("lights".into(), ModelRef::inline(Channel::default()));
        document.operations.insert(
            "turnOn".into(),
            ModelRef::inline(Operation {
                channel: Some(ModelRef::pointer("#/channels/lights")),
                ..Default::default()
            }),
        );
        document.operations.insert(
            "turnOff".into(),
            ModelRef::inline(Operation {
                channel: Some(ModelRef::pointer("#/channels/missing")),
                ..Default::default()
            }),
        );
        document
            .operations
            .insert("dim".into(), ModelRef::inline(Operation::default()));

        let findings = check("operation-channel", &document);

        let pointers: Vec<_> = findings.iter().map(|d| d.pointer.as_str()).collect();
        assert_eq!(pointers, vec!["#/operations/turnOff/channel", "#/operations/dim"]);
    }

    #[test]
    fn test_operation_messages_must_belong_to_channel() {
        let mut document = Document::default();
        let on = ModelRef::inline(Message::default());
        let other = ModelRef::inline(Message::default());
        let mut channel = Channel::default();
        channel.messages.insert("on".into(), on);
        document.channels.insert("lights".into(), ModelRef::inline(channel));
        document.components.messages.insert("other".into(), other);
        document.operations.insert(
            "turnOn".into(),
            ModelRef::inline(Operation {
                channel: Some(ModelRef::pointer("#/channels/lights")),
                messages: vec![
                    ModelRef::pointer("#/channels/lights/messages/on"),
                    ModelRef::pointer("#/components/messages/other"),
                    ModelRef::pointer("#/channels/lights/messages/gone"),
                ],
                ..Default::default()
            }),
        );

        let findings = check("operation-messages-subset", &document);

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].pointer, "#/operations/turnOn/messages/1");
        assert!(findings[0].message.contains("not one of the messages"));
        assert_eq!(findings[1].pointer, "#/operations/turnOn/messages/2");
        assert!(findings[1].message.contains("does not resolve"));
    }

    #[test]
    fn test_address_parameters_need_definitions() {
        let mut document = Document::default();
        let mut channel = Channel {
            address: Some("lights/{streetlightId}/{phase}".into()),
            ..Default::default()
        };
        channel
            .parameters
            .insert("streetlightId".into(), ModelRef::inline(Parameter::default()));
        document.channels.insert("lights".into(), ModelRef::inline(channel));

        let findings = check("channel-address-parameters", &document);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].pointer, "#/channels/lights/address");
        assert!(findings[0].message.contains("`phase`"));
    }

    #[test]
    fn test_reply_address_location() {
        let mut document = Document::default();
        document.operations.insert(
            "ping".into(),
            ModelRef::inline(Operation {
                reply: Some(ModelRef::inline(OperationReply {
                    address: Some(ModelRef::inline(OperationReplyAddress::default())),
                    ..Default::default()
                })),
                ..Default::default()
            }),
        );

        let findings = check("reply-address-location", &document);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].pointer, "#/operations/ping/reply/address/location");
    }

    #[test]
    fn test_security_scheme_fields_by_type() {
        let mut document = Document::default();
        let schemes = &mut document.components.security_schemes;
        schemes.insert(
            "apiKey".into(),
            ModelRef::inline(SecurityScheme {
                scheme_type: Some(SecuritySchemeType::HttpApiKey),
                name: Some("api_key".into()),
                ..Default::default()
            }),
        );
        schemes.insert(
            "oauth".into(),
            ModelRef::inline(SecurityScheme {
                scheme_type: Some(SecuritySchemeType::OAuth2),
                flows: Some(OAuthFlows::default()),
                ..Default::default()
            }),
        );
        schemes.insert("untyped".into(), ModelRef::inline(SecurityScheme::default()));

        let findings = check("security-scheme-fields", &document);

        let messages: Vec<_> = findings.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "`in` is required for httpApiKey security schemes",
                "security scheme `untyped` has no type",
            ]
        );
        assert_eq!(findings[1].pointer, "#/components/securitySchemes/untyped/type");
    }

    #[test]
    fn test_local_references_resolve() {
        let mut document = Document::default();
        let channel = Channel {
            servers: vec![ModelRef::pointer("#/servers/production")],
            ..Default::default()
        };
        document.channels.insert("lights".into(), ModelRef::inline(channel));
        document
            .channels
            .insert("remote".into(), ModelRef::pointer("common.yaml#/channels/remote"));

        let findings = check("local-references", &document);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, DiagnosticCode::UnresolvedReference);
        assert_eq!(findings[0].pointer, "#/channels/lights/servers/0");
    }
}
