//! v2 to v3 upgrade
//!
//! v2 embeds operations under each channel's `publish` / `subscribe`. The v2
//! loaders collect those as [`PendingOperation`]s; [`Upgrader::run`] lifts them
//! into the root operations map, hoists inline messages into
//! `components.messages` and links channel, operation and message together.
//!
//! The anonymous counters live on the [`Upgrader`], so numbering is scoped to
//! one document and is deterministic for a given input.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::context::ParsingContext;
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::location::escape_segment;
use crate::model::{Action, Document, Message, ModelRef, Operation};

/// Operations collected while reading a v2 document
#[derive(Debug, Clone, Default)]
pub(crate) struct PendingUpgrade {
    pub operations: Vec<PendingOperation>,
}

/// One `publish` / `subscribe` entry of a v2 channel
#[derive(Debug, Clone)]
pub(crate) struct PendingOperation {
    /// Normalized key of the owning channel
    pub channel_key: String,
    pub action: Action,
    pub operation_id: Option<String>,
    pub operation: Rc<RefCell<Operation>>,
    pub messages: Vec<PendingMessage>,
    /// Pointer of the embedded operation in the source document
    pub location: String,
}

#[derive(Debug, Clone)]
pub(crate) struct PendingMessage {
    pub message_id: Option<String>,
    pub message: ModelRef<Message>,
}

/// Counts of what one run moved
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UpgradeReport {
    pub operations: usize,
    pub messages: usize,
}

#[derive(Debug, Default)]
pub(crate) struct Upgrader {
    anonymous_operations: usize,
    anonymous_messages: usize,
}

impl Upgrader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lift every pending operation into `document`
    ///
    /// Operations already present in `document` (same allocation) are skipped,
    /// so running the same pending set twice changes nothing.
    pub fn run(
        &mut self,
        document: &mut Document,
        pending: &PendingUpgrade,
        ctx: &mut ParsingContext<'_>,
    ) -> UpgradeReport {
        let mut report = UpgradeReport::default();

        for op in &pending.operations {
            if is_already_lifted(document, &op.operation) {
                debug!(location = %op.location, "operation already upgraded, skipping");
                continue;
            }

            let channel_location = format!("#/channels/{}", escape_segment(&op.channel_key));
            let key = self.operation_key(document, op, ctx);

            let mut message_refs = Vec::with_capacity(op.messages.len());
            for message in &op.messages {
                let (message_key, channel_entry) =
                    self.hoist_message(document, message, op, ctx, &mut report);
                attach_to_channel(document, &op.channel_key, &message_key, channel_entry, op, ctx);
                message_refs.push(ModelRef::pointer(format!(
                    "{}/messages/{}",
                    channel_location,
                    escape_segment(&message_key)
                )));
            }

            {
                let mut operation = op.operation.borrow_mut();
                operation.action = op.action;
                operation.channel = Some(ModelRef::pointer(channel_location.clone()));
                operation.messages = message_refs;
            }

            debug!(
                operation = %key,
                channel = %op.channel_key,
                action = %op.action,
                "lifted v2 operation"
            );
            document
                .operations
                .insert(key, ModelRef::Inline(Rc::clone(&op.operation)));
            report.operations += 1;
        }

        report
    }

    fn operation_key(
        &mut self,
        document: &Document,
        op: &PendingOperation,
        ctx: &mut ParsingContext<'_>,
    ) -> String {
        let base = match &op.operation_id {
            Some(id) => id.clone(),
            None => {
                self.anonymous_operations += 1;
                format!("anonymous-operation-{}", self.anonymous_operations)
            }
        };
        if !document.operations.contains_key(&base) {
            return base;
        }

        let mut suffix = 2;
        loop {
            let candidate = format!("{}-{}", base, suffix);
            if !document.operations.contains_key(&candidate) {
                ctx.report(
                    Diagnostic::warning(
                        DiagnosticCode::DuplicateKey,
                        format!(
                            "operationId `{}` is used more than once; stored as `{}`",
                            base, candidate
                        ),
                    )
                    .with_pointer(op.location.clone()),
                );
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Key of the message inside its channel, plus the channel entry pointing at it
    fn hoist_message(
        &mut self,
        document: &mut Document,
        message: &PendingMessage,
        op: &PendingOperation,
        ctx: &mut ParsingContext<'_>,
        report: &mut UpgradeReport,
    ) -> (String, ModelRef<Message>) {
        let inline = match &message.message {
            ModelRef::Pointer(pointer) => {
                return (pointer.reference().key(), message.message.clone());
            }
            ModelRef::Inline(inline) => inline,
        };

        let existing = document
            .components
            .messages
            .iter()
            .find(|(_, candidate)| candidate.as_inline().is_some_and(|c| Rc::ptr_eq(c, inline)))
            .map(|(key, _)| key.clone());

        let key = match existing {
            Some(key) => key,
            None => {
                let key = match &message.message_id {
                    Some(id) => id.clone(),
                    None => {
                        self.anonymous_messages += 1;
                        format!("anonymous-message-{}", self.anonymous_messages)
                    }
                };
                if document.components.messages.contains_key(&key) {
                    ctx.report(
                        Diagnostic::warning(
                            DiagnosticCode::DuplicateKey,
                            format!(
                                "message `{}` is already defined; keeping the first definition",
                                key
                            ),
                        )
                        .with_pointer(op.location.clone()),
                    );
                } else {
                    document
                        .components
                        .messages
                        .insert(key.clone(), ModelRef::Inline(Rc::clone(inline)));
                    report.messages += 1;
                }
                key
            }
        };

        let pointer = ModelRef::pointer(format!("#/components/messages/{}", escape_segment(&key)));
        (key, pointer)
    }
}

fn is_already_lifted(document: &Document, operation: &Rc<RefCell<Operation>>) -> bool {
    document
        .operations
        .values()
        .any(|existing| existing.as_inline().is_some_and(|e| Rc::ptr_eq(e, operation)))
}

fn attach_to_channel(
    document: &mut Document,
    channel_key: &str,
    message_key: &str,
    entry: ModelRef<Message>,
    op: &PendingOperation,
    ctx: &mut ParsingContext<'_>,
) {
    match document.channels.get(channel_key).and_then(ModelRef::as_inline) {
        Some(channel) => {
            channel
                .borrow_mut()
                .messages
                .entry(message_key.to_string())
                .or_insert(entry);
        }
        None => ctx.report(
            Diagnostic::error(
                DiagnosticCode::UnresolvedReference,
                format!(
                    "channel `{}` is not defined inline; message `{}` was not attached",
                    channel_key, message_key
                ),
            )
            .with_pointer(op.location.clone()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Channel;
    use crate::settings::ReaderSettings;
    use crate::version::AsyncApiVersion;
    use pretty_assertions::assert_eq;

    fn document_with_channel(key: &str) -> Document {
        let mut document = Document::default();
        document.channels.insert(
            key.to_string(),
            ModelRef::inline(Channel {
                address: Some("light/measured".to_string()),
                ..Default::default()
            }),
        );
        document
    }

    fn pending(
        channel_key: &str,
        action: Action,
        id: Option<&str>,
        messages: Vec<PendingMessage>,
    ) -> PendingOperation {
        PendingOperation {
            channel_key: channel_key.to_string(),
            action,
            operation_id: id.map(str::to_string),
            operation: Rc::new(RefCell::new(Operation::default())),
            messages,
            location: format!("#/channels/{}", channel_key),
        }
    }

    fn inline_message(id: Option<&str>) -> PendingMessage {
        PendingMessage {
            message_id: id.map(str::to_string),
            message: ModelRef::inline(Message::default()),
        }
    }

    #[test]
    fn test_anonymous_ids_are_sequential() {
        let settings = ReaderSettings::default();
        let mut ctx = ParsingContext::new(&settings, AsyncApiVersion::V2);
        let mut document = document_with_channel("lightmeasured");
        let pending = PendingUpgrade {
            operations: vec![
                pending("lightmeasured", Action::Send, None, vec![inline_message(None)]),
                pending("lightmeasured", Action::Receive, None, vec![inline_message(None)]),
            ],
        };

        let report = Upgrader::new().run(&mut document, &pending, &mut ctx);

        assert_eq!(report, UpgradeReport { operations: 2, messages: 2 });
        let keys: Vec<_> = document.operations.keys().cloned().collect();
        assert_eq!(keys, vec!["anonymous-operation-1", "anonymous-operation-2"]);
        let messages: Vec<_> = document.components.messages.keys().cloned().collect();
        assert_eq!(messages, vec!["anonymous-message-1", "anonymous-message-2"]);

        let first = document.operations["anonymous-operation-1"].borrow_inline().unwrap().clone();
        assert_eq!(first.action, Action::Send);
        assert_eq!(
            first.messages[0].reference().unwrap().location(),
            "#/channels/lightmeasured/messages/anonymous-message-1"
        );
    }

    #[test]
    fn test_running_twice_is_idempotent() {
        let settings = ReaderSettings::default();
        let mut ctx = ParsingContext::new(&settings, AsyncApiVersion::V2);
        let mut document = document_with_channel("lightmeasured");
        let pending = PendingUpgrade {
            operations: vec![pending(
                "lightmeasured",
                Action::Send,
                Some("turnOn"),
                vec![inline_message(Some("lightMeasured"))],
            )],
        };

        let mut upgrader = Upgrader::new();
        upgrader.run(&mut document, &pending, &mut ctx);
        let second = upgrader.run(&mut document, &pending.clone(), &mut ctx);

        assert_eq!(second, UpgradeReport::default());
        assert_eq!(document.operations.len(), 1);
        assert_eq!(document.components.messages.len(), 1);
        let channel = document.channels["lightmeasured"].borrow_inline().unwrap().clone();
        assert_eq!(channel.messages.len(), 1);
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn test_duplicate_operation_id_gets_suffix() {
        let settings = ReaderSettings::default();
        let mut ctx = ParsingContext::new(&settings, AsyncApiVersion::V2);
        let mut document = document_with_channel("lightmeasured");
        let pending = PendingUpgrade {
            operations: vec![
                pending("lightmeasured", Action::Send, Some("onLight"), vec![]),
                pending("lightmeasured", Action::Receive, Some("onLight"), vec![]),
            ],
        };

        Upgrader::new().run(&mut document, &pending, &mut ctx);

        assert!(document.operations.contains_key("onLight"));
        assert!(document.operations.contains_key("onLight-2"));
        let warning = ctx.diagnostics().iter().next().unwrap();
        assert_eq!(warning.code, DiagnosticCode::DuplicateKey);
    }

    #[test]
    fn test_referenced_message_keeps_its_key() {
        let settings = ReaderSettings::default();
        let mut ctx = ParsingContext::new(&settings, AsyncApiVersion::V2);
        let mut document = document_with_channel("lightmeasured");
        let message = PendingMessage {
            message_id: None,
            message: ModelRef::pointer("#/components/messages/lightMeasured"),
        };
        let pending = PendingUpgrade {
            operations: vec![pending(
                "lightmeasured",
                Action::Send,
                Some("publishLight"),
                vec![message],
            )],
        };

        let report = Upgrader::new().run(&mut document, &pending, &mut ctx);

        assert_eq!(report.messages, 0);
        let channel = document.channels["lightmeasured"].borrow_inline().unwrap().clone();
        assert_eq!(
            channel.messages["lightMeasured"].reference().unwrap().location(),
            "#/components/messages/lightMeasured"
        );
    }
}
