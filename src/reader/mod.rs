//! Document reader
//!
//! [`AsyncApiReader::read`] runs one parse end to end:
//! - detect the version from the `asyncapi` field (or the configured hint)
//! - run that version's loaders into the unified model
//! - for v2, lift embedded operations and copy requirement scopes onto schemes
//! - register every component and the source document in a fresh [`Workspace`]
//! - run the configured validation rules
//!
//! Content problems become diagnostics; only an unknown or missing version
//! and malformed JSON/YAML text are fatal.

mod common;
mod fragment;
mod upgrade;
mod v2;
mod v3;

use once_cell::sync::Lazy;
use tracing::{debug, info};

use crate::context::ParsingContext;
use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::error::ReadError;
use crate::model::{Document, JsonSchema, ModelRef};
use crate::node::ParseNode;
use crate::settings::ReaderSettings;
use crate::validation;
use crate::version::AsyncApiVersion;
use crate::workspace::{Workspace, SOURCE_DOCUMENT};

pub use fragment::Fragment;

use upgrade::Upgrader;

/// Everything one parse produces
#[derive(Debug)]
pub struct ReadResult {
    pub document: Document,
    pub workspace: Workspace,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Default)]
pub struct AsyncApiReader {
    settings: ReaderSettings,
}

impl AsyncApiReader {
    pub fn new(settings: ReaderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ReaderSettings {
        &self.settings
    }

    pub fn read_json(&self, text: &str) -> Result<ReadResult, ReadError> {
        let root = ParseNode::from_json_str(text)?;
        self.read(&root)
    }

    pub fn read_yaml(&self, text: &str) -> Result<ReadResult, ReadError> {
        let root = ParseNode::from_yaml_str(text)?;
        self.read(&root)
    }

    pub fn read(&self, root: &ParseNode) -> Result<ReadResult, ReadError> {
        let (version, mismatch) = detect_version(root, self.settings.version_hint)?;
        debug!(%version, "reading AsyncAPI document");

        let mut ctx = ParsingContext::new(&self.settings, version);
        if let Some(diagnostic) = mismatch {
            ctx.report(diagnostic);
        }

        let workspace = Workspace::new();
        let document = match version {
            AsyncApiVersion::V2 => {
                let (mut document, pending) = v2::load_document(root, &mut ctx);
                let report = Upgrader::new().run(&mut document, &pending, &mut ctx);
                debug!(
                    operations = report.operations,
                    messages = report.messages,
                    "upgraded v2 document"
                );
                workspace.register_components(&document);
                v2::apply_security_scopes(&document, &workspace, &mut ctx);
                document
            }
            AsyncApiVersion::V3 => {
                let document = v3::load_document(root, &mut ctx);
                workspace.register_components(&document);
                document
            }
        };
        register_source(&workspace, root);

        for diagnostic in validation::run(&self.settings.rules, &document, &workspace) {
            ctx.report(diagnostic);
        }

        let diagnostics = ctx.into_diagnostics();
        info!(
            %version,
            channels = document.channels.len(),
            operations = document.operations.len(),
            errors = diagnostics.errors().count(),
            warnings = diagnostics.warnings().count(),
            "read AsyncAPI document"
        );

        Ok(ReadResult {
            document,
            workspace,
            diagnostics,
        })
    }

    /// Read one element with `version`'s loader for `T`
    pub fn read_fragment<T: Fragment>(
        &self,
        node: &ParseNode,
        version: AsyncApiVersion,
    ) -> (T, Diagnostics) {
        let mut ctx = ParsingContext::new(&self.settings, version);
        let value = ctx.load::<T>(node);
        (value, ctx.into_diagnostics())
    }
}

/// Read a document with default settings
pub fn parse(
    root: &ParseNode,
    version_hint: Option<AsyncApiVersion>,
) -> Result<ReadResult, ReadError> {
    AsyncApiReader::new(ReaderSettings::default().with_version_hint(version_hint)).read(root)
}

/// Read one element with default settings
pub fn parse_fragment<T: Fragment>(node: &ParseNode, version: AsyncApiVersion) -> (T, Diagnostics) {
    AsyncApiReader::default().read_fragment(node, version)
}

/// Version to read with, plus a warning when the hint disagrees with the document
fn detect_version(
    root: &ParseNode,
    hint: Option<AsyncApiVersion>,
) -> Result<(AsyncApiVersion, Option<Diagnostic>), ReadError> {
    let declared = root
        .as_map()
        .and_then(|map| map.get("asyncapi"))
        .and_then(ParseNode::as_str);

    match (declared, hint) {
        (Some(declared), hint) => {
            let version = AsyncApiVersion::from_declared(declared)?;
            let mismatch = hint.filter(|hint| *hint != version).map(|hint| {
                Diagnostic::warning(
                    DiagnosticCode::VersionMismatch,
                    format!("document declares AsyncAPI {} but {} was expected", declared, hint),
                )
                .with_pointer("#/asyncapi")
            });
            Ok((version, mismatch))
        }
        (None, Some(hint)) => Ok((hint, None)),
        (None, None) => Err(ReadError::MissingVersion),
    }
}

fn register_source(workspace: &Workspace, root: &ParseNode) {
    match serde_json::to_vec(&root.to_value()) {
        Ok(bytes) => {
            workspace.register_artifact(SOURCE_DOCUMENT, bytes);
        }
        Err(err) => debug!(error = %err, "source document not kept as an artifact"),
    }
}

static SOURCE_SETTINGS: Lazy<ReaderSettings> =
    Lazy::new(|| ReaderSettings::default().without_rules());

/// Schema found by JSON pointer inside the source document
pub(crate) fn load_source_schema(node: &ParseNode) -> ModelRef<JsonSchema> {
    let mut ctx = ParsingContext::new(&SOURCE_SETTINGS, AsyncApiVersion::V3);
    let schema = common::load_json_schema(node, &mut ctx);
    if !ctx.diagnostics().is_empty() {
        debug!(count = ctx.diagnostics().len(), "schema loaded from source had diagnostics");
    }
    schema
}
