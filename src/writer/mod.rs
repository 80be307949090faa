//! Document writer
//!
//! Every model type has a v2 and a v3 rendition ([`WriteV2`] / [`WriteV3`])
//! producing a `serde_json::Value`; text output is a final JSON or YAML
//! encoding step. The [`Workspace`] is passed in explicitly and used for:
//! - resolving pointers the inline policy asks to expand
//! - finding the canonical location of shared objects (v2 message refs, v2
//!   security requirement names)
//!
//! Inlining is guarded by a loop detector keyed by reference kind and
//! canonical location, so self-referencing schemas terminate with a `$ref`.

mod common;
mod v2;
mod v3;

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{WriteError, WriteResult};
use crate::model::{Document, Extensions, ModelRef, ReferenceKind, Referenceable};
use crate::settings::WriterSettings;
use crate::version::AsyncApiVersion;
use crate::workspace::Workspace;

/// Text encoding of serialized output
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

/// Model type with an AsyncAPI 2.x wire shape
pub trait WriteV2 {
    fn write_v2(&self, ctx: &mut WriteContext<'_>) -> Value;
}

/// Model type with an AsyncAPI 3.x wire shape
pub trait WriteV3 {
    fn write_v3(&self, ctx: &mut WriteContext<'_>) -> Value;
}

impl<T: WriteV2 + Referenceable> WriteV2 for ModelRef<T> {
    fn write_v2(&self, ctx: &mut WriteContext<'_>) -> Value {
        write_ref(self, ctx, |value, ctx| value.write_v2(ctx))
    }
}

impl<T: WriteV3 + Referenceable> WriteV3 for ModelRef<T> {
    fn write_v3(&self, ctx: &mut WriteContext<'_>) -> Value {
        write_ref(self, ctx, |value, ctx| value.write_v3(ctx))
    }
}

/// (kind, canonical location) pairs currently being inlined
#[derive(Debug, Default)]
pub struct LoopDetector {
    active: HashSet<(ReferenceKind, String)>,
}

impl LoopDetector {
    /// Returns false when the pair is already on the stack
    pub fn enter(&mut self, kind: ReferenceKind, location: &str) -> bool {
        self.active.insert((kind, location.to_string()))
    }

    pub fn exit(&mut self, kind: ReferenceKind, location: &str) {
        self.active.remove(&(kind, location.to_string()));
    }

    pub fn depth(&self) -> usize {
        self.active.len()
    }
}

/// Construct left out of a 2.x rendition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedConstruct {
    pub construct: String,
    pub location: String,
}

/// State of one write call
pub struct WriteContext<'a> {
    settings: &'a WriterSettings,
    workspace: &'a Workspace,
    loops: LoopDetector,
    dropped: Vec<DroppedConstruct>,
}

impl<'a> WriteContext<'a> {
    pub fn new(settings: &'a WriterSettings, workspace: &'a Workspace) -> Self {
        Self {
            settings,
            workspace,
            loops: LoopDetector::default(),
            dropped: Vec::new(),
        }
    }

    pub fn settings(&self) -> &'a WriterSettings {
        self.settings
    }

    pub fn workspace(&self) -> &'a Workspace {
        self.workspace
    }

    /// Record a construct the target version has no field for
    pub fn drop_construct(&mut self, construct: impl Into<String>, location: impl Into<String>) {
        let dropped = DroppedConstruct {
            construct: construct.into(),
            location: location.into(),
        };
        warn!(construct = %dropped.construct, location = %dropped.location, "no 2.x form; dropped");
        self.dropped.push(dropped);
    }

    pub fn dropped(&self) -> &[DroppedConstruct] {
        &self.dropped
    }
}

/// `{"$ref": location}`
pub fn ref_value(location: &str) -> Value {
    let mut map = Map::new();
    map.insert("$ref".to_string(), Value::String(location.to_string()));
    Value::Object(map)
}

/// Write an inline value, or a pointer as `$ref` unless the inline policy
/// expands it and no cycle is open on its target
pub(crate) fn write_ref<T, F>(
    reference: &ModelRef<T>,
    ctx: &mut WriteContext<'_>,
    write: F,
) -> Value
where
    T: Referenceable,
    F: FnOnce(&T, &mut WriteContext<'_>) -> Value,
{
    let pointer = match reference {
        ModelRef::Inline(value) => return write(&value.borrow(), ctx),
        ModelRef::Pointer(pointer) => pointer.reference(),
    };
    if !ctx.settings.should_inline(pointer) {
        return ref_value(pointer.location());
    }
    let Some(target) = reference.resolve(ctx.workspace) else {
        return ref_value(pointer.location());
    };

    let canonical = ctx.workspace.canonical_location(pointer.location());
    if !ctx.loops.enter(T::KIND, &canonical) {
        debug!(location = %canonical, "cycle while inlining; writing a reference");
        return ref_value(pointer.location());
    }
    let value = write(&target.borrow(), ctx);
    ctx.loops.exit(T::KIND, &canonical);
    value
}

/// Always a `$ref`; an inline value is referenced by its registered location
/// and only written in place when it has none
pub(crate) fn write_reference_only<T, F>(
    reference: &ModelRef<T>,
    ctx: &mut WriteContext<'_>,
    write: F,
) -> Value
where
    T: Referenceable,
    F: FnOnce(&T, &mut WriteContext<'_>) -> Value,
{
    match reference {
        ModelRef::Pointer(pointer) => ref_value(pointer.reference().location()),
        ModelRef::Inline(value) => match ctx.workspace.location_of(value) {
            Some(location) => ref_value(&location),
            None => write(&value.borrow(), ctx),
        },
    }
}

/// Ordered JSON object that skips absent and empty members
#[derive(Debug, Default)]
pub struct ObjectBuilder {
    map: Map<String, Value>,
}

impl ObjectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&mut self, key: &str, value: Value) -> &mut Self {
        self.map.insert(key.to_string(), value);
        self
    }

    pub fn optional(&mut self, key: &str, value: Option<Value>) -> &mut Self {
        if let Some(value) = value {
            self.value(key, value);
        }
        self
    }

    pub fn string(&mut self, key: &str, value: &Option<String>) -> &mut Self {
        self.optional(key, value.clone().map(Value::String))
    }

    pub fn bool(&mut self, key: &str, value: Option<bool>) -> &mut Self {
        self.optional(key, value.map(Value::Bool))
    }

    pub fn list(&mut self, key: &str, values: Vec<Value>) -> &mut Self {
        if !values.is_empty() {
            self.value(key, Value::Array(values));
        }
        self
    }

    pub fn strings(&mut self, key: &str, values: &[String]) -> &mut Self {
        self.list(key, values.iter().cloned().map(Value::String).collect())
    }

    pub fn object(&mut self, key: &str, map: Map<String, Value>) -> &mut Self {
        if !map.is_empty() {
            self.value(key, Value::Object(map));
        }
        self
    }

    pub fn extensions(&mut self, extensions: &Extensions) -> &mut Self {
        for (key, value) in extensions {
            self.value(key, value.clone());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn build(&mut self) -> Value {
        Value::Object(std::mem::take(&mut self.map))
    }
}

/// Write every value of `map` under its key
pub(crate) fn write_map<T>(
    map: &IndexMap<String, T>,
    ctx: &mut WriteContext<'_>,
    mut write: impl FnMut(&T, &mut WriteContext<'_>) -> Value,
) -> Map<String, Value> {
    map.iter().map(|(key, value)| (key.clone(), write(value, ctx))).collect()
}

pub(crate) fn write_list<T>(
    items: &[T],
    ctx: &mut WriteContext<'_>,
    mut write: impl FnMut(&T, &mut WriteContext<'_>) -> Value,
) -> Vec<Value> {
    items.iter().map(|item| write(item, ctx)).collect()
}

/// Writes documents and fragments with one set of settings
#[derive(Debug, Default)]
pub struct AsyncApiWriter {
    settings: WriterSettings,
}

impl AsyncApiWriter {
    pub fn new(settings: WriterSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &WriterSettings {
        &self.settings
    }

    /// Wire shape of `document` for `version`
    ///
    /// The document's components are registered in `workspace` first (first
    /// registration wins), so a workspace from the reader can be reused.
    /// Constructs 2.x cannot carry are dropped with a warning log.
    pub fn write(
        &self,
        document: &Document,
        workspace: &Workspace,
        version: AsyncApiVersion,
    ) -> Value {
        self.write_document(document, workspace, version).0
    }

    /// [`Self::write`], failing on the first dropped construct when
    /// `strict_v2` is set
    pub fn try_write(
        &self,
        document: &Document,
        workspace: &Workspace,
        version: AsyncApiVersion,
    ) -> WriteResult<Value> {
        let (value, dropped) = self.write_document(document, workspace, version);
        match dropped.into_iter().next() {
            Some(first) if self.settings.strict_v2 => Err(WriteError::UnsupportedInV2 {
                construct: first.construct,
                location: first.location,
            }),
            _ => Ok(value),
        }
    }

    fn write_document(
        &self,
        document: &Document,
        workspace: &Workspace,
        version: AsyncApiVersion,
    ) -> (Value, Vec<DroppedConstruct>) {
        workspace.register_components(document);
        let mut ctx = WriteContext::new(&self.settings, workspace);
        let value = match version {
            AsyncApiVersion::V2 => document.write_v2(&mut ctx),
            AsyncApiVersion::V3 => document.write_v3(&mut ctx),
        };
        info!(
            %version,
            channels = document.channels.len(),
            dropped = ctx.dropped.len(),
            "wrote AsyncAPI document"
        );
        (value, ctx.dropped)
    }

    /// Wire shape of one element
    pub fn write_fragment<T: WriteV2 + WriteV3>(
        &self,
        element: &T,
        workspace: &Workspace,
        version: AsyncApiVersion,
    ) -> Value {
        let mut ctx = WriteContext::new(&self.settings, workspace);
        match version {
            AsyncApiVersion::V2 => element.write_v2(&mut ctx),
            AsyncApiVersion::V3 => element.write_v3(&mut ctx),
        }
    }

    /// Encoded text of `document`
    pub fn serialize(
        &self,
        document: &Document,
        workspace: &Workspace,
        version: AsyncApiVersion,
        format: OutputFormat,
    ) -> WriteResult<String> {
        let value = self.try_write(document, workspace, version)?;
        encode(&value, format)
    }
}

/// JSON or YAML text of a written value
pub fn encode(value: &Value, format: OutputFormat) -> WriteResult<String> {
    let text = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    Ok(text)
}

/// Write a document with default settings and a fresh workspace
pub fn serialize(
    document: &Document,
    version: AsyncApiVersion,
    format: OutputFormat,
) -> WriteResult<String> {
    AsyncApiWriter::default().serialize(document, &Workspace::new(), version, format)
}

/// Wire value of a document with default settings and a fresh workspace
pub fn to_value(document: &Document, version: AsyncApiVersion) -> Value {
    AsyncApiWriter::default().write(document, &Workspace::new(), version)
}

/// Wire value of one element with default settings
pub fn write_fragment<T: WriteV2 + WriteV3>(
    element: &T,
    workspace: &Workspace,
    version: AsyncApiVersion,
) -> Value {
    AsyncApiWriter::default().write_fragment(element, workspace, version)
}
