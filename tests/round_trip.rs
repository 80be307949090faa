//! Write-then-read stability
//!
//! A document written by this crate and read back must write the same wire
//! value again, in both versions and both encodings. Recursive schemas must
//! stay finite when every reference is inlined.
//!
//! Run with: cargo test --test round_trip

use std::path::PathBuf;
use std::rc::Rc;

use asyncapi_core::model::JsonSchema;
use asyncapi_core::{
    AsyncApiReader, AsyncApiVersion, AsyncApiWriter, InlinePolicy, ModelRef, OutputFormat,
    ReadResult, WriteError, WriterSettings,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {}", path.display(), e))
}

/// Writer warnings show up in test output with `--nocapture`
fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn read_fixture(name: &str) -> ReadResult {
    AsyncApiReader::default()
        .read_yaml(&fixture(name))
        .unwrap_or_else(|e| panic!("{} parses: {}", name, e))
}

fn read_text(text: &str, format: OutputFormat) -> ReadResult {
    let reader = AsyncApiReader::default();
    let result = match format {
        OutputFormat::Json => reader.read_json(text),
        OutputFormat::Yaml => reader.read_yaml(text),
    };
    result.unwrap_or_else(|e| panic!("written output parses: {}\n{}", e, text))
}

/// Write `first` as `version`/`format`, read it back and return both v3 values
fn round_trip(
    first: &ReadResult,
    version: AsyncApiVersion,
    format: OutputFormat,
) -> (Value, Value) {
    let text = asyncapi_core::serialize(&first.document, version, format).expect("serializes");
    let second = read_text(&text, format);
    let errors: Vec<String> = second.diagnostics.errors().map(|d| d.to_string()).collect();
    assert!(errors.is_empty(), "re-read reported errors: {:#?}", errors);

    (
        asyncapi_core::to_value(&first.document, AsyncApiVersion::V3),
        asyncapi_core::to_value(&second.document, AsyncApiVersion::V3),
    )
}

// =============================================================================
// Round-trips
// =============================================================================

#[test]
fn test_v3_document_survives_json() {
    let first = read_fixture("streetlights-v3.yaml");
    let (before, after) = round_trip(&first, AsyncApiVersion::V3, OutputFormat::Json);
    assert_eq!(before, after);
}

#[test]
fn test_v3_document_survives_yaml() {
    let first = read_fixture("streetlights-v3.yaml");
    let (before, after) = round_trip(&first, AsyncApiVersion::V3, OutputFormat::Yaml);
    assert_eq!(before, after);
}

#[test]
fn test_v2_document_survives_v2_output() {
    init_tracing();
    let first = read_fixture("light-switch-v2.yaml");
    let (before, after) = round_trip(&first, AsyncApiVersion::V2, OutputFormat::Yaml);
    assert_eq!(before, after);
}

#[test]
fn test_v2_document_survives_upgrade_to_v3() {
    let first = read_fixture("light-switch-v2.yaml");
    let (before, after) = round_trip(&first, AsyncApiVersion::V3, OutputFormat::Json);
    assert_eq!(before, after);
    assert_eq!(after["asyncapi"], json!("3.0.0"));
    assert_eq!(after["operations"]["turnOn"]["action"], json!("send"));
}

#[test]
fn test_written_v3_keeps_references() {
    let first = read_fixture("streetlights-v3.yaml");
    let value = asyncapi_core::to_value(&first.document, AsyncApiVersion::V3);

    assert_eq!(
        value["operations"]["receiveLightMeasurement"]["channel"],
        json!({"$ref": "#/channels/lightingMeasured"})
    );
    assert_eq!(
        value["components"]["messages"]["lightMeasured"]["payload"],
        json!({"$ref": "#/components/schemas/lightMeasuredPayload"})
    );
}

#[test]
fn test_strict_v2_output_rejects_v3_documents() {
    init_tracing();
    let first = read_fixture("streetlights-v3.yaml");
    let writer = AsyncApiWriter::new(WriterSettings::new().with_strict_v2(true));

    let err = writer
        .serialize(&first.document, &first.workspace, AsyncApiVersion::V2, OutputFormat::Yaml)
        .unwrap_err();
    assert!(matches!(err, WriteError::UnsupportedInV2 { .. }), "got {:?}", err);

    // the same document written leniently still produces a 2.x document
    let lenient =
        AsyncApiWriter::default().write(&first.document, &first.workspace, AsyncApiVersion::V2);
    assert_eq!(lenient["asyncapi"], json!("2.6.0"));
}

// =============================================================================
// Cycles
// =============================================================================

fn write_inlined(result: &ReadResult) -> Value {
    AsyncApiWriter::new(WriterSettings::new().with_inline_policy(InlinePolicy::All)).write(
        &result.document,
        &result.workspace,
        AsyncApiVersion::V3,
    )
}

#[test]
fn test_self_reference_inlined_once() {
    let result = read_fixture("recursive-schema-v3.yaml");
    let value = write_inlined(&result);

    let node = &value["components"]["schemas"]["Node"];
    let next = &node["properties"]["next"];
    assert_eq!(next["properties"]["value"], json!({"type": "string"}));
    assert_eq!(next["properties"]["next"], json!({"$ref": "#/components/schemas/Node"}));
}

#[test]
fn test_mutual_recursion_inlined_once() {
    let result = read_fixture("recursive-schema-v3.yaml");
    let value = write_inlined(&result);

    // Tree -> Forest -> Tree -> Forest stops at the second Forest
    let forest = &value["components"]["schemas"]["Tree"]["properties"]["children"]["items"];
    assert_eq!(forest["type"], json!("array"));
    let tree = &forest["items"];
    assert_eq!(tree["type"], json!("object"));
    assert_eq!(
        tree["properties"]["children"]["items"],
        json!({"$ref": "#/components/schemas/Forest"})
    );
}

#[test]
fn test_inlined_cycle_reads_back_to_the_same_schema() {
    let result = read_fixture("recursive-schema-v3.yaml");
    let text = serde_json::to_string(&write_inlined(&result)).expect("json");
    let second = read_text(&text, OutputFormat::Json);

    let node = second.document.components.schemas["Node"]
        .json_schema()
        .and_then(|schema| schema.resolve(&second.workspace))
        .expect("Node");
    let next = node.borrow().properties["next"].clone();
    let inner: ModelRef<JsonSchema> =
        next.borrow_inline().expect("next written inline").properties["next"].clone();
    let target = inner.resolve(&second.workspace).expect("inner next resolves");
    assert!(Rc::ptr_eq(&target, &node));
}
