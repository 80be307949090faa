//! Payload and header schemas
//!
//! A [`MultiFormatSchema`] pairs a `schemaFormat` string with either a typed
//! [`JsonSchema`] (the AsyncAPI / JSON Schema family) or an [`OtherSchema`]
//! that keeps the raw value of any other format (Avro, RAML, Protobuf, ...).

use indexmap::IndexMap;
use serde_json::Number;

use super::{AsyncApiAny, Extensions, ExternalDocumentation, ModelRef};

/// Format assumed when a schema does not declare one
pub const DEFAULT_SCHEMA_FORMAT: &str = "application/vnd.aai.asyncapi+json;version=3.0.0";

const JSON_SCHEMA_FORMAT_PREFIXES: &[&str] = &[
    "application/vnd.aai.asyncapi",
    "application/schema+json",
    "application/schema+yaml",
];

const OTHER_SCHEMA_FORMAT_PREFIXES: &[&str] = &[
    "application/vnd.apache.avro",
    "application/raml+yaml",
    "application/vnd.google.protobuf",
    "application/vnd.oai.openapi",
];

/// Format strings read into a typed [`JsonSchema`]
pub fn is_json_schema_format(format: &str) -> bool {
    format.is_empty() || JSON_SCHEMA_FORMAT_PREFIXES.iter().any(|p| format.starts_with(p))
}

/// Formats with a standard AsyncAPI registration
pub fn is_known_schema_format(format: &str) -> bool {
    is_json_schema_format(format)
        || OTHER_SCHEMA_FORMAT_PREFIXES
            .iter()
            .any(|p| format.starts_with(p))
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultiFormatSchema {
    pub schema_format: String,
    pub schema: Schema,
}

impl MultiFormatSchema {
    /// JSON schema under the default format
    pub fn json(schema: ModelRef<JsonSchema>) -> Self {
        Self {
            schema_format: DEFAULT_SCHEMA_FORMAT.to_string(),
            schema: Schema::Json(schema),
        }
    }

    pub fn is_default_format(&self) -> bool {
        self.schema_format == DEFAULT_SCHEMA_FORMAT
    }

    pub fn json_schema(&self) -> Option<&ModelRef<JsonSchema>> {
        match &self.schema {
            Schema::Json(schema) => Some(schema),
            Schema::Other(_) => None,
        }
    }
}

impl Default for MultiFormatSchema {
    fn default() -> Self {
        Self::json(ModelRef::inline(JsonSchema::default()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Json(ModelRef<JsonSchema>),
    Other(ModelRef<OtherSchema>),
}

/// Schema in a format this crate does not model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OtherSchema {
    pub value: AsyncApiAny,
}

/// `true`/`false` or a schema for undeclared properties
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(ModelRef<JsonSchema>),
}

/// `items` as one schema for every element or a tuple
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaItems {
    Single(ModelRef<JsonSchema>),
    Tuple(Vec<ModelRef<JsonSchema>>),
}

/// AsyncAPI schema object (a JSON Schema draft-07 superset)
///
/// Keywords without a typed field are kept in `keywords` so they survive a
/// round-trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonSchema {
    pub title: Option<String>,
    pub description: Option<String>,
    pub schema_type: Vec<String>,
    pub format: Option<String>,
    pub enum_values: Vec<AsyncApiAny>,
    pub const_value: Option<AsyncApiAny>,
    pub default: Option<AsyncApiAny>,
    pub examples: Vec<AsyncApiAny>,
    pub multiple_of: Option<Number>,
    pub maximum: Option<Number>,
    pub exclusive_maximum: Option<Number>,
    pub minimum: Option<Number>,
    pub exclusive_minimum: Option<Number>,
    pub max_length: Option<u64>,
    pub min_length: Option<u64>,
    pub pattern: Option<String>,
    pub max_items: Option<u64>,
    pub min_items: Option<u64>,
    pub unique_items: Option<bool>,
    pub max_properties: Option<u64>,
    pub min_properties: Option<u64>,
    pub required: Vec<String>,
    pub properties: IndexMap<String, ModelRef<JsonSchema>>,
    pub pattern_properties: IndexMap<String, ModelRef<JsonSchema>>,
    pub additional_properties: Option<AdditionalProperties>,
    pub items: Option<SchemaItems>,
    pub all_of: Vec<ModelRef<JsonSchema>>,
    pub any_of: Vec<ModelRef<JsonSchema>>,
    pub one_of: Vec<ModelRef<JsonSchema>>,
    pub not: Option<ModelRef<JsonSchema>>,
    pub discriminator: Option<String>,
    pub read_only: Option<bool>,
    pub write_only: Option<bool>,
    pub deprecated: Option<bool>,
    pub external_docs: Option<ModelRef<ExternalDocumentation>>,
    pub keywords: IndexMap<String, AsyncApiAny>,
    pub extensions: Extensions,
}
