//! asyncapi-core - AsyncAPI document model
//!
//! Reads AsyncAPI 2.x and 3.x documents into one v3-shaped object graph and
//! writes that graph back out in either version.
//!
//! ## Pipeline
//! Text -> ParseNode -> field dispatch -> typed model (+ v2 upgrade)
//! -> Workspace registration -> validation rules -> ReadResult
//!
//! Content problems never abort a parse: they are collected as diagnostics
//! beside a best-effort document. References stay lazy and resolve through the
//! [`workspace::Workspace`] returned with the document.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use asyncapi_core::{parse, serialize, AsyncApiVersion, OutputFormat, ParseNode};
//!
//! let text = std::fs::read_to_string("streetlights.yaml").unwrap();
//! let root = ParseNode::from_yaml_str(&text).unwrap();
//! let result = parse(&root, None).unwrap();
//! for diagnostic in result.diagnostics.iter() {
//!     eprintln!("{}", diagnostic);
//! }
//! let v3 = serialize(&result.document, AsyncApiVersion::V3, OutputFormat::Yaml).unwrap();
//! ```

// Parse tree and locations
pub mod location;
pub mod node;

// Reading
pub mod context;
pub mod dispatch;
pub mod reader;

// Object graph and resolution
pub mod model;
pub mod workspace;

// Writing
pub mod writer;

// Post-parse rules
pub mod validation;

// Configuration, findings and errors
pub mod diagnostics;
pub mod error;
pub mod settings;
pub mod version;

// Re-export commonly used types
pub use diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, Severity};
pub use error::{ReadError, WriteError, WriteResult};
pub use model::{Document, ModelRef, Reference, ReferenceKind};
pub use node::ParseNode;
pub use reader::{parse, parse_fragment, AsyncApiReader, ReadResult};
pub use settings::{InlinePolicy, ReaderSettings, WriterSettings};
pub use version::AsyncApiVersion;
pub use workspace::Workspace;
pub use writer::{serialize, to_value, write_fragment, AsyncApiWriter, OutputFormat};
