//! Error types for reading and writing AsyncAPI documents
//!
//! Content problems inside a document never surface here: they are collected
//! as [`crate::diagnostics::Diagnostic`]s and the reader keeps going. The
//! errors below are the few conditions where no typed model can be produced
//! or no wire shape can be written.

use thiserror::Error;

/// Fatal errors raised while reading a document
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Unsupported AsyncAPI version '{0}': only 2.x and 3.x documents can be read")]
    UnsupportedVersion(String),

    #[error("Document does not declare an `asyncapi` version and no version hint was given")]
    MissingVersion,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors raised while writing a document
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Cannot express {construct} at {location} in AsyncAPI 2.x")]
    UnsupportedInV2 { construct: String, location: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result alias used by the writer
pub type WriteResult<T> = std::result::Result<T, WriteError>;
