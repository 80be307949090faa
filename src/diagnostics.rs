//! Diagnostics collected while reading and validating a document
//!
//! A single diagnostic type is used for parse problems, plugin failures and
//! validation rule findings. Every diagnostic carries the JSON-Pointer location
//! of the offending node.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::version::AsyncApiVersion;

/// Diagnostic severity level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

/// Diagnostic codes for categorizing issues
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // =========================================================================
    // Structural errors
    // =========================================================================
    MissingField,
    UnexpectedShape,
    InvalidValue,
    UnmappedMember,
    DuplicateKey,

    // =========================================================================
    // Plugin failures
    // =========================================================================
    UnknownBinding,
    BindingFailed,
    ExtensionFailed,

    // =========================================================================
    // Upgrade findings
    // =========================================================================
    UnknownSecurityScheme,
    UnsupportedSchemaFormat,
    VersionMismatch,

    // =========================================================================
    // Validation
    // =========================================================================
    UnresolvedReference,
    Rule(String),
}

/// A single finding with its location
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    /// JSON-Pointer in fragment form, e.g. `#/channels/lightMeasured`
    pub pointer: String,
}

impl Diagnostic {
    /// Create an error diagnostic
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            pointer: "#/".to_string(),
        }
    }

    /// Create a warning diagnostic
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            pointer: "#/".to_string(),
        }
    }

    /// Attach a location
    pub fn with_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.pointer = pointer.into();
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self.severity, Severity::Warning)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "[{}] {}: {}", level, self.pointer, self.message)
    }
}

/// Append-only list of diagnostics for one document
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Version the document declared, once it is known
    pub specification_version: Option<AsyncApiVersion>,
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty list for a document of `version`
    pub fn for_version(version: AsyncApiVersion) -> Self {
        Self {
            specification_version: Some(version),
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(diagnostics);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.is_warning())
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    /// Diagnostics carrying the given code
    pub fn with_code<'a>(
        &'a self,
        code: &DiagnosticCode,
    ) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        let code = code.clone();
        self.items.iter().filter(move |d| d.code == code)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let diag = Diagnostic::error(DiagnosticCode::MissingField, "`title` is required")
            .with_pointer("#/info");
        assert!(diag.is_error());
        assert!(!diag.is_warning());
        assert_eq!(diag.pointer, "#/info");
        assert_eq!(diag.to_string(), "[error] #/info: `title` is required");
    }

    #[test]
    fn test_errors_and_warnings_split() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::warning(DiagnosticCode::DuplicateKey, "dup"));
        assert!(!diagnostics.has_errors());
        diagnostics.push(Diagnostic::error(DiagnosticCode::UnmappedMember, "unknown"));
        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.errors().count(), 1);
        assert_eq!(diagnostics.warnings().count(), 1);
        assert_eq!(diagnostics.with_code(&DiagnosticCode::DuplicateKey).count(), 1);
    }

    #[test]
    fn test_for_version_starts_empty() {
        let diagnostics = Diagnostics::for_version(AsyncApiVersion::V2);
        assert_eq!(diagnostics.specification_version, Some(AsyncApiVersion::V2));
        assert!(diagnostics.is_empty());
    }
}
