//! Validation rules run after a document has been read
//!
//! A rule is a named function over the finished document and its workspace.
//! Rules append to a [`ValidationContext`] whose findings end up in the same
//! diagnostics list as parse problems. The built-in catalog lives in
//! [`rules`]; hosts add their own with [`ValidationRule::new`].

pub mod rules;

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::location::LocationStack;
use crate::model::Document;
use crate::workspace::Workspace;

pub use rules::default_rules;

type RuleFn = dyn Fn(&Document, &Workspace, &mut ValidationContext) + Send + Sync;

/// A named check over a read document
#[derive(Clone)]
pub struct ValidationRule {
    name: String,
    check: Arc<RuleFn>,
}

impl ValidationRule {
    pub fn new(
        name: impl Into<String>,
        check: impl Fn(&Document, &Workspace, &mut ValidationContext) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, document: &Document, workspace: &Workspace, ctx: &mut ValidationContext) {
        (self.check)(document, workspace, ctx)
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule").field("name", &self.name).finish()
    }
}

/// Findings of one rule run, tagged with the location being checked
#[derive(Debug)]
pub struct ValidationContext {
    rule: String,
    location: LocationStack,
    diagnostics: Vec<Diagnostic>,
}

impl ValidationContext {
    pub fn new(rule: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            location: LocationStack::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Run `f` with `segment` pushed onto the location
    pub fn with_segment<R>(&mut self, segment: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        self.location.push(segment);
        let result = f(self);
        self.location.pop();
        result
    }

    pub fn location(&self) -> String {
        self.location.pointer()
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let code = DiagnosticCode::Rule(self.rule.clone());
        self.report(Diagnostic::error(code, message));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        let code = DiagnosticCode::Rule(self.rule.clone());
        self.report(Diagnostic::warning(code, message));
    }

    /// Report with an explicit code at the current location
    pub fn error_with_code(&mut self, code: DiagnosticCode, message: impl Into<String>) {
        self.report(Diagnostic::error(code, message));
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        let pointer = self.location();
        self.diagnostics.push(diagnostic.with_pointer(pointer));
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// Run every rule in order and collect their findings
pub fn run(
    rules: &[ValidationRule],
    document: &Document,
    workspace: &Workspace,
) -> Vec<Diagnostic> {
    let mut findings = Vec::new();
    for rule in rules {
        let mut ctx = ValidationContext::new(rule.name());
        rule.check(document, workspace, &mut ctx);
        let diagnostics = ctx.into_diagnostics();
        if !diagnostics.is_empty() {
            debug!(
                rule = rule.name(),
                count = diagnostics.len(),
                "validation rule reported findings"
            );
        }
        findings.extend(diagnostics);
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_rule_reports_under_its_name() {
        let rule = ValidationRule::new(
            "no-id",
            |document: &Document, _: &Workspace, ctx: &mut ValidationContext| {
                if document.id.is_none() {
                    ctx.with_segment("id", |ctx| ctx.warning("documents should declare an id"));
                }
            },
        );

        let findings = run(&[rule], &Document::default(), &Workspace::new());

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, DiagnosticCode::Rule("no-id".into()));
        assert_eq!(findings[0].pointer, "#/id");
        assert!(findings[0].is_warning());
    }

    #[test]
    fn test_rule_debug_shows_name() {
        let rule = ValidationRule::new(
            "noop",
            |_: &Document, _: &Workspace, _: &mut ValidationContext| {},
        );
        assert_eq!(format!("{:?}", rule), "ValidationRule { name: \"noop\" }");
    }
}
