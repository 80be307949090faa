//! Per-document parsing state
//!
//! The context carries the location stack used for diagnostic pointers, the
//! diagnostics sink, the scoped side-storage used to defer decisions until the
//! whole document has been walked, and the active version that selects loaders.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::location::LocationStack;
use crate::node::ParseNode;
use crate::reader::Fragment;
use crate::settings::ReaderSettings;
use crate::version::AsyncApiVersion;

/// Side-storage keys used by the reader
pub mod temp_keys {
    /// Scopes listed in v2 security requirements, scoped by scheme name
    pub const SECURITY_SCHEME_SCOPES: &str = "SecuritySchemeScopes";
    /// Every v2 security requirement seen, with its location
    pub const SECURITY_SCHEME_USAGES: &str = "SecuritySchemeUsages";
}

/// Scope that keeps sibling entries of the same key apart
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TempScope {
    SecurityScheme(String),
    Location(String),
}

/// Scoped key/value storage that lives as long as one parse
#[derive(Default)]
pub struct TempStorage {
    entries: HashMap<(Option<TempScope>, String), Box<dyn Any>>,
}

impl TempStorage {
    pub fn get<T: 'static>(&self, key: &str, scope: Option<&TempScope>) -> Option<&T> {
        self.entries
            .get(&(scope.cloned(), key.to_string()))
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn get_mut<T: 'static>(&mut self, key: &str, scope: Option<&TempScope>) -> Option<&mut T> {
        self.entries
            .get_mut(&(scope.cloned(), key.to_string()))
            .and_then(|value| value.downcast_mut::<T>())
    }

    /// Store `value`; `None` removes the entry
    pub fn set<T: 'static>(&mut self, key: &str, value: Option<T>, scope: Option<TempScope>) {
        let slot = (scope, key.to_string());
        match value {
            Some(value) => {
                self.entries.insert(slot, Box::new(value));
            }
            None => {
                self.entries.remove(&slot);
            }
        }
    }

    /// Entry for `key`, created with `T::default()` when absent or of another type
    pub fn entry<T: Default + 'static>(&mut self, key: &str, scope: Option<TempScope>) -> &mut T {
        let slot = (scope, key.to_string());
        let value = self
            .entries
            .entry(slot)
            .or_insert_with(|| Box::new(T::default()));
        if !value.is::<T>() {
            *value = Box::new(T::default());
        }
        match value.downcast_mut::<T>() {
            Some(value) => value,
            None => unreachable!("entry was just replaced with the requested type"),
        }
    }

    /// Scopes holding an entry for `key`
    pub fn scopes(&self, key: &str) -> Vec<TempScope> {
        self.entries
            .keys()
            .filter(|(_, k)| k == key)
            .filter_map(|(scope, _)| scope.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for TempStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

/// Mutable state for one parse
pub struct ParsingContext<'a> {
    settings: &'a ReaderSettings,
    version: AsyncApiVersion,
    location: LocationStack,
    diagnostics: Diagnostics,
    temp: TempStorage,
}

impl<'a> ParsingContext<'a> {
    pub fn new(settings: &'a ReaderSettings, version: AsyncApiVersion) -> Self {
        Self {
            settings,
            version,
            location: LocationStack::new(),
            diagnostics: Diagnostics::for_version(version),
            temp: TempStorage::default(),
        }
    }

    pub fn settings(&self) -> &'a ReaderSettings {
        self.settings
    }

    pub fn version(&self) -> AsyncApiVersion {
        self.version
    }

    /// Push a location segment; must be paired with [`ParsingContext::exit`]
    pub fn enter(&mut self, segment: impl Into<String>) {
        self.location.push(segment);
    }

    pub fn exit(&mut self) {
        self.location.pop();
    }

    /// Run `f` with `segment` pushed, popping it afterwards
    pub fn with_segment<R>(
        &mut self,
        segment: impl Into<String>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        self.enter(segment);
        let result = f(self);
        self.exit();
        result
    }

    pub fn depth(&self) -> usize {
        self.location.depth()
    }

    /// Current location as a JSON pointer
    pub fn location(&self) -> String {
        self.location.pointer()
    }

    pub fn error(&mut self, code: DiagnosticCode, message: impl Into<String>) {
        let diagnostic = Diagnostic::error(code, message).with_pointer(self.location());
        self.diagnostics.push(diagnostic);
    }

    pub fn warning(&mut self, code: DiagnosticCode, message: impl Into<String>) {
        let diagnostic = Diagnostic::warning(code, message).with_pointer(self.location());
        self.diagnostics.push(diagnostic);
    }

    /// Append a diagnostic that already carries its location
    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    pub fn get_temp<T: 'static>(&self, key: &str, scope: Option<&TempScope>) -> Option<&T> {
        self.temp.get(key, scope)
    }

    /// Store a side-storage entry; `None` removes it
    pub fn set_temp<T: 'static>(&mut self, key: &str, value: Option<T>, scope: Option<TempScope>) {
        self.temp.set(key, value, scope);
    }

    pub fn temp_mut(&mut self) -> &mut TempStorage {
        &mut self.temp
    }

    pub fn temp(&self) -> &TempStorage {
        &self.temp
    }

    /// Load `node` with the active version's loader for `T`
    pub fn load<T: Fragment>(&mut self, node: &ParseNode) -> T {
        match self.version {
            AsyncApiVersion::V2 => T::load_v2(node, self),
            AsyncApiVersion::V3 => T::load_v3(node, self),
        }
    }
}

impl fmt::Debug for ParsingContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParsingContext")
            .field("version", &self.version)
            .field("location", &self.location())
            .field("diagnostics", &self.diagnostics.len())
            .field("temp", &self.temp)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_carry_location() {
        let settings = ReaderSettings::default();
        let mut ctx = ParsingContext::new(&settings, AsyncApiVersion::V3);
        ctx.with_segment("channels", |ctx| {
            ctx.with_segment("user/signedup", |ctx| {
                ctx.error(DiagnosticCode::MissingField, "`address` is required");
            })
        });
        assert_eq!(ctx.depth(), 0);
        assert_eq!(ctx.diagnostics().specification_version, Some(AsyncApiVersion::V3));
        let diagnostic = ctx.diagnostics().iter().next().unwrap();
        assert_eq!(diagnostic.pointer, "#/channels/user~1signedup");
    }

    #[test]
    fn test_temp_storage_scopes_do_not_mix() {
        let mut temp = TempStorage::default();
        let a = TempScope::SecurityScheme("a".into());
        let b = TempScope::SecurityScheme("b".into());
        temp.set("scopes", Some(vec!["read".to_string()]), Some(a.clone()));
        temp.set("scopes", Some(vec!["write".to_string()]), Some(b.clone()));

        assert_eq!(
            temp.get::<Vec<String>>("scopes", Some(&a)).unwrap(),
            &vec!["read".to_string()]
        );
        assert_eq!(
            temp.get::<Vec<String>>("scopes", Some(&b)).unwrap(),
            &vec!["write".to_string()]
        );
        assert!(temp.get::<Vec<String>>("scopes", None).is_none());
        assert_eq!(temp.scopes("scopes").len(), 2);
    }

    #[test]
    fn test_setting_none_removes_entry() {
        let mut temp = TempStorage::default();
        temp.set("key", Some(1u32), None);
        assert_eq!(temp.get::<u32>("key", None), Some(&1));
        temp.set::<u32>("key", None, None);
        assert!(temp.get::<u32>("key", None).is_none());
        assert!(temp.is_empty());
    }

    #[test]
    fn test_entry_creates_default() {
        let mut temp = TempStorage::default();
        temp.entry::<Vec<String>>("list", None).push("x".into());
        temp.entry::<Vec<String>>("list", None).push("y".into());
        assert_eq!(temp.get::<Vec<String>>("list", None).unwrap().len(), 2);
    }
}
