//! Field dispatch engine
//!
//! Every typed loader is a pair of tables:
//! - a [`FixedFieldMap`] from exact keys to handlers
//! - a [`PatternFieldMap`] from key predicates to handlers (`x-` extensions)
//!
//! [`parse_map`] walks a map node once, pushing each key onto the location
//! stack around its handler. Keys no table knows go through the configured
//! [`UnmappedMemberPolicy`].

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::context::ParsingContext;
use crate::diagnostics::DiagnosticCode;
use crate::model::{AsyncApiAny, Extensions};
use crate::node::{ListNode, MapNode, ParseNode};

/// Handler for one exact key
pub type FixedFieldHandler<T> = fn(&mut T, &ParseNode, &mut ParsingContext<'_>);

/// Handler for keys matched by a predicate; receives the key
pub type PatternFieldHandler<T> = fn(&mut T, &str, &ParseNode, &mut ParsingContext<'_>);

/// Predicate selecting keys for a pattern handler
pub type KeyPredicate = fn(&str) -> bool;

/// What happens to keys no handler claims
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedMemberPolicy {
    #[default]
    Ignore,
    Error,
}

pub struct FixedFieldMap<T> {
    handlers: HashMap<&'static str, FixedFieldHandler<T>>,
}

impl<T> FixedFieldMap<T> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn field(mut self, key: &'static str, handler: FixedFieldHandler<T>) -> Self {
        self.handlers.insert(key, handler);
        self
    }

    pub fn get(&self, key: &str) -> Option<FixedFieldHandler<T>> {
        self.handlers.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.handlers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<T> Default for FixedFieldMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for FixedFieldMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.handlers.keys().collect();
        keys.sort();
        f.debug_struct("FixedFieldMap").field("keys", &keys).finish()
    }
}

pub struct PatternFieldMap<T> {
    handlers: Vec<(KeyPredicate, PatternFieldHandler<T>)>,
}

impl<T> PatternFieldMap<T> {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    pub fn pattern(mut self, predicate: KeyPredicate, handler: PatternFieldHandler<T>) -> Self {
        self.handlers.push((predicate, handler));
        self
    }

    /// First handler whose predicate accepts `key`
    pub fn find(&self, key: &str) -> Option<PatternFieldHandler<T>> {
        self.handlers
            .iter()
            .find(|(predicate, _)| predicate(key))
            .map(|(_, handler)| *handler)
    }
}

impl<T> Default for PatternFieldMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk `map` into `target`
pub fn parse_map<T>(
    map: &MapNode,
    target: &mut T,
    fixed: &FixedFieldMap<T>,
    patterns: &PatternFieldMap<T>,
    ctx: &mut ParsingContext<'_>,
) {
    for (key, value) in map.iter() {
        ctx.enter(key);
        if let Some(handler) = fixed.get(key) {
            handler(target, value, ctx);
        } else if let Some(handler) = patterns.find(key) {
            handler(target, key, value, ctx);
        } else if ctx.settings().unmapped_member_policy == UnmappedMemberPolicy::Error {
            ctx.error(
                DiagnosticCode::UnmappedMember,
                format!("`{}` is not a valid member here", key),
            );
        }
        ctx.exit();
    }
}

/// Report every required key missing from `map`
pub fn require_fields(map: &MapNode, fields: &[&str], what: &str, ctx: &mut ParsingContext<'_>) {
    for field in fields {
        if !map.contains_key(field) {
            ctx.error(
                DiagnosticCode::MissingField,
                format!("`{}` is a required field of {}", field, what),
            );
        }
    }
}

// =============================================================================
// Extensions
// =============================================================================

pub fn is_extension(key: &str) -> bool {
    key.starts_with("x-")
}

/// Elements carrying `x-` members
pub trait Extensible {
    fn extensions_mut(&mut self) -> &mut Extensions;
}

/// Pattern table that stores `x-` members on the target
pub fn extension_patterns<T: Extensible>() -> PatternFieldMap<T> {
    PatternFieldMap::new().pattern(is_extension, |target, key, node, ctx| {
        let value = load_extension(key, node, ctx);
        target.extensions_mut().insert(key.to_string(), value);
    })
}

/// Raw extension value, passed through a registered parser when there is one
///
/// A failing parser is reported and the raw value is kept.
pub fn load_extension(key: &str, node: &ParseNode, ctx: &mut ParsingContext<'_>) -> AsyncApiAny {
    let raw = node.to_value();
    let Some(parser) = ctx.settings().extension_parser(key) else {
        return raw;
    };
    match parser(&raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            ctx.error(
                DiagnosticCode::ExtensionFailed,
                format!("extension `{}` could not be parsed: {:#}", key, err),
            );
            raw
        }
    }
}

// =============================================================================
// Node helpers
// =============================================================================

/// Shape checks and collection loaders that report through the context
pub trait NodeExt {
    fn expect_map(&self, what: &str, ctx: &mut ParsingContext<'_>) -> Option<&MapNode>;

    fn expect_list(&self, what: &str, ctx: &mut ParsingContext<'_>) -> Option<&ListNode>;

    fn scalar(&self, ctx: &mut ParsingContext<'_>) -> Option<String>;

    fn scalar_bool(&self, ctx: &mut ParsingContext<'_>) -> Option<bool>;

    fn scalar_number(&self, ctx: &mut ParsingContext<'_>) -> Option<Number>;

    fn scalar_u64(&self, ctx: &mut ParsingContext<'_>) -> Option<u64>;

    /// Load every entry of a map node, entering each key
    fn create_map<V>(
        &self,
        what: &str,
        ctx: &mut ParsingContext<'_>,
        loader: impl FnMut(&ParseNode, &mut ParsingContext<'_>) -> V,
    ) -> IndexMap<String, V>;

    /// Load every element of a list node, entering each index
    fn create_list<V>(
        &self,
        what: &str,
        ctx: &mut ParsingContext<'_>,
        loader: impl FnMut(&ParseNode, &mut ParsingContext<'_>) -> V,
    ) -> Vec<V>;

    /// List of scalars
    fn create_simple_list(&self, what: &str, ctx: &mut ParsingContext<'_>) -> Vec<String>;
}

impl NodeExt for ParseNode {
    fn expect_map(&self, what: &str, ctx: &mut ParsingContext<'_>) -> Option<&MapNode> {
        match self {
            ParseNode::Map(map) => Some(map),
            other => {
                ctx.error(
                    DiagnosticCode::UnexpectedShape,
                    format!("expected {} to be a map, found {}", what, other.kind_name()),
                );
                None
            }
        }
    }

    fn expect_list(&self, what: &str, ctx: &mut ParsingContext<'_>) -> Option<&ListNode> {
        match self {
            ParseNode::List(list) => Some(list),
            other => {
                ctx.error(
                    DiagnosticCode::UnexpectedShape,
                    format!("expected {} to be a list, found {}", what, other.kind_name()),
                );
                None
            }
        }
    }

    fn scalar(&self, ctx: &mut ParsingContext<'_>) -> Option<String> {
        match self {
            ParseNode::Scalar(scalar) => Some(scalar.as_str().to_string()),
            ParseNode::Null => None,
            other => {
                ctx.error(
                    DiagnosticCode::UnexpectedShape,
                    format!("expected a scalar, found {}", other.kind_name()),
                );
                None
            }
        }
    }

    fn scalar_bool(&self, ctx: &mut ParsingContext<'_>) -> Option<bool> {
        let text = self.scalar(ctx)?;
        match text.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            other => {
                ctx.error(
                    DiagnosticCode::InvalidValue,
                    format!("expected a boolean, found '{}'", other),
                );
                None
            }
        }
    }

    fn scalar_number(&self, ctx: &mut ParsingContext<'_>) -> Option<Number> {
        if let Some(AsyncApiAny::Number(number)) = self.as_scalar().map(|s| s.value()) {
            return Some(number.clone());
        }
        let text = self.scalar(ctx)?;
        match serde_json::from_str::<Number>(&text) {
            Ok(number) => Some(number),
            Err(_) => {
                ctx.error(
                    DiagnosticCode::InvalidValue,
                    format!("expected a number, found '{}'", text),
                );
                None
            }
        }
    }

    fn scalar_u64(&self, ctx: &mut ParsingContext<'_>) -> Option<u64> {
        let number = self.scalar_number(ctx)?;
        match number.as_u64() {
            Some(value) => Some(value),
            None => {
                ctx.error(
                    DiagnosticCode::InvalidValue,
                    format!("expected a non-negative integer, found {}", number),
                );
                None
            }
        }
    }

    fn create_map<V>(
        &self,
        what: &str,
        ctx: &mut ParsingContext<'_>,
        mut loader: impl FnMut(&ParseNode, &mut ParsingContext<'_>) -> V,
    ) -> IndexMap<String, V> {
        let Some(map) = self.expect_map(what, ctx) else {
            return IndexMap::new();
        };
        map.iter()
            .map(|(key, node)| {
                let value = ctx.with_segment(key, |ctx| loader(node, ctx));
                (key.to_string(), value)
            })
            .collect()
    }

    fn create_list<V>(
        &self,
        what: &str,
        ctx: &mut ParsingContext<'_>,
        mut loader: impl FnMut(&ParseNode, &mut ParsingContext<'_>) -> V,
    ) -> Vec<V> {
        let Some(list) = self.expect_list(what, ctx) else {
            return Vec::new();
        };
        list.iter()
            .enumerate()
            .map(|(index, node)| ctx.with_segment(index.to_string(), |ctx| loader(node, ctx)))
            .collect()
    }

    fn create_simple_list(&self, what: &str, ctx: &mut ParsingContext<'_>) -> Vec<String> {
        self.create_list(what, ctx, |node, ctx| node.scalar(ctx))
            .into_iter()
            .flatten()
            .collect()
    }
}
