//! References and the inline-or-pointer wrapper
//!
//! A [`ModelRef`] is either an owned value or a pointer to a canonical
//! location. Pointers never own their target: resolution goes through an
//! explicitly passed [`Workspace`], is lazy, and is memoized per pointer as a
//! weak link. An unresolved pointer is a valid value; reads through it yield
//! defaults.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::location;
use crate::workspace::{Component, Workspace};

/// Type tag carried by every reference
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    Schema,
    Server,
    ServerVariable,
    Channel,
    Operation,
    Message,
    SecurityScheme,
    Parameter,
    CorrelationId,
    OperationReply,
    OperationReplyAddress,
    OperationTrait,
    MessageTrait,
    Bindings,
    Tag,
    ExternalDocs,
}

/// A canonical location plus the kind of object expected there
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Reference {
    location: String,
    kind: ReferenceKind,
}

impl Reference {
    pub fn new(location: impl Into<String>, kind: ReferenceKind) -> Self {
        Self {
            location: location.into(),
            kind,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    /// Points into the current document (`#/...`)
    pub fn is_local(&self) -> bool {
        self.location.starts_with('#')
    }

    /// Unescaped last segment, used as a key when a reference is hoisted
    pub fn key(&self) -> String {
        location::last_segment(&self.location)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location)
    }
}

/// Model types that can be registered in a [`Workspace`] and referenced
pub trait Referenceable: Sized + 'static {
    const KIND: ReferenceKind;

    fn into_component(value: Rc<RefCell<Self>>) -> Component;

    fn from_component(component: &Component) -> Option<Rc<RefCell<Self>>>;

    /// Build the target from the raw source document when nothing is registered
    /// at `location`
    fn load_from_source(_location: &str, _workspace: &Workspace) -> Option<ModelRef<Self>> {
        None
    }
}

/// Pointer half of [`ModelRef`]
pub struct Pointer<T> {
    reference: Reference,
    target: OnceCell<Weak<RefCell<T>>>,
}

impl<T> Pointer<T> {
    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    /// Target from an earlier resolution, if it is still alive
    fn cached(&self) -> Option<Rc<RefCell<T>>> {
        self.target.get().and_then(Weak::upgrade)
    }
}

impl<T: Referenceable> Pointer<T> {
    fn resolve(&self, workspace: &Workspace) -> Option<Rc<RefCell<T>>> {
        if let Some(target) = self.cached() {
            return Some(target);
        }
        let target = workspace.resolve::<T>(&self.reference.location)?;
        let _ = self.target.set(Rc::downgrade(&target));
        Some(target)
    }
}

impl<T> Clone for Pointer<T> {
    fn clone(&self) -> Self {
        Self {
            reference: self.reference.clone(),
            target: self.target.clone(),
        }
    }
}

/// An owned value or a pointer to one
pub enum ModelRef<T> {
    Inline(Rc<RefCell<T>>),
    Pointer(Pointer<T>),
}

impl<T> ModelRef<T> {
    pub fn inline(value: T) -> Self {
        ModelRef::Inline(Rc::new(RefCell::new(value)))
    }

    /// Pointer with an explicit kind
    pub fn pointer_of(location: impl Into<String>, kind: ReferenceKind) -> Self {
        ModelRef::Pointer(Pointer {
            reference: Reference::new(location, kind),
            target: OnceCell::new(),
        })
    }

    pub fn reference(&self) -> Option<&Reference> {
        match self {
            ModelRef::Inline(_) => None,
            ModelRef::Pointer(pointer) => Some(&pointer.reference),
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, ModelRef::Pointer(_))
    }

    pub fn as_inline(&self) -> Option<&Rc<RefCell<T>>> {
        match self {
            ModelRef::Inline(value) => Some(value),
            ModelRef::Pointer(_) => None,
        }
    }

    /// Borrow an inline value without consulting a workspace
    pub fn borrow_inline(&self) -> Option<Ref<'_, T>> {
        self.as_inline().map(|value| value.borrow())
    }

    /// The owned value, when this is the only handle to it
    pub fn into_inline(self) -> Option<T> {
        match self {
            ModelRef::Inline(value) => Rc::try_unwrap(value).ok().map(RefCell::into_inner),
            ModelRef::Pointer(_) => None,
        }
    }
}

impl<T: Referenceable> ModelRef<T> {
    /// Pointer to `location` tagged with `T`'s kind
    pub fn pointer(location: impl Into<String>) -> Self {
        Self::pointer_of(location, T::KIND)
    }

    /// The target object, or `None` when the pointer does not resolve
    pub fn resolve(&self, workspace: &Workspace) -> Option<Rc<RefCell<T>>> {
        match self {
            ModelRef::Inline(value) => Some(Rc::clone(value)),
            ModelRef::Pointer(pointer) => pointer.resolve(workspace),
        }
    }

    pub fn is_unresolved(&self, workspace: &Workspace) -> bool {
        self.resolve(workspace).is_none()
    }

    /// Read through to the target; an unresolved pointer yields `R::default()`
    pub fn read<R: Default>(&self, workspace: &Workspace, f: impl FnOnce(&T) -> R) -> R {
        match self.resolve(workspace) {
            Some(target) => f(&target.borrow()),
            None => R::default(),
        }
    }

    /// Write through to the target; returns false when the pointer does not resolve
    pub fn write(&self, workspace: &Workspace, f: impl FnOnce(&mut T)) -> bool {
        match self.resolve(workspace) {
            Some(target) => {
                f(&mut target.borrow_mut());
                true
            }
            None => false,
        }
    }

    /// Both sides resolve to the same object, or neither resolves and the
    /// locations match
    pub fn same_target(&self, other: &ModelRef<T>, workspace: &Workspace) -> bool {
        match (self.resolve(workspace), other.resolve(workspace)) {
            (Some(a), Some(b)) => Rc::ptr_eq(&a, &b),
            (None, None) => match (self.reference(), other.reference()) {
                (Some(a), Some(b)) => a.location == b.location,
                _ => false,
            },
            _ => false,
        }
    }
}

impl<T> Clone for ModelRef<T> {
    fn clone(&self) -> Self {
        match self {
            ModelRef::Inline(value) => ModelRef::Inline(Rc::clone(value)),
            ModelRef::Pointer(pointer) => ModelRef::Pointer(pointer.clone()),
        }
    }
}

impl<T> From<T> for ModelRef<T> {
    fn from(value: T) -> Self {
        ModelRef::inline(value)
    }
}

/// Structural equality that never consults the resolution memo
///
/// Two pointers are equal when their references (location and kind) are
/// equal; two inline values when they share an allocation. An inline value
/// never equals a pointer. Use [`ModelRef::same_target`] to compare what two
/// handles point at.
impl<T> PartialEq for ModelRef<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ModelRef::Inline(a), ModelRef::Inline(b)) => Rc::ptr_eq(a, b),
            (ModelRef::Pointer(a), ModelRef::Pointer(b)) => a.reference == b.reference,
            _ => false,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ModelRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelRef::Inline(value) => match value.try_borrow() {
                Ok(value) => f.debug_tuple("Inline").field(&*value).finish(),
                Err(_) => f.write_str("Inline(<borrowed>)"),
            },
            ModelRef::Pointer(pointer) => f
                .debug_tuple("Pointer")
                .field(&pointer.reference.location)
                .finish(),
        }
    }
}
