//! Module: object
//! Responsibility: accessor capability over domain objects and the shared
//! handle the tracker and persisters pass around.
//! Does not own: metadata (which fields exist) or tracking state.
//!
//! Invariants:
//! - Field access goes through `Persistable`, never through ambient reflection.
//! - A `RuntimeId` is issued once per handle and never reused in-process.

#[cfg(test)]
mod tests;

use crate::{
    event::{EventArgs, ListenerError},
    obs::sink::{self, ManagerEvent},
    value::{Value, ValueError},
};
use derive_more::Display;
use std::{
    any::Any,
    cell::{OnceCell, Ref as CellRef, RefCell},
    fmt,
    marker::PhantomData,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};
use thiserror::Error as ThisError;

static NEXT_RUNTIME_ID: AtomicU64 = AtomicU64::new(1);

///
/// AccessError
///

#[derive(Debug, ThisError)]
#[remain::sorted]
pub enum AccessError {
    #[error("invalid value for '{type_path}.{field}': {source}")]
    InvalidValue {
        type_path: String,
        field: String,
        #[source]
        source: ValueError,
    },

    #[error("type '{type_path}' has no accessible member '{field}'")]
    UnknownField { type_path: String, field: String },
}

impl AccessError {
    #[must_use]
    pub fn unknown_field(type_path: &str, field: &str) -> Self {
        Self::UnknownField {
            type_path: type_path.to_string(),
            field: field.to_string(),
        }
    }

    #[must_use]
    pub fn invalid_value(type_path: &str, field: &str, source: ValueError) -> Self {
        Self::InvalidValue {
            type_path: type_path.to_string(),
            field: field.to_string(),
            source,
        }
    }
}

///
/// Persistable
///
/// Per-type accessor capability: get and set persistable state by name
/// regardless of field visibility. Usually generated by `#[derive(Persistable)]`.
///

pub trait Persistable: Any {
    fn type_path(&self) -> &'static str;

    fn get_value(&self, field: &str) -> Option<Value>;

    fn set_value(&mut self, field: &str, value: Value) -> Result<(), AccessError>;

    fn get_association(&self, _name: &str) -> Option<Association> {
        None
    }

    fn set_association(&mut self, name: &str, _association: Association) -> Result<(), AccessError> {
        Err(AccessError::unknown_field(self.type_path(), name))
    }

    /// Run an instance lifecycle callback; `None` when no such method exists.
    fn invoke_callback(
        &mut self,
        _method: &str,
        _args: &EventArgs,
    ) -> Option<Result<(), ListenerError>> {
        None
    }
}

///
/// RuntimeId
///
/// Opaque in-process identity of an object handle. Unrelated to the
/// persisted identifier.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("#{_0}")]
pub struct RuntimeId(u64);

impl RuntimeId {
    fn issue() -> Self {
        Self(NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

///
/// ObjectRef
///
/// Shared handle to a domain object. Cloning the handle shares the object;
/// identity comparisons use `ptr_eq` or the runtime id.
///

#[derive(Clone)]
pub struct ObjectRef {
    inner: Rc<ObjectCell>,
}

struct ObjectCell {
    runtime_id: OnceCell<RuntimeId>,
    object: RefCell<Box<dyn Persistable>>,
}

impl ObjectRef {
    pub fn new<T: Persistable>(object: T) -> Self {
        Self::from_boxed(Box::new(object))
    }

    #[must_use]
    pub fn from_boxed(object: Box<dyn Persistable>) -> Self {
        Self {
            inner: Rc::new(ObjectCell {
                runtime_id: OnceCell::new(),
                object: RefCell::new(object),
            }),
        }
    }

    /// Runtime identity, issued on first request.
    #[must_use]
    pub fn runtime_id(&self) -> RuntimeId {
        *self.inner.runtime_id.get_or_init(RuntimeId::issue)
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn type_path(&self) -> &'static str {
        self.borrow().type_path()
    }

    #[must_use]
    pub fn get_value(&self, field: &str) -> Option<Value> {
        self.borrow().get_value(field)
    }

    /// Value of a mapped field, `Null` when unset. A field the accessor does
    /// not know also reads as `Null` and is reported to the sink.
    #[must_use]
    pub fn mapped_value(&self, field: &str) -> Value {
        self.get_value(field).unwrap_or_else(|| {
            sink::record(ManagerEvent::UnknownField {
                type_path: self.type_path(),
                field: field.to_string(),
            });
            Value::Null
        })
    }

    pub fn set_value(&self, field: &str, value: Value) -> Result<(), AccessError> {
        self.inner.object.borrow_mut().set_value(field, value)
    }

    #[must_use]
    pub fn get_association(&self, name: &str) -> Option<Association> {
        self.borrow().get_association(name)
    }

    pub fn set_association(&self, name: &str, association: Association) -> Result<(), AccessError> {
        self.inner
            .object
            .borrow_mut()
            .set_association(name, association)
    }

    /// Run an instance callback. The object stays mutably borrowed for the
    /// duration, so the callback must not reach it again through `args`.
    pub fn invoke_callback(
        &self,
        method: &str,
        args: &EventArgs,
    ) -> Option<Result<(), ListenerError>> {
        self.inner.object.borrow_mut().invoke_callback(method, args)
    }

    /// Typed read access; `None` when the object is not a `T`.
    pub fn read<T: Persistable, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let object = self.borrow();
        let any: &dyn Any = &**object;

        any.downcast_ref::<T>().map(f)
    }

    /// Typed write access; `None` when the object is not a `T`.
    pub fn write<T: Persistable, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut object = self.inner.object.borrow_mut();
        let any: &mut dyn Any = &mut **object;

        any.downcast_mut::<T>().map(f)
    }

    #[must_use]
    pub fn is<T: Persistable>(&self) -> bool {
        let object = self.borrow();
        let any: &dyn Any = &**object;

        any.is::<T>()
    }

    fn borrow(&self) -> CellRef<'_, Box<dyn Persistable>> {
        self.inner.object.borrow()
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("ObjectRef");
        out.field("type_path", &self.inner.object.try_borrow().map(|o| o.type_path()));
        if let Some(id) = self.inner.runtime_id.get() {
            out.field("runtime_id", id);
        }
        out.finish()
    }
}

///
/// Reference
///
/// Association value as seen by the runtime: either a raw identifier not yet
/// resolved, or a resolved object handle.
///

#[derive(Clone, Debug)]
pub enum Reference {
    Unresolved(Value),
    Resolved(ObjectRef),
}

impl Reference {
    #[must_use]
    pub const fn object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Resolved(object) => Some(object),
            Self::Unresolved(_) => None,
        }
    }

    #[must_use]
    pub const fn raw(&self) -> Option<&Value> {
        match self {
            Self::Unresolved(value) => Some(value),
            Self::Resolved(_) => None,
        }
    }

    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

///
/// Association
///

#[derive(Clone, Debug)]
pub enum Association {
    One(Option<Reference>),
    Many(Vec<Reference>),
}

impl Association {
    #[must_use]
    pub fn references(&self) -> Vec<&Reference> {
        match self {
            Self::One(reference) => reference.iter().collect(),
            Self::Many(references) => references.iter().collect(),
        }
    }
}

///
/// Ref
///
/// Typed association slot on a domain struct. `T` only names the target
/// type for mapping; the runtime value is a `Reference`.
///

pub struct Ref<T> {
    reference: Reference,
    marker: PhantomData<fn() -> T>,
}

impl<T> Ref<T> {
    #[must_use]
    pub const fn unresolved(value: Value) -> Self {
        Self {
            reference: Reference::Unresolved(value),
            marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn resolved(object: ObjectRef) -> Self {
        Self {
            reference: Reference::Resolved(object),
            marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn reference(&self) -> &Reference {
        &self.reference
    }

    #[must_use]
    pub fn into_reference(self) -> Reference {
        self.reference
    }

    #[must_use]
    pub const fn object(&self) -> Option<&ObjectRef> {
        self.reference.object()
    }
}

impl<T> From<Reference> for Ref<T> {
    fn from(reference: Reference) -> Self {
        Self {
            reference,
            marker: PhantomData,
        }
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self::from(self.reference.clone())
    }
}

impl<T> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Ref").field(&self.reference).finish()
    }
}
