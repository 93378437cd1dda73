//! Collaborator contracts consumed by the object manager.

use crate::{
    Error,
    changeset::Snapshot,
    factory::MetadataSource,
    identifier::Identifier,
    mapper::PropertyMapper,
    object::ObjectRef,
};
use std::rc::Rc;
use thiserror::Error as ThisError;

///
/// PersistError
///

#[derive(Debug, ThisError)]
#[remain::sorted]
pub enum PersistError {
    #[error("storage failure for '{type_path}': {message}")]
    Backend { type_path: String, message: String },

    #[error("cannot persist '{type_path}': identifier {identifier} is incomplete")]
    UnresolvedIdentifier {
        type_path: String,
        identifier: Identifier,
    },
}

impl PersistError {
    pub fn backend(type_path: &str, message: impl Into<String>) -> Self {
        Self::Backend {
            type_path: type_path.to_string(),
            message: message.into(),
        }
    }
}

///
/// Persister
///
/// Per-type storage side effects. `persist` covers both inserts and
/// updates; the store decides by identifier.
///

pub trait Persister {
    fn persist(&self, object: &ObjectRef) -> Result<(), PersistError>;

    fn remove(&self, object: &ObjectRef) -> Result<(), PersistError>;
}

///
/// ObjectContainer
///
/// Optional identity-tracking capability of a repository. When present the
/// manager keeps it in sync with persist, remove, and detach.
///

pub trait ObjectContainer {
    fn contains(&self, object: &ObjectRef) -> bool;

    fn attach(&self, object: &ObjectRef);

    fn detach(&self, object: &ObjectRef);

    fn detach_all(&self);

    fn original_copy(&self, object: &ObjectRef) -> Option<Snapshot>;

    fn set_original_copy(&self, object: &ObjectRef, snapshot: Snapshot);
}

///
/// Repository
///

pub trait Repository {
    fn find(&self, identifier: &Identifier) -> Result<Option<ObjectRef>, Error>;

    fn container(&self) -> Option<&dyn ObjectContainer> {
        None
    }

    /// Mapper used by `refresh` to copy fresh state back onto an instance.
    fn property_mapper(&self) -> Option<Rc<dyn PropertyMapper>> {
        None
    }
}

///
/// ObjectResolver
///
/// Lookup surface handed to id generators and property mappers.
///

pub trait ObjectResolver: MetadataSource {
    fn find_object(
        &self,
        type_name: &str,
        identifier: &Identifier,
    ) -> Result<Option<ObjectRef>, Error>;
}
