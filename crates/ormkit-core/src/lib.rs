//! Core runtime for ormkit: dynamic values, the object accessor capability,
//! class metadata, the unit of work, and the object manager that ties
//! persisters, repositories, id generators, and lifecycle listeners together.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod changeset;
pub mod config;
pub mod error;
pub mod event;
pub mod factory;
pub mod id;
pub mod identifier;
pub mod manager;
pub mod mapper;
pub mod memory;
pub mod metadata;
pub mod object;
pub mod obs;
pub mod traits;
pub mod uow;
pub mod value;

pub use error::Error;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, stores, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        event::{Event, EventArgs, ListenerError},
        identifier::Identifier,
        manager::ObjectManager,
        object::{ObjectRef, Persistable, Ref},
        traits::Path,
        value::Value,
    };
}
