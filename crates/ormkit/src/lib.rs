//! ## Crate layout
//! - `core` modules (re-exported at the root): values, identifiers, the
//!   object accessor capability, class metadata, the unit of work, and the
//!   object manager.
//! - `mapping`: the reflection driver that reads doc-comment tags from Rust
//!   sources.
//! - `Persistable`: derive macro generating the per-type accessor.
//!
//! The `prelude` module holds the vocabulary most application code needs.

pub use ormkit_core as core;
pub use ormkit_mapping as mapping;

pub use ormkit_core::{
    Error, changeset, config, error, event, factory, id, identifier, manager, mapper, memory,
    metadata, object, obs, traits, uow, value,
};
pub use ormkit_derive::Persistable;

// derive output names `::ormkit`, which must resolve inside this crate too
extern crate self as ormkit;

/// Workspace version re-export for downstream tooling and tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

use std::sync::Arc;

/// Scan the configured source roots and wrap the resulting driver in a
/// metadata factory named after the configured cache region.
pub fn metadata_factory(
    config: &config::Configuration,
) -> Result<factory::MetadataFactory, mapping::ScanError> {
    let driver = mapping::ReflectionDriver::new(config)?;
    tracing::debug!(
        types = driver.index().len(),
        roots = config.source_roots.len(),
        "source roots scanned"
    );
    let factory = factory::MetadataFactory::new(driver);

    Ok(match &config.cache_region {
        Some(region) => factory.with_region(region.clone()),
        None => factory,
    })
}

/// Manager builder over a scanned factory with the configuration applied.
pub fn manager_builder(
    config: &config::Configuration,
) -> Result<(Arc<factory::MetadataFactory>, manager::ObjectManagerBuilder), mapping::ScanError> {
    let factory = Arc::new(metadata_factory(config)?);
    let builder = manager::ObjectManager::builder(Arc::clone(&factory)).configuration(config);

    Ok((factory, builder))
}

///
/// Prelude
///
/// Domain vocabulary plus the derive. Stores, caches, and error enums stay
/// in their modules.
///

pub mod prelude {
    pub use crate::{
        Persistable,
        config::Configuration,
        event::{Event, EventArgs, ListenerError},
        identifier::Identifier,
        manager::ObjectManager,
        mapping::ReflectionDriver,
        object::{ObjectRef, Persistable as _, Ref},
        traits::Path as _,
        value::Value,
    };
}
