//! Module: factory
//! Responsibility: build, cache, and serve class metadata per type name.
//! Does not own: how a driver derives metadata from declarations.
//!
//! Invariants:
//! - The runtime cache is always consulted first.
//! - Mapping errors are returned to the caller and never cached.
//! - Parent state is composed before the child's own declarations load.

mod cache;

#[cfg(test)]
mod tests;

pub use cache::{MemoryMetadataCache, MetadataCache};

use crate::{
    Error,
    metadata::{ClassMetadata, MappingError},
    obs::sink::{self, ManagerEvent},
};
use std::{
    any::type_name,
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

///
/// MappingDriver
///
/// Source of per-type mapping rules. The factory calls it at most once per
/// type and caller-visible cache miss.
///

pub trait MappingDriver: Send + Sync {
    /// Every non-transient type the driver knows about.
    fn all_type_names(&self) -> Result<Vec<String>, MappingError>;

    fn is_transient(&self, type_name: &str) -> Result<bool, MappingError>;

    fn is_mapped_superclass(&self, _type_name: &str) -> Result<bool, MappingError> {
        Ok(false)
    }

    fn parent_type_name(&self, type_name: &str) -> Result<Option<String>, MappingError>;

    /// Load the type's own declarations into `metadata`. Inherited state is
    /// already present when this runs.
    fn load_metadata_for_type(
        &self,
        type_name: &str,
        metadata: &mut ClassMetadata,
    ) -> Result<(), MappingError>;
}

///
/// MetadataSource
///
/// Anything that can hand out class metadata by type name.
///

pub trait MetadataSource {
    fn class_metadata(&self, type_name: &str) -> Result<Arc<ClassMetadata>, Error>;
}

///
/// MetadataFactory
///

pub struct MetadataFactory {
    driver: Box<dyn MappingDriver>,
    loaded: RwLock<HashMap<String, Arc<ClassMetadata>>>,
    cache: Option<Arc<dyn MetadataCache>>,
    region: String,
}

impl MetadataFactory {
    pub fn new(driver: impl MappingDriver + 'static) -> Self {
        Self {
            driver: Box::new(driver),
            loaded: RwLock::new(HashMap::new()),
            cache: None,
            region: type_name::<Self>().to_string(),
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn MetadataCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    #[must_use]
    pub fn driver(&self) -> &dyn MappingDriver {
        self.driver.as_ref()
    }

    ///
    /// LOOKUP
    ///

    pub fn metadata_for(&self, type_name: &str) -> Result<Arc<ClassMetadata>, Error> {
        if let Some(metadata) = self.loaded_metadata(type_name) {
            return Ok(metadata);
        }

        if let Some(metadata) = self.cached_metadata(type_name) {
            sink::record(ManagerEvent::MetadataCacheHit {
                type_name: type_name.to_string(),
                external: true,
            });

            return Ok(self.remember(type_name, metadata));
        }

        let metadata = self.build(type_name)?;
        sink::record(ManagerEvent::MetadataBuilt {
            type_name: type_name.to_string(),
        });

        if let Some(cache) = &self.cache
            && let Ok(encoded) = serde_json::to_string(&metadata)
        {
            cache.save_deferred(&self.cache_key(type_name), encoded);
        }

        Ok(self.remember(type_name, metadata))
    }

    /// Whether metadata for the type has already been loaded in-process.
    #[must_use]
    pub fn has_metadata_for(&self, type_name: &str) -> bool {
        self.read_loaded().contains_key(type_name)
    }

    pub fn is_transient(&self, type_name: &str) -> Result<bool, Error> {
        Ok(self.driver.is_transient(type_name)?)
    }

    pub fn all_metadata(&self) -> Result<Vec<Arc<ClassMetadata>>, Error> {
        self.driver
            .all_type_names()?
            .iter()
            .map(|name| self.metadata_for(name))
            .collect()
    }

    /// Seed the runtime cache with prebuilt metadata.
    pub fn set_metadata_for(&self, metadata: ClassMetadata) {
        let name = metadata.name().to_string();
        self.remember(&name, metadata);
    }

    /// Flush deferred writes to the external cache, if one is configured.
    pub fn commit_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.commit();
        }
    }

    /// External cache key: region, metadata implementation, and type name,
    /// with path separators flattened.
    #[must_use]
    pub fn cache_key(&self, type_path: &str) -> String {
        format!(
            "{}__{}__{}",
            self.region,
            type_name::<ClassMetadata>(),
            type_path
        )
        .replace("::", "_")
    }

    ///
    /// BUILD
    ///

    fn build(&self, type_name: &str) -> Result<ClassMetadata, Error> {
        let mut metadata = ClassMetadata::new(type_name);

        if let Some(parent) = self.driver.parent_type_name(type_name)?
            && (!self.driver.is_transient(&parent)? || self.driver.is_mapped_superclass(&parent)?)
        {
            let parent = self.metadata_for(&parent)?;
            metadata.inherit_from(&parent)?;
        }

        self.driver.load_metadata_for_type(type_name, &mut metadata)?;

        Ok(metadata)
    }

    fn cached_metadata(&self, type_name: &str) -> Option<ClassMetadata> {
        let cache = self.cache.as_ref()?;
        let encoded = cache.get(&self.cache_key(type_name))?;

        // an undecodable entry is treated as a miss and rebuilt
        serde_json::from_str(&encoded).ok()
    }

    fn loaded_metadata(&self, type_name: &str) -> Option<Arc<ClassMetadata>> {
        let metadata = self.read_loaded().get(type_name).cloned()?;
        sink::record(ManagerEvent::MetadataCacheHit {
            type_name: type_name.to_string(),
            external: false,
        });

        Some(metadata)
    }

    fn remember(&self, type_name: &str, metadata: ClassMetadata) -> Arc<ClassMetadata> {
        let metadata = Arc::new(metadata);
        self.loaded
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(type_name.to_string(), Arc::clone(&metadata));

        metadata
    }

    fn read_loaded(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<ClassMetadata>>> {
        self.loaded.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MetadataSource for MetadataFactory {
    fn class_metadata(&self, type_name: &str) -> Result<Arc<ClassMetadata>, Error> {
        self.metadata_for(type_name)
    }
}
