use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError, RwLock},
};

///
/// MetadataCache
///
/// External key/value store for serialized class metadata. Writes may be
/// deferred until `commit`.
///

pub trait MetadataCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn save_deferred(&self, key: &str, value: String);

    fn commit(&self);
}

///
/// MemoryMetadataCache
///

#[derive(Default)]
pub struct MemoryMetadataCache {
    entries: RwLock<HashMap<String, String>>,
    deferred: Mutex<Vec<(String, String)>>,
}

impl MemoryMetadataCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.deferred
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl MetadataCache for MemoryMetadataCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn save_deferred(&self, key: &str, value: String) {
        self.deferred
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((key.to_string(), value));
    }

    fn commit(&self) {
        let pending = std::mem::take(&mut *self.deferred.lock().unwrap_or_else(PoisonError::into_inner));

        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(pending);
    }
}
