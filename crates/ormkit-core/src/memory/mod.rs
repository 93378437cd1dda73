//! Module: memory
//! Responsibility: an in-process store that plays persister, repository, and
//! object container for one type. Used by tests and embedding callers.
//!
//! Rows hold fetched `ObjectData`, keyed by the identifier's stable key.

#[cfg(test)]
mod tests;

use crate::{
    Error,
    changeset::Snapshot,
    factory::MetadataFactory,
    identifier::Identifier,
    manager::{ObjectContainer, PersistError, Persister, Repository},
    mapper::{
        EmbeddedObjectFactory, JsonEmbeddedObjectFactory, MetadataPropertyMapper, ObjectData,
        PropertyMapper,
    },
    metadata::{ClassMetadata, is_integer_type},
    object::{ObjectRef, Persistable, RuntimeId},
    traits::Path,
    value::Value,
};
use indexmap::IndexMap;
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
    sync::Arc,
};

type Instantiate = Box<dyn Fn() -> Box<dyn Persistable>>;

///
/// MemoryStore
///

pub struct MemoryStore {
    factory: Arc<MetadataFactory>,
    metadata: Arc<ClassMetadata>,
    mapper: Rc<MetadataPropertyMapper>,
    instantiate: Instantiate,
    rows: RefCell<IndexMap<String, ObjectData>>,
    identity_map: RefCell<IndexMap<RuntimeId, (String, ObjectRef)>>,
    originals: RefCell<HashMap<RuntimeId, Snapshot>>,
    // None once the integer space is used up
    next_auto_id: Cell<Option<i64>>,
}

impl MemoryStore {
    /// Store for `T`, using the factory's metadata for `T::PATH`.
    pub fn new<T>(factory: Arc<MetadataFactory>) -> Result<Self, Error>
    where
        T: Persistable + Path + Default,
    {
        Self::with_embedded::<T>(factory, Rc::new(JsonEmbeddedObjectFactory))
    }

    pub fn with_embedded<T>(
        factory: Arc<MetadataFactory>,
        embedded: Rc<dyn EmbeddedObjectFactory>,
    ) -> Result<Self, Error>
    where
        T: Persistable + Path + Default,
    {
        let metadata = factory.metadata_for(T::PATH)?;
        let mapper = Rc::new(MetadataPropertyMapper::new(Arc::clone(&metadata), embedded));

        Ok(Self {
            factory,
            metadata,
            mapper,
            instantiate: Box::new(|| -> Box<dyn Persistable> { Box::new(T::default()) }),
            rows: RefCell::new(IndexMap::new()),
            identity_map: RefCell::new(IndexMap::new()),
            originals: RefCell::new(HashMap::new()),
            next_auto_id: Cell::new(Some(1)),
        })
    }

    #[must_use]
    pub fn metadata(&self) -> &ClassMetadata {
        &self.metadata
    }

    /// Stored row for an identifier.
    #[must_use]
    pub fn row(&self, identifier: &Identifier) -> Option<ObjectData> {
        self.rows.borrow().get(&identifier.key()).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.borrow().is_empty()
    }

    /// Objects currently held in the identity map.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.identity_map.borrow().len()
    }

    /// The single integer identifier field, when the type has exactly one.
    fn auto_increment_field(&self) -> Option<&str> {
        match self.metadata.identifier_field_names().as_slice() {
            [name] => self
                .metadata
                .field_mapping(name)
                .ok()
                .filter(|field| is_integer_type(&field.type_name))
                .map(|field| field.field_name.as_str()),
            _ => None,
        }
    }

    fn assign_auto_id(&self, object: &ObjectRef) -> Result<(), PersistError> {
        let Some(field) = self.auto_increment_field() else {
            return Ok(());
        };

        match object.get_value(field) {
            Some(Value::Null) | None => {
                let id = self.next_auto_id.get().ok_or_else(|| {
                    PersistError::backend(object.type_path(), "auto-increment identifiers exhausted")
                })?;
                self.next_auto_id.set(id.checked_add(1));

                object
                    .set_value(field, Value::Int(id))
                    .map_err(|err| PersistError::backend(object.type_path(), err.to_string()))
            }
            Some(value) => {
                if let Some(id) = value.as_int()
                    && self.next_auto_id.get().is_some_and(|next| id >= next)
                {
                    self.next_auto_id.set(id.checked_add(1));
                }

                Ok(())
            }
        }
    }

    fn track(&self, key: String, object: &ObjectRef) {
        self.identity_map
            .borrow_mut()
            .insert(object.runtime_id(), (key, object.clone()));
    }

    fn tracked_by_key(&self, key: &str) -> Option<ObjectRef> {
        self.identity_map
            .borrow()
            .values()
            .find(|(tracked, _)| tracked == key)
            .map(|(_, object)| object.clone())
    }
}

impl Persister for MemoryStore {
    fn persist(&self, object: &ObjectRef) -> Result<(), PersistError> {
        self.assign_auto_id(object)?;

        let identifier = self.metadata.identifier_values(object);
        if !identifier.is_complete() {
            return Err(PersistError::UnresolvedIdentifier {
                type_path: object.type_path().to_string(),
                identifier,
            });
        }

        let mut data = ObjectData::new();
        self.mapper
            .fetch_object_properties(&mut data, object, self.factory.as_ref())
            .map_err(|err| PersistError::backend(object.type_path(), err.to_string()))?;

        let key = identifier.key();
        self.rows.borrow_mut().insert(key.clone(), data);
        self.track(key, object);

        Ok(())
    }

    /// Deleting an absent row is a no-op.
    fn remove(&self, object: &ObjectRef) -> Result<(), PersistError> {
        let identifier = self.metadata.identifier_values(object);
        self.rows.borrow_mut().shift_remove(&identifier.key());
        self.identity_map
            .borrow_mut()
            .shift_remove(&object.runtime_id());
        self.originals.borrow_mut().remove(&object.runtime_id());

        Ok(())
    }
}

impl Repository for MemoryStore {
    fn find(&self, identifier: &Identifier) -> Result<Option<ObjectRef>, Error> {
        let key = identifier.key();
        if let Some(object) = self.tracked_by_key(&key) {
            return Ok(Some(object));
        }

        let Some(data) = self.rows.borrow().get(&key).cloned() else {
            return Ok(None);
        };

        let object = ObjectRef::from_boxed((self.instantiate)());
        self.mapper.assign_object_properties(&object, &data, None)?;

        self.track(key, &object);
        self.originals
            .borrow_mut()
            .insert(object.runtime_id(), Snapshot::capture(&self.metadata, &object));

        Ok(Some(object))
    }

    fn container(&self) -> Option<&dyn ObjectContainer> {
        Some(self)
    }

    fn property_mapper(&self) -> Option<Rc<dyn PropertyMapper>> {
        Some(self.mapper.clone())
    }
}

impl ObjectContainer for MemoryStore {
    fn contains(&self, object: &ObjectRef) -> bool {
        self.identity_map
            .borrow()
            .contains_key(&object.runtime_id())
    }

    fn attach(&self, object: &ObjectRef) {
        let key = self.metadata.identifier_values(object).key();
        self.track(key, object);
    }

    fn detach(&self, object: &ObjectRef) {
        self.identity_map
            .borrow_mut()
            .shift_remove(&object.runtime_id());
        self.originals.borrow_mut().remove(&object.runtime_id());
    }

    fn detach_all(&self) {
        self.identity_map.borrow_mut().clear();
        self.originals.borrow_mut().clear();
    }

    fn original_copy(&self, object: &ObjectRef) -> Option<Snapshot> {
        self.originals.borrow().get(&object.runtime_id()).cloned()
    }

    fn set_original_copy(&self, object: &ObjectRef, snapshot: Snapshot) {
        self.originals
            .borrow_mut()
            .insert(object.runtime_id(), snapshot);
    }
}
