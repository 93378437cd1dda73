//! Module: manager
//! Responsibility: the public persist/remove/find/flush/detach/refresh
//! contract, routing each call through the unit of work, metadata factory,
//! per-type persisters and repositories, id generators, and listeners.
//! Does not own: storage, or the transition rules (see `uow`).
//!
//! Invariants:
//! - Operations on a type with no persister fail at flush, never silently.
//! - Flush runs tasks in registration order; the first error stops it and
//!   leaves the remaining tasks pending.

mod builder;
mod contract;


pub use builder::ObjectManagerBuilder;
pub use contract::{ObjectContainer, ObjectResolver, PersistError, Persister, Repository};

use crate::{
    Error,
    changeset::{ChangeSet, Snapshot},
    error::ErrorClass,
    event::{Event, EventArgs, ListenerInvoker},
    factory::{MetadataFactory, MetadataSource},
    id::{GeneratedId, IdGeneratorRegistry},
    identifier::{Identifier, RawIdentifier},
    mapper::{EmbeddedObjectFactory, MetadataPropertyMapper, ObjectData, PropertyMapper},
    metadata::ClassMetadata,
    object::ObjectRef,
    obs::sink::{self, ManagerEvent},
    uow::{Operation, Task, UnitOfWork},
};
use std::{collections::HashMap, rc::Rc, sync::Arc};
use thiserror::Error as ThisError;

///
/// ManagerError
///

#[derive(Debug, ThisError)]
#[remain::sorted]
pub enum ManagerError {
    #[error("no persister is configured for '{type_path}'")]
    NoPersisterConfigured { type_path: String },

    #[error("no repository is configured for '{type_path}'")]
    NoRepositoryConfigured { type_path: String },

    #[error("object of type '{type_path}' is not managed")]
    NotManaged { type_path: String },

    #[error("'{type_path}' with identifier {identifier} no longer exists")]
    ObjectNotFound {
        type_path: String,
        identifier: Identifier,
    },

    #[error("'{type_path}' uses id generator '{generator}', which is not registered")]
    UnknownIdGenerator { type_path: String, generator: String },
}

impl ManagerError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::NoPersisterConfigured { .. }
            | Self::NoRepositoryConfigured { .. }
            | Self::UnknownIdGenerator { .. } => ErrorClass::Unsupported,
            Self::NotManaged { .. } | Self::ObjectNotFound { .. } => ErrorClass::NotFound,
        }
    }

    fn not_managed(object: &ObjectRef) -> Self {
        Self::NotManaged {
            type_path: object.type_path().to_string(),
        }
    }
}

///
/// ObjectManager
///
/// Single-threaded facade over one unit of work. Callers serialize access;
/// one manager per logical request is the intended shape.
///

pub struct ObjectManager {
    factory: Arc<MetadataFactory>,
    uow: UnitOfWork,
    persisters: HashMap<String, Rc<dyn Persister>>,
    repositories: HashMap<String, Rc<dyn Repository>>,
    id_generators: IdGeneratorRegistry,
    invoker: ListenerInvoker,
    embedded: Rc<dyn EmbeddedObjectFactory>,
}

impl ObjectManager {
    #[must_use]
    pub fn builder(factory: Arc<MetadataFactory>) -> ObjectManagerBuilder {
        ObjectManagerBuilder::new(factory)
    }

    ///
    /// INSPECTION
    ///

    pub fn class_metadata(&self, type_name: &str) -> Result<Arc<ClassMetadata>, Error> {
        self.factory.metadata_for(type_name)
    }

    #[must_use]
    pub const fn unit_of_work(&self) -> &UnitOfWork {
        &self.uow
    }

    #[must_use]
    pub const fn metadata_factory(&self) -> &Arc<MetadataFactory> {
        &self.factory
    }

    #[must_use]
    pub const fn listener_invoker(&self) -> &ListenerInvoker {
        &self.invoker
    }

    /// Managed by the unit of work or tracked by the type's repository, and
    /// not scheduled for removal.
    #[must_use]
    pub fn contains(&self, object: &ObjectRef) -> bool {
        self.uow.contains(object)
            || self
                .repository(object.type_path())
                .is_some_and(|repository| repository.container().is_some_and(|c| c.contains(object)))
    }

    /// Tracked by the unit of work, whatever its pending operation.
    #[must_use]
    pub fn is_managed(&self, object: &ObjectRef) -> bool {
        self.uow.is_managed(object)
    }

    ///
    /// LOOKUP
    ///

    /// Managed instances win over the repository, so a persisted but not yet
    /// flushed object is found by its identifier.
    pub fn find(
        &self,
        type_name: &str,
        identifier: impl Into<RawIdentifier>,
    ) -> Result<Option<ObjectRef>, Error> {
        let metadata = self.class_metadata(type_name)?;
        let identifier = identifier
            .into()
            .normalize(&metadata.identifier_field_names());

        let managed = self.uow.objects().find(|object| {
            object.type_path() == type_name
                && self.uow.contains(object)
                && metadata.identifier_values(object) == identifier
        });

        let found = match managed {
            Some(object) => Some(object.clone()),
            None => {
                let repository =
                    self.repository(type_name)
                        .ok_or_else(|| ManagerError::NoRepositoryConfigured {
                            type_path: type_name.to_string(),
                        })?;

                repository.find(&identifier)?
            }
        };

        sink::record(ManagerEvent::Lookup {
            type_name: type_name.to_string(),
            found: found.is_some(),
        });

        Ok(found)
    }

    ///
    /// REGISTRATION
    ///

    /// Schedule an insert, or an update when the object is already known.
    /// Repeated calls before flush never add work.
    pub fn persist(&mut self, object: &ObjectRef) -> Result<(), Error> {
        let metadata = self.class_metadata(object.type_path())?;

        if self.contains(object) {
            self.uow.check_transition(object, Operation::Update)?;
            self.ensure_tracked(&metadata, object);
            self.uow.update(object)?;
            registered(object, Operation::Update);

            return Ok(());
        }

        self.uow.check_transition(object, Operation::Insert)?;
        self.generate_identifier(&metadata, object)?;
        dispatch(&self.invoker, &metadata, Event::PrePersist, object)?;

        self.uow.insert(object)?;
        self.uow.mark_pre_persist_dispatched(object)?;

        let identity = metadata.identifier_values(object);
        if identity.is_complete() {
            self.uow.set_initial_identity(object, identity)?;
        }
        registered(object, Operation::Insert);

        Ok(())
    }

    /// Schedule a removal and drop the object from its repository's
    /// identity tracking right away.
    pub fn remove(&mut self, object: &ObjectRef) -> Result<(), Error> {
        if !self.contains(object) {
            return Err(ManagerError::not_managed(object).into());
        }

        let metadata = self.class_metadata(object.type_path())?;
        self.uow.check_transition(object, Operation::Remove)?;
        self.ensure_tracked(&metadata, object);
        self.uow.remove(object)?;

        if let Some(repository) = self.repository(object.type_path())
            && let Some(container) = repository.container()
        {
            container.detach(object);
        }
        registered(object, Operation::Remove);

        Ok(())
    }

    /// Stop tracking the object; pending work for it is discarded.
    pub fn detach(&mut self, object: &ObjectRef) -> Result<(), Error> {
        let repository = self.repository(object.type_path());
        let container = repository
            .as_deref()
            .and_then(|repository| repository.container())
            .filter(|container| container.contains(object));
        let in_uow = self.uow.is_managed(object);

        if !in_uow && container.is_none() {
            return Err(ManagerError::not_managed(object).into());
        }

        if in_uow {
            self.uow.detach(object)?;
        }
        if let Some(container) = container {
            container.detach(object);
        }

        sink::record(ManagerEvent::Detached {
            type_path: object.type_path(),
        });

        Ok(())
    }

    /// Reload persisted state onto `object`, discarding local changes and
    /// any pending operation.
    pub fn refresh(&mut self, object: &ObjectRef) -> Result<(), Error> {
        if !self.contains(object) {
            return Err(ManagerError::not_managed(object).into());
        }

        let type_path = object.type_path();
        let metadata = self.class_metadata(type_path)?;
        let repository = self
            .repository(type_path)
            .ok_or_else(|| ManagerError::NoRepositoryConfigured {
                type_path: type_path.to_string(),
            })?;

        let identifier = self
            .uow
            .initial_identity(object)
            .filter(|identity| identity.is_complete())
            .cloned()
            .unwrap_or_else(|| metadata.identifier_values(object));

        // the container forgets the object so the lookup loads a fresh row
        let parked = repository
            .container()
            .filter(|container| container.contains(object))
            .map(|container| {
                let original = container.original_copy(object);
                container.detach(object);
                original
            });

        let fresh = match repository.find(&identifier) {
            Ok(Some(fresh)) => fresh,
            outcome => {
                if let (Some(container), Some(original)) = (repository.container(), parked) {
                    container.attach(object);
                    if let Some(snapshot) = original {
                        container.set_original_copy(object, snapshot);
                    }
                }

                return Err(match outcome {
                    Err(err) => err,
                    _ => ManagerError::ObjectNotFound {
                        type_path: type_path.to_string(),
                        identifier,
                    }
                    .into(),
                });
            }
        };

        if self.uow.is_managed(object) {
            self.uow.detach(object)?;
        }

        let mapper: Rc<dyn PropertyMapper> = match repository.property_mapper() {
            Some(mapper) => mapper,
            None => Rc::new(MetadataPropertyMapper::new(
                Arc::clone(&metadata),
                Rc::clone(&self.embedded),
            )),
        };
        let mut data = ObjectData::new();
        mapper.fetch_object_properties(&mut data, &fresh, &*self)?;
        mapper.assign_object_properties(object, &data, Some(&*self))?;

        let snapshot = Snapshot::capture(&metadata, object);
        if let Some(container) = repository.container() {
            if !fresh.ptr_eq(object) {
                container.detach(&fresh);
            }
            container.attach(object);
            container.set_original_copy(object, snapshot.clone());
        }

        self.uow.attach(object, snapshot);
        let identity = metadata.identifier_values(object);
        if identity.is_complete() {
            self.uow.set_initial_identity(object, identity)?;
        }

        sink::record(ManagerEvent::Refreshed { type_path });

        Ok(())
    }

    /// Drop tracking state: everything, or only objects of one type.
    pub fn clear(&mut self, type_name: Option<&str>) {
        match type_name {
            None => {
                self.uow.clear(true);
                for repository in self.repositories.values() {
                    if let Some(container) = repository.container() {
                        container.detach_all();
                    }
                }
            }
            Some(type_name) => {
                self.uow.detach_type(type_name);
                if let Some(repository) = self.repository(type_name)
                    && let Some(container) = repository.container()
                {
                    container.detach_all();
                }
            }
        }
    }

    ///
    /// FLUSH
    ///

    /// Execute pending tasks in registration order, then partially clear the
    /// unit of work. Not atomic: tasks executed before a failure stay applied.
    pub fn flush(&mut self) -> Result<(), Error> {
        let tasks = self.uow.tasks();
        sink::record(ManagerEvent::FlushStarted { tasks: tasks.len() });

        for task in &tasks {
            self.execute(task)?;
            self.uow.complete(&task.object);

            sink::record(ManagerEvent::TaskExecuted {
                type_path: task.object.type_path(),
                operation: task.operation,
            });
        }

        self.uow.clear(false);
        sink::record(ManagerEvent::FlushFinished {
            executed: tasks.len(),
        });

        Ok(())
    }

    fn execute(&mut self, task: &Task) -> Result<(), Error> {
        let object = &task.object;
        let type_path = object.type_path();
        let metadata = self.class_metadata(type_path)?;
        let persister = self.persisters.get(type_path).cloned().ok_or_else(|| {
            ManagerError::NoPersisterConfigured {
                type_path: type_path.to_string(),
            }
        })?;

        match task.operation {
            Operation::Insert => {
                if !self.uow.pre_persist_dispatched(object) {
                    dispatch(&self.invoker, &metadata, Event::PrePersist, object)?;
                }

                with_initial_identity(&metadata, task, || persister.persist(object))?;

                if task.initial_identity.is_none() {
                    self.record_identity(&metadata, object)?;
                }
                self.synchronize(&metadata, object)?;

                dispatch(&self.invoker, &metadata, Event::PostPersist, object)?;
            }
            Operation::Update => {
                if self.invoker.has_listener_for(&metadata, Event::PreUpdate) {
                    let current = Snapshot::capture(&metadata, object);
                    let original = self.original_snapshot(object).unwrap_or_else(|| current.clone());
                    let change_set = ChangeSet::compute(&metadata, &original, &current);
                    let args = EventArgs::pre_update(object.clone(), change_set);

                    self.invoker.invoke(&metadata, Event::PreUpdate, object, &args)?;
                }

                with_initial_identity(&metadata, task, || persister.persist(object))?;

                self.record_identity(&metadata, object)?;
                self.synchronize(&metadata, object)?;

                dispatch(&self.invoker, &metadata, Event::PostUpdate, object)?;
            }
            Operation::Remove => {
                dispatch(&self.invoker, &metadata, Event::PreRemove, object)?;

                with_initial_identity(&metadata, task, || persister.remove(object))?;

                self.uow
                    .set_original(object, Snapshot::capture(&metadata, object))?;

                dispatch(&self.invoker, &metadata, Event::PostRemove, object)?;
            }
        }

        Ok(())
    }

    ///
    /// HELPERS
    ///

    fn repository(&self, type_name: &str) -> Option<Rc<dyn Repository>> {
        self.repositories.get(type_name).cloned()
    }

    /// Bring a repository-tracked object into the unit of work, seeding its
    /// snapshot from the repository's original copy when there is one.
    fn ensure_tracked(&mut self, metadata: &ClassMetadata, object: &ObjectRef) {
        if self.uow.is_managed(object) {
            return;
        }

        let snapshot = self
            .repository(object.type_path())
            .and_then(|repository| repository.container().and_then(|c| c.original_copy(object)))
            .unwrap_or_else(|| Snapshot::capture(metadata, object));
        self.uow.attach(object, snapshot);

        let identity = metadata.identifier_values(object);
        if identity.is_complete() {
            // attach just created the entry
            let _ = self.uow.set_initial_identity(object, identity);
        }
    }

    fn generate_identifier(&self, metadata: &ClassMetadata, object: &ObjectRef) -> Result<(), Error> {
        let identity = metadata.identifier_values(object);
        if identity.is_complete() {
            return Ok(());
        }
        let Some(kind) = metadata.id_generator() else {
            return Ok(());
        };

        let generator =
            self.id_generators
                .resolve(kind)
                .ok_or_else(|| ManagerError::UnknownIdGenerator {
                    type_path: object.type_path().to_string(),
                    generator: kind.registry_key().to_string(),
                })?;

        match generator.generate(self, object)? {
            GeneratedId::Scalar(value) => {
                for (name, current) in identity.iter() {
                    if current.is_null() {
                        object.set_value(name, value.clone())?;
                    }
                }
            }
            GeneratedId::Composite(identifier) => {
                metadata.set_identifier_values(object, &identifier)?;
            }
        }

        Ok(())
    }

    fn record_identity(&mut self, metadata: &ClassMetadata, object: &ObjectRef) -> Result<(), Error> {
        let identity = metadata.identifier_values(object);
        if identity.is_complete() {
            self.uow.set_initial_identity(object, identity)?;
        }

        Ok(())
    }

    /// Post-write snapshot: the unit of work and the repository both take the
    /// written state as the new original copy.
    fn synchronize(&mut self, metadata: &ClassMetadata, object: &ObjectRef) -> Result<(), Error> {
        let snapshot = Snapshot::capture(metadata, object);

        if let Some(repository) = self.repository(object.type_path())
            && let Some(container) = repository.container()
        {
            if !container.contains(object) {
                container.attach(object);
            }
            container.set_original_copy(object, snapshot.clone());
        }
        self.uow.set_original(object, snapshot)?;

        Ok(())
    }

    fn original_snapshot(&self, object: &ObjectRef) -> Option<Snapshot> {
        self.uow.original(object).cloned().or_else(|| {
            self.repository(object.type_path())
                .and_then(|repository| repository.container().and_then(|c| c.original_copy(object)))
        })
    }
}

impl MetadataSource for ObjectManager {
    fn class_metadata(&self, type_name: &str) -> Result<Arc<ClassMetadata>, Error> {
        self.factory.metadata_for(type_name)
    }
}

impl ObjectResolver for ObjectManager {
    fn find_object(
        &self,
        type_name: &str,
        identifier: &Identifier,
    ) -> Result<Option<ObjectRef>, Error> {
        self.find(type_name, identifier.clone())
    }
}

fn dispatch(
    invoker: &ListenerInvoker,
    metadata: &ClassMetadata,
    event: Event,
    object: &ObjectRef,
) -> Result<(), Error> {
    let args = EventArgs::lifecycle(event, object.clone());
    invoker.invoke(metadata, event, object, &args)?;

    Ok(())
}

fn registered(object: &ObjectRef, operation: Operation) {
    sink::record(ManagerEvent::OperationRegistered {
        type_path: object.type_path(),
        operation,
    });
}

/// Run a persister call with the identity captured at registration restored
/// on the object, then put the current identity back.
fn with_initial_identity<F>(metadata: &ClassMetadata, task: &Task, call: F) -> Result<(), Error>
where
    F: FnOnce() -> Result<(), PersistError>,
{
    let current = metadata.identifier_values(&task.object);
    let initial = task
        .initial_identity
        .as_ref()
        .filter(|initial| **initial != current);

    if let Some(initial) = initial {
        metadata.set_identifier_values(&task.object, initial)?;
    }
    let result = call();
    if initial.is_some() {
        metadata.set_identifier_values(&task.object, &current)?;
    }

    Ok(result?)
}
