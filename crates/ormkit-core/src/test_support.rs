//! Shared fixtures for core tests: three small persistable types, a static
//! mapping driver, and a persister that records what it was asked to do.

use crate::{
    event::{Event, EventArgs, ListenerError, ObjectListener},
    factory::{MappingDriver, MetadataFactory},
    identifier::Identifier,
    manager::{PersistError, Persister, Repository},
    metadata::{
        AssociationKind, AssociationMapping, ClassMetadata, FieldMapping, IdGeneratorType,
        MappingError,
    },
    object::{ObjectRef, Ref},
    traits::Path,
};
use indexmap::IndexMap;
use ormkit_derive::Persistable;
use std::{
    cell::RefCell,
    rc::Rc,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

///
/// Note
///
/// Integer id assigned by the store, a to-one author reference, and
/// lifecycle callbacks that append to `log`.
///

#[derive(Debug, Default, Persistable)]
#[persistable(
    crate = "crate",
    path = "app::Note",
    callback = "pre_persist",
    callback = "post_persist",
    callback = "pre_update",
    callback = "post_remove"
)]
pub struct Note {
    pub id: Option<i64>,
    pub title: String,
    pub body: Option<String>,
    pub author: Option<Ref<Author>>,

    #[persistable(skip)]
    pub log: Vec<String>,
}

impl Note {
    pub fn titled(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    fn pre_persist(&mut self, _args: &EventArgs) {
        self.log.push("prePersist".to_string());
    }

    fn post_persist(&mut self, _args: &EventArgs) {
        self.log.push("postPersist".to_string());
    }

    /// Vetoes the update when the title is `veto`.
    fn pre_update(&mut self, args: &EventArgs) -> Result<(), ListenerError> {
        let changed = args
            .change_set()
            .map(|cs| cs.field_names().join(","))
            .unwrap_or_default();
        self.log.push(format!("preUpdate:{changed}"));

        if self.title == "veto" {
            return Err(ListenerError::failed(Event::PreUpdate, "vetoed"));
        }

        Ok(())
    }

    fn post_remove(&mut self, _args: &EventArgs) {
        self.log.push("postRemove".to_string());
    }
}

///
/// Author
/// Text id produced by the uniqid generator.
///

#[derive(Debug, Default, Persistable)]
#[persistable(crate = "crate", path = "app::Author")]
pub struct Author {
    pub id: Option<String>,
    pub name: String,
}

///
/// Membership
/// Composite identifier.
///

#[derive(Debug, Default, Persistable)]
#[persistable(crate = "crate", path = "app::Membership")]
pub struct Membership {
    pub group_id: Option<i64>,
    pub member_id: Option<i64>,
    pub role: String,
}

impl Membership {
    pub fn new(group_id: i64, member_id: i64) -> Self {
        Self {
            group_id: Some(group_id),
            member_id: Some(member_id),
            role: "member".to_string(),
        }
    }
}

pub fn note_metadata() -> ClassMetadata {
    let mut metadata = ClassMetadata::new(Note::PATH);
    metadata
        .map_field(FieldMapping::new("id", "integer").identifier().nullable(true))
        .unwrap();
    metadata.map_field(FieldMapping::new("title", "string")).unwrap();
    metadata
        .map_field(FieldMapping::new("body", "text").nullable(true))
        .unwrap();
    metadata
        .map_association(AssociationMapping::new(
            "author",
            AssociationKind::ManyToOne,
            Author::PATH,
        ))
        .unwrap();

    metadata.add_lifecycle_callback(Event::PrePersist, "pre_persist");
    metadata.add_lifecycle_callback(Event::PostPersist, "post_persist");
    metadata.add_lifecycle_callback(Event::PreUpdate, "pre_update");
    metadata.add_lifecycle_callback(Event::PostRemove, "post_remove");

    metadata
}

pub fn author_metadata() -> ClassMetadata {
    let mut metadata = ClassMetadata::new(Author::PATH);
    metadata
        .map_field(FieldMapping::new("id", "string").identifier().nullable(true))
        .unwrap();
    metadata.map_field(FieldMapping::new("name", "string")).unwrap();
    metadata.set_id_generator(Some(IdGeneratorType::Uniqid));

    metadata
}

pub fn membership_metadata() -> ClassMetadata {
    let mut metadata = ClassMetadata::new(Membership::PATH);
    metadata
        .map_field(FieldMapping::new("group_id", "integer").identifier())
        .unwrap();
    metadata
        .map_field(FieldMapping::new("member_id", "integer").identifier())
        .unwrap();
    metadata.map_field(FieldMapping::new("role", "string")).unwrap();

    metadata
}

///
/// StaticDriver
///
/// Mapping driver over prebuilt per-type declarations. Each entry holds only
/// what the type itself declares; parents are composed by the factory.
///

#[derive(Default)]
pub struct StaticDriver {
    types: IndexMap<String, Declared>,
    loads: Arc<AtomicUsize>,
}

struct Declared {
    own: ClassMetadata,
    parent: Option<String>,
    transient: bool,
}

impl StaticDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        Self::new()
            .with_type(note_metadata())
            .with_type(author_metadata())
            .with_type(membership_metadata())
    }

    pub fn with_type(self, own: ClassMetadata) -> Self {
        self.declare(own, None, false)
    }

    pub fn with_child(self, parent: &str, own: ClassMetadata) -> Self {
        self.declare(own, Some(parent), false)
    }

    pub fn with_transient(self, own: ClassMetadata, parent: Option<&str>) -> Self {
        self.declare(own, parent, true)
    }

    /// Shared counter of `load_metadata_for_type` calls.
    pub fn load_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.loads)
    }

    fn declare(mut self, own: ClassMetadata, parent: Option<&str>, transient: bool) -> Self {
        self.types.insert(
            own.name().to_string(),
            Declared {
                own,
                parent: parent.map(ToString::to_string),
                transient,
            },
        );
        self
    }
}

impl MappingDriver for StaticDriver {
    fn all_type_names(&self) -> Result<Vec<String>, MappingError> {
        Ok(self
            .types
            .iter()
            .filter(|(_, declared)| !declared.transient)
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn is_transient(&self, type_name: &str) -> Result<bool, MappingError> {
        Ok(self.types.get(type_name).is_none_or(|d| d.transient))
    }

    fn is_mapped_superclass(&self, type_name: &str) -> Result<bool, MappingError> {
        Ok(self
            .types
            .get(type_name)
            .is_some_and(|d| d.own.is_mapped_superclass()))
    }

    fn parent_type_name(&self, type_name: &str) -> Result<Option<String>, MappingError> {
        Ok(self.types.get(type_name).and_then(|d| d.parent.clone()))
    }

    fn load_metadata_for_type(
        &self,
        type_name: &str,
        metadata: &mut ClassMetadata,
    ) -> Result<(), MappingError> {
        self.loads.fetch_add(1, Ordering::SeqCst);

        let declared = self
            .types
            .get(type_name)
            .ok_or_else(|| MappingError::UnknownType {
                type_name: type_name.to_string(),
            })?;
        let own = &declared.own;

        for field in own.field_mappings() {
            metadata.override_field(field.clone())?;
        }
        for association in own.association_mappings() {
            metadata.map_association(association.clone())?;
        }
        for event in Event::ALL {
            for method in own.lifecycle_callbacks(event) {
                metadata.add_lifecycle_callback(event, method.clone());
            }
            for binding in own.listeners(event) {
                metadata.add_listener(event, binding.clone());
            }
        }
        if let Some(generator) = own.id_generator() {
            metadata.set_id_generator(Some(generator.clone()));
        }
        if let Some(repository) = own.repository() {
            metadata.set_repository(repository);
        }
        metadata.set_mapped_superclass(own.is_mapped_superclass());

        Ok(())
    }
}

pub fn standard_factory() -> Arc<MetadataFactory> {
    Arc::new(MetadataFactory::new(StaticDriver::standard()))
}

///
/// RecordingPersister
///
/// Records `(operation, identifier)` for every call it accepts. Fails any
/// call whose identifier equals `fail_on`.
///

pub struct RecordingPersister {
    metadata: ClassMetadata,
    pub calls: RefCell<Vec<(&'static str, Identifier)>>,
    pub fail_on: RefCell<Option<Identifier>>,
}

impl RecordingPersister {
    pub fn new(metadata: ClassMetadata) -> Self {
        Self {
            metadata,
            calls: RefCell::new(Vec::new()),
            fail_on: RefCell::new(None),
        }
    }

    fn call(&self, operation: &'static str, object: &ObjectRef) -> Result<(), PersistError> {
        let identifier = self.metadata.identifier_values(object);
        if self.fail_on.borrow().as_ref() == Some(&identifier) {
            return Err(PersistError::backend(object.type_path(), "refused"));
        }
        self.calls.borrow_mut().push((operation, identifier));

        Ok(())
    }
}

impl Persister for RecordingPersister {
    fn persist(&self, object: &ObjectRef) -> Result<(), PersistError> {
        self.call("persist", object)
    }

    fn remove(&self, object: &ObjectRef) -> Result<(), PersistError> {
        self.call("remove", object)
    }
}

impl Repository for RecordingPersister {
    fn find(&self, _identifier: &Identifier) -> Result<Option<ObjectRef>, crate::Error> {
        Ok(None)
    }
}

///
/// RecordingListener
/// Appends `<name>:<method>` to a shared log.
///

pub struct RecordingListener {
    pub name: &'static str,
    pub log: Rc<RefCell<Vec<String>>>,
}

impl ObjectListener for RecordingListener {
    fn handle(&self, method: &str, _args: &EventArgs) -> Result<(), ListenerError> {
        self.log.borrow_mut().push(format!("{}:{method}", self.name));
        Ok(())
    }
}

/// Snapshot of a note's callback log.
pub fn note_log(object: &ObjectRef) -> Vec<String> {
    object
        .read::<Note, _>(|note| note.log.clone())
        .unwrap_or_default()
}
