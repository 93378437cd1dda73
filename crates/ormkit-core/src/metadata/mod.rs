//! Module: metadata
//! Responsibility: the per-type class metadata model and its accessors.
//! Does not own: how metadata is derived from declarations (mapping driver)
//! or cached (factory).
//!
//! Invariants:
//! - Field and association name sets are disjoint.
//! - Every identifier field name appears in `fields`.
//! - Metadata is read-only once shared through the factory.

mod association;
mod error;
mod field;

#[cfg(test)]
mod tests;

pub use association::{AssociationKind, AssociationMapping, FetchMode, JoinColumn, JoinTable};
pub use error::{MappingError, MetadataError};
pub use field::{
    DEFAULT_FIELD_TYPE, FieldMapping, SCALAR_FIELD_TYPES, is_date_type, is_datetime_type,
    is_integer_type, is_scalar_type,
};

use crate::{
    event::Event,
    identifier::Identifier,
    object::{AccessError, ObjectRef},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

///
/// TableInfo
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub schema: Option<String>,
}

///
/// InheritanceType
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum InheritanceType {
    Joined,
    #[default]
    None,
    SingleTable,
    TablePerClass,
}

///
/// IdGeneratorType
///
/// Which id generator the object manager resolves for a type.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum IdGeneratorType {
    Auto,
    Custom(String),
    Sequence {
        name: Option<String>,
        allocation_size: u32,
        initial_value: i64,
    },
    Uniqid,
}

impl IdGeneratorType {
    /// Name the generator is registered under.
    #[must_use]
    pub fn registry_key(&self) -> &str {
        match self {
            Self::Auto => "auto",
            Self::Custom(name) => name,
            Self::Sequence { .. } => "sequence",
            Self::Uniqid => "uniqid",
        }
    }
}

///
/// ListenerBinding
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ListenerBinding {
    pub listener: String,
    pub method: String,
}

///
/// ClassMetadata
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ClassMetadata {
    name: String,
    table: Option<TableInfo>,
    read_only: bool,
    repository: Option<String>,
    mapped_superclass: bool,
    inheritance: InheritanceType,
    parent_types: Vec<String>,
    fields: IndexMap<String, FieldMapping>,
    associations: IndexMap<String, AssociationMapping>,
    lifecycle_callbacks: IndexMap<Event, Vec<String>>,
    listeners: IndexMap<Event, Vec<ListenerBinding>>,
    id_generator: Option<IdGeneratorType>,
    version_field: Option<String>,
}

impl ClassMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            read_only: false,
            repository: None,
            mapped_superclass: false,
            inheritance: InheritanceType::None,
            parent_types: Vec::new(),
            fields: IndexMap::new(),
            associations: IndexMap::new(),
            lifecycle_callbacks: IndexMap::new(),
            listeners: IndexMap::new(),
            id_generator: None,
            version_field: None,
        }
    }

    ///
    /// TYPE-LEVEL ACCESSORS
    ///

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last path segment of the type name.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        self.name.rsplit_once("::").map_or("", |(ns, _)| ns)
    }

    #[must_use]
    pub const fn table(&self) -> Option<&TableInfo> {
        self.table.as_ref()
    }

    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    #[must_use]
    pub fn repository(&self) -> Option<&str> {
        self.repository.as_deref()
    }

    #[must_use]
    pub const fn is_mapped_superclass(&self) -> bool {
        self.mapped_superclass
    }

    #[must_use]
    pub const fn inheritance(&self) -> InheritanceType {
        self.inheritance
    }

    #[must_use]
    pub fn parent_types(&self) -> &[String] {
        &self.parent_types
    }

    #[must_use]
    pub const fn id_generator(&self) -> Option<&IdGeneratorType> {
        self.id_generator.as_ref()
    }

    #[must_use]
    pub fn version_field(&self) -> Option<&str> {
        self.version_field.as_deref()
    }

    ///
    /// FIELD ACCESSORS
    ///

    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    #[must_use]
    pub fn has_association(&self, name: &str) -> bool {
        self.associations.contains_key(name)
    }

    pub fn is_identifier(&self, name: &str) -> Result<bool, MetadataError> {
        if let Some(field) = self.fields.get(name) {
            return Ok(field.id);
        }

        self.association_mapping(name).map(|a| a.id)
    }

    pub fn type_of_field(&self, name: &str) -> Result<&str, MetadataError> {
        self.field_mapping(name).map(|f| f.type_name.as_str())
    }

    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    /// Identifier field names in declaration order.
    #[must_use]
    pub fn identifier_field_names(&self) -> Vec<&str> {
        self.fields
            .values()
            .filter(|f| f.id)
            .map(|f| f.field_name.as_str())
            .collect()
    }

    #[must_use]
    pub fn is_identifier_composite(&self) -> bool {
        self.identifier_field_names().len() > 1
    }

    pub fn field_mapping(&self, name: &str) -> Result<&FieldMapping, MetadataError> {
        self.fields
            .get(name)
            .ok_or_else(|| MetadataError::not_mapped(&self.name, name))
    }

    pub fn field_mappings(&self) -> impl Iterator<Item = &FieldMapping> {
        self.fields.values()
    }

    ///
    /// ASSOCIATION ACCESSORS
    ///

    #[must_use]
    pub fn association_names(&self) -> Vec<&str> {
        self.associations.keys().map(String::as_str).collect()
    }

    pub fn association_mapping(&self, name: &str) -> Result<&AssociationMapping, MetadataError> {
        self.associations
            .get(name)
            .ok_or_else(|| MetadataError::not_mapped(&self.name, name))
    }

    pub fn association_mappings(&self) -> impl Iterator<Item = &AssociationMapping> {
        self.associations.values()
    }

    pub fn is_single_valued_association(&self, name: &str) -> Result<bool, MetadataError> {
        self.association_mapping(name).map(|a| a.kind.is_to_one())
    }

    pub fn is_collection_valued_association(&self, name: &str) -> Result<bool, MetadataError> {
        self.association_mapping(name).map(|a| a.kind.is_to_many())
    }

    pub fn association_target_type(&self, name: &str) -> Result<&str, MetadataError> {
        self.association_mapping(name)
            .map(|a| a.target_type.as_str())
    }

    pub fn is_association_inverse_side(&self, name: &str) -> Result<bool, MetadataError> {
        self.association_mapping(name).map(AssociationMapping::is_inverse_side)
    }

    pub fn association_mapped_by_target_field(
        &self,
        name: &str,
    ) -> Result<Option<&str>, MetadataError> {
        self.association_mapping(name)
            .map(|a| a.mapped_by.as_deref())
    }

    ///
    /// LIFECYCLE
    ///

    #[must_use]
    pub fn lifecycle_callbacks(&self, event: Event) -> &[String] {
        self.lifecycle_callbacks
            .get(&event)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn listeners(&self, event: Event) -> &[ListenerBinding] {
        self.listeners
            .get(&event)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    ///
    /// IDENTIFIER VALUES
    ///

    /// Read the identifier values of `object`; unset fields read as `Null`.
    #[must_use]
    pub fn identifier_values(&self, object: &ObjectRef) -> Identifier {
        self.identifier_field_names()
            .into_iter()
            .map(|name| (name.to_string(), object.mapped_value(name)))
            .collect()
    }

    /// Write identifier values onto `object`. Names that are not identifier
    /// fields are ignored.
    pub fn set_identifier_values(
        &self,
        object: &ObjectRef,
        identifier: &Identifier,
    ) -> Result<(), AccessError> {
        for name in self.identifier_field_names() {
            if let Some(value) = identifier.get(name) {
                object.set_value(name, value.clone())?;
            }
        }

        Ok(())
    }

    ///
    /// BUILDING
    ///

    /// Add a newly declared field. A name already taken by a field or an
    /// association is a `DuplicateMapping`.
    pub fn map_field(&mut self, mut mapping: FieldMapping) -> Result<(), MappingError> {
        self.ensure_vacant(&mapping.field_name)?;
        if mapping.declared.is_none() {
            mapping.declared = Some(self.name.clone());
        }
        if mapping.version {
            self.version_field = Some(mapping.field_name.clone());
        }
        self.fields.insert(mapping.field_name.clone(), mapping);

        Ok(())
    }

    /// Replace an inherited field with a redeclaration. Fails when the
    /// existing mapping was declared on this type itself.
    pub fn override_field(&mut self, mut mapping: FieldMapping) -> Result<(), MappingError> {
        match self.fields.get(&mapping.field_name) {
            Some(existing) if existing.inherited.is_some() => {
                mapping.declared = Some(self.name.clone());
                self.fields.insert(mapping.field_name.clone(), mapping);
                Ok(())
            }
            Some(_) => Err(self.duplicate(&mapping.field_name)),
            None => self.map_field(mapping),
        }
    }

    pub fn map_association(&mut self, mut mapping: AssociationMapping) -> Result<(), MappingError> {
        self.ensure_vacant(&mapping.field_name)?;
        if mapping.declared.is_none() {
            mapping.declared = Some(self.name.clone());
        }
        self.associations.insert(mapping.field_name.clone(), mapping);

        Ok(())
    }

    /// Copy parent state forward before the child's own declarations load.
    pub fn inherit_from(&mut self, parent: &Self) -> Result<(), MappingError> {
        self.inheritance = parent.inheritance;
        self.id_generator.clone_from(&parent.id_generator);
        self.lifecycle_callbacks.clone_from(&parent.lifecycle_callbacks);
        self.version_field.clone_from(&parent.version_field);

        self.parent_types = std::iter::once(parent.name.clone())
            .chain(parent.parent_types.iter().cloned())
            .collect();

        for field in parent.fields.values() {
            let mut field = field.clone();
            if field.inherited.is_none() {
                field.inherited = Some(parent.name.clone());
            }
            if field.declared.is_none() {
                field.declared = Some(parent.name.clone());
            }
            self.ensure_vacant(&field.field_name)?;
            self.fields.insert(field.field_name.clone(), field);
        }

        for association in parent.associations.values() {
            let mut association = association.clone();
            if association.inherited.is_none() {
                association.inherited = Some(parent.name.clone());
            }
            if association.declared.is_none() {
                association.declared = Some(parent.name.clone());
            }
            self.ensure_vacant(&association.field_name)?;
            self.associations
                .insert(association.field_name.clone(), association);
        }

        Ok(())
    }

    pub fn add_lifecycle_callback(&mut self, event: Event, method: impl Into<String>) {
        let method = method.into();
        let methods = self.lifecycle_callbacks.entry(event).or_default();
        if !methods.contains(&method) {
            methods.push(method);
        }
    }

    pub fn add_listener(&mut self, event: Event, binding: ListenerBinding) {
        let bindings = self.listeners.entry(event).or_default();
        if !bindings.contains(&binding) {
            bindings.push(binding);
        }
    }

    pub fn set_table(&mut self, table: TableInfo) {
        self.table = Some(table);
    }

    pub const fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn set_repository(&mut self, repository: impl Into<String>) {
        self.repository = Some(repository.into());
    }

    pub const fn set_mapped_superclass(&mut self, mapped_superclass: bool) {
        self.mapped_superclass = mapped_superclass;
    }

    pub const fn set_inheritance(&mut self, inheritance: InheritanceType) {
        self.inheritance = inheritance;
    }

    pub fn set_id_generator(&mut self, generator: Option<IdGeneratorType>) {
        self.id_generator = generator;
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FieldMapping> {
        self.fields.get_mut(name)
    }

    pub fn association_mut(&mut self, name: &str) -> Option<&mut AssociationMapping> {
        self.associations.get_mut(name)
    }

    fn ensure_vacant(&self, name: &str) -> Result<(), MappingError> {
        if self.fields.contains_key(name) || self.associations.contains_key(name) {
            return Err(self.duplicate(name));
        }

        Ok(())
    }

    fn duplicate(&self, name: &str) -> MappingError {
        MappingError::DuplicateMapping {
            type_name: self.name.clone(),
            field: name.to_string(),
        }
    }
}
