//! Module: mapper
//! Responsibility: copy persistable state between objects and flat
//! `ObjectData` rows, honoring each field's storage type.
//! Does not own: storage, or deciding when a refresh happens.


use crate::{
    Error,
    factory::MetadataSource,
    identifier::RawIdentifier,
    manager::ObjectResolver,
    metadata::{ClassMetadata, FieldMapping, is_date_type, is_datetime_type, is_scalar_type},
    object::{AccessError, Association, ObjectRef, Reference},
    value::{Value, ValueError, format_date, format_datetime},
};
use indexmap::IndexMap;
use std::{rc::Rc, sync::Arc};

/// Flat field-name keyed state of one object.
pub type ObjectData = IndexMap<String, Value>;

///
/// PropertyMapper
///

pub trait PropertyMapper {
    /// Write `data` onto `object`. Associations are resolved through
    /// `resolver` when one is given and left unresolved otherwise.
    fn assign_object_properties(
        &self,
        object: &ObjectRef,
        data: &ObjectData,
        resolver: Option<&dyn ObjectResolver>,
    ) -> Result<(), Error>;

    /// Read `object` into `data`. Resolved associations are written as the
    /// target's identifier value.
    fn fetch_object_properties(
        &self,
        data: &mut ObjectData,
        object: &ObjectRef,
        metadata: &dyn MetadataSource,
    ) -> Result<(), Error>;
}

///
/// EmbeddedObjectFactory
///
/// Builds and flattens values of non-scalar (embedded) field types.
///

pub trait EmbeddedObjectFactory {
    fn instantiate(&self, type_name: &str, raw: Value) -> Result<Value, ValueError>;

    fn extract(&self, type_name: &str, value: &Value) -> Value;
}

///
/// JsonEmbeddedObjectFactory
///
/// Embedded values travel as JSON object text and live as `Value::Map`.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct JsonEmbeddedObjectFactory;

impl EmbeddedObjectFactory for JsonEmbeddedObjectFactory {
    fn instantiate(&self, _type_name: &str, raw: Value) -> Result<Value, ValueError> {
        match raw {
            Value::Text(text) => match Value::parse_json(&text) {
                Some(map @ Value::Map(_)) => Ok(map),
                _ => Err(ValueError::Parse {
                    target: "embedded object",
                    input: text,
                }),
            },
            map @ Value::Map(_) => Ok(map),
            other => Err(ValueError::mismatch("map", &other)),
        }
    }

    fn extract(&self, _type_name: &str, value: &Value) -> Value {
        match value {
            Value::Map(_) => Value::Text(value.to_json_string()),
            other => other.clone(),
        }
    }
}

///
/// MetadataPropertyMapper
///

pub struct MetadataPropertyMapper {
    metadata: Arc<ClassMetadata>,
    objects: Rc<dyn EmbeddedObjectFactory>,
}

impl MetadataPropertyMapper {
    #[must_use]
    pub fn new(metadata: Arc<ClassMetadata>, objects: Rc<dyn EmbeddedObjectFactory>) -> Self {
        Self { metadata, objects }
    }

    #[must_use]
    pub fn metadata(&self) -> &ClassMetadata {
        &self.metadata
    }

    fn assign_value(&self, field: &FieldMapping, raw: &Value) -> Result<Value, ValueError> {
        let type_name = field.type_name.as_str();

        match raw {
            Value::Null => Ok(Value::Null),
            Value::Text(text) if is_datetime_type(type_name) => Value::parse_datetime(text),
            Value::Text(text) if is_date_type(type_name) => Value::parse_date(text),
            Value::Text(text) if type_name == "json" => {
                Value::parse_json(text).ok_or_else(|| ValueError::Parse {
                    target: "json",
                    input: text.clone(),
                })
            }
            _ if !is_scalar_type(type_name) => self.objects.instantiate(type_name, raw.clone()),
            _ => Ok(raw.clone()),
        }
    }

    fn fetch_value(&self, field: &FieldMapping, value: Value) -> Value {
        let type_name = field.type_name.as_str();

        match value {
            Value::Null => Value::Null,
            Value::DateTime(dt) => format_datetime(dt).map_or(Value::DateTime(dt), Value::Text),
            Value::Date(date) => Value::Text(format_date(date)),
            other if !is_scalar_type(type_name) => self.objects.extract(type_name, &other),
            other => other,
        }
    }

    fn resolve_reference(
        &self,
        target_type: &str,
        raw: &Value,
        resolver: Option<&dyn ObjectResolver>,
    ) -> Result<Reference, Error> {
        let Some(resolver) = resolver else {
            return Ok(Reference::Unresolved(raw.clone()));
        };

        let target = resolver.class_metadata(target_type)?;
        let identifier = RawIdentifier::from(raw.clone()).normalize(&target.identifier_field_names());

        Ok(resolver
            .find_object(target_type, &identifier)?
            .map_or_else(|| Reference::Unresolved(raw.clone()), Reference::Resolved))
    }
}

impl PropertyMapper for MetadataPropertyMapper {
    fn assign_object_properties(
        &self,
        object: &ObjectRef,
        data: &ObjectData,
        resolver: Option<&dyn ObjectResolver>,
    ) -> Result<(), Error> {
        for (name, raw) in data {
            if let Ok(field) = self.metadata.field_mapping(name) {
                let value = self.assign_value(field, raw).map_err(|source| {
                    AccessError::invalid_value(object.type_path(), name, source)
                })?;
                object.set_value(name, value)?;

                continue;
            }

            // keys that are neither fields nor associations are skipped
            let Ok(association) = self.metadata.association_mapping(name) else {
                continue;
            };
            let target = association.target_type.as_str();

            let value = if association.kind.is_to_one() {
                match raw {
                    Value::Null => Association::One(None),
                    raw => Association::One(Some(self.resolve_reference(target, raw, resolver)?)),
                }
            } else {
                match raw {
                    Value::Null => Association::Many(Vec::new()),
                    Value::List(items) => Association::Many(
                        items
                            .iter()
                            .map(|item| self.resolve_reference(target, item, resolver))
                            .collect::<Result<_, _>>()?,
                    ),
                    other => {
                        return Err(AccessError::invalid_value(
                            object.type_path(),
                            name,
                            ValueError::mismatch("list", other),
                        )
                        .into());
                    }
                }
            };

            object.set_association(name, value)?;
        }

        Ok(())
    }

    fn fetch_object_properties(
        &self,
        data: &mut ObjectData,
        object: &ObjectRef,
        metadata: &dyn MetadataSource,
    ) -> Result<(), Error> {
        for field in self.metadata.field_mappings() {
            let value = object.get_value(&field.field_name).unwrap_or(Value::Null);
            data.insert(field.field_name.clone(), self.fetch_value(field, value));
        }

        for association in self.metadata.association_mappings() {
            let Some(current) = object.get_association(&association.field_name) else {
                continue;
            };

            let value = match current {
                Association::One(None) => Value::Null,
                Association::One(Some(reference)) => reference_value(&reference, metadata)?,
                Association::Many(references) => Value::List(
                    references
                        .iter()
                        .map(|reference| reference_value(reference, metadata))
                        .collect::<Result<_, _>>()?,
                ),
            };
            data.insert(association.field_name.clone(), value);
        }

        Ok(())
    }
}

fn reference_value(reference: &Reference, metadata: &dyn MetadataSource) -> Result<Value, Error> {
    match reference {
        Reference::Unresolved(raw) => Ok(raw.clone()),
        Reference::Resolved(target) => {
            let target_metadata = metadata.class_metadata(target.type_path())?;

            Ok(target_metadata.identifier_values(target).to_value())
        }
    }
}
