//! Module: changeset
//! Responsibility: field-state snapshots and the change sets computed
//! between them.


use crate::{metadata::ClassMetadata, object::ObjectRef, value::Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

///
/// Snapshot
///
/// Copy of an object's mapped field values at one point in time.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Snapshot(IndexMap<String, Value>);

impl Snapshot {
    #[must_use]
    pub fn capture(metadata: &ClassMetadata, object: &ObjectRef) -> Self {
        metadata
            .field_names()
            .into_iter()
            .map(|name| (name.to_string(), object.mapped_value(name)))
            .collect()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

///
/// FieldChange
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FieldChange {
    pub old: Value,
    pub new: Value,
}

///
/// ChangeSet
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ChangeSet(IndexMap<String, FieldChange>);

impl ChangeSet {
    /// Field-level differences between two snapshots. Identifier fields are
    /// skipped; fields absent from a snapshot read as `Null`.
    #[must_use]
    pub fn compute(metadata: &ClassMetadata, original: &Snapshot, current: &Snapshot) -> Self {
        let mut changes = IndexMap::new();

        for field in metadata.field_mappings().filter(|f| !f.id) {
            let name = field.field_name.as_str();
            let old = original.get(name).cloned().unwrap_or(Value::Null);
            let new = current.get(name).cloned().unwrap_or(Value::Null);

            if old != new {
                changes.insert(name.to_string(), FieldChange { old, new });
            }
        }

        Self(changes)
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.0.get(field)
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldChange)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
