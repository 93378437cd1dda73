//! Module: descriptor
//! Responsibility: per-tag parameter descriptor tables and typed parameter
//! parsing. Each row names the parameter key as written, the record key it
//! is stored under, its value kind, and an optional text transform applied
//! before conversion.

use crate::tag::{TagKind, parse_parameters};
use indexmap::IndexMap;
use ormkit_core::metadata::{FetchMode, MappingError};

///
/// ParameterKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParameterKind {
    Boolean,
    Fetch,
    Integer,
    Text,
}

///
/// ParameterDescriptor
///

#[derive(Clone, Copy, Debug)]
pub struct ParameterDescriptor {
    pub key: &'static str,
    pub target: &'static str,
    pub kind: ParameterKind,
    pub transform: Option<fn(&str) -> String>,
}

impl ParameterDescriptor {
    const fn new(key: &'static str, target: &'static str, kind: ParameterKind) -> Self {
        Self {
            key,
            target,
            kind,
            transform: None,
        }
    }

    const fn text(key: &'static str, target: &'static str) -> Self {
        Self::new(key, target, ParameterKind::Text)
    }

    const fn boolean(key: &'static str, target: &'static str) -> Self {
        Self::new(key, target, ParameterKind::Boolean)
    }

    const fn integer(key: &'static str, target: &'static str) -> Self {
        Self::new(key, target, ParameterKind::Integer)
    }

    const fn transformed(mut self, transform: fn(&str) -> String) -> Self {
        self.transform = Some(transform);
        self
    }
}

///
/// TABLES
///

pub const ENTITY: &[ParameterDescriptor] = &[
    ParameterDescriptor::text("table", "table"),
    ParameterDescriptor::text("schema", "schema"),
    ParameterDescriptor::boolean("read-only", "readOnly"),
    ParameterDescriptor::text("repository-class", "repositoryClass").transformed(trim_path),
];

pub const PROPERTY: &[ParameterDescriptor] = &[
    ParameterDescriptor::text("field", "fieldName"),
    ParameterDescriptor::text("column", "columnName"),
    ParameterDescriptor::text("type", "type"),
    ParameterDescriptor::integer("length", "length"),
    ParameterDescriptor::integer("precision", "precision"),
    ParameterDescriptor::integer("scale", "scale"),
    ParameterDescriptor::text("enum-type", "enumType"),
    ParameterDescriptor::text("definition", "columnDefinition"),
    ParameterDescriptor::text("options", "options"),
];

pub const ID: &[ParameterDescriptor] = &[
    ParameterDescriptor::text("generator", "generator").transformed(lowercase),
    ParameterDescriptor::text("sequence-name", "sequenceName"),
    ParameterDescriptor::integer("sequence-allocation-size", "sequenceAllocationSize"),
    ParameterDescriptor::integer("sequence-initial-value", "sequenceInitialValue"),
    ParameterDescriptor::text("custom-id-generator-class", "customIdGeneratorClass")
        .transformed(trim_path),
];

pub const FIELD: &[ParameterDescriptor] = &[
    ParameterDescriptor::boolean("version", "version"),
    ParameterDescriptor::boolean("unique", "unique"),
    ParameterDescriptor::boolean("nullable", "nullable"),
    ParameterDescriptor::text("generated", "generated").transformed(uppercase),
    ParameterDescriptor::boolean("insertable", "insertable"),
    ParameterDescriptor::boolean("updatable", "updatable"),
    ParameterDescriptor::boolean("override", "override"),
];

pub const ASSOCIATION: &[ParameterDescriptor] = &[
    ParameterDescriptor::text("field", "fieldName"),
    ParameterDescriptor::text("target-class", "targetEntity").transformed(trim_path),
    ParameterDescriptor::text("target-field", "referencedFieldName"),
    ParameterDescriptor::text("target-column", "referencedColumnName"),
    ParameterDescriptor::new("fetch", "fetch", ParameterKind::Fetch),
];

const INVERSED_BY: ParameterDescriptor = ParameterDescriptor::text("inversed-by", "inversedBy");
const MAPPED_BY: ParameterDescriptor = ParameterDescriptor::text("mapped-by", "mappedBy");

pub const MANY_TO_ONE: &[ParameterDescriptor] = &[INVERSED_BY];
pub const ONE_TO_ONE: &[ParameterDescriptor] = &[INVERSED_BY, MAPPED_BY];
pub const TO_MANY: &[ParameterDescriptor] = &[MAPPED_BY];

/// Every descriptor that applies to a tag, shared rows first.
#[must_use]
pub fn table_for(kind: TagKind) -> Vec<&'static ParameterDescriptor> {
    let (base, own): (&[ParameterDescriptor], &[ParameterDescriptor]) = match kind {
        TagKind::Object => (ENTITY, &[]),
        TagKind::Field => (PROPERTY, FIELD),
        TagKind::Id => (PROPERTY, ID),
        TagKind::ManyToOne => (ASSOCIATION, MANY_TO_ONE),
        TagKind::OneToOne => (ASSOCIATION, ONE_TO_ONE),
        TagKind::OneToMany | TagKind::ManyToMany => (ASSOCIATION, TO_MANY),
        TagKind::Extra
        | TagKind::LifecycleCallbacks
        | TagKind::Listener
        | TagKind::Options => (&[], &[]),
    };

    base.iter().chain(own).collect()
}

///
/// ParameterValue
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParameterValue {
    Bool(bool),
    Fetch(FetchMode),
    Int(i64),
    Text(String),
}

///
/// Parameters
///
/// Typed parameter record keyed by descriptor target.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Parameters {
    values: IndexMap<&'static str, ParameterValue>,
}

impl Parameters {
    /// Parse a tag's parameter text against its descriptor table. Keys the
    /// table does not list are ignored.
    pub fn parse(
        kind: TagKind,
        text: &str,
        type_name: &str,
        member: &str,
    ) -> Result<Self, MappingError> {
        let raw = parse_parameters(text)
            .map_err(|reason| MappingError::invalid_tag(type_name, member, kind.name(), reason))?;
        let mut parameters = Self::default();

        for descriptor in table_for(kind) {
            let Some(value) = raw.get(descriptor.key) else {
                continue;
            };
            let value = descriptor
                .transform
                .map_or_else(|| value.clone(), |transform| transform(value));

            let converted = convert(descriptor.kind, &value).ok_or_else(|| {
                MappingError::InvalidParameter {
                    type_name: type_name.to_string(),
                    member: member.to_string(),
                    key: descriptor.key.to_string(),
                    value: value.clone(),
                }
            })?;
            parameters.values.insert(descriptor.target, converted);
        }

        for key in raw.keys() {
            if !table_for(kind).iter().any(|d| d.key == key) {
                tracing::trace!(type_name, member, tag = %kind, key = key.as_str(), "ignoring parameter");
            }
        }

        Ok(parameters)
    }

    /// Merge `other` into `self`; `other` wins on shared keys.
    pub fn extend(&mut self, other: Self) {
        self.values.extend(other.values);
    }

    #[must_use]
    pub fn contains(&self, target: &str) -> bool {
        self.values.contains_key(target)
    }

    #[must_use]
    pub fn text(&self, target: &str) -> Option<&str> {
        match self.values.get(target) {
            Some(ParameterValue::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn flag(&self, target: &str) -> Option<bool> {
        match self.values.get(target) {
            Some(ParameterValue::Bool(flag)) => Some(*flag),
            _ => None,
        }
    }

    #[must_use]
    pub fn int(&self, target: &str) -> Option<i64> {
        match self.values.get(target) {
            Some(ParameterValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn fetch(&self, target: &str) -> Option<FetchMode> {
        match self.values.get(target) {
            Some(ParameterValue::Fetch(mode)) => Some(*mode),
            _ => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn convert(kind: ParameterKind, value: &str) -> Option<ParameterValue> {
    match kind {
        ParameterKind::Text => Some(ParameterValue::Text(value.to_string())),
        ParameterKind::Boolean => parse_bool(value).map(ParameterValue::Bool),
        ParameterKind::Integer => value.parse().ok().map(ParameterValue::Int),
        ParameterKind::Fetch => FetchMode::parse(value).map(ParameterValue::Fetch),
    }
}

/// A bare key counts as `true`.
fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "" | "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn lowercase(value: &str) -> String {
    value.to_ascii_lowercase()
}

fn uppercase(value: &str) -> String {
    value.to_ascii_uppercase()
}

fn trim_path(value: &str) -> String {
    value.trim_start_matches("::").to_string()
}
