use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Storage type assigned when nothing more specific can be inferred.
pub const DEFAULT_FIELD_TYPE: &str = "string";

/// Storage types handled as plain scalars by property mapping.
pub const SCALAR_FIELD_TYPES: &[&str] = &[
    "array",
    "bigint",
    "binary",
    "blob",
    "boolean",
    "date",
    "date_immutable",
    "datetime",
    "datetime_immutable",
    "datetimetz",
    "datetimetz_immutable",
    "decimal",
    "float",
    "guid",
    "integer",
    "json",
    "simple_array",
    "smallint",
    "string",
    "text",
    "time",
    "time_immutable",
];

/// Whether a storage type names a builtin scalar rather than an embedded type.
#[must_use]
pub fn is_scalar_type(type_name: &str) -> bool {
    SCALAR_FIELD_TYPES.contains(&type_name)
}

#[must_use]
pub fn is_datetime_type(type_name: &str) -> bool {
    matches!(
        type_name,
        "datetime" | "datetime_immutable" | "datetimetz" | "datetimetz_immutable"
    )
}

#[must_use]
pub fn is_date_type(type_name: &str) -> bool {
    matches!(type_name, "date" | "date_immutable")
}

#[must_use]
pub fn is_integer_type(type_name: &str) -> bool {
    matches!(type_name, "integer" | "smallint" | "bigint")
}

///
/// FieldMapping
///
/// Canonical mapping record for one scalar or embedded field.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FieldMapping {
    pub field_name: String,
    pub type_name: String,
    pub column_name: Option<String>,
    pub id: bool,
    pub nullable: bool,
    pub unique: bool,
    pub version: bool,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub enum_type: Option<String>,
    pub column_definition: Option<String>,
    pub generated: Option<String>,
    pub insertable: bool,
    pub updatable: bool,
    pub default: Option<Value>,
    pub comment: Option<String>,
    pub options: IndexMap<String, Value>,
    pub extra: IndexMap<String, Value>,

    /// Parent type the mapping was copied from.
    pub inherited: Option<String>,

    /// Type that first declared the mapping.
    pub declared: Option<String>,
}

impl FieldMapping {
    pub fn new(field_name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            type_name: type_name.into(),
            column_name: None,
            id: false,
            nullable: false,
            unique: false,
            version: false,
            length: None,
            precision: None,
            scale: None,
            enum_type: None,
            column_definition: None,
            generated: None,
            insertable: true,
            updatable: true,
            default: None,
            comment: None,
            options: IndexMap::new(),
            extra: IndexMap::new(),
            inherited: None,
            declared: None,
        }
    }

    #[must_use]
    pub const fn identifier(mut self) -> Self {
        self.id = true;
        self
    }

    #[must_use]
    pub const fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column_name = Some(column.into());
        self
    }

    /// Column name, falling back to the field name.
    #[must_use]
    pub fn column(&self) -> &str {
        self.column_name.as_deref().unwrap_or(&self.field_name)
    }
}
