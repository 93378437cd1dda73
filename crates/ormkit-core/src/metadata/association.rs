use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// AssociationKind
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum AssociationKind {
    OneToOne,
    ManyToOne,
    OneToMany,
    ManyToMany,
}

impl AssociationKind {
    #[must_use]
    pub const fn is_to_one(self) -> bool {
        matches!(self, Self::OneToOne | Self::ManyToOne)
    }

    #[must_use]
    pub const fn is_to_many(self) -> bool {
        !self.is_to_one()
    }

    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::OneToOne => "one-to-one",
            Self::ManyToOne => "many-to-one",
            Self::OneToMany => "one-to-many",
            Self::ManyToMany => "many-to-many",
        }
    }
}

impl fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

///
/// FetchMode
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum FetchMode {
    Eager,
    ExtraLazy,
    Lazy,
}

impl FetchMode {
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_uppercase().replace('-', "_").as_str() {
            "EAGER" => Some(Self::Eager),
            "EXTRA_LAZY" => Some(Self::ExtraLazy),
            "LAZY" => Some(Self::Lazy),
            _ => None,
        }
    }
}

///
/// JoinColumn
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct JoinColumn {
    pub name: Option<String>,
    pub referenced_column_name: String,
}

///
/// JoinTable
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct JoinTable {
    pub name: String,
    pub join_columns: Vec<JoinColumn>,
    pub inverse_join_columns: Vec<JoinColumn>,
}

///
/// AssociationMapping
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AssociationMapping {
    pub field_name: String,
    pub kind: AssociationKind,
    pub target_type: String,
    pub mapped_by: Option<String>,
    pub inversed_by: Option<String>,
    pub referenced_field_name: Option<String>,
    pub referenced_column_name: Option<String>,
    pub fetch: Option<FetchMode>,
    pub id: bool,
    pub join_columns: Vec<JoinColumn>,
    pub join_table: Option<JoinTable>,
    pub options: IndexMap<String, Value>,
    pub extra: IndexMap<String, Value>,
    pub inherited: Option<String>,
    pub declared: Option<String>,
}

impl AssociationMapping {
    pub fn new(
        field_name: impl Into<String>,
        kind: AssociationKind,
        target_type: impl Into<String>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            kind,
            target_type: target_type.into(),
            mapped_by: None,
            inversed_by: None,
            referenced_field_name: None,
            referenced_column_name: None,
            fetch: None,
            id: false,
            join_columns: Vec::new(),
            join_table: None,
            options: IndexMap::new(),
            extra: IndexMap::new(),
            inherited: None,
            declared: None,
        }
    }

    #[must_use]
    pub fn mapped_by(mut self, field: impl Into<String>) -> Self {
        self.mapped_by = Some(field.into());
        self
    }

    #[must_use]
    pub fn inversed_by(mut self, field: impl Into<String>) -> Self {
        self.inversed_by = Some(field.into());
        self
    }

    /// One-to-many sides are always inverse; other kinds are inverse when
    /// they name the owning field via `mapped_by`.
    #[must_use]
    pub const fn is_inverse_side(&self) -> bool {
        self.mapped_by.is_some() || matches!(self.kind, AssociationKind::OneToMany)
    }

    #[must_use]
    pub const fn is_owning_side(&self) -> bool {
        !self.is_inverse_side()
    }
}
