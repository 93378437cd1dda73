use crate::error::ErrorClass;
use std::path::PathBuf;
use thiserror::Error as ThisError;

///
/// MetadataError
/// Query-time failures against built metadata.
///

#[derive(Debug, ThisError)]
pub enum MetadataError {
    #[error("'{name}' is not mapped on type '{type_name}'")]
    NotMapped { type_name: String, name: String },
}

impl MetadataError {
    pub(crate) fn not_mapped(type_name: &str, name: &str) -> Self {
        Self::NotMapped {
            type_name: type_name.to_string(),
            name: name.to_string(),
        }
    }

    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::NotMapped { .. } => ErrorClass::NotFound,
        }
    }
}

///
/// MappingError
/// Build-time failures raised while producing metadata. Never cached.
///

#[derive(Debug, ThisError)]
#[remain::sorted]
pub enum MappingError {
    #[error("type '{type_name}' maps '{field}' more than once")]
    DuplicateMapping { type_name: String, field: String },

    #[error("type '{type_name}', member '{member}': cannot override key '{key}'")]
    DuplicateOption {
        type_name: String,
        member: String,
        key: String,
    },

    #[error("type '{type_name}', member '{member}': invalid value '{value}' for '{key}'")]
    InvalidParameter {
        type_name: String,
        member: String,
        key: String,
        value: String,
    },

    #[error("type '{type_name}', member '{member}': invalid tag '{tag}': {reason}")]
    InvalidTag {
        type_name: String,
        member: String,
        tag: String,
        reason: String,
    },

    #[error("type '{type_name}': listener tag has no class parameter")]
    ListenerClassMissing { type_name: String },

    #[error("type '{type_name}', association '{member}': target type cannot be inferred")]
    MissingTargetType { type_name: String, member: String },

    #[error("type '{type_name}' is neither a persistent object nor a mapped superclass")]
    NotPersistent { type_name: String },

    #[error("type '{type_name}' is declared in '{}', outside the configured source roots", file.display())]
    OutOfScope { type_name: String, file: PathBuf },

    #[error("cannot scan '{}': {message}", path.display())]
    Scan { path: PathBuf, message: String },

    #[error("type '{type_name}' is not declared in any mapping source")]
    UnknownType { type_name: String },
}

impl MappingError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::DuplicateMapping { .. } | Self::DuplicateOption { .. } => ErrorClass::Conflict,
            Self::InvalidParameter { .. }
            | Self::InvalidTag { .. }
            | Self::ListenerClassMissing { .. }
            | Self::MissingTargetType { .. } => ErrorClass::InvariantViolation,
            Self::NotPersistent { .. } | Self::OutOfScope { .. } => ErrorClass::Unsupported,
            Self::Scan { .. } => ErrorClass::Internal,
            Self::UnknownType { .. } => ErrorClass::NotFound,
        }
    }

    pub fn invalid_tag(
        type_name: &str,
        member: &str,
        tag: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidTag {
            type_name: type_name.to_string(),
            member: member.to_string(),
            tag: tag.into(),
            reason: reason.into(),
        }
    }
}
