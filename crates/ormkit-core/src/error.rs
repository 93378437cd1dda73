use crate::{
    config::ConfigError,
    event::ListenerError,
    id::IdError,
    manager::{ManagerError, PersistError},
    metadata::{MappingError, MetadataError},
    object::AccessError,
    uow::UnitOfWorkError,
    value::ValueError,
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// Error
///
/// Structured runtime error with a stable classification. The typed
/// module error that produced it is kept in `detail`.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct Error {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Typed error detail; the variant always corresponds to `origin`.
    pub detail: Option<ErrorDetail>,
}

impl Error {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    fn from_detail(class: ErrorClass, origin: ErrorOrigin, detail: ErrorDetail) -> Self {
        Self {
            class,
            origin,
            message: detail.to_string(),
            detail: Some(detail),
        }
    }

    #[must_use]
    pub const fn detail(&self) -> Option<&ErrorDetail> {
        self.detail.as_ref()
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }

    #[must_use]
    pub const fn is_not_managed(&self) -> bool {
        matches!(
            self.detail,
            Some(
                ErrorDetail::UnitOfWork(UnitOfWorkError::NotManaged { .. })
                    | ErrorDetail::Manager(ManagerError::NotManaged { .. })
            )
        )
    }

    #[must_use]
    pub const fn is_not_mapped(&self) -> bool {
        matches!(
            self.detail,
            Some(ErrorDetail::Metadata(MetadataError::NotMapped { .. }))
        )
    }

    #[must_use]
    pub const fn is_conflicting_operation(&self) -> bool {
        matches!(
            self.detail,
            Some(ErrorDetail::UnitOfWork(
                UnitOfWorkError::ConflictingOperation { .. }
            ))
        )
    }

    #[must_use]
    pub const fn is_missing_target_type(&self) -> bool {
        matches!(
            self.detail,
            Some(ErrorDetail::Mapping(MappingError::MissingTargetType { .. }))
        )
    }

    #[must_use]
    pub const fn is_duplicate_mapping(&self) -> bool {
        matches!(
            self.detail,
            Some(ErrorDetail::Mapping(MappingError::DuplicateMapping { .. }))
        )
    }

    #[must_use]
    pub const fn is_out_of_scope(&self) -> bool {
        matches!(
            self.detail,
            Some(ErrorDetail::Mapping(MappingError::OutOfScope { .. }))
        )
    }

    #[must_use]
    pub const fn is_no_persister_configured(&self) -> bool {
        matches!(
            self.detail,
            Some(ErrorDetail::Manager(
                ManagerError::NoPersisterConfigured { .. }
            ))
        )
    }

    #[must_use]
    pub const fn is_id_generation_exhausted(&self) -> bool {
        matches!(
            self.detail,
            Some(ErrorDetail::Id(IdError::IdGenerationExhausted { .. }))
        )
    }
}

///
/// ErrorClass
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[remain::sorted]
pub enum ErrorClass {
    Conflict,
    Internal,
    InvariantViolation,
    NotFound,
    Unsupported,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Conflict => "conflict",
            Self::Internal => "internal",
            Self::InvariantViolation => "invariant_violation",
            Self::NotFound => "not_found",
            Self::Unsupported => "unsupported",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[remain::sorted]
pub enum ErrorOrigin {
    Access,
    Config,
    Event,
    IdGenerator,
    Manager,
    Mapping,
    Metadata,
    Persister,
    UnitOfWork,
    Value,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Access => "access",
            Self::Config => "config",
            Self::Event => "event",
            Self::IdGenerator => "id_generator",
            Self::Manager => "manager",
            Self::Mapping => "mapping",
            Self::Metadata => "metadata",
            Self::Persister => "persister",
            Self::UnitOfWork => "unit_of_work",
            Self::Value => "value",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorDetail
///

#[derive(Debug, ThisError)]
#[remain::sorted]
pub enum ErrorDetail {
    #[error("{0}")]
    Access(AccessError),
    #[error("{0}")]
    Config(ConfigError),
    #[error("{0}")]
    Id(IdError),
    #[error("{0}")]
    Listener(ListenerError),
    #[error("{0}")]
    Manager(ManagerError),
    #[error("{0}")]
    Mapping(MappingError),
    #[error("{0}")]
    Metadata(MetadataError),
    #[error("{0}")]
    Persist(PersistError),
    #[error("{0}")]
    UnitOfWork(UnitOfWorkError),
    #[error("{0}")]
    Value(ValueError),
}

macro_rules! impl_from_detail {
    ($($err:ty => $variant:ident, $origin:ident, $class:expr;)*) => {
        $(
            impl From<$err> for Error {
                fn from(err: $err) -> Self {
                    let class: fn(&$err) -> ErrorClass = $class;
                    Self::from_detail(class(&err), ErrorOrigin::$origin, ErrorDetail::$variant(err))
                }
            }
        )*
    };
}

impl_from_detail! {
    AccessError => Access, Access, |_| ErrorClass::InvariantViolation;
    ConfigError => Config, Config, |_| ErrorClass::Unsupported;
    IdError => Id, IdGenerator, |_| ErrorClass::Internal;
    ListenerError => Listener, Event, ListenerError::class;
    ManagerError => Manager, Manager, ManagerError::class;
    MappingError => Mapping, Mapping, MappingError::class;
    MetadataError => Metadata, Metadata, MetadataError::class;
    PersistError => Persist, Persister, |_| ErrorClass::Internal;
    UnitOfWorkError => UnitOfWork, UnitOfWork, UnitOfWorkError::class;
    ValueError => Value, Value, |_| ErrorClass::InvariantViolation;
}
