//! Module: event
//! Responsibility: lifecycle event names, event arguments, and the listener
//! invoker that fans events out to callbacks, listeners, and the event bus.
//! Does not own: when events fire (see `manager`).

mod bus;
mod invoker;

#[cfg(test)]
mod tests;

pub use bus::{EventBus, EventManager};
pub use invoker::{InvokeMask, ListenerInvoker, ListenerRegistry, ListenerResolver, ObjectListener};

use crate::{changeset::ChangeSet, error::ErrorClass, object::ObjectRef, value::Value};
use convert_case::{Case, Casing};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error as ThisError;

///
/// Event
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Event {
    PrePersist,
    PostPersist,
    PreUpdate,
    PostUpdate,
    PreRemove,
    PostRemove,
}

impl Event {
    pub const ALL: [Self; 6] = [
        Self::PrePersist,
        Self::PostPersist,
        Self::PreUpdate,
        Self::PostUpdate,
        Self::PreRemove,
        Self::PostRemove,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PrePersist => "prePersist",
            Self::PostPersist => "postPersist",
            Self::PreUpdate => "preUpdate",
            Self::PostUpdate => "postUpdate",
            Self::PreRemove => "preRemove",
            Self::PostRemove => "postRemove",
        }
    }

    /// Resolve an event from camelCase, kebab-case, or snake_case spelling.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let camel = name.trim().to_case(Case::Camel);

        Self::ALL.into_iter().find(|event| event.name() == camel)
    }

    /// Whether a method name is the conventional handler name for this event.
    #[must_use]
    pub fn matches_method(self, method: &str) -> bool {
        method == self.name() || method == self.name().to_case(Case::Snake)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

///
/// ListenerError
///

#[derive(Debug, ThisError)]
#[remain::sorted]
pub enum ListenerError {
    #[error("type '{type_path}' has no lifecycle callback '{method}'")]
    CallbackNotFound { type_path: String, method: String },

    #[error("{event} listener failed: {message}")]
    Failed { event: Event, message: String },

    #[error("listener '{listener}' could not be resolved")]
    ListenerNotFound { listener: String },

    #[error("listener '{listener}' has no handler '{method}'")]
    MethodNotFound { listener: String, method: String },
}

impl ListenerError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Failed { .. } => ErrorClass::Internal,
            Self::CallbackNotFound { .. }
            | Self::ListenerNotFound { .. }
            | Self::MethodNotFound { .. } => ErrorClass::NotFound,
        }
    }

    pub fn failed(event: Event, message: impl Into<String>) -> Self {
        Self::Failed {
            event,
            message: message.into(),
        }
    }
}

///
/// CallbackResult
///
/// Return types accepted from instance lifecycle callbacks.
///

pub trait CallbackResult {
    fn into_callback_result(self) -> Result<(), ListenerError>;
}

impl CallbackResult for () {
    fn into_callback_result(self) -> Result<(), ListenerError> {
        Ok(())
    }
}

impl CallbackResult for Result<(), ListenerError> {
    fn into_callback_result(self) -> Self {
        self
    }
}

///
/// EventArgs
///

#[derive(Clone, Debug)]
pub struct EventArgs {
    event: Event,
    object: ObjectRef,
    change_set: Option<ChangeSet>,
}

impl EventArgs {
    #[must_use]
    pub const fn lifecycle(event: Event, object: ObjectRef) -> Self {
        Self {
            event,
            object,
            change_set: None,
        }
    }

    #[must_use]
    pub const fn pre_update(object: ObjectRef, change_set: ChangeSet) -> Self {
        Self {
            event: Event::PreUpdate,
            object,
            change_set: Some(change_set),
        }
    }

    #[must_use]
    pub const fn event(&self) -> Event {
        self.event
    }

    #[must_use]
    pub const fn object(&self) -> &ObjectRef {
        &self.object
    }

    #[must_use]
    pub const fn change_set(&self) -> Option<&ChangeSet> {
        self.change_set.as_ref()
    }

    #[must_use]
    pub fn has_changed_field(&self, field: &str) -> bool {
        self.change_set.as_ref().is_some_and(|cs| cs.contains(field))
    }

    #[must_use]
    pub fn old_value(&self, field: &str) -> Option<&Value> {
        self.change_set
            .as_ref()
            .and_then(|cs| cs.get(field))
            .map(|change| &change.old)
    }

    #[must_use]
    pub fn new_value(&self, field: &str) -> Option<&Value> {
        self.change_set
            .as_ref()
            .and_then(|cs| cs.get(field))
            .map(|change| &change.new)
    }
}
