use crate::{
    event::{Event, EventArgs, EventManager, ListenerError},
    metadata::ClassMetadata,
    object::ObjectRef,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, rc::Rc};

///
/// ObjectListener
///
/// Per-type listener object; `method` is the handler name bound in metadata.
///

pub trait ObjectListener {
    fn handle(&self, method: &str, args: &EventArgs) -> Result<(), ListenerError>;
}

///
/// ListenerResolver
///

pub trait ListenerResolver {
    fn resolve(&self, listener: &str) -> Option<Rc<dyn ObjectListener>>;
}

///
/// ListenerRegistry
///
/// Name-keyed `ListenerResolver`.
///

#[derive(Default)]
pub struct ListenerRegistry {
    listeners: HashMap<String, Rc<dyn ObjectListener>>,
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, listener: Rc<dyn ObjectListener>) {
        self.listeners.insert(name.into(), listener);
    }
}

impl ListenerResolver for ListenerRegistry {
    fn resolve(&self, listener: &str) -> Option<Rc<dyn ObjectListener>> {
        self.listeners.get(listener).cloned()
    }
}

///
/// InvokeMask
///
/// Selects which invoker stages run.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct InvokeMask {
    pub callbacks: bool,
    pub listeners: bool,
    pub event_manager: bool,
}

impl InvokeMask {
    pub const ALL: Self = Self {
        callbacks: true,
        listeners: true,
        event_manager: true,
    };

    pub const NONE: Self = Self {
        callbacks: false,
        listeners: false,
        event_manager: false,
    };
}

impl Default for InvokeMask {
    fn default() -> Self {
        Self::ALL
    }
}

///
/// ListenerInvoker
///
/// Fans an event out in fixed order: instance callbacks, then resolved
/// listeners, then the event manager.
///

#[derive(Clone, Default)]
pub struct ListenerInvoker {
    resolver: Option<Rc<dyn ListenerResolver>>,
    event_manager: Option<Rc<dyn EventManager>>,
    mask: InvokeMask,
}

impl ListenerInvoker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: Rc<dyn ListenerResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn with_event_manager(mut self, event_manager: Rc<dyn EventManager>) -> Self {
        self.event_manager = Some(event_manager);
        self
    }

    #[must_use]
    pub const fn with_mask(mut self, mask: InvokeMask) -> Self {
        self.mask = mask;
        self
    }

    #[must_use]
    pub const fn mask(&self) -> InvokeMask {
        self.mask
    }

    #[must_use]
    pub fn has_listener_for(&self, metadata: &ClassMetadata, event: Event) -> bool {
        (self.mask.callbacks && !metadata.lifecycle_callbacks(event).is_empty())
            || (self.mask.listeners && !metadata.listeners(event).is_empty())
            || (self.mask.event_manager
                && self
                    .event_manager
                    .as_ref()
                    .is_some_and(|em| em.has_listeners(event)))
    }

    pub fn invoke(
        &self,
        metadata: &ClassMetadata,
        event: Event,
        object: &ObjectRef,
        args: &EventArgs,
    ) -> Result<(), ListenerError> {
        if self.mask.callbacks {
            for method in metadata.lifecycle_callbacks(event) {
                object
                    .invoke_callback(method, args)
                    .ok_or_else(|| ListenerError::CallbackNotFound {
                        type_path: metadata.name().to_string(),
                        method: method.clone(),
                    })??;
            }
        }

        if self.mask.listeners {
            for binding in metadata.listeners(event) {
                let listener = self
                    .resolver
                    .as_ref()
                    .and_then(|resolver| resolver.resolve(&binding.listener))
                    .ok_or_else(|| ListenerError::ListenerNotFound {
                        listener: binding.listener.clone(),
                    })?;

                listener.handle(&binding.method, args)?;
            }
        }

        if self.mask.event_manager
            && let Some(event_manager) = &self.event_manager
            && event_manager.has_listeners(event)
        {
            event_manager.dispatch(event, args)?;
        }

        Ok(())
    }
}
