use crate::event::{Event, EventArgs, ListenerError};
use indexmap::IndexMap;

///
/// EventManager
///
/// Global event bus boundary. The invoker consults it last.
///

pub trait EventManager {
    fn has_listeners(&self, event: Event) -> bool;

    fn dispatch(&self, event: Event, args: &EventArgs) -> Result<(), ListenerError>;
}

type Handler = Box<dyn Fn(&EventArgs) -> Result<(), ListenerError>>;

///
/// EventBus
///
/// Minimal in-process `EventManager`: handlers run in subscription order and
/// the first failure stops the dispatch.
///

#[derive(Default)]
pub struct EventBus {
    handlers: IndexMap<Event, Vec<Handler>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, event: Event, handler: F)
    where
        F: Fn(&EventArgs) -> Result<(), ListenerError> + 'static,
    {
        self.handlers
            .entry(event)
            .or_default()
            .push(Box::new(handler));
    }
}

impl EventManager for EventBus {
    fn has_listeners(&self, event: Event) -> bool {
        self.handlers.get(&event).is_some_and(|h| !h.is_empty())
    }

    fn dispatch(&self, event: Event, args: &EventArgs) -> Result<(), ListenerError> {
        for handler in self.handlers.get(&event).into_iter().flatten() {
            handler(args)?;
        }

        Ok(())
    }
}
