//! Event sink boundary.
//!
//! All instrumentation flows through `ManagerEvent` and `ManagerSink`.
//! This module is the only bridge between runtime logic and logging.


use crate::uow::Operation;
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn ManagerSink>>> = const { RefCell::new(None) };
}

///
/// ManagerEvent
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ManagerEvent {
    MetadataBuilt {
        type_name: String,
    },
    MetadataCacheHit {
        type_name: String,
        external: bool,
    },
    OperationRegistered {
        type_path: &'static str,
        operation: Operation,
    },
    Detached {
        type_path: &'static str,
    },
    Lookup {
        type_name: String,
        found: bool,
    },
    Refreshed {
        type_path: &'static str,
    },
    FlushStarted {
        tasks: usize,
    },
    TaskExecuted {
        type_path: &'static str,
        operation: Operation,
    },
    FlushFinished {
        executed: usize,
    },
    IdGenerated {
        type_path: &'static str,
        attempts: u32,
    },
    UnknownField {
        type_path: &'static str,
        field: String,
    },
}

///
/// ManagerSink
///

pub trait ManagerSink {
    fn record(&self, event: &ManagerEvent);
}

///
/// TracingSink
/// Default sink; writes each event as a `tracing` event.
///

pub struct TracingSink;

impl ManagerSink for TracingSink {
    fn record(&self, event: &ManagerEvent) {
        match event {
            ManagerEvent::MetadataBuilt { type_name } => {
                tracing::debug!(type_name = %type_name, "metadata built");
            }
            ManagerEvent::MetadataCacheHit {
                type_name,
                external,
            } => {
                tracing::trace!(type_name = %type_name, external, "metadata cache hit");
            }
            ManagerEvent::OperationRegistered {
                type_path,
                operation,
            } => {
                tracing::debug!(type_path, %operation, "operation registered");
            }
            ManagerEvent::Detached { type_path } => {
                tracing::debug!(type_path, "object detached");
            }
            ManagerEvent::Lookup { type_name, found } => {
                tracing::trace!(type_name = %type_name, found, "object lookup");
            }
            ManagerEvent::Refreshed { type_path } => {
                tracing::debug!(type_path, "object refreshed");
            }
            ManagerEvent::FlushStarted { tasks } => {
                tracing::debug!(tasks, "flush started");
            }
            ManagerEvent::TaskExecuted {
                type_path,
                operation,
            } => {
                tracing::trace!(type_path, %operation, "task executed");
            }
            ManagerEvent::FlushFinished { executed } => {
                tracing::debug!(executed, "flush finished");
            }
            ManagerEvent::IdGenerated {
                type_path,
                attempts,
            } => {
                tracing::trace!(type_path, attempts, "identifier generated");
            }
            ManagerEvent::UnknownField { type_path, field } => {
                tracing::debug!(type_path, field = %field, "mapped field missing from accessor");
            }
        }
    }
}

pub(crate) fn record(event: ManagerEvent) {
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());

    match sink {
        Some(sink) => sink.record(&event),
        None => TracingSink.record(&event),
    }
}

/// Run a closure with a temporary sink override on this thread.
pub fn with_manager_sink<T>(sink: Rc<dyn ManagerSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn ManagerSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let previous = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = previous;
            });
        }
    }

    let previous = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(previous);

    f()
}
