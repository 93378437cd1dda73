//! Observability boundary.
//!
//! Runtime code reports through `ManagerEvent` and `ManagerSink`; it never
//! logs directly. The default sink forwards to `tracing`.

pub mod sink;

pub use sink::{ManagerEvent, ManagerSink, TracingSink, with_manager_sink};
