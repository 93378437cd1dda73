//! Module: uow
//! Responsibility: identity map of managed objects, pending operations,
//! original snapshots, and the FIFO task order used by flush.
//! Does not own: event dispatch or persister routing (see `manager`).
//!
//! Invariants:
//! - At most one entry per runtime id.
//! - `queue` holds exactly the runtime ids with a pending operation, in
//!   order of first registration.
//! - Collapsing an operation never moves its queue position.


use crate::{
    changeset::Snapshot,
    error::ErrorClass,
    identifier::Identifier,
    object::{ObjectRef, RuntimeId},
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt};
use thiserror::Error as ThisError;

///
/// Operation
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Operation {
    Insert,
    Update,
    Remove,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Remove => "remove",
        };
        write!(f, "{label}")
    }
}

///
/// UnitOfWorkError
///

#[derive(Debug, ThisError)]
#[remain::sorted]
pub enum UnitOfWorkError {
    #[error("cannot register {requested} for '{type_path}': {current} is already pending")]
    ConflictingOperation {
        type_path: String,
        current: Operation,
        requested: Operation,
    },

    #[error("object of type '{type_path}' is not managed")]
    NotManaged { type_path: String },
}

impl UnitOfWorkError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::ConflictingOperation { .. } => ErrorClass::Conflict,
            Self::NotManaged { .. } => ErrorClass::NotFound,
        }
    }

    fn not_managed(object: &ObjectRef) -> Self {
        Self::NotManaged {
            type_path: object.type_path().to_string(),
        }
    }
}

///
/// Task
///
/// One pending operation, as handed to flush.
///

#[derive(Clone, Debug)]
pub struct Task {
    pub object: ObjectRef,
    pub operation: Operation,
    pub initial_identity: Option<Identifier>,
}

///
/// ManagedEntry
///

struct ManagedEntry {
    object: ObjectRef,
    original: Option<Snapshot>,
    operation: Option<Operation>,
    initial_identity: Option<Identifier>,
    pre_persist_dispatched: bool,
}

impl ManagedEntry {
    const fn new(object: ObjectRef) -> Self {
        Self {
            object,
            original: None,
            operation: None,
            initial_identity: None,
            pre_persist_dispatched: false,
        }
    }
}

///
/// UnitOfWork
///
/// Arena of managed entries indexed by runtime id.
///

#[derive(Default)]
pub struct UnitOfWork {
    slots: Vec<Option<ManagedEntry>>,
    free: Vec<usize>,
    index: HashMap<RuntimeId, usize>,
    queue: Vec<RuntimeId>,
}

impl UnitOfWork {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of managed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn is_managed(&self, object: &ObjectRef) -> bool {
        self.index.contains_key(&object.runtime_id())
    }

    /// Managed and not scheduled for removal.
    #[must_use]
    pub fn contains(&self, object: &ObjectRef) -> bool {
        self.entry(object)
            .is_some_and(|e| e.operation != Some(Operation::Remove))
    }

    #[must_use]
    pub fn pending_operation(&self, object: &ObjectRef) -> Option<Operation> {
        self.entry(object).and_then(|e| e.operation)
    }

    ///
    /// REGISTRATION
    ///

    /// Start managing `object` with no pending operation. An already
    /// managed object only has its snapshot replaced.
    pub fn attach(&mut self, object: &ObjectRef, snapshot: Snapshot) {
        let slot = self.slot_for(object);
        if let Some(entry) = self.slots[slot].as_mut() {
            entry.original = Some(snapshot);
        }
    }

    pub fn insert(&mut self, object: &ObjectRef) -> Result<(), UnitOfWorkError> {
        self.register(object, Operation::Insert)
    }

    pub fn update(&mut self, object: &ObjectRef) -> Result<(), UnitOfWorkError> {
        self.register(object, Operation::Update)
    }

    pub fn remove(&mut self, object: &ObjectRef) -> Result<(), UnitOfWorkError> {
        self.register(object, Operation::Remove)
    }

    /// Validate a transition without applying it.
    pub fn check_transition(
        &self,
        object: &ObjectRef,
        requested: Operation,
    ) -> Result<(), UnitOfWorkError> {
        let current = self.pending_operation(object);

        resolve_transition(current, requested)
            .map(|_| ())
            .ok_or_else(|| UnitOfWorkError::ConflictingOperation {
                type_path: object.type_path().to_string(),
                current: current.unwrap_or(requested),
                requested,
            })
    }

    pub fn register(
        &mut self,
        object: &ObjectRef,
        requested: Operation,
    ) -> Result<(), UnitOfWorkError> {
        self.check_transition(object, requested)?;

        let slot = self.slot_for(object);
        let Some(entry) = self.slots[slot].as_mut() else {
            return Err(UnitOfWorkError::not_managed(object));
        };

        let was_idle = entry.operation.is_none();
        entry.operation = resolve_transition(entry.operation, requested);
        if was_idle {
            self.queue.push(object.runtime_id());
        }

        Ok(())
    }

    /// Stop managing `object`, dropping any pending operation.
    pub fn detach(&mut self, object: &ObjectRef) -> Result<(), UnitOfWorkError> {
        let id = object.runtime_id();
        let slot = self
            .index
            .remove(&id)
            .ok_or_else(|| UnitOfWorkError::not_managed(object))?;

        self.slots[slot] = None;
        self.free.push(slot);
        self.queue.retain(|queued| *queued != id);

        Ok(())
    }

    /// Detach every entry whose object has the given type path.
    pub fn detach_type(&mut self, type_path: &str) {
        let doomed: Vec<ObjectRef> = self
            .objects()
            .filter(|o| o.type_path() == type_path)
            .cloned()
            .collect();

        for object in &doomed {
            // entries come from the live index, so detach cannot miss
            let _ = self.detach(object);
        }
    }

    /// Full clear drops every entry. Partial clear keeps entries managed
    /// with no pending operation, except those whose pending operation was
    /// a removal, and empties the queue.
    pub fn clear(&mut self, full: bool) {
        if full {
            self.slots.clear();
            self.free.clear();
            self.index.clear();
            self.queue.clear();
            return;
        }

        let removed: Vec<ObjectRef> = self
            .slots
            .iter()
            .flatten()
            .filter(|e| e.operation == Some(Operation::Remove))
            .map(|e| e.object.clone())
            .collect();
        for object in &removed {
            let _ = self.detach(object);
        }

        for entry in self.slots.iter_mut().flatten() {
            entry.operation = None;
            entry.pre_persist_dispatched = false;
        }
        self.queue.clear();
    }

    /// Mark a flushed task done: its operation clears and it leaves the
    /// queue. Completed removals leave the identity map.
    pub fn complete(&mut self, object: &ObjectRef) {
        let id = object.runtime_id();
        let Some(&slot) = self.index.get(&id) else {
            return;
        };

        let removed = self.slots[slot]
            .as_mut()
            .and_then(|entry| {
                entry.pre_persist_dispatched = false;
                entry.operation.take()
            })
            == Some(Operation::Remove);

        self.queue.retain(|queued| *queued != id);
        if removed {
            let _ = self.detach(object);
        }
    }

    ///
    /// TASKS
    ///

    /// Pending entries in order of first registration.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.queue
            .iter()
            .filter_map(|id| self.index.get(id))
            .filter_map(|slot| self.slots[*slot].as_ref())
            .filter_map(|entry| {
                entry.operation.map(|operation| Task {
                    object: entry.object.clone(),
                    operation,
                    initial_identity: entry.initial_identity.clone(),
                })
            })
            .collect()
    }

    pub fn objects(&self) -> impl Iterator<Item = &ObjectRef> {
        self.slots.iter().flatten().map(|e| &e.object)
    }

    ///
    /// ENTRY STATE
    ///

    #[must_use]
    pub fn original(&self, object: &ObjectRef) -> Option<&Snapshot> {
        self.entry(object).and_then(|e| e.original.as_ref())
    }

    pub fn set_original(
        &mut self,
        object: &ObjectRef,
        snapshot: Snapshot,
    ) -> Result<(), UnitOfWorkError> {
        self.entry_mut(object)?.original = Some(snapshot);
        Ok(())
    }

    #[must_use]
    pub fn initial_identity(&self, object: &ObjectRef) -> Option<&Identifier> {
        self.entry(object).and_then(|e| e.initial_identity.as_ref())
    }

    pub fn set_initial_identity(
        &mut self,
        object: &ObjectRef,
        identity: Identifier,
    ) -> Result<(), UnitOfWorkError> {
        self.entry_mut(object)?.initial_identity = Some(identity);
        Ok(())
    }

    #[must_use]
    pub fn pre_persist_dispatched(&self, object: &ObjectRef) -> bool {
        self.entry(object).is_some_and(|e| e.pre_persist_dispatched)
    }

    pub fn mark_pre_persist_dispatched(&mut self, object: &ObjectRef) -> Result<(), UnitOfWorkError> {
        self.entry_mut(object)?.pre_persist_dispatched = true;
        Ok(())
    }

    fn entry(&self, object: &ObjectRef) -> Option<&ManagedEntry> {
        self.index
            .get(&object.runtime_id())
            .and_then(|slot| self.slots[*slot].as_ref())
    }

    fn entry_mut(&mut self, object: &ObjectRef) -> Result<&mut ManagedEntry, UnitOfWorkError> {
        let slot = self.index.get(&object.runtime_id()).copied();

        slot.and_then(|slot| self.slots[slot].as_mut())
            .ok_or_else(|| UnitOfWorkError::not_managed(object))
    }

    /// Existing slot for `object`, or a freshly allocated one.
    fn slot_for(&mut self, object: &ObjectRef) -> usize {
        let id = object.runtime_id();
        if let Some(slot) = self.index.get(&id) {
            return *slot;
        }

        let entry = Some(ManagedEntry::new(object.clone()));
        let slot = if let Some(slot) = self.free.pop() {
            self.slots[slot] = entry;
            slot
        } else {
            self.slots.push(entry);
            self.slots.len() - 1
        };
        self.index.insert(id, slot);

        slot
    }
}

/// Transition table for pending operations; `None` means conflict.
const fn resolve_transition(current: Option<Operation>, requested: Operation) -> Option<Operation> {
    use Operation::{Insert, Remove, Update};

    match (current, requested) {
        (None, op) => Some(op),
        (Some(Insert), Insert | Update) => Some(Insert),
        (Some(Insert | Update), Remove) | (Some(Remove), Remove) => Some(Remove),
        (Some(Update), Update) => Some(Update),
        (Some(Update), Insert) | (Some(Remove), Insert | Update) => None,
    }
}
