//! Module: id
//! Responsibility: identifier generation strategies and their registry.
//! Does not own: when generation runs (see `manager::persist`).

mod generator;


pub use generator::{AutoIdGenerator, SequenceIdGenerator, UniqidIdGenerator};

use crate::{
    Error,
    identifier::Identifier,
    manager::ObjectResolver,
    metadata::IdGeneratorType,
    object::ObjectRef,
    value::Value,
};
use std::{collections::HashMap, rc::Rc};
use thiserror::Error as ThisError;

///
/// IdError
///

#[derive(Debug, ThisError)]
#[remain::sorted]
pub enum IdError {
    #[error("no unique identifier for '{type_path}' after {attempts} attempts")]
    IdGenerationExhausted { type_path: String, attempts: u32 },

    #[error("sequence '{sequence}' reached the largest integer")]
    SequenceExhausted { sequence: String },

    #[error("ulid space for '{type_path}' exhausted within one millisecond")]
    UlidOverflow { type_path: String },
}

///
/// GeneratedId
///

#[derive(Clone, Debug, PartialEq)]
pub enum GeneratedId {
    /// Values keyed by identifier field name.
    Composite(Identifier),

    /// One value for every unset identifier field.
    Scalar(Value),
}

///
/// IdGenerator
///
/// Runs synchronously during `persist`, before `prePersist` fires.
///

pub trait IdGenerator {
    fn generate(&self, resolver: &dyn ObjectResolver, object: &ObjectRef)
    -> Result<GeneratedId, Error>;
}

///
/// IdGeneratorRegistry
///

#[derive(Clone)]
pub struct IdGeneratorRegistry {
    generators: HashMap<String, Rc<dyn IdGenerator>>,
}

impl IdGeneratorRegistry {
    /// Registry with `auto`, `uniqid`, and `sequence` installed.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("auto", Rc::new(AutoIdGenerator::default()));
        registry.register("uniqid", Rc::new(UniqidIdGenerator::default()));
        registry.register("sequence", Rc::new(SequenceIdGenerator::default()));

        registry
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            generators: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, generator: Rc<dyn IdGenerator>) {
        self.generators.insert(name.into(), generator);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Rc<dyn IdGenerator>> {
        self.generators.get(name).cloned()
    }

    /// Instance registered for a metadata generator type. Per-type settings
    /// (sequence names and seeds) are read from metadata at generation time.
    #[must_use]
    pub fn resolve(&self, generator: &IdGeneratorType) -> Option<Rc<dyn IdGenerator>> {
        self.get(generator.registry_key())
    }
}

impl Default for IdGeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
