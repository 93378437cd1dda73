use crate::{
    Error,
    id::{GeneratedId, IdError, IdGenerator},
    identifier::Identifier,
    manager::ObjectResolver,
    metadata::IdGeneratorType,
    object::ObjectRef,
    obs::sink::{self, ManagerEvent},
    value::Value,
};
use convert_case::{Case, Casing};
use std::{cell::RefCell, collections::HashMap};
use ulid::{Generator, Ulid};

///
/// UniqidIdGenerator
///
/// Text identifiers of the form `<snake_local_name>_<ulid>`. Each candidate
/// is checked against `find`; a collision triggers a bounded retry.
///

pub struct UniqidIdGenerator {
    ulids: RefCell<Generator>,
    max_attempts: u32,
}

impl UniqidIdGenerator {
    pub const MAX_ATTEMPTS: u32 = 10;

    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    // monotonic within one generator; overflow in a single millisecond is an error
    fn next_ulid(&self, type_path: &str) -> Result<Ulid, IdError> {
        self.ulids
            .borrow_mut()
            .generate()
            .map_err(|_| IdError::UlidOverflow {
                type_path: type_path.to_string(),
            })
    }
}

impl Default for UniqidIdGenerator {
    fn default() -> Self {
        Self {
            ulids: RefCell::new(Generator::new()),
            max_attempts: Self::MAX_ATTEMPTS,
        }
    }
}

impl IdGenerator for UniqidIdGenerator {
    fn generate(
        &self,
        resolver: &dyn ObjectResolver,
        object: &ObjectRef,
    ) -> Result<GeneratedId, Error> {
        let type_path = object.type_path();
        let metadata = resolver.class_metadata(type_path)?;
        let prefix = metadata.local_name().to_case(Case::Snake);
        let id_field = metadata.identifier_field_names().first().map(ToString::to_string);

        for attempt in 1..=self.max_attempts {
            let ulid = self.next_ulid(type_path)?;
            let candidate = format!("{prefix}_{}", ulid.to_string().to_lowercase());

            let taken = match &id_field {
                Some(field) => resolver
                    .find_object(type_path, &Identifier::single(field.clone(), candidate.as_str()))?
                    .is_some(),
                None => false,
            };

            if !taken {
                sink::record(ManagerEvent::IdGenerated {
                    type_path,
                    attempts: attempt,
                });

                return Ok(GeneratedId::Scalar(Value::Text(candidate)));
            }
        }

        Err(IdError::IdGenerationExhausted {
            type_path: type_path.to_string(),
            attempts: self.max_attempts,
        }
        .into())
    }
}

///
/// AutoIdGenerator
/// Default strategy; currently the uniqid strategy.
///

#[derive(Default)]
pub struct AutoIdGenerator {
    inner: UniqidIdGenerator,
}

impl IdGenerator for AutoIdGenerator {
    fn generate(
        &self,
        resolver: &dyn ObjectResolver,
        object: &ObjectRef,
    ) -> Result<GeneratedId, Error> {
        self.inner.generate(resolver, object)
    }
}

///
/// SequenceIdGenerator
///
/// In-process integer sequences, one per sequence name (or per type when
/// the metadata names none).
///

#[derive(Default)]
pub struct SequenceIdGenerator {
    counters: RefCell<HashMap<String, i64>>,
}

impl SequenceIdGenerator {
    /// Next value the named sequence would hand out.
    #[must_use]
    pub fn peek(&self, sequence: &str) -> Option<i64> {
        self.counters.borrow().get(sequence).copied()
    }
}

impl IdGenerator for SequenceIdGenerator {
    fn generate(
        &self,
        resolver: &dyn ObjectResolver,
        object: &ObjectRef,
    ) -> Result<GeneratedId, Error> {
        let type_path = object.type_path();
        let metadata = resolver.class_metadata(type_path)?;

        let (sequence, initial_value) = match metadata.id_generator() {
            Some(IdGeneratorType::Sequence {
                name,
                initial_value,
                ..
            }) => (
                name.clone().unwrap_or_else(|| type_path.to_string()),
                *initial_value,
            ),
            _ => (type_path.to_string(), 1),
        };

        let mut counters = self.counters.borrow_mut();
        let next = counters.entry(sequence.clone()).or_insert(initial_value);
        let value = *next;
        *next = value
            .checked_add(1)
            .ok_or(IdError::SequenceExhausted { sequence })?;

        sink::record(ManagerEvent::IdGenerated {
            type_path,
            attempts: 1,
        });

        Ok(GeneratedId::Scalar(Value::Int(value)))
    }
}
