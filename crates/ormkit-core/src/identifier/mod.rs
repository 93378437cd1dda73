//! Module: identifier
//! Responsibility: persisted identifier values and their normalization.
//!
//! Invariants:
//! - Equality is key-set plus per-key value equality; insertion order is
//!   irrelevant.
//! - No numeric/string coercion: `Int(1)` and `Text("1")` differ.

#[cfg(test)]
mod tests;

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

///
/// Identifier
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Identifier(BTreeMap<String, Value>);

impl Identifier {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn single(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().with(name, value)
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// True when at least one entry exists and none is `Null`.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.0.is_empty() && self.0.values().all(|v| !v.is_null())
    }

    /// Scalar for single identifiers, a map for composite ones.
    #[must_use]
    pub fn to_value(&self) -> Value {
        if self.0.len() == 1
            && let Some(value) = self.0.values().next()
        {
            return value.clone();
        }

        Value::Map(self.0.clone())
    }

    /// Stable text key, suitable for hashing stores keyed by identifier.
    #[must_use]
    pub fn key(&self) -> String {
        Value::Map(self.0.clone()).to_json_string()
    }
}

impl FromIterator<(String, Value)> for Identifier {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

///
/// RawIdentifier
///
/// Caller-supplied identifier before normalization against metadata.
///

#[derive(Clone, Debug, PartialEq)]
pub enum RawIdentifier {
    Fields(Identifier),
    Scalar(Value),
}

impl RawIdentifier {
    /// Bind to identifier field names. A scalar binds to the first name (and
    /// a map value is unpacked by key); a field map keeps only identifier
    /// names and fills missing ones with `Null`.
    #[must_use]
    pub fn normalize(self, id_names: &[&str]) -> Identifier {
        match self {
            Self::Scalar(Value::Map(map)) => Self::Fields(map.into_iter().collect()).normalize(id_names),
            Self::Scalar(value) => id_names
                .first()
                .map(|name| Identifier::single(*name, value))
                .unwrap_or_default(),
            Self::Fields(fields) => id_names
                .iter()
                .map(|name| {
                    let value = fields.get(name).cloned().unwrap_or(Value::Null);
                    ((*name).to_string(), value)
                })
                .collect(),
        }
    }
}

impl From<Identifier> for RawIdentifier {
    fn from(identifier: Identifier) -> Self {
        Self::Fields(identifier)
    }
}

impl From<Value> for RawIdentifier {
    fn from(value: Value) -> Self {
        Self::Scalar(value)
    }
}

impl From<i64> for RawIdentifier {
    fn from(n: i64) -> Self {
        Self::Scalar(Value::Int(n))
    }
}

impl From<&str> for RawIdentifier {
    fn from(s: &str) -> Self {
        Self::Scalar(Value::from(s))
    }
}

impl From<String> for RawIdentifier {
    fn from(s: String) -> Self {
        Self::Scalar(Value::Text(s))
    }
}
