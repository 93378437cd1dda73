//! Module: value
//! Responsibility: the dynamic value shape exchanged between objects,
//! snapshots, persisters, and mapping defaults.
//! Does not own: per-type conversion rules (see `traits::FieldValue`).

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};
use thiserror::Error as ThisError;
use time::{Date, Month, OffsetDateTime, format_description::well_known::Rfc3339};

///
/// ValueError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[remain::sorted]
pub enum ValueError {
    #[error("value {value} is out of range for {target}")]
    OutOfRange { target: &'static str, value: String },

    #[error("cannot parse '{input}' as {target}")]
    Parse { target: &'static str, input: String },

    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl ValueError {
    pub(crate) const fn mismatch(expected: &'static str, found: &Value) -> Self {
        Self::TypeMismatch {
            expected,
            found: found.kind(),
        }
    }
}

///
/// Value
///
/// Dynamic field value. Every persistable field converts to and from this
/// shape; persisters and snapshots only ever see `Value`.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[remain::sorted]
pub enum Value {
    Blob(Vec<u8>),
    Bool(bool),
    Date(Date),
    DateTime(#[serde(with = "time::serde::rfc3339")] OffsetDateTime),
    Float(f64),
    Int(i64),
    List(Vec<Self>),
    Map(BTreeMap<String, Self>),
    #[default]
    Null,
    Text(String),
    Uint(u64),
}

impl Value {
    /// Stable lowercase name of the variant, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Blob(_) => "blob",
            Self::Bool(_) => "bool",
            Self::Date(_) => "date",
            Self::DateTime(_) => "datetime",
            Self::Float(_) => "float",
            Self::Int(_) => "int",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Uint(_) => "uint",
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Signed view of an integer value; `Uint` converts when it fits.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Uint(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }

    ///
    /// JSON BRIDGE
    ///

    #[must_use]
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::Uint(u)
                } else {
                    n.as_f64().map_or(Self::Null, Self::Float)
                }
            }
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Blob(bytes) => serde_json::Value::Array(
                bytes
                    .iter()
                    .map(|b| serde_json::Value::from(*b))
                    .collect(),
            ),
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Date(date) => serde_json::Value::String(format_date(*date)),
            Self::DateTime(dt) => format_datetime(*dt)
                .map_or(serde_json::Value::Null, serde_json::Value::String),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Int(n) => serde_json::Value::from(*n),
            Self::List(items) => serde_json::Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Self::Null => serde_json::Value::Null,
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Uint(n) => serde_json::Value::from(*n),
        }
    }

    /// Compact JSON text form.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    /// Parse JSON text into a value, `None` when the text is not JSON.
    #[must_use]
    pub fn parse_json(text: &str) -> Option<Self> {
        serde_json::from_str::<serde_json::Value>(text)
            .ok()
            .map(Self::from_json)
    }

    ///
    /// DATE / TIME
    ///

    pub fn parse_datetime(text: &str) -> Result<Self, ValueError> {
        OffsetDateTime::parse(text.trim(), &Rfc3339)
            .map(Self::DateTime)
            .map_err(|_| ValueError::Parse {
                target: "datetime",
                input: text.to_string(),
            })
    }

    pub fn parse_date(text: &str) -> Result<Self, ValueError> {
        parse_date(text).map(Self::Date).ok_or_else(|| ValueError::Parse {
            target: "date",
            input: text.to_string(),
        })
    }
}

/// RFC 3339 text for a timestamp.
#[must_use]
pub fn format_datetime(dt: OffsetDateTime) -> Option<String> {
    dt.format(&Rfc3339).ok()
}

/// `YYYY-MM-DD` text for a calendar date.
#[must_use]
pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

fn parse_date(text: &str) -> Option<Date> {
    let mut parts = text.trim().splitn(3, '-');
    let year = parts.next()?.parse::<i32>().ok()?;
    let month = Month::try_from(parts.next()?.parse::<u8>().ok()?).ok()?;
    let day = parts.next()?.get(..2)?.parse::<u8>().ok()?;

    Date::from_calendar_date(year, month, day).ok()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Date(date) => f.write_str(&format_date(*date)),
            Self::DateTime(dt) => f.write_str(&format_datetime(*dt).unwrap_or_default()),
            Self::Float(n) => write!(f, "{n}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Null => f.write_str("null"),
            Self::Text(s) => f.write_str(s),
            Self::Uint(n) => write!(f, "{n}"),
            Self::Blob(_) | Self::List(_) | Self::Map(_) => f.write_str(&self.to_json_string()),
        }
    }
}

///
/// Conversions
///

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Uint(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<OffsetDateTime> for Value {
    fn from(dt: OffsetDateTime) -> Self {
        Self::DateTime(dt)
    }
}

impl From<Date> for Value {
    fn from(date: Date) -> Self {
        Self::Date(date)
    }
}
