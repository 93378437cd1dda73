
use crate::{
    object::{Association, Ref},
    value::{Value, ValueError},
};
use std::collections::BTreeMap;
use time::{Date, OffsetDateTime};

///
/// Path
///
/// Fully-qualified type name used as the metadata key for a persistable type.
///

pub trait Path {
    const PATH: &'static str;
}

///
/// FieldValue
///
/// Conversion between a concrete field type and the dynamic `Value` shape.
/// `Option<T>` maps `None` to `Value::Null`; `Vec<T>` maps to `Value::List`.
///

pub trait FieldValue: Sized {
    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, ValueError>;
}

impl FieldValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        Ok(value)
    }
}

impl FieldValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(ValueError::mismatch("bool", &other)),
        }
    }
}

impl FieldValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(ValueError::mismatch("text", &other)),
        }
    }
}

macro_rules! impl_field_value_signed {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                fn to_value(&self) -> Value {
                    Value::Int(i64::from(*self))
                }

                fn from_value(value: Value) -> Result<Self, ValueError> {
                    let out_of_range = |v: String| ValueError::OutOfRange {
                        target: stringify!($ty),
                        value: v,
                    };

                    match value {
                        Value::Int(n) => Self::try_from(n).map_err(|_| out_of_range(n.to_string())),
                        Value::Uint(n) => Self::try_from(n).map_err(|_| out_of_range(n.to_string())),
                        other => Err(ValueError::mismatch("int", &other)),
                    }
                }
            }
        )*
    };
}

impl_field_value_signed!(i8, i16, i32, i64, u8, u16, u32);

impl FieldValue for u64 {
    fn to_value(&self) -> Value {
        Value::Uint(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Uint(n) => Ok(n),
            Value::Int(n) => Self::try_from(n).map_err(|_| ValueError::OutOfRange {
                target: "u64",
                value: n.to_string(),
            }),
            other => Err(ValueError::mismatch("uint", &other)),
        }
    }
}

impl FieldValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    #[allow(clippy::cast_precision_loss)]
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(n) => Ok(n as Self),
            other => Err(ValueError::mismatch("float", &other)),
        }
    }
}

impl FieldValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Float(f) => Ok(f as Self),
            Value::Int(n) => Ok(n as Self),
            other => Err(ValueError::mismatch("float", &other)),
        }
    }
}

impl FieldValue for OffsetDateTime {
    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::DateTime(dt) => Ok(dt),
            Value::Text(text) => match Value::parse_datetime(&text)? {
                Value::DateTime(dt) => Ok(dt),
                other => Err(ValueError::mismatch("datetime", &other)),
            },
            other => Err(ValueError::mismatch("datetime", &other)),
        }
    }
}

impl FieldValue for Date {
    fn to_value(&self) -> Value {
        Value::Date(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Date(date) => Ok(date),
            Value::DateTime(dt) => Ok(dt.date()),
            Value::Text(text) => match Value::parse_date(&text)? {
                Value::Date(date) => Ok(date),
                other => Err(ValueError::mismatch("date", &other)),
            },
            other => Err(ValueError::mismatch("date", &other)),
        }
    }
}

impl FieldValue for serde_json::Value {
    fn to_value(&self) -> Value {
        Value::from_json(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Text(text) => serde_json::from_str(&text).map_err(|_| ValueError::Parse {
                target: "json",
                input: text,
            }),
            other => Ok(other.to_json()),
        }
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, FieldValue::to_value)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(FieldValue::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(ValueError::mismatch("list", &other)),
        }
    }
}

impl<T: FieldValue> FieldValue for BTreeMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect(),
        )
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Map(map) => map
                .into_iter()
                .map(|(k, v)| T::from_value(v).map(|v| (k, v)))
                .collect(),
            other => Err(ValueError::mismatch("map", &other)),
        }
    }
}

///
/// AssociationValue
///
/// Conversion between an association field and the dynamic `Association`
/// shape. To-one fields are `Option<Ref<T>>`, to-many fields `Vec<Ref<T>>`.
///

pub trait AssociationValue: Sized {
    fn to_association(&self) -> Association;

    fn from_association(association: Association) -> Result<Self, ValueError>;
}

impl<T> AssociationValue for Option<Ref<T>> {
    fn to_association(&self) -> Association {
        Association::One(self.as_ref().map(|r| r.reference().clone()))
    }

    fn from_association(association: Association) -> Result<Self, ValueError> {
        match association {
            Association::One(reference) => Ok(reference.map(Ref::from)),
            Association::Many(_) => Err(ValueError::TypeMismatch {
                expected: "single-valued association",
                found: "collection",
            }),
        }
    }
}

impl<T> AssociationValue for Vec<Ref<T>> {
    fn to_association(&self) -> Association {
        Association::Many(self.iter().map(|r| r.reference().clone()).collect())
    }

    fn from_association(association: Association) -> Result<Self, ValueError> {
        match association {
            Association::Many(references) => Ok(references.into_iter().map(Ref::from).collect()),
            Association::One(reference) => Ok(reference.into_iter().map(Ref::from).collect()),
        }
    }
}
