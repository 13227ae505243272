//! Dynamically typed column values.
//!
//! [`Value`] is what flows between the query layer and the executors: bind
//! parameters are `Value`s, and every result row is decoded into a
//! [`Record`](crate::Record) of `Value`s before it is projected into a typed
//! output. Keeping values inspectable (instead of `dyn ToSql`) lets the same
//! filter be rendered to SQL or evaluated in memory.

use bytes::BytesMut;
use serde::Serialize;
use std::cmp::Ordering;
use std::error::Error;
use std::fmt;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

/// A single column value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    BigInt(i64),
    Double(f64),
    Text(String),
}

/// The type tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    BigInt,
    Double,
    Text,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "boolean",
            ValueKind::Int => "integer",
            ValueKind::BigInt => "bigint",
            ValueKind::Double => "double precision",
            ValueKind::Text => "text",
        };
        f.write_str(name)
    }
}

impl ValueKind {
    /// Whether a value of kind `found` can be read as `self` without loss.
    pub fn accepts(self, found: ValueKind) -> bool {
        match (self, found) {
            (_, ValueKind::Null) => true,
            (a, b) if a == b => true,
            (ValueKind::BigInt, ValueKind::Int) => true,
            (ValueKind::Double, ValueKind::Int | ValueKind::BigInt) => true,
            _ => false,
        }
    }
}

/// Conversion failure from [`Value`] into a Rust type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueError {
    pub expected: ValueKind,
    pub found: ValueKind,
}

impl Value {
    /// The type tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::BigInt(_) => ValueKind::BigInt,
            Value::Double(_) => ValueKind::Double,
            Value::Text(_) => ValueKind::Text,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(i64::from(*v)),
            Value::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(f64::from(*v)),
            Value::BigInt(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// SQL comparison: `None` when either side is NULL or the kinds are not comparable.
    pub fn sql_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Double(_), _) | (_, Value::Double(_)) => {
                self.as_f64()?.partial_cmp(&other.as_f64()?)
            }
            _ => Some(self.as_i64()?.cmp(&other.as_i64()?)),
        }
    }

    /// Equality used for grouping: NULLs group together.
    pub(crate) fn group_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            _ => self.sql_cmp(other) == Some(Ordering::Equal),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::BigInt(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "'{v}'"),
        }
    }
}

macro_rules! impl_from_for_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_for_value! {
    bool => Bool,
    i16 => Int,
    i32 => Int,
    i64 => BigInt,
    f32 => Double,
    f64 => Double,
    String => Text,
    &str => Text,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Read a typed Rust value out of a [`Value`].
pub trait FromValue: Sized {
    /// Declared kind, used for up-front constructor checks.
    const KIND: ValueKind;

    /// Whether NULL is an acceptable input.
    const NULLABLE: bool = false;

    fn from_value(value: &Value) -> Result<Self, ValueError>;
}

fn mismatch(expected: ValueKind, value: &Value) -> ValueError {
    ValueError {
        expected,
        found: value.kind(),
    }
}

impl FromValue for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Bool(v) => Ok(*v),
            other => Err(mismatch(Self::KIND, other)),
        }
    }
}

impl FromValue for i32 {
    const KIND: ValueKind = ValueKind::Int;

    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Int(v) => Ok(*v),
            other => Err(mismatch(Self::KIND, other)),
        }
    }
}

impl FromValue for i64 {
    const KIND: ValueKind = ValueKind::BigInt;

    fn from_value(value: &Value) -> Result<Self, ValueError> {
        value.as_i64().ok_or_else(|| mismatch(Self::KIND, value))
    }
}

impl FromValue for f64 {
    const KIND: ValueKind = ValueKind::Double;

    fn from_value(value: &Value) -> Result<Self, ValueError> {
        value.as_f64().ok_or_else(|| mismatch(Self::KIND, value))
    }
}

impl FromValue for String {
    const KIND: ValueKind = ValueKind::Text;

    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Text(v) => Ok(v.clone()),
            other => Err(mismatch(Self::KIND, other)),
        }
    }
}

impl FromValue for Value {
    const KIND: ValueKind = ValueKind::Null;
    const NULLABLE: bool = true;

    fn from_value(value: &Value) -> Result<Self, ValueError> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const KIND: ValueKind = T::KIND;
    const NULLABLE: bool = true;

    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

// Integer values are adapted to the parameter type the server inferred, so an
// `i32` bound against a `bigint` column does not fail on the wire.
impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql(ty, out),
            Value::Int(v) => int_to_sql(i64::from(*v), ty, out),
            Value::BigInt(v) => int_to_sql(*v, ty, out),
            Value::Double(v) => {
                if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            Value::Text(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        <bool as ToSql>::accepts(ty)
            || <i16 as ToSql>::accepts(ty)
            || <i32 as ToSql>::accepts(ty)
            || <i64 as ToSql>::accepts(ty)
            || <f64 as ToSql>::accepts(ty)
            || <f32 as ToSql>::accepts(ty)
            || <String as ToSql>::accepts(ty)
    }

    to_sql_checked!();
}

fn int_to_sql(
    v: i64,
    ty: &Type,
    out: &mut BytesMut,
) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
    if *ty == Type::INT2 {
        i16::try_from(v)?.to_sql(ty, out)
    } else if *ty == Type::INT4 {
        i32::try_from(v)?.to_sql(ty, out)
    } else if *ty == Type::FLOAT8 {
        (v as f64).to_sql(ty, out)
    } else if *ty == Type::FLOAT4 {
        (v as f32).to_sql(ty, out)
    } else {
        v.to_sql(ty, out)
    }
}
