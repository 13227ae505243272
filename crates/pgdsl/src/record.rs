//! Result rows as labelled [`Value`]s.

use crate::error::ProjectionError;
use crate::value::{FromValue, Value};
use serde::Serialize;
use tokio_postgres::Row;
use tokio_postgres::types::Type;

/// One result row: an ordered list of `label -> value` pairs.
///
/// Labels come from the select list (see [`SelectItem::label`](crate::SelectItem::label)).
/// Entity projections prefix their columns with the entity alias (`m.username`)
/// and fetch-joined associations nest one level deeper (`m.team.name`);
/// [`Record::scope`] strips such a prefix.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    labels: Vec<String>,
    values: Vec<Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style push.
    pub fn with(mut self, label: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(label, value);
        self
    }

    pub fn push(&mut self, label: impl Into<String>, value: impl Into<Value>) {
        self.labels.push(label.into());
        self.values.push(value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Raw value by label (first match wins).
    pub fn value(&self, label: &str) -> Option<&Value> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|idx| &self.values[idx])
    }

    /// Typed value by label.
    pub fn get<T: FromValue>(&self, label: &str) -> Result<T, ProjectionError> {
        let value = self
            .value(label)
            .ok_or_else(|| ProjectionError::MissingColumn {
                column: label.to_string(),
            })?;
        T::from_value(value).map_err(|e| ProjectionError::mismatch(label, e))
    }

    /// Typed value by position.
    pub fn get_at<T: FromValue>(&self, idx: usize) -> Result<T, ProjectionError> {
        let value = self
            .values
            .get(idx)
            .ok_or(ProjectionError::MissingArgument { position: idx })?;
        let target = self.labels.get(idx).map_or("", String::as_str);
        T::from_value(value).map_err(|e| ProjectionError::mismatch(target, e))
    }

    /// Positional sub-record `[start, start + len)`, clamped to the row width.
    pub fn slice(&self, start: usize, len: usize) -> Record {
        let end = (start + len).min(self.len());
        let start = start.min(end);
        Record {
            labels: self.labels[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
        }
    }

    /// Columns under `prefix.`, with the prefix removed.
    pub fn scope(&self, prefix: &str) -> Record {
        let mut scoped = Record::new();
        for (label, value) in self.labels.iter().zip(&self.values) {
            if let Some(rest) = label
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('.'))
            {
                scoped.push(rest, value.clone());
            }
        }
        scoped
    }

    /// Whether any column lives under `prefix.`.
    pub fn has_scope(&self, prefix: &str) -> bool {
        self.labels.iter().any(|label| {
            label
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    pub fn is_all_null(&self) -> bool {
        self.values.iter().all(Value::is_null)
    }

    /// Decode a Postgres row, column by column, into `Value`s.
    ///
    /// Only the scalar types `Value` can represent are supported; anything else
    /// is reported as [`ProjectionError::UnsupportedType`].
    pub fn from_pg_row(row: &Row) -> Result<Record, ProjectionError> {
        let mut record = Record::new();
        for (idx, column) in row.columns().iter().enumerate() {
            let name = column.name();
            let ty = column.type_();
            let decode = |e: tokio_postgres::Error| ProjectionError::decode(name, e.to_string());
            let value: Value = if *ty == Type::BOOL {
                row.try_get::<_, Option<bool>>(idx).map_err(decode)?.into()
            } else if *ty == Type::INT2 {
                row.try_get::<_, Option<i16>>(idx).map_err(decode)?.into()
            } else if *ty == Type::INT4 {
                row.try_get::<_, Option<i32>>(idx).map_err(decode)?.into()
            } else if *ty == Type::INT8 {
                row.try_get::<_, Option<i64>>(idx).map_err(decode)?.into()
            } else if *ty == Type::FLOAT4 {
                row.try_get::<_, Option<f32>>(idx).map_err(decode)?.into()
            } else if *ty == Type::FLOAT8 {
                row.try_get::<_, Option<f64>>(idx).map_err(decode)?.into()
            } else if [Type::TEXT, Type::VARCHAR, Type::BPCHAR, Type::NAME].contains(ty) {
                row.try_get::<_, Option<String>>(idx).map_err(decode)?.into()
            } else {
                return Err(ProjectionError::UnsupportedType {
                    column: name.to_string(),
                    type_name: ty.name().to_string(),
                });
            };
            record.push(name, value);
        }
        Ok(record)
    }
}

/// Build a value from a labelled record.
///
/// Usually derived with `#[derive(FromRecord)]`; fields are looked up by name,
/// or by `#[dsl(column = "...")]` when the label differs.
///
/// ```ignore
/// #[derive(FromRecord)]
/// struct UserDto {
///     name: Option<String>,
///     age: i32,
/// }
/// ```
pub trait FromRecord: Sized {
    fn from_record(record: &Record) -> Result<Self, ProjectionError>;
}

impl FromRecord for Record {
    fn from_record(record: &Record) -> Result<Self, ProjectionError> {
        Ok(record.clone())
    }
}
