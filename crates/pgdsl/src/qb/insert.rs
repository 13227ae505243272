//! Single-row INSERT returning the generated key.

use crate::error::{DslError, DslResult, ProjectionError};
use crate::executor::Executor;
use crate::ident::quote_ident;
use crate::param::ParamList;
use crate::path::{Column, ColumnType, EntityPath, TableRef};
use crate::value::{FromValue, Value};

/// Engine-neutral INSERT, handed to an [`Executor`].
#[derive(Clone, Debug, PartialEq)]
pub struct InsertPlan {
    pub table: TableRef,
    pub values: Vec<(String, Value)>,
    /// Column whose generated value is returned.
    pub returning: String,
}

impl InsertPlan {
    /// `INSERT INTO "member" ("username", "age") VALUES ($1, $2) RETURNING "member_id"`
    pub fn to_sql(&self) -> (String, ParamList) {
        let mut params = ParamList::new();
        let cols: Vec<String> = self.values.iter().map(|(c, _)| quote_ident(c)).collect();
        let placeholders: Vec<String> = self
            .values
            .iter()
            .map(|(_, v)| format!("${}", params.push(v.clone())))
            .collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            quote_ident(self.table.name()),
            cols.join(", "),
            placeholders.join(", "),
            quote_ident(&self.returning)
        );
        (sql, params)
    }
}

/// INSERT builder.
#[derive(Clone, Debug)]
pub struct InsertQuery {
    table: TableRef,
    values: Vec<(String, Value)>,
}

impl InsertQuery {
    pub(crate) fn new<E: EntityPath>(entity: &E) -> Self {
        Self {
            table: entity.table().clone(),
            values: Vec::new(),
        }
    }

    /// Column value for the new row.
    pub fn value<T: ColumnType>(mut self, column: &Column<T>, value: impl Into<Value>) -> Self {
        self.values.push((column.name().to_string(), value.into()));
        self
    }

    pub fn plan<K: ColumnType>(&self, returning: &Column<K>) -> DslResult<InsertPlan> {
        if self.values.is_empty() {
            return Err(DslError::validation("INSERT requires at least one value"));
        }
        Ok(InsertPlan {
            table: self.table.clone(),
            values: self.values.clone(),
            returning: returning.name().to_string(),
        })
    }

    /// Insert the row and return the generated `returning` column.
    pub async fn execute_returning<E, K>(&self, exec: &E, returning: &Column<K>) -> DslResult<K>
    where
        E: Executor,
        K: ColumnType + FromValue,
    {
        let plan = self.plan(returning)?;
        let key = exec.execute_insert(&plan).await?;
        K::from_value(&key)
            .map_err(|e| ProjectionError::mismatch(returning.name(), e).into())
    }
}
