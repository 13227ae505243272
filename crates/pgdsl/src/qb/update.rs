//! Bulk UPDATE.

use crate::error::{DslError, DslResult};
use crate::executor::Executor;
use crate::expr::{ArithExpr, Expr, Filter};
use crate::ident::quote_ident;
use crate::param::ParamList;
use crate::path::{Column, ColumnType, EntityPath, Numeric, TableRef};
use crate::value::Value;

/// Right-hand side of one `SET` assignment.
#[derive(Clone, Debug, PartialEq)]
pub enum SetValue {
    Value(Value),
    Expr(ArithExpr),
}

/// Engine-neutral UPDATE, handed to an [`Executor`].
#[derive(Clone, Debug, PartialEq)]
pub struct UpdatePlan {
    pub table: TableRef,
    pub sets: Vec<(String, SetValue)>,
    pub filter: Filter,
}

impl UpdatePlan {
    /// `UPDATE "member" AS "m" SET "age" = "m"."age" * $1 WHERE ...`
    pub fn to_sql(&self) -> (String, ParamList) {
        let mut params = ParamList::new();
        let sets: Vec<String> = self
            .sets
            .iter()
            .map(|(column, value)| {
                let rhs = match value {
                    SetValue::Value(v) => format!("${}", params.push(v.clone())),
                    SetValue::Expr(e) => e.build(&mut params),
                };
                format!("{} = {}", quote_ident(column), rhs)
            })
            .collect();
        let mut sql = format!("UPDATE {} SET {}", self.table.to_sql(), sets.join(", "));
        let where_sql = self.filter.expr().build(&mut params);
        if !where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }
        (sql, params)
    }
}

/// UPDATE builder. Without a WHERE condition every row is updated.
#[derive(Clone, Debug)]
pub struct UpdateQuery {
    table: TableRef,
    sets: Vec<(String, SetValue)>,
    filter: Filter,
}

impl UpdateQuery {
    pub(crate) fn new<E: EntityPath>(entity: &E) -> Self {
        Self {
            table: entity.table().clone(),
            sets: Vec::new(),
            filter: Filter::match_all(),
        }
    }

    /// `SET column = value`
    pub fn set<T: ColumnType>(mut self, column: &Column<T>, value: impl Into<T::Scalar>) -> Self {
        let value: T::Scalar = value.into();
        self.sets
            .push((column.name().to_string(), SetValue::Value(value.into())));
        self
    }

    /// `SET column = NULL`
    pub fn set_null<T: ColumnType>(mut self, column: &Column<Option<T>>) -> Self {
        self.sets
            .push((column.name().to_string(), SetValue::Value(Value::Null)));
        self
    }

    /// `SET column = value`, or `NULL` for `None`.
    pub fn set_nullable<T: ColumnType>(
        self,
        column: &Column<Option<T>>,
        value: Option<impl Into<T::Scalar>>,
    ) -> Self {
        match value {
            Some(value) => self.set(column, value),
            None => self.set_null(column),
        }
    }

    /// `SET column = column op value`
    pub fn set_expr<T: Numeric>(mut self, column: &Column<T>, expr: ArithExpr) -> Self {
        self.sets
            .push((column.name().to_string(), SetValue::Expr(expr)));
        self
    }

    pub fn where_(mut self, filter: impl Into<Filter>) -> Self {
        let filter = filter.into();
        if !filter.is_match_all() {
            self.filter = self.filter.and(filter.into_expr());
        }
        self
    }

    pub fn and_where(self, expr: Expr) -> Self {
        self.where_(expr)
    }

    pub fn plan(&self) -> DslResult<UpdatePlan> {
        if self.sets.is_empty() {
            return Err(DslError::validation("UPDATE requires at least one SET"));
        }
        Ok(UpdatePlan {
            table: self.table.clone(),
            sets: self.sets.clone(),
            filter: self.filter.clone(),
        })
    }

    pub fn to_sql(&self) -> String {
        self.plan().map(|p| p.to_sql().0).unwrap_or_default()
    }

    /// Run the update and return the number of affected rows.
    pub async fn execute<E: Executor>(&self, exec: &E) -> DslResult<u64> {
        let plan = self.plan()?;
        exec.execute_update(&plan).await
    }
}
