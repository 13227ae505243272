//! Bulk DELETE.

use crate::error::DslResult;
use crate::executor::Executor;
use crate::expr::{Expr, Filter};
use crate::param::ParamList;
use crate::path::{EntityPath, TableRef};

/// Engine-neutral DELETE, handed to an [`Executor`].
#[derive(Clone, Debug, PartialEq)]
pub struct DeletePlan {
    pub table: TableRef,
    pub filter: Filter,
}

impl DeletePlan {
    pub fn to_sql(&self) -> (String, ParamList) {
        let mut params = ParamList::new();
        let mut sql = format!("DELETE FROM {}", self.table.to_sql());
        let where_sql = self.filter.expr().build(&mut params);
        if !where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }
        (sql, params)
    }
}

/// DELETE builder.
///
/// Without a WHERE condition the statement becomes `WHERE 1=0` (a no-op)
/// unless [`DeleteQuery::allow_delete_all`] is set.
#[derive(Clone, Debug)]
pub struct DeleteQuery {
    table: TableRef,
    filter: Filter,
    allow_delete_all: bool,
}

impl DeleteQuery {
    pub(crate) fn new<E: EntityPath>(entity: &E) -> Self {
        Self {
            table: entity.table().clone(),
            filter: Filter::match_all(),
            allow_delete_all: false,
        }
    }

    /// Allow DELETE without WHERE conditions.
    pub fn allow_delete_all(mut self, allow: bool) -> Self {
        self.allow_delete_all = allow;
        self
    }

    pub fn where_(mut self, filter: impl Into<Filter>) -> Self {
        let filter = filter.into();
        if !filter.is_match_all() {
            self.filter = self.filter.and(filter.into_expr());
        }
        self
    }

    pub fn plan(&self) -> DeletePlan {
        let filter = if self.filter.is_match_all() && !self.allow_delete_all {
            Filter::from(Expr::False)
        } else {
            self.filter.clone()
        };
        DeletePlan {
            table: self.table.clone(),
            filter,
        }
    }

    pub fn to_sql(&self) -> String {
        self.plan().to_sql().0
    }

    /// Run the delete and return the number of removed rows.
    pub async fn execute<E: Executor>(&self, exec: &E) -> DslResult<u64> {
        exec.execute_delete(&self.plan()).await
    }
}
