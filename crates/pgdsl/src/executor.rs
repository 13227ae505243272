//! The executor seam between query plans and a data source.

use crate::error::DslResult;
use crate::qb::{DeletePlan, InsertPlan, SelectPlan, UpdatePlan};
use crate::record::Record;
use crate::value::Value;
use serde::Serialize;
use std::future::Future;

/// Runs query plans against some data source.
///
/// [`PgExecutor`](crate::PgExecutor) renders plans to SQL for Postgres;
/// [`MemoryStore`](crate::MemoryStore) evaluates them over in-process tables.
/// Failures of the underlying client surface as
/// [`DslError::Executor`](crate::DslError::Executor), untouched.
pub trait Executor: Sync {
    /// Rows matching `plan`, labelled by the plan's select items.
    fn fetch_records(
        &self,
        plan: &SelectPlan,
    ) -> impl Future<Output = DslResult<Vec<Record>>> + Send;

    /// Matching rows (or groups), ignoring ordering and paging.
    fn fetch_count(&self, plan: &SelectPlan) -> impl Future<Output = DslResult<u64>> + Send;

    /// Affected row count.
    fn execute_update(&self, plan: &UpdatePlan) -> impl Future<Output = DslResult<u64>> + Send;

    /// Removed row count.
    fn execute_delete(&self, plan: &DeletePlan) -> impl Future<Output = DslResult<u64>> + Send;

    /// The generated value of `plan.returning`.
    fn execute_insert(&self, plan: &InsertPlan) -> impl Future<Output = DslResult<Value>> + Send;
}

/// A page of results together with the unpaged total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResults<T> {
    pub total: u64,
    pub offset: u64,
    pub limit: Option<u64>,
    pub results: Vec<T>,
}

impl<T> QueryResults<T> {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> QueryResults<U> {
        QueryResults {
            total: self.total,
            offset: self.offset,
            limit: self.limit,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}
