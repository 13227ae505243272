//! Postgres clients and the SQL executor.

use crate::config::{DslConfig, truncate_sql};
use crate::error::{DslError, DslResult, ExecutorError};
use crate::executor::Executor;
use crate::param::ParamList;
use crate::qb::{DeletePlan, InsertPlan, SelectPlan, UpdatePlan};
use crate::record::Record;
use crate::value::Value;
use std::future::Future;
use std::time::Instant;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;
use tracing::{debug, warn};

/// A trait that unifies database clients and transactions.
///
/// [`PgExecutor`] accepts either a direct connection, a pooled connection or a
/// transaction, so queries compose inside transactions unchanged.
pub trait GenericClient: Send + Sync {
    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = DslResult<Vec<Row>>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = DslResult<u64>> + Send;
}

impl GenericClient for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DslResult<Vec<Row>> {
        Ok(tokio_postgres::Client::query(self, sql, params).await?)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DslResult<u64> {
        Ok(tokio_postgres::Client::execute(self, sql, params).await?)
    }
}

impl GenericClient for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DslResult<Vec<Row>> {
        Ok(tokio_postgres::Transaction::query(self, sql, params).await?)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DslResult<u64> {
        Ok(tokio_postgres::Transaction::execute(self, sql, params).await?)
    }
}

#[cfg(feature = "pool")]
impl GenericClient for deadpool_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DslResult<Vec<Row>> {
        // Delegate to the deref target (tokio_postgres::Client).
        let client: &tokio_postgres::Client = self;
        GenericClient::query(client, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DslResult<u64> {
        let client: &tokio_postgres::Client = self;
        GenericClient::execute(client, sql, params).await
    }
}

/// Runs query plans as SQL on a Postgres client.
///
/// Every statement is logged at DEBUG on the `pgdsl.sql` target, with the SQL
/// truncated to [`DslConfig::log_sql_max_length`]. When
/// [`DslConfig::query_timeout`] is set, statements exceeding it fail with
/// [`ExecutorError::Timeout`].
///
/// ```ignore
/// let pool = pgdsl::create_pool(&url)?;
/// let exec = PgExecutor::new(pool.get().await?);
/// let rows = select_from(&member).fetch(&exec).await?;
/// ```
#[derive(Debug)]
pub struct PgExecutor<C> {
    client: C,
    config: DslConfig,
}

impl<C: GenericClient> PgExecutor<C> {
    pub fn new(client: C) -> Self {
        Self::with_config(client, DslConfig::default())
    }

    pub fn with_config(client: C, config: DslConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &DslConfig {
        &self.config
    }

    pub fn into_inner(self) -> C {
        self.client
    }

    async fn timed<T>(
        &self,
        kind: &'static str,
        sql: &str,
        params: &ParamList,
        fut: impl Future<Output = DslResult<T>>,
    ) -> DslResult<T> {
        let shown = truncate_sql(sql, self.config.log_sql_max_length);
        debug!(target: "pgdsl.sql", kind, param_count = params.len(), sql = %shown);
        let start = Instant::now();
        let result = match self.config.query_timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        target: "pgdsl.sql",
                        kind,
                        timeout_ms = limit.as_millis() as u64,
                        sql = %shown,
                        "query timed out"
                    );
                    Err(ExecutorError::Timeout(limit).into())
                }
            },
            None => fut.await,
        };
        debug!(
            target: "pgdsl.sql",
            kind,
            elapsed_us = start.elapsed().as_micros() as u64,
            ok = result.is_ok()
        );
        result
    }

    async fn query(
        &self,
        kind: &'static str,
        sql: &str,
        params: &ParamList,
    ) -> DslResult<Vec<Row>> {
        let refs = params.as_refs();
        self.timed(kind, sql, params, self.client.query(sql, &refs))
            .await
    }

    async fn execute(&self, kind: &'static str, sql: &str, params: &ParamList) -> DslResult<u64> {
        let refs = params.as_refs();
        self.timed(kind, sql, params, self.client.execute(sql, &refs))
            .await
    }
}

impl<C: GenericClient> Executor for PgExecutor<C> {
    async fn fetch_records(&self, plan: &SelectPlan) -> DslResult<Vec<Record>> {
        let (sql, params) = plan.to_sql();
        let rows = self.query("select", &sql, &params).await?;
        rows.iter()
            .map(|row| Record::from_pg_row(row).map_err(DslError::from))
            .collect()
    }

    async fn fetch_count(&self, plan: &SelectPlan) -> DslResult<u64> {
        let (sql, params) = plan.to_count_sql();
        let rows = self.query("count", &sql, &params).await?;
        let row = rows
            .first()
            .ok_or_else(|| DslError::validation("COUNT returned no row"))?;
        let count: i64 = Record::from_pg_row(row)?.get_at(0)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn execute_update(&self, plan: &UpdatePlan) -> DslResult<u64> {
        let (sql, params) = plan.to_sql();
        self.execute("update", &sql, &params).await
    }

    async fn execute_delete(&self, plan: &DeletePlan) -> DslResult<u64> {
        let (sql, params) = plan.to_sql();
        self.execute("delete", &sql, &params).await
    }

    async fn execute_insert(&self, plan: &InsertPlan) -> DslResult<Value> {
        let (sql, params) = plan.to_sql();
        let rows = self.query("insert", &sql, &params).await?;
        let row = rows
            .first()
            .ok_or_else(|| DslError::validation("INSERT ... RETURNING returned no row"))?;
        Ok(Record::from_pg_row(row)?
            .into_values()
            .into_iter()
            .next()
            .unwrap_or(Value::Null))
    }
}
