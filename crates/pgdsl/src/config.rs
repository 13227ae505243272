//! Runtime configuration.

use crate::error::{DslError, DslResult};
use std::time::Duration;

/// Settings shared by the pool and the Postgres executor.
#[derive(Debug, Clone, PartialEq)]
pub struct DslConfig {
    /// Connection string; `None` when running without a database.
    pub database_url: Option<String>,
    /// Maximum pooled connections.
    pub pool_max_size: usize,
    /// Per-statement timeout. `None` disables it.
    pub query_timeout: Option<Duration>,
    /// Truncate logged SQL to this many bytes.
    pub log_sql_max_length: usize,
}

impl Default for DslConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            pool_max_size: 16,
            query_timeout: None,
            log_sql_max_length: 200,
        }
    }
}

impl DslConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the environment, reading a `.env` file first if present.
    ///
    /// | variable | field |
    /// |---|---|
    /// | `DATABASE_URL` | `database_url` |
    /// | `PGDSL_POOL_MAX_SIZE` | `pool_max_size` |
    /// | `PGDSL_QUERY_TIMEOUT_MS` | `query_timeout` |
    /// | `PGDSL_LOG_SQL_MAX_LENGTH` | `log_sql_max_length` |
    pub fn from_env() -> DslResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DslResult<Self> {
        let mut config = Self::default();
        config.database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        if let Some(raw) = lookup("PGDSL_POOL_MAX_SIZE") {
            config.pool_max_size = parse(&raw, "PGDSL_POOL_MAX_SIZE")?;
            if config.pool_max_size == 0 {
                return Err(DslError::config("PGDSL_POOL_MAX_SIZE must be at least 1"));
            }
        }
        if let Some(raw) = lookup("PGDSL_QUERY_TIMEOUT_MS") {
            let ms: u64 = parse(&raw, "PGDSL_QUERY_TIMEOUT_MS")?;
            config.query_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(raw) = lookup("PGDSL_LOG_SQL_MAX_LENGTH") {
            config.log_sql_max_length = parse(&raw, "PGDSL_LOG_SQL_MAX_LENGTH")?;
        }
        Ok(config)
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn pool_max_size(mut self, size: usize) -> Self {
        self.pool_max_size = size;
        self
    }

    /// Set query timeout.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.query_timeout = Some(duration);
        self
    }

    pub fn log_sql_max_length(mut self, len: usize) -> Self {
        self.log_sql_max_length = len;
        self
    }

    /// The connection string, or a configuration error if unset.
    pub fn require_database_url(&self) -> DslResult<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| DslError::config("DATABASE_URL is not set"))
    }
}

fn parse<T: std::str::FromStr>(raw: &str, key: &str) -> DslResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| DslError::config(format!("{key}: invalid value '{raw}'")))
}

/// Cut `sql` to at most `max_bytes`, on a char boundary.
pub(crate) fn truncate_sql(sql: &str, max_bytes: usize) -> String {
    if sql.len() <= max_bytes {
        return sql.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &sql[..end])
}
